//! Connection Action Sets
//!
//! The handlers run by the state machine, grouped by the role that contributes them:
//!
//! * [`common`] - role independent handlers (close, opened, failed, closed, updated)
//! * [`initiator`] - central side handlers (open, cancel open)
//! * [`acceptor`] - peripheral side handlers (accept, cancel accept, accepted, failed)
//!
//! Each table is ordered by the handler index of the matching [`ActionCode`]s.
//!
//! [`ActionCode`]: crate::action::ActionCode

pub mod acceptor;
pub mod common;
pub mod initiator;

pub use acceptor::ACCEPTOR_ACTIONS;
pub use common::{MAIN_ACTIONS, act_none};
pub use initiator::INITIATOR_ACTIONS;

use crate::action::{ActionRegistry, ActionSetId};

/// Registry with all three built-in action sets registered
#[must_use]
pub fn default_registry() -> ActionRegistry<'static> {
    ActionRegistry::new()
        .with_set(ActionSetId::Main, &MAIN_ACTIONS)
        .with_set(ActionSetId::Initiator, &INITIATOR_ACTIONS)
        .with_set(ActionSetId::Acceptor, &ACCEPTOR_ACTIONS)
}

/// Registry for a central-only device: incoming connection requests fall through to
/// the no-op handler
#[must_use]
pub fn initiator_registry() -> ActionRegistry<'static> {
    ActionRegistry::new()
        .with_set(ActionSetId::Main, &MAIN_ACTIONS)
        .with_set(ActionSetId::Initiator, &INITIATOR_ACTIONS)
}

/// Registry for a peripheral-only device: outgoing connection requests fall through to
/// the no-op handler
#[must_use]
pub fn acceptor_registry() -> ActionRegistry<'static> {
    ActionRegistry::new()
        .with_set(ActionSetId::Main, &MAIN_ACTIONS)
        .with_set(ActionSetId::Acceptor, &ACCEPTOR_ACTIONS)
}
