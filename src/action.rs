//! Action Codes and Dispatch
//!
//! An [`ActionCode`] packs two fields into one byte: the high nibble selects an action
//! set (the handlers contributed by one role) and the low nibble selects the handler
//! inside that set. Role modules register their sets in an [`ActionRegistry`] once at
//! startup; dispatch falls back to the no-op handler whenever the selected set was never
//! registered.

use crate::actions::act_none;
use crate::ccb::ConnCcb;
use crate::constants::{ACTION_INDEX_MASK, ACTION_SET_SHIFT, NUM_ACTION_SETS};
use crate::event::ConnMsg;
use crate::output::ActionOutput;

/// Action set selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ActionSetId {
    /// Role independent handlers
    Main = 0,
    /// Handlers of the connection initiator (central)
    Initiator = 1,
    /// Handlers of the connection acceptor (peripheral)
    Acceptor = 2,
}

impl ActionSetId {
    /// Map a raw set id to its selector
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<ActionSetId> {
        match raw {
            0 => Some(ActionSetId::Main),
            1 => Some(ActionSetId::Initiator),
            2 => Some(ActionSetId::Acceptor),
            _ => None,
        }
    }
}

/// Packed action code: action-set id in the high nibble, handler index in the low nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionCode(u8);

impl ActionCode {
    /// No action
    pub const NONE: ActionCode = ActionCode::new(ActionSetId::Main, 0);
    /// Disconnect the link
    pub const CLOSE: ActionCode = ActionCode::new(ActionSetId::Main, 1);
    /// Outgoing connection established
    pub const CONN_OPENED: ActionCode = ActionCode::new(ActionSetId::Main, 2);
    /// Outgoing connection failed
    pub const CONN_FAILED: ActionCode = ActionCode::new(ActionSetId::Main, 3);
    /// Connection closed
    pub const CONN_CLOSED: ActionCode = ActionCode::new(ActionSetId::Main, 4);
    /// Connection parameters updated
    pub const HCI_UPDATED: ActionCode = ActionCode::new(ActionSetId::Main, 5);
    /// Start an outgoing connection
    pub const OPEN: ActionCode = ActionCode::new(ActionSetId::Initiator, 0);
    /// Cancel an outgoing connection
    pub const CANCEL_OPEN: ActionCode = ActionCode::new(ActionSetId::Initiator, 1);
    /// Start accepting a connection
    pub const ACCEPT: ActionCode = ActionCode::new(ActionSetId::Acceptor, 0);
    /// Stop accepting a connection
    pub const CANCEL_ACCEPT: ActionCode = ActionCode::new(ActionSetId::Acceptor, 1);
    /// Incoming connection established
    pub const CONN_ACCEPTED: ActionCode = ActionCode::new(ActionSetId::Acceptor, 2);
    /// Incoming connection failed
    pub const ACCEPT_FAILED: ActionCode = ActionCode::new(ActionSetId::Acceptor, 3);

    /// Pack a set id and a handler index
    #[must_use]
    pub const fn new(set: ActionSetId, index: u8) -> Self {
        Self(((set as u8) << ACTION_SET_SHIFT) | (index & ACTION_INDEX_MASK))
    }

    /// Action-set id (high nibble)
    #[must_use]
    pub const fn set_id(self) -> u8 {
        self.0 >> ACTION_SET_SHIFT
    }

    /// Handler index inside the set (low nibble)
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0 & ACTION_INDEX_MASK
    }

    /// Raw packed value
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Signature of a connection action handler
pub type ActionFn = fn(&mut ConnCcb, &ConnMsg, &mut ActionOutput);

/// A set of action handlers contributed by one role
pub trait ActionSet: Sync {
    /// Run handler `index` for `ccb`
    fn invoke(&self, index: u8, ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput);
}

/// Handler tables; an index past the end of the table panics.
impl<const N: usize> ActionSet for [ActionFn; N] {
    fn invoke(&self, index: u8, ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
        (self[usize::from(index)])(ccb, msg, out);
    }
}

/// Outcome of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// The handler of a registered set ran
    Invoked(ActionCode),
    /// The set was not registered; the no-op handler ran instead
    Fallback(ActionCode),
}

/// Registry of action sets, indexed by set id
///
/// Built once at startup and immutable afterwards.
#[derive(Clone, Copy)]
pub struct ActionRegistry<'a> {
    sets: [Option<&'a dyn ActionSet>; NUM_ACTION_SETS],
}

impl<'a> ActionRegistry<'a> {
    /// Create a registry with no sets registered
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sets: [None; NUM_ACTION_SETS],
        }
    }

    /// Register `set` under `id`, replacing any previous registration
    #[must_use]
    pub fn with_set(mut self, id: ActionSetId, set: &'a dyn ActionSet) -> Self {
        self.sets[id as usize] = Some(set);
        self
    }

    /// Whether a set is registered under `id`
    #[must_use]
    pub fn is_registered(&self, id: ActionSetId) -> bool {
        self.sets[id as usize].is_some()
    }

    /// Run the handler selected by `code`
    pub fn dispatch(
        &self,
        code: ActionCode,
        ccb: &mut ConnCcb,
        msg: &ConnMsg,
        out: &mut ActionOutput,
    ) -> Dispatch {
        match self.sets.get(usize::from(code.set_id())).copied().flatten() {
            Some(set) => {
                set.invoke(code.index(), ccb, msg, out);
                Dispatch::Invoked(code)
            }
            None => {
                act_none(ccb, msg, out);
                Dispatch::Fallback(code)
            }
        }
    }
}

impl Default for ActionRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ActionRegistry<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("main", &self.is_registered(ActionSetId::Main))
            .field("initiator", &self.is_registered(ActionSetId::Initiator))
            .field("acceptor", &self.is_registered(ActionSetId::Acceptor))
            .finish()
    }
}
