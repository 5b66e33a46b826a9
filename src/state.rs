//! Connection State Table
//!
//! The connection lifecycle is encoded as data: one row per [`ConnState`], one column per
//! [`ConnEvent`], each cell holding the next state and the action to run. Combinations
//! that need no handling are spelled out as "stay, no action" so the table is total.

use crate::action::ActionCode;
use crate::event::{ConnEvent, NUM_EVENTS};

/// Number of connection states
pub const NUM_STATES: usize = 5;

/// Connection state of a control block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConnState {
    /// No link and no pending request
    #[default]
    Idle = 0,
    /// LE Create Connection issued, waiting for completion
    Connecting = 1,
    /// Connectable advertising running, waiting for a central
    Accepting = 2,
    /// Link established
    Connected = 3,
    /// Disconnect or create-connection cancel issued, waiting for completion
    Disconnecting = 4,
}

impl ConnState {
    /// All states, in table row order
    pub const ALL: [ConnState; NUM_STATES] = [
        ConnState::Idle,
        ConnState::Connecting,
        ConnState::Accepting,
        ConnState::Connected,
        ConnState::Disconnecting,
    ];

    /// Table row of this state
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One cell of the state table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateEntry {
    /// State committed before the action runs
    pub next: ConnState,
    /// Action to dispatch
    pub action: ActionCode,
}

const fn entry(next: ConnState, action: ActionCode) -> StateEntry {
    StateEntry { next, action }
}

use ActionCode as A;
use ConnState as S;

/// Connection state table, indexed `[state][event]`
///
/// Columns: `ApiOpen`, `ApiClose`, `ApiAccept`, `HciConnCompleteFail`, `HciConnComplete`,
/// `HciDisconnectComplete`, `HciConnUpdateComplete`, `HciCreateConnCancelComplete`.
pub static STATE_TABLE: [[StateEntry; NUM_EVENTS]; NUM_STATES] = [
    // Idle
    [
        entry(S::Connecting, A::OPEN),
        entry(S::Idle, A::NONE),
        entry(S::Accepting, A::ACCEPT),
        entry(S::Idle, A::NONE),
        entry(S::Connected, A::CONN_ACCEPTED),
        entry(S::Idle, A::NONE),
        entry(S::Idle, A::NONE),
        entry(S::Idle, A::NONE),
    ],
    // Connecting
    [
        entry(S::Connecting, A::NONE),
        entry(S::Disconnecting, A::CANCEL_OPEN),
        entry(S::Connecting, A::NONE),
        entry(S::Idle, A::CONN_FAILED),
        entry(S::Connected, A::CONN_OPENED),
        entry(S::Idle, A::CONN_FAILED),
        entry(S::Connecting, A::NONE),
        entry(S::Connecting, A::NONE),
    ],
    // Accepting
    [
        entry(S::Accepting, A::NONE),
        entry(S::Idle, A::CANCEL_ACCEPT),
        entry(S::Accepting, A::NONE),
        entry(S::Idle, A::ACCEPT_FAILED),
        entry(S::Connected, A::CONN_ACCEPTED),
        entry(S::Idle, A::ACCEPT_FAILED),
        entry(S::Accepting, A::NONE),
        entry(S::Accepting, A::NONE),
    ],
    // Connected
    [
        entry(S::Connected, A::NONE),
        entry(S::Disconnecting, A::CLOSE),
        entry(S::Connected, A::NONE),
        entry(S::Connected, A::NONE),
        entry(S::Connected, A::NONE),
        entry(S::Idle, A::CONN_CLOSED),
        entry(S::Connected, A::HCI_UPDATED),
        entry(S::Connected, A::NONE),
    ],
    // Disconnecting
    [
        entry(S::Disconnecting, A::NONE),
        entry(S::Disconnecting, A::NONE),
        entry(S::Disconnecting, A::NONE),
        entry(S::Idle, A::CONN_CLOSED),
        // A completion racing a local cancel: stay and close the new link.
        entry(S::Disconnecting, A::CLOSE),
        entry(S::Idle, A::CONN_CLOSED),
        entry(S::Disconnecting, A::NONE),
        entry(S::Disconnecting, A::NONE),
    ],
];

/// Look up the transition for `event` in `state`
#[must_use]
pub fn lookup(state: ConnState, event: ConnEvent) -> StateEntry {
    STATE_TABLE[state.index()][event.index()]
}
