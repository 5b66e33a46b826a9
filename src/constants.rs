//! `Linkbird` Constants
//!
//! This module contains the constants used throughout the `Linkbird` library:
//! message code layout, action code layout, capacities and HCI defaults.

/// Maximum number of simultaneous connection control blocks
pub const MAX_CONNECTIONS: usize = 4;

/// Depth of the API request/response and HCI command channels
pub const MAX_CHANNELS: usize = 8;

/// Depth of the upper-layer notification channel
pub const MAX_EVENTS: usize = 8;

/// Maximum number of HCI commands or notifications a single driven message may produce
pub const MAX_ACTION_OUTPUT: usize = 4;

/// Device Manager subsystem id of the connection state machine
pub const DM_ID_CONN: u8 = 3;

/// Bit position of the subsystem id inside a message code
pub const DM_MSG_SHIFT: u8 = 3;

/// Mask extracting the per-subsystem event index from a message code
pub const DM_MSG_MASK: u8 = (1 << DM_MSG_SHIFT) - 1;

/// First message code owned by the connection state machine
pub const DM_CONN_MSG_BASE: u8 = DM_ID_CONN << DM_MSG_SHIFT;

/// Bit position of the action-set id inside an action code
pub const ACTION_SET_SHIFT: u8 = 4;

/// Mask extracting the action index from an action code
pub const ACTION_INDEX_MASK: u8 = (1 << ACTION_SET_SHIFT) - 1;

/// Number of action-set slots in the registry (main, initiator, acceptor)
pub const NUM_ACTION_SETS: usize = 3;

/// Connection id meaning "no connection"
pub const CONN_ID_NONE: u8 = 0;

/// HCI status: success
pub const HCI_SUCCESS: u8 = 0x00;

/// HCI error: unknown connection identifier (reported after a create connection cancel)
pub const HCI_ERR_UNKNOWN_CONN_ID: u8 = 0x02;

/// HCI error: remote user terminated connection (default close reason)
pub const HCI_ERR_REMOTE_TERMINATED: u8 = 0x13;

/// HCI error: remote device terminated connection due to low resources
pub const HCI_ERR_LOW_RESOURCES: u8 = 0x14;

/// HCI error: connection terminated by local host
pub const HCI_ERR_LOCAL_TERMINATED: u8 = 0x16;

/// HCI error: directed advertising timeout
pub const HCI_ERR_ADV_TIMEOUT: u8 = 0x3C;

/// HCI error: unspecified error, used when a controller status cannot be mapped
pub const HCI_ERR_UNSPECIFIED: u8 = 0x1F;

/// Default LE scan interval in 0.625 ms units (60 ms)
pub const DEFAULT_SCAN_INTERVAL: u16 = 0x0060;

/// Default LE scan window in 0.625 ms units (30 ms)
pub const DEFAULT_SCAN_WINDOW: u16 = 0x0030;

/// Default minimum connection interval in 1.25 ms units (30 ms)
pub const DEFAULT_CONN_INTERVAL_MIN: u16 = 0x0018;

/// Default maximum connection interval in 1.25 ms units (50 ms)
pub const DEFAULT_CONN_INTERVAL_MAX: u16 = 0x0028;

/// Default peripheral latency in connection events
pub const DEFAULT_CONN_LATENCY: u16 = 0;

/// Default supervision timeout in 10 ms units (6 s)
pub const DEFAULT_SUPERVISION_TIMEOUT: u16 = 0x0258;
