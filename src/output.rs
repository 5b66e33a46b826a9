//! Work produced by connection actions
//!
//! Actions never talk to the controller or the application directly. They record HCI
//! commands for the lower layer and notifications for the upper layer in an
//! [`ActionOutput`], which the owner of the state machine forwards once the message has
//! been driven.

use crate::ccb::{ConnId, ConnRole};
use crate::constants::MAX_ACTION_OUTPUT;
use crate::params::{ConnParams, ConnSpec, ScanParams};
use crate::{AddressKind, DeviceAddress};
use heapless::Vec;

/// HCI commands issued on behalf of the connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HciCommand {
    /// LE Create Connection
    LeCreateConn {
        /// Peer to connect to
        peer: DeviceAddress,
        /// Local address type
        own_addr_kind: AddressKind,
        /// Scan parameters
        scan: ScanParams,
        /// Requested connection parameters
        spec: ConnSpec,
    },
    /// LE Create Connection Cancel
    LeCreateConnCancel,
    /// Disconnect
    Disconnect {
        /// Connection handle
        handle: u16,
        /// HCI disconnect reason
        reason: u8,
    },
    /// LE Connection Update
    LeConnUpdate {
        /// Connection handle
        handle: u16,
        /// Requested parameters
        spec: ConnSpec,
    },
    /// LE Set Advertising Enable
    LeSetAdvEnable(bool),
}

/// Notifications delivered to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmEvent {
    /// A connection was established
    ConnOpened {
        /// Connection id
        conn_id: ConnId,
        /// Controller connection handle
        handle: u16,
        /// Local role
        role: ConnRole,
        /// Peer device
        peer: DeviceAddress,
        /// Negotiated parameters
        params: ConnParams,
    },
    /// A connection was closed, or an open/accept request ended without a link
    ConnClosed {
        /// Connection id
        conn_id: ConnId,
        /// Controller connection handle, if a link existed
        handle: Option<u16>,
        /// HCI status of the terminating event
        status: u8,
        /// HCI reason for the closure
        reason: u8,
    },
    /// A connection parameter update finished
    ConnUpdated {
        /// Connection id
        conn_id: ConnId,
        /// HCI status of the update
        status: u8,
        /// Parameters in effect after the update
        params: ConnParams,
    },
}

/// Commands and notifications produced while driving one or more messages
#[derive(Debug, Default)]
pub struct ActionOutput {
    /// Commands for the controller, in issue order
    pub commands: Vec<HciCommand, MAX_ACTION_OUTPUT>,
    /// Notifications for the application, in occurrence order
    pub events: Vec<DmEvent, MAX_ACTION_OUTPUT>,
}

impl ActionOutput {
    /// Create an empty output
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Queue an HCI command
    pub fn command(&mut self, command: HciCommand) {
        if self.commands.push(command).is_err() {
            warn!("[DM] Command queue full, dropping {:?}", command);
        }
    }

    /// Queue an application notification
    pub fn notify(&mut self, event: DmEvent) {
        if self.events.push(event).is_err() {
            warn!("[DM] Event queue full, dropping {:?}", event);
        }
    }

    /// Whether nothing was produced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty()
    }

    /// Discard everything produced so far
    pub fn clear(&mut self) {
        self.commands.clear();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_collects_in_order() {
        let mut out = ActionOutput::new();
        assert!(out.is_empty());

        out.command(HciCommand::LeSetAdvEnable(true));
        out.command(HciCommand::LeCreateConnCancel);
        assert_eq!(
            out.commands.as_slice(),
            &[HciCommand::LeSetAdvEnable(true), HciCommand::LeCreateConnCancel]
        );

        out.clear();
        assert!(out.is_empty());
    }

    #[test]
    fn test_output_drops_when_full() {
        let mut out = ActionOutput::new();
        for handle in 0..(MAX_ACTION_OUTPUT as u16 + 2) {
            out.command(HciCommand::Disconnect {
                handle,
                reason: 0x13,
            });
        }
        assert_eq!(out.commands.len(), MAX_ACTION_OUTPUT);
        assert_eq!(
            out.commands[0],
            HciCommand::Disconnect {
                handle: 0,
                reason: 0x13
            }
        );
    }
}
