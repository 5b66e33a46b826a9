//! Connection State Machine Messages
//!
//! Every input to the connection state machine, whether an application request or a
//! controller completion, is packaged as a [`ConnMsg`]. The message carries a raw
//! Device Manager message code; [`ConnEvent::classify`] masks the subsystem tag out of
//! that code to obtain the column of the state table.

use crate::ccb::{ConnId, ConnRole};
use crate::constants::{DM_CONN_MSG_BASE, DM_MSG_MASK, HCI_SUCCESS};
use crate::params::{ConnParams, ConnSpec, ScanParams};
use crate::{AddressKind, DeviceAddress};

/// Number of events handled by the connection state machine
pub const NUM_EVENTS: usize = 8;

/// Connection state machine event, in state table column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConnEvent {
    /// Application requests a new outgoing connection
    ApiOpen = 0,
    /// Application requests to close or cancel a connection
    ApiClose = 1,
    /// Application requests to accept an incoming connection
    ApiAccept = 2,
    /// LE Connection Complete with a failure status
    HciConnCompleteFail = 3,
    /// LE Connection Complete with success status
    HciConnComplete = 4,
    /// Disconnection Complete
    HciDisconnectComplete = 5,
    /// LE Connection Update Complete
    HciConnUpdateComplete = 6,
    /// Command Complete for LE Create Connection Cancel
    HciCreateConnCancelComplete = 7,
}

impl ConnEvent {
    /// All events, in table column order
    pub const ALL: [ConnEvent; NUM_EVENTS] = [
        ConnEvent::ApiOpen,
        ConnEvent::ApiClose,
        ConnEvent::ApiAccept,
        ConnEvent::HciConnCompleteFail,
        ConnEvent::HciConnComplete,
        ConnEvent::HciDisconnectComplete,
        ConnEvent::HciConnUpdateComplete,
        ConnEvent::HciCreateConnCancelComplete,
    ];

    /// Map a raw message code of the connection subsystem to its event.
    ///
    /// The subsystem tag is masked off, so the mapping is total; callers only hand in
    /// codes that were already routed to the connection state machine.
    #[must_use]
    pub const fn classify(code: u8) -> ConnEvent {
        Self::ALL[(code & DM_MSG_MASK) as usize]
    }

    /// Event at the given table column, if any
    #[must_use]
    pub fn from_index(index: usize) -> Option<ConnEvent> {
        Self::ALL.get(index).copied()
    }

    /// Table column of this event
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Raw Device Manager message code of this event
    #[must_use]
    pub const fn code(self) -> u8 {
        DM_CONN_MSG_BASE + self as u8
    }
}

/// Typed data attached to a connection message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MsgPayload {
    /// No data
    None,
    /// Outgoing connection request
    Open {
        /// Device to connect to
        peer: DeviceAddress,
        /// Local address type used by the initiator
        own_addr_kind: AddressKind,
        /// Scan parameters for the initiator
        scan: ScanParams,
        /// Requested connection parameters
        spec: ConnSpec,
    },
    /// Incoming connection request, optionally restricted to one peer
    Accept {
        /// Directed peer, `None` for undirected connectable advertising
        peer: Option<DeviceAddress>,
    },
    /// Close request
    Close {
        /// HCI disconnect reason
        reason: u8,
    },
    /// Connection establishment report
    ConnComplete {
        /// Controller connection handle
        handle: u16,
        /// Local role on the link
        role: ConnRole,
        /// Peer device
        peer: DeviceAddress,
        /// Negotiated parameters
        params: ConnParams,
    },
    /// Disconnection report
    Disconnect {
        /// Controller connection handle
        handle: u16,
        /// HCI disconnect reason
        reason: u8,
    },
    /// Connection parameter update report
    Update {
        /// Controller connection handle
        handle: u16,
        /// New parameters
        params: ConnParams,
    },
}

/// A message driven into the connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnMsg {
    /// Raw Device Manager message code
    pub event: u8,
    /// HCI status, `HCI_SUCCESS` for API requests
    pub status: u8,
    /// Target control block
    pub conn_id: ConnId,
    /// Event specific data
    pub payload: MsgPayload,
}

impl ConnMsg {
    /// Create a message for the given event with no payload
    #[must_use]
    pub const fn new(event: ConnEvent, conn_id: ConnId) -> Self {
        Self {
            event: event.code(),
            status: HCI_SUCCESS,
            conn_id,
            payload: MsgPayload::None,
        }
    }

    /// Attach a status
    #[must_use]
    pub const fn with_status(mut self, status: u8) -> Self {
        self.status = status;
        self
    }

    /// Attach a payload
    #[must_use]
    pub const fn with_payload(mut self, payload: MsgPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Classified event of this message
    #[must_use]
    pub const fn conn_event(&self) -> ConnEvent {
        ConnEvent::classify(self.event)
    }

    /// API open request
    #[must_use]
    pub const fn open(
        conn_id: ConnId,
        peer: DeviceAddress,
        own_addr_kind: AddressKind,
        scan: ScanParams,
        spec: ConnSpec,
    ) -> Self {
        Self::new(ConnEvent::ApiOpen, conn_id).with_payload(MsgPayload::Open {
            peer,
            own_addr_kind,
            scan,
            spec,
        })
    }

    /// API accept request
    #[must_use]
    pub const fn accept(conn_id: ConnId, peer: Option<DeviceAddress>) -> Self {
        Self::new(ConnEvent::ApiAccept, conn_id).with_payload(MsgPayload::Accept { peer })
    }

    /// API close request
    #[must_use]
    pub const fn close(conn_id: ConnId, reason: u8) -> Self {
        Self::new(ConnEvent::ApiClose, conn_id).with_payload(MsgPayload::Close { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes_carry_subsystem_tag() {
        assert_eq!(ConnEvent::ApiOpen.code(), 24);
        assert_eq!(ConnEvent::HciConnComplete.code(), 28);
        assert_eq!(ConnEvent::HciCreateConnCancelComplete.code(), 31);
    }

    #[test]
    fn test_classify_masks_subsystem_tag() {
        for event in ConnEvent::ALL {
            assert_eq!(ConnEvent::classify(event.code()), event);
        }
        assert_eq!(ConnEvent::classify(29), ConnEvent::HciDisconnectComplete);
    }

    #[test]
    fn test_event_index_order() {
        for (i, event) in ConnEvent::ALL.iter().enumerate() {
            assert_eq!(event.index(), i);
            assert_eq!(ConnEvent::from_index(i), Some(*event));
        }
        assert_eq!(ConnEvent::from_index(NUM_EVENTS), None);
    }

    #[test]
    fn test_message_builders() {
        let id = ConnId::new(1);
        let close = ConnMsg::close(id, 0x13);
        assert_eq!(close.conn_event(), ConnEvent::ApiClose);
        assert_eq!(close.status, HCI_SUCCESS);
        assert_eq!(close.payload, MsgPayload::Close { reason: 0x13 });

        let fail = ConnMsg::new(ConnEvent::HciConnCompleteFail, id).with_status(0x3C);
        assert_eq!(fail.conn_event(), ConnEvent::HciConnCompleteFail);
        assert_eq!(fail.status, 0x3C);
        assert_eq!(fail.payload, MsgPayload::None);
    }
}
