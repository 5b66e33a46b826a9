//! Connection Control Blocks
//!
//! A [`ConnCcb`] is the per-connection record driven by the state machine. Control
//! blocks live in a fixed-capacity [`ConnTable`] and are addressed by a stable
//! [`ConnId`]: a block is allocated when an open or accept request arrives (or when the
//! controller reports an inbound link nobody asked for) and released as soon as its
//! state is back to `Idle`.

use crate::constants::{CONN_ID_NONE, HCI_ERR_REMOTE_TERMINATED};
use crate::params::ConnParams;
use crate::state::ConnState;
use crate::{ConnError, DeviceAddress};

/// Identifier of a connection control block (1-based, `0` means none)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnId(u8);

impl ConnId {
    /// The "no connection" id
    pub const NONE: ConnId = ConnId(CONN_ID_NONE);

    /// Create a connection id from its raw value
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw id value
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Whether this is the "no connection" id
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == CONN_ID_NONE
    }

    fn slot(self) -> Option<usize> {
        usize::from(self.0).checked_sub(1)
    }
}

/// Local role on a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnRole {
    /// Local device initiated the link
    #[default]
    Central,
    /// Local device accepted the link
    Peripheral,
}

impl From<bt_hci::param::LeConnRole> for ConnRole {
    fn from(role: bt_hci::param::LeConnRole) -> Self {
        match role {
            bt_hci::param::LeConnRole::Central => ConnRole::Central,
            bt_hci::param::LeConnRole::Peripheral => ConnRole::Peripheral,
        }
    }
}

/// Connection control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnCcb {
    pub(crate) id: ConnId,
    pub(crate) state: ConnState,
    pub(crate) role: ConnRole,
    pub(crate) handle: Option<u16>,
    pub(crate) peer: Option<DeviceAddress>,
    pub(crate) params: Option<ConnParams>,
    pub(crate) close_reason: u8,
}

impl ConnCcb {
    /// Create an idle control block
    #[must_use]
    pub const fn new(id: ConnId, role: ConnRole) -> Self {
        Self {
            id,
            state: ConnState::Idle,
            role,
            handle: None,
            peer: None,
            params: None,
            close_reason: HCI_ERR_REMOTE_TERMINATED,
        }
    }

    /// Connection id
    #[must_use]
    pub const fn id(&self) -> ConnId {
        self.id
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ConnState {
        self.state
    }

    /// Local role
    #[must_use]
    pub const fn role(&self) -> ConnRole {
        self.role
    }

    /// Controller connection handle, once the link exists
    #[must_use]
    pub const fn handle(&self) -> Option<u16> {
        self.handle
    }

    /// Peer device, if known
    #[must_use]
    pub const fn peer(&self) -> Option<DeviceAddress> {
        self.peer
    }

    /// Parameters of the established link
    #[must_use]
    pub const fn params(&self) -> Option<ConnParams> {
        self.params
    }

    /// Reason used when this connection is closed locally
    #[must_use]
    pub const fn close_reason(&self) -> u8 {
        self.close_reason
    }

    /// Whether the link is up
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnState::Connected
    }

    /// Whether an open or accept request is still waiting for the controller
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ConnState::Connecting | ConnState::Accepting)
    }
}

/// Fixed-capacity table of connection control blocks
#[derive(Debug)]
pub struct ConnTable<const N: usize> {
    slots: [Option<ConnCcb>; N],
}

impl<const N: usize> ConnTable<N> {
    /// Create an empty table
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }

    /// Allocate a control block in the first free slot
    ///
    /// # Errors
    /// Returns `ConnError::NoResources` if every slot is in use
    pub fn alloc(&mut self, role: ConnRole) -> Result<ConnId, ConnError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(ConnError::NoResources)?;
        let id = ConnId::new(u8::try_from(index + 1).map_err(|_| ConnError::NoResources)?);
        *slot = Some(ConnCcb::new(id, role));
        debug!("[DM] Allocated control block {}", id.raw());
        Ok(id)
    }

    /// Release a control block
    pub fn release(&mut self, id: ConnId) -> Option<ConnCcb> {
        let ccb = id
            .slot()
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::take);
        if ccb.is_some() {
            debug!("[DM] Released control block {}", id.raw());
        }
        ccb
    }

    /// Get a control block by id
    #[must_use]
    pub fn get(&self, id: ConnId) -> Option<&ConnCcb> {
        id.slot()
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }

    /// Get a mutable control block by id
    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut ConnCcb> {
        id.slot()
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
    }

    /// Find the first control block matching `predicate`
    pub fn find(&self, mut predicate: impl FnMut(&ConnCcb) -> bool) -> Option<ConnId> {
        self.iter().find(|ccb| predicate(ccb)).map(ConnCcb::id)
    }

    /// Find the control block owning a controller connection handle
    #[must_use]
    pub fn find_by_handle(&self, handle: u16) -> Option<ConnId> {
        self.find(|ccb| ccb.handle == Some(handle))
    }

    /// Find a control block in the given state
    #[must_use]
    pub fn find_by_state(&self, state: ConnState) -> Option<ConnId> {
        self.find(|ccb| ccb.state == state)
    }

    /// Iterate over allocated control blocks
    pub fn iter(&self) -> impl Iterator<Item = &ConnCcb> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Number of allocated control blocks
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no control block is allocated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of established links
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.iter().filter(|ccb| ccb.is_open()).count()
    }
}

impl<const N: usize> Default for ConnTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_id_none() {
        assert!(ConnId::NONE.is_none());
        assert!(!ConnId::new(1).is_none());
        assert_eq!(ConnId::new(3).raw(), 3);
    }

    #[test]
    fn test_new_ccb_is_idle() {
        let ccb = ConnCcb::new(ConnId::new(1), ConnRole::Peripheral);
        assert_eq!(ccb.state(), ConnState::Idle);
        assert_eq!(ccb.role(), ConnRole::Peripheral);
        assert_eq!(ccb.handle(), None);
        assert_eq!(ccb.peer(), None);
        assert_eq!(ccb.close_reason(), HCI_ERR_REMOTE_TERMINATED);
        assert!(!ccb.is_open());
        assert!(!ccb.is_pending());
    }

    #[test]
    fn test_table_allocates_ids_from_one() {
        let mut table = ConnTable::<2>::new();
        assert!(table.is_empty());

        let first = table.alloc(ConnRole::Central).unwrap();
        let second = table.alloc(ConnRole::Peripheral).unwrap();

        assert_eq!(first, ConnId::new(1));
        assert_eq!(second, ConnId::new(2));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(second).unwrap().role(), ConnRole::Peripheral);
    }

    #[test]
    fn test_table_exhaustion_and_reuse() {
        let mut table = ConnTable::<2>::new();
        let first = table.alloc(ConnRole::Central).unwrap();
        table.alloc(ConnRole::Central).unwrap();

        assert_eq!(table.alloc(ConnRole::Central), Err(ConnError::NoResources));

        assert!(table.release(first).is_some());
        assert!(table.release(first).is_none());
        assert_eq!(table.alloc(ConnRole::Peripheral), Ok(first));
    }

    #[test]
    fn test_table_rejects_unknown_ids() {
        let mut table = ConnTable::<2>::new();
        assert!(table.get(ConnId::NONE).is_none());
        assert!(table.get(ConnId::new(5)).is_none());
        assert!(table.get_mut(ConnId::new(1)).is_none());
        assert!(table.release(ConnId::NONE).is_none());
    }

    #[test]
    fn test_table_lookups() {
        let mut table = ConnTable::<4>::new();
        let a = table.alloc(ConnRole::Central).unwrap();
        let b = table.alloc(ConnRole::Peripheral).unwrap();

        {
            let ccb = table.get_mut(a).unwrap();
            ccb.state = ConnState::Connected;
            ccb.handle = Some(0x0040);
        }
        table.get_mut(b).unwrap().state = ConnState::Accepting;

        assert_eq!(table.find_by_handle(0x0040), Some(a));
        assert_eq!(table.find_by_handle(0x0041), None);
        assert_eq!(table.find_by_state(ConnState::Accepting), Some(b));
        assert_eq!(table.find_by_state(ConnState::Connecting), None);
        assert_eq!(table.connected_count(), 1);
    }
}
