//! Device Manager - owner of the connection control blocks
//!
//! The [`DeviceManager`] is the single place where connection messages are created and
//! driven. It owns a fixed-capacity [`ConnTable`] and the [`ActionRegistry`] built at
//! startup, and turns both application requests and controller completions into
//! [`ConnMsg`]s for the state machine.
//!
//! ## Control block lifetime
//!
//! 1. `open` and `accept` allocate a control block and drive `ApiOpen`/`ApiAccept`
//! 2. Controller completions are routed to the block they belong to (see below)
//! 3. After every driven message, a block whose state is back to `Idle` is released
//!
//! ## Routing of controller events
//!
//! Controller events carry a connection handle at best, never a connection id. The
//! manager resolves the target block as follows:
//!
//! - Successful connection complete in the central role: the pending initiator, else
//!   the cancelling initiator that has no handle yet. Only one create connection is
//!   ever outstanding, so the reported peer is not compared; the controller may report
//!   a resolved identity address. A central link nobody asked for is disconnected
//! - Successful connection complete in the peripheral role: the pending acceptor. If
//!   none exists, the link is inbound and unrequested: a fresh block is allocated for
//!   it, or the link is rejected with `Disconnect(handle, 0x14)` when the table is full
//! - Failed connection complete: the pending or cancelling block, dropped otherwise
//! - Disconnection and connection update complete: by handle
//! - Create connection cancel complete: the cancelling initiator
//!
//! All work produced by the actions is collected into the caller's [`ActionOutput`];
//! the manager itself never touches the controller.

use crate::action::ActionRegistry;
use crate::actions::default_registry;
use crate::ccb::{ConnCcb, ConnId, ConnRole, ConnTable};
use crate::constants::{
    HCI_ERR_ADV_TIMEOUT, HCI_ERR_LOW_RESOURCES, HCI_ERR_REMOTE_TERMINATED, HCI_SUCCESS,
    MAX_CONNECTIONS,
};
use crate::event::{ConnEvent, ConnMsg, MsgPayload};
use crate::hci::HciConnEvent;
use crate::output::{ActionOutput, HciCommand};
use crate::params::ConnSpec;
use crate::sm;
use crate::state::ConnState;
use crate::{ConnError, DeviceAddress, DmConnOptions};

/// Device Manager connection front end
///
/// `N` is the number of control blocks, i.e. the maximum number of links plus pending
/// requests handled at the same time.
#[derive(Debug)]
pub struct DeviceManager<'a, const N: usize = MAX_CONNECTIONS> {
    table: ConnTable<N>,
    registry: ActionRegistry<'a>,
    options: DmConnOptions,
}

impl<'a, const N: usize> DeviceManager<'a, N> {
    /// Create a manager driving actions from `registry`
    #[must_use]
    pub const fn new(registry: ActionRegistry<'a>, options: DmConnOptions) -> Self {
        Self {
            table: ConnTable::new(),
            registry,
            options,
        }
    }

    /// Get a reference to the options
    #[must_use]
    pub fn options(&self) -> &DmConnOptions {
        &self.options
    }

    /// Get a reference to the action registry
    #[must_use]
    pub fn registry(&self) -> &ActionRegistry<'a> {
        &self.registry
    }

    /// Start an outgoing connection to `peer`
    ///
    /// Scan and connection parameters come from the manager options.
    ///
    /// # Errors
    /// - `ConnError::AlreadyInProgress` if another outgoing connection is pending
    /// - `ConnError::InvalidParameter` if the configured connection parameters are invalid
    /// - `ConnError::NoResources` if no control block is free
    pub fn open(&mut self, peer: DeviceAddress, out: &mut ActionOutput) -> Result<ConnId, ConnError> {
        if self.initiator().is_some() {
            return Err(ConnError::AlreadyInProgress);
        }
        if !self.options.conn_spec.is_valid() {
            return Err(ConnError::InvalidParameter);
        }

        let id = self.table.alloc(ConnRole::Central)?;
        info!(
            "[DM] conn {}: opening to {}",
            id.raw(),
            peer.format_hex().as_str()
        );
        let msg = ConnMsg::open(
            id,
            peer,
            self.options.own_addr_kind,
            self.options.scan,
            self.options.conn_spec,
        );
        self.execute(&msg, out)?;
        Ok(id)
    }

    /// Start accepting an incoming connection, optionally from one peer only
    ///
    /// # Errors
    /// - `ConnError::AlreadyInProgress` if the device is already accepting
    /// - `ConnError::NoResources` if no control block is free
    pub fn accept(
        &mut self,
        peer: Option<DeviceAddress>,
        out: &mut ActionOutput,
    ) -> Result<ConnId, ConnError> {
        if self.table.find_by_state(ConnState::Accepting).is_some() {
            return Err(ConnError::AlreadyInProgress);
        }

        let id = self.table.alloc(ConnRole::Peripheral)?;
        self.execute(&ConnMsg::accept(id, peer), out)?;
        Ok(id)
    }

    /// Close a connection, or cancel a pending open or accept
    ///
    /// # Errors
    /// Returns `ConnError::UnknownConnection` if `id` is not allocated
    pub fn close(&mut self, id: ConnId, reason: u8, out: &mut ActionOutput) -> Result<(), ConnError> {
        self.execute(&ConnMsg::close(id, reason), out)
    }

    /// Request new parameters for an established link
    ///
    /// The request goes straight to the controller; the completion comes back as a
    /// connection update event for the same handle.
    ///
    /// # Errors
    /// - `ConnError::UnknownConnection` if `id` is not allocated
    /// - `ConnError::InvalidState` if the link is not connected
    /// - `ConnError::InvalidParameter` if `spec` is invalid
    pub fn update(&mut self, id: ConnId, spec: ConnSpec, out: &mut ActionOutput) -> Result<(), ConnError> {
        let ccb = self.table.get(id).ok_or(ConnError::UnknownConnection)?;
        let handle = match (ccb.state(), ccb.handle()) {
            (ConnState::Connected, Some(handle)) => handle,
            _ => return Err(ConnError::InvalidState),
        };
        if !spec.is_valid() {
            return Err(ConnError::InvalidParameter);
        }

        debug!("[DM] conn {}: updating parameters", id.raw());
        out.command(HciCommand::LeConnUpdate { handle, spec });
        Ok(())
    }

    /// Drive `msg` into the control block it addresses
    ///
    /// The block is released when the message leaves it `Idle`.
    ///
    /// # Errors
    /// Returns `ConnError::UnknownConnection` if the addressed block is not allocated
    pub fn execute(&mut self, msg: &ConnMsg, out: &mut ActionOutput) -> Result<(), ConnError> {
        let ccb = self
            .table
            .get_mut(msg.conn_id)
            .ok_or(ConnError::UnknownConnection)?;
        sm::execute(&self.registry, ccb, msg, out);

        if ccb.state() == ConnState::Idle {
            self.table.release(msg.conn_id);
        }
        Ok(())
    }

    /// Route a controller event to its control block and drive it
    ///
    /// Returns the id of the block that received the event, `None` if the event was
    /// dropped or the link was rejected.
    pub fn handle_hci(&mut self, event: HciConnEvent, out: &mut ActionOutput) -> Option<ConnId> {
        let (id, msg) = match event {
            HciConnEvent::ConnComplete {
                status,
                handle,
                role,
                peer,
                params,
            } if status == HCI_SUCCESS => {
                let id = match role {
                    ConnRole::Central => self.unrequested_central(handle, out)?,
                    ConnRole::Peripheral => match self.table.find_by_state(ConnState::Accepting) {
                        Some(id) => id,
                        None => self.alloc_inbound(handle, out)?,
                    },
                };
                let msg = ConnMsg::new(ConnEvent::HciConnComplete, id).with_payload(
                    MsgPayload::ConnComplete {
                        handle,
                        role,
                        peer,
                        params,
                    },
                );
                (id, msg)
            }
            HciConnEvent::ConnComplete { status, .. } => {
                let Some(id) = self.failure_target(status) else {
                    debug!("[DM] Dropping failed completion, status {}", status);
                    return None;
                };
                let msg = ConnMsg::new(ConnEvent::HciConnCompleteFail, id).with_status(status);
                (id, msg)
            }
            HciConnEvent::Disconnect {
                status,
                handle,
                reason,
            } => {
                let id = self.by_handle(handle)?;
                let msg = ConnMsg::new(ConnEvent::HciDisconnectComplete, id)
                    .with_status(status)
                    .with_payload(MsgPayload::Disconnect { handle, reason });
                (id, msg)
            }
            HciConnEvent::ConnUpdate {
                status,
                handle,
                params,
            } => {
                let id = self.by_handle(handle)?;
                let msg = ConnMsg::new(ConnEvent::HciConnUpdateComplete, id)
                    .with_status(status)
                    .with_payload(MsgPayload::Update { handle, params });
                (id, msg)
            }
            HciConnEvent::CreateConnCancel { status } => {
                let Some(id) = self.cancelling() else {
                    debug!("[DM] Dropping create connection cancel complete");
                    return None;
                };
                let msg =
                    ConnMsg::new(ConnEvent::HciCreateConnCancelComplete, id).with_status(status);
                (id, msg)
            }
        };

        self.execute(&msg, out).ok().map(|()| id)
    }

    /// Current state of a connection, `Idle` blocks are never held
    #[must_use]
    pub fn state(&self, id: ConnId) -> Option<ConnState> {
        self.table.get(id).map(ConnCcb::state)
    }

    /// Whether the link of `id` is up
    #[must_use]
    pub fn is_open(&self, id: ConnId) -> bool {
        self.table.get(id).is_some_and(ConnCcb::is_open)
    }

    /// Control block of `id`
    #[must_use]
    pub fn ccb(&self, id: ConnId) -> Option<&ConnCcb> {
        self.table.get(id)
    }

    /// Connection owning a controller handle
    #[must_use]
    pub fn find_by_handle(&self, handle: u16) -> Option<ConnId> {
        self.table.find_by_handle(handle)
    }

    /// Number of established links
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.table.connected_count()
    }

    /// Allocated control blocks
    pub fn connections(&self) -> impl Iterator<Item = &ConnCcb> {
        self.table.iter()
    }

    /// Pending or cancelling initiator
    fn initiator(&self) -> Option<ConnId> {
        self.table
            .find_by_state(ConnState::Connecting)
            .or_else(|| self.cancelling())
    }

    /// Initiator whose create connection is being cancelled
    fn cancelling(&self) -> Option<ConnId> {
        self.table
            .find(|ccb| ccb.state() == ConnState::Disconnecting && ccb.handle().is_none())
    }

    /// Initiator owning a central-role link, or `None` after disconnecting a link
    /// that no initiator asked for
    fn unrequested_central(&self, handle: u16, out: &mut ActionOutput) -> Option<ConnId> {
        let id = self.initiator();
        if id.is_none() {
            warn!("[DM] Unrequested central link, disconnecting handle {}", handle);
            out.command(HciCommand::Disconnect {
                handle,
                reason: HCI_ERR_REMOTE_TERMINATED,
            });
        }
        id
    }

    fn failure_target(&self, status: u8) -> Option<ConnId> {
        let acceptor = self.table.find_by_state(ConnState::Accepting);
        if status == HCI_ERR_ADV_TIMEOUT {
            acceptor.or_else(|| self.initiator())
        } else {
            self.initiator().or(acceptor)
        }
    }

    fn by_handle(&self, handle: u16) -> Option<ConnId> {
        let id = self.table.find_by_handle(handle);
        if id.is_none() {
            debug!("[DM] No connection for handle {}", handle);
        }
        id
    }

    fn alloc_inbound(&mut self, handle: u16, out: &mut ActionOutput) -> Option<ConnId> {
        match self.table.alloc(ConnRole::Peripheral) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("[DM] No free control block, rejecting handle {}", handle);
                out.command(HciCommand::Disconnect {
                    handle,
                    reason: HCI_ERR_LOW_RESOURCES,
                });
                None
            }
        }
    }
}

impl<const N: usize> DeviceManager<'static, N> {
    /// Create a manager with the initiator, acceptor and main action sets registered
    #[must_use]
    pub fn with_default_roles(options: DmConnOptions) -> Self {
        Self::new(default_registry(), options)
    }
}

impl<const N: usize> Default for DeviceManager<'static, N> {
    fn default() -> Self {
        Self::with_default_roles(DmConnOptions::default())
    }
}
