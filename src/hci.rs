//! HCI adapter
//!
//! The edge between the connection state machine and a `bt-hci` controller:
//!
//! * [`translate`] turns controller events into [`HciConnEvent`]s the
//!   [`DeviceManager`](crate::manager::DeviceManager) can route
//! * [`execute_command`] runs an [`HciCommand`] produced by the actions, and
//!   [`completion_event`] / [`failure_event`] turn its result into an event when no
//!   controller event will follow
//!
//! Controller status codes reach the state machine as plain bytes.

use bt_hci::cmd::le::{LeConnUpdate, LeCreateConn, LeCreateConnCancel, LeSetAdvEnable};
use bt_hci::cmd::link_control::Disconnect;
use bt_hci::cmd::{AsyncCmd, SyncCmd};
use bt_hci::controller::{ControllerCmdAsync, ControllerCmdSync};
use bt_hci::event::Event;
use bt_hci::event::le::LeEvent;
use bt_hci::param::{AddrKind, BdAddr, ConnHandle, DisconnectReason, Duration, Status};

use crate::ccb::ConnRole;
use crate::constants::{HCI_ERR_LOW_RESOURCES, HCI_ERR_UNSPECIFIED, HCI_SUCCESS};
use crate::output::HciCommand;
use crate::params::ConnParams;
use crate::{AddressKind, ConnError, DeviceAddress};

/// Controller events relevant to the connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HciConnEvent {
    /// LE (Enhanced) Connection Complete
    ConnComplete {
        /// HCI status
        status: u8,
        /// Connection handle
        handle: u16,
        /// Local role
        role: ConnRole,
        /// Peer device
        peer: DeviceAddress,
        /// Negotiated parameters
        params: ConnParams,
    },
    /// Disconnection Complete
    Disconnect {
        /// HCI status
        status: u8,
        /// Connection handle
        handle: u16,
        /// Disconnect reason
        reason: u8,
    },
    /// LE Connection Update Complete
    ConnUpdate {
        /// HCI status
        status: u8,
        /// Connection handle
        handle: u16,
        /// New parameters
        params: ConnParams,
    },
    /// LE Create Connection Cancel finished
    ///
    /// The controller consumes its Command Complete while executing the command, so
    /// this event comes from [`completion_event`] and [`failure_event`] rather than
    /// from [`translate`].
    CreateConnCancel {
        /// HCI status
        status: u8,
    },
}

/// Translate a controller event, `None` for events the state machine does not consume
#[must_use]
pub fn translate(event: &Event<'_>) -> Option<HciConnEvent> {
    match event {
        Event::Le(LeEvent::LeConnectionComplete(e)) => Some(HciConnEvent::ConnComplete {
            status: status_code(e.status),
            handle: e.handle.raw(),
            role: e.role.into(),
            peer: peer_address(e.peer_addr_kind, e.peer_addr)?,
            params: ConnParams {
                interval: e.conn_interval.as_u16(),
                latency: e.peripheral_latency,
                supervision_timeout: e.supervision_timeout.as_u16(),
            },
        }),
        Event::Le(LeEvent::LeEnhancedConnectionComplete(e)) => Some(HciConnEvent::ConnComplete {
            status: status_code(e.status),
            handle: e.handle.raw(),
            role: e.role.into(),
            peer: peer_address(e.peer_addr_kind, e.peer_addr)?,
            params: ConnParams {
                interval: e.conn_interval.as_u16(),
                latency: e.peripheral_latency,
                supervision_timeout: e.supervision_timeout.as_u16(),
            },
        }),
        Event::Le(LeEvent::LeConnectionUpdateComplete(e)) => Some(HciConnEvent::ConnUpdate {
            status: status_code(e.status),
            handle: e.handle.raw(),
            params: ConnParams {
                interval: e.conn_interval.as_u16(),
                latency: e.peripheral_latency,
                supervision_timeout: e.supervision_timeout.as_u16(),
            },
        }),
        Event::DisconnectionComplete(e) => Some(HciConnEvent::Disconnect {
            status: status_code(e.status),
            handle: e.handle.raw(),
            reason: status_code(e.reason),
        }),
        _ => None,
    }
}

/// Execute an HCI command on the controller
///
/// # Errors
/// Returns `ConnError::HciCommandFailed` if the controller rejects the command or the
/// transport fails
pub async fn execute_command<C>(controller: &C, command: HciCommand) -> Result<(), ConnError>
where
    C: ControllerCmdSync<LeCreateConnCancel>
        + ControllerCmdSync<LeSetAdvEnable>
        + ControllerCmdAsync<LeCreateConn>
        + ControllerCmdAsync<LeConnUpdate>
        + ControllerCmdSync<Disconnect>,
{
    debug!("[HCI] Executing {:?}", command);
    let result = match command {
        HciCommand::LeCreateConn {
            peer,
            own_addr_kind,
            scan,
            spec,
        } => LeCreateConn::new(
            Duration::from_u16(scan.interval),
            Duration::from_u16(scan.window),
            false,
            peer.kind.into(),
            BdAddr::from(peer),
            own_addr_kind.into(),
            Duration::from_u16(spec.interval_min),
            Duration::from_u16(spec.interval_max),
            spec.max_latency,
            Duration::from_u16(spec.supervision_timeout),
            Duration::from_u16(spec.min_ce_length),
            Duration::from_u16(spec.max_ce_length),
        )
        .exec(controller)
        .await
        .map_err(|_| ()),
        HciCommand::LeCreateConnCancel => LeCreateConnCancel::new()
            .exec(controller)
            .await
            .map(|_| ())
            .map_err(|_| ()),
        HciCommand::Disconnect { handle, reason } => {
            Disconnect::new(ConnHandle::new(handle), disconnect_reason(reason))
                .exec(controller)
                .await
                .map_err(|_| ())
        }
        HciCommand::LeConnUpdate { handle, spec } => LeConnUpdate::new(
            ConnHandle::new(handle),
            Duration::from_u16(spec.interval_min),
            Duration::from_u16(spec.interval_max),
            spec.max_latency,
            Duration::from_u16(spec.supervision_timeout),
            Duration::from_u16(spec.min_ce_length),
            Duration::from_u16(spec.max_ce_length),
        )
        .exec(controller)
        .await
        .map_err(|_| ()),
        HciCommand::LeSetAdvEnable(enable) => LeSetAdvEnable::new(enable)
            .exec(controller)
            .await
            .map(|_| ())
            .map_err(|_| ()),
    };

    result.map_err(|()| {
        warn!("[HCI] Command failed: {:?}", command);
        ConnError::HciCommandFailed
    })
}

/// Completion of a command the controller accepted, for commands whose completion is
/// the command's own return
///
/// Only LE Create Connection Cancel qualifies; the other commands complete through
/// events read by [`translate`].
#[must_use]
pub fn completion_event(command: &HciCommand) -> Option<HciConnEvent> {
    match command {
        HciCommand::LeCreateConnCancel => Some(HciConnEvent::CreateConnCancel {
            status: HCI_SUCCESS,
        }),
        _ => None,
    }
}

/// Completion standing in for a command the controller rejected
///
/// A rejected command never produces its completion event, so the control block
/// waiting for it would stay pending forever. Advertising enable has no waiter and
/// maps to `None`.
#[must_use]
pub fn failure_event(command: &HciCommand) -> Option<HciConnEvent> {
    match *command {
        HciCommand::LeCreateConn { peer, .. } => Some(HciConnEvent::ConnComplete {
            status: HCI_ERR_UNSPECIFIED,
            handle: 0,
            role: ConnRole::Central,
            peer,
            params: ConnParams::default(),
        }),
        HciCommand::Disconnect { handle, .. } => Some(HciConnEvent::Disconnect {
            status: HCI_ERR_UNSPECIFIED,
            handle,
            reason: HCI_ERR_UNSPECIFIED,
        }),
        HciCommand::LeConnUpdate { handle, .. } => Some(HciConnEvent::ConnUpdate {
            status: HCI_ERR_UNSPECIFIED,
            handle,
            params: ConnParams::default(),
        }),
        HciCommand::LeCreateConnCancel => Some(HciConnEvent::CreateConnCancel {
            status: HCI_ERR_UNSPECIFIED,
        }),
        HciCommand::LeSetAdvEnable(_) => None,
    }
}

/// Map a disconnect reason byte to the reasons the Disconnect command accepts
///
/// Reasons outside the allowed set fall back to "remote user terminated".
#[must_use]
pub fn disconnect_reason(reason: u8) -> DisconnectReason {
    match reason {
        0x05 => DisconnectReason::AuthenticationFailure,
        HCI_ERR_LOW_RESOURCES => DisconnectReason::RemoteDeviceTerminatedConnLowResources,
        0x15 => DisconnectReason::RemoteDeviceTerminatedConnPowerOff,
        0x1A => DisconnectReason::UnsupportedRemoteFeature,
        0x29 => DisconnectReason::PairingWithUnitKeyNotSupported,
        0x3B => DisconnectReason::UnacceptableConnParameters,
        _ => DisconnectReason::RemoteUserTerminatedConn,
    }
}

fn status_code(status: Status) -> u8 {
    status.into_inner()
}

fn peer_address(kind: AddrKind, addr: BdAddr) -> Option<DeviceAddress> {
    let kind = if kind == AddrKind::RANDOM {
        AddressKind::Random
    } else {
        AddressKind::Public
    };
    DeviceAddress::try_from((kind, addr.raw())).ok()
}
