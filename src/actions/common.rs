//! Role independent connection actions.

use crate::action::ActionFn;
use crate::ccb::ConnCcb;
use crate::constants::HCI_SUCCESS;
use crate::event::{ConnMsg, MsgPayload};
use crate::output::{ActionOutput, DmEvent, HciCommand};

/// Main action set, indexed by handler index
pub static MAIN_ACTIONS: [ActionFn; 6] = [
    act_none,
    act_close,
    act_conn_opened,
    act_conn_failed,
    act_conn_closed,
    act_hci_updated,
];

/// No action
pub fn act_none(ccb: &mut ConnCcb, msg: &ConnMsg, _out: &mut ActionOutput) {
    trace!(
        "[DM] conn {}: no action for event {}",
        ccb.id.raw(),
        msg.event
    );
}

/// Record a completed link on the control block and tell the application about it.
/// The local role is the one the controller reported.
pub(crate) fn conn_established(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    let MsgPayload::ConnComplete {
        handle,
        role,
        peer,
        params,
    } = msg.payload
    else {
        warn!("[DM] conn {}: completion without link data", ccb.id.raw());
        return;
    };

    ccb.role = role;
    ccb.handle = Some(handle);
    ccb.peer = Some(peer);
    ccb.params = Some(params);

    info!(
        "[DM] conn {} opened: handle {} role {:?}",
        ccb.id.raw(),
        handle,
        role
    );
    out.notify(DmEvent::ConnOpened {
        conn_id: ccb.id,
        handle,
        role,
        peer,
        params,
    });
}

/// Tell the application the connection is gone.
pub(crate) fn notify_closed(ccb: &ConnCcb, status: u8, reason: u8, out: &mut ActionOutput) {
    info!(
        "[DM] conn {} closed: status {} reason {}",
        ccb.id.raw(),
        status,
        reason
    );
    out.notify(DmEvent::ConnClosed {
        conn_id: ccb.id,
        handle: ccb.handle,
        status,
        reason,
    });
}

/// Disconnect the link. A completion arriving after a local cancel carries the handle
/// of the link that has to be torn down.
fn act_close(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    match msg.payload {
        MsgPayload::Close { reason } => ccb.close_reason = reason,
        MsgPayload::ConnComplete {
            handle,
            role,
            peer,
            params,
        } => {
            ccb.handle = Some(handle);
            ccb.role = role;
            ccb.peer = Some(peer);
            ccb.params = Some(params);
        }
        _ => {}
    }

    match ccb.handle {
        Some(handle) => out.command(HciCommand::Disconnect {
            handle,
            reason: ccb.close_reason,
        }),
        None => warn!("[DM] conn {}: close without a handle", ccb.id.raw()),
    }
}

fn act_conn_opened(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    conn_established(ccb, msg, out);
}

/// Closure reason carried by a message: the disconnect reason, else the status.
pub(crate) fn close_reason(msg: &ConnMsg) -> u8 {
    match msg.payload {
        MsgPayload::Disconnect { reason, .. } => reason,
        _ => msg.status,
    }
}

fn act_conn_failed(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    warn!("[DM] conn {}: open failed, status {}", ccb.id.raw(), msg.status);
    notify_closed(ccb, msg.status, close_reason(msg), out);
}

fn act_conn_closed(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    notify_closed(ccb, msg.status, close_reason(msg), out);
}

fn act_hci_updated(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    if msg.status == HCI_SUCCESS {
        if let MsgPayload::Update { params, .. } = msg.payload {
            ccb.params = Some(params);
        }
    }

    debug!("[DM] conn {} updated: status {}", ccb.id.raw(), msg.status);
    out.notify(DmEvent::ConnUpdated {
        conn_id: ccb.id,
        status: msg.status,
        params: ccb.params.unwrap_or_default(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceAddress;
    use crate::ccb::{ConnId, ConnRole};
    use crate::constants::HCI_ERR_UNKNOWN_CONN_ID;
    use crate::event::ConnEvent;
    use crate::params::ConnParams;

    const PEER: DeviceAddress = DeviceAddress::public([1, 2, 3, 4, 5, 6]);
    const PARAMS: ConnParams = ConnParams {
        interval: 0x0018,
        latency: 0,
        supervision_timeout: 0x0258,
    };

    fn complete(id: ConnId, handle: u16) -> ConnMsg {
        ConnMsg::new(ConnEvent::HciConnComplete, id).with_payload(MsgPayload::ConnComplete {
            handle,
            role: ConnRole::Central,
            peer: PEER,
            params: PARAMS,
        })
    }

    #[test]
    fn test_conn_opened_records_link() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Peripheral);
        let mut out = ActionOutput::new();

        let msg = complete(ccb.id, 0x0040);
        act_conn_opened(&mut ccb, &msg, &mut out);

        assert_eq!(ccb.handle(), Some(0x0040));
        assert_eq!(ccb.role(), ConnRole::Central);
        assert_eq!(ccb.peer(), Some(PEER));
        assert_eq!(ccb.params(), Some(PARAMS));
        assert_eq!(
            out.events.as_slice(),
            &[DmEvent::ConnOpened {
                conn_id: ccb.id,
                handle: 0x0040,
                role: ConnRole::Central,
                peer: PEER,
                params: PARAMS,
            }]
        );
    }

    #[test]
    fn test_conn_opened_takes_role_from_completion() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::new(ConnEvent::HciConnComplete, ccb.id).with_payload(
            MsgPayload::ConnComplete {
                handle: 0x0043,
                role: ConnRole::Peripheral,
                peer: PEER,
                params: PARAMS,
            },
        );

        act_conn_opened(&mut ccb, &msg, &mut out);

        assert_eq!(ccb.role(), ConnRole::Peripheral);
        assert!(matches!(
            out.events.as_slice(),
            [DmEvent::ConnOpened { role: ConnRole::Peripheral, .. }]
        ));
    }

    #[test]
    fn test_close_uses_requested_reason() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        ccb.handle = Some(0x0041);
        let mut out = ActionOutput::new();

        let msg = ConnMsg::close(ccb.id, 0x15);
        act_close(&mut ccb, &msg, &mut out);

        assert_eq!(
            out.commands.as_slice(),
            &[HciCommand::Disconnect {
                handle: 0x0041,
                reason: 0x15
            }]
        );
    }

    #[test]
    fn test_close_adopts_late_completion_handle() {
        let mut ccb = ConnCcb::new(ConnId::new(2), ConnRole::Central);
        let mut out = ActionOutput::new();

        let msg = complete(ccb.id, 0x0042);
        act_close(&mut ccb, &msg, &mut out);

        assert_eq!(ccb.handle(), Some(0x0042));
        assert_eq!(
            out.commands.as_slice(),
            &[HciCommand::Disconnect {
                handle: 0x0042,
                reason: ccb.close_reason()
            }]
        );
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_close_without_handle_issues_nothing() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        let mut out = ActionOutput::new();

        let msg = ConnMsg::close(ccb.id, 0x13);
        act_close(&mut ccb, &msg, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn test_conn_closed_reports_disconnect_reason() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        ccb.handle = Some(0x0040);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::new(ConnEvent::HciDisconnectComplete, ccb.id)
            .with_payload(MsgPayload::Disconnect {
                handle: 0x0040,
                reason: 0x08,
            });

        act_conn_closed(&mut ccb, &msg, &mut out);

        assert_eq!(
            out.events.as_slice(),
            &[DmEvent::ConnClosed {
                conn_id: ccb.id,
                handle: Some(0x0040),
                status: HCI_SUCCESS,
                reason: 0x08,
            }]
        );
    }

    #[test]
    fn test_conn_failed_reports_status() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::new(ConnEvent::HciConnCompleteFail, ccb.id)
            .with_status(HCI_ERR_UNKNOWN_CONN_ID);

        act_conn_failed(&mut ccb, &msg, &mut out);

        assert_eq!(
            out.events.as_slice(),
            &[DmEvent::ConnClosed {
                conn_id: ccb.id,
                handle: None,
                status: HCI_ERR_UNKNOWN_CONN_ID,
                reason: HCI_ERR_UNKNOWN_CONN_ID,
            }]
        );
    }

    #[test]
    fn test_hci_updated_keeps_params_on_failure() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        ccb.params = Some(PARAMS);
        let mut out = ActionOutput::new();
        let faster = ConnParams {
            interval: 0x0006,
            ..PARAMS
        };
        let id = ccb.id;
        let update = |status| {
            ConnMsg::new(ConnEvent::HciConnUpdateComplete, id)
                .with_status(status)
                .with_payload(MsgPayload::Update {
                    handle: 0x0040,
                    params: faster,
                })
        };

        act_hci_updated(&mut ccb, &update(0x3B), &mut out);
        assert_eq!(ccb.params(), Some(PARAMS));

        act_hci_updated(&mut ccb, &update(HCI_SUCCESS), &mut out);
        assert_eq!(ccb.params(), Some(faster));
        assert_eq!(out.events.len(), 2);
    }

    #[test]
    fn test_none_does_nothing() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        let before = ccb;
        let mut out = ActionOutput::new();

        let msg = ConnMsg::new(ConnEvent::ApiOpen, ccb.id);
        act_none(&mut ccb, &msg, &mut out);

        assert_eq!(ccb, before);
        assert!(out.is_empty());
    }
}
