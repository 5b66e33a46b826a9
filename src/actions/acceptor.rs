//! Acceptor (peripheral) connection actions.

use crate::action::ActionFn;
use crate::actions::common::{close_reason, conn_established, notify_closed};
use crate::ccb::{ConnCcb, ConnRole};
use crate::constants::HCI_ERR_LOCAL_TERMINATED;
use crate::event::{ConnMsg, MsgPayload};
use crate::output::{ActionOutput, HciCommand};

/// Acceptor action set, indexed by handler index
pub static ACCEPTOR_ACTIONS: [ActionFn; 4] = [
    act_accept,
    act_cancel_accept,
    act_conn_accepted,
    act_accept_failed,
];

/// Start connectable advertising
fn act_accept(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    ccb.role = ConnRole::Peripheral;
    if let MsgPayload::Accept { peer } = msg.payload {
        ccb.peer = peer;
    }

    debug!("[DM] conn {}: accepting", ccb.id.raw());
    out.command(HciCommand::LeSetAdvEnable(true));
}

/// Stop advertising and report the request as closed locally
fn act_cancel_accept(ccb: &mut ConnCcb, _msg: &ConnMsg, out: &mut ActionOutput) {
    out.command(HciCommand::LeSetAdvEnable(false));
    notify_closed(ccb, HCI_ERR_LOCAL_TERMINATED, HCI_ERR_LOCAL_TERMINATED, out);
}

fn act_conn_accepted(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    conn_established(ccb, msg, out);
}

fn act_accept_failed(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    warn!("[DM] conn {}: accept failed, status {}", ccb.id.raw(), msg.status);
    notify_closed(ccb, msg.status, close_reason(msg), out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceAddress;
    use crate::ccb::ConnId;
    use crate::event::ConnEvent;
    use crate::output::DmEvent;
    use crate::params::ConnParams;

    #[test]
    fn test_accept_starts_advertising() {
        let peer = DeviceAddress::public([6, 5, 4, 3, 2, 1]);
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::accept(ccb.id, Some(peer));

        act_accept(&mut ccb, &msg, &mut out);

        assert_eq!(ccb.role(), ConnRole::Peripheral);
        assert_eq!(ccb.peer(), Some(peer));
        assert_eq!(out.commands.as_slice(), &[HciCommand::LeSetAdvEnable(true)]);
    }

    #[test]
    fn test_cancel_accept_stops_advertising_and_notifies() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Peripheral);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::close(ccb.id, 0x13);

        act_cancel_accept(&mut ccb, &msg, &mut out);

        assert_eq!(out.commands.as_slice(), &[HciCommand::LeSetAdvEnable(false)]);
        assert_eq!(
            out.events.as_slice(),
            &[DmEvent::ConnClosed {
                conn_id: ccb.id,
                handle: None,
                status: HCI_ERR_LOCAL_TERMINATED,
                reason: HCI_ERR_LOCAL_TERMINATED,
            }]
        );
    }

    #[test]
    fn test_conn_accepted_records_peripheral_link() {
        let peer = DeviceAddress::public([6, 5, 4, 3, 2, 1]);
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::new(ConnEvent::HciConnComplete, ccb.id).with_payload(
            MsgPayload::ConnComplete {
                handle: 0x0001,
                role: ConnRole::Peripheral,
                peer,
                params: ConnParams::default(),
            },
        );

        act_conn_accepted(&mut ccb, &msg, &mut out);

        assert_eq!(ccb.role(), ConnRole::Peripheral);
        assert_eq!(ccb.handle(), Some(0x0001));
        assert!(matches!(
            out.events.as_slice(),
            [DmEvent::ConnOpened {
                role: ConnRole::Peripheral,
                ..
            }]
        ));
    }

    #[test]
    fn test_accept_failed_reports_status() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Peripheral);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::new(ConnEvent::HciConnCompleteFail, ccb.id).with_status(0x3C);

        act_accept_failed(&mut ccb, &msg, &mut out);

        assert!(out.commands.is_empty());
        assert_eq!(
            out.events.as_slice(),
            &[DmEvent::ConnClosed {
                conn_id: ccb.id,
                handle: None,
                status: 0x3C,
                reason: 0x3C,
            }]
        );
    }
}
