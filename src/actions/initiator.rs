//! Initiator (central) connection actions.

use crate::action::ActionFn;
use crate::ccb::{ConnCcb, ConnRole};
use crate::event::{ConnMsg, MsgPayload};
use crate::output::{ActionOutput, HciCommand};

/// Initiator action set, indexed by handler index
pub static INITIATOR_ACTIONS: [ActionFn; 2] = [act_open, act_cancel_open];

/// Start creating a connection to the requested peer
fn act_open(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    let MsgPayload::Open {
        peer,
        own_addr_kind,
        scan,
        spec,
    } = msg.payload
    else {
        warn!("[DM] conn {}: open without a peer", ccb.id.raw());
        return;
    };

    ccb.role = ConnRole::Central;
    ccb.peer = Some(peer);

    debug!("[DM] conn {}: creating connection", ccb.id.raw());
    out.command(HciCommand::LeCreateConn {
        peer,
        own_addr_kind,
        scan,
        spec,
    });
}

/// Cancel a pending create connection; the controller answers with a failed completion
fn act_cancel_open(ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    if let MsgPayload::Close { reason } = msg.payload {
        ccb.close_reason = reason;
    }

    debug!("[DM] conn {}: cancelling connection", ccb.id.raw());
    out.command(HciCommand::LeCreateConnCancel);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccb::ConnId;
    use crate::params::{ConnSpec, ScanParams};
    use crate::{AddressKind, DeviceAddress};

    #[test]
    fn test_open_issues_create_connection() {
        let peer = DeviceAddress::random([0xC0, 1, 2, 3, 4, 5]);
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Peripheral);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::open(
            ccb.id,
            peer,
            AddressKind::Random,
            ScanParams::default(),
            ConnSpec::default(),
        );

        act_open(&mut ccb, &msg, &mut out);

        assert_eq!(ccb.role(), ConnRole::Central);
        assert_eq!(ccb.peer(), Some(peer));
        assert_eq!(
            out.commands.as_slice(),
            &[HciCommand::LeCreateConn {
                peer,
                own_addr_kind: AddressKind::Random,
                scan: ScanParams::default(),
                spec: ConnSpec::default(),
            }]
        );
    }

    #[test]
    fn test_cancel_open_remembers_reason() {
        let mut ccb = ConnCcb::new(ConnId::new(1), ConnRole::Central);
        let mut out = ActionOutput::new();
        let msg = ConnMsg::close(ccb.id, 0x15);

        act_cancel_open(&mut ccb, &msg, &mut out);

        assert_eq!(ccb.close_reason(), 0x15);
        assert_eq!(out.commands.as_slice(), &[HciCommand::LeCreateConnCancel]);
        assert!(out.events.is_empty());
    }
}
