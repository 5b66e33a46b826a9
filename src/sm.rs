//! Connection State Machine Driver
//!
//! [`execute`] drives one message through one control block: classify the event, look
//! up the transition, commit the next state, then dispatch the action. The state is
//! always committed before the action runs, so handlers observe the new state.

use crate::action::{ActionCode, ActionRegistry, Dispatch};
use crate::ccb::ConnCcb;
use crate::event::ConnMsg;
use crate::output::ActionOutput;
use crate::state::lookup;

/// Execute the connection state machine for one message
pub fn execute(registry: &ActionRegistry<'_>, ccb: &mut ConnCcb, msg: &ConnMsg, out: &mut ActionOutput) {
    let event = msg.conn_event();
    let entry = lookup(ccb.state, event);

    trace!(
        "[DM] conn {}: event {} ({:?}) state {:?} -> {:?} action {}",
        ccb.id.raw(),
        msg.event,
        event,
        ccb.state,
        entry.next,
        entry.action.raw()
    );

    ccb.state = entry.next;

    if let Dispatch::Fallback(code) = registry.dispatch(entry.action, ccb, msg, out) {
        if code != ActionCode::NONE {
            warn!(
                "[DM] conn {}: action set {} not registered, action {} skipped",
                ccb.id.raw(),
                code.set_id(),
                code.raw()
            );
        }
    }
}
