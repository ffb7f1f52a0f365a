//! Presence handler

use super::{HandlerContext, HandlerResult};
use crate::presence::UserStatus;
use crate::protocol::{AckPayload, Envelope};

pub(super) fn handle(ctx: &HandlerContext, status: UserStatus) -> HandlerResult<()> {
    let changed = ctx.state.presence().set_status(ctx.connection_id, status);
    ctx.reply(Envelope::ack(AckPayload::changed(changed)));
    Ok(())
}
