//! Join and leave handlers

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::protocol::{AckPayload, Envelope, SystemPayload};
use crate::rooms::MembershipChange;
use livechat_core::RoomId;

pub(super) fn join(ctx: &HandlerContext, room: RoomId) -> HandlerResult<()> {
    let change = ctx.state.rooms().join(ctx.connection_id, &room);
    announce(ctx, change, "joined", room)
}

pub(super) fn leave(ctx: &HandlerContext, room: RoomId) -> HandlerResult<()> {
    let change = ctx.state.rooms().leave(ctx.connection_id, &room);
    announce(ctx, change, "left", room)
}

fn announce(
    ctx: &HandlerContext,
    change: MembershipChange,
    event: &str,
    room: RoomId,
) -> HandlerResult<()> {
    match change {
        MembershipChange::UnknownConnection => {
            return Err(HandlerError::Internal("connection is not registered".to_string()));
        }
        MembershipChange::Changed => {
            let notice = Envelope::system(SystemPayload::membership(
                event,
                room.clone(),
                ctx.user_id.clone(),
            ))
            .with_sender(ctx.user_id.clone());
            ctx.state.rooms().broadcast(&room, notice, Some(&ctx.user_id));
        }
        MembershipChange::Unchanged => {}
    }
    ctx.reply(Envelope::ack(AckPayload::changed(change.is_changed())));
    Ok(())
}
