//! Typing handlers

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::presence::TypingChange;
use livechat_core::RoomId;

pub(super) fn start(ctx: &HandlerContext, room: &RoomId) -> HandlerResult<()> {
    check(ctx.state.presence().start_typing(ctx.connection_id, room), room)
}

pub(super) fn stop(ctx: &HandlerContext, room: &RoomId) -> HandlerResult<()> {
    check(ctx.state.presence().stop_typing(ctx.connection_id, room), room)
}

fn check(change: TypingChange, room: &RoomId) -> HandlerResult<()> {
    match change {
        TypingChange::Changed | TypingChange::Unchanged => Ok(()),
        TypingChange::NotInRoom => Err(HandlerError::NotInRoom(room.clone())),
    }
}
