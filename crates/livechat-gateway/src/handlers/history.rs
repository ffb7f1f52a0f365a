//! History handler

use super::{HandlerContext, HandlerResult};
use crate::protocol::{Envelope, HistoryPayload, HistoryRequest};

pub(super) fn handle(ctx: &HandlerContext, request: &HistoryRequest) -> HandlerResult<()> {
    let sessions = ctx.state.sessions();
    let messages = sessions.history(&ctx.session_id, request.limit)?;
    let context = sessions.context(&ctx.session_id)?;

    ctx.reply(
        Envelope::history(HistoryPayload {
            session_id: ctx.session_id.clone(),
            messages,
            context,
        })
        .with_session(ctx.session_id.clone()),
    );
    Ok(())
}
