//! Context switch handler
//!
//! Documents are resolved through the document store; quotes and products are
//! referenced as given. Every switch claims its slot on arrival, so a slow
//! document lookup never overwrites a switch requested after it.

use super::{HandlerContext, HandlerResult};
use crate::protocol::{AckPayload, ContextPayload, ContextUpdatedPayload, Envelope};
use livechat_core::{ChatMessage, ContextKind, ContextRef, DomainError};

pub(super) fn handle(ctx: &HandlerContext, payload: ContextPayload) -> HandlerResult<()> {
    let ticket = ctx.state.sessions().begin_context_switch(&ctx.session_id)?;

    match payload.kind {
        ContextKind::Document => {
            let documents = ctx.state.collaborators().documents.clone();
            let task_ctx = ctx.clone();
            ctx.spawn_call("fetch_document", async move {
                let document = documents
                    .fetch_document(&payload.id)
                    .await?
                    .ok_or_else(|| DomainError::DocumentNotFound(payload.id.clone()))?;
                apply(&task_ctx, ticket, document.to_context()).map(Some)
            });
        }
        ContextKind::Quote | ContextKind::Product => {
            let mut context = ContextRef::new(payload.kind, payload.id);
            if let Some(title) = payload.title {
                context = context.with_title(title);
            }
            ctx.reply(apply(ctx, ticket, context)?);
        }
    }
    Ok(())
}

/// Replace the session context and record the switch in its history
///
/// A superseded switch changes nothing and is acknowledged as unchanged.
fn apply(ctx: &HandlerContext, ticket: u64, context: ContextRef) -> HandlerResult<Envelope> {
    let notice = context.switch_notice();
    let applied = ctx.state.sessions().apply_context_switch(
        &ctx.session_id,
        ticket,
        context.clone(),
        ChatMessage::system(notice.clone()),
    )?;

    if !applied {
        tracing::debug!(
            session_id = %ctx.session_id,
            context_id = %context.id,
            "Context switch superseded"
        );
        return Ok(Envelope::ack(AckPayload::changed(false)).with_session(ctx.session_id.clone()));
    }

    tracing::info!(session_id = %ctx.session_id, notice = %notice, "Context switched");
    Ok(
        Envelope::context_updated(ContextUpdatedPayload { context, notice })
            .with_session(ctx.session_id.clone()),
    )
}
