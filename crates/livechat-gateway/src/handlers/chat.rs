//! Chat handler
//!
//! Room broadcast, direct delivery (queued while the target is offline), or a
//! conversation with the responder when neither `room` nor `to` is given.

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::connection::Delivery;
use crate::protocol::{AckPayload, ChatPayload, Envelope, MessagePayload};
use livechat_core::{ChatMessage, PromptContext};

pub(super) fn handle(ctx: &HandlerContext, payload: ChatPayload) -> HandlerResult<()> {
    let ChatPayload { content, room, to } = payload;

    if let Some(room) = &room {
        if !ctx.state.rooms().is_member(ctx.connection_id, room) {
            return Err(HandlerError::NotInRoom(room.clone()));
        }
    }

    let sessions = ctx.state.sessions();
    // The responder sees the window as it was before this message
    let prompt_history = if room.is_none() && to.is_none() {
        let window = ctx.state.config().realtime.history_window;
        Some(sessions.recent_history(&ctx.session_id, window)?)
    } else {
        None
    };

    let message = ChatMessage::user(ctx.user_id.clone(), content);
    sessions.append_message(&ctx.session_id, message.clone())?;

    let target = match (&room, &to) {
        (Some(room), _) => room.to_string(),
        (None, Some(to)) => to.to_string(),
        (None, None) => ctx.session_id.to_string(),
    };
    persist(ctx, target, message.content.clone());

    if let Some(room) = room {
        let envelope = Envelope::message(MessagePayload::from_message(&message, Some(room.clone())))
            .with_sender(ctx.user_id.clone());
        let delivered = ctx.state.rooms().broadcast(&room, envelope, Some(&ctx.user_id));
        ctx.reply(Envelope::ack(AckPayload::delivered(delivered)));
    } else if let Some(to) = to {
        let envelope = Envelope::message(MessagePayload::from_message(&message, None))
            .with_sender(ctx.user_id.clone());
        let ack = match ctx.state.registry().deliver_or_enqueue(&to, envelope) {
            Delivery::Delivered(n) => AckPayload::delivered(n),
            Delivery::Queued => AckPayload::queued(),
        };
        ctx.reply(Envelope::ack(ack));
    } else {
        respond(ctx, message.content, prompt_history.unwrap_or_default())?;
    }
    Ok(())
}

fn persist(ctx: &HandlerContext, target: String, text: String) {
    let store = ctx.state.collaborators().messages.clone();
    let user_id = ctx.user_id.clone();
    ctx.spawn_call("store_message", async move {
        store.store_message(&user_id, &target, &text).await?;
        Ok::<_, HandlerError>(None)
    });
}

fn respond(ctx: &HandlerContext, prompt: String, history: Vec<ChatMessage>) -> HandlerResult<()> {
    let sessions = ctx.state.sessions().clone();
    let responder = ctx.state.collaborators().responder.clone();
    let session_id = ctx.session_id.clone();
    let prompt = PromptContext {
        user_id: ctx.user_id.clone(),
        context: sessions.context(&session_id)?,
        history,
        prompt,
    };

    ctx.spawn_call("generate", async move {
        let text = responder.generate(prompt).await?;
        let reply = ChatMessage::assistant(text);
        if let Err(e) = sessions.append_message(&session_id, reply.clone()) {
            // Session expired while the responder was working; still deliver
            tracing::debug!(session_id = %session_id, error = %e, "Reply not recorded");
        }
        Ok::<_, HandlerError>(Some(
            Envelope::message(MessagePayload::from_message(&reply, None)).with_session(session_id),
        ))
    });
    Ok(())
}
