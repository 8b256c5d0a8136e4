//! Inbound relay intake (subscription strategy).

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use tracing::{info, warn};

use smsrelay_core::{extract::extract_notification, router::route};

use crate::dispatch::AppState;

/// Handle one message from the source chat: only text messages from the
/// configured relay identity are candidate notifications; everything else is
/// ignored without logging (the source group carries unrelated chatter).
pub async fn handle_relay(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let sender = msg.from().map(|u| u.id.0 as i64);
    if sender != Some(state.cfg.relay_sender_id) {
        return Ok(());
    }

    let Some(text) = msg.text() else {
        warn!("relay message {} is not text, skipping", msg.id.0);
        return Ok(());
    };

    let Some(note) = extract_notification(text) else {
        warn!("relay message {} has no phone number, dropped", msg.id.0);
        return Ok(());
    };

    let mut store = state.store.lock().await;
    let outcome = route(&mut store, state.messenger.as_ref(), &note).await;
    info!(
        "message {} routed for {}: {}/{} delivered",
        msg.id.0, note.phone_number, outcome.delivered, outcome.attempted
    );

    Ok(())
}
