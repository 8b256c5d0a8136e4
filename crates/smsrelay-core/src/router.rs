//! Notification fan-out.
//!
//! Every known destination gets its counter bumped for every notification,
//! matched or not; only destinations whose interest set contains the number
//! receive the forwarded message. Counting unmatched destinations mirrors the
//! behavior operators have been reporting against, so it stays until a
//! product decision changes it (see DESIGN.md).

use tracing::{error, warn};

use crate::{
    domain::{ChatId, Notification},
    formatting::render_notification,
    messaging::MessagingPort,
    store::InterestStore,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Destinations whose set contained the number.
    pub attempted: usize,
    /// Sends that actually succeeded.
    pub delivered: usize,
}

/// Fan one notification out to every interested destination.
///
/// One destination's send failure never blocks the rest. Rate-limit backoff
/// for a single send is the messenger's job (retry-after handling lives in
/// the adapter). After the fan-out, a single flush persists the updated
/// counters, but only if something was delivered.
pub async fn route(
    store: &mut InterestStore,
    messenger: &dyn MessagingPort,
    note: &Notification,
) -> RouteOutcome {
    let html = render_notification(note);
    let mut outcome = RouteOutcome::default();

    for destination in store.destinations() {
        store.record_delivery(destination, &note.phone_number);

        if !store.contains(destination, &note.phone_number) {
            continue;
        }

        outcome.attempted += 1;
        match messenger.send_html(ChatId(destination), &html).await {
            Ok(_) => outcome.delivered += 1,
            Err(e) => warn!(
                "forward to chat {destination} failed for {}: {e}",
                note.phone_number
            ),
        }
    }

    if outcome.delivered > 0 {
        if let Err(e) = store.flush() {
            error!("persisting delivery counters failed: {e}");
        }
    }

    outcome
}
