//! Pull-mode listener: poll a source chat's history and route relay messages.
//!
//! The live binary listens via update subscription (the dispatcher pushes new
//! messages as they arrive), which Telegram's Bot API supports natively. This
//! module is the alternative strategy for sources that only expose paged
//! history: a fixed-period loop behind a cursor that never moves backwards
//! and never replays history from before startup.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use tracing::{error, info, warn};

use crate::{
    domain::{ChatId, SourceMessage, UserId},
    extract::extract_notification,
    messaging::MessagingPort,
    router::route,
    store::InterestStore,
    Error, Result,
};

/// Paged access to a chat's message history, newest-id discoverable.
#[async_trait]
pub trait ChatHistorySource: Send + Sync {
    /// Id of the newest message in the chat, or `None` when the chat is empty.
    async fn newest_message_id(&self, chat: ChatId) -> Result<Option<i64>>;

    /// Up to `limit` messages with ids greater than `after_id`, any order.
    async fn messages_after(
        &self,
        chat: ChatId,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<SourceMessage>>;
}

#[derive(Clone, Copy, Debug)]
pub struct PollSettings {
    pub chat: ChatId,
    pub relay_sender: UserId,
    pub interval: Duration,
    pub page_size: usize,
}

pub struct Poller {
    settings: PollSettings,
    cursor: i64,
}

impl Poller {
    /// Initialize the cursor at the chat's current newest message id, so the
    /// backlog from before startup is never replayed. An empty chat (or a
    /// failed startup fetch) starts at 0.
    pub async fn start(source: &dyn ChatHistorySource, settings: PollSettings) -> Self {
        let cursor = match source.newest_message_id(settings.chat).await {
            Ok(Some(id)) => {
                info!("polling from message id {id} in chat {}", settings.chat.0);
                id
            }
            Ok(None) => {
                warn!(
                    "source chat {} looks empty, polling from id 0",
                    settings.chat.0
                );
                0
            }
            Err(e) => {
                error!("fetching initial message id failed: {e}, polling from id 0");
                0
            }
        };

        Self { settings, cursor }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Run until cancelled. Transient fetch errors never terminate the loop;
    /// a rate-limit signal suspends the iteration for the signaled duration.
    pub async fn run(
        mut self,
        source: &dyn ChatHistorySource,
        store: Arc<Mutex<InterestStore>>,
        messenger: Arc<dyn MessagingPort>,
        cancel: CancellationToken,
    ) {
        loop {
            if let Err(e) = self.poll_once(source, &store, messenger.as_ref()).await {
                match e {
                    Error::RateLimited(wait) => {
                        warn!("source rate limited, backing off for {wait:?}");
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            _ = sleep(wait) => {}
                        }
                    }
                    other => error!("poll cycle failed: {other}"),
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(self.settings.interval) => {}
            }
        }
    }

    /// One poll cycle. Returns how many notifications were routed.
    pub async fn poll_once(
        &mut self,
        source: &dyn ChatHistorySource,
        store: &Mutex<InterestStore>,
        messenger: &dyn MessagingPort,
    ) -> Result<usize> {
        let page = source
            .messages_after(self.settings.chat, self.cursor, self.settings.page_size)
            .await?;

        // Track the highest id in the raw page so the cursor still progresses
        // past traffic that the filters below discard.
        let page_max = page.iter().map(|m| m.id).max().unwrap_or(self.cursor);

        // Defensive against inclusive-boundary history APIs.
        let mut fresh: Vec<SourceMessage> =
            page.into_iter().filter(|m| m.id > self.cursor).collect();

        // Oldest first, so forwarding preserves chronological order.
        fresh.sort_by_key(|m| m.id);

        let mut routed = 0usize;
        for msg in fresh {
            self.process(&msg, store, messenger, &mut routed).await;
            if msg.id > self.cursor {
                self.cursor = msg.id;
            }
        }

        if page_max > self.cursor {
            self.cursor = page_max;
        }

        Ok(routed)
    }

    async fn process(
        &self,
        msg: &SourceMessage,
        store: &Mutex<InterestStore>,
        messenger: &dyn MessagingPort,
        routed: &mut usize,
    ) {
        if msg.sender != Some(self.settings.relay_sender) {
            return;
        }
        let Some(text) = &msg.text else {
            warn!("relay message {} has no text, skipping", msg.id);
            return;
        };

        match extract_notification(text) {
            Some(note) => {
                let mut store = store.lock().await;
                let outcome = route(&mut store, messenger, &note).await;
                info!(
                    "message {} routed for {}: {}/{} delivered",
                    msg.id, note.phone_number, outcome.delivered, outcome.attempted
                );
                *routed += 1;
            }
            None => warn!("relay message {} has no phone number, dropped", msg.id),
        }
    }
}
