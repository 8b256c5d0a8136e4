//! Daily delivery-count report.
//!
//! Once a day, at a configured wall-clock time in a fixed-offset zone, the
//! counters are drained out of the store and persisted, then every drained
//! destination with a non-empty counter map gets one summary block; all
//! blocks go to the single operator report chat.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use tracing::{error, info, warn};

use crate::{
    domain::ChatId, formatting::render_report_block, messaging::MessagingPort,
    store::InterestStore, Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ReportSettings {
    pub report_chat: ChatId,
    pub hour: u32,
    pub minute: u32,
    pub offset: FixedOffset,
}

/// Next wall-clock occurrence of `hour:minute` strictly after `now`.
pub fn next_occurrence(now: DateTime<FixedOffset>, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(time);
    let candidate = today
        .and_local_timezone(*now.offset())
        .single()
        .unwrap_or(now); // fixed offsets have no gaps or folds

    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    }
}

pub struct ReportScheduler {
    settings: ReportSettings,
    store: Arc<Mutex<InterestStore>>,
    messenger: Arc<dyn MessagingPort>,
}

impl ReportScheduler {
    pub fn new(
        settings: ReportSettings,
        store: Arc<Mutex<InterestStore>>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            settings,
            store,
            messenger,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let now = Utc::now().with_timezone(&self.settings.offset);
            let target = next_occurrence(now, self.settings.hour, self.settings.minute);
            let wait = (target - now).to_std().unwrap_or_default();
            info!("next daily report at {target}");

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(wait) => {}
            }

            match self.send_report().await {
                Ok(blocks) => info!("daily report sent ({blocks} destinations)"),
                Err(e) => error!("daily report failed: {e}"),
            }
        }
    }

    /// Send one block per destination with counted deliveries.
    ///
    /// Counters are drained out of the store in one lock acquisition before
    /// anything is sent: a delivery counted while the block sends are in
    /// flight stays in the store and shows up in the next period's report.
    /// A failed block send is logged and skipped.
    pub async fn send_report(&self) -> Result<usize> {
        let counters = {
            let mut store = self.store.lock().await;
            let drained = store.take_all_counters();
            if !drained.is_empty() {
                store.flush()?;
            }
            drained
        };

        let mut sent = 0usize;
        for (destination, counts) in &counters {
            if counts.is_empty() {
                continue;
            }
            let block = render_report_block(*destination, counts);
            match self
                .messenger
                .send_html(self.settings.report_chat, &block)
                .await
            {
                Ok(_) => sent += 1,
                Err(e) => warn!("report block for chat {destination} failed: {e}"),
            }
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{MessageId, MessageRef},
        Error,
    };

    struct RecordingMessenger {
        sent: Mutex<Vec<(i64, String)>>,
        fail_first: Mutex<bool>,
    }

    #[async_trait]
    impl MessagingPort for RecordingMessenger {
        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            let mut fail = self.fail_first.lock().await;
            if *fail {
                *fail = false;
                return Err(Error::External("first send rejected".to_string()));
            }
            self.sent.lock().await.push((chat_id.0, html.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    fn scheduler(
        tag: &str,
        fail_first: bool,
    ) -> (
        ReportScheduler,
        Arc<Mutex<InterestStore>>,
        Arc<RecordingMessenger>,
    ) {
        let path = PathBuf::from(format!(
            "/tmp/smsrelay-report-{tag}-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = Arc::new(Mutex::new(InterestStore::load(&path).unwrap()));

        let settings = ReportSettings {
            report_chat: ChatId(42),
            hour: 23,
            minute: 59,
            offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        };
        let messenger = Arc::new(RecordingMessenger {
            sent: Mutex::new(Vec::new()),
            fail_first: Mutex::new(fail_first),
        });
        (
            ReportScheduler::new(settings, store.clone(), messenger.clone()),
            store,
            messenger,
        )
    }

    #[tokio::test]
    async fn report_drains_counters_and_totals() {
        let (scheduler, store, messenger) = scheduler("drain", false);
        {
            let mut st = store.lock().await;
            st.record_delivery(7, "1112223334");
            st.record_delivery(7, "1112223334");
            st.record_delivery(7, "2223334445");
        }

        let sent_blocks = scheduler.send_report().await.unwrap();
        assert_eq!(sent_blocks, 1);

        let sent = messenger.sent.lock().await;
        assert_eq!(sent.len(), 1);
        let (chat, block) = &sent[0];
        assert_eq!(*chat, 42);
        assert!(block.contains("1112223334: 2"));
        assert!(block.contains("2223334445: 1"));
        assert!(block.contains("Total: <b>3</b>"));

        assert!(store.lock().await.counters(7).is_none());
    }

    #[tokio::test]
    async fn failed_block_does_not_stop_later_blocks() {
        let (scheduler, store, _messenger) = scheduler("isolate", true);
        {
            let mut st = store.lock().await;
            st.record_delivery(1, "1112223334");
            st.record_delivery(2, "2223334445");
        }

        let sent_blocks = scheduler.send_report().await.unwrap();
        assert_eq!(sent_blocks, 1);

        // Counters cleared even though one block failed.
        assert!(store.lock().await.all_counters().is_empty());
    }

    /// Messenger that records a fresh delivery into the store while a report
    /// block send is in flight, like the router would on a live relay.
    struct RacingMessenger {
        store: Arc<Mutex<InterestStore>>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessagingPort for RacingMessenger {
        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            self.store.lock().await.record_delivery(8, "5559990000");
            self.sent.lock().await.push(html.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    #[tokio::test]
    async fn delivery_counted_during_report_is_kept_for_next_period() {
        let path = PathBuf::from(format!(
            "/tmp/smsrelay-report-racing-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = Arc::new(Mutex::new(InterestStore::load(&path).unwrap()));
        store.lock().await.record_delivery(7, "1112223334");

        let messenger = Arc::new(RacingMessenger {
            store: store.clone(),
            sent: Mutex::new(Vec::new()),
        });
        let settings = ReportSettings {
            report_chat: ChatId(42),
            hour: 23,
            minute: 59,
            offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        };
        let scheduler = ReportScheduler::new(settings, store.clone(), messenger.clone());

        assert_eq!(scheduler.send_report().await.unwrap(), 1);

        // The count recorded mid-report was not wiped; it waits for the next
        // report instead.
        let st = store.lock().await;
        assert_eq!(st.counters(8).unwrap()["5559990000"], 1);
        assert!(st.counters(7).is_none());
    }

    #[tokio::test]
    async fn empty_counters_send_nothing() {
        let (scheduler, _store, messenger) = scheduler("empty", false);
        assert_eq!(scheduler.send_report().await.unwrap(), 0);
        assert!(messenger.sent.lock().await.is_empty());
    }

    #[test]
    fn next_occurrence_rolls_to_tomorrow() {
        let now = DateTime::parse_from_rfc3339("2026-08-31T10:00:00+03:00").unwrap();

        let later_today = next_occurrence(now, 23, 59);
        assert_eq!(later_today.to_rfc3339(), "2026-08-31T23:59:00+03:00");

        let past = next_occurrence(now, 9, 0);
        assert_eq!(past.to_rfc3339(), "2026-09-01T09:00:00+03:00");
    }
}
