use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (plus an optional `.env`).
///
/// Validation failures are fatal: the process must exit before any I/O.
#[derive(Clone, Debug)]
pub struct Config {
    // Core identities
    pub telegram_bot_token: String,
    pub operator_user_ids: Vec<i64>,
    pub source_chat_id: i64,
    pub relay_sender_id: i64,
    pub report_chat_id: i64,

    // Durable state
    pub state_file: PathBuf,

    // Pull-mode polling
    pub poll_interval: Duration,
    pub poll_page_size: usize,

    // Daily report
    pub report_hour: u32,
    pub report_minute: u32,
    pub report_offset: FixedOffset,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let operator_user_ids = parse_csv_i64("OPERATOR_USER_IDS", env_str("OPERATOR_USER_IDS"))?;
        if operator_user_ids.is_empty() {
            return Err(Error::Config(
                "OPERATOR_USER_IDS environment variable is required".to_string(),
            ));
        }

        let source_chat_id = required_i64("SOURCE_CHAT_ID")?;
        let relay_sender_id = required_i64("RELAY_SENDER_ID")?;

        // The daily report goes to one fixed operator identity; default to the
        // first operator on the allow-list.
        let report_chat_id = match env_str("REPORT_CHAT_ID") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::Config(format!("REPORT_CHAT_ID is not an integer: {raw}")))?,
            None => operator_user_ids[0],
        };

        let state_file =
            PathBuf::from(env_str("STATE_FILE").unwrap_or("smsrelay-state.json".to_string()));

        let poll_interval = Duration::from_secs(env_u64("POLL_INTERVAL_SECS").unwrap_or(5));
        let poll_page_size = env_usize("POLL_PAGE_SIZE").unwrap_or(100);

        let report_hour = env_u32("REPORT_HOUR").unwrap_or(23);
        let report_minute = env_u32("REPORT_MINUTE").unwrap_or(59);
        if report_hour > 23 || report_minute > 59 {
            return Err(Error::Config(format!(
                "invalid report time: {report_hour:02}:{report_minute:02}"
            )));
        }

        let offset_hours = env_i64("REPORT_UTC_OFFSET_HOURS").unwrap_or(3);
        if !(-23..=23).contains(&offset_hours) {
            return Err(Error::Config(format!(
                "invalid REPORT_UTC_OFFSET_HOURS: {offset_hours}"
            )));
        }
        let report_offset =
            FixedOffset::east_opt((offset_hours * 3600) as i32).ok_or_else(|| {
                Error::Config(format!("invalid REPORT_UTC_OFFSET_HOURS: {offset_hours}"))
            })?;

        Ok(Self {
            telegram_bot_token,
            operator_user_ids,
            source_chat_id,
            relay_sender_id,
            report_chat_id,
            state_file,
            poll_interval,
            poll_page_size,
            report_hour,
            report_minute,
            report_offset,
        })
    }
}

fn required_i64(key: &str) -> Result<i64> {
    let raw = env_str(key)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{key} is not an integer: {raw}")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

/// Parse a CSV of integer ids. A token that is not an integer is a config
/// error: silently dropping it would lock an operator out on a typo.
fn parse_csv_i64(key: &str, v: Option<String>) -> Result<Vec<i64>> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("{key} contains a non-integer id: {s}")))
        })
        .collect()
}
