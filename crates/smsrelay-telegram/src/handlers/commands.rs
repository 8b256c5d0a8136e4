//! Operator command handlers.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use tracing::{error, info};

use smsrelay_core::{
    auth::is_authorized,
    domain::{ChatId, UserId},
    extract::candidate_numbers,
    formatting::{counter_lines, escape_html},
    store::InterestStore,
};

use crate::dispatch::AppState;

const UNAUTHORIZED_REPLY: &str = "Unauthorized. Contact the bot operator for access.";

const HELP_REPLY: &str = "\
🤖 <b>SMS relay commands</b>\n\
/add &lt;numbers&gt; — register 10-digit numbers for this chat\n\
/remove &lt;numbers&gt; — unregister numbers\n\
/removeall — unregister everything\n\
/active — list registered numbers\n\
/report — live delivery counts for this chat\n\
/id — this chat's name and id";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Dispatch one parsed command against the store and build the reply.
///
/// The authorization result is decided by the caller; an unauthorized sender
/// gets the fixed rejection and no command is even looked at, so no state
/// can change.
fn handle_parsed(
    store: &mut InterestStore,
    authorized: bool,
    chat_id: i64,
    chat_title: Option<&str>,
    cmd: &str,
    args: &str,
) -> String {
    if !authorized {
        return UNAUTHORIZED_REPLY.to_string();
    }

    match cmd {
        "add" => {
            let numbers = candidate_numbers(args);
            if numbers.is_empty() {
                return "Usage: /add &lt;one or more 10-digit numbers&gt;".to_string();
            }
            match store.add(chat_id, &numbers) {
                Ok((added, total)) => {
                    format!("➕ Added {added} number(s). {total} active in this chat.")
                }
                Err(e) => {
                    error!("persisting /add for chat {chat_id} failed: {e}");
                    "⚠️ Saving failed; the change was not recorded.".to_string()
                }
            }
        }

        "remove" => {
            let numbers = candidate_numbers(args);
            if numbers.is_empty() {
                return "Usage: /remove &lt;one or more 10-digit numbers&gt;".to_string();
            }
            match store.remove(chat_id, &numbers) {
                Ok(0) => "None of those numbers are active in this chat.".to_string(),
                Ok(removed) => format!("➖ Removed {removed} number(s)."),
                Err(e) => {
                    error!("persisting /remove for chat {chat_id} failed: {e}");
                    "⚠️ Saving failed; the change was not recorded.".to_string()
                }
            }
        }

        "removeall" => match store.remove_all(chat_id) {
            Ok(0) => "Nothing to clear.".to_string(),
            Ok(removed) => format!("🧹 Cleared {removed} number(s)."),
            Err(e) => {
                error!("persisting /removeall for chat {chat_id} failed: {e}");
                "⚠️ Saving failed; the change was not recorded.".to_string()
            }
        },

        "active" => {
            let numbers = store.list(chat_id);
            if numbers.is_empty() {
                return "No active numbers in this chat.".to_string();
            }
            let mut lines = vec![format!("📋 <b>Active numbers ({})</b>", numbers.len())];
            lines.extend(numbers);
            lines.join("\n")
        }

        "report" => match store.counters(chat_id) {
            None => "No notifications counted yet.".to_string(),
            Some(counts) if counts.is_empty() => "No notifications counted yet.".to_string(),
            Some(counts) => {
                let (lines, total) = counter_lines(counts);
                let mut out = vec!["📊 <b>Live counts</b>".to_string()];
                out.extend(lines);
                out.push(format!("Total: <b>{total}</b>"));
                out.join("\n")
            }
        },

        "id" | "whoami" => {
            let title = chat_title.unwrap_or("(no title)");
            format!(
                "Chat: {}\nID: <code>{chat_id}</code>",
                escape_html(title)
            )
        }

        "start" | "help" => HELP_REPLY.to_string(),

        other => format!("Unknown command: /{}", escape_html(other)),
    }
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));
    let authorized = is_authorized(user_id, &state.cfg.operator_user_ids);
    if !authorized {
        info!("unauthorized command in chat {chat_id} from {user_id:?}");
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, args) = parse_command(text);

    let reply = {
        let mut store = state.store.lock().await;
        handle_parsed(
            &mut store,
            authorized,
            chat_id,
            msg.chat.title(),
            &cmd,
            &args,
        )
    };

    if let Err(e) = state.messenger.send_html(ChatId(chat_id), &reply).await {
        error!("command reply to chat {chat_id} failed: {e}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_store(tag: &str) -> InterestStore {
        let path = PathBuf::from(format!(
            "/tmp/smsrelay-cmd-{tag}-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        InterestStore::load(&path).unwrap()
    }

    #[test]
    fn parses_command_with_bot_suffix() {
        assert_eq!(
            parse_command("/add@smsrelaybot 5551234567 5550000000"),
            ("add".to_string(), "5551234567 5550000000".to_string())
        );
        assert_eq!(parse_command("/Active"), ("active".to_string(), String::new()));
    }

    #[test]
    fn unauthorized_sender_changes_nothing() {
        let mut store = temp_store("unauth");

        let reply = handle_parsed(&mut store, false, 10, None, "add", "5551234567");
        assert_eq!(reply, UNAUTHORIZED_REPLY);
        assert!(store.destinations().is_empty());

        let reply = handle_parsed(&mut store, false, 10, None, "removeall", "");
        assert_eq!(reply, UNAUTHORIZED_REPLY);
    }

    #[test]
    fn add_then_active_lists_union() {
        let mut store = temp_store("add-active");

        let reply = handle_parsed(&mut store, true, 10, None, "add", "5551234567 junk 5550000000");
        assert!(reply.contains("Added 2"));
        assert!(reply.contains("2 active"));

        // Re-adding is idempotent.
        let reply = handle_parsed(&mut store, true, 10, None, "add", "5551234567");
        assert!(reply.contains("Added 0"));

        let reply = handle_parsed(&mut store, true, 10, None, "active", "");
        assert!(reply.contains("5550000000\n5551234567"));
    }

    #[test]
    fn add_without_valid_numbers_is_a_usage_error() {
        let mut store = temp_store("add-usage");
        let reply = handle_parsed(&mut store, true, 10, None, "add", "12345 abc");
        assert!(reply.starts_with("Usage:"));
        assert!(store.destinations().is_empty());
    }

    #[test]
    fn remove_reports_matches_only() {
        let mut store = temp_store("remove");
        handle_parsed(&mut store, true, 10, None, "add", "5551234567");

        let reply = handle_parsed(&mut store, true, 10, None, "remove", "5550000000");
        assert!(reply.contains("None of those numbers"));

        let reply = handle_parsed(&mut store, true, 10, None, "remove", "5551234567");
        assert!(reply.contains("Removed 1"));
    }

    #[test]
    fn removeall_and_empty_report() {
        let mut store = temp_store("removeall");
        handle_parsed(&mut store, true, 10, None, "add", "5551234567 5550000000");

        let reply = handle_parsed(&mut store, true, 10, None, "removeall", "");
        assert!(reply.contains("Cleared 2"));

        let reply = handle_parsed(&mut store, true, 10, None, "removeall", "");
        assert_eq!(reply, "Nothing to clear.");

        let reply = handle_parsed(&mut store, true, 10, None, "report", "");
        assert_eq!(reply, "No notifications counted yet.");
    }

    #[test]
    fn live_report_sorts_by_count_descending() {
        let mut store = temp_store("report");
        store.record_delivery(10, "1112223334");
        store.record_delivery(10, "1112223334");
        store.record_delivery(10, "2223334445");

        let reply = handle_parsed(&mut store, true, 10, None, "report", "");
        let body = reply.replace('\n', "|");
        assert!(body.contains("1112223334: 2|2223334445: 1"));
        assert!(reply.contains("Total: <b>3</b>"));
    }

    #[test]
    fn id_command_shows_title_and_id() {
        let mut store = temp_store("id");
        let reply = handle_parsed(&mut store, true, -100, Some("Ops <room>"), "id", "");
        assert!(reply.contains("Ops &lt;room&gt;"));
        assert!(reply.contains("<code>-100</code>"));
    }

    #[test]
    fn unknown_command_reply() {
        let mut store = temp_store("unknown");
        let reply = handle_parsed(&mut store, true, 10, None, "frobnicate", "");
        assert_eq!(reply, "Unknown command: /frobnicate");
    }
}
