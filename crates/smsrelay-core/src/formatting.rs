//! Outbound message templates (Telegram HTML parse mode).

use std::collections::BTreeMap;

use crate::domain::Notification;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render one forwarded notification. Lines for absent fields are omitted;
/// the code is an inline `<code>` token so it can be tap-copied.
pub fn render_notification(note: &Notification) -> String {
    let mut lines = vec!["📨 <b>New SMS</b>".to_string()];

    if let Some(app) = &note.app_name {
        lines.push(format!("App: {}", escape_html(app)));
    }
    lines.push(format!("Tel No: {}", escape_html(&note.phone_number)));
    if let Some(body) = &note.body {
        lines.push(format!("Message: {}", escape_html(body)));
    }
    if let Some(code) = &note.code {
        lines.push(format!("Code: <code>{}</code>", escape_html(code)));
    }
    if let Some(time) = &note.time_label {
        lines.push(format!("Time: {}", escape_html(time)));
    }

    lines.join("\n")
}

/// Counter lines sorted by count descending (ties by number), plus the total.
pub fn counter_lines(counts: &BTreeMap<String, u64>) -> (Vec<String>, u64) {
    let mut entries: Vec<(&String, u64)> = counts.iter().map(|(n, c)| (n, *c)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let total: u64 = entries.iter().map(|(_, c)| c).sum();
    let lines = entries
        .into_iter()
        .map(|(n, c)| format!("{}: {c}", escape_html(n)))
        .collect();
    (lines, total)
}

/// One daily-report block for a destination.
pub fn render_report_block(destination: i64, counts: &BTreeMap<String, u64>) -> String {
    let (lines, total) = counter_lines(counts);

    let mut out = vec![format!(
        "📊 <b>Daily report</b> for chat <code>{destination}</code>"
    )];
    out.extend(lines);
    out.push(format!("Total: <b>{total}</b>"));
    out.join("\n")
}
