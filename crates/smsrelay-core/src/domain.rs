/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One parsed relay notification. Transient: produced by the extractor,
/// consumed once by the router, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub phone_number: String,
    pub app_name: Option<String>,
    pub body: Option<String>,
    pub code: Option<String>,
    pub time_label: Option<String>,
}

/// A raw message as seen by the pull-mode history source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: i64,
    pub sender: Option<UserId>,
    pub text: Option<String>,
}
