use chrono::TimeZone;

use crate::dates::parse_utc;
use crate::models::{ChatThread, Message, Role};

/// Sorts a thread oldest first. Messages with unparseable timestamps keep
/// their relative order and sort before dated ones.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by_key(|m| parse_utc(&m.message.timestamp).ok());
}

/// Identity used to decide whether consecutive messages share a sender.
pub fn sender_identifier(message: &Message) -> String {
    match message.message.role {
        Role::Client => "client".to_string(),
        Role::Assistant => "assistant".to_string(),
        Role::User => {
            let sender = message.user.as_ref();
            let identity = [
                sender.and_then(|s| s.email.as_deref()),
                sender.and_then(|s| s.name.as_deref()),
                sender.and_then(|s| s.avatar.as_deref()),
            ]
            .into_iter()
            .flatten()
            .find(|v| !v.is_empty())
            .unwrap_or("unknown");
            format!("user-{}", identity)
        }
    }
}

/// Sender name and avatar are shown on the first message of a run.
pub fn shows_sender(previous: Option<&Message>, message: &Message) -> bool {
    previous.is_none_or(|prev| sender_identifier(prev) != sender_identifier(message))
}

fn local_day<Tz: TimeZone>(message: &Message, tz: &Tz) -> Option<chrono::NaiveDate> {
    parse_utc(&message.message.timestamp)
        .ok()
        .map(|ts| ts.with_timezone(tz).date_naive())
}

/// Whether a date separator goes above `message`.
pub fn starts_new_day<Tz: TimeZone>(previous: Option<&Message>, message: &Message, tz: &Tz) -> bool {
    previous.is_none_or(|prev| local_day(prev, tz) != local_day(message, tz))
}

/// The customer spoke last and the AI assistant owns the thread.
pub fn awaiting_response(messages: &[Message], thread: Option<&ChatThread>) -> bool {
    let last_from_client = messages
        .last()
        .is_some_and(|m| m.message.role == Role::Client);
    last_from_client && thread.is_some_and(|t| t.is_handled_by_ai)
}
