use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::models::UserOpResponse;

/// Parses the body of a user operation, which is either plain JSON or a
/// multiplexed stream of `index:payload` lines such as `1:{"ok":true}` or
/// `1:D{"ok":true}`. For the stream form the last object carrying an `ok`
/// field wins.
pub fn parse_user_response(text: &str) -> ApiResult<UserOpResponse> {
    let trimmed = text.trim();

    if let Ok(response) = serde_json::from_str::<UserOpResponse>(trimmed) {
        return Ok(response);
    }

    let last_ok = trimmed
        .lines()
        .filter_map(multiplexed_payload)
        .filter(|value| value.as_object().is_some_and(|obj| obj.contains_key("ok")))
        .last()
        .ok_or_else(|| ApiError::Parse("No valid JSON in response".to_string()))?;

    Ok(serde_json::from_value(last_ok)?)
}

fn multiplexed_payload(line: &str) -> Option<Value> {
    let (_, payload) = line.split_once(':')?;
    let mut payload = payload.trim();

    // a single type marker may sit between the colon and the object
    let mut chars = payload.chars();
    if let (Some(marker), Some('{')) = (chars.next(), chars.next()) {
        if marker != '{' {
            payload = &payload[marker.len_utf8()..];
        }
    }

    if !payload.starts_with('{') {
        return None;
    }
    serde_json::from_str(payload).ok()
}
