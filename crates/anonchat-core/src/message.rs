use serde::Deserialize;

/// Body of `GET {api}/chat/{room_id}/messages`. Each record is a raw string
/// in `<sender>:<body>` form; the body may itself contain colons.
#[derive(Clone, Debug, Deserialize)]
pub struct PollResponse {
    pub messages: Vec<String>,
}

/// Strip the leading colon-delimited sender field from a raw message record
/// and keep the remainder verbatim.
///
/// A record with no colon has no body after the sender field and renders as
/// an empty string.
pub fn display_text(raw: &str) -> String {
    match raw.split_once(':') {
        Some((_sender, body)) => body.to_string(),
        None => String::new(),
    }
}
