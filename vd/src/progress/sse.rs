//! Server-Sent Events framing
//!
//! The web layer in front of the daemon serves `GET .../events` streams by
//! subscribing to the progress bus and writing each event through these
//! helpers. `Last-Event-ID` carries the subscriber's resume `seq`.

use super::types::ProgressEvent;

/// Render one event as an SSE frame: `id:` then `data:` then a blank line
pub fn format_event(event: &ProgressEvent) -> String {
    let body = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    format!("id: {}\ndata: {}\n\n", event.seq, body)
}

/// An SSE comment line used as a keep-alive
pub fn heartbeat_comment() -> &'static str {
    ": keep-alive\n\n"
}

/// Parse a `Last-Event-ID` header value into a resume seq
pub fn parse_last_event_id(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::types::ProgressEventKind;
    use chrono::Utc;

    fn event(seq: u64) -> ProgressEvent {
        ProgressEvent {
            task_id: "t-1".to_string(),
            seq,
            kind: ProgressEventKind::StepCompleted,
            step: Some("editor_review".to_string()),
            progress_percent: 67,
            payload: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_format_event_frame() {
        let frame = format_event(&event(7));
        assert!(frame.starts_with("id: 7\ndata: {"));
        assert!(frame.ends_with("\n\n"));
        assert!(frame.contains("step_completed"));
    }

    #[test]
    fn test_frame_data_is_one_line() {
        let frame = format_event(&event(1));
        let data_line = frame.lines().nth(1).unwrap();
        assert!(data_line.starts_with("data: "));
        // JSON body contains no raw newlines, SSE frames stay intact
        assert_eq!(frame.matches('\n').count(), 3);
    }

    #[test]
    fn test_parse_last_event_id() {
        assert_eq!(parse_last_event_id("42"), Some(42));
        assert_eq!(parse_last_event_id(" 42 "), Some(42));
        assert_eq!(parse_last_event_id("abc"), None);
        assert_eq!(parse_last_event_id(""), None);
    }

    #[test]
    fn test_heartbeat_is_comment() {
        assert!(heartbeat_comment().starts_with(':'));
    }
}
