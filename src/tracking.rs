use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::api::Backend;
use crate::model::SearchOption;

pub const ANONYMOUS_EMAIL: &str = "anonymous";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchEvent {
    pub email: String,
    #[serde(rename = "stId")]
    pub st_id: Option<String>,
    #[serde(rename = "submitTerm")]
    pub submit_term: String,
    pub timestamp: String,
}

#[derive(Clone, Copy, Debug)]
pub enum Submission<'a> {
    Typed(&'a str),
    Selected(&'a SearchOption),
}

impl SearchEvent {
    pub fn new(email: Option<&str>, submission: Submission<'_>, now: DateTime<Utc>) -> Self {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(ANONYMOUS_EMAIL)
            .to_string();
        let (st_id, submit_term) = match submission {
            Submission::Typed(text) => (None, text.trim().to_string()),
            Submission::Selected(option) => (option.st_id.clone(), option.value()),
        };
        SearchEvent {
            email,
            st_id,
            submit_term,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Report a search on a detached thread. Nothing is sent when tracking is
/// disabled, and a failed post only shows up in the log.
pub fn track_search(
    backend: Arc<dyn Backend>,
    enabled: bool,
    event: SearchEvent,
) -> Option<JoinHandle<()>> {
    if !enabled {
        return None;
    }
    let handle = thread::spawn(move || {
        if let Err(err) = backend.track_search(&event) {
            debug!("search tracking failed for {:?}: {err}", event.submit_term);
        }
    });
    Some(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureBackend;
    use crate::model::SearchTarget;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 14, 5, 0).unwrap()
    }

    #[test]
    fn typed_submission() {
        let event = SearchEvent::new(Some(" pilot@example.com "), Submission::Typed(" ewr "), now());
        assert_eq!(event.email, "pilot@example.com");
        assert_eq!(event.submit_term, "ewr");
        assert_eq!(event.st_id, None);
        assert_eq!(event.timestamp, "2026-10-17T14:05:00.000Z");
    }

    #[test]
    fn selected_submission_uses_value() {
        let option = SearchOption {
            label: "UA4433 (GJS4433)".to_string(),
            st_id: Some("42".to_string()),
            target: SearchTarget::Flight {
                flight_number: "GJS4433".to_string(),
                flight_id: None,
            },
        };
        let event = SearchEvent::new(None, Submission::Selected(&option), now());
        assert_eq!(event.email, ANONYMOUS_EMAIL);
        assert_eq!(event.submit_term, "GJS4433");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stId"], "42");
        assert_eq!(json["submitTerm"], "GJS4433");
    }

    #[test]
    fn disabled_tracking_sends_nothing() {
        let backend = Arc::new(FixtureBackend::default());
        let event = SearchEvent::new(None, Submission::Typed("JFK"), now());
        assert!(track_search(backend.clone(), false, event.clone()).is_none());
        assert!(backend.tracked().is_empty());

        let handle = track_search(backend.clone(), true, event.clone()).unwrap();
        handle.join().unwrap();
        assert_eq!(backend.tracked(), vec![event]);
    }
}
