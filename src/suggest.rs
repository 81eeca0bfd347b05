use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::model::{de_opt_string_from_any, icao_code, SearchOption, SearchTarget};

pub const MAX_MATCHES: usize = 5;

/// ICAO carrier prefixes and the code passengers see on their boarding pass.
const CARRIER_CODES: [(&str, &str); 5] = [
    ("GJS", "UA"),
    ("DAL", "DL"),
    ("AAL", "AA"),
    ("UAL", "UA"),
    ("UCA", "UA"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionKind {
    Airport,
    Flight,
    Gate,
}

impl SuggestionKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "airport" | "airports" => Some(SuggestionKind::Airport),
            "flight" | "flightnumber" | "flight_number" => Some(SuggestionKind::Flight),
            "gate" | "gates" => Some(SuggestionKind::Gate),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSuggestion {
    #[serde(default, rename = "type", deserialize_with = "de_opt_string_from_any")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    display: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    code: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    name: Option<String>,
    #[serde(default, rename = "stId", deserialize_with = "de_opt_string_from_any")]
    st_id: Option<String>,
    #[serde(
        default,
        rename = "r_id",
        alias = "id",
        alias = "_id",
        deserialize_with = "de_opt_string_from_any"
    )]
    r_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    gate: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    airport: Option<String>,
    #[serde(
        default,
        rename = "flightID",
        alias = "flight_id",
        deserialize_with = "de_opt_string_from_any"
    )]
    flight_id: Option<String>,
}

/// Turn a backend suggestion payload into typed options. Anything that is not
/// an array produces nothing; records without a `type` use `default_kind`.
pub fn format_suggestions(value: &Value, default_kind: SuggestionKind) -> Vec<SearchOption> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| format_one(item, default_kind))
        .collect()
}

fn format_one(item: &Value, default_kind: SuggestionKind) -> Option<SearchOption> {
    let raw = match item {
        Value::String(text) => RawSuggestion {
            display: non_empty(text),
            ..RawSuggestion::default()
        },
        Value::Object(_) => match RawSuggestion::deserialize(item) {
            Ok(raw) => raw,
            Err(err) => {
                trace!("skipping suggestion record: {err}");
                return None;
            }
        },
        _ => return None,
    };

    let kind = raw
        .kind
        .as_deref()
        .and_then(SuggestionKind::from_tag)
        .unwrap_or(default_kind);

    let (label, target) = match kind {
        SuggestionKind::Flight => {
            let raw_id = raw.flight_id.clone().or_else(|| raw.display.clone())?;
            let label = carrier_label(&raw_id)
                .or_else(|| raw.display.clone())
                .unwrap_or_else(|| raw_id.clone());
            (
                label,
                SearchTarget::Flight {
                    flight_number: raw_id,
                    flight_id: raw.flight_id,
                },
            )
        }
        SuggestionKind::Airport => {
            let label = raw
                .display
                .clone()
                .or_else(|| code_name_label(raw.code.as_deref(), raw.name.as_deref()))?;
            (
                label,
                SearchTarget::Airport {
                    code: raw.code,
                    name: raw.name,
                    id: raw.r_id,
                },
            )
        }
        SuggestionKind::Gate => {
            let airport = raw.airport.clone().or_else(|| raw.code.clone());
            let gate = raw
                .gate
                .clone()
                .or_else(|| raw.name.clone())
                .or_else(|| raw.display.clone())?;
            let label = raw.display.clone().or_else(|| {
                code_name_label(airport.as_deref(), raw.name.as_deref().or(Some(&gate)))
            })?;
            (label, SearchTarget::Gate { gate, airport })
        }
    };

    if label.trim().is_empty() {
        return None;
    }
    Some(SearchOption {
        label,
        st_id: raw.st_id,
        target,
    })
}

/// `GJS4433` becomes `UA4433 (GJS4433)`. Unknown carriers yield `None`.
pub fn carrier_label(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let upper = raw.to_ascii_uppercase();
    CARRIER_CODES.iter().find_map(|(icao, iata)| {
        let rest = upper.strip_prefix(icao)?;
        if rest.is_empty() {
            return None;
        }
        Some(format!("{iata}{rest} ({raw})"))
    })
}

fn code_name_label(code: Option<&str>, name: Option<&str>) -> Option<String> {
    match (code, name) {
        (Some(code), Some(name)) => Some(format!("{code} - {name}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Up to five options whose label contains `query`, ignoring case.
/// A blank query returns the head of the pool.
pub fn filter_options(pool: &[SearchOption], query: &str) -> Vec<SearchOption> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return pool.iter().take(MAX_MATCHES).cloned().collect();
    }
    pool.iter()
        .filter(|opt| opt.label.to_lowercase().contains(&needle))
        .take(MAX_MATCHES)
        .cloned()
        .collect()
}

/// Work out what a submitted search means when the user typed it instead of
/// picking a suggestion.
pub fn resolve_query(query: &str, pool: &[SearchOption]) -> Option<SearchOption> {
    let text = query.trim();
    if text.is_empty() {
        return None;
    }
    let upper = text.to_ascii_uppercase();

    if looks_like_flight(&upper) {
        return Some(SearchOption {
            label: carrier_label(&upper).unwrap_or_else(|| upper.clone()),
            st_id: None,
            target: SearchTarget::Flight {
                flight_number: upper,
                flight_id: None,
            },
        });
    }

    if let Some(icao) = icao_code(&upper) {
        let known = pool.iter().find(|opt| match &opt.target {
            SearchTarget::Airport {
                code: Some(code), ..
            } => code.eq_ignore_ascii_case(&upper) || icao_code(code).as_deref() == Some(&icao),
            _ => false,
        });
        if let Some(option) = known {
            return Some(option.clone());
        }
        return Some(SearchOption {
            label: upper.clone(),
            st_id: None,
            target: SearchTarget::Airport {
                code: Some(upper),
                name: None,
                id: None,
            },
        });
    }

    filter_options(pool, text).into_iter().next()
}

fn looks_like_flight(upper: &str) -> bool {
    let digits_at = upper
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit())
        .map(|(idx, _)| idx);
    let Some(split) = digits_at else {
        return false;
    };
    let (prefix, digits) = upper.split_at(split);
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match prefix.len() {
        0 => true,
        2 => prefix.chars().all(|c| c.is_ascii_alphanumeric()),
        3 => prefix.chars().all(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}
