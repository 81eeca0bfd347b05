use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What a suggestion points at. Each kind carries its own fixed field set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchTarget {
    Airport {
        code: Option<String>,
        name: Option<String>,
        id: Option<String>,
    },
    Flight {
        flight_number: String,
        flight_id: Option<String>,
    },
    Gate {
        gate: String,
        airport: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOption {
    pub label: String,
    pub st_id: Option<String>,
    pub target: SearchTarget,
}

impl SearchOption {
    /// Identifier submitted as the search term when this option is chosen.
    pub fn value(&self) -> String {
        match &self.target {
            SearchTarget::Airport { code, id, .. } => code
                .clone()
                .or_else(|| id.clone())
                .unwrap_or_else(|| self.label.clone()),
            SearchTarget::Flight {
                flight_number,
                flight_id,
            } => flight_id.clone().unwrap_or_else(|| flight_number.clone()),
            SearchTarget::Gate { gate, .. } => gate.clone(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.target {
            SearchTarget::Airport { .. } => "airport",
            SearchTarget::Flight { .. } => "flight",
            SearchTarget::Gate { .. } => "gate",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WeatherRecord {
    #[serde(
        default,
        rename = "D-ATIS",
        alias = "datis",
        alias = "DATIS",
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub datis: Option<String>,
    #[serde(
        default,
        rename = "METAR",
        alias = "metar",
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub metar: Option<String>,
    #[serde(
        default,
        rename = "TAF",
        alias = "taf",
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub taf: Option<String>,
}

impl WeatherRecord {
    pub fn is_empty(&self) -> bool {
        self.datis.is_none() && self.metar.is_none() && self.taf.is_none()
    }

    pub fn rows(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("D-ATIS", self.datis.as_deref()),
            ("METAR", self.metar.as_deref()),
            ("TAF", self.taf.as_deref()),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeatherSource {
    Cached,
    Live,
}

impl WeatherSource {
    pub fn label(self) -> &'static str {
        match self {
            WeatherSource::Cached => "cached",
            WeatherSource::Live => "live",
        }
    }
}

/// NAS constraints keyed by program ("Ground Delay", "Airport Closure", ...).
/// An empty map means the airport has no active constraints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Value")]
pub struct NasStatus {
    pub programs: BTreeMap<String, BTreeMap<String, String>>,
}

impl NasStatus {
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl From<Value> for NasStatus {
    fn from(value: Value) -> Self {
        let mut programs = BTreeMap::new();
        if let Value::Object(map) = value {
            for (category, detail) in map {
                let fields = match detail {
                    Value::Object(inner) => inner
                        .into_iter()
                        .filter_map(|(k, v)| value_text(&v).map(|text| (k, text)))
                        .collect(),
                    Value::Null => continue,
                    other => match value_text(&other) {
                        Some(text) => BTreeMap::from([("value".to_string(), text)]),
                        None => continue,
                    },
                };
                programs.insert(category, fields);
            }
        }
        NasStatus { programs }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CachedAirport {
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    pub name: Option<String>,
    #[serde(
        default,
        rename = "_id",
        alias = "id",
        alias = "mdbAirportReferenceId",
        deserialize_with = "de_opt_string_from_any"
    )]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub weather: Option<WeatherRecord>,
    #[serde(flatten)]
    inline_weather: WeatherRecord,
}

impl CachedAirport {
    pub fn new(
        code: Option<&str>,
        name: Option<&str>,
        reference_id: Option<&str>,
        weather: Option<WeatherRecord>,
    ) -> Self {
        CachedAirport {
            code: code.map(str::to_string),
            name: name.map(str::to_string),
            reference_id: reference_id.map(str::to_string),
            weather,
            inline_weather: WeatherRecord::default(),
        }
    }

    /// Weather either nested under `weather` or stored at the top level.
    pub fn weather(&self) -> Option<&WeatherRecord> {
        self.weather
            .as_ref()
            .filter(|w| !w.is_empty())
            .or_else(|| Some(&self.inline_weather).filter(|w| !w.is_empty()))
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FlightLeg {
    #[serde(default, alias = "airport", deserialize_with = "de_opt_string_from_any")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    pub gate: Option<String>,
    #[serde(default, alias = "scheduledTime", deserialize_with = "de_opt_string_from_any")]
    pub scheduled: Option<String>,
    #[serde(default, alias = "estimatedTime", deserialize_with = "de_opt_string_from_any")]
    pub estimated: Option<String>,
    #[serde(default)]
    pub weather: Option<WeatherRecord>,
    #[serde(
        default,
        rename = "mdbAirportReferenceId",
        alias = "weatherReferenceId",
        deserialize_with = "de_opt_string_from_any"
    )]
    pub weather_reference_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FlightDetail {
    #[serde(
        default,
        rename = "flightID",
        alias = "flight_id",
        deserialize_with = "de_opt_string_from_any"
    )]
    pub flight_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    pub registration: Option<String>,
    #[serde(default, alias = "filedRoute", deserialize_with = "de_opt_string_from_any")]
    pub route: Option<String>,
    #[serde(
        default,
        rename = "filedAltitude",
        alias = "filed_altitude",
        deserialize_with = "de_opt_string_from_any"
    )]
    pub filed_altitude: Option<String>,
    #[serde(default)]
    pub departure: Option<FlightLeg>,
    #[serde(default)]
    pub arrival: Option<FlightLeg>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct GateFlight {
    #[serde(
        default,
        rename = "flightID",
        alias = "flight_id",
        alias = "flight",
        deserialize_with = "de_opt_string_from_any"
    )]
    pub flight_id: Option<String>,
    #[serde(default, alias = "scheduledTime", deserialize_with = "de_opt_string_from_any")]
    pub scheduled: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    pub destination: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct GateDetail {
    #[serde(default, deserialize_with = "de_opt_string_from_any")]
    pub gate: Option<String>,
    #[serde(default, alias = "code", deserialize_with = "de_opt_string_from_any")]
    pub airport: Option<String>,
    #[serde(default, alias = "departures")]
    pub flights: Vec<GateFlight>,
}

impl GateDetail {
    /// Gate endpoints answer either with an object or with a bare list of flights.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(_) => Ok(GateDetail {
                flights: serde_json::from_value(value)?,
                ..GateDetail::default()
            }),
            other => serde_json::from_value(other),
        }
    }
}

/// Normalise a domestic 3-letter code to ICAO by prefixing `K`.
pub fn icao_code(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    if !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    match code.len() {
        3 => Some(format!("K{code}")),
        4 => Some(code),
        _ => None,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(map) => map.get("$oid").and_then(value_text),
        Value::Null => None,
    }
}

pub(crate) fn de_opt_string_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(_) => Err(serde::de::Error::custom(
            "expected string, number or null, got array",
        )),
        other => Ok(value_text(&other)),
    }
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => {
            if text.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(text))
            }
        }
        Value::Array(lines) => {
            let parts: Vec<String> = lines.iter().filter_map(value_text).collect();
            if parts.is_empty() {
                Ok(None)
            } else {
                Ok(Some(parts.join("\n")))
            }
        }
        Value::Null => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "expected weather text or null, got {other}"
        ))),
    }
}
