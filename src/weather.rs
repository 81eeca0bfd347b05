use crate::model::{WeatherRecord, WeatherSource};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedWeather {
    pub source: WeatherSource,
    pub record: WeatherRecord,
}

/// Request for the backend to persist a fresher live observation over its
/// cached copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLiveWeather {
    pub reference_id: String,
    pub raw_code: String,
    pub record: WeatherRecord,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub selected: Option<SelectedWeather>,
    pub store: Option<StoreLiveWeather>,
}

/// A record is worth showing when it carries a METAR.
pub fn is_meaningful(record: Option<&WeatherRecord>) -> bool {
    record
        .and_then(|r| r.metar.as_deref())
        .is_some_and(|metar| !metar.trim().is_empty())
}

/// Choose between cached and live weather for one airport. Live wins whenever
/// it is meaningful; the store request is only produced when a meaningful
/// cached copy differs from it and we know which cached document to update.
pub fn reconcile(
    cached: Option<&WeatherRecord>,
    live: Option<&WeatherRecord>,
    reference_id: Option<&str>,
    airport_code: &str,
) -> Reconciliation {
    if let Some(live) = live.filter(|r| is_meaningful(Some(*r))) {
        let store = match (cached, reference_id) {
            (Some(cached), Some(reference_id))
                if is_meaningful(Some(cached))
                    && cached != live
                    && !reference_id.trim().is_empty() =>
            {
                Some(StoreLiveWeather {
                    reference_id: reference_id.trim().to_string(),
                    raw_code: airport_code.to_string(),
                    record: live.clone(),
                })
            }
            _ => None,
        };
        return Reconciliation {
            selected: Some(SelectedWeather {
                source: WeatherSource::Live,
                record: live.clone(),
            }),
            store,
        };
    }

    if let Some(cached) = cached.filter(|r| is_meaningful(Some(*r))) {
        return Reconciliation {
            selected: Some(SelectedWeather {
                source: WeatherSource::Cached,
                record: cached.clone(),
            }),
            store: None,
        };
    }

    Reconciliation::default()
}
