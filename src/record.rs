//! Raw forecast records: lookup, numeric coercion and validation.

use crate::schedule::Interval;
use crate::store::{ForecastStore, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// 2 m temperature, kelvin.
pub const TEMPERATURE: &str = "2t";
/// 2 m dewpoint, kelvin.
pub const DEWPOINT: &str = "2d";
/// Total precipitation.
pub const PRECIPITATION: &str = "tp";
/// 10 m eastward wind, m/s.
pub const WIND_U: &str = "10u";
/// 10 m northward wind, m/s.
pub const WIND_V: &str = "10v";

/// Fields every record needs before an index can be computed, in report order.
pub const REQUIRED_FIELDS: [&str; 5] = [TEMPERATURE, DEWPOINT, PRECIPITATION, WIND_U, WIND_V];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Parses `raw` as a finite float, otherwise keeps it verbatim.
    pub fn coerce(raw: String) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => FieldValue::Number(v),
            _ => FieldValue::Text(raw),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

/// One interval's observation for one spatial cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    fields: HashMap<String, FieldValue>,
}

/// The five numeric inputs of the index formula, in their native units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequiredInputs {
    pub temperature_k: f64,
    pub dewpoint_k: f64,
    pub precipitation: f64,
    pub wind_u: f64,
    pub wind_v: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing fields: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<String>);

impl ForecastRecord {
    pub fn from_raw(raw: HashMap<String, String>) -> Self {
        let fields = raw
            .into_iter()
            .map(|(name, value)| (name, FieldValue::coerce(value)))
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Extracts the required inputs, or names every one that is absent or
    /// not numeric.
    pub fn validate(&self) -> Result<RequiredInputs, MissingFields> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|name| self.number(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(MissingFields(missing));
        }

        let field = |name: &str| self.number(name).unwrap_or_default();

        Ok(RequiredInputs {
            temperature_k: field(TEMPERATURE),
            dewpoint_k: field(DEWPOINT),
            precipitation: field(PRECIPITATION),
            wind_u: field(WIND_U),
            wind_v: field(WIND_V),
        })
    }
}

/// Reads records for `(interval, cell)` pairs out of a [`ForecastStore`].
pub struct RecordFetcher<S> {
    store: S,
}

impl<S: ForecastStore> RecordFetcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns `None` when the store holds nothing readable under the
    /// interval's key. Only [`StoreError::Unavailable`] is returned as an error.
    pub async fn fetch(
        &self,
        interval: Interval,
        spatial_cell: &str,
    ) -> Result<Option<ForecastRecord>, StoreError> {
        let key = interval.key(spatial_cell);
        let raw = match self.store.hash_get_all(&key).await {
            Ok(raw) => raw,
            Err(e @ StoreError::Record { .. }) => {
                warn!(key = %key, error = %e, "Unreadable record treated as no data");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if raw.is_empty() {
            debug!(key = %key, "No record");
            return Ok(None);
        }

        let record = ForecastRecord::from_raw(raw);
        debug!(key = %key, fields = record.len(), "Record fetched");
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        raw(&[
            ("2t", "300.15"),
            ("2d", "290.0"),
            ("tp", "0.002"),
            ("10u", "3"),
            ("10v", "-4"),
        ])
    }

    #[test]
    fn test_coerce_numbers_and_text() {
        assert_eq!(FieldValue::coerce("1.5".into()), FieldValue::Number(1.5));
        assert_eq!(FieldValue::coerce(" -2 ".into()), FieldValue::Number(-2.0));
        assert_eq!(FieldValue::coerce("1e-3".into()), FieldValue::Number(0.001));
        assert_eq!(
            FieldValue::coerce("ERA5".into()),
            FieldValue::Text("ERA5".into())
        );
        assert_eq!(FieldValue::coerce("NaN".into()), FieldValue::Text("NaN".into()));
    }

    #[test]
    fn test_unparseable_field_is_kept() {
        let mut fields = complete();
        fields.insert("source".into(), "ifs-hres".into());
        let record = ForecastRecord::from_raw(fields);

        assert_eq!(
            record.get("source"),
            Some(&FieldValue::Text("ifs-hres".into()))
        );
        assert_eq!(record.number(TEMPERATURE), Some(300.15));
    }

    #[test]
    fn test_validate_complete() {
        let inputs = ForecastRecord::from_raw(complete()).validate().unwrap();
        assert_eq!(inputs.temperature_k, 300.15);
        assert_eq!(inputs.dewpoint_k, 290.0);
        assert_eq!(inputs.precipitation, 0.002);
        assert_eq!(inputs.wind_u, 3.0);
        assert_eq!(inputs.wind_v, -4.0);
    }

    #[test]
    fn test_validate_names_missing_in_order() {
        let record = ForecastRecord::from_raw(raw(&[("2t", "300"), ("10u", "1")]));
        let err = record.validate().unwrap_err();
        assert_eq!(err.0, vec!["2d", "tp", "10v"]);
        assert_eq!(err.to_string(), "missing fields: 2d, tp, 10v");
    }

    #[test]
    fn test_validate_non_numeric_counts_as_missing() {
        let mut fields = complete();
        fields.insert("tp".into(), "trace".into());
        let err = ForecastRecord::from_raw(fields).validate().unwrap_err();
        assert_eq!(err.0, vec!["tp"]);
    }

    #[tokio::test]
    async fn test_fetch_uses_interval_key() {
        let mut store = MemoryStore::new();
        store.insert_hash("6h:u4pruydqqvj", complete());
        let fetcher = RecordFetcher::new(store);

        let hit = fetcher
            .fetch(Interval::new(6), "u4pruydqqvj")
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = fetcher
            .fetch(Interval::new(12), "u4pruydqqvj")
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    /// Serves one unreadable key, or fails every read.
    struct BrokenStore {
        unreadable: Option<&'static str>,
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl ForecastStore for BrokenStore {
        async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
            match self.unreadable {
                Some(bad) if bad == key => Err(StoreError::Record {
                    key: key.to_string(),
                    message: "WRONGTYPE".into(),
                }),
                Some(_) => self.inner.hash_get_all(key).await,
                None => Err(StoreError::Unavailable("connection refused".into())),
            }
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }

        async fn geo_radius(
            &self,
            query: &crate::store::RadiusQuery,
        ) -> Result<Vec<crate::store::NearbyPoint>, StoreError> {
            self.inner.geo_radius(query).await
        }
    }

    #[tokio::test]
    async fn test_unreadable_key_is_no_data() {
        let mut inner = MemoryStore::new();
        inner.insert_hash("0h:cell", complete());
        let fetcher = RecordFetcher::new(BrokenStore {
            unreadable: Some("6h:cell"),
            inner,
        });

        assert!(fetcher.fetch(Interval::new(0), "cell").await.unwrap().is_some());
        assert!(fetcher.fetch(Interval::new(6), "cell").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_is_error() {
        let fetcher = RecordFetcher::new(BrokenStore {
            unreadable: None,
            inner: MemoryStore::new(),
        });

        let err = fetcher.fetch(Interval::new(0), "cell").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
