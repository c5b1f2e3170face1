use super::{Coordinates, ForecastStore, NearbyPoint, RadiusQuery, StoreError};
use async_trait::async_trait;
use haversine::{Location as HaversineLocation, Units, distance};
use serde::Deserialize;
use std::collections::HashMap;

/// Geo set member as stored in a snapshot file.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoMember {
    pub key: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// On-disk snapshot layout:
/// ```json
/// {
///   "hashes": { "6h:u4pruy": { "2t": "291.4", "2d": 283.0, "tp": "0.0" } },
///   "points": [ { "key": "u4pruy", "longitude": 10.75, "latitude": 59.91 } ]
/// }
/// ```
/// Field values may be JSON strings or numbers; both are stored as strings,
/// the way the server would hold them.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    hashes: HashMap<String, HashMap<String, serde_json::Value>>,
    #[serde(default)]
    points: Vec<GeoMember>,
}

/// In-process [`ForecastStore`], used for snapshot replay and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    hashes: HashMap<String, HashMap<String, String>>,
    points: Vec<GeoMember>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON snapshot from `path`.
    pub fn load(path: &str) -> Result<Self, StoreError> {
        let snapshot_err = |source: Box<dyn std::error::Error + Send + Sync>| {
            StoreError::Snapshot {
                path: path.to_string(),
                source,
            }
        };
        let content = std::fs::read_to_string(path).map_err(|e| snapshot_err(e.into()))?;
        Self::from_json(&content).map_err(|e| snapshot_err(e.into()))
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let snapshot: Snapshot = serde_json::from_str(json)?;

        let hashes = snapshot
            .hashes
            .into_iter()
            .map(|(key, fields)| {
                let fields = fields
                    .into_iter()
                    .map(|(name, value)| {
                        let value = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (name, value)
                    })
                    .collect();
                (key, fields)
            })
            .collect();

        Ok(Self {
            hashes,
            points: snapshot.points,
        })
    }

    pub fn insert_hash<I, K, V>(&mut self, key: &str, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entry = self.hashes.entry(key.to_string()).or_default();
        for (name, value) in fields {
            entry.insert(name.into(), value.into());
        }
    }

    pub fn add_point(&mut self, key: &str, longitude: f64, latitude: f64) {
        self.points.push(GeoMember {
            key: key.to_string(),
            longitude,
            latitude,
        });
    }
}

#[async_trait]
impl ForecastStore for MemoryStore {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn geo_radius(&self, query: &RadiusQuery) -> Result<Vec<NearbyPoint>, StoreError> {
        let unit_meters = query.unit.meters();

        let mut nearby: Vec<NearbyPoint> = self
            .points
            .iter()
            .filter_map(|p| {
                let dist_km = distance(
                    HaversineLocation {
                        latitude: p.latitude,
                        longitude: p.longitude,
                    },
                    HaversineLocation {
                        latitude: query.latitude,
                        longitude: query.longitude,
                    },
                    Units::Kilometers,
                );
                let dist = dist_km * 1000.0 / unit_meters;

                if dist <= query.radius {
                    Some(NearbyPoint {
                        key: p.key.clone(),
                        distance: dist,
                        coordinates: Coordinates {
                            longitude: p.longitude,
                            latitude: p.latitude,
                        },
                        hash: None,
                    })
                } else {
                    None
                }
            })
            .collect();

        nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        if query.count > 0 {
            nearby.truncate(query.count);
        }

        Ok(nearby)
    }
}
