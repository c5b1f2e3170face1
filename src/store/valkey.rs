use super::{Coordinates, ForecastStore, NearbyPoint, RadiusQuery, StoreError};
use crate::config::StoreConfig;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{
    AsyncCommands, ConnectionAddr, ConnectionInfo, ErrorKind, RedisConnectionInfo, RedisError,
};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// [`ForecastStore`] backed by a Valkey (or Redis) server.
///
/// Holds one multiplexed connection; clones of it share the same socket, so a
/// single `ValkeyStore` can serve concurrent requests.
pub struct ValkeyStore {
    conn: MultiplexedConnection,
    geo_key: String,
    timeout: Duration,
}

impl ValkeyStore {
    #[tracing::instrument(skip(config), fields(host = %config.host, port = config.port))]
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;

        let conn = match tokio::time::timeout(
            config.timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(conn) => conn?,
            Err(_) => {
                return Err(StoreError::Unavailable(format!(
                    "connect timed out after {}s",
                    config.timeout.as_secs()
                )));
            }
        };

        info!("Connected to forecast store");

        Ok(Self {
            conn,
            geo_key: config.geo_key.clone(),
            timeout: config.timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(self.timed_out(op)),
        }
    }

    fn timed_out(&self, op: &str) -> StoreError {
        StoreError::Unavailable(format!(
            "{} timed out after {}s",
            op,
            self.timeout.as_secs()
        ))
    }
}

/// Splits command errors on one key from failures of the server itself.
///
/// Error replies (`WRONGTYPE` and friends) and values that do not decode as a
/// hash concern only `key`; everything else, authentication replies included,
/// means the store is unusable.
fn key_error(key: &str, e: RedisError) -> StoreError {
    let auth_reply = matches!(e.code(), Some("NOAUTH" | "WRONGPASS"));
    match e.kind() {
        ErrorKind::ResponseError | ErrorKind::ExtensionError | ErrorKind::TypeError
            if !e.is_io_error() && !auth_reply =>
        {
            StoreError::Record {
                key: key.to_string(),
                message: e.to_string(),
            }
        }
        _ => e.into(),
    }
}

/// Hash fields as text. Bytes that are not UTF-8 are replaced, which leaves
/// the value non-numeric.
fn decode_fields(raw: HashMap<Vec<u8>, Vec<u8>>) -> HashMap<String, String> {
    raw.into_iter()
        .map(|(name, value)| {
            (
                String::from_utf8_lossy(&name).into_owned(),
                String::from_utf8_lossy(&value).into_owned(),
            )
        })
        .collect()
}

#[async_trait]
impl ForecastStore for ValkeyStore {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn.clone();
        let reply: redis::RedisResult<HashMap<Vec<u8>, Vec<u8>>> =
            tokio::time::timeout(self.timeout, conn.hgetall(key))
                .await
                .map_err(|_| self.timed_out("HGETALL"))?;

        let raw = reply.map_err(|e| key_error(key, e))?;

        let fields = decode_fields(raw);
        debug!(key, fields = fields.len(), "HGETALL");
        Ok(fields)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        debug!(reply = %pong, "PING");
        Ok(())
    }

    async fn geo_radius(&self, query: &RadiusQuery) -> Result<Vec<NearbyPoint>, StoreError> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("GEORADIUS");
        cmd.arg(&self.geo_key)
            .arg(query.longitude)
            .arg(query.latitude)
            .arg(query.radius)
            .arg(query.unit.to_string())
            .arg("WITHDIST")
            .arg("WITHHASH")
            .arg("WITHCOORD");
        // The server rejects `COUNT 0`; zero means no limit.
        if query.count > 0 {
            cmd.arg("COUNT").arg(query.count);
        }
        cmd.arg("ASC");

        // Reply order is fixed by the server: name, dist, hash, [lon, lat].
        let rows: Vec<(String, f64, i64, (f64, f64))> =
            self.bounded("GEORADIUS", cmd.query_async(&mut conn)).await?;

        Ok(rows
            .into_iter()
            .map(|(key, distance, hash, (longitude, latitude))| NearbyPoint {
                key,
                distance,
                coordinates: Coordinates {
                    longitude,
                    latitude,
                },
                hash: Some(hash),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ForecastRecord;

    #[test]
    fn test_wrong_type_reply_is_scoped_to_key() {
        let e = redis::make_extension_error(
            "WRONGTYPE".to_string(),
            Some("Operation against a key holding the wrong kind of value".to_string()),
        );
        match key_error("6h:u4pruy", e) {
            StoreError::Record { key, .. } => assert_eq!(key, "6h:u4pruy"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undecodable_reply_is_scoped_to_key() {
        let e = RedisError::from((ErrorKind::TypeError, "Response was of incompatible type"));
        assert!(matches!(
            key_error("0h:u4pruy", e),
            StoreError::Record { .. }
        ));
    }

    #[test]
    fn test_auth_reply_is_unavailable() {
        let e = redis::make_extension_error(
            "NOAUTH".to_string(),
            Some("Authentication required.".to_string()),
        );
        assert!(matches!(
            key_error("0h:u4pruy", e),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_connection_failure_is_unavailable() {
        let e = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert!(matches!(
            key_error("0h:u4pruy", e),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_non_utf8_value_counts_as_missing() {
        let raw: HashMap<Vec<u8>, Vec<u8>> = [
            ("2t", b"29\xff1.0".to_vec()),
            ("2d", b"285.0".to_vec()),
            ("tp", b"0".to_vec()),
            ("10u", b"1".to_vec()),
            ("10v", b"1".to_vec()),
        ]
        .into_iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v))
        .collect();

        let fields = decode_fields(raw);
        assert_eq!(fields.len(), 5);

        let err = ForecastRecord::from_raw(fields).validate().unwrap_err();
        assert_eq!(err.0, vec!["2t"]);
    }
}
