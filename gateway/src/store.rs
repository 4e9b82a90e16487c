//! # store
//!
//! Time-series persistence behind the [`ObservationStore`] trait.
//!
//! One packet becomes a handful of tagged rows (see `canopy_types::observation`);
//! policies read them back as windowed per-talker or fleet-wide series. The
//! production backend is a single PostgreSQL table with JSONB tag/field
//! columns ([`PgStore`]); [`MemoryStore`] backs tests and the offline
//! analyser's dry runs.
//!
//! Writes are independent and need no coordination between processes. Query
//! failures must never abort an evaluation; callers log and degrade to
//! "no history".

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row as _};
use thiserror::Error;

use canopy_types::{Address, Observation};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O: {0}")]
    Io(#[from] sqlx::Error),
}

/// One stored row, time plus its numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub time: i64,
    pub fields: HashMap<String, f64>,
}

/// Windowed series selector. `talker: None` reads fleet-wide (aggregator
/// queries); bounds are exclusive on both ends.
#[derive(Debug, Clone, Copy)]
pub struct SeriesQuery {
    pub measurement: &'static str,
    pub talker: Option<Address>,
    pub since: i64,
    pub until: i64,
}

#[async_trait]
pub trait ObservationStore: Send + Sync + 'static {
    async fn write(&self, time: i64, rows: &[Observation]) -> Result<(), StoreError>;
    async fn query(&self, q: SeriesQuery) -> Result<Vec<StoredRow>, StoreError>;
}

// ── PostgreSQL backend ────────────────────────────────────────────────────────

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS observations (
    time        BIGINT NOT NULL,
    measurement TEXT   NOT NULL,
    talker      BIGINT NOT NULL,
    tags        JSONB  NOT NULL,
    fields      JSONB  NOT NULL
)";

const CREATE_INDEX_SQL: &str = "CREATE INDEX IF NOT EXISTS observations_series_idx
    ON observations (measurement, talker, time)";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the schema exists. A failure here is a startup
    /// error; processes exit nonzero on it.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(4).connect(url).await?;
        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn json_object<K: ToString, V: Into<serde_json::Value>>(
    entries: impl IntoIterator<Item = (K, V)>,
) -> serde_json::Value {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into()))
        .collect::<serde_json::Map<String, serde_json::Value>>()
        .into()
}

#[async_trait]
impl ObservationStore for PgStore {
    async fn write(&self, time: i64, rows: &[Observation]) -> Result<(), StoreError> {
        for row in rows {
            let tags = json_object(row.tags.iter().map(|(k, v)| (*k, v.clone())));
            let fields = json_object(row.fields.iter().map(|(k, v)| (*k, *v)));
            sqlx::query(
                "INSERT INTO observations (time, measurement, talker, tags, fields)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(time)
            .bind(row.measurement)
            .bind(row.talker.value() as i64)
            .bind(&tags)
            .bind(&fields)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn query(&self, q: SeriesQuery) -> Result<Vec<StoredRow>, StoreError> {
        let rows = match q.talker {
            Some(talker) => {
                sqlx::query(
                    "SELECT time, fields FROM observations
                     WHERE measurement = $1 AND talker = $2 AND time > $3 AND time < $4
                     ORDER BY time",
                )
                .bind(q.measurement)
                .bind(talker.value() as i64)
                .bind(q.since)
                .bind(q.until)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT time, fields FROM observations
                     WHERE measurement = $1 AND time > $2 AND time < $3
                     ORDER BY time",
                )
                .bind(q.measurement)
                .bind(q.since)
                .bind(q.until)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|r| {
                let time: i64 = r.get("time");
                let fields: serde_json::Value = r.get("fields");
                let fields = fields
                    .as_object()
                    .map(|o| {
                        o.iter()
                            .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)))
                            .collect()
                    })
                    .unwrap_or_default();
                StoredRow { time, fields }
            })
            .collect())
    }
}

// ── In-memory backend (tests, dry runs) ───────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<(i64, &'static str, Address, HashMap<String, f64>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn write(&self, time: i64, rows: &[Observation]) -> Result<(), StoreError> {
        let mut stored = self.rows.write().unwrap();
        for row in rows {
            let fields = row.fields.iter().map(|(k, v)| (k.to_string(), *v)).collect();
            stored.push((time, row.measurement, row.talker, fields));
        }
        Ok(())
    }

    async fn query(&self, q: SeriesQuery) -> Result<Vec<StoredRow>, StoreError> {
        let stored = self.rows.read().unwrap();
        Ok(stored
            .iter()
            .filter(|(time, measurement, talker, _)| {
                *measurement == q.measurement
                    && *time > q.since
                    && *time < q.until
                    && q.talker.map_or(true, |t| *talker == t)
            })
            .map(|(time, _, _, fields)| StoredRow { time: *time, fields: fields.clone() })
            .collect())
    }
}
