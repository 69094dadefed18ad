//!
//! src/persistent.rs  Oct 19th, 2026
//!
//! Defines module for persisting resolved tracks to sqlite. A track is
//! identified by its (title, artist) pair; adding it twice is an error the
//! caller can tell apart from a failed lookup.
//!

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PersistenceConfig;
use crate::errors::TrackError;
use crate::types::{DanceStyle, PlatformId, ResolvedTrack};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredTrack {
    pub id: String,
    #[serde(flatten)]
    pub track: ResolvedTrack,
}

pub struct TrackStore {
    pool: Pool<Sqlite>
}

impl TrackStore {

    pub async fn init(cfg: &PersistenceConfig) -> Result<Self, TrackError> {
        let options = SqliteConnectOptions::from_str(&cfg.db_url)
            .map_err(|e| TrackError::Config(format!("DATABASE_URL invalid {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(cfg.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| TrackError::Db(format!("connecting to sqlite at {}: {e}", cfg.db_url)))?;

        sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
        sqlx::query("PRAGMA foreign_keys=ON;").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL;").execute(&pool).await?;

        let this = Self { pool };
        this.ensure_schema().await?;
        info!(db = %cfg.db_url, "store.ready");
        Ok( this )
    }

    async fn ensure_schema(&self) -> Result<(), TrackError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tracks (
              id                TEXT PRIMARY KEY,
              title             TEXT NOT NULL,
              artist            TEXT NOT NULL,
              canonical_url     TEXT NOT NULL,
              platform_urls     TEXT NOT NULL,
              styles            TEXT NOT NULL,
              resolved_at       TEXT NOT NULL,
              UNIQUE (title, artist)
            );
            "#
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_tracks_resolved_at ON tracks(resolved_at);"
        ).execute(&self.pool).await?;

        Ok(())
    }

    /// Fixed width so text order is time order
    fn timestamp(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub async fn insert(&self, track: &ResolvedTrack) -> Result<StoredTrack, TrackError> {
        let id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO tracks (
                id, title, artist, canonical_url, platform_urls, styles, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);
            "#
        )
        .bind(&id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.canonical_url)
        .bind(serde_json::to_string(&track.per_platform_urls)?)
        .bind(serde_json::to_string(&track.styles)?)
        .bind(Self::timestamp(&track.resolved_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(id = %id, title = %track.title, artist = %track.artist, "store.insert");
                Ok(StoredTrack { id, track: track.clone() })
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(TrackError::DuplicateTrack {
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every stored track, oldest submission first
    pub async fn list(&self) -> Result<Vec<StoredTrack>, TrackError> {
        let rows = sqlx::query(
            "SELECT * FROM tracks ORDER BY resolved_at ASC, id ASC;"
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::from_row).collect()
    }

    pub async fn find(&self, title: &str, artist: &str) -> Result<Option<StoredTrack>, TrackError> {
        let row = sqlx::query("SELECT * FROM tracks WHERE title = ?1 AND artist = ?2;")
            .bind(title)
            .bind(artist)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    fn from_row(row: &SqliteRow) -> Result<StoredTrack, TrackError> {
        let platform_urls: String = row.try_get("platform_urls")?;
        let styles: String = row.try_get("styles")?;
        let resolved_at: String = row.try_get("resolved_at")?;

        let per_platform_urls: BTreeMap<PlatformId, String> = serde_json::from_str(&platform_urls)?;
        let styles: BTreeSet<DanceStyle> = serde_json::from_str(&styles)?;
        let resolved_at = DateTime::parse_from_rfc3339(&resolved_at)
            .map_err(|e| TrackError::Parse(format!("resolved_at {resolved_at}: {e}")))?
            .with_timezone(&Utc);

        Ok(StoredTrack {
            id: row.try_get("id")?,
            track: ResolvedTrack {
                title: row.try_get("title")?,
                artist: row.try_get("artist")?,
                canonical_url: row.try_get("canonical_url")?,
                per_platform_urls,
                resolved_at,
                styles,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    async fn memory_store() -> TrackStore {
        // one connection, or each would see its own empty database
        let cfg = PersistenceConfig {
            db_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        TrackStore::init(&cfg).await.unwrap()
    }

    fn track(title: &str, artist: &str, minutes: i64) -> ResolvedTrack {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap() + Duration::minutes(minutes);
        ResolvedTrack {
            title: title.to_string(),
            artist: artist.to_string(),
            canonical_url: "https://tidal.com/browse/track/370686004/u".to_string(),
            per_platform_urls: BTreeMap::from([
                (PlatformId::Tidal, "https://tidal.com/browse/track/370686004/u".to_string()),
                (PlatformId::YouTube, "https://www.youtube.com/watch?v=xyz".to_string()),
            ]),
            resolved_at: at,
            styles: BTreeSet::from([DanceStyle::Bachata, DanceStyle::Rumba]),
        }
    }

    #[tokio::test]
    async fn insert_then_find_round_trips_all_fields() {
        let store = memory_store().await;
        let stored = store.insert(&track("Propuesta Indecente", "Romeo Santos", 0)).await.unwrap();

        let found = store.find("Propuesta Indecente", "Romeo Santos").await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert!(store.find("Propuesta Indecente", "Aventura").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_title_and_artist_is_a_duplicate() {
        let store = memory_store().await;
        store.insert(&track("Obsesión", "Aventura", 0)).await.unwrap();

        let err = store.insert(&track("Obsesión", "Aventura", 5)).await.unwrap_err();
        assert_eq!(err.kind(), "duplicate_track");

        // same title by someone else is a different track
        store.insert(&track("Obsesión", "Romeo Santos", 5)).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_is_ordered_by_resolution_time() {
        let store = memory_store().await;
        store.insert(&track("Third", "C", 30)).await.unwrap();
        store.insert(&track("First", "A", 0)).await.unwrap();
        store.insert(&track("Second", "B", 10)).await.unwrap();

        let titles: Vec<String> = store.list().await.unwrap()
            .into_iter()
            .map(|t| t.track.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn stored_track_serializes_flat() {
        let stored = StoredTrack { id: "abc".into(), track: track("Song", "Artist", 0) };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["title"], "Song");
        assert_eq!(json["styles"], serde_json::json!(["bachata", "rumba"]));
        assert_eq!(json["per_platform_urls"]["youtube"], "https://www.youtube.com/watch?v=xyz");
    }
}
