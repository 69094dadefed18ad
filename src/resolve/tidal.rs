//!
//! src/resolve/tidal.rs  Oct 19th, 2026
//!
//! Tidal openapi v2: one track lookup, then one lookup per credited artist
//!

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::{join_artists, Resolver};
use crate::detect::tidal_track_id;
use crate::errors::{FetchError, TrackError};
use crate::fetch::{send_json, TidalClient};
use crate::token::TokenProvider;
use crate::types::{PlatformId, TrackMetadata};

pub struct TidalResolver {
    client: TidalClient,
    tokens: Arc<TokenProvider>,
}

impl TidalResolver {
    pub fn new(client: TidalClient, tokens: Arc<TokenProvider>) -> Self {
        Self { client, tokens }
    }

    async fn artist_name(&self, artist_id: &str, bearer: &str) -> Result<Option<String>, TrackError> {
        let request = self.client.artist(artist_id, bearer).map_err(classify)?;
        let body = send_json(request).await.map_err(classify)?;
        Ok(body["data"]["attributes"]["name"]
            .as_str()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string))
    }
}

/// 404 means the id is unknown to Tidal; anything else is treated as a
/// credential problem
fn classify(e: FetchError) -> TrackError {
    if e.has_status(&[StatusCode::NOT_FOUND]) {
        TrackError::NotFound(format!("tidal: {e}"))
    } else {
        TrackError::AuthFailure(format!("tidal: {e}"))
    }
}

/// Ids listed under `data.relationships.artists.data`
fn artist_ids(track: &Value) -> Vec<String> {
    track["data"]["relationships"]["artists"]["data"]
        .as_array()
        .map(|artists| {
            artists
                .iter()
                .filter_map(|a| match &a["id"] {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Resolver for TidalResolver {
    fn name(&self) -> &'static str { "tidal" }

    async fn resolve(&self, url: &str) -> Result<TrackMetadata, TrackError> {
        let track_id = tidal_track_id(url).ok_or_else(|| TrackError::Unsupported(
            format!("no tidal track id in {url}")
        ))?;

        let token = self.tokens.bearer().await?;
        let request = self.client.track(&track_id, &token.value).map_err(classify)?;
        let track = send_json(request).await.map_err(classify)?;

        let title = track["data"]["attributes"]["title"]
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TrackError::NotFound(format!("tidal track {track_id} has no title")))?
            .to_string();

        let ids = artist_ids(&track);
        debug!(track_id = %track_id, artists = ids.len(), "tidal.track");

        let mut names = Vec::with_capacity(ids.len());
        for artist_id in &ids {
            if let Some(name) = self.artist_name(artist_id, &token.value).await? {
                names.push(name);
            }
        }
        let artist = join_artists(names.iter().map(String::as_str));
        if artist.is_empty() {
            return Err(TrackError::NotFound(format!("tidal track {track_id} has no artists")));
        }

        Ok(TrackMetadata {
            title,
            artist,
            canonical_url: url.to_string(),
            links: BTreeMap::from([(PlatformId::Tidal, url.to_string())]),
        })
    }
}
