//!
//! src/resolve/spotify.rs  Oct 19th, 2026
//!
//! Spotify web api track lookup with an app-level token
//!

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::{join_artists, Resolver};
use crate::detect::spotify_track_id;
use crate::errors::{FetchError, TrackError};
use crate::fetch::{send_json, SpotifyClient};
use crate::token::TokenProvider;
use crate::types::{PlatformId, TrackMetadata};

pub struct SpotifyResolver {
    client: SpotifyClient,
    tokens: Arc<TokenProvider>,
}

impl SpotifyResolver {
    pub fn new(client: SpotifyClient, tokens: Arc<TokenProvider>) -> Self {
        Self { client, tokens }
    }
}

fn classify(e: FetchError) -> TrackError {
    if e.has_status(&[StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN]) {
        TrackError::AuthFailure(format!("spotify: {e}"))
    } else if e.has_status(&[StatusCode::NOT_FOUND, StatusCode::BAD_REQUEST]) {
        // an id spotify can't parse comes back as 400
        TrackError::NotFound(format!("spotify: {e}"))
    } else {
        TrackError::LookupFailure(format!("spotify: {e}"))
    }
}

#[async_trait]
impl Resolver for SpotifyResolver {
    fn name(&self) -> &'static str { "spotify" }

    async fn resolve(&self, url: &str) -> Result<TrackMetadata, TrackError> {
        let track_id = spotify_track_id(url).ok_or_else(|| TrackError::Unsupported(
            format!("no spotify track id in {url}")
        ))?;

        let token = self.tokens.bearer().await?;
        let request = self.client.track(&track_id, &token.value).map_err(classify)?;
        let track = match send_json(request).await {
            Ok(track) => track,
            Err(e) => {
                // a revoked token stays cached otherwise
                if e.has_status(&[StatusCode::UNAUTHORIZED]) {
                    self.tokens.invalidate().await;
                }
                return Err(classify(e));
            }
        };

        let title = track["name"]
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TrackError::NotFound(format!("spotify track {track_id} has no name")))?
            .to_string();

        let artist = join_artists(
            track["artists"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|a| a["name"].as_str())
        );
        if artist.is_empty() {
            return Err(TrackError::NotFound(format!("spotify track {track_id} has no artists")));
        }

        let canonical_url = track["external_urls"]["spotify"]
            .as_str()
            .filter(|u| !u.is_empty())
            .unwrap_or(url)
            .to_string();
        debug!(track_id = %track_id, canonical = %canonical_url, "spotify.track");

        Ok(TrackMetadata {
            title,
            artist,
            links: BTreeMap::from([(PlatformId::Spotify, canonical_url.clone())]),
            canonical_url,
        })
    }
}
