//!
//! src/resolve/mod.rs  Oct 19th, 2026
//!
//! Resolution facade: turns a submission into a `ResolvedTrack` by
//! detecting the platform and handing the link to whichever resolver the
//! strategy table routes that platform to
//!

pub mod odesli;
pub mod spotify;
pub mod tidal;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::config::{AppConfig, Strategy};
use crate::detect::detect;
use crate::errors::TrackError;
use crate::fetch::{OdesliClient, SpotifyClient, TidalClient, TokenClient};
use crate::token::{ClientCredentials, TokenProvider};
use crate::types::{PlatformId, ResolvedTrack, SubmissionRequest, TrackMetadata};

pub use odesli::OdesliResolver;
pub use spotify::SpotifyResolver;
pub use tidal::TidalResolver;

#[async_trait]
pub trait Resolver: Send + Sync {
    fn name(&self) -> &'static str;
    async fn resolve(&self, url: &str) -> Result<TrackMetadata, TrackError>;
}

/// Which resolver serves which platform
#[derive(Clone, Default)]
pub struct ResolverTable {
    routes: HashMap<PlatformId, Arc<dyn Resolver>>,
}

impl ResolverTable {
    /// Per-platform apis; a platform left as None has no route
    pub fn direct(
        tidal: Option<Arc<dyn Resolver>>,
        spotify: Option<Arc<dyn Resolver>>,
    ) -> Self {
        let mut table = Self::default();
        if let Some(r) = tidal {
            table.routes.insert(PlatformId::Tidal, r);
        }
        if let Some(r) = spotify {
            table.routes.insert(PlatformId::Spotify, r);
        }
        table
    }

    /// One aggregator for every platform the detector knows
    pub fn aggregated(aggregator: Arc<dyn Resolver>) -> Self {
        let mut table = Self::default();
        for platform in [PlatformId::Tidal, PlatformId::Spotify] {
            table.routes.insert(platform, aggregator.clone());
        }
        table
    }

    pub fn get(&self, platform: PlatformId) -> Option<&Arc<dyn Resolver>> {
        self.routes.get(&platform)
    }
}

pub struct TrackResolver {
    routes: ResolverTable,
}

impl TrackResolver {
    pub fn new(routes: ResolverTable) -> Self {
        Self { routes }
    }

    /// Wires the resolvers for the configured strategy
    pub fn from_config(cfg: &AppConfig) -> Result<Self, TrackError> {
        let routes = match cfg.strategy {
            Strategy::Aggregated => {
                let client = OdesliClient::new(&cfg.http, &cfg.odesli)?;
                ResolverTable::aggregated(Arc::new(OdesliResolver::new(client)))
            }
            Strategy::Direct => {
                let tidal = match &cfg.tidal {
                    Some(tidal_cfg) => {
                        let tokens = token_provider(
                            "tidal", cfg, &tidal_cfg.credentials
                        )?;
                        let client = TidalClient::new(&cfg.http, tidal_cfg)?;
                        Some(Arc::new(TidalResolver::new(client, tokens)) as Arc<dyn Resolver>)
                    }
                    None => None,
                };
                let spotify = match &cfg.spotify {
                    Some(spotify_cfg) => {
                        let tokens = token_provider(
                            "spotify", cfg, &spotify_cfg.credentials
                        )?;
                        let client = SpotifyClient::new(&cfg.http, spotify_cfg)?;
                        Some(Arc::new(SpotifyResolver::new(client, tokens)) as Arc<dyn Resolver>)
                    }
                    None => None,
                };
                ResolverTable::direct(tidal, spotify)
            }
        };
        Ok(Self::new(routes))
    }

    #[instrument(skip_all, fields(url = %request.raw_url))]
    pub async fn resolve_submission(
        &self,
        request: &SubmissionRequest
    ) -> Result<ResolvedTrack, TrackError> {
        let url = request.raw_url.trim();
        let platform = detect(url)?;
        let resolver = self.routes.get(platform).ok_or_else(|| TrackError::Unsupported(
            format!("no resolver configured for {platform}")
        ))?;

        info!(%platform, resolver = resolver.name(), "resolve.start");
        let meta = match resolver.resolve(url).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(%platform, kind = e.kind(), error = %e, "resolve.failed");
                return Err(e);
            }
        };
        let meta = validate(meta)?;

        info!(title = %meta.title, artist = %meta.artist, "resolve.done");
        Ok(ResolvedTrack::new(meta, request.styles.clone(), Utc::now()))
    }
}

fn token_provider(
    name: &'static str,
    cfg: &AppConfig,
    credentials: &crate::config::CredentialsConfig,
) -> Result<Arc<TokenProvider>, TrackError> {
    let source = ClientCredentials::new(TokenClient::new(&cfg.http, credentials)?);
    Ok(Arc::new(TokenProvider::new(name, Arc::new(source), cfg.tokens.refresh_margin)))
}

/// Refuses records a resolver left half filled
fn validate(mut meta: TrackMetadata) -> Result<TrackMetadata, TrackError> {
    meta.title = meta.title.trim().to_string();
    meta.artist = meta.artist.trim().to_string();
    if meta.title.is_empty() || meta.artist.is_empty() {
        return Err(TrackError::NotFound("resolver returned no title or artist".into()));
    }
    if meta.canonical_url.trim().is_empty() {
        return Err(TrackError::NotFound("resolver returned no canonical url".into()));
    }
    Ok(meta)
}

/// Joins artist names the way every resolver reports them
pub(crate) fn join_artists<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
