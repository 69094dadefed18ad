//!
//! src/resolve/odesli.rs  Oct 19th, 2026
//!
//! Cross platform resolution through the song.link (odesli) api. Every
//! platform the aggregator recognizes reports its own title and artist;
//! the record takes the most common of each.
//!

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::Resolver;
use crate::detect::detect;
use crate::errors::TrackError;
use crate::fetch::{send_json, OdesliClient};
use crate::types::{PlatformId, TrackMetadata};

pub struct OdesliResolver {
    client: OdesliClient,
}

impl OdesliResolver {
    pub fn new(client: OdesliClient) -> Self {
        Self { client }
    }
}

/// Most frequent value. Ties go to whichever value appeared first.
pub fn mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

/// Non-empty values of `field` across `entitiesByUniqueId`
fn entity_field<'a>(body: &'a Value, field: &str) -> Vec<&'a str> {
    body["entitiesByUniqueId"]
        .as_object()
        .map(|entities| {
            entities
                .values()
                .filter_map(|entity| entity[field].as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Urls under `linksByPlatform` for the platforms we know about
fn platform_links(body: &Value) -> BTreeMap<PlatformId, String> {
    body["linksByPlatform"]
        .as_object()
        .map(|links| {
            links
                .iter()
                .filter_map(|(key, link)| {
                    let platform = PlatformId::from_aggregator_key(key)?;
                    let url = link["url"].as_str().filter(|u| !u.is_empty())?;
                    Some((platform, url.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn metadata_from_body(body: &Value, submitted: &str) -> Result<TrackMetadata, TrackError> {
    let titles = entity_field(body, "title");
    let artists = entity_field(body, "artistName");

    let title = mode(titles.iter().copied())
        .ok_or_else(|| TrackError::LookupFailure(format!("odesli returned no titles for {submitted}")))?;
    let artist = mode(artists.iter().copied())
        .ok_or_else(|| TrackError::LookupFailure(format!("odesli returned no artists for {submitted}")))?;

    let links = platform_links(body);
    let canonical_url = detect(submitted)
        .ok()
        .and_then(|platform| links.get(&platform).cloned())
        .or_else(|| body["pageUrl"].as_str().filter(|u| !u.is_empty()).map(str::to_string))
        .unwrap_or_else(|| submitted.to_string());

    Ok(TrackMetadata {
        title: title.to_string(),
        artist: artist.to_string(),
        canonical_url,
        links,
    })
}

#[async_trait]
impl Resolver for OdesliResolver {
    fn name(&self) -> &'static str { "odesli" }

    async fn resolve(&self, url: &str) -> Result<TrackMetadata, TrackError> {
        let request = self.client
            .links(url)
            .map_err(|e| TrackError::LookupFailure(format!("odesli: {e}")))?;
        let body = send_json(request)
            .await
            .map_err(|e| TrackError::LookupFailure(format!("odesli: {e}")))?;

        let meta = metadata_from_body(&body, url)?;
        debug!(
            entities = body["entitiesByUniqueId"].as_object().map_or(0, |e| e.len()),
            platforms = meta.links.len(),
            "odesli.links"
        );
        Ok(meta)
    }
}
