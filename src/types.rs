//!
//! src/types.rs  Oct 19th, 2026
//!
//! Shared value types: platforms, dance styles, submissions and the
//! resolved record handed to storage
//!

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformId {
    Spotify,
    Tidal,
    #[serde(rename = "youtube")]
    YouTube,
    #[serde(rename = "youtube_music")]
    YouTubeMusic,
    AppleMusic,
    Deezer,
    #[serde(rename = "soundcloud")]
    SoundCloud,
    AmazonMusic,
}

impl PlatformId {
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformId::Spotify      => "spotify",
            PlatformId::Tidal        => "tidal",
            PlatformId::YouTube      => "youtube",
            PlatformId::YouTubeMusic => "youtube_music",
            PlatformId::AppleMusic   => "apple_music",
            PlatformId::Deezer       => "deezer",
            PlatformId::SoundCloud   => "soundcloud",
            PlatformId::AmazonMusic  => "amazon_music",
        }
    }

    /// Maps the platform keys the link aggregator uses in `linksByPlatform`
    pub fn from_aggregator_key(key: &str) -> Option<PlatformId> {
        match key {
            "spotify"      => Some(PlatformId::Spotify),
            "tidal"        => Some(PlatformId::Tidal),
            "youtube"      => Some(PlatformId::YouTube),
            "youtubeMusic" => Some(PlatformId::YouTubeMusic),
            "appleMusic"   => Some(PlatformId::AppleMusic),
            "deezer"       => Some(PlatformId::Deezer),
            "soundcloud"   => Some(PlatformId::SoundCloud),
            "amazonMusic"  => Some(PlatformId::AmazonMusic),
            _ => None,
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanceStyle {
    ArgentineTango,
    Bachata,
    Bolero,
    ChaCha,
    EastCoastSwing,
    Foxtrot,
    Hustle,
    Jive,
    LindyHop,
    Mambo,
    Merengue,
    #[serde(rename = "night_club_2_step")]
    NightClub2Step,
    PasoDoble,
    Peabody,
    Quickstep,
    Rumba,
    Salsa,
    Samba,
    Tango,
    VienneseWaltz,
    Waltz,
    WestCoastSwing,
}

impl DanceStyle {
    pub const ALL: [DanceStyle; 22] = [
        DanceStyle::ArgentineTango,
        DanceStyle::Bachata,
        DanceStyle::Bolero,
        DanceStyle::ChaCha,
        DanceStyle::EastCoastSwing,
        DanceStyle::Foxtrot,
        DanceStyle::Hustle,
        DanceStyle::Jive,
        DanceStyle::LindyHop,
        DanceStyle::Mambo,
        DanceStyle::Merengue,
        DanceStyle::NightClub2Step,
        DanceStyle::PasoDoble,
        DanceStyle::Peabody,
        DanceStyle::Quickstep,
        DanceStyle::Rumba,
        DanceStyle::Salsa,
        DanceStyle::Samba,
        DanceStyle::Tango,
        DanceStyle::VienneseWaltz,
        DanceStyle::Waltz,
        DanceStyle::WestCoastSwing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DanceStyle::ArgentineTango => "argentine_tango",
            DanceStyle::Bachata        => "bachata",
            DanceStyle::Bolero         => "bolero",
            DanceStyle::ChaCha         => "cha_cha",
            DanceStyle::EastCoastSwing => "east_coast_swing",
            DanceStyle::Foxtrot        => "foxtrot",
            DanceStyle::Hustle         => "hustle",
            DanceStyle::Jive           => "jive",
            DanceStyle::LindyHop       => "lindy_hop",
            DanceStyle::Mambo          => "mambo",
            DanceStyle::Merengue       => "merengue",
            DanceStyle::NightClub2Step => "night_club_2_step",
            DanceStyle::PasoDoble      => "paso_doble",
            DanceStyle::Peabody        => "peabody",
            DanceStyle::Quickstep      => "quickstep",
            DanceStyle::Rumba          => "rumba",
            DanceStyle::Salsa          => "salsa",
            DanceStyle::Samba          => "samba",
            DanceStyle::Tango          => "tango",
            DanceStyle::VienneseWaltz  => "viennese_waltz",
            DanceStyle::Waltz          => "waltz",
            DanceStyle::WestCoastSwing => "west_coast_swing",
        }
    }
}

impl fmt::Display for DanceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DanceStyle {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        DanceStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| TrackError::Parse(format!("unknown dance style: {s}")))
    }
}

/// A link a user submitted together with the styles they tagged it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub raw_url: String,
    pub styles: BTreeSet<DanceStyle>,
}

impl SubmissionRequest {
    pub fn new(raw_url: impl Into<String>, styles: impl IntoIterator<Item = DanceStyle>) -> Self {
        Self { raw_url: raw_url.into(), styles: styles.into_iter().collect() }
    }

    /// Accepts the form body the browser UI posts: a link under
    /// `streaming_link` or `share_url` and one boolean per style column.
    pub fn from_form(body: &Value) -> Result<Self, TrackError> {
        let raw_url = ["streaming_link", "share_url"]
            .iter()
            .filter_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| TrackError::Unsupported(
                "submission has no streaming_link or share_url".to_string()
            ))?;

        let styles = DanceStyle::ALL
            .into_iter()
            .filter(|style| body.get(style.as_str()).and_then(Value::as_bool) == Some(true));

        Ok(Self::new(raw_url, styles))
    }
}

/// What a single resolver learned about a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub canonical_url: String,
    pub links: BTreeMap<PlatformId, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub title: String,
    pub artist: String,
    pub canonical_url: String,
    pub per_platform_urls: BTreeMap<PlatformId, String>,
    pub resolved_at: DateTime<Utc>,
    pub styles: BTreeSet<DanceStyle>,
}

impl ResolvedTrack {
    pub fn new(
        meta: TrackMetadata,
        styles: BTreeSet<DanceStyle>,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: meta.title,
            artist: meta.artist,
            canonical_url: meta.canonical_url,
            per_platform_urls: meta.links,
            resolved_at,
            styles,
        }
    }

    pub fn url_for(&self, platform: PlatformId) -> Option<&str> {
        self.per_platform_urls.get(&platform).map(String::as_str)
    }
}
