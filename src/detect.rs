//!
//! src/detect.rs  Oct 19th, 2026
//!
//! Classifies a submitted link by streaming platform and pulls
//! platform track ids out of link paths. No network access.
//!

use url::Url;

use crate::errors::TrackError;
use crate::types::PlatformId;

/// Known submission prefixes, compared case-insensitively
const PREFIXES: [(&str, PlatformId); 10] = [
    ("https://tidal.com/",         PlatformId::Tidal),
    ("https://www.tidal.com/",     PlatformId::Tidal),
    ("https://listen.tidal.com/",  PlatformId::Tidal),
    ("http://tidal.com/",          PlatformId::Tidal),
    ("http://www.tidal.com/",      PlatformId::Tidal),
    ("http://listen.tidal.com/",   PlatformId::Tidal),
    ("https://open.spotify.com/",  PlatformId::Spotify),
    ("https://play.spotify.com/",  PlatformId::Spotify),
    ("http://open.spotify.com/",   PlatformId::Spotify),
    ("http://play.spotify.com/",   PlatformId::Spotify),
];

pub fn detect(raw_url: &str) -> Result<PlatformId, TrackError> {
    let url = raw_url.trim();
    PREFIXES
        .iter()
        .find(|(prefix, _)| {
            url.len() >= prefix.len()
                && url.is_char_boundary(prefix.len())
                && url[..prefix.len()].eq_ignore_ascii_case(prefix)
        })
        .map(|(_, platform)| *platform)
        .ok_or_else(|| TrackError::Unsupported(format!("no known platform for {url}")))
}

/// The path segment after a `track` segment, if `accept` likes it
fn segment_after_track(raw_url: &str, accept: impl Fn(&str) -> bool) -> Option<String> {
    let url = Url::parse(raw_url.trim()).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|s| s.eq_ignore_ascii_case("track"))?;
    segments
        .next()
        .filter(|id| !id.is_empty() && accept(id))
        .map(str::to_string)
}

/// `https://tidal.com/browse/track/370686004/u` -> `370686004`
pub fn tidal_track_id(raw_url: &str) -> Option<String> {
    segment_after_track(raw_url, |id| id.bytes().all(|b| b.is_ascii_digit()))
}

/// `https://open.spotify.com/track/53o05J0uSWOedPwN4Z0oyo?si=..` -> `53o05J0uSWOedPwN4Z0oyo`
pub fn spotify_track_id(raw_url: &str) -> Option<String> {
    segment_after_track(raw_url, |id| id.bytes().all(|b| b.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_prefixes_case_insensitively() {
        for (prefix, platform) in PREFIXES {
            let url = format!("{prefix}track/1");
            assert_eq!(detect(&url).unwrap(), platform, "{url}");
            assert_eq!(detect(&url.to_uppercase()).unwrap(), platform, "{url}");
        }
        assert_eq!(detect("https://tidal.com/browse/track/370686004/u").unwrap(), PlatformId::Tidal);
        assert_eq!(detect("HTTPS://Listen.Tidal.com/track/1").unwrap(), PlatformId::Tidal);
        assert_eq!(
            detect("  https://open.spotify.com/track/53o05J0uSWOedPwN4Z0oyo?si=XGAiSUelTOW6HTmHFkWn-A").unwrap(),
            PlatformId::Spotify
        );
    }

    #[test]
    fn unknown_prefixes_are_unsupported() {
        for url in [
            "https://example.com/not-a-platform",
            "https://tidal.com.evil.example/track/1",
            "tidal.com/track/1",
            "",
            "https://www.youtube.com/watch?v=abc",
            "https://www.spotify.com/track/1",
            "ftp://open.spotify.com/track/1",
        ] {
            let err = detect(url).unwrap_err();
            assert_eq!(err.kind(), "unsupported", "{url}");
        }
    }

    #[test]
    fn multibyte_input_does_not_panic() {
        assert!(detect("https://tidäl.com/track/1/ümlaut").is_err());
        assert!(detect("ñ").is_err());
    }

    #[test]
    fn tidal_id_is_digits_between_track_and_next_slash() {
        assert_eq!(tidal_track_id("https://tidal.com/browse/track/370686004/u").as_deref(), Some("370686004"));
        assert_eq!(tidal_track_id("https://tidal.com/track/370686004").as_deref(), Some("370686004"));
        assert_eq!(tidal_track_id("https://listen.tidal.com/track/42?u").as_deref(), Some("42"));
        assert_eq!(tidal_track_id("https://tidal.com/browse/album/370686004"), None);
        assert_eq!(tidal_track_id("https://tidal.com/browse/track/abc123/u"), None);
        assert_eq!(tidal_track_id("https://tidal.com/browse/track/"), None);
    }

    #[test]
    fn spotify_id_ignores_query() {
        assert_eq!(
            spotify_track_id("https://open.spotify.com/track/53o05J0uSWOedPwN4Z0oyo?si=XGAiSUelTOW6HTmHFkWn-A").as_deref(),
            Some("53o05J0uSWOedPwN4Z0oyo")
        );
        assert_eq!(
            spotify_track_id("https://open.spotify.com/intl-de/track/53o05J0uSWOedPwN4Z0oyo").as_deref(),
            Some("53o05J0uSWOedPwN4Z0oyo")
        );
        assert_eq!(spotify_track_id("https://open.spotify.com/album/53o05J0uSWOedPwN4Z0oyo"), None);
    }
}
