//!
//! src/lib.rs  Oct 19th, 2026
//!
//! Resolves dance track links from streaming platforms into canonical
//! title, artist and cross platform links, and keeps a deduplicated list
//! of what the group has submitted
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod detect;
pub mod fetch;
pub mod persistent;
pub mod resolve;
pub mod token;
pub mod types;

pub use errors::{ErrorBody, TrackError};
pub use resolve::{Resolver, ResolverTable, TrackResolver};
pub use types::{DanceStyle, PlatformId, ResolvedTrack, SubmissionRequest};
