//!
//! src/config.rs  Oct 19th, 2026
//!
//! Reads environment into typed configuration for the resolvers,
//! the http clients, the track store and the logger
//!

use std::time;

use url::Url;

use crate::errors::TrackError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const TOKEN_REFRESH_MARGIN: u64 = 300;
pub const DEFAULT_COUNTRY_CODE: &str = "US";

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, TrackError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TrackError::Config(format!("{s} was not set"))),
    }
}

fn env_optional(s: &str) -> Option<String> {
    std::env::var(s).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(s: &str, default: &str) -> String {
    env_optional(s).unwrap_or_else(|| default.to_string())
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

/// Parses a service url from env (or its default) and checks scheme and host
fn service_url(var: &str, default: &str, host: &str) -> Result<Url, TrackError> {
    let raw = env_or(var, default);
    let url = Url::parse(&raw)
        .map_err(|e| TrackError::Config(format!("{var} invalid {e}")))?;

    ensure_https(&url).map_err(TrackError::Config)?;
    ensure_host(&url, host).map_err(TrackError::Config)?;
    Ok(url)
}

/// Url::join drops the last path segment unless the base ends in '/'
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    url
}

/// Which resolution path a process wires up. Only one is ever active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Aggregated,
}

impl Strategy {
    pub fn parse(s: &str) -> Option<Strategy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(Strategy::Direct),
            "aggregated" | "aggregator" | "odesli" => Some(Strategy::Aggregated),
            _ => None
        }
    }
}

/// Client credentials for a platform that issues app-level bearer tokens
#[derive(Debug, Clone)]
pub struct CredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
}

/// Configuration Tidal's openapi expects when hitting endpoints
#[derive(Debug, Clone)]
pub struct TidalConfig {
    pub credentials: CredentialsConfig,
    pub api_base: Url,
    pub country_code: String,
}

fn build_tidal() -> Result<Option<TidalConfig>, TrackError> {
    let Some(client_id) = env_optional("TIDALCLIENTID") else {
        return Ok(None);
    };
    let client_secret = env_check("TIDALSECRET")?;

    let token_url = service_url(
        "TIDAL_TOKEN_URL", "https://auth.tidal.com/v1/oauth2/token", "auth.tidal.com"
    )?;
    let api_base = service_url(
        "TIDAL_API_BASE", "https://openapi.tidal.com/v2/", "openapi.tidal.com"
    )?;
    let country_code = env_or("TIDAL_COUNTRY_CODE", DEFAULT_COUNTRY_CODE);

    Ok(Some(TidalConfig {
        credentials: CredentialsConfig { client_id, client_secret, token_url },
        api_base: with_trailing_slash(api_base),
        country_code,
    }))
}

/// Configuration that Spotify expects when hitting endpoints
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub credentials: CredentialsConfig,
    pub api_base: Url,
}

fn build_spotify() -> Result<Option<SpotifyConfig>, TrackError> {
    let Some(client_id) = env_optional("SPOTIFY_CLIENT_ID") else {
        return Ok(None);
    };
    let client_secret = env_check("SPOTIFY_CLIENT_SECRET")?;

    let token_url = service_url(
        "SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token", "accounts.spotify.com"
    )?;
    let api_base = service_url(
        "SPOTIFY_API_BASE", "https://api.spotify.com/v1/", "api.spotify.com"
    )?;

    Ok(Some(SpotifyConfig {
        credentials: CredentialsConfig { client_id, client_secret, token_url },
        api_base: with_trailing_slash(api_base),
    }))
}

///
/// Configuration for the song.link (odesli) cross platform link api
///
#[derive(Debug, Clone)]
pub struct OdesliConfig {
    pub base_url: Url,
    pub api_key: Option<String>,  // unauthenticated use is rate limited
    pub user_country: String,
}

fn build_odesli() -> Result<OdesliConfig, TrackError> {
    let base_url = service_url(
        "ODESLI_BASE_URL", "https://api.song.link/v1-alpha.1/", "api.song.link"
    )?;

    Ok(OdesliConfig {
        base_url: with_trailing_slash(base_url),
        api_key: env_optional("ODESLI_API_KEY"),
        user_country: env_or("ODESLI_USER_COUNTRY", DEFAULT_COUNTRY_CODE),
    })
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub refresh_margin: time::Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { refresh_margin: time::Duration::from_secs(TOKEN_REFRESH_MARGIN) }
    }
}

fn build_tokens() -> Result<TokenConfig, TrackError> {
    match env_optional("TOKEN_REFRESH_MARGIN_SECS") {
        None => Ok(TokenConfig::default()),
        Some(s) => {
            let secs = s.trim().parse::<u64>().map_err(|e| TrackError::Config(
                format!("TOKEN_REFRESH_MARGIN_SECS invalid {e}")
            ))?;
            Ok(TokenConfig { refresh_margin: time::Duration::from_secs(secs) })
        }
    }
}

///
/// Configuration for Http timeouts, pooling, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for the sqlite track table
///
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub db_url: String,
    pub max_connections: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_url: "sqlite:./data/tracks.db".to_string(),
            max_connections: 8,
        }
    }
}

fn build_persistence() -> PersistenceConfig {
    let mut persistence = PersistenceConfig::default();
    if let Some(db_url) = env_optional("DATABASE_URL") {
        persistence.db_url = db_url;
    }
    persistence
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,slavatracks=debug,reqwest=warn,sqlx=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true,
        }
    }
}

fn build_logging() -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Some(format) = env_optional("LOG_FORMAT") {
        logging.format = match format.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        };
    }
    logging
}

///
/// AppConfig which holds everything the resolver, store and logger need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub strategy: Strategy,
    pub tidal: Option<TidalConfig>,
    pub spotify: Option<SpotifyConfig>,
    pub odesli: OdesliConfig,
    pub tokens: TokenConfig,
    pub http: HttpConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, TrackError> {
    dotenvy::dotenv().ok();

    let strategy = match env_optional("RESOLVER_STRATEGY") {
        None => Strategy::Aggregated,
        Some(s) => Strategy::parse(&s).ok_or_else(|| TrackError::Config(
            format!("RESOLVER_STRATEGY invalid: {s}")
        ))?,
    };

    let tidal       = build_tidal()?;
    let spotify     = build_spotify()?;
    let odesli      = build_odesli()?;
    let tokens      = build_tokens()?;
    let http        = HttpConfig::default();
    let persistence = build_persistence();
    let logging     = build_logging();

    if strategy == Strategy::Direct && tidal.is_none() && spotify.is_none() {
        return Err(TrackError::Config(
            "direct strategy needs TIDALCLIENTID or SPOTIFY_CLIENT_ID".to_string()
        ));
    }

    Ok( AppConfig {
        strategy, tidal, spotify, odesli, tokens, http, persistence, logging
    } )
}
