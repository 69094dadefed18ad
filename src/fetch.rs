//!
//! src/fetch.rs  Oct 19th, 2026
//!
//! Defines methods for hitting the metadata endpoints each resolver
//! needs and returning unparsed json
//!

use reqwest::{Client, header, redirect, RequestBuilder};
use serde_json::Value;
use url::Url;

use crate::config::{CredentialsConfig, HttpConfig, OdesliConfig, SpotifyConfig, TidalConfig};
use crate::errors::{FetchError, TrackError};

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder  {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_accept(http: &HttpConfig, accept: &'static str) ->
    Result<Client, TrackError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static(accept));
    client_helper(http)
        .default_headers(h)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TrackError::Config(format!("build client: {e}")))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, TrackError> {
    client_with_accept(http, "application/json")
}

/// Joins a relative path onto a base that already ends in '/'
fn endpoint(base: &Url, path: &str) -> Result<Url, FetchError> {
    base.join(path)
        .map_err(|e| FetchError::decode(format!("bad endpoint {path}: {e}")))
}

/// Sends the request and decodes a json body, keeping the status of
/// unsuccessful responses so callers can classify them
pub async fn send_json(request: RequestBuilder) -> Result<Value, FetchError> {
    let response = request.send().await.map_err(FetchError::transport)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::status(status, &body));
    }
    response.json::<Value>()
        .await
        .map_err(|e| FetchError::decode(format!("decode body: {e}")))
}

/// POST to an oauth2 token endpoint with the client_credentials grant
#[derive(Clone, Debug)]
pub struct TokenClient {
    pub http: Client,
    pub cfg: CredentialsConfig
}

impl TokenClient {
    pub fn new(http_config: &HttpConfig, cfg: &CredentialsConfig) ->
        Result<Self, TrackError> {
        let http = base_client(http_config)?;
        Ok( Self { http, cfg: cfg.clone() })
    }

    pub fn token_request(&self) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
    }
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub api_base: Url
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, TrackError> {
        let http = base_client(http_config)?;
        Ok( Self { http, api_base: cfg.api_base.clone() })
    }

    /// GET /v1/tracks/{id}
    pub fn track(&self, track_id: &str, bearer: &str) -> Result<RequestBuilder, FetchError> {
        let url = endpoint(&self.api_base, &format!("tracks/{track_id}"))?;
        Ok(self.http.get(url).bearer_auth(bearer))
    }
}

#[derive(Clone, Debug)]
pub struct TidalClient {
    pub http: Client,
    pub api_base: Url,
    pub country_code: String
}

impl TidalClient {
    pub fn new(http_config: &HttpConfig, cfg: &TidalConfig) ->
        Result<Self, TrackError> {
        // openapi v2 speaks json:api
        let http = client_with_accept(http_config, "application/vnd.api+json")?;
        Ok( Self {
            http,
            api_base: cfg.api_base.clone(),
            country_code: cfg.country_code.clone()
        })
    }

    /// GET /v2/tracks/{id}?countryCode=..&include=artists
    pub fn track(&self, track_id: &str, bearer: &str) -> Result<RequestBuilder, FetchError> {
        let url = endpoint(&self.api_base, &format!("tracks/{track_id}"))?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[
            ("countryCode", self.country_code.as_str()),
            ("include", "artists"),
        ]))
    }

    /// GET /v2/artists/{id}?countryCode=..
    pub fn artist(&self, artist_id: &str, bearer: &str) -> Result<RequestBuilder, FetchError> {
        let url = endpoint(&self.api_base, &format!("artists/{artist_id}"))?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[
            ("countryCode", self.country_code.as_str()),
        ]))
    }
}

#[derive(Clone, Debug)]
pub struct OdesliClient {
    pub http: Client,
    pub cfg: OdesliConfig
}

impl OdesliClient {
    pub fn new(http_config: &HttpConfig, cfg: &OdesliConfig) ->
        Result<Self, TrackError> {
        let http = base_client(http_config)?;
        Ok( Self { http, cfg: cfg.clone() })
    }

    /// GET /v1-alpha.1/links?url=...&userCountry=..[&key=..]
    pub fn links(&self, share_url: &str) -> Result<RequestBuilder, FetchError> {
        let url = endpoint(&self.cfg.base_url, "links")?;
        let rb = self.http.get(url).query(&[
            ("url", share_url),
            ("userCountry", self.cfg.user_country.as_str()),
        ]);
        Ok(match &self.cfg.api_key {
            Some(key) => rb.query(&[("key", key.as_str())]),
            None => rb,
        })
    }
}
