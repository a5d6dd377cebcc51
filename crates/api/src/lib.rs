//! Metric web service client utilities.
//!
//! This module provides a lightweight client for the metric web service that
//! backs dashboard tables. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Reading the service base URL from `ARGUS_WS_URL`
//! - Attaching an optional bearer token from `ARGUS_ACCESS_TOKEN`
//! - Building requests with a consistent User-Agent and Accept headers
//!
//! The primary entry point is [`ArgusClient`]. Create an instance via
//! [`ArgusClient::new_from_env`] or [`ArgusClient::new`], and then build
//! requests with [`ArgusClient::request`].
//!
//! # Example
//!
//! ```ignore
//! use agtable_api::ArgusClient;
//! use anyhow::Result;
//!
//! async fn run() -> Result<()> {
//!     let client = ArgusClient::new_from_env()?;
//!     let res = client
//!         .request(reqwest::Method::GET, "metrics")
//!         .query(&[("expression", "-1h:system:cpu:avg")])
//!         .send()
//!         .await?;
//!     println!("status: {}", res.status());
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Url, header};
use tracing::debug;

/// Environment variable holding the web service base URL.
pub const WS_URL_ENV: &str = "ARGUS_WS_URL";

/// Environment variable holding an optional bearer token.
pub const ACCESS_TOKEN_ENV: &str = "ARGUS_ACCESS_TOKEN";

/// Base URL used when `ARGUS_WS_URL` is unset.
pub const DEFAULT_WS_URL: &str = "http://localhost:8080/argusws/";

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for the metric web service.
///
/// The client pre-configures default headers and builds requests against a
/// validated base URL that always ends with `/`.
pub struct ArgusClient {
    pub base_url: Url,
    pub http: Client,
    pub user_agent: String,
}

impl ArgusClient {
    /// Construct an [`ArgusClient`] from `ARGUS_WS_URL` and `ARGUS_ACCESS_TOKEN`.
    pub fn new_from_env() -> Result<Self> {
        let base_url = env::var(WS_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WS_URL.into());
        let access_token = env::var(ACCESS_TOKEN_ENV).ok().filter(|token| !token.trim().is_empty());
        Self::build(&base_url, access_token.as_deref())
    }

    /// Construct a client for an explicit base URL without authentication.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, None)
    }

    fn build(base_url: &str, access_token: Option<&str>) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        if let Some(access_token) = access_token {
            let authorization_header_value = format!("Bearer {}", access_token.trim());
            default_headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&authorization_header_value).context("invalid access token")?,
            );
        }
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("agtable/0.1; {}", env::consts::OS),
        })
    }

    /// Build a `reqwest::RequestBuilder` for a method and service-relative path.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(%url, "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    /// Resolve a service-relative path against the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Validate and normalize a base URL.
///
/// Rules:
/// - the URL must parse and use `http` or `https`
/// - the URL must include a host
/// - the path is normalized to end with `/`
fn validate_base_url(base: &str) -> Result<Url> {
    let mut parsed_base_url =
        Url::parse(base.trim()).map_err(|e| anyhow!("Invalid {} URL '{}': {}", WS_URL_ENV, base, e))?;

    if !matches!(parsed_base_url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "{} must use http or https; got '{}://'",
            WS_URL_ENV,
            parsed_base_url.scheme()
        ));
    }

    if parsed_base_url.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("{} must include a host", WS_URL_ENV));
    }

    if !parsed_base_url.path().ends_with('/') {
        let path = format!("{}/", parsed_base_url.path());
        parsed_base_url.set_path(&path);
    }

    Ok(parsed_base_url)
}
