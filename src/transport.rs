//! Per-call HTTP client construction with proxy support.
//!
//! A [`Transport`] is built from configuration for every outgoing call. It
//! carries the reqwest client plus any headers the proxy route requires, and
//! never touches shared state.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Proxy};
use std::io;
use std::time::Duration;
use tokio::net::lookup_host;
use tracing::debug;
use url::{Host, Url};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::providers::Headers;

const MAX_IDLE_PER_HOST: usize = 100;
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const USER_AGENT: &str = concat!("comet-llm/", env!("CARGO_PKG_VERSION"));
const DEFAULT_SOCKS_PORT: u16 = 1080;

pub const PROXY_AUTHORIZATION: &str = "Proxy-Authorization";

/// User-info carried by a proxy URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: Option<String>,
}

impl ProxyCredentials {
    fn from_url(url: &Url) -> Option<Self> {
        if url.username().is_empty() && url.password().is_none() {
            return None;
        }
        Some(Self {
            username: url.username().to_string(),
            password: url.password().map(str::to_string),
        })
    }

    /// `Basic <base64(user:pass)>`, or `Basic <base64(user)>` without a password
    pub fn basic_auth(&self) -> String {
        let user_info = match &self.password {
            Some(password) => format!("{}:{}", self.username, password),
            None => self.username.clone(),
        };
        format!("Basic {}", STANDARD.encode(user_info))
    }
}

/// How outgoing connections reach the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    Direct,
    /// HTTP or HTTPS forward proxy
    Forward {
        url: Url,
        credentials: Option<ProxyCredentials>,
    },
    /// SOCKS5 dialer, hostnames resolved by the proxy
    Socks5 {
        url: Url,
        credentials: Option<ProxyCredentials>,
    },
}

impl ProxyRoute {
    /// Map a configured proxy URL to a route. Empty or absent means direct.
    pub fn resolve(proxy: Option<&str>) -> Result<Self, TransportError> {
        let raw = match proxy.map(str::trim) {
            None | Some("") => return Ok(ProxyRoute::Direct),
            Some(raw) => raw,
        };
        let url = Url::parse(raw)?;
        let credentials = ProxyCredentials::from_url(&url);
        match url.scheme() {
            "http" | "https" => Ok(ProxyRoute::Forward { url, credentials }),
            "socks5" | "socks5h" => {
                // reqwest only authenticates to the dialer with a password present
                if matches!(&credentials, Some(c) if c.password.is_none()) {
                    return Err(TransportError::SocksPasswordRequired);
                }
                Ok(ProxyRoute::Socks5 { url, credentials })
            }
            other => Err(TransportError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn credentials(&self) -> Option<&ProxyCredentials> {
        match self {
            ProxyRoute::Direct => None,
            ProxyRoute::Forward { credentials, .. } | ProxyRoute::Socks5 { credentials, .. } => {
                credentials.as_ref()
            }
        }
    }

    async fn proxy(&self) -> Result<Option<Proxy>, TransportError> {
        let target = match self {
            ProxyRoute::Direct => return Ok(None),
            ProxyRoute::Forward { url, .. } => url.to_string(),
            ProxyRoute::Socks5 { url, .. } => pinned_socks_url(url).await?.to_string(),
        };
        Proxy::all(target).map(Some).map_err(TransportError::Build)
    }

    /// Proxy URL with any password masked, for logging
    fn redacted(&self) -> String {
        match self {
            ProxyRoute::Direct => "direct".to_string(),
            ProxyRoute::Forward { url, .. } | ProxyRoute::Socks5 { url, .. } => {
                let mut url = url.clone();
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
        }
    }
}

/// The SOCKS5 URL reqwest is given: scheme `socks5h` so target hostnames are
/// resolved by the proxy, and the proxy's own host replaced by an address
/// looked up here. reqwest resolves a hostname synchronously while building
/// the proxy, which would block the executor on every call.
async fn pinned_socks_url(url: &Url) -> Result<Url, TransportError> {
    let mut pinned = url.clone();
    if pinned.scheme() == "socks5" {
        pinned
            .set_scheme("socks5h")
            .map_err(|()| TransportError::UnsupportedScheme(url.scheme().to_string()))?;
    }
    let port = url.port().unwrap_or(DEFAULT_SOCKS_PORT);
    if let Some(Host::Domain(domain)) = url.host() {
        let lookup_failed = |source: io::Error| TransportError::ProxyLookup {
            host: domain.to_string(),
            source,
        };
        let addr = lookup_host((domain, port))
            .await
            .map_err(lookup_failed)?
            .next()
            .ok_or_else(|| {
                lookup_failed(io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
            })?;
        pinned
            .set_ip_host(addr.ip())
            .map_err(|()| TransportError::UnsupportedScheme(url.scheme().to_string()))?;
    }
    pinned
        .set_port(Some(port))
        .map_err(|()| TransportError::UnsupportedScheme(url.scheme().to_string()))?;
    Ok(pinned)
}

/// An HTTP client wired for one outgoing call
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    route: ProxyRoute,
    timeout: Option<Duration>,
    proxy_headers: Headers,
}

impl Transport {
    /// Build the client for one call. A SOCKS5 proxy host is resolved here,
    /// so callers race this against cancellation.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let route = ProxyRoute::resolve(config.proxy.as_deref())?;
        let timeout = config.request_timeout();

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .danger_accept_invalid_certs(false);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder = match route.proxy().await? {
            Some(proxy) => builder.proxy(proxy),
            None => builder.no_proxy(),
        };
        let client = builder.build().map_err(TransportError::Build)?;

        let mut proxy_headers = Headers::new();
        if let Some(credentials) = route.credentials() {
            proxy_headers.insert(PROXY_AUTHORIZATION.to_string(), credentials.basic_auth());
            debug!("added proxy authentication");
        }
        debug!(proxy = %route.redacted(), "built transport");

        Ok(Self {
            client,
            route,
            timeout,
            proxy_headers,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn route(&self) -> &ProxyRoute {
        &self.route
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Headers the route adds to every request.
    ///
    /// `Proxy-Authorization` is sent as an ordinary request header. Over a
    /// SOCKS5 route or an HTTPS tunnel it reaches the provider, not the proxy.
    pub fn proxy_headers(&self) -> &Headers {
        &self.proxy_headers
    }
}
