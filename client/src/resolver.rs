//! Tiered dataset resolution: live backend, then static files, then a
//! synthesized default.
//!
//! [`DataResolver::resolve`] never fails. Each provider either satisfies the
//! whole request or is recorded as declined; when every provider declines the
//! request's synthesized payload is returned instead.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ResolverConfig, USER_AGENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Live,
    StaticFallback,
    Synthesized,
}

impl Tier {
    pub const ALL: [Self; 3] = [Self::Live, Self::StaticFallback, Self::Synthesized];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::StaticFallback => "static",
            Self::Synthesized => "synthesized",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single provider did not satisfy a request. Always recoverable: the
/// resolver moves on to the next provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderDeclined {
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("malformed payload: {0}")]
    Parse(String),
    #[error("empty payload")]
    Empty,
    #[error("unsupported content type `{0}`")]
    UnsupportedContent(String),
    #[error("refusing path `{0}`")]
    InvalidPath(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclinedAttempt {
    pub tier: Tier,
    pub source: String,
    pub reason: ProviderDeclined,
}

#[derive(Debug, thiserror::Error)]
#[error("all {} provider(s) declined the {kind} request", attempts.len())]
pub struct ExhaustedProviders {
    pub kind: &'static str,
    pub attempts: Vec<DeclinedAttempt>,
}

/// Result of resolving one request. `provenance` says which tier produced
/// `payload`; `declined` lists the providers tried before it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDataset<T> {
    pub provenance: Tier,
    pub payload: T,
    pub source: String,
    pub declined: Vec<DeclinedAttempt>,
}

impl<T> ResolvedDataset<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolvedDataset<U> {
        ResolvedDataset {
            provenance: self.provenance,
            payload: f(self.payload),
            source: self.source,
            declined: self.declined,
        }
    }
}

/// One place the resolver can look.
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    Remote { url: String },
    /// A site-relative path (`/data/...`) mirrored under a local root.
    StaticAsset { root: PathBuf, relative: String },
    File { path: PathBuf },
}

impl Provider {
    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote { url: url.into() }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Self::Remote { .. } => Tier::Live,
            Self::StaticAsset { .. } | Self::File { .. } => Tier::StaticFallback,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Remote { url } => url.clone(),
            Self::StaticAsset { root, relative } => {
                format!("{}{}", root.display(), ensure_leading_slash(relative))
            }
            Self::File { path } => path.display().to_string(),
        }
    }
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Raw bytes as a provider returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// A logical dataset the resolver knows how to look up.
pub trait DatasetRequest {
    type Output;

    /// Short name used in logs and errors.
    fn kind(&self) -> &'static str;

    /// Providers in priority order.
    fn providers(&self, config: &ResolverConfig) -> Vec<Provider>;

    fn decode(&self, fetched: Fetched) -> Result<Self::Output, ProviderDeclined>;

    /// Payload used when every provider declined.
    fn synthesize(&self) -> Self::Output;

    fn empty_is_failure(&self) -> bool {
        false
    }

    fn is_empty(&self, _output: &Self::Output) -> bool {
        false
    }
}

/// Shared by dashboard sessions and the HTTP server; holds a pooled
/// `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct DataResolver {
    http: reqwest::Client,
    config: ResolverConfig,
}

impl DataResolver {
    pub fn new(config: ResolverConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn with_client(http: reqwest::Client, config: ResolverConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn resolve<R: DatasetRequest>(&self, request: &R) -> ResolvedDataset<R::Output> {
        let mut declined = Vec::new();

        for provider in request.providers(&self.config) {
            let tier = provider.tier();
            let source = provider.describe();

            match self.try_provider(request, &provider).await {
                Ok(payload) => {
                    if !declined.is_empty() {
                        info!(
                            kind = request.kind(),
                            tier = %tier,
                            source = %source,
                            declined = declined.len(),
                            "Resolved from fallback provider"
                        );
                    }
                    return ResolvedDataset {
                        provenance: tier,
                        payload,
                        source,
                        declined,
                    };
                }
                Err(reason) => {
                    debug!(
                        kind = request.kind(),
                        tier = %tier,
                        source = %source,
                        error = %reason,
                        "Provider declined"
                    );
                    declined.push(DeclinedAttempt {
                        tier,
                        source,
                        reason,
                    });
                }
            }
        }

        let exhausted = ExhaustedProviders {
            kind: request.kind(),
            attempts: declined,
        };
        warn!(error = %exhausted, "Serving synthesized payload");

        ResolvedDataset {
            provenance: Tier::Synthesized,
            payload: request.synthesize(),
            source: "synthesized".to_string(),
            declined: exhausted.attempts,
        }
    }

    async fn try_provider<R: DatasetRequest>(
        &self,
        request: &R,
        provider: &Provider,
    ) -> Result<R::Output, ProviderDeclined> {
        let fetched = self.fetch(provider).await?;
        let output = request.decode(fetched)?;
        if request.empty_is_failure() && request.is_empty(&output) {
            return Err(ProviderDeclined::Empty);
        }
        Ok(output)
    }

    async fn fetch(&self, provider: &Provider) -> Result<Fetched, ProviderDeclined> {
        let limit = self.config.request_timeout;
        let attempt = async {
            match provider {
                Provider::Remote { url } => self.fetch_remote(url).await,
                Provider::StaticAsset { root, relative } => {
                    let path = resolve_static_path(root, relative)?;
                    read_file(&path).await
                }
                Provider::File { path } => read_file(path).await,
            }
        };

        tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| ProviderDeclined::Timeout(limit))?
    }

    async fn fetch_remote(&self, url: &str) -> Result<Fetched, ProviderDeclined> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.declined_from_reqwest(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderDeclined::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| self.declined_from_reqwest(e))?;

        Ok(Fetched {
            bytes,
            content_type,
        })
    }

    fn declined_from_reqwest(&self, e: reqwest::Error) -> ProviderDeclined {
        if e.is_timeout() {
            ProviderDeclined::Timeout(self.config.request_timeout)
        } else {
            ProviderDeclined::Network(e.to_string())
        }
    }
}

/// Join a site-relative path onto `root`, refusing anything that would
/// climb out of it.
pub fn resolve_static_path(root: &Path, relative: &str) -> Result<PathBuf, ProviderDeclined> {
    let trimmed = relative.trim_start_matches('/');
    let candidate = Path::new(trimmed);
    let escapes = trimmed.is_empty()
        || candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ProviderDeclined::InvalidPath(relative.to_string()));
    }
    Ok(root.join(candidate))
}

async fn read_file(path: &Path) -> Result<Fetched, ProviderDeclined> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Fetched {
            bytes: Bytes::from(bytes),
            content_type: None,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ProviderDeclined::MissingFile(path.to_path_buf()))
        }
        Err(e) => Err(ProviderDeclined::Io(format!("{}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{ProviderDeclined, resolve_static_path};

    #[test]
    fn static_paths_stay_under_root() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve_static_path(root, "/data/kisumu/trends.json"),
            Ok(PathBuf::from("/srv/public/data/kisumu/trends.json"))
        );
        assert_eq!(
            resolve_static_path(root, "/data/../../etc/passwd"),
            Err(ProviderDeclined::InvalidPath(
                "/data/../../etc/passwd".to_string()
            ))
        );
        assert!(resolve_static_path(root, "/").is_err());
    }
}
