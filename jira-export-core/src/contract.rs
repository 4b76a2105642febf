//! # contract: the HTTP seam between the export pipeline and the network
//!
//! Everything in the inlining pipeline that touches the network goes through
//! [`ResourceFetcher`]. The production implementation is the authenticated
//! [`crate::jira::JiraClient`]; tests use the generated `MockResourceFetcher`.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` and the mock is exported behind the
//!   default `test-export-mocks` feature so integration tests in `tests/` can use it.

use async_trait::async_trait;
use mockall::automock;
use std::fmt;

/// A successfully retrieved HTTP resource.
#[derive(Debug, Clone, Default)]
pub struct FetchedResource {
    /// Final URL the body was served from.
    pub url: String,
    /// Raw `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResource {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug)]
pub enum FetchError {
    /// Connection, TLS, timeout or body read failure.
    Transport(String),
    /// The server answered with a non-2xx status.
    Status { url: String, status: u16 },
    /// Credentials or client setup are unusable.
    Config(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status { url, status } => write!(f, "HTTP {status} for {url}"),
            FetchError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::Status {
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => FetchError::Transport(e.to_string()),
        }
    }
}

/// Performs a single HTTP GET. Implementors apply their own timeout and auth.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `url` (always absolute). Non-2xx responses must be reported as
    /// [`FetchError::Status`].
    async fn get(&self, url: &str) -> Result<FetchedResource, FetchError>;
}
