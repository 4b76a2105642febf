//! Authenticated HTTP session against a Jira instance.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::contract::{FetchError, FetchedResource, ResourceFetcher};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Credentials for basic auth against Jira (username + API token).
#[derive(Clone)]
pub struct JiraCredentials {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl JiraCredentials {
    /// Reads `JIRA_URL`, `JIRA_USERNAME` and `JIRA_API_TOKEN`. Empty values count as missing.
    pub fn from_env() -> Result<Self, FetchError> {
        fn required(key: &str) -> Result<String, FetchError> {
            match std::env::var(key) {
                Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
                _ => {
                    error!(var = key, "Jira credential environment variable missing");
                    Err(FetchError::Config(format!("{key} is not set")))
                }
            }
        }
        Ok(Self {
            base_url: required("JIRA_URL")?.trim_end_matches('/').to_string(),
            username: required("JIRA_USERNAME")?,
            api_token: required("JIRA_API_TOKEN")?,
        })
    }
}

pub struct JiraClient {
    client: Client,
    credentials: JiraCredentials,
}

impl JiraClient {
    /// Builds the session without contacting the server.
    pub fn new(credentials: JiraCredentials, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials: JiraCredentials {
                base_url: credentials.base_url.trim_end_matches('/').to_string(),
                ..credentials
            },
        })
    }

    /// Builds the session and verifies the credentials against `/rest/api/2/myself`.
    pub async fn connect(credentials: JiraCredentials, timeout: Duration) -> Result<Self, FetchError> {
        let client = Self::new(credentials, timeout)?;
        let url = format!("{}/rest/api/2/myself", client.credentials.base_url);
        info!(url = %url, username = %client.credentials.username, "Authenticating with Jira");

        let myself = client.get(&url).await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to authenticate with Jira");
            e
        })?;
        let display_name = serde_json::from_slice::<serde_json::Value>(&myself.body)
            .ok()
            .and_then(|v| v.get("displayName").and_then(|n| n.as_str()).map(str::to_string));
        info!(
            username = %client.credentials.username,
            display_name = display_name.as_deref().unwrap_or("<unknown>"),
            "Successfully authenticated"
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }

    /// URL of the printable single-issue HTML view.
    pub fn issue_html_url(&self, issue_key: &str) -> String {
        issue_html_url(&self.credentials.base_url, issue_key)
    }
}

pub fn issue_html_url(base_url: &str, issue_key: &str) -> String {
    format!(
        "{}/si/jira.issueviews:issue-html/{issue_key}/{issue_key}.html",
        base_url.trim_end_matches('/')
    )
}

#[async_trait]
impl ResourceFetcher for JiraClient {
    async fn get(&self, url: &str) -> Result<FetchedResource, FetchError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(FetchedResource {
            url: final_url,
            content_type,
            body,
        })
    }
}
