//! Microsoft Graph REST client for the lookups the resolver needs.

use std::time::Duration;

use tracing::instrument;

use crate::error::GraphError;
use crate::types::*;

const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Only the ids are needed from a drive.
const DRIVE_SELECT: &str = "id,sharePointIds";

pub struct GraphClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GraphClient {
    pub fn new(access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url: GRAPH_API_BASE.to_string(),
        }
    }

    /// Client against a custom base URL (national clouds, beta endpoint, mocks).
    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client with a per-request timeout.
    ///
    /// # Errors
    /// Fails if the underlying HTTP client cannot be built.
    pub fn with_timeout(
        access_token: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, GraphError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Default drive of a site, addressed as `host:/sites/x` or by site id.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_site_drive(&self, site_address: &str) -> Result<Drive, GraphError> {
        let url = format!(
            "{}/sites/{}/drive?$select={}",
            self.base_url,
            encode_site_address(site_address),
            DRIVE_SELECT
        );
        self.get_json(&url).await
    }

    /// A site, addressed as `host:/sites/x` or by site id.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_site(&self, site_address: &str) -> Result<Site, GraphError> {
        let url = format!(
            "{}/sites/{}",
            self.base_url,
            encode_site_address(site_address)
        );
        self.get_json(&url).await
    }

    /// OneDrive of a user.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_user_drive(&self, user_principal_name: &str) -> Result<Drive, GraphError> {
        let url = format!(
            "{}/users/{}/drive?$select={}",
            self.base_url,
            urlencoding::encode(user_principal_name),
            DRIVE_SELECT
        );
        self.get_json(&url).await
    }

    /// A list item with its fields expanded.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_list_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
    ) -> Result<ListItem, GraphError> {
        let url = format!(
            "{}/sites/{}/lists/{}/items/{}?$expand=fields",
            self.base_url,
            urlencoding::encode(site_id),
            urlencoding::encode(list_id),
            urlencoding::encode(item_id),
        );
        self.get_json(&url).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get_user(&self, user_principal_name: &str) -> Result<User, GraphError> {
        let url = format!(
            "{}/users/{}",
            self.base_url,
            urlencoding::encode(user_principal_name)
        );
        self.get_json(&url).await
    }

    /// Requires OnlineMeetings.Read.All plus an application access policy for the organizer.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_online_meeting(
        &self,
        organizer_id: &str,
        meeting_id: &str,
    ) -> Result<OnlineMeeting, GraphError> {
        let url = format!(
            "{}/users/{}/onlineMeetings/{}",
            self.base_url,
            urlencoding::encode(organizer_id),
            urlencoding::encode(meeting_id),
        );
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, GraphError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Map status codes onto `GraphError`.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GraphError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| GraphError::InvalidResponse(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(GraphError::TokenExpired)
        } else if status.as_u16() == 403 {
            let text = response.text().await.unwrap_or_default();
            Err(GraphError::Forbidden(text))
        } else if status.as_u16() == 404 {
            let text = response.text().await.unwrap_or_default();
            Err(GraphError::NotFound(text))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(GraphError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(GraphError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

/// Percent-encode each path segment of a site address, keeping `/` and the `host:` separator.
fn encode_site_address(site_address: &str) -> String {
    site_address
        .split('/')
        .map(|segment| urlencoding::encode(segment).replace("%3A", ":"))
        .collect::<Vec<_>>()
        .join("/")
}
