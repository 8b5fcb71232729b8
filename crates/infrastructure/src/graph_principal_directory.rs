use async_trait::async_trait;
use idbridge_application::{CreatePrincipalInput, PrincipalDirectory};
use idbridge_core::{AppError, AppResult};
use idbridge_domain::PrincipalRecord;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

const GRAPH_API_VERSION: &str = "v1.0";

/// Principal directory backed by the Microsoft Graph users API.
pub struct GraphPrincipalDirectory {
    http_client: reqwest::Client,
    base_url: Url,
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    id: String,
    user_principal_name: String,
}

impl From<GraphUser> for PrincipalRecord {
    fn from(user: GraphUser) -> Self {
        Self {
            id: user.id,
            principal_identifier: user.user_principal_name,
        }
    }
}

impl GraphPrincipalDirectory {
    /// Creates a Graph-backed directory.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        access_token: impl Into<String>,
    ) -> AppResult<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            AppError::Validation(format!("invalid Graph base URL '{base_url}': {error}"))
        })?;

        Ok(Self {
            http_client,
            base_url,
            access_token: access_token.into(),
        })
    }

    fn users_url<'a>(&self, extra_segments: impl IntoIterator<Item = &'a str>) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation(format!(
                    "Graph base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend([GRAPH_API_VERSION, "users"])
            .extend(extra_segments);

        Ok(url)
    }
}

async fn unexpected_status(response: reqwest::Response, operation: &str) -> AppError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
    let message = format!("Graph {operation} failed with status {status}: {body}");

    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::BAD_REQUEST => AppError::Validation(message),
        _ => AppError::Internal(message),
    }
}

#[async_trait]
impl PrincipalDirectory for GraphPrincipalDirectory {
    async fn find_principal(
        &self,
        principal_identifier: &str,
    ) -> AppResult<Option<PrincipalRecord>> {
        let url = self.users_url([principal_identifier])?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("Graph user lookup transport error: {error}"))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(principal = %principal_identifier, "principal not found in directory");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(unexpected_status(response, "user lookup").await);
        }

        let user = response.json::<GraphUser>().await.map_err(|error| {
            AppError::Internal(format!("Graph user lookup returned invalid JSON: {error}"))
        })?;

        Ok(Some(user.into()))
    }

    async fn create_principal(&self, input: CreatePrincipalInput) -> AppResult<PrincipalRecord> {
        let url = self.users_url(std::iter::empty())?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "accountEnabled": input.account_enabled,
                "displayName": input.display_name,
                "mailNickname": input.mail_nickname,
                "userPrincipalName": input.principal_identifier,
                "passwordProfile": {
                    "forceChangePasswordNextSignIn": true,
                    "password": input.password,
                },
            }))
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("Graph user creation transport error: {error}"))
            })?;

        if !response.status().is_success() {
            return Err(unexpected_status(response, "user creation").await);
        }

        let user = response.json::<GraphUser>().await.map_err(|error| {
            AppError::Internal(format!("Graph user creation returned invalid JSON: {error}"))
        })?;

        Ok(user.into())
    }
}
