use std::time::Duration;

use async_trait::async_trait;
use idbridge_application::RoleAssignmentSink;
use idbridge_core::{AppError, AppResult};
use idbridge_domain::ResolvedAssignment;
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

const ROLE_ASSIGNMENT_API_VERSION: &str = "2022-04-01";

/// Sink provisioning role assignments through the Resource Manager API.
///
/// Assignments are PUT under their deterministic key, so repeated runs
/// address the same resource. An existing assignment is not an error.
pub struct ArmRoleAssignmentSink {
    http_client: reqwest::Client,
    base_url: Url,
    access_token: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl ArmRoleAssignmentSink {
    /// Creates a new Resource Manager sink.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        access_token: impl Into<String>,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> AppResult<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            AppError::Validation(format!(
                "invalid Resource Manager base URL '{base_url}': {error}"
            ))
        })?;

        Ok(Self {
            http_client,
            base_url,
            access_token: access_token.into(),
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        })
    }

    /// Builds the assignment URL, percent-encoding every scope segment.
    fn assignment_url(&self, assignment: &ResolvedAssignment) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation(format!(
                    "Resource Manager base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(assignment.scope.split('/').filter(|segment| !segment.is_empty()))
            .extend([
                "providers",
                "Microsoft.Authorization",
                "roleAssignments",
                assignment.assignment_key.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("api-version", ROLE_ASSIGNMENT_API_VERSION);

        Ok(url)
    }

    async fn put_with_retry(&self, assignment: &ResolvedAssignment) -> AppResult<()> {
        let url = self.assignment_url(assignment)?;
        let body = serde_json::json!({
            "properties": {
                "roleDefinitionId": assignment.role_definition_id,
                "principalId": assignment.principal_id,
                "principalType": assignment.principal_type,
            }
        });

        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .put(url.clone())
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    info!(
                        logical_name = %assignment.logical_name,
                        assignment_key = %assignment.assignment_key,
                        "role assignment provisioned"
                    );
                    return Ok(());
                }
                Ok(response) if response.status() == StatusCode::CONFLICT => {
                    debug!(
                        logical_name = %assignment.logical_name,
                        assignment_key = %assignment.assignment_key,
                        "role assignment already exists"
                    );
                    return Ok(());
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} for role assignment '{}'",
                        response.status(),
                        assignment.assignment_key
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    let message = format!(
                        "role assignment '{}' on '{}' failed with status {status}: {body}",
                        assignment.logical_name, assignment.scope
                    );

                    return Err(match status {
                        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
                        StatusCode::FORBIDDEN => AppError::Forbidden(message),
                        StatusCode::NOT_FOUND => AppError::NotFound(message),
                        _ => AppError::Validation(message),
                    });
                }
                Err(error) => {
                    last_error = Some(format!("role assignment transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                warn!(
                    assignment_key = %assignment.assignment_key,
                    attempt,
                    delay_ms = delay,
                    "retrying role assignment"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Internal(last_error.unwrap_or_else(|| {
            "role assignment exhausted retries".to_owned()
        })))
    }
}

#[async_trait]
impl RoleAssignmentSink for ArmRoleAssignmentSink {
    async fn declare(&self, assignment: &ResolvedAssignment) -> AppResult<()> {
        self.put_with_retry(assignment).await
    }
}

#[cfg(test)]
mod tests {
    use idbridge_application::RoleAssignmentSink;
    use idbridge_core::AppError;
    use idbridge_domain::{AssignmentKey, ResolvedAssignment};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::ArmRoleAssignmentSink;

    const ROLE_DEFINITION_ID: &str = "/subscriptions/sub1/providers/Microsoft.Authorization/roleDefinitions/b24988ac-6180-42a0-ab88-20f7382dd24c";

    fn assignment() -> ResolvedAssignment {
        let assignment_key = AssignmentKey::derive("principal-1", ROLE_DEFINITION_ID, "/subscriptions/sub1");

        ResolvedAssignment {
            principal_identifier: "alice@example.com".to_owned(),
            principal_id: "principal-1".to_owned(),
            principal_type: "User".to_owned(),
            role_name: "Contributor".to_owned(),
            role_definition_id: ROLE_DEFINITION_ID.to_owned(),
            scope: "/subscriptions/sub1".to_owned(),
            assignment_key,
            logical_name: "rbac-alice-example-com-contributor-subscription".to_owned(),
        }
    }

    fn sink(server: &MockServer, max_attempts: u8) -> ArmRoleAssignmentSink {
        ArmRoleAssignmentSink::new(reqwest::Client::new(), &server.uri(), "arm-token", max_attempts, 50)
            .unwrap_or_else(|_| unreachable!())
    }

    fn assignment_path(assignment: &ResolvedAssignment) -> String {
        format!(
            "/subscriptions/sub1/providers/Microsoft.Authorization/roleAssignments/{}",
            assignment.assignment_key
        )
    }

    #[tokio::test]
    async fn declare_puts_assignment_under_its_key() {
        let server = MockServer::start().await;
        let assignment = assignment();
        Mock::given(method("PUT"))
            .and(path(assignment_path(&assignment)))
            .and(query_param("api-version", "2022-04-01"))
            .and(header("authorization", "Bearer arm-token"))
            .and(body_json(json!({
                "properties": {
                    "roleDefinitionId": ROLE_DEFINITION_ID,
                    "principalId": "principal-1",
                    "principalType": "User",
                }
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let result = sink(&server, 3).declare(&assignment).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn existing_assignment_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": "RoleAssignmentExists" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = sink(&server, 3).declare(&assignment()).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn throttled_requests_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = sink(&server, 3).declare(&assignment()).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn persistent_server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let result = sink(&server, 2).declare(&assignment()).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn forbidden_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AuthorizationFailed"))
            .expect(1)
            .mount(&server)
            .await;

        let result = sink(&server, 3).declare(&assignment()).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn resource_scopes_are_percent_encoded() {
        let server = MockServer::start().await;
        let mut assignment = assignment();
        assignment.scope =
            "/subscriptions/sub1/resourceGroups/rg-app/providers/Microsoft.Compute/virtualMachines/build vm#1"
                .to_owned();
        Mock::given(method("PUT"))
            .and(path(format!(
                "/subscriptions/sub1/resourceGroups/rg-app/providers/Microsoft.Compute/virtualMachines/build%20vm%231/providers/Microsoft.Authorization/roleAssignments/{}",
                assignment.assignment_key
            )))
            .and(query_param("api-version", "2022-04-01"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let result = sink(&server, 1).declare(&assignment).await;

        assert!(result.is_ok());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ArmRoleAssignmentSink::new(reqwest::Client::new(), "not a url", "token", 3, 50);

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
