//! idbridge command-line runtime.

#![forbid(unsafe_code)]

mod cli_config;
mod config_document;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use idbridge_application::{
    FederationPlanService, PrincipalDirectory, RbacReconciliationService, RoleAssignmentSink,
};
use idbridge_core::{AppError, AppResult};
use idbridge_infrastructure::{
    ArmRoleAssignmentSink, GraphPrincipalDirectory, InMemoryPrincipalDirectory,
    RecordingRoleAssignmentSink,
};
use serde::Serialize;
use tracing::info;

use crate::cli_config::{
    CliCommand, CliConfig, DirectoryProviderConfig, SinkProviderConfig, init_tracing,
};
use crate::config_document::ConfigDocument;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = CliConfig::load()?;
    let document = ConfigDocument::read(&config.config_path).await?;

    info!(
        command = config.command.as_str(),
        config_path = %config.config_path.display(),
        "idbridge-cli started"
    );

    match config.command {
        CliCommand::Rbac => run_rbac(&config, &document).await,
        CliCommand::Federation => run_federation(&document),
    }
}

async fn run_rbac(config: &CliConfig, document: &ConfigDocument) -> AppResult<()> {
    let configuration = document.rbac_configuration()?;
    let http_client = build_http_client(config)?;
    let profiles = document.profile_catalog();

    info!(
        profiles = %profiles.names().collect::<Vec<_>>().join(","),
        users = configuration.users.len(),
        "loaded RBAC configuration"
    );

    let service = RbacReconciliationService::new(
        build_directory(config, http_client.clone())?,
        build_sink(config, http_client)?,
        profiles,
        document.role_catalog(),
        config.options,
    );

    let report = service.reconcile(&configuration).await?;
    print_json(&report)
}

fn run_federation(document: &ConfigDocument) -> AppResult<()> {
    let plan = FederationPlanService::new().plan(document.federation_settings()?, Utc::now())?;
    print_json(&plan)
}

fn build_http_client(config: &CliConfig) -> AppResult<Option<reqwest::Client>> {
    if !config.needs_http_client() {
        return Ok(None);
    }

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .map(Some)
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))
}

fn build_directory(
    config: &CliConfig,
    http_client: Option<reqwest::Client>,
) -> AppResult<Arc<dyn PrincipalDirectory>> {
    match (&config.directory, http_client) {
        (DirectoryProviderConfig::Memory, _) => Ok(Arc::new(InMemoryPrincipalDirectory::new())),
        (
            DirectoryProviderConfig::Graph {
                base_url,
                access_token,
            },
            Some(http_client),
        ) => Ok(Arc::new(GraphPrincipalDirectory::new(
            http_client,
            base_url,
            access_token.as_str(),
        )?)),
        (DirectoryProviderConfig::Graph { .. }, None) => Err(AppError::Internal(
            "Graph directory configured without an HTTP client".to_owned(),
        )),
    }
}

fn build_sink(
    config: &CliConfig,
    http_client: Option<reqwest::Client>,
) -> AppResult<Arc<dyn RoleAssignmentSink>> {
    match (&config.sink, http_client) {
        (SinkProviderConfig::Record, _) => Ok(Arc::new(RecordingRoleAssignmentSink::new())),
        (
            SinkProviderConfig::Arm {
                base_url,
                access_token,
                max_attempts,
                retry_backoff_ms,
            },
            Some(http_client),
        ) => Ok(Arc::new(ArmRoleAssignmentSink::new(
            http_client,
            base_url,
            access_token.as_str(),
            *max_attempts,
            *retry_backoff_ms,
        )?)),
        (SinkProviderConfig::Arm { .. }, None) => Err(AppError::Internal(
            "Resource Manager sink configured without an HTTP client".to_owned(),
        )),
    }
}

fn print_json(value: &impl Serialize) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}
