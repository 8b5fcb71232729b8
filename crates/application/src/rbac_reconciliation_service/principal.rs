use idbridge_core::AppError;
use idbridge_domain::NormalizedUser;
use tracing::{info, warn};

use crate::directory_ports::CreatePrincipalInput;

use super::*;

impl RbacReconciliationService {
    /// Returns the object id of an existing principal, creating it when absent.
    ///
    /// Must only be called for users that have at least one assignment.
    pub async fn resolve_or_create_principal(
        &self,
        user: &NormalizedUser,
        warnings: &mut Vec<ReconciliationWarning>,
    ) -> AppResult<String> {
        let principal_identifier = user.principal_identifier.as_str();

        match self.directory.find_principal(principal_identifier).await {
            Ok(Some(record)) => {
                let object_id = record.object_id()?.to_owned();
                info!(
                    principal = %principal_identifier,
                    principal_id = %object_id,
                    "using existing principal"
                );
                Ok(object_id)
            }
            Ok(None) => self.create_principal(user, warnings).await,
            Err(error) => match self.options.lookup_failure_policy {
                LookupFailurePolicy::Fail => Err(error),
                LookupFailurePolicy::TreatAsMissing => {
                    warn!(
                        principal = %principal_identifier,
                        error = %error,
                        "principal lookup failed; treating principal as missing"
                    );
                    warnings.push(ReconciliationWarning::LookupFailedTreatedAsMissing {
                        principal_identifier: principal_identifier.to_owned(),
                        error: error.to_string(),
                    });
                    self.create_principal(user, warnings).await
                }
            },
        }
    }

    async fn create_principal(
        &self,
        user: &NormalizedUser,
        warnings: &mut Vec<ReconciliationWarning>,
    ) -> AppResult<String> {
        let display_name = user.creation_display_name();
        let mail_nickname = user.creation_mail_nickname()?;

        let password = match (user.password.clone(), self.options.credential_policy) {
            (Some(password), _) => password,
            (None, CredentialPolicy::GenerateWhenAbsent) => {
                warnings.push(ReconciliationWarning::CredentialGenerated {
                    principal_identifier: user.principal_identifier.clone(),
                });
                generate_initial_credential()?
            }
            (None, CredentialPolicy::RequireExplicit) => {
                return Err(AppError::Validation(format!(
                    "user '{}' does not exist and declares no initial password",
                    user.principal_identifier
                )));
            }
        };

        let record = self
            .directory
            .create_principal(CreatePrincipalInput {
                principal_identifier: user.principal_identifier.clone(),
                display_name,
                mail_nickname,
                password,
                account_enabled: true,
                credential_immutable: true,
            })
            .await?;
        let object_id = record.object_id()?.to_owned();

        info!(
            principal = %user.principal_identifier,
            principal_id = %object_id,
            "created new principal"
        );

        Ok(object_id)
    }
}

/// Generates a random initial credential meeting common complexity rules.
fn generate_initial_credential() -> AppResult<String> {
    use std::fmt::Write;

    let mut bytes = [0_u8; 12];
    getrandom::fill(&mut bytes).map_err(|error| {
        AppError::Internal(format!("failed to generate initial credential: {error}"))
    })?;

    let suffix = bytes
        .iter()
        .fold(String::with_capacity(24), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        });

    Ok(format!("TempPass9{suffix}!"))
}
