use std::collections::HashMap;

use async_trait::async_trait;
use idbridge_application::{CreatePrincipalInput, PrincipalDirectory};
use idbridge_core::{AppError, AppResult};
use idbridge_domain::PrincipalRecord;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory principal directory for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalDirectory {
    principals: RwLock<HashMap<String, PrincipalRecord>>,
}

impl InMemoryPrincipalDirectory {
    /// Creates an empty in-memory directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            principals: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a directory pre-populated with existing principals.
    #[must_use]
    pub fn with_principals(records: impl IntoIterator<Item = PrincipalRecord>) -> Self {
        Self {
            principals: RwLock::new(
                records
                    .into_iter()
                    .map(|record| (lookup_key(&record.principal_identifier), record))
                    .collect(),
            ),
        }
    }
}

fn lookup_key(principal_identifier: &str) -> String {
    principal_identifier.trim().to_lowercase()
}

#[async_trait]
impl PrincipalDirectory for InMemoryPrincipalDirectory {
    async fn find_principal(
        &self,
        principal_identifier: &str,
    ) -> AppResult<Option<PrincipalRecord>> {
        Ok(self
            .principals
            .read()
            .await
            .get(&lookup_key(principal_identifier))
            .cloned())
    }

    async fn create_principal(&self, input: CreatePrincipalInput) -> AppResult<PrincipalRecord> {
        let key = lookup_key(&input.principal_identifier);
        let mut principals = self.principals.write().await;

        if principals.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "principal '{}' already exists",
                input.principal_identifier
            )));
        }

        let record = PrincipalRecord {
            id: Uuid::new_v4().to_string(),
            principal_identifier: input.principal_identifier,
        };
        principals.insert(key, record.clone());

        Ok(record)
    }
}
