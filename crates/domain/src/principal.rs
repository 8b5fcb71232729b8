//! Principal declarations and the normalization step that fills their defaults.

use idbridge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::AssignmentDeclaration;

/// Desired state for one user, as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeclaration {
    /// Login name of the principal, unique within one evaluation.
    #[serde(rename = "upn", alias = "principal_identifier")]
    pub principal_identifier: String,
    /// Optional profile preset name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Explicit assignments appended after the profile preset.
    #[serde(default)]
    pub assignments: Vec<AssignmentDeclaration>,
    /// Display name used when the principal has to be created.
    #[serde(
        default,
        alias = "displayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    /// Mail alias used when the principal has to be created.
    #[serde(
        default,
        alias = "mailNickname",
        skip_serializing_if = "Option::is_none"
    )]
    pub mail_nickname: Option<String>,
    /// Initial credential used when the principal has to be created.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl UserDeclaration {
    /// Creates a declaration with only an identifier and optional profile.
    #[must_use]
    pub fn new(principal_identifier: impl Into<String>, profile: Option<&str>) -> Self {
        Self {
            principal_identifier: principal_identifier.into(),
            profile: profile.map(str::to_owned),
            assignments: Vec::new(),
            display_name: None,
            mail_nickname: None,
            password: None,
        }
    }

    /// Trims the identifier and optional fields into a `NormalizedUser`.
    ///
    /// Only the identifier is validated here. Creation defaults are derived
    /// later, and only for principals that have to be created.
    pub fn normalize(&self) -> AppResult<NormalizedUser> {
        let principal_identifier = self.principal_identifier.trim();
        if principal_identifier.is_empty() {
            return Err(AppError::Validation(
                "user principal identifier must not be empty".to_owned(),
            ));
        }

        Ok(NormalizedUser {
            principal_identifier: principal_identifier.to_owned(),
            profile: self.profile.clone(),
            assignments: self.assignments.clone(),
            display_name: non_blank(self.display_name.as_deref()),
            mail_nickname: non_blank(self.mail_nickname.as_deref()),
            password: non_blank(self.password.as_deref()),
        })
    }
}

/// User declaration with trimmed fields and a validated identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedUser {
    /// Trimmed login name.
    pub principal_identifier: String,
    /// Optional profile preset name.
    pub profile: Option<String>,
    /// Explicit assignments.
    pub assignments: Vec<AssignmentDeclaration>,
    /// Explicit display name, when configured.
    pub display_name: Option<String>,
    /// Explicit mail alias, when configured.
    pub mail_nickname: Option<String>,
    /// Explicit initial credential, when configured.
    pub password: Option<String>,
}

impl NormalizedUser {
    fn local_part(&self) -> &str {
        self.principal_identifier
            .split('@')
            .next()
            .unwrap_or(self.principal_identifier.as_str())
    }

    /// Returns the display name used on creation.
    ///
    /// Defaults to the identifier's local part.
    #[must_use]
    pub fn creation_display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.local_part().to_owned())
    }

    /// Returns the mail alias used on creation.
    ///
    /// Defaults to the local part stripped of non-alphanumeric characters and
    /// fails when nothing is left.
    pub fn creation_mail_nickname(&self) -> AppResult<String> {
        if let Some(mail_nickname) = &self.mail_nickname {
            return Ok(mail_nickname.clone());
        }

        let derived: String = self
            .local_part()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();

        if derived.is_empty() {
            return Err(AppError::Validation(format!(
                "user '{}' has no alphanumeric characters to derive a mail alias from; set 'mail_nickname'",
                self.principal_identifier
            )));
        }

        Ok(derived)
    }
}

impl std::fmt::Debug for NormalizedUser {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NormalizedUser")
            .field("principal_identifier", &self.principal_identifier)
            .field("profile", &self.profile)
            .field("assignments", &self.assignments)
            .field("display_name", &self.display_name)
            .field("mail_nickname", &self.mail_nickname)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Principal as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    /// Raw directory id, possibly a slash-delimited path.
    pub id: String,
    /// Login name of the principal.
    pub principal_identifier: String,
}

impl PrincipalRecord {
    /// Returns the object id, taking the last segment of path-shaped ids.
    pub fn object_id(&self) -> AppResult<&str> {
        let object_id = self
            .id
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();

        if object_id.is_empty() {
            return Err(AppError::Validation(format!(
                "directory returned an empty id for principal '{}'",
                self.principal_identifier
            )));
        }

        Ok(object_id)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use idbridge_core::AppError;

    use super::{PrincipalRecord, UserDeclaration};

    #[test]
    fn normalization_derives_display_name_and_alias() {
        let user = UserDeclaration::new("jane.o'neil@example.com", Some("developer"));
        let normalized = user.normalize().unwrap_or_else(|_| unreachable!());

        assert_eq!(normalized.creation_display_name(), "jane.o'neil");
        assert_eq!(
            normalized.creation_mail_nickname().ok().as_deref(),
            Some("janeoneil")
        );
        assert_eq!(normalized.password, None);
    }

    #[test]
    fn explicit_identity_fields_win_over_defaults() {
        let mut user = UserDeclaration::new("bob@example.com", None);
        user.display_name = Some("Bob Builder".to_owned());
        user.mail_nickname = Some(" bobb ".to_owned());
        user.password = Some("   ".to_owned());

        let normalized = user.normalize().unwrap_or_else(|_| unreachable!());

        assert_eq!(normalized.creation_display_name(), "Bob Builder");
        assert_eq!(
            normalized.creation_mail_nickname().ok().as_deref(),
            Some("bobb")
        );
        assert_eq!(normalized.password, None);
    }

    #[test]
    fn normalization_rejects_blank_identifier() {
        assert!(UserDeclaration::new("  ", None).normalize().is_err());
    }

    #[test]
    fn underivable_mail_alias_only_fails_on_creation() {
        let normalized = UserDeclaration::new("...@example.com", None)
            .normalize()
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(normalized.creation_display_name(), "...");
        assert!(matches!(
            normalized.creation_mail_nickname(),
            Err(AppError::Validation(_))
        ));

        let mut declared = UserDeclaration::new("...@example.com", None);
        declared.mail_nickname = Some("ops".to_owned());
        let normalized = declared.normalize().unwrap_or_else(|_| unreachable!());
        assert_eq!(normalized.creation_mail_nickname().ok().as_deref(), Some("ops"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let mut user = UserDeclaration::new("carol@example.com", None);
        user.password = Some("Sup3r-Secret!".to_owned());
        let normalized = user.normalize().unwrap_or_else(|_| unreachable!());

        let rendered = format!("{normalized:?}");
        assert!(!rendered.contains("Sup3r-Secret!"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn object_id_takes_last_path_segment() {
        let record = PrincipalRecord {
            id: "/users/5f1c2a4e-7d0b-4c55-9a66-0f0e3b2d1c99".to_owned(),
            principal_identifier: "alice@example.com".to_owned(),
        };
        assert_eq!(
            record.object_id().ok(),
            Some("5f1c2a4e-7d0b-4c55-9a66-0f0e3b2d1c99")
        );

        let plain = PrincipalRecord {
            id: "abc".to_owned(),
            principal_identifier: "alice@example.com".to_owned(),
        };
        assert_eq!(plain.object_id().ok(), Some("abc"));
    }

    #[test]
    fn object_id_rejects_empty_ids() {
        let record = PrincipalRecord {
            id: "/".to_owned(),
            principal_identifier: "alice@example.com".to_owned(),
        };
        assert!(record.object_id().is_err());
    }

    #[test]
    fn declarations_parse_from_upn_key_and_skip_password_on_output() {
        let user: UserDeclaration = serde_json::from_str(
            r#"{"upn":"dave@example.com","profile":"sre","password":"x-Secret-1"}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(user.principal_identifier, "dave@example.com");
        assert!(user.assignments.is_empty());

        let rendered = serde_json::to_string(&user).unwrap_or_default();
        assert!(!rendered.contains("x-Secret-1"));
    }
}
