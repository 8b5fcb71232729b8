use std::env;
use std::path::PathBuf;

use idbridge_application::{CredentialPolicy, LookupFailurePolicy, ReconcilerOptions};
use idbridge_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com";
const DEFAULT_ARM_BASE_URL: &str = "https://management.azure.com";

/// Command selected by the first CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    Rbac,
    Federation,
}

impl CliCommand {
    pub fn parse(argument: Option<&str>) -> AppResult<Self> {
        match argument.map(str::trim) {
            None | Some("") | Some("rbac") => Ok(Self::Rbac),
            Some("federation") => Ok(Self::Federation),
            Some(other) => Err(AppError::Validation(format!(
                "command must be either 'rbac' or 'federation', got '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rbac => "rbac",
            Self::Federation => "federation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryProviderConfig {
    Memory,
    Graph { base_url: String, access_token: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkProviderConfig {
    Record,
    Arm {
        base_url: String,
        access_token: String,
        max_attempts: u8,
        retry_backoff_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub command: CliCommand,
    pub config_path: PathBuf,
    pub directory: DirectoryProviderConfig,
    pub sink: SinkProviderConfig,
    pub options: ReconcilerOptions,
    pub http_timeout_secs: u64,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        let command = CliCommand::parse(env::args().nth(1).as_deref())?;
        Self::from_lookup(command, |name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(
        command: CliCommand,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let env = EnvLookup(lookup);

        let config_path = PathBuf::from(env.required_non_empty("IDBRIDGE_CONFIG_PATH")?);

        let directory = match env.optional("IDBRIDGE_DIRECTORY").as_deref() {
            None | Some("memory") => DirectoryProviderConfig::Memory,
            Some("graph") => DirectoryProviderConfig::Graph {
                base_url: env
                    .optional("GRAPH_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_owned()),
                access_token: env.required_non_empty("GRAPH_ACCESS_TOKEN")?,
            },
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "IDBRIDGE_DIRECTORY must be either 'memory' or 'graph', got '{other}'"
                )));
            }
        };

        let sink = match env.optional("IDBRIDGE_SINK").as_deref() {
            None | Some("record") => SinkProviderConfig::Record,
            Some("arm") => {
                let max_attempts = env.parse_or("IDBRIDGE_ARM_MAX_ATTEMPTS", 3_u8)?;
                if max_attempts == 0 {
                    return Err(AppError::Validation(
                        "IDBRIDGE_ARM_MAX_ATTEMPTS must be greater than zero".to_owned(),
                    ));
                }

                SinkProviderConfig::Arm {
                    base_url: env
                        .optional("ARM_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_ARM_BASE_URL.to_owned()),
                    access_token: env.required_non_empty("ARM_ACCESS_TOKEN")?,
                    max_attempts,
                    retry_backoff_ms: env.parse_or("IDBRIDGE_ARM_RETRY_BACKOFF_MS", 500_u64)?,
                }
            }
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "IDBRIDGE_SINK must be either 'record' or 'arm', got '{other}'"
                )));
            }
        };

        let options = ReconcilerOptions {
            lookup_failure_policy: env
                .optional("IDBRIDGE_LOOKUP_FAILURE_POLICY")
                .map(|value| value.parse::<LookupFailurePolicy>())
                .transpose()?
                .unwrap_or_default(),
            credential_policy: env
                .optional("IDBRIDGE_CREDENTIAL_POLICY")
                .map(|value| value.parse::<CredentialPolicy>())
                .transpose()?
                .unwrap_or_default(),
        };

        let http_timeout_secs = env.parse_or("IDBRIDGE_HTTP_TIMEOUT_SECS", 15_u64)?;
        if http_timeout_secs == 0 {
            return Err(AppError::Validation(
                "IDBRIDGE_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            command,
            config_path,
            directory,
            sink,
            options,
            http_timeout_secs,
        })
    }

    /// Returns whether any adapter talks to a remote API.
    pub fn needs_http_client(&self) -> bool {
        !matches!(self.directory, DirectoryProviderConfig::Memory)
            || !matches!(self.sink, SinkProviderConfig::Record)
    }
}

struct EnvLookup<F>(F);

impl<F> EnvLookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required_non_empty(&self, name: &str) -> AppResult<String> {
        let value = (self.0)(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{name} must not be empty")));
        }

        Ok(value.trim().to_owned())
    }

    fn parse_or<T>(&self, name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => value.parse::<T>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use idbridge_application::{CredentialPolicy, LookupFailurePolicy};
    use idbridge_core::AppError;

    use super::{CliCommand, CliConfig, DirectoryProviderConfig, SinkProviderConfig};

    fn load(vars: &[(&str, &str)]) -> Result<CliConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();

        CliConfig::from_lookup(CliCommand::Rbac, |name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_run_fully_offline() {
        let config = load(&[("IDBRIDGE_CONFIG_PATH", "idbridge.json")])
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(config.directory, DirectoryProviderConfig::Memory);
        assert_eq!(config.sink, SinkProviderConfig::Record);
        assert_eq!(
            config.options.lookup_failure_policy,
            LookupFailurePolicy::TreatAsMissing
        );
        assert_eq!(
            config.options.credential_policy,
            CredentialPolicy::GenerateWhenAbsent
        );
        assert_eq!(config.http_timeout_secs, 15);
        assert!(!config.needs_http_client());
    }

    #[test]
    fn config_path_is_required() {
        assert!(matches!(load(&[]), Err(AppError::Validation(_))));
        assert!(matches!(
            load(&[("IDBRIDGE_CONFIG_PATH", "  ")]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn remote_adapters_require_tokens() {
        let result = load(&[
            ("IDBRIDGE_CONFIG_PATH", "idbridge.json"),
            ("IDBRIDGE_DIRECTORY", "graph"),
        ]);
        assert!(matches!(result, Err(AppError::Validation(_))));

        let config = load(&[
            ("IDBRIDGE_CONFIG_PATH", "idbridge.json"),
            ("IDBRIDGE_DIRECTORY", "graph"),
            ("GRAPH_ACCESS_TOKEN", "graph-token"),
            ("IDBRIDGE_SINK", "arm"),
            ("ARM_ACCESS_TOKEN", "arm-token"),
            ("ARM_BASE_URL", "http://127.0.0.1:9000"),
        ])
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(
            config.directory,
            DirectoryProviderConfig::Graph {
                base_url: "https://graph.microsoft.com".to_owned(),
                access_token: "graph-token".to_owned(),
            }
        );
        assert_eq!(
            config.sink,
            SinkProviderConfig::Arm {
                base_url: "http://127.0.0.1:9000".to_owned(),
                access_token: "arm-token".to_owned(),
                max_attempts: 3,
                retry_backoff_ms: 500,
            }
        );
        assert!(config.needs_http_client());
    }

    #[test]
    fn policies_and_numbers_are_validated() {
        let config = load(&[
            ("IDBRIDGE_CONFIG_PATH", "idbridge.json"),
            ("IDBRIDGE_LOOKUP_FAILURE_POLICY", "fail"),
            ("IDBRIDGE_CREDENTIAL_POLICY", "require_explicit"),
            ("IDBRIDGE_HTTP_TIMEOUT_SECS", "30"),
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.options.lookup_failure_policy, LookupFailurePolicy::Fail);
        assert_eq!(
            config.options.credential_policy,
            CredentialPolicy::RequireExplicit
        );
        assert_eq!(config.http_timeout_secs, 30);

        for (name, value) in [
            ("IDBRIDGE_LOOKUP_FAILURE_POLICY", "ignore"),
            ("IDBRIDGE_HTTP_TIMEOUT_SECS", "soon"),
            ("IDBRIDGE_HTTP_TIMEOUT_SECS", "0"),
            ("IDBRIDGE_SINK", "terraform"),
        ] {
            let result = load(&[("IDBRIDGE_CONFIG_PATH", "idbridge.json"), (name, value)]);
            assert!(matches!(result, Err(AppError::Validation(_))), "{name}={value}");
        }
    }

    #[test]
    fn command_defaults_to_rbac() {
        assert!(matches!(CliCommand::parse(None), Ok(CliCommand::Rbac)));
        assert!(matches!(
            CliCommand::parse(Some("federation")),
            Ok(CliCommand::Federation)
        ));
        assert!(matches!(
            CliCommand::parse(Some("apply")),
            Err(AppError::Validation(_))
        ));
    }
}
