use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tactic_core::AppError;
use tactic_infrastructure::MAX_GENERATIVE_ATTEMPTS;
use tracing_subscriber::EnvFilter;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Where event documents and audit records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres { database_url: String },
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiRuntimeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub storage_backend: StorageBackend,
    pub gemini: Option<GeminiRuntimeConfig>,
    pub generative_max_attempts: u8,
    pub generative_retry_backoff_ms: u64,
    pub request_timeout_seconds: u64,
    pub notification_webhook_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub enable_autofill: bool,
    pub enable_fallback: bool,
    pub enable_llm_generation: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_host = non_empty("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or("API_PORT", non_empty("API_PORT"), 3001_u16)?;

        let storage_backend = match non_empty("STORAGE_BACKEND")
            .unwrap_or_else(|| "memory".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres {
                database_url: non_empty("DATABASE_URL").ok_or_else(|| {
                    AppError::Validation(
                        "DATABASE_URL is required when STORAGE_BACKEND is 'postgres'".to_owned(),
                    )
                })?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "STORAGE_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };
        if migrate_only && storage_backend == StorageBackend::Memory {
            return Err(AppError::Validation(
                "the migrate command requires STORAGE_BACKEND=postgres".to_owned(),
            ));
        }

        let gemini = non_empty("GEMINI_API_KEY").map(|api_key| GeminiRuntimeConfig {
            api_key,
            model: non_empty("GEMINI_MODEL").unwrap_or_else(|| "gemini-pro".to_owned()),
            base_url: non_empty("GEMINI_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_owned()),
        });

        let generative_max_attempts = parse_or(
            "GENERATIVE_MAX_ATTEMPTS",
            non_empty("GENERATIVE_MAX_ATTEMPTS"),
            3_u8,
        )?;
        if !(1..=MAX_GENERATIVE_ATTEMPTS).contains(&generative_max_attempts) {
            return Err(AppError::Validation(format!(
                "GENERATIVE_MAX_ATTEMPTS must be between 1 and {MAX_GENERATIVE_ATTEMPTS}, got {generative_max_attempts}"
            )));
        }

        let request_timeout_seconds = parse_or(
            "REQUEST_TIMEOUT_SECONDS",
            non_empty("REQUEST_TIMEOUT_SECONDS"),
            30_u64,
        )?;
        if request_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "REQUEST_TIMEOUT_SECONDS must be at least 1".to_owned(),
            ));
        }

        let cors_origins = non_empty("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_owned())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            storage_backend,
            gemini,
            generative_max_attempts,
            generative_retry_backoff_ms: parse_or(
                "GENERATIVE_RETRY_BACKOFF_MS",
                non_empty("GENERATIVE_RETRY_BACKOFF_MS"),
                1000_u64,
            )?,
            request_timeout_seconds,
            notification_webhook_url: non_empty("NOTIFICATION_WEBHOOK_URL"),
            cors_origins,
            enable_autofill: flag("ENABLE_AUTOFILL", non_empty("ENABLE_AUTOFILL"))?,
            enable_fallback: flag("ENABLE_FALLBACK", non_empty("ENABLE_FALLBACK"))?,
            enable_llm_generation: flag(
                "ENABLE_LLM_GENERATION",
                non_empty("ENABLE_LLM_GENERATION"),
            )?,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
    })
}

fn flag(name: &str, value: Option<String>) -> Result<bool, AppError> {
    let Some(value) = value else {
        return Ok(true);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(AppError::Validation(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tactic_core::AppError;

    use super::{ApiConfig, StorageBackend};

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(false, |name| values.get(name).cloned())
    }

    #[test]
    fn defaults_describe_a_local_memory_setup() {
        let config = load(&[]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.api_port, 3001);
        assert!(config.gemini.is_none());
        assert_eq!(config.generative_max_attempts, 3);
        assert_eq!(config.cors_origins, vec!["*".to_owned()]);
        assert!(config.enable_autofill && config.enable_fallback && config.enable_llm_generation);
        assert!(config.socket_address().is_ok());
    }

    #[test]
    fn postgres_backend_requires_a_database_url() {
        let missing = load(&[("STORAGE_BACKEND", "postgres")]);
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let configured = load(&[
            ("STORAGE_BACKEND", "Postgres"),
            ("DATABASE_URL", "postgres://localhost/tactic"),
        ]);
        assert!(configured.is_ok());
        assert_eq!(
            configured.map(|config| config.storage_backend.as_str()).ok(),
            Some("postgres")
        );
    }

    #[test]
    fn gemini_is_enabled_by_its_api_key() {
        let config = load(&[("GEMINI_API_KEY", "secret"), ("GEMINI_MODEL", "gemini-1.5")]);
        assert!(config.is_ok());
        let gemini = config.ok().and_then(|config| config.gemini);
        assert_eq!(gemini.map(|gemini| gemini.model), Some("gemini-1.5".to_owned()));
    }

    #[test]
    fn invalid_values_are_validation_errors() {
        assert!(load(&[("API_PORT", "http")]).is_err());
        assert!(load(&[("ENABLE_FALLBACK", "maybe")]).is_err());
        assert!(load(&[("GENERATIVE_MAX_ATTEMPTS", "0")]).is_err());
        assert!(load(&[("GENERATIVE_MAX_ATTEMPTS", "4")]).is_err());
        assert!(load(&[("GENERATIVE_MAX_ATTEMPTS", "3")]).is_ok());
        assert!(load(&[("STORAGE_BACKEND", "sqlite")]).is_err());

        let disabled = load(&[("ENABLE_AUTOFILL", "false"), ("CORS_ORIGINS", "http://a, http://b")]);
        assert!(disabled.is_ok());
        let disabled = disabled.unwrap_or_else(|_| unreachable!());
        assert!(!disabled.enable_autofill);
        assert_eq!(disabled.cors_origins.len(), 2);
    }
}
