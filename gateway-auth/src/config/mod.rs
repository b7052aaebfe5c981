use std::collections::BTreeMap;
use std::env;

use gateway_core::config as core_config;
use gateway_core::error::AppError;
use serde::Deserialize;

use crate::dtos::AuthenticationMode;
use crate::models::{Role, RoleRegistry};

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me-in-production";

/// Upper bound for every configured lifetime: 100 years.
pub const MAX_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    /// Externally visible URL of the API root, used to build links.
    pub public_url: String,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub principals: PrincipalConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_seconds: i64,
    pub refresh_token_expiry_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a session from the login that created it.
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalConfig {
    pub roles: Vec<Role>,
    /// Roles given to a principal created by its first login.
    pub default_roles: Vec<String>,
}

impl PrincipalConfig {
    pub fn registry(&self) -> RoleRegistry {
        RoleRegistry::new(self.roles.iter().cloned())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    pub mode: AuthenticationMode,
    pub confirmation_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationConfig {
    pub required: bool,
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    pub api_version: u32,
    pub library_version: String,
    pub formats: BTreeMap<String, Vec<String>>,
    pub aliases: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub queries: Vec<String>,
    pub authentication: AuthenticationConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let formats: BTreeMap<String, Vec<String>> = [
            ("array", vec!["application/octet-stream", "application/json", "text/csv"]),
            ("dataframe", vec!["application/x-parquet", "text/csv"]),
            ("node", vec!["application/json"]),
            ("xarray_dataset", vec!["application/x-netcdf"]),
        ]
        .into_iter()
        .map(|(family, media)| {
            (
                family.to_string(),
                media.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        let mut aliases = BTreeMap::new();
        aliases.insert(
            "array".to_string(),
            BTreeMap::from([
                ("application/json".to_string(), vec!["json".to_string()]),
                ("text/csv".to_string(), vec!["csv".to_string()]),
            ]),
        );
        aliases.insert(
            "dataframe".to_string(),
            BTreeMap::from([
                ("application/x-parquet".to_string(), vec!["parquet".to_string()]),
                ("text/csv".to_string(), vec!["csv".to_string()]),
            ]),
        );

        Self {
            api_version: 0,
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            formats,
            aliases,
            queries: Vec::new(),
            authentication: AuthenticationConfig {
                required: false,
                providers: Vec::new(),
            },
        }
    }
}

impl Default for AuthConfig {
    /// Development configuration: in-process defaults, no providers.
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "gateway-auth".to_string(),
            log_level: "info".to_string(),
            public_url: "http://localhost:60610/api/v1".to_string(),
            jwt: JwtConfig {
                secret: DEV_JWT_SECRET.to_string(),
                access_token_expiry_seconds: 15 * 60,
                refresh_token_expiry_seconds: 7 * 24 * 60 * 60,
            },
            session: SessionConfig {
                ttl_seconds: 365 * 24 * 60 * 60,
            },
            principals: PrincipalConfig {
                roles: RoleRegistry::default_roles(),
                default_roles: vec!["user".to_string()],
            },
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let defaults = AuthConfig::default();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let roles = match env::var("ROLES_JSON") {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("ROLES_JSON is not a list of roles: {}", e))
            })?,
            Err(_) => defaults.principals.roles,
        };

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("gateway-auth"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            public_url: get_env("PUBLIC_URL", Some(defaults.public_url.as_str()), is_prod)?,
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", Some(DEV_JWT_SECRET), is_prod)?,
                access_token_expiry_seconds: parse_env(
                    "ACCESS_TOKEN_EXPIRY_SECONDS",
                    defaults.jwt.access_token_expiry_seconds,
                )?,
                refresh_token_expiry_seconds: parse_env(
                    "REFRESH_TOKEN_EXPIRY_SECONDS",
                    defaults.jwt.refresh_token_expiry_seconds,
                )?,
            },
            session: SessionConfig {
                ttl_seconds: parse_env("SESSION_TTL_SECONDS", defaults.session.ttl_seconds)?,
            },
            principals: PrincipalConfig {
                roles,
                default_roles: get_env("DEFAULT_ROLES", Some("user"), false)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            discovery: DiscoveryConfig {
                authentication: AuthenticationConfig {
                    required: parse_env("AUTHENTICATION_REQUIRED", false)?,
                    providers: parse_providers(&get_env("AUTH_PROVIDERS", Some(""), false)?)?,
                },
                ..defaults.discovery
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        let ttls = [
            ("ACCESS_TOKEN_EXPIRY_SECONDS", self.jwt.access_token_expiry_seconds),
            ("REFRESH_TOKEN_EXPIRY_SECONDS", self.jwt.refresh_token_expiry_seconds),
            ("SESSION_TTL_SECONDS", self.session.ttl_seconds),
        ];
        for (key, ttl) in ttls {
            if ttl <= 0 {
                return Err(AppError::ConfigError(anyhow::anyhow!("{} must be positive", key)));
            }
            if ttl > MAX_TTL_SECONDS {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} must be at most {} seconds",
                    key,
                    MAX_TTL_SECONDS
                )));
            }
        }

        if self.environment == Environment::Prod {
            if self.jwt.secret == DEV_JWT_SECRET || self.jwt.secret.len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be set to at least 32 characters in production"
                )));
            }

            if !self.discovery.authentication.required {
                tracing::warn!("Authentication is optional in production - anonymous access is allowed");
            }
        }

        Ok(())
    }
}

/// Parse `name:mode[:confirmation message]` entries separated by commas.
fn parse_providers(raw: &str) -> Result<Vec<ProviderConfig>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let provider = parts.next().unwrap_or_default().trim();
            let mode = parts.next().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Provider '{}' has no authentication mode",
                    provider
                ))
            })?;
            let mode: AuthenticationMode = mode
                .trim()
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

            Ok(ProviderConfig {
                provider: provider.to_string(),
                mode,
                confirmation_message: parts.next().map(|m| m.trim().to_string()),
            })
        })
        .collect()
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
