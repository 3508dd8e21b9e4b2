use std::path::PathBuf;
use std::str::FromStr;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Where stored objects (PDFs, diagram images) live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Files under `root`, served by this server at `public_url`.
    Local { root: PathBuf, public_url: String },
    /// Supabase Storage REST API.
    Supabase { url: String, service_key: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Base URL of the guest-facing form; links are `{base}/inspection/{id}`.
    pub public_base_url: String,
    /// Bearer token for admin routes. Admin routes are open when unset.
    pub admin_api_key: Option<String>,
    pub storage: StorageConfig,
}

/// Origins the guest form is served from.
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:5174,\
    http://127.0.0.1:5173,http://127.0.0.1:5174,https://golf-cart-inspection.netlify.app,\
    https://www.luxepropertiespr.com";

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                               |
    /// |-------------------------|---------------------------------------|
    /// | `HOST`                  | `0.0.0.0`                             |
    /// | `PORT`                  | `3000`                                |
    /// | `CORS_ORIGINS`          | dev servers + production form origins |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                                  |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                                  |
    /// | `PUBLIC_BASE_URL`       | `http://localhost:5173`               |
    /// | `ADMIN_API_KEY`         | unset (admin routes open)             |
    /// | `STORAGE_BACKEND`       | `local` (or `supabase`)               |
    /// | `STORAGE_LOCAL_ROOT`    | `./storage`                           |
    /// | `STORAGE_PUBLIC_URL`    | `http://localhost:{PORT}/files`       |
    /// | `SUPABASE_URL`          | required for `supabase`               |
    /// | `SUPABASE_SERVICE_KEY`  | required for `supabase`               |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&var, "PORT", 3000)?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs = parse_or(&var, "SHUTDOWN_TIMEOUT_SECS", 30)?;

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let storage = match var("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                root: var("STORAGE_LOCAL_ROOT")
                    .unwrap_or_else(|| "./storage".into())
                    .into(),
                public_url: var("STORAGE_PUBLIC_URL")
                    .unwrap_or_else(|| format!("http://localhost:{port}/files"))
                    .trim_end_matches('/')
                    .to_string(),
            },
            "supabase" => StorageConfig::Supabase {
                url: var("SUPABASE_URL")
                    .ok_or(ConfigError::Missing { var: "SUPABASE_URL" })?
                    .trim_end_matches('/')
                    .to_string(),
                service_key: var("SUPABASE_SERVICE_KEY").ok_or(ConfigError::Missing {
                    var: "SUPABASE_SERVICE_KEY",
                })?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            public_base_url,
            admin_api_key: var("ADMIN_API_KEY"),
            storage,
        })
    }

    /// Guest link for an inspection.
    pub fn form_link(&self, id: impl std::fmt::Display) -> String {
        format!("{}/inspection/{id}", self.public_base_url)
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var: name,
            value,
        }),
    }
}
