use std::path::PathBuf;

/// Default port the app UI and API are served on.
pub const DEFAULT_PORT: u16 = 7501;

/// Error raised when an environment variable holds an unusable value.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running on a single workstation
/// or cloud studio.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `7501`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running jobs, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Root directory holding one subdirectory per project.
    pub data_dir: PathBuf,
    /// Base URL of the Label Studio server.
    pub label_studio_url: String,
    /// Label Studio access token. Label Studio routes are disabled without it.
    pub label_studio_api_key: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `HOST`                  | `0.0.0.0`                |
    /// | `PORT`                  | `7501`                   |
    /// | `CORS_ORIGINS`          | `http://localhost:7501`  |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                     |
    /// | `DATA_DIR`              | `./data`                 |
    /// | `LABEL_STUDIO_URL`      | `http://localhost:8080`  |
    /// | `LABEL_STUDIO_API_KEY`  | unset                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("PORT", DEFAULT_PORT, "a valid port number")?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| format!("http://localhost:{DEFAULT_PORT}"))
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", 30, "a number of seconds")?;
        let shutdown_timeout_secs = parse_var("SHUTDOWN_TIMEOUT_SECS", 30, "a number of seconds")?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let label_studio_url =
            std::env::var("LABEL_STUDIO_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let label_studio_api_key = std::env::var("LABEL_STUDIO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            data_dir,
            label_studio_url,
            label_studio_api_key,
        })
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        data_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError {
            var,
            value,
            expected,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ServerConfig {
        ServerConfig {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            cors_origins: vec![],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            data_dir: PathBuf::from("data"),
            label_studio_url: "http://localhost:8080".into(),
            label_studio_api_key: None,
        }
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let config = base().with_overrides(None, Some(9000), Some("/srv/lp".into()));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/srv/lp"));
    }

    #[test]
    fn config_error_message_names_the_variable() {
        let err = ConfigError {
            var: "PORT",
            value: "abc".into(),
            expected: "a valid port number",
        };
        assert_eq!(err.to_string(), "PORT must be a valid port number, got 'abc'");
    }
}
