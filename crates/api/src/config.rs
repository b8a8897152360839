use wes_core::job::RunnerCommand;

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
    /// Base URL used for self-referential job URLs when the request carries
    /// no usable `Host` header.
    pub public_base_url: String,
    /// External workflow engine invocation.
    pub runner: RunnerCommand,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                  |
    /// |-------------------|--------------------------|
    /// | `HOST`            | `0.0.0.0`                |
    /// | `PORT`            | `3000`                   |
    /// | `CORS_ORIGINS`    | `http://localhost:5173`  |
    /// | `PUBLIC_BASE_URL` | `http://localhost:3000`  |
    /// | `WES_RUNNER`      | `cwl-runner`             |
    /// | `WES_RUNNER_ARGS` | `--leave-outputs`        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());

        let runner_program =
            std::env::var("WES_RUNNER").unwrap_or_else(|_| "cwl-runner".into());
        let runner_args: Vec<String> = std::env::var("WES_RUNNER_ARGS")
            .unwrap_or_else(|_| "--leave-outputs".into())
            .split_whitespace()
            .map(String::from)
            .collect();

        Self {
            host,
            port,
            cors_origins,
            public_base_url,
            runner: RunnerCommand {
                program: runner_program,
                args: runner_args,
            },
        }
    }
}
