//! Environment configuration, read once before any scenario runs

use std::path::{Path, PathBuf};
use std::time::Duration;
use gridwatch_common::Error;
use tracing::{debug, info};

use crate::driver::Browser;
use crate::error::{E2eError, E2eResult};

/// Environment selector variable
pub const ENV_VAR: &str = "ENV";
/// Base URL variable
pub const BASE_URL_VAR: &str = "BASEURL";
/// Browser selection variable
pub const BROWSER_VAR: &str = "BROWSER";
/// Headed mode switch (`HEAD=true` shows the browser window)
pub const HEAD_VAR: &str = "HEAD";
/// Optional override for the default step timeout, in milliseconds
pub const STEP_TIMEOUT_VAR: &str = "STEP_TIMEOUT_MS";

/// Default directory holding `.env.<ENV>` files
pub const DEFAULT_ENV_DIR: &str = "env";

/// Default step timeout (30 seconds)
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;

/// Environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    /// Selected environment name
    pub env: String,

    /// Base URL scenarios navigate to
    pub base_url: String,

    /// Browser engine to launch
    pub browser: Browser,

    /// Launch without a visible window
    pub headless: bool,

    /// Upper bound for a single scenario step
    pub step_timeout: Duration,
}

impl EnvConfig {
    /// Load from the process environment
    ///
    /// When `ENV` is set, `<env_dir>/.env.<ENV>` is loaded first and
    /// overrides existing variables. A missing file is not an error.
    pub fn from_env(env_dir: &Path) -> E2eResult<Self> {
        let env = std::env::var(ENV_VAR)
            .map_err(|_| config_error(format!("{} is not set; no environment selected", ENV_VAR)))?;

        let env_file = env_file_path(env_dir, &env);
        match dotenvy::from_path_override(&env_file) {
            Ok(()) => info!("Loaded environment file {}", env_file.display()),
            Err(e) if e.not_found() => {
                debug!("No environment file at {}", env_file.display())
            }
            Err(e) => {
                return Err(config_error(format!(
                    "Failed to load {}: {}",
                    env_file.display(),
                    e
                )))
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = non_empty(lookup(ENV_VAR))
            .ok_or_else(|| config_error(format!("{} is not set; no environment selected", ENV_VAR)))?;

        let base_url = non_empty(lookup(BASE_URL_VAR)).ok_or_else(|| {
            config_error(format!("{} is not set for environment '{}'", BASE_URL_VAR, env))
        })?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(config_error(format!(
                "{} must be an http(s) URL, got '{}'",
                BASE_URL_VAR, base_url
            )));
        }

        let browser = match non_empty(lookup(BROWSER_VAR)) {
            Some(name) => Browser::parse(&name).ok_or_else(|| {
                config_error(format!("Unknown {} '{}'", BROWSER_VAR, name))
            })?,
            None => Browser::default(),
        };

        let headless = !matches!(
            lookup(HEAD_VAR).as_deref().map(str::trim),
            Some("true") | Some("1")
        );

        let step_timeout = match non_empty(lookup(STEP_TIMEOUT_VAR)) {
            Some(ms) => Duration::from_millis(ms.parse().map_err(|_| {
                config_error(format!("{} must be milliseconds, got '{}'", STEP_TIMEOUT_VAR, ms))
            })?),
            None => Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
        };

        Ok(Self {
            env,
            base_url,
            browser,
            headless,
            step_timeout,
        })
    }

    /// Resolve a path against the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

fn config_error(message: String) -> E2eError {
    Error::Configuration(message).into()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Path of the environment file for `env`
pub fn env_file_path(env_dir: &Path, env: &str) -> PathBuf {
    env_dir.join(format!(".env.{}", env))
}
