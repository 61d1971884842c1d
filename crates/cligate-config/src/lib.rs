//! Gateway configuration loaded from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `HOST` | `0.0.0.0` | Bind host |
//! | `PORT` | `3000` | Bind port |
//! | `LLM_COMMAND` | `uvx` | External executable |
//! | `LLM_SUBCOMMAND` | `llm` | Literal placed before every argument list |
//! | `LLM_TIMEOUT_SECS` | unset | Optional timeout for buffered invocations |
//! | `LLM_MAX_OUTPUT_BYTES` | `16777216` | Output cap for buffered invocations |
//! | `OPENAI_API_KEY` | unset | Forwarded into the child environment |
//!
//! # Example
//!
//! ```rust
//! use cligate_config::GatewayConfig;
//!
//! let config = GatewayConfig::from_lookup(|var| match var {
//!     "PORT" => Some("8080".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//!
//! assert_eq!(config.port, 8080);
//! assert_eq!(config.command.program, "uvx");
//! ```

use std::str::FromStr;
use std::time::Duration;

use cligate_core::ToolCommand;
use tracing::debug;

/// Credential variables forwarded verbatim into every child process.
pub const FORWARDED_VARS: &[&str] = &["OPENAI_API_KEY"];

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Errors that can occur when reading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A variable was set to a value that could not be used.
    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid(var: impl Into<String>, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            var: var.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Limits applied to buffered invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayLimits {
    /// Kill the child if it has not exited after this long.
    pub timeout: Option<Duration>,
    /// Kill the child once stdout or stderr exceeds this many bytes.
    pub max_output_bytes: usize,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self { timeout: None, max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES }
    }
}

/// Complete gateway configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub command: ToolCommand,
    pub limits: RelayLimits,
    /// Variables set on every child process, on top of the inherited environment.
    pub forwarded_env: Vec<(String, String)>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            command: ToolCommand::default(),
            limits: RelayLimits::default(),
            forwarded_env: Vec::new(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let forwarded: Vec<&str> = self.forwarded_env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("command", &self.command)
            .field("limits", &self.limits)
            .field("forwarded_env", &forwarded)
            .finish()
    }
}

impl GatewayConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|var| std::env::var(var).ok())?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let set = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let mut command = defaults.command;
        if let Some(program) = set("LLM_COMMAND") {
            command.program = program;
        }
        if let Some(subcommand) = set("LLM_SUBCOMMAND") {
            command.subcommand = subcommand;
        }

        let timeout = parse_var::<u64>(&set, "LLM_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let max_output_bytes = parse_var::<usize>(&set, "LLM_MAX_OUTPUT_BYTES")?
            .unwrap_or(DEFAULT_MAX_OUTPUT_BYTES);
        if max_output_bytes == 0 {
            return Err(ConfigError::invalid("LLM_MAX_OUTPUT_BYTES", "0", "must be positive"));
        }

        let forwarded_env = FORWARDED_VARS
            .iter()
            .filter_map(|var| set(var).map(|value| (var.to_string(), value)))
            .collect();

        Ok(Self {
            host: set("HOST").unwrap_or(defaults.host),
            port: parse_var::<u16>(&set, "PORT")?.unwrap_or(defaults.port),
            command,
            limits: RelayLimits { timeout, max_output_bytes },
            forwarded_env,
        })
    }

    /// Returns the `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(set: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    set(var)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(var, raw.clone(), e))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert!(config.forwarded_env.is_empty());
        assert_eq!(config.limits.timeout, None);
    }

    #[test]
    fn overrides_are_applied() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("PORT", "8123"),
            ("HOST", "127.0.0.1"),
            ("LLM_COMMAND", "llm"),
            ("LLM_SUBCOMMAND", "prompt"),
            ("LLM_TIMEOUT_SECS", "30"),
            ("LLM_MAX_OUTPUT_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8123");
        assert_eq!(config.command.program, "llm");
        assert_eq!(config.command.subcommand, "prompt");
        assert_eq!(config.limits.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.limits.max_output_bytes, 1024);
    }

    #[test]
    fn api_key_is_forwarded_when_set() {
        let config = GatewayConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.forwarded_env, vec![("OPENAI_API_KEY".to_string(), "sk-test".to_string())]);
        assert!(!format!("{:?}", config).contains("sk-test"));

        let empty = GatewayConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "")])).unwrap();
        assert!(empty.forwarded_env.is_empty());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(err.to_string().contains("eighty"));
    }

    #[test]
    fn zero_timeout_disables_timeout() {
        let config = GatewayConfig::from_lookup(lookup(&[("LLM_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.limits.timeout, None);

        assert!(GatewayConfig::from_lookup(lookup(&[("LLM_MAX_OUTPUT_BYTES", "0")])).is_err());
    }

    #[test]
    fn largest_output_cap_is_accepted() {
        let max = usize::MAX.to_string();
        let config = GatewayConfig::from_lookup(lookup(&[("LLM_MAX_OUTPUT_BYTES", max.as_str())])).unwrap();
        assert_eq!(config.limits.max_output_bytes, usize::MAX);
    }
}
