//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::WorkerConfig;
use super::secret::secret_string;
use crate::domain::errors::WorkerError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "doctor-worker.toml";

/// Loads configuration from the process environment and an optional TOML file
///
/// This function:
/// 1. Reads the TOML file (explicit `path`, else [`DEFAULT_CONFIG_FILE`] if present)
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`WorkerConfig`], or starts from defaults without a file
/// 4. Applies environment variable overrides (`REDIS_URL`, `DATABASE_URL`,
///    `TREATMENT_TIME` and the `DOCTOR_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`WorkerError::Configuration`] if an explicit file is missing or
/// unreadable, TOML parsing fails, a referenced variable is unset, an override
/// cannot be parsed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use doctor_worker::config::loader::load_config;
///
/// let config = load_config(None).expect("Failed to load config");
/// assert_eq!(config.redis.queue_name, "waiting_room");
/// ```
pub fn load_config(path: Option<&Path>) -> Result<WorkerConfig> {
    load_config_with_env(path, &|key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit variable lookup
pub fn load_config_with_env(
    path: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<WorkerConfig> {
    let file = match path {
        Some(path) if !path.exists() => {
            return Err(WorkerError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        Some(path) => Some(path),
        None => Some(Path::new(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let mut config = match file {
        Some(path) => {
            let contents = fs::read_to_string(path).map_err(|e| {
                WorkerError::Configuration(format!(
                    "Failed to read configuration file {}: {}",
                    path.display(),
                    e
                ))
            })?;

            let contents = substitute_env_vars(&contents, env)?;

            tracing::debug!(path = %path.display(), "Loading configuration file");
            toml::from_str(&contents)
                .map_err(|e| WorkerError::Configuration(format!("Failed to parse TOML: {e}")))?
        }
        None => WorkerConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;

    config.validate().map_err(|e| {
        WorkerError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied through untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str, env: &dyn Fn(&str) -> Option<String>) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| WorkerError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match env(var_name) {
                Some(value) => value,
                None => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(WorkerError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        WorkerError::Configuration(format!("Invalid value '{value}' for {key}: {e}"))
    })
}

/// Applies environment variable overrides
///
/// The deployment variables `REDIS_URL`, `DATABASE_URL` and `TREATMENT_TIME`
/// are honoured first; the remaining settings follow the pattern
/// `DOCTOR_<SECTION>_<KEY>`, for example `DOCTOR_REDIS_QUEUE_NAME`.
fn apply_env_overrides(
    config: &mut WorkerConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = env("REDIS_URL") {
        config.redis.url = val;
    }
    if let Some(val) = env("DATABASE_URL") {
        config.postgresql.connection_string = secret_string(val);
    }
    if let Some(val) = env("TREATMENT_TIME") {
        config.treatment.treatment_time_seconds = parse_override("TREATMENT_TIME", &val)?;
    }

    if let Some(val) = env("DOCTOR_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val.to_lowercase();
    }

    if let Some(val) = env("DOCTOR_REDIS_QUEUE_NAME") {
        config.redis.queue_name = val;
    }
    if let Some(val) = env("DOCTOR_REDIS_BLOCK_TIMEOUT_SECONDS") {
        config.redis.block_timeout_seconds =
            parse_override("DOCTOR_REDIS_BLOCK_TIMEOUT_SECONDS", &val)?;
    }

    if let Some(val) = env("DOCTOR_RETRY_MAX_ATTEMPTS") {
        config.retry.max_attempts = parse_override("DOCTOR_RETRY_MAX_ATTEMPTS", &val)?;
    }
    if let Some(val) = env("DOCTOR_RETRY_DELAY_SECONDS") {
        config.retry.delay_seconds = parse_override("DOCTOR_RETRY_DELAY_SECONDS", &val)?;
    }

    if let Some(val) = env("DOCTOR_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("DOCTOR_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env("DOCTOR_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_substitute_env_vars() {
        let env = env_of(&[("PG_PASSWORD", "s3cret")]);
        let input = "connection_string = \"postgresql://app:${PG_PASSWORD}@db/mediqueue\"";
        let result = substitute_env_vars(input, &env).unwrap();
        assert_eq!(
            result,
            "connection_string = \"postgresql://app:s3cret@db/mediqueue\"\n"
        );
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let env = env_of(&[]);
        let err = substitute_env_vars("url = \"${NOPE_ONE}${NOPE_TWO}${NOPE_ONE}\"", &env)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variables: NOPE_ONE, NOPE_TWO"
        );
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let env = env_of(&[]);
        let input = "# url = \"${NOT_SET}\"\nqueue_name = \"waiting_room\"";
        let result = substitute_env_vars(input, &env).unwrap();
        assert!(result.contains("${NOT_SET}"));
    }

    #[test]
    fn test_deployment_overrides() {
        let env = env_of(&[
            ("REDIS_URL", "redis://redis:6379"),
            ("DATABASE_URL", "postgresql://u:p@postgres:5432/mediqueue"),
            ("TREATMENT_TIME", "1"),
        ]);
        let mut config = WorkerConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.redis.url, "redis://redis:6379");
        assert_eq!(
            config.postgresql.connection_string.expose_secret().as_str(),
            "postgresql://u:p@postgres:5432/mediqueue"
        );
        assert_eq!(config.treatment.treatment_time_seconds, 1);
    }

    #[test]
    fn test_prefixed_overrides() {
        let env = env_of(&[
            ("DOCTOR_APPLICATION_LOG_LEVEL", "DEBUG"),
            ("DOCTOR_REDIS_QUEUE_NAME", "triage"),
            ("DOCTOR_REDIS_BLOCK_TIMEOUT_SECONDS", "3"),
            ("DOCTOR_RETRY_MAX_ATTEMPTS", "4"),
            ("DOCTOR_RETRY_DELAY_SECONDS", "1"),
            ("DOCTOR_LOGGING_LOCAL_ENABLED", "true"),
            ("DOCTOR_LOGGING_LOCAL_PATH", "/var/log/doctor"),
        ]);
        let mut config = WorkerConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.redis.queue_name, "triage");
        assert_eq!(config.redis.block_timeout_seconds, 3);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.delay_seconds, 1);
        assert!(config.logging.local_enabled);
        assert_eq!(config.logging.local_path, "/var/log/doctor");
    }

    #[test]
    fn test_invalid_treatment_time_override() {
        let env = env_of(&[("TREATMENT_TIME", "five")]);
        let mut config = WorkerConfig::default();
        let err = apply_env_overrides(&mut config, &env).unwrap_err();
        assert!(matches!(err, WorkerError::Configuration(_)));
        assert!(err.to_string().contains("TREATMENT_TIME"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let env = env_of(&[]);
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");

        assert!(load_config_with_env(Some(&missing), &env).is_err());
    }
}
