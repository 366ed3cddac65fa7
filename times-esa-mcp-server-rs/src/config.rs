use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::journal::{EsaConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::submission_guard::{SuppressionConfig, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_WINDOW};
use crate::utils::{parse_bool, safe_trim, ParsedArgs};
use crate::workflow::{WorkflowOptions, DEFAULT_PREFIX};

pub const DEFAULT_SERVER_NAME: &str = "times-esa-mcp-server";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_name: String,
    pub esa: EsaConfig,
    pub suppression: SuppressionConfig,
    pub workflow: WorkflowOptions,
}

impl AppConfig {
    pub fn from_env(args: &ParsedArgs) -> Result<Self, ConfigError> {
        Self::load(args, |key| env::var(key).ok())
    }

    pub fn load<F>(args: &ParsedArgs, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |flag: &str, env_key: Option<&str>| -> Option<String> {
            let from_flag = args.values.get(flag).map(|v| safe_trim(Some(v.as_str())));
            let from_env = env_key.and_then(|key| lookup(key)).map(|v| safe_trim(Some(v.as_str())));
            from_flag
                .filter(|v| !v.is_empty())
                .or_else(|| from_env.filter(|v| !v.is_empty()))
        };

        let team = setting("team", Some("ESA_TEAM_NAME")).ok_or(ConfigError::Missing("ESA_TEAM_NAME"))?;
        let access_token = lookup("ESA_ACCESS_TOKEN")
            .map(|v| safe_trim(Some(v.as_str())))
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("ESA_ACCESS_TOKEN"))?;
        let base_url = setting("base-url", Some("ESA_API_BASE_URL")).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = match setting("timeout-secs", Some("TIMES_ESA_TIMEOUT_SECS")) {
            Some(raw) => parse_number::<u64>("timeout-secs", &raw)?,
            None => DEFAULT_TIMEOUT.as_secs(),
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "timeout-secs",
                value: "0".to_string(),
            });
        }

        let window = match setting("window-secs", Some("TIMES_ESA_WINDOW_SECS")) {
            Some(raw) => Duration::from_secs(parse_number::<u64>("window-secs", &raw)?),
            None => DEFAULT_WINDOW,
        };
        let similarity_threshold = match setting("threshold", Some("TIMES_ESA_SIMILARITY_THRESHOLD")) {
            Some(raw) => {
                let value = parse_number::<f64>("threshold", &raw)?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::Invalid { name: "threshold", value: raw });
                }
                value
            }
            None => DEFAULT_SIMILARITY_THRESHOLD,
        };

        let require_confirmation = match setting("require-confirmation", Some("TIMES_ESA_REQUIRE_CONFIRMATION")) {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                name: "require-confirmation",
                value: raw,
            })?,
            None => true,
        };
        let prefix = args
            .values
            .get("prefix")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let server_name = setting("name", None).unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        Ok(Self {
            server_name,
            esa: EsaConfig {
                team,
                access_token,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            suppression: SuppressionConfig {
                window,
                similarity_threshold,
            },
            workflow: WorkflowOptions {
                prefix,
                require_confirmation,
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}
