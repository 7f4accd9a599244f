use crate::application::monitor::Monitor;
use crate::application::render_surface::RenderSurface;
use crate::domain::monitor_kind::MonitorKind;
use anyhow::{Context, bail};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub reset: ResetSettings,
    #[serde(default = "default_monitors")]
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResetSettings {
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub channel: String,
}

fn default_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

fn default_monitors() -> Vec<MonitorConfig> {
    vec![
        MonitorConfig {
            id: "climate-interior".to_string(),
            title: "Interior climate".to_string(),
            kind: "climate".to_string(),
            channel: "interior".to_string(),
        },
        MonitorConfig {
            id: "climate-exterior".to_string(),
            title: "Exterior climate".to_string(),
            kind: "climate".to_string(),
            channel: "exterior".to_string(),
        },
    ]
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: default_confirm_timeout_secs(),
        }
    }
}

impl BackendSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl ResetSettings {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

impl MonitorConfig {
    pub fn kind(&self) -> anyhow::Result<MonitorKind> {
        MonitorKind::parse(&self.kind)
            .with_context(|| format!("unknown kind \"{}\" for monitor {}", self.kind, self.id))
    }

    pub fn build(&self, surface: Arc<dyn RenderSurface>) -> anyhow::Result<Monitor> {
        Ok(Monitor::new(
            self.id.clone(),
            self.title.clone(),
            self.kind()?,
            self.channel.clone(),
            surface,
        ))
    }
}

impl DashboardConfig {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll.interval_secs == 0 {
            bail!("poll.interval_secs must be greater than zero");
        }

        if self.monitors.is_empty() {
            bail!("at least one monitor must be configured");
        }

        let mut ids = HashSet::new();
        let mut channels = HashSet::new();
        for monitor in &self.monitors {
            monitor.kind()?;

            if !ids.insert(monitor.id.as_str()) {
                bail!("duplicate monitor id \"{}\"", monitor.id);
            }

            // One monitor per channel, otherwise a batch would be merged twice
            if !channels.insert(monitor.channel.as_str()) {
                bail!("channel \"{}\" is bound to more than one monitor", monitor.channel);
            }
        }

        Ok(())
    }
}

fn hive_environment() -> Environment {
    Environment::with_prefix("HIVE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn finish(
    builder: ConfigBuilder<DefaultState>,
    environment: Environment,
) -> anyhow::Result<DashboardConfig> {
    let settings = builder.add_source(environment).build()?;
    Ok(settings.try_deserialize()?)
}

/// Load `config/dashboard.*` (optional) overlaid with `HIVE_*` variables,
/// e.g. `HIVE_POLL__INTERVAL_SECS=10`
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let builder = Config::builder().add_source(File::with_name("config/dashboard").required(false));
    finish(builder, hive_environment()).context("failed to load dashboard configuration")
}

/// Parse TOML text overlaid with the given variables instead of the process
/// environment.
#[cfg(test)]
pub fn parse_dashboard_config_with_env(
    toml: &str,
    vars: &[(&str, &str)],
) -> anyhow::Result<DashboardConfig> {
    let vars = vars
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let builder = Config::builder().add_source(File::from_str(toml, config::FileFormat::Toml));
    finish(builder, hive_environment().source(Some(vars)))
}

#[cfg(test)]
pub fn parse_dashboard_config(toml: &str) -> anyhow::Result<DashboardConfig> {
    parse_dashboard_config_with_env(toml, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse_dashboard_config("").unwrap();

        assert_eq!(config.backend.base_url, "http://localhost:8080/api/v1");
        assert_eq!(config.backend.max_retries, 3);
        assert_eq!(config.poll.interval(), Duration::from_secs(30));
        assert_eq!(config.reset.confirm_timeout(), Duration::from_secs(60));
        assert_eq!(config.monitors.len(), 2);
        assert_eq!(config.monitors[0].channel, "interior");
        assert_eq!(config.monitors[1].channel, "exterior");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_monitors() {
        let config = parse_dashboard_config(
            r#"
            [backend]
            base_url = "http://hive.local/api/v1"
            retry_delay_ms = 100

            [poll]
            interval_secs = 5

            [[monitors]]
            id = "brood"
            title = "Brood chamber"
            kind = "climate"
            channel = "interior"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.base_url, "http://hive.local/api/v1");
        assert_eq!(config.backend.retry_delay(), Duration::from_millis(100));
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.monitors.len(), 1);
        assert_eq!(config.monitors[0].kind().unwrap(), MonitorKind::Climate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_channel_is_rejected() {
        let config = parse_dashboard_config(
            r#"
            [[monitors]]
            id = "a"
            title = "A"
            kind = "climate"
            channel = "interior"

            [[monitors]]
            id = "b"
            title = "B"
            kind = "climate"
            channel = "interior"
            "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interior"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let config = parse_dashboard_config(
            r#"
            [[monitors]]
            id = "scale"
            title = "Hive weight"
            kind = "weight"
            channel = "scale"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let config = parse_dashboard_config_with_env(
            "[poll]\ninterval_secs = 5\n",
            &[
                ("HIVE_POLL__INTERVAL_SECS", "10"),
                ("HIVE_BACKEND__BASE_URL", "http://hive.local:8080/api/v1"),
                ("HIVE_BACKEND__MAX_RETRIES", "5"),
                ("HIVE_SERVER__BIND", "127.0.0.1:9000"),
                ("APIARY_POLL__INTERVAL_SECS", "1"),
            ],
        )
        .unwrap();

        assert_eq!(config.poll.interval(), Duration::from_secs(10));
        assert_eq!(config.backend.base_url, "http://hive.local:8080/api/v1");
        assert_eq!(config.backend.max_retries, 5);
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.monitors.len(), 2);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = parse_dashboard_config("[poll]\ninterval_secs = 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
