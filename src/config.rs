use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::priority::RiskTier;

/// Main configuration structure for the dispatch engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldDispatchConfig {
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Geo clock settings
    pub tracking: TrackingConfig,
    /// Task pool eligibility
    pub dispatch: DispatchConfig,
    /// Route optimizer settings
    pub optimizer: OptimizerConfig,
    /// Event bus and notice board
    pub events: EventsConfig,
    /// Shift roster source
    pub shift: ShiftConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON log lines instead of plain text
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Interval between location ticks
    pub tick_interval_ms: u64,
    /// Largest per-tick movement on either axis, in degrees
    pub max_displacement_deg: f64,
    /// Position frames buffered per subscriber before old ones are dropped
    pub frame_buffer: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Risk tiers that enter the task pool
    pub eligible_risk_tiers: Vec<RiskTier>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimizerConfig {
    /// Floor on how long an optimization appears to take, for progress indicators
    pub min_visible_duration_ms: u64,
    /// Travel speed used for ETA estimates
    pub average_speed_kmh: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Broadcast buffer per subscriber
    pub channel_capacity: usize,
    /// How long a notice stays listed
    pub notice_ttl_secs: u64,
    /// Most notices kept at once
    pub notice_capacity: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShiftConfig {
    /// TOML manifest with the shift's agents and case portfolio
    pub manifest_path: String,
}

impl Default for FieldDispatchConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
            tracking: TrackingConfig {
                tick_interval_ms: 3000,
                max_displacement_deg: 0.001,
                frame_buffer: 16,
            },
            dispatch: DispatchConfig {
                eligible_risk_tiers: vec![RiskTier::High, RiskTier::Critical],
            },
            optimizer: OptimizerConfig {
                min_visible_duration_ms: 0, // no artificial delay in the backend
                average_speed_kmh: 25.0,    // urban traffic
            },
            events: EventsConfig {
                channel_capacity: 256,
                notice_ttl_secs: 6,
                notice_capacity: 64,
            },
            shift: ShiftConfig {
                manifest_path: "shift.toml".to_string(),
            },
        }
    }
}

impl TrackingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl OptimizerConfig {
    pub fn min_visible_duration(&self) -> Duration {
        Duration::from_millis(self.min_visible_duration_ms)
    }
}

impl EventsConfig {
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}

impl FieldDispatchConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (field-dispatch.toml, .field-dispatch-rc)
    /// 3. Environment variables (prefixed with FIELD_DISPATCH_, sections split by `__`)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("field-dispatch.toml").exists() {
            builder = builder.add_source(File::with_name("field-dispatch"));
        }

        if Path::new(".field-dispatch-rc").exists() {
            builder = builder.add_source(
                File::with_name(".field-dispatch-rc").format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("FIELD_DISPATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let field_dispatch_config: FieldDispatchConfig = config.try_deserialize()?;
        field_dispatch_config.validate()?;
        Ok(field_dispatch_config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let bound = self.tracking.max_displacement_deg;
        if !(bound.is_finite() && bound >= 0.0) {
            anyhow::bail!("tracking.max_displacement_deg must be a non-negative number, got {bound}");
        }
        if !(self.optimizer.average_speed_kmh.is_finite() && self.optimizer.average_speed_kmh > 0.0) {
            anyhow::bail!(
                "optimizer.average_speed_kmh must be positive, got {}",
                self.optimizer.average_speed_kmh
            );
        }
        if self.dispatch.eligible_risk_tiers.is_empty() {
            anyhow::bail!("dispatch.eligible_risk_tiers must name at least one tier");
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<FieldDispatchConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = FieldDispatchConfig::load_env_file();
        FieldDispatchConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static FieldDispatchConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
