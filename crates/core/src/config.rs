use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub notifier: NotifierConfig,
    pub sweep: SweepConfig,
    pub erp: ErpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub enabled: bool,
    /// Dispatch loop polling interval.
    pub poll_interval_ms: u64,
    /// Maximum number of due jobs pulled per tick.
    pub batch_size: i64,
    /// Per-appointment lifetime cap on Sent notifications.
    pub notification_cap: i64,
    /// Appointment statuses that cancel still-pending reminder jobs.
    pub terminal_statuses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub enabled: bool,
    /// Local business-time hour the no-show window opens.
    pub window_hour: u32,
    /// Local business-time minute the no-show window opens.
    pub window_minute: u32,
    /// Width of the run window in minutes.
    pub window_duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    pub enabled: bool,
    /// Customer account (BAID) scoping the delta sync.
    pub account: String,
    /// Local hour used as the delta-sync watermark literal.
    pub window_start_hour: u32,
    /// Base URL for customer-facing pickup links.
    pub link_base_url: String,
    /// JSON file the ERP export lands in (embedded file-drop integration).
    pub drop_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://willcall.db".to_string(),
                max_connections: 10,
                connection_timeout_seconds: 30,
            },
            notifier: NotifierConfig {
                enabled: true,
                poll_interval_ms: 60_000,
                batch_size: 50,
                notification_cap: 10,
                terminal_statuses: vec![
                    "NO_SHOW".to_string(),
                    "COMPLETED".to_string(),
                    "CANCELLED".to_string(),
                ],
            },
            sweep: SweepConfig {
                enabled: true,
                window_hour: 17,
                window_minute: 15,
                window_duration_minutes: 30,
            },
            erp: ErpConfig {
                enabled: true,
                account: String::new(),
                window_start_hour: 3,
                link_base_url: "https://pickup.example.com/appointments".to_string(),
                drop_file: "erp_orders.json".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("config file not found: {}", path));
            }
        } else {
            let default_paths = ["config/willcall.toml", "willcall.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        builder = builder
            .set_default("database.url", "sqlite://willcall.db")?
            .set_default("database.max_connections", 10)?
            .set_default("database.connection_timeout_seconds", 30)?
            .set_default("notifier.enabled", true)?
            .set_default("notifier.poll_interval_ms", 60_000)?
            .set_default("notifier.batch_size", 50)?
            .set_default("notifier.notification_cap", 10)?
            .set_default(
                "notifier.terminal_statuses",
                vec!["NO_SHOW", "COMPLETED", "CANCELLED"],
            )?
            .set_default("sweep.enabled", true)?
            .set_default("sweep.window_hour", 17)?
            .set_default("sweep.window_minute", 15)?
            .set_default("sweep.window_duration_minutes", 30)?
            .set_default("erp.enabled", true)?
            .set_default("erp.account", "")?
            .set_default("erp.window_start_hour", 3)?
            .set_default(
                "erp.link_base_url",
                "https://pickup.example.com/appointments",
            )?
            .set_default("erp.drop_file", "erp_orders.json")?;

        let config = builder
            .add_source(Environment::with_prefix("WILLCALL").separator("__"))
            .build()
            .context("failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.notifier.batch_size <= 0 {
            return Err(anyhow::anyhow!("notifier.batch_size must be positive"));
        }
        if self.notifier.notification_cap <= 0 {
            return Err(anyhow::anyhow!("notifier.notification_cap must be positive"));
        }
        if self.sweep.window_hour > 23 || self.sweep.window_minute > 59 {
            return Err(anyhow::anyhow!("sweep window start is not a valid wall clock time"));
        }
        if self.sweep.window_duration_minutes <= 0 {
            return Err(anyhow::anyhow!("sweep.window_duration_minutes must be positive"));
        }
        if self.erp.window_start_hour > 23 {
            return Err(anyhow::anyhow!("erp.window_start_hour must be a valid hour"));
        }
        Ok(())
    }
}
