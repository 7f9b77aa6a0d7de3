use serde::Deserialize;

use crate::rollup::{DEFAULT_METHODS, Method};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub rollup: RollupConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub table: String,
    /// How far back from now the migration reaches.
    pub days_back: u32,
    /// Partition length used in row keys.
    pub month_secs: u32,
    /// Span assumed for source rows written without a span header.
    pub chunk_span_secs: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            table: "metric_1024".into(),
            days_back: 68,
            month_secs: 60 * 60 * 24 * 28,
            chunk_span_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Raw, medium and long ttls in seconds.
    pub ttls: Vec<u32>,
    pub table_name_format: String,
    pub raw_retention_secs: u32,
    pub rollup_retention_secs: u32,
    /// Series sampled coarser than this go straight to the long tier.
    pub coarse_interval_secs: u32,
    /// Series sampled finer than this get rollups.
    pub rollup_below_interval_secs: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ttls: vec![60 * 60 * 24, 60 * 60 * 24 * 60, 60 * 60 * 24 * 365 * 3],
            table_name_format: "metric_{}".into(),
            raw_retention_secs: 60 * 60 * 24,
            rollup_retention_secs: 60 * 60 * 24 * 60,
            coarse_interval_secs: 60 * 30,
            rollup_below_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    pub interval_secs: u32,
    pub chunk_span_secs: u32,
    pub methods: Vec<Method>,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            chunk_span_secs: 6 * 60 * 60,
            methods: DEFAULT_METHODS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bounded queue between classification and the writer.
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
        }
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "migration.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            is_identifier(&self.source.table),
            "source.table must be an identifier ([A-Za-z0-9_]), got {:?}",
            self.source.table
        );
        anyhow::ensure!(
            self.source.days_back > 0,
            "source.days_back must be > 0, got {}",
            self.source.days_back
        );
        anyhow::ensure!(
            self.source.month_secs > 0 && self.source.month_secs % 86_400 == 0,
            "source.month_secs must be a positive multiple of 86400, got {}",
            self.source.month_secs
        );
        anyhow::ensure!(
            self.retention.ttls.len() == 3,
            "retention.ttls must hold exactly 3 values (raw, medium, long), got {}",
            self.retention.ttls.len()
        );
        anyhow::ensure!(
            self.retention.ttls.windows(2).all(|w| w[0] < w[1]),
            "retention.ttls must be strictly increasing, got {:?}",
            self.retention.ttls
        );
        anyhow::ensure!(
            self.retention.table_name_format.matches("{}").count() == 1
                && is_identifier(&self.retention.table_name_format.replace("{}", "0")),
            "retention.table_name_format must be an identifier with one {{}}, got {:?}",
            self.retention.table_name_format
        );
        anyhow::ensure!(
            self.retention.rollup_below_interval_secs <= self.retention.coarse_interval_secs,
            "retention.rollup_below_interval_secs ({}) must not exceed retention.coarse_interval_secs ({})",
            self.retention.rollup_below_interval_secs,
            self.retention.coarse_interval_secs
        );
        anyhow::ensure!(
            self.rollup.interval_secs > 0,
            "rollup.interval_secs must be > 0, got {}",
            self.rollup.interval_secs
        );
        anyhow::ensure!(
            self.rollup.chunk_span_secs > 0
                && self.rollup.chunk_span_secs % self.rollup.interval_secs == 0,
            "rollup.chunk_span_secs must be a positive multiple of rollup.interval_secs, got {}",
            self.rollup.chunk_span_secs
        );
        anyhow::ensure!(
            !self.rollup.methods.is_empty(),
            "rollup.methods must be non-empty"
        );
        let mut seen = Vec::with_capacity(self.rollup.methods.len());
        for m in &self.rollup.methods {
            anyhow::ensure!(
                !seen.contains(m),
                "rollup.methods contains {} twice",
                m.name()
            );
            seen.push(*m);
        }
        anyhow::ensure!(
            self.pipeline.queue_capacity > 0,
            "pipeline.queue_capacity must be > 0, got {}",
            self.pipeline.queue_capacity
        );
        Ok(())
    }
}
