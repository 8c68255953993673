use serde::Deserialize;
use std::path::Path;

/// Root application configuration. Loaded from an optional config file and
/// environment variables with the prefix `FUNNEL_EXPRESS__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    /// Lower edge of the recommended threshold band.
    #[serde(default = "default_min_threshold")]
    pub min_threshold: f64,
    /// Upper edge of the recommended threshold band.
    #[serde(default = "default_max_threshold")]
    pub max_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_time_period")]
    pub time_period: String,
    #[serde(default = "default_traffic_sources")]
    pub traffic_sources: Vec<String>,
    /// Fixed seed for reproducible demo data. Unset means a fresh random
    /// source per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Settings for the narrative-insight service. They take effect only when a
/// caller attaches an insight provider; the bundled CLI has none.
#[derive(Debug, Clone, Deserialize)]
pub struct InsightsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

// Default functions
fn default_threshold() -> f64 {
    35.0
}
fn default_min_threshold() -> f64 {
    30.0
}
fn default_max_threshold() -> f64 {
    40.0
}
fn default_time_period() -> String {
    "Last 30 Days".to_string()
}
fn default_traffic_sources() -> Vec<String> {
    vec!["Google Ads".to_string(), "Facebook Ads".to_string()]
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            min_threshold: default_min_threshold(),
            max_threshold: default_max_threshold(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            time_period: default_time_period(),
            traffic_sources: default_traffic_sources(),
            seed: None,
        }
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AnalysisConfig {
    /// Whether `threshold` lies inside the recommended band.
    pub fn in_recommended_band(&self, threshold: f64) -> bool {
        threshold >= self.min_threshold && threshold <= self.max_threshold
    }
}

impl InsightsConfig {
    /// Insights run only when switched on and a non-blank API key is present.
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl AppConfig {
    /// Load configuration from an optional config file, then environment
    /// variables (which take precedence).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("FUNNEL_EXPRESS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("generator.traffic_sources"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
