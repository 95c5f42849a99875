use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_QUERY_DELAY_MS: u64 = 1000;
const DEFAULT_SAMPLE_DELAY_MS: u64 = 500;
const DEFAULT_QUERY_TIMEOUT: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT: u64 = 30;
const DEFAULT_BOOTSTRAP_SAMPLES: usize = 1000;
const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
const DEFAULT_RESPONSE_TRUNCATE_CHARS: usize = 500;
const DEFAULT_DATASETS_DIR: &str = "eval/datasets";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub query_delay_ms: u64,
    pub sample_delay_ms: u64,
    pub query_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub bootstrap_samples: usize,
    pub confidence_level: f64,
    pub bootstrap_seed: Option<u64>,
    pub response_truncate_chars: usize,
    pub datasets_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("COUNCIL_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.into())
                .trim_end_matches('/')
                .to_string(),
            query_delay_ms: env_parse("QUERY_DELAY_MS", DEFAULT_QUERY_DELAY_MS),
            sample_delay_ms: env_parse("SAMPLE_DELAY_MS", DEFAULT_SAMPLE_DELAY_MS),
            query_timeout_secs: env_parse("QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT),
            connect_timeout_secs: env_parse("CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT),
            bootstrap_samples: env_parse("BOOTSTRAP_SAMPLES", DEFAULT_BOOTSTRAP_SAMPLES),
            confidence_level: env_parse("CONFIDENCE_LEVEL", DEFAULT_CONFIDENCE_LEVEL),
            bootstrap_seed: std::env::var("BOOTSTRAP_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
            response_truncate_chars: env_parse(
                "RESPONSE_TRUNCATE_CHARS",
                DEFAULT_RESPONSE_TRUNCATE_CHARS,
            ),
            datasets_dir: PathBuf::from(
                std::env::var("DATASETS_DIR").unwrap_or_else(|_| DEFAULT_DATASETS_DIR.into()),
            ),
        }
    }

    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms)
    }

    pub fn sample_delay(&self) -> Duration {
        Duration::from_millis(self.sample_delay_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn print_banner(&self) {
        tracing::info!("╔══════════════════════════════════════════════════╗");
        tracing::info!("║           council-eval v{}                  ║", env!("CARGO_PKG_VERSION"));
        tracing::info!("╠══════════════════════════════════════════════════╣");
        tracing::info!("║  Pipeline URL:      {:<28}║", self.api_url);
        tracing::info!("║  Query delay:       {:<24}ms ║", self.query_delay_ms);
        tracing::info!("║  Sample delay:      {:<24}ms ║", self.sample_delay_ms);
        tracing::info!("║  Query timeout:     {:<25}s ║", self.query_timeout_secs);
        tracing::info!("║  Bootstrap samples: {:<28}║", self.bootstrap_samples);
        tracing::info!("║  Confidence level:  {:<28}║", self.confidence_level);
        tracing::info!("║  Bootstrap seed:    {:<28}║", match self.bootstrap_seed {
            Some(seed) => seed.to_string(),
            None => "entropy".to_string(),
        });
        tracing::info!("║  Datasets:          {:<28}║", self.datasets_dir.display());
        tracing::info!("╚══════════════════════════════════════════════════╝");
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
