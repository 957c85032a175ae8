// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::debug;

use crate::adapter::SourceConfig;
use crate::normalize::DEFAULT_YEAR_PIVOT;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub crawl: CrawlConfig,
    pub dates: DateConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            accept_language: "sv-SE,sv;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Capacity of the channel adapters emit into.
    pub sink_capacity: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            sink_capacity: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Two-digit years below this are read as 20xx, the rest as 19xx.
    pub two_digit_year_pivot: u8,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            two_digit_year_pivot: DEFAULT_YEAR_PIVOT,
        }
    }
}

impl Config {
    /// Parse YAML text. Missing sections take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text).context("parsing config yaml")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))?;
        debug!(path = %path.display(), sources = config.sources.len(), "config loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be positive");
        }
        if self.crawl.sink_capacity == 0 {
            anyhow::bail!("crawl.sink_capacity must be positive");
        }
        if self.dates.two_digit_year_pivot > 100 {
            anyhow::bail!("dates.two_digit_year_pivot must be within 0..=100");
        }
        for source in &self.sources {
            source
                .validate()
                .with_context(|| format!("source {:?}", source.source))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Layout, Locate};
    use crate::model::Kind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
fetch:
  timeout_secs: 5
dates:
  two_digit_year_pivot: 50
sources:
  - source: exempelbanken
    url: https://example.com/rantor
    kind: list_rate
    locate:
      anchor: Aktuella bolåneräntor
      skip: 1
      fallback_anchors: [Bolåneräntor]
    layout:
      type: term_rows
      term_column: 0
      value_column: 2
      changed_on_column: 3
    headers:
      Referer: https://example.com/
  - source: snittbanken
    url: https://example.com/snitt
    kind: average_rate
    locate:
      caption: Genomsnittsräntor
    layout:
      type: month_rows
"#;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.fetch.timeout_secs, 20);
        assert_eq!(config.crawl.sink_capacity, 4096);
        assert_eq!(config.dates.two_digit_year_pivot, DEFAULT_YEAR_PIVOT);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn loads_sources_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(YAML.as_bytes())?;

        let config = Config::load(file.path())?;
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.crawl.sink_capacity, 4096);
        assert_eq!(config.dates.two_digit_year_pivot, 50);
        assert_eq!(config.sources.len(), 2);

        let first = &config.sources[0];
        assert_eq!(first.kind, Kind::ListRate);
        assert!(first.reject_redirects);
        assert_eq!(first.headers.get("Referer").map(String::as_str), Some("https://example.com/"));
        match &first.locate {
            Locate::Anchor {
                anchor,
                skip,
                fallback_anchors,
            } => {
                assert_eq!(anchor, "Aktuella bolåneräntor");
                assert_eq!(*skip, 1);
                assert_eq!(fallback_anchors, &vec!["Bolåneräntor".to_string()]);
            }
            other => panic!("unexpected locate {other:?}"),
        }
        assert_eq!(
            first.layout,
            Layout::TermRows {
                term_column: 0,
                value_column: 2,
                changed_on_column: Some(3)
            }
        );

        let second = &config.sources[1];
        assert_eq!(second.kind, Kind::AverageRate);
        assert!(matches!(second.locate, Locate::Caption { .. }));
        assert_eq!(second.layout, Layout::MonthRows { month_column: 0 });
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::from_yaml("crawl: { sink_capacity: 0 }").is_err());
        assert!(Config::from_yaml("fetch: { timeout_secs: 0 }").is_err());
        assert!(Config::from_yaml("dates: { two_digit_year_pivot: 120 }").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load("/nonexistent/ratescraper.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("reading config"));
    }
}
