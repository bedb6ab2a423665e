//! Configuration: the host, trigger timing, and the selector table describing the host page's
//! markup. The table is versioned external data; every group can be replaced from a TOML file.

use css::{ComplexSelector, Compound, Selector, SelectorError, SelectorList, parse_selector_list};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::markers::MARKER_CLASS;

pub const DEFAULT_HOST: &str = "github.com";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub timing: Timing,
    pub selectors: SelectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            timing: Timing::default(),
            selectors: SelectorConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    /// Wait after load before the first pass; the host renders dynamically.
    pub settle_delay_ms: u64,
    /// Quiet period after the last mutation before a pass runs.
    pub debounce_ms: u64,
    /// Period of the safety-net pass.
    pub interval_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            debounce_ms: 500,
            interval_ms: 5000,
        }
    }
}

impl Timing {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Raw selector groups as written in the config file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    pub pr_header: String,
    pub commit_timeline: String,
    pub commits_section: String,
    pub commit_links: String,
    pub inline_code: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            pr_header: r#".gh-header-meta, .commit-tease, [data-test-selector="pr-header-actions"], .gh-header-actions"#.to_string(),
            commit_timeline: r#".TimelineItem, .commit-group, [data-test-selector="pr-timeline-commits-list"], .js-navigation-item, [data-testid="pr-timeline-commits-list"]"#.to_string(),
            commits_section: r#"[data-testid="pr-timeline-commits-list"], .js-navigation-container, .TimelineItem--condensed"#.to_string(),
            commit_links: r#"a[href*="/commit"]"#.to_string(),
            inline_code: "code".to_string(),
        }
    }
}

/// Compiled selector groups.
#[derive(Clone, Debug)]
pub struct SelectorTable {
    pub pr_header: SelectorList,
    pub commit_timeline: SelectorList,
    pub commits_section: SelectorList,
    pub commit_links: SelectorList,
    pub inline_code: SelectorList,
    /// Our own markers; fixed, not part of the host markup.
    pub markers: SelectorList,
}

impl SelectorTable {
    pub fn compile(raw: &SelectorConfig) -> Result<Self, ConfigError> {
        let group = |name: &'static str, src: &str| {
            parse_selector_list(src).map_err(|source| ConfigError::Selector { group: name, source })
        };
        Ok(Self {
            pr_header: group("pr_header", &raw.pr_header)?,
            commit_timeline: group("commit_timeline", &raw.commit_timeline)?,
            commits_section: group("commits_section", &raw.commits_section)?,
            commit_links: group("commit_links", &raw.commit_links)?,
            inline_code: group("inline_code", &raw.inline_code)?,
            markers: class_selector(MARKER_CLASS),
        })
    }
}

fn class_selector(class: &str) -> SelectorList {
    SelectorList {
        selectors: vec![ComplexSelector {
            compounds: vec![Compound {
                simple: vec![Selector::Class(class.to_string())],
            }],
            combinators: Vec::new(),
        }],
    }
}

/// Everything a reconciliation pass reads besides the page itself.
#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub table: SelectorTable,
}

impl Settings {
    pub fn defaults() -> Result<Self, ConfigError> {
        Config::default().compile()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Selector { group: &'static str, source: SelectorError },
    InvalidHost(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read config {}: {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
            ConfigError::Serialize(e) => write!(f, "cannot write config: {e}"),
            ConfigError::Selector { group, source } => {
                write!(f, "selector group `{group}` is invalid: {source}")
            }
            ConfigError::InvalidHost(host) => write!(f, "`{host}` is not a usable host name"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Serialize(e) => Some(e),
            ConfigError::Selector { source, .. } => Some(source),
            ConfigError::InvalidHost(_) => None,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn compile(&self) -> Result<Settings, ConfigError> {
        validate_host(&self.host)?;
        Ok(Settings {
            host: self.host.clone(),
            table: SelectorTable::compile(&self.selectors)?,
        })
    }
}

// The host must be a bare authority: "github.com" or "ghe.example.org:8443".
fn validate_host(host: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidHost(host.to_string());
    if host.is_empty() || host.contains(['/', '?', '#', '@']) {
        return Err(invalid());
    }
    let url = Url::parse(&format!("https://{host}/")).map_err(|_| invalid())?;
    if url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        let settings = Settings::defaults().expect("default config compiles");
        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.table.pr_header.selectors.len(), 4);
        assert_eq!(settings.table.commit_timeline.selectors.len(), 5);
        assert_eq!(settings.table.commits_section.selectors.len(), 3);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let config = Config::from_toml_str(
            r#"
            host = "ghe.example.org"

            [timing]
            debounce_ms = 250

            [selectors]
            inline_code = "code, tt"
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.host, "ghe.example.org");
        assert_eq!(config.timing.debounce_ms, 250);
        assert_eq!(config.timing.settle_delay_ms, 2000);
        assert_eq!(config.selectors.commit_links, r#"a[href*="/commit"]"#);
        let settings = config.compile().expect("compiles");
        assert_eq!(settings.table.inline_code.selectors.len(), 2);
    }

    #[test]
    fn rejects_unknown_fields_bad_selectors_and_hosts() {
        assert!(matches!(
            Config::from_toml_str("hots = \"x\""),
            Err(ConfigError::Parse(_))
        ));

        let mut config = Config::default();
        config.selectors.pr_header = "[data-x=".to_string();
        assert!(matches!(
            config.compile(),
            Err(ConfigError::Selector { group: "pr_header", .. })
        ));

        for host in ["", "github.com/evil", "a b", "user@host"] {
            let config = Config {
                host: host.to_string(),
                ..Config::default()
            };
            assert!(
                matches!(config.compile(), Err(ConfigError::InvalidHost(_))),
                "host {host:?} should be rejected"
            );
        }
    }

    #[test]
    fn toml_round_trip_preserves_defaults() {
        let text = Config::default().to_toml_string().expect("serializes");
        assert_eq!(Config::from_toml_str(&text).expect("parses"), Config::default());
    }

    #[test]
    fn unrepresentable_values_fail_to_serialize() {
        let mut config = Config::default();
        config.timing.settle_delay_ms = u64::MAX;
        assert!(
            matches!(config.to_toml_string(), Err(ConfigError::Serialize(_))),
            "toml integers are signed 64-bit"
        );
    }
}
