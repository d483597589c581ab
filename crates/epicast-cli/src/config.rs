//! `epicast.toml` loading.
//!
//! Every key is optional. The binary resolves each setting as: CLI flag (or its env var, via clap)
//! first, then this file, then the built-in default.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File looked for in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "epicast.toml";
pub const CONFIG_ENV: &str = "EPICAST_CONFIG";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(PathBuf),
    #[error("config file unreadable: {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub feed: FeedSection,
    pub output: OutputSection,
    pub lookups: LookupsSection,
    pub urls: UrlsSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedSection {
    pub url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub dir: Option<PathBuf>,
    pub prune_orphans: Option<bool>,
    /// `raw` or `calendar`.
    pub date_order: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupsSection {
    pub enabled: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub crossref_endpoint: Option<String>,
    pub pubmed_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlsSection {
    /// Internal host → public host. Entries are added to the built-in table; a key already in
    /// the table takes the configured value.
    pub domains: BTreeMap<String, String>,
}

impl FileConfig {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text, path)
    }

    /// An explicit path (flag or `EPICAST_CONFIG`) must exist. Otherwise `./epicast.toml` is read
    /// when present, and an empty config is used when it is not.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(p) = explicit {
            let cfg = Self::from_path(p)?;
            tracing::debug!(path = %p.display(), "config loaded");
            return Ok(cfg);
        }
        let fallback = cwd.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            let cfg = Self::from_path(&fallback)?;
            tracing::debug!(path = %fallback.display(), "config loaded");
            return Ok(cfg);
        }
        Ok(Self::default())
    }

    /// Built-in domain table with the configured entries laid over it, in a stable order.
    pub fn domain_rules(&self) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = epicast_local::rewrite::DEFAULT_DOMAINS
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        for (from, to) in &self.urls.domains {
            match merged.iter_mut().find(|(f, _)| f.eq_ignore_ascii_case(from)) {
                Some(slot) => slot.1 = to.clone(),
                None => merged.push((from.clone(), to.clone())),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = FileConfig::parse("", Path::new("x.toml")).unwrap();
        assert_eq!(cfg, FileConfig::default());
        assert_eq!(cfg.domain_rules().len(), 2);
    }

    #[test]
    fn sections_parse() {
        let cfg = FileConfig::parse(
            r#"
[feed]
url = "http://127.0.0.1:9/rss"
timeout_ms = 1500
max_bytes = 1048576

[output]
dir = "site/data"
prune_orphans = true
date_order = "calendar"

[lookups]
enabled = false
concurrency = 4
crossref_endpoint = "http://127.0.0.1:9/works"

[urls.domains]
"anchor.fm" = "podcasters.example"
"podcasters.spotify.com" = "open.example"
"#,
            Path::new("epicast.toml"),
        )
        .unwrap();
        assert_eq!(cfg.feed.url.as_deref(), Some("http://127.0.0.1:9/rss"));
        assert_eq!(cfg.feed.timeout_ms, Some(1500));
        assert_eq!(cfg.feed.max_bytes, Some(1_048_576));
        assert_eq!(cfg.output.dir, Some(PathBuf::from("site/data")));
        assert_eq!(cfg.output.prune_orphans, Some(true));
        assert_eq!(cfg.output.date_order.as_deref(), Some("calendar"));
        assert_eq!(cfg.lookups.enabled, Some(false));
        assert_eq!(cfg.lookups.concurrency, Some(4));
        assert_eq!(cfg.lookups.timeout_ms, None);
        assert_eq!(cfg.lookups.pubmed_endpoint, None);

        let rules = cfg.domain_rules();
        assert_eq!(
            rules,
            vec![
                ("podcasters.spotify.com".to_string(), "open.example".to_string()),
                (
                    "www.podcasters.spotify.com".to_string(),
                    "creators.spotify.com".to_string()
                ),
                ("anchor.fm".to_string(), "podcasters.example".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse("[feed]\nurll = \"x\"\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn explicit_path_must_exist_but_fallback_is_optional() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(matches!(
            FileConfig::load(Some(&missing), tmp.path()),
            Err(ConfigError::Missing(_))
        ));
        assert_eq!(
            FileConfig::load(None, tmp.path()).unwrap(),
            FileConfig::default()
        );

        std::fs::write(
            tmp.path().join(DEFAULT_CONFIG_FILE),
            "[lookups]\nenabled = false\n",
        )
        .unwrap();
        let cfg = FileConfig::load(None, tmp.path()).unwrap();
        assert_eq!(cfg.lookups.enabled, Some(false));
    }
}
