// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use roster_tui::TuiOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_DATASET_SIZE: usize = 100_000;
const DEFAULT_SEED: u64 = 1;
const DEFAULT_LATENCY: &str = "150ms";
const DEFAULT_DEBOUNCE: &str = "300ms";
const DEFAULT_LOG_LEVEL: &str = "warn";
const MAX_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub dataset: DatasetSection,
    #[serde(default)]
    pub fetch: Fetch,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            dataset: DatasetSection::default(),
            fetch: Fetch::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSection {
    pub size: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            size: Some(DEFAULT_DATASET_SIZE),
            seed: Some(DEFAULT_SEED),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fetch {
    pub page_size: Option<usize>,
    pub latency: Option<String>,
    pub debounce: Option<String>,
    pub prefetch_pages: Option<usize>,
}

impl Default for Fetch {
    fn default() -> Self {
        Self {
            page_size: Some(roster_app::DEFAULT_PAGE_SIZE),
            latency: Some(DEFAULT_LATENCY.to_owned()),
            debounce: Some(DEFAULT_DEBOUNCE.to_owned()),
            prefetch_pages: Some(roster_app::DEFAULT_PREFETCH_PAGES),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub overscan: Option<usize>,
    pub min_card_width: Option<u16>,
    pub gap: Option<u16>,
}

impl Default for Ui {
    fn default() -> Self {
        let defaults = TuiOptions::default();
        Self {
            overscan: Some(defaults.overscan),
            min_card_width: Some(defaults.min_card_width),
            gap: Some(defaults.gap),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("ROSTER_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set ROSTER_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(roster_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [storage], [dataset], [fetch], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            roster_db::validate_db_path(db_path)?;
        }

        if self.dataset.size == Some(0) {
            bail!("dataset.size in {} must be positive", path.display());
        }

        if let Some(page_size) = self.fetch.page_size
            && !(1..=MAX_PAGE_SIZE).contains(&page_size)
        {
            bail!(
                "fetch.page_size in {} must be between 1 and {MAX_PAGE_SIZE}, got {page_size}",
                path.display()
            );
        }

        self.latency()
            .with_context(|| format!("fetch.latency in {}", path.display()))?;
        self.debounce()
            .with_context(|| format!("fetch.debounce in {}", path.display()))?;

        if self.ui.min_card_width == Some(0) {
            bail!("ui.min_card_width in {} must be positive", path.display());
        }

        self.log_level()
            .with_context(|| format!("log.level in {}", path.display()))?;

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => roster_db::default_db_path(),
        }
    }

    pub fn dataset_size(&self) -> usize {
        self.dataset.size.unwrap_or(DEFAULT_DATASET_SIZE)
    }

    pub fn dataset_seed(&self) -> u64 {
        self.dataset.seed.unwrap_or(DEFAULT_SEED)
    }

    pub fn page_size(&self) -> usize {
        self.fetch
            .page_size
            .unwrap_or(roster_app::DEFAULT_PAGE_SIZE)
    }

    pub fn prefetch_pages(&self) -> usize {
        self.fetch
            .prefetch_pages
            .unwrap_or(roster_app::DEFAULT_PREFETCH_PAGES)
    }

    pub fn latency(&self) -> Result<Duration> {
        parse_duration(self.fetch.latency.as_deref().unwrap_or(DEFAULT_LATENCY))
    }

    pub fn debounce(&self) -> Result<Duration> {
        parse_duration(self.fetch.debounce.as_deref().unwrap_or(DEFAULT_DEBOUNCE))
    }

    pub fn tui_options(&self) -> Result<TuiOptions> {
        let defaults = TuiOptions::default();
        Ok(TuiOptions {
            page_size: self.page_size(),
            prefetch_pages: self.prefetch_pages(),
            overscan: self.ui.overscan.unwrap_or(defaults.overscan),
            min_card_width: self.ui.min_card_width.unwrap_or(defaults.min_card_width),
            gap: self.ui.gap.unwrap_or(defaults.gap),
            debounce: self.debounce()?,
        })
    }

    pub fn log_level(&self) -> Result<Level> {
        let raw = self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        raw.trim().parse::<Level>().map_err(|_| {
            anyhow!("invalid log level {raw:?}; use one of: error, warn, info, debug, trace")
        })
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let cache_root = dirs::cache_dir().ok_or_else(|| {
            anyhow!("cannot resolve cache directory; set [log].path to a writable file")
        })?;
        Ok(cache_root.join(roster_db::APP_NAME).join("roster.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# roster config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/roster/roster.db)\n# db_path = \"/absolute/path/to/roster.db\"\n\n[dataset]\nsize = {}\nseed = {}\n\n[fetch]\npage_size = {}\nlatency = \"{}\"\ndebounce = \"{}\"\nprefetch_pages = {}\n\n[ui]\noverscan = {}\nmin_card_width = {}\ngap = {}\n\n[log]\nlevel = \"{}\"\n# path = \"/absolute/path/to/roster.log\"\n",
            path.display(),
            DEFAULT_DATASET_SIZE,
            DEFAULT_SEED,
            roster_app::DEFAULT_PAGE_SIZE,
            DEFAULT_LATENCY,
            DEFAULT_DEBOUNCE,
            roster_app::DEFAULT_PREFETCH_PAGES,
            TuiOptions::default().overscan,
            TuiOptions::default().min_card_width,
            TuiOptions::default().gap,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 150ms or 2s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;
    use tracing::Level;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.dataset_size(), 100_000);
        assert_eq!(config.page_size(), 100);
        assert_eq!(config.prefetch_pages(), 1);
        assert_eq!(config.latency()?, Duration::from_millis(150));
        assert_eq!(config.log_level()?, Level::WARN);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[fetch]\npage_size = 50\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[fetch]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[dataset]\nsize = 500\nseed = 9\n[fetch]\npage_size = 25\nlatency = \"0ms\"\ndebounce = \"1s\"\nprefetch_pages = 0\n[ui]\noverscan = 2\nmin_card_width = 30\ngap = 2\n[log]\nlevel = \"debug\"\npath = \"/tmp/roster-test.log\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.dataset_size(), 500);
        assert_eq!(config.dataset_seed(), 9);
        assert_eq!(config.latency()?, Duration::ZERO);
        assert_eq!(config.log_level()?, Level::DEBUG);
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/roster-test.log"));

        let options = config.tui_options()?;
        assert_eq!(options.page_size, 25);
        assert_eq!(options.prefetch_pages, 0);
        assert_eq!(options.overscan, 2);
        assert_eq!(options.min_card_width, 30);
        assert_eq!(options.gap, 2);
        assert_eq!(options.debounce, Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn partial_sections_fall_back_per_field() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[fetch]\npage_size = 40\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.page_size(), 40);
        assert_eq!(config.prefetch_pages(), 1);
        assert_eq!(config.debounce()?, Duration::from_millis(300));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() -> Result<()> {
        let cases = [
            ("version = 1\n[dataset]\nsize = 0\n", "must be positive"),
            ("version = 1\n[fetch]\npage_size = 0\n", "between 1 and"),
            ("version = 1\n[fetch]\nlatency = \"soon\"\n", "fetch.latency"),
            ("version = 1\n[ui]\nmin_card_width = 0\n", "must be positive"),
            ("version = 1\n[log]\nlevel = \"loud\"\n", "log.level"),
        ];
        for (content, expected) in cases {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("invalid config should fail");
            let message = format!("{error:#}");
            assert!(message.contains(expected), "{content}: {message}");
        }
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://evil.example/roster.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("ROSTER_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("ROSTER_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_storage_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("ROSTER_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("ROSTER_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_storage_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("ROSTER_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("ROSTER_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("fast").is_err());
        Ok(())
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        for section in ["[storage]", "[dataset]", "[fetch]", "[ui]", "[log]"] {
            assert!(example.contains(section), "missing {section}");
        }

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.page_size(), 100);
        assert_eq!(config.tui_options()?, roster_tui::TuiOptions::default());
        Ok(())
    }
}
