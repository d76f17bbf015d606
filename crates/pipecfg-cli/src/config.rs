// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pipecfg_app::{DEFAULT_PAGE_SIZE, PageSize};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8090";
const DEFAULT_TIMEOUT: &str = "5s";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Http,
}

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Http => "http",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "sqlite" => Some(Self::Sqlite),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub view: View,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: Backend::default(),
            storage: Storage::default(),
            http: Http::default(),
            view: View::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Backend {
    pub kind: Option<String>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            kind: Some(BackendKind::Sqlite.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

/// `page_size` is either a row count or the word `all`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PageSizeSetting {
    Rows(i64),
    Word(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct View {
    pub page_size: Option<PageSizeSetting>,
}

impl Default for View {
    fn default() -> Self {
        Self {
            page_size: Some(PageSizeSetting::Rows(DEFAULT_PAGE_SIZE as i64)),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PIPECFG_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PIPECFG_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(pipecfg_store::APP_NAME);
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
                    "config file {} is not versioned. Add `version = 1` and place values under [backend], [storage], [http], and [view]",
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
        if let Some(kind) = &self.backend.kind
            && BackendKind::parse(kind).is_none()
        {
            bail!(
                "backend.kind in {} must be \"sqlite\" or \"http\", got {kind:?}",
                path.display()
            );
        }

        if let Some(db_path) = &self.storage.db_path {
            pipecfg_store::validate_db_path(db_path)?;
        }

        if let Some(base_url) = &self.http.base_url
            && base_url.trim().is_empty()
        {
            bail!("http.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.http.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "http.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        self.page_size()
            .with_context(|| format!("invalid view.page_size in {}", path.display()))?;
        Ok(())
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend
            .kind
            .as_deref()
            .and_then(BackendKind::parse)
            .unwrap_or(BackendKind::Sqlite)
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => pipecfg_store::default_db_path(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.http
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.http.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn page_size(&self) -> Result<PageSize> {
        match &self.view.page_size {
            None => Ok(PageSize::Rows(DEFAULT_PAGE_SIZE)),
            Some(PageSizeSetting::Rows(rows)) if *rows > 0 => Ok(PageSize::Rows(*rows as usize)),
            Some(PageSizeSetting::Rows(rows)) => {
                bail!("page_size must be positive, got {rows}")
            }
            Some(PageSizeSetting::Word(word)) => match PageSize::parse(word)? {
                PageSize::Rows(0) => bail!("page_size must be positive, got 0"),
                size => Ok(size),
            },
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# pipecfg config\n# Place this file at: {}\n\nversion = 1\n\n[backend]\n# \"sqlite\" keeps configuration in a local database; \"http\" talks to a running collector.\nkind = \"sqlite\"\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/pipecfg/pipecfg.db)\n# db_path = \"/absolute/path/to/pipecfg.db\"\n\n[http]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[view]\n# Rows per page, or \"all\".\npage_size = {}\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, Config, parse_duration};
    use anyhow::Result;
    use pipecfg_app::PageSize;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

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
        assert_eq!(config.backend_kind(), BackendKind::Sqlite);
        assert_eq!(config.page_size()?, PageSize::Rows(10));
        assert_eq!(config.timeout()?, Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[http]\nbase_url=\"http://collector:8090\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"), "{message}");
        assert!(message.contains("[backend], [storage], [http], and [view]"), "{message}");
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[backend]\nkind = \"http\"\n[http]\nbase_url = \"http://collector:8090//\"\ntimeout = \"750ms\"\n[view]\npage_size = \"all\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.backend_kind(), BackendKind::Http);
        assert_eq!(config.base_url(), "http://collector:8090");
        assert_eq!(config.timeout()?, Duration::from_millis(750));
        assert_eq!(config.page_size()?, PageSize::All);
        Ok(())
    }

    #[test]
    fn integer_page_size_parses() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[view]\npage_size = 25\n")?;
        assert_eq!(Config::load(&path)?.page_size()?, PageSize::Rows(25));
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
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn unknown_backend_kind_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[backend]\nkind = \"etcd\"\n")?;
        let error = Config::load(&path).expect_err("unknown backend should fail");
        assert!(error.to_string().contains("backend.kind"));
        Ok(())
    }

    #[test]
    fn non_positive_page_sizes_are_rejected() -> Result<()> {
        for value in ["0", "-3", "\"0\"", "\"lots\""] {
            let (_temp, path) = write_config(&format!("version = 1\n[view]\npage_size = {value}\n"))?;
            let error = Config::load(&path).expect_err("bad page size should fail");
            assert!(
                format!("{error:#}").contains("page_size"),
                "value {value}: {error:#}"
            );
        }
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PIPECFG_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PIPECFG_CONFIG_PATH");
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
            std::env::set_var("PIPECFG_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PIPECFG_DB_PATH");
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_storage_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PIPECFG_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PIPECFG_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://evil.example/pipecfg.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[http]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.backend_kind(), BackendKind::Sqlite);
        assert_eq!(config.page_size()?, PageSize::Rows(10));
        Ok(())
    }
}
