//! Runtime settings: `testmate.toml`, then `TESTMATE_*` variables, then flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use testmate_core::model::ProfileName;

pub const CONFIG_FILE: &str = "testmate.toml";
pub const DEFAULT_DB_URL: &str = "sqlite:testmate.sqlite3";
pub const DEFAULT_BANK_DIR: &str = "bank";
pub const DEFAULT_LOG_FILTER: &str = "testmate=info,services=info,storage=info,app=info";

const MEMORY_URL: &str = "sqlite::memory:";

/// Contents of `testmate.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub bank_dir: Option<PathBuf>,
    pub profile: Option<String>,
    pub log_filter: Option<String>,
}

impl FileConfig {
    /// Reads `path`, or `testmate.toml` in the working directory when no
    /// path is given. A missing default file yields an empty config.
    ///
    /// # Errors
    ///
    /// Fails when an explicit file is missing or any file does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) if p.exists() => p.to_path_buf(),
            Some(p) => bail!("config file not found: {}", p.display()),
            None => {
                let local = PathBuf::from(CONFIG_FILE);
                if !local.exists() {
                    return Ok(Self::default());
                }
                local
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }
}

/// Values supplied by the environment or on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub bank_dir: Option<PathBuf>,
    pub profile: Option<String>,
}

impl Overrides {
    /// Reads `TESTMATE_DB_URL`, `TESTMATE_BANK_DIR` and `TESTMATE_PROFILE`.
    /// Blank variables are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            database_url: var("TESTMATE_DB_URL"),
            bank_dir: var("TESTMATE_BANK_DIR").map(PathBuf::from),
            profile: var("TESTMATE_PROFILE"),
        }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Normalised `sqlite://` URL.
    pub database_url: String,
    pub bank_dir: PathBuf,
    pub profile: ProfileName,
    pub log_filter: String,
}

impl Settings {
    /// Later sources win: file, then environment, then flags.
    ///
    /// # Errors
    ///
    /// Fails on a blank database URL or a blank profile name.
    pub fn resolve(file: FileConfig, env: Overrides, flags: Overrides) -> Result<Self> {
        let raw_url = flags
            .database_url
            .or(env.database_url)
            .or(file.database_url)
            .unwrap_or_else(|| DEFAULT_DB_URL.to_owned());
        if raw_url.trim().is_empty() {
            bail!("invalid database url: {raw_url:?}");
        }

        let profile = match flags.profile.or(env.profile).or(file.profile) {
            Some(raw) => ProfileName::new(raw.as_str())
                .with_context(|| format!("invalid profile name: {raw:?}"))?,
            None => ProfileName::default(),
        };

        Ok(Self {
            database_url: normalize_sqlite_url(raw_url),
            bank_dir: flags
                .bank_dir
                .or(env.bank_dir)
                .or(file.bank_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BANK_DIR)),
            profile,
            log_filter: file
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()),
        })
    }
}

/// Turns a bare path or a relative `sqlite:` URL into an absolute
/// `sqlite://` URL. In-memory and already absolute URLs pass through.
#[must_use]
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == MEMORY_URL || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file and its parent directories when missing.
///
/// # Errors
///
/// Fails on a URL that is not `sqlite://<path>` or when the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == MEMORY_URL {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to create database file {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn flags(db: Option<&str>, profile: Option<&str>) -> Overrides {
        Overrides {
            database_url: db.map(str::to_owned),
            bank_dir: None,
            profile: profile.map(str::to_owned),
        }
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let settings =
            Settings::resolve(FileConfig::default(), Overrides::default(), Overrides::default())
                .unwrap();
        assert!(settings.database_url.starts_with("sqlite:///"));
        assert!(settings.database_url.ends_with("testmate.sqlite3"));
        assert_eq!(settings.bank_dir, PathBuf::from(DEFAULT_BANK_DIR));
        assert_eq!(settings.profile, ProfileName::default());
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn flags_beat_environment_and_environment_beats_file() {
        let file = FileConfig {
            database_url: Some("sqlite:///from/file.db".into()),
            bank_dir: Some("file-bank".into()),
            profile: Some("file".into()),
            log_filter: Some("debug".into()),
        };
        let env = Overrides {
            database_url: Some("sqlite:///from/env.db".into()),
            bank_dir: Some("env-bank".into()),
            profile: None,
        };
        let settings = Settings::resolve(file, env, flags(None, Some("cli"))).unwrap();
        assert_eq!(settings.database_url, "sqlite:///from/env.db");
        assert_eq!(settings.bank_dir, PathBuf::from("env-bank"));
        assert_eq!(settings.profile.as_str(), "cli");
        assert_eq!(settings.log_filter, "debug");
    }

    #[test]
    fn blank_values_are_rejected() {
        let empty_url = Settings::resolve(
            FileConfig::default(),
            Overrides::default(),
            flags(Some("  "), None),
        );
        assert!(empty_url.is_err());

        let empty_profile = Settings::resolve(
            FileConfig::default(),
            Overrides::default(),
            flags(None, Some(" ")),
        );
        assert!(empty_profile.is_err());
    }

    #[test]
    fn file_config_parses_known_keys_and_rejects_others() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("testmate.toml");
        std::fs::write(
            &path,
            "database_url = \"sqlite:data/app.db\"\nprofile = \"alice\"\n",
        )
        .unwrap();
        let file = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(file.database_url.as_deref(), Some("sqlite:data/app.db"));
        assert_eq!(file.profile.as_deref(), Some("alice"));
        assert_eq!(file.bank_dir, None);

        std::fs::write(&path, "databse_url = \"typo\"\n").unwrap();
        assert!(FileConfig::load(Some(&path)).is_err());
        assert!(FileConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(normalize_sqlite_url(MEMORY_URL.into()), MEMORY_URL);
        assert_eq!(
            normalize_sqlite_url("sqlite:///var/db/app.db".into()),
            "sqlite:///var/db/app.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/a.db".into()), "sqlite:///tmp/a.db");

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            normalize_sqlite_url("sqlite:data/app.db".into()),
            format!("sqlite://{}", cwd.join("data/app.db").display())
        );
    }

    #[test]
    fn prepare_creates_missing_file_and_parents() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nested/dir/app.db");
        let url = format!("sqlite://{}?mode=rwc", db.display());

        prepare_sqlite_file(&url).unwrap();
        assert!(db.exists());
        // Existing files are left alone.
        prepare_sqlite_file(&url).unwrap();

        assert!(prepare_sqlite_file(MEMORY_URL).is_ok());
        assert!(prepare_sqlite_file("postgres://db").is_err());
        assert!(prepare_sqlite_file("sqlite://").is_err());
    }
}
