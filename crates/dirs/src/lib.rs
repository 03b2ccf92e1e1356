use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirError {
    #[error("Directory not found: {0}")]
    DirNotFound(String),
}

pub type DirResult<T> = Result<T, DirError>;

/// Application name used to namespace directories.
pub static APP_NAME: &str = "llmmit";

/// File name of the config file inside the config directory.
pub static CONFIG_FILE_NAME: &str = "config.json";

/// Dotfile in the home directory read by earlier releases.
pub static LEGACY_RC_NAME: &str = ".llmmitrc";

/// Where a config file candidate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// `$XDG_CONFIG_HOME/llmmit/config.json` or `~/.config/llmmit/config.json`
    Xdg,
    /// `~/.llmmitrc`
    LegacyRc,
}

/// Resolves directories from a set of environment variables.
///
/// The lookup is injectable so resolution can be exercised without touching
/// the process environment.
pub struct Dirs<F>
where
    F: Fn(&str) -> Option<OsString>,
{
    lookup: F,
}

impl Dirs<fn(&str) -> Option<OsString>> {
    /// Resolve against the real process environment.
    pub fn from_env() -> Self {
        Dirs {
            lookup: |key| env::var_os(key),
        }
    }
}

impl<F> Dirs<F>
where
    F: Fn(&str) -> Option<OsString>,
{
    pub fn with_lookup(lookup: F) -> Self {
        Dirs { lookup }
    }

    fn var(&self, key: &str) -> Option<PathBuf> {
        (self.lookup)(key)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// The user's home directory from `HOME`, falling back to `USERPROFILE`.
    pub fn home_dir(&self) -> DirResult<PathBuf> {
        self.var("HOME")
            .or_else(|| self.var("USERPROFILE"))
            .ok_or_else(|| DirError::DirNotFound("home directory".to_string()))
    }

    /// Config directory, honoring `XDG_CONFIG_HOME`.
    pub fn config_dir(&self) -> DirResult<PathBuf> {
        if let Some(dir) = self.var("XDG_CONFIG_HOME") {
            Ok(dir.join(APP_NAME))
        } else {
            Ok(self.home_dir()?.join(".config").join(APP_NAME))
        }
    }

    pub fn config_file(&self) -> DirResult<PathBuf> {
        Ok(self.config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn legacy_rc_file(&self) -> DirResult<PathBuf> {
        Ok(self.home_dir()?.join(LEGACY_RC_NAME))
    }

    /// Config file locations in lookup order. Locations that cannot be
    /// resolved are left out; existence is not checked.
    pub fn config_candidates(&self) -> Vec<(ConfigSource, PathBuf)> {
        let mut out = Vec::with_capacity(2);
        if let Ok(path) = self.config_file() {
            out.push((ConfigSource::Xdg, path));
        }
        if let Ok(path) = self.legacy_rc_file() {
            out.push((ConfigSource::LegacyRc, path));
        }
        out
    }
}
