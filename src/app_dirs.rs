//! Filesystem locations for configuration and logs.
//!
//! Everything lives in one `.appraise` folder under the OS config root.
//! `APPRAISE_CONFIG_HOME` overrides the root for tests and portable installs.

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

/// Directory created under the OS config root.
pub const APP_DIR_NAME: &str = ".appraise";
/// Environment variable overriding the config root.
pub const CONFIG_HOME_ENV: &str = "APPRAISE_CONFIG_HOME";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("no base config directory available for application files")]
    NoBaseDir,
    #[error("failed to create application directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.appraise` root, created on first use.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = match std::env::var_os(CONFIG_HOME_ENV) {
        Some(path) => PathBuf::from(path),
        None => BaseDirs::new()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(AppDirError::NoBaseDir)?,
    };
    ensure_dir(base.join(APP_DIR_NAME))
}

/// Where per-launch log files go, created on first use.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("logs"))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
