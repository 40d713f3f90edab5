//! Codebook file loading.
//!
//! Codebooks live in JSON files so a new model year can be dropped in without a
//! rebuild. Which file is used resolves as: explicit path > `CLAIMCHECK_CODEBOOK`
//! > `<config dir>/claimcheck/codebook.json` > built-in tables.
use super::{CodeBook, CodeBookConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a codebook file.
pub const CODEBOOK_ENV_VAR: &str = "CLAIMCHECK_CODEBOOK";

const USER_CODEBOOK_REL: &str = "claimcheck/codebook.json";

/// Where the active codebook comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeBookSource {
    Explicit(PathBuf),
    Env(PathBuf),
    UserConfig(PathBuf),
    BuiltIn,
}

impl CodeBookSource {
    /// Load the codebook this source points at.
    pub fn load(&self) -> Result<CodeBook> {
        match self {
            CodeBookSource::Explicit(path)
            | CodeBookSource::Env(path)
            | CodeBookSource::UserConfig(path) => load_codebook(path),
            CodeBookSource::BuiltIn => Ok(CodeBook::rxhcc_2026()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CodeBookSource::Explicit(path) => path.display().to_string(),
            CodeBookSource::Env(path) => format!("{} (from {CODEBOOK_ENV_VAR})", path.display()),
            CodeBookSource::UserConfig(path) => format!("{} (user config)", path.display()),
            CodeBookSource::BuiltIn => "built-in 2026 RxHCC tables".to_string(),
        }
    }
}

/// Resolve the codebook source with fallback: explicit arg > env var > user
/// config file > built-in tables.
pub fn resolve_codebook_path(explicit: Option<&Path>) -> CodeBookSource {
    if let Some(path) = explicit {
        return CodeBookSource::Explicit(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CODEBOOK_ENV_VAR).filter(|value| !value.is_empty()) {
        return CodeBookSource::Env(PathBuf::from(path));
    }
    if let Some(path) = dirs::config_dir()
        .map(|dir| dir.join(USER_CODEBOOK_REL))
        .filter(|path| path.is_file())
    {
        return CodeBookSource::UserConfig(path);
    }
    CodeBookSource::BuiltIn
}

/// Load and validate a codebook JSON file.
pub fn load_codebook(path: &Path) -> Result<CodeBook> {
    let bytes = fs::read(path).with_context(|| format!("read codebook {}", path.display()))?;
    let config: CodeBookConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse codebook JSON {}", path.display()))?;
    let codebook =
        CodeBook::new(config).with_context(|| format!("validate codebook {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        model_year = codebook.model_year().unwrap_or("unspecified"),
        "codebook loaded"
    );
    Ok(codebook)
}

/// Persist a codebook to disk in a stable JSON format.
pub fn write_codebook(path: &Path, codebook: &CodeBook) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(codebook).context("serialize codebook")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
