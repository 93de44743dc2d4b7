//! Easy buttons: named shortcuts that pre-fill the transaction form.
//!
//! Stored as a YAML mapping of button name to `{source, dest, descrip, emoji}`.
//! Every write validates the whole mapping first, so a malformed file is never
//! produced by the application itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

const TMP_SUFFIX: &str = ".tmp";

/// One shortcut. `source` is the debit account, `dest` the credit account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EasyButton {
    pub source: String,
    pub dest: String,
    pub descrip: String,
    pub emoji: String,
}

/// Buttons keyed by display name
pub type EasyButtons = BTreeMap<String, EasyButton>;

/// Check that every name and field is a non-empty string
pub fn validate_easy_buttons(buttons: &EasyButtons) -> ConfigResult<()> {
    for (name, button) in buttons {
        if name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "easy button name must not be empty".to_string(),
            });
        }
        let fields = [
            ("source", &button.source),
            ("dest", &button.dest),
            ("descrip", &button.descrip),
            ("emoji", &button.emoji),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("easy button '{}': {} must not be empty", name, field),
                });
            }
        }
    }
    Ok(())
}

/// Parse and validate easy-button YAML. An empty document means no buttons.
pub fn parse_easy_buttons(content: &str) -> ConfigResult<EasyButtons> {
    if content.trim().is_empty() {
        return Ok(EasyButtons::new());
    }
    let buttons: Option<EasyButtons> = serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
        message: e.to_string(),
    })?;
    let buttons = buttons.unwrap_or_default();
    validate_easy_buttons(&buttons)?;
    Ok(buttons)
}

/// File-backed easy-button store
#[derive(Debug, Clone)]
pub struct EasyButtonStore {
    path: PathBuf,
}

impl EasyButtonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file. A missing file is `FileNotFound`, callers decide whether that is an error.
    pub async fn load(&self) -> ConfigResult<EasyButtons> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::from_io(e, &self.path))?;
        parse_easy_buttons(&content)
    }

    async fn load_or_empty(&self) -> ConfigResult<EasyButtons> {
        match self.load().await {
            Err(ConfigError::FileNotFound { .. }) => Ok(EasyButtons::new()),
            other => other,
        }
    }

    /// Validate and write the full mapping, replacing the file atomically
    pub async fn save(&self, buttons: &EasyButtons) -> ConfigResult<()> {
        validate_easy_buttons(buttons)?;
        let yaml = serde_yaml::to_string(buttons).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::from_io(e, parent))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, yaml)
            .await
            .map_err(|e| ConfigError::from_io(e, &tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ConfigError::from_io(e, &self.path))
    }

    /// Add or replace a button and persist. Returns the new mapping.
    pub async fn add(&self, name: &str, button: EasyButton) -> ConfigResult<EasyButtons> {
        let mut buttons = self.load_or_empty().await?;
        buttons.insert(name.trim().to_string(), button);
        self.save(&buttons).await?;
        Ok(buttons)
    }

    /// Remove a button by name and persist. Returns the new mapping.
    pub async fn remove(&self, name: &str) -> ConfigResult<EasyButtons> {
        let mut buttons = self.load_or_empty().await?;
        if buttons.remove(name).is_none() {
            return Err(ConfigError::EntryNotFound {
                name: name.to_string(),
            });
        }
        self.save(&buttons).await?;
        Ok(buttons)
    }
}
