//! Typed session document shared by every CLI invocation.
//!
//! # Design
//! - Targets are keyed by name in a sorted map so serialization is stable.
//! - Unknown keys at either level are captured in `extra` and written back.
//! - A `current` name without a matching record reads as "nothing selected".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{SessionError, SessionResult};

/// A named remote endpoint together with its trust and auth settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Target name. Persisted as the map key, never as a field.
    #[serde(skip)]
    pub name: String,
    /// Base URL of the remote service.
    pub address: String,
    /// Opaque auth token issued by the remote; empty when not logged in.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Skip TLS certificate validation for this target only.
    #[serde(default)]
    pub skip_verify: bool,
    /// Keys written by newer clients that this version does not understand.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TargetRecord {
    /// Create a record without a token.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>, skip_verify: bool) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            token: String::new(),
            skip_verify,
            extra: BTreeMap::new(),
        }
    }
}

/// All known targets plus the name of the selected one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<String>,
    #[serde(default)]
    targets: BTreeMap<String, TargetRecord>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl SessionConfig {
    /// Parse a session document, restoring each record's name from its key.
    /// Blank and null documents are an empty session.
    ///
    /// # Errors
    ///
    /// Returns the YAML error when `contents` is not a session document.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let document: Value = serde_yaml::from_str(contents)?;
        if document.is_null() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_yaml::from_value(document)?;
        for (name, record) in &mut config.targets {
            record.name.clone_from(name);
        }
        Ok(config)
    }

    /// Render the session document.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Name of the selected target as persisted, dangling or not.
    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The selected target, or `None` when unset or dangling.
    #[must_use]
    pub fn current_target(&self) -> Option<&TargetRecord> {
        self.current
            .as_deref()
            .and_then(|name| self.targets.get(name))
    }

    /// Look up a target by name.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&TargetRecord> {
        self.targets.get(name)
    }

    /// Iterate targets in name order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetRecord> {
        self.targets.values()
    }

    /// Whether `name` is the selected target.
    #[must_use]
    pub fn is_current(&self, name: &str) -> bool {
        self.current_target()
            .is_some_and(|record| record.name == name)
    }

    /// Create or update a target and select it.
    ///
    /// Changing the address of an existing target drops its token; toggling
    /// only `skip_verify` keeps it.
    pub fn set_target(&mut self, name: &str, address: &str, skip_verify: bool) {
        self.targets
            .entry(name.to_string())
            .and_modify(|record| {
                if record.address != address {
                    tracing::debug!(target_name = name, "address changed; clearing token");
                    record.address = address.to_string();
                    record.token.clear();
                }
                record.skip_verify = skip_verify;
            })
            .or_insert_with(|| TargetRecord::new(name, address, skip_verify));
        self.current = Some(name.to_string());
    }

    /// Select an existing target.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownTarget`] if no target has this name.
    pub fn select_target(&mut self, name: &str) -> SessionResult<()> {
        if !self.targets.contains_key(name) {
            return Err(SessionError::UnknownTarget {
                name: name.to_string(),
            });
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Forget a target. Missing names are a no-op.
    pub fn delete_target(&mut self, name: &str) {
        if self.targets.remove(name).is_none() {
            return;
        }
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
    }

    /// Store the token issued for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownTarget`] if no target has this name.
    pub fn set_token(&mut self, name: &str, token: impl Into<String>) -> SessionResult<()> {
        let record = self
            .targets
            .get_mut(name)
            .ok_or_else(|| SessionError::UnknownTarget {
                name: name.to_string(),
            })?;
        record.token = token.into();
        Ok(())
    }
}
