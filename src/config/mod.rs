use std::{collections::BTreeMap, time::Duration};

use crate::{
    admin::Endpoint,
    name::{self, CUSTOM_CONFIG_PREFIX, InstanceConfigName, ProjectName},
    output::OutputFormat,
};

pub const DEFAULT_PROJECT: &str = "my-project";
pub const DEFAULT_BASE_CONFIG: &str = "base-config-with-optional-replicas";
pub const DEFAULT_CONFIG_ID: &str = "custom-quickstart-rust";
pub const DEFAULT_DISPLAY_NAME: &str = "Custom quickstart rust";
pub const DEFAULT_UPDATED_DISPLAY_NAME: &str = "Updated custom quickstart rust";
pub const DEFAULT_LABEL: (&str, &str) = ("cmmr_phase2_quickstart_rust", "true");
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Label the update command adds on top of the existing set.
pub const UPDATED_LABEL: (&str, &str) = ("updated", "true");

/// Everything one invocation needs; built once from flags and environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub project: ProjectName,
    pub base_config: String,
    pub config_id: String,
    pub display_name: String,
    pub updated_display_name: String,
    pub labels: BTreeMap<String, String>,
    pub endpoint: Endpoint,
    pub timeout: Duration,
    pub output: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project: ProjectName {
                project: DEFAULT_PROJECT.to_string(),
            },
            base_config: DEFAULT_BASE_CONFIG.to_string(),
            config_id: DEFAULT_CONFIG_ID.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            updated_display_name: DEFAULT_UPDATED_DISPLAY_NAME.to_string(),
            labels: BTreeMap::from([(DEFAULT_LABEL.0.to_string(), DEFAULT_LABEL.1.to_string())]),
            endpoint: Endpoint::resolve(None),
            timeout: DEFAULT_TIMEOUT,
            output: OutputFormat::Json,
        }
    }
}

impl Settings {
    pub fn base_config_name(&self) -> InstanceConfigName {
        self.project.instance_config(&self.base_config)
    }

    pub fn custom_config_name(&self) -> InstanceConfigName {
        self.project.instance_config(&self.config_id)
    }

    /// Local checks that save a round trip; the service enforces them too.
    pub fn validate(&self) -> Result<(), String> {
        if !name::is_valid_config_id(&self.base_config) {
            return Err(format!("invalid base config id '{}'", self.base_config));
        }
        if !name::is_valid_config_id(&self.config_id) {
            return Err(format!("invalid config id '{}'", self.config_id));
        }
        if !self.custom_config_name().is_custom() {
            return Err(format!(
                "custom config id '{}' must start with '{CUSTOM_CONFIG_PREFIX}'",
                self.config_id
            ));
        }
        Ok(())
    }
}

/// Parses a `KEY=VALUE` label argument.
pub fn parse_label(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("label '{raw}' must look like KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("label '{raw}' has an empty key"));
    }
    if !key
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-'))
    {
        return Err(format!(
            "label key '{key}' may only contain lowercase letters, digits, '_' and '-'"
        ));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
