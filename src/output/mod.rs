use std::io::Write;

use serde::Serialize;

use crate::{admin::InstanceConfig, error::OutputError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

pub fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?.trim_end().to_string()),
    }
}

/// Writes `<verb> instance config [<dump>]`.
pub fn write_config(
    out: &mut dyn Write,
    verb: &str,
    config: &InstanceConfig,
    format: OutputFormat,
) -> Result<(), OutputError> {
    let dump = render(config, format)?;
    writeln!(out, "{verb} instance config [{dump}]")?;
    Ok(())
}

pub fn write_deleted(
    out: &mut dyn Write,
    config_id: &str,
) -> Result<(), OutputError> {
    writeln!(out, "Deleted instance config [{config_id}]")?;
    Ok(())
}

pub fn write_operation_status(
    out: &mut dyn Write,
    name: &str,
    done: bool,
) -> Result<(), OutputError> {
    writeln!(out, "Instance config operation for [{name}] has status [{done}]")?;
    Ok(())
}
