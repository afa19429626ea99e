use std::io::Write;

use clap::ValueEnum;

use crate::{
    admin::{
        ConfigType, CreateInstanceConfigRequest, FieldMask, InstanceAdmin, InstanceConfig,
        ListInstanceConfigOperationsRequest, OperationPager, PollPolicy,
        UpdateInstanceConfigRequest, wait_operation,
    },
    config::{Settings, UPDATED_LABEL},
    error::{AdminError, CommandError},
    filter,
    name::InstanceConfigName,
    output,
};

/// Mutable fields of a custom config; replica topology is fixed at creation.
pub const UPDATE_MASK_PATHS: [&str; 2] = ["display_name", "labels"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Command {
    #[value(name = "create_instance_config")]
    CreateInstanceConfig,
    #[value(name = "update_instance_config")]
    UpdateInstanceConfig,
    #[value(name = "delete_instance_config")]
    DeleteInstanceConfig,
    #[value(name = "list_instance_config_operations")]
    ListInstanceConfigOperations,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::CreateInstanceConfig => "create_instance_config",
            Command::UpdateInstanceConfig => "update_instance_config",
            Command::DeleteInstanceConfig => "delete_instance_config",
            Command::ListInstanceConfigOperations => "list_instance_config_operations",
        }
    }

    pub async fn execute(
        self,
        admin: &dyn InstanceAdmin,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<(), CommandError> {
        let poll = PollPolicy::default();
        match self {
            Command::CreateInstanceConfig => {
                create_instance_config(admin, settings, &poll, out).await
            }
            Command::UpdateInstanceConfig => {
                update_instance_config(admin, settings, &poll, out).await
            }
            Command::DeleteInstanceConfig => delete_instance_config(admin, settings, out).await,
            Command::ListInstanceConfigOperations => {
                list_instance_config_operations(admin, settings, out).await
            }
        }
    }
}

pub async fn get_instance_config(
    admin: &dyn InstanceAdmin,
    name: &InstanceConfigName,
) -> Result<InstanceConfig, AdminError> {
    admin.get_instance_config(&name.to_string()).await
}

/// Creates the custom config from the base config's full replica set.
pub async fn create_instance_config(
    admin: &dyn InstanceAdmin,
    settings: &Settings,
    poll: &PollPolicy,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let base_name = settings.base_config_name();
    let base = get_instance_config(admin, &base_name).await?;
    let custom_name = settings.custom_config_name();

    // The service rejects partial replica lists.
    let mut replicas = base.replicas;
    replicas.extend(base.optional_replicas);

    let request = CreateInstanceConfigRequest {
        parent: settings.project.to_string(),
        instance_config_id: settings.config_id.clone(),
        instance_config: InstanceConfig {
            name: custom_name.to_string(),
            display_name: settings.display_name.clone(),
            config_type: ConfigType::UserManaged,
            replicas,
            base_config: base_name.to_string(),
            labels: settings.labels.clone(),
            ..InstanceConfig::default()
        },
        validate_only: false,
    };
    tracing::info!(
        config = %custom_name,
        base = %base_name,
        replicas = request.instance_config.replicas.len(),
        "creating instance config"
    );

    let operation = admin.create_instance_config(request).await?;
    wait_operation(admin, operation, poll).await?;

    let config = get_instance_config(admin, &custom_name).await?;
    output::write_config(out, "Created", &config, settings.output)?;
    Ok(())
}

/// Changes display name and labels only.
pub async fn update_instance_config(
    admin: &dyn InstanceAdmin,
    settings: &Settings,
    poll: &PollPolicy,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let name = settings.custom_config_name();
    let mut config = get_instance_config(admin, &name).await?;
    config.display_name = settings.updated_display_name.clone();
    config
        .labels
        .insert(UPDATED_LABEL.0.to_string(), UPDATED_LABEL.1.to_string());

    tracing::info!(config = %name, "updating instance config");
    let operation = admin
        .update_instance_config(UpdateInstanceConfigRequest {
            instance_config: config,
            update_mask: FieldMask::new(UPDATE_MASK_PATHS),
            validate_only: false,
        })
        .await?;
    wait_operation(admin, operation, poll).await?;

    let updated = get_instance_config(admin, &name).await?;
    output::write_config(out, "Updated", &updated, settings.output)?;
    Ok(())
}

/// Fails while any instance still uses the config.
pub async fn delete_instance_config(
    admin: &dyn InstanceAdmin,
    settings: &Settings,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let name = settings.custom_config_name();
    tracing::info!(config = %name, "deleting instance config");
    admin.delete_instance_config(&name.to_string()).await?;
    output::write_deleted(out, &settings.config_id)?;
    Ok(())
}

pub async fn list_instance_config_operations(
    admin: &dyn InstanceAdmin,
    settings: &Settings,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let filter =
        filter::create_operations_for(&settings.config_id).map_err(AdminError::InvalidFilter)?;
    let mut pager = OperationPager::new(
        admin,
        ListInstanceConfigOperationsRequest {
            parent: settings.project.to_string(),
            filter,
            ..ListInstanceConfigOperationsRequest::default()
        },
    );

    let mut listed = 0usize;
    while let Some(operation) = pager.next().await? {
        output::write_operation_status(out, &operation.name, operation.done)?;
        listed += 1;
    }
    tracing::info!(listed, "listed instance config operations");
    Ok(())
}
