mod auth;
mod lro;
#[cfg(test)]
pub(crate) mod memory;
mod model;
mod pager;
mod rest;

use std::{future::Future, time::Duration};

use tokio::time::Instant;

use crate::error::AdminError;

pub use lro::{PollPolicy, wait_operation};
pub use model::{
    Code, ConfigState, ConfigType, CreateInstanceConfigRequest, FieldMask, InstanceConfig,
    ListInstanceConfigOperationsRequest, ListInstanceConfigOperationsResponse, Operation,
    ReplicaInfo, ReplicaType, Status, UpdateInstanceConfigRequest,
};
pub use pager::OperationPager;
pub use rest::{Endpoint, RestInstanceAdmin};

pub type AdminResult<T> = Result<T, AdminError>;

/// Instance-configuration surface of the Spanner instance admin API.
#[async_trait::async_trait]
pub trait InstanceAdmin: Send + Sync {
    async fn get_instance_config(
        &self,
        name: &str,
    ) -> AdminResult<InstanceConfig>;

    async fn create_instance_config(
        &self,
        request: CreateInstanceConfigRequest,
    ) -> AdminResult<Operation>;

    async fn update_instance_config(
        &self,
        request: UpdateInstanceConfigRequest,
    ) -> AdminResult<Operation>;

    async fn delete_instance_config(
        &self,
        name: &str,
    ) -> AdminResult<()>;

    async fn get_operation(
        &self,
        name: &str,
    ) -> AdminResult<Operation>;

    /// Fetches a single page; use [`OperationPager`] to drain all of them.
    async fn list_instance_config_operations(
        &self,
        request: &ListInstanceConfigOperationsRequest,
    ) -> AdminResult<ListInstanceConfigOperationsResponse>;

    fn deadline(&self) -> Option<Deadline> {
        None
    }
}

/// Upper bound for a deadline; longer timeouts are clamped to it.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Absolute deadline shared by every remote call of one invocation.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(timeout.min(MAX_TIMEOUT))
            .unwrap_or(now);
        Self { at }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub async fn bound<T, F>(
        &self,
        call: &'static str,
        future: F,
    ) -> AdminResult<T>
    where
        F: Future<Output = AdminResult<T>>,
    {
        match tokio::time::timeout_at(self.at, future).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(call, "deadline exceeded");
                Err(AdminError::DeadlineExceeded { call })
            }
        }
    }
}
