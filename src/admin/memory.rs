//! In-memory instance admin used by unit tests.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use serde_json::{Value, json};

use crate::error::AdminError;

use super::{
    AdminResult, Code, ConfigState, ConfigType, CreateInstanceConfigRequest, InstanceAdmin,
    InstanceConfig, ListInstanceConfigOperationsRequest, ListInstanceConfigOperationsResponse,
    Operation, Status, UpdateInstanceConfigRequest,
};

const METADATA_PREFIX: &str = "type.googleapis.com/google.spanner.admin.instance.v1.";

struct StoredOperation {
    operation: Operation,
    remaining_polls: usize,
}

impl StoredOperation {
    fn snapshot(&self) -> Operation {
        let done = self.remaining_polls == 0;
        Operation {
            done,
            error: if done {
                self.operation.error.clone()
            } else {
                None
            },
            ..self.operation.clone()
        }
    }
}

#[derive(Default)]
struct State {
    configs: BTreeMap<String, InstanceConfig>,
    in_use: BTreeSet<String>,
    operations: Vec<StoredOperation>,
    calls: Vec<&'static str>,
    fail_next: BTreeMap<&'static str, Status>,
    next_outcome: Option<(usize, Option<Status>)>,
}

pub struct MemoryInstanceAdmin {
    state: Mutex<State>,
    page_size: usize,
    stuck_page_token: Option<String>,
}

impl MemoryInstanceAdmin {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 50,
            stuck_page_token: None,
        }
    }

    pub fn with_page_size(
        mut self,
        page_size: usize,
    ) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_stuck_page_token(
        mut self,
        token: &str,
    ) -> Self {
        self.stuck_page_token = Some(token.to_string());
        self
    }

    pub fn insert_config(
        &self,
        config: InstanceConfig,
    ) {
        let mut state = self.lock();
        state.configs.insert(config.name.clone(), config);
    }

    pub fn config(
        &self,
        name: &str,
    ) -> Option<InstanceConfig> {
        self.lock().configs.get(name).cloned()
    }

    /// Marks a config as referenced by a running instance.
    pub fn mark_in_use(
        &self,
        name: &str,
    ) {
        self.lock().in_use.insert(name.to_string());
    }

    pub fn fail_next(
        &self,
        call: &'static str,
        status: Status,
    ) {
        self.lock().fail_next.insert(call, status);
    }

    /// Shapes the next long-running operation a mutation returns: how many
    /// polls it stays pending and the error it finally carries.
    pub fn next_operation_outcome(
        &self,
        pending_polls: usize,
        error: Option<Status>,
    ) {
        self.lock().next_outcome = Some((pending_polls, error));
    }

    pub fn insert_operation(
        &self,
        name: &str,
        pending_polls: usize,
        error: Option<Status>,
    ) -> Operation {
        let stored = StoredOperation {
            operation: Operation {
                name: name.to_string(),
                done: true,
                error,
                ..Operation::default()
            },
            remaining_polls: pending_polls,
        };
        let snapshot = stored.snapshot();
        self.lock().operations.push(stored);
        snapshot
    }

    pub fn calls(
        &self,
        call: &str,
    ) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|recorded| **recorded == call)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory admin state poisoned")
    }

    fn begin(
        &self,
        call: &'static str,
    ) -> AdminResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.fail_next.remove(call) {
            Some(status) => Err(AdminError::Api(status)),
            None => Ok(state),
        }
    }
}

fn record_operation(
    state: &mut State,
    config_name: &str,
    metadata_type: &str,
    (pending_polls, error): (usize, Option<Status>),
) -> Operation {
    let stored = StoredOperation {
        operation: Operation {
            name: format!("{config_name}/operations/{}", state.operations.len()),
            metadata: Some(json!({
                "@type": format!("{METADATA_PREFIX}{metadata_type}"),
                "instanceConfig": { "name": config_name },
            })),
            done: true,
            error,
            ..Operation::default()
        },
        remaining_polls: pending_polls,
    };
    let snapshot = stored.snapshot();
    state.operations.push(stored);
    snapshot
}

fn not_found(name: &str) -> AdminError {
    AdminError::Api(Status::new(
        Code::NotFound,
        format!("Instance config {name} not found"),
    ))
}

fn invalid(message: impl Into<String>) -> AdminError {
    AdminError::Api(Status::new(Code::InvalidArgument, message))
}

#[async_trait::async_trait]
impl InstanceAdmin for MemoryInstanceAdmin {
    async fn get_instance_config(
        &self,
        name: &str,
    ) -> AdminResult<InstanceConfig> {
        let state = self.begin("GetInstanceConfig")?;
        state.configs.get(name).cloned().ok_or_else(|| not_found(name))
    }

    async fn create_instance_config(
        &self,
        request: CreateInstanceConfigRequest,
    ) -> AdminResult<Operation> {
        let mut state = self.begin("CreateInstanceConfig")?;
        if !request.instance_config_id.starts_with("custom-") {
            return Err(invalid("custom instance config ids must start with custom-"));
        }
        let name = format!(
            "{}/instanceConfigs/{}",
            request.parent, request.instance_config_id
        );
        if state.configs.contains_key(&name) {
            return Err(AdminError::Api(Status::new(
                Code::AlreadyExists,
                format!("Instance config {name} already exists"),
            )));
        }
        let base = state
            .configs
            .get(&request.instance_config.base_config)
            .cloned()
            .ok_or_else(|| not_found(&request.instance_config.base_config))?;
        let replicas = &request.instance_config.replicas;
        if base.replicas.iter().any(|replica| !replicas.contains(replica)) {
            return Err(invalid("replicas must include every base config replica"));
        }

        let outcome = state.next_outcome.take().unwrap_or_default();
        let config = InstanceConfig {
            name: name.clone(),
            config_type: ConfigType::UserManaged,
            state: ConfigState::Ready,
            etag: "etag-1".to_string(),
            leader_options: base.leader_options.clone(),
            ..request.instance_config
        };
        // A failed operation leaves nothing behind.
        if outcome.1.is_none() {
            state.configs.insert(name.clone(), config);
        }
        Ok(record_operation(
            &mut state,
            &name,
            "CreateInstanceConfigMetadata",
            outcome,
        ))
    }

    async fn update_instance_config(
        &self,
        request: UpdateInstanceConfigRequest,
    ) -> AdminResult<Operation> {
        let mut state = self.begin("UpdateInstanceConfig")?;
        if let Some(path) = request
            .update_mask
            .paths
            .iter()
            .find(|path| !matches!(path.as_str(), "display_name" | "labels"))
        {
            return Err(invalid(format!("field {path} cannot be updated")));
        }

        let name = request.instance_config.name.clone();
        let outcome = state.next_outcome.take().unwrap_or_default();
        let stored = state
            .configs
            .get_mut(&name)
            .ok_or_else(|| not_found(&name))?;
        if request.update_mask.contains("display_name") {
            stored.display_name = request.instance_config.display_name;
        }
        if request.update_mask.contains("labels") {
            stored.labels = request.instance_config.labels;
        }
        stored.etag = format!("{}+", stored.etag);
        Ok(record_operation(
            &mut state,
            &name,
            "UpdateInstanceConfigMetadata",
            outcome,
        ))
    }

    async fn delete_instance_config(
        &self,
        name: &str,
    ) -> AdminResult<()> {
        let mut state = self.begin("DeleteInstanceConfig")?;
        if !state.configs.contains_key(name) {
            return Err(not_found(name));
        }
        if state.in_use.contains(name) {
            return Err(AdminError::Api(Status::new(
                Code::FailedPrecondition,
                format!("Instance config {name} is in use by an instance"),
            )));
        }
        state.configs.remove(name);
        Ok(())
    }

    async fn get_operation(
        &self,
        name: &str,
    ) -> AdminResult<Operation> {
        let mut state = self.begin("GetOperation")?;
        let stored = state
            .operations
            .iter_mut()
            .find(|stored| stored.operation.name == name)
            .ok_or_else(|| AdminError::Api(Status::new(Code::NotFound, "operation not found")))?;
        stored.remaining_polls = stored.remaining_polls.saturating_sub(1);
        Ok(stored.snapshot())
    }

    async fn list_instance_config_operations(
        &self,
        request: &ListInstanceConfigOperationsRequest,
    ) -> AdminResult<ListInstanceConfigOperationsResponse> {
        let state = self.begin("ListInstanceConfigOperations")?;
        let matching: Vec<Operation> = state
            .operations
            .iter()
            .map(StoredOperation::snapshot)
            .filter(|operation| matches_filter(operation, &request.filter))
            .collect();

        let offset = request
            .page_token
            .as_deref()
            .and_then(|token| token.strip_prefix("page-"))
            .and_then(|offset| offset.parse::<usize>().ok())
            .unwrap_or(0);
        let end = (offset + self.page_size).min(matching.len());
        let operations = matching.get(offset..end).unwrap_or_default().to_vec();

        let next_page_token = match &self.stuck_page_token {
            Some(token) => token.clone(),
            None if end < matching.len() => format!("page-{end}"),
            None => String::new(),
        };

        Ok(ListInstanceConfigOperationsResponse {
            operations,
            next_page_token,
        })
    }
}

/// Evaluates `(path=value) AND (path:value)` filters against an operation.
fn matches_filter(
    operation: &Operation,
    filter: &str,
) -> bool {
    filter
        .split(" AND ")
        .map(|clause| clause.trim().trim_start_matches('(').trim_end_matches(')'))
        .filter(|clause| !clause.is_empty())
        .all(|clause| {
            let (path, expected, has) = match clause.split_once(':') {
                Some((path, value)) if !path.contains('=') => (path, value, true),
                _ => match clause.split_once('=') {
                    Some((path, value)) => (path, value, false),
                    None => return false,
                },
            };
            match field_value(operation, path.trim()) {
                Some(actual) if has => actual.contains(expected.trim()),
                Some(actual) => actual == expected.trim(),
                None => false,
            }
        })
}

fn field_value(
    operation: &Operation,
    path: &str,
) -> Option<String> {
    if path == "done" {
        return Some(operation.done.to_string());
    }
    if path == "name" {
        return Some(operation.name.clone());
    }

    let mut node = operation.metadata.as_ref()?;
    let rest = path.strip_prefix("metadata.")?;
    for segment in rest.split('.') {
        node = node.get(segment).or_else(|| node.get(camel(segment)))?;
    }
    match node {
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn camel(segment: &str) -> String {
    let mut parts = segment.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
