use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replicas: Vec<ReplicaInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_replicas: Vec<ReplicaInfo>,
    #[serde(default)]
    pub config_type: ConfigType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_config: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leader_options: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reconciling: bool,
    #[serde(default)]
    pub state: ConfigState,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaInfo {
    pub location: String,
    #[serde(default, rename = "type")]
    pub replica_type: ReplicaType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default_leader_location: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicaType {
    #[default]
    TypeUnspecified,
    ReadWrite,
    ReadOnly,
    Witness,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigType {
    #[default]
    TypeUnspecified,
    GoogleManaged,
    UserManaged,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigState {
    #[default]
    StateUnspecified,
    Creating,
    Ready,
}

/// Canonical error codes shared by the REST envelope and operation errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

const CODES: [(Code, &str); 17] = [
    (Code::Ok, "OK"),
    (Code::Cancelled, "CANCELLED"),
    (Code::Unknown, "UNKNOWN"),
    (Code::InvalidArgument, "INVALID_ARGUMENT"),
    (Code::DeadlineExceeded, "DEADLINE_EXCEEDED"),
    (Code::NotFound, "NOT_FOUND"),
    (Code::AlreadyExists, "ALREADY_EXISTS"),
    (Code::PermissionDenied, "PERMISSION_DENIED"),
    (Code::ResourceExhausted, "RESOURCE_EXHAUSTED"),
    (Code::FailedPrecondition, "FAILED_PRECONDITION"),
    (Code::Aborted, "ABORTED"),
    (Code::OutOfRange, "OUT_OF_RANGE"),
    (Code::Unimplemented, "UNIMPLEMENTED"),
    (Code::Internal, "INTERNAL"),
    (Code::Unavailable, "UNAVAILABLE"),
    (Code::DataLoss, "DATA_LOSS"),
    (Code::Unauthenticated, "UNAUTHENTICATED"),
];

impl Code {
    /// Numeric code as carried by `google.rpc.Status`.
    pub fn from_i32(value: i32) -> Self {
        usize::try_from(value)
            .ok()
            .and_then(|index| CODES.get(index))
            .map_or(Code::Unknown, |(code, _)| *code)
    }

    pub fn as_i32(self) -> i32 {
        CODES
            .iter()
            .position(|(code, _)| *code == self)
            .map_or(2, |index| index as i32)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CODES
            .iter()
            .find(|(_, text)| text.eq_ignore_ascii_case(name))
            .map(|(code, _)| *code)
    }

    /// Fallback when an HTTP error carries no canonical status name.
    pub fn from_http(status: u16) -> Self {
        match status {
            400 => Code::InvalidArgument,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::NotFound,
            409 => Code::AlreadyExists,
            412 => Code::FailedPrecondition,
            429 => Code::ResourceExhausted,
            499 => Code::Cancelled,
            501 => Code::Unimplemented,
            503 => Code::Unavailable,
            504 => Code::DeadlineExceeded,
            500..=599 => Code::Internal,
            _ => Code::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        CODES
            .iter()
            .find(|(code, _)| *code == self)
            .map_or("UNKNOWN", |(_, text)| text)
    }
}

impl std::fmt::Display for Code {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "RpcStatus")]
pub struct Status {
    pub code: Code,
    pub message: String,
}

impl Status {
    pub fn new(
        code: Code,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        RpcStatus {
            code: self.code.as_i32(),
            message: self.message.clone(),
        }
        .serialize(serializer)
    }
}

#[derive(Serialize, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl From<RpcStatus> for Status {
    fn from(status: RpcStatus) -> Self {
        Status::new(Code::from_i32(status.code), status.message)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// Field paths in snake_case; JSON form is a comma-joined camelCase string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMask {
    pub paths: Vec<String>,
}

impl FieldMask {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(
        &self,
        path: &str,
    ) -> bool {
        self.paths.iter().any(|candidate| candidate == path)
    }

    pub fn to_json_string(&self) -> String {
        self.paths
            .iter()
            .map(|path| {
                path.split('.')
                    .map(snake_to_lower_camel)
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Serialize for FieldMask {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_json_string())
    }
}

fn snake_to_lower_camel(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper_next = false;
    for ch in segment.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceConfigRequest {
    #[serde(skip)]
    pub parent: String,
    pub instance_config_id: String,
    pub instance_config: InstanceConfig,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub validate_only: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstanceConfigRequest {
    pub instance_config: InstanceConfig,
    pub update_mask: FieldMask,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub validate_only: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListInstanceConfigOperationsRequest {
    pub parent: String,
    pub filter: String,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstanceConfigOperationsResponse {
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub next_page_token: String,
}
