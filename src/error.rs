use crate::admin::Status;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    Api(Status),
    #[error("long-running operation '{name}' failed: {status}")]
    Operation { name: String, status: Status },
    #[error("deadline exceeded during {call}")]
    DeadlineExceeded { call: &'static str },
    #[error("failed to obtain access token: {0}")]
    Auth(String),
    #[error("request to {call} failed: {source}")]
    Transport {
        call: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode {call} response: {source}")]
    Decode {
        call: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid resource name '{name}': expected {expected}")]
    InvalidName { name: String, expected: &'static str },
    #[error("pagination for '{parent}' exceeded max pages ({max_pages})")]
    PaginationExceeded { parent: String, max_pages: usize },
    #[error("pagination for '{parent}' got stuck on page token '{token}'")]
    PaginationStuck { parent: String, token: String },
    #[error("cannot filter operations on '{}': {:?}", .0.path, .0.reason)]
    InvalidFilter(crate::filter::FilterDiagnostic),
}

impl AdminError {
    /// Remote status carried by this error, if the service produced one.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Api(status) | Self::Operation { status, .. } => Some(status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to serialize json output: {0}")]
    JsonSerialize(#[from] serde_json::Error),
    #[error("failed to serialize yaml output: {0}")]
    YamlSerialize(#[from] serde_yaml::Error),
    #[error("failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

/// Failure of a single command after the client was built.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(
        "invalid args: {0}\n\nTip: run `instance-configs --help` to see usage and examples."
    )]
    InvalidArgs(String),
    #[error("{command} failed with {source}")]
    Command {
        command: &'static str,
        #[source]
        source: CommandError,
    },
    #[error("failed to build admin client: {0}")]
    Connect(AdminError),
    #[error("failed to init async runtime: {0}")]
    RuntimeInit(std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgs(_) => crate::cli::EXIT_USAGE,
            _ => crate::cli::EXIT_FAILURE,
        }
    }

    /// Follow-up hint printed to stderr after the failure line.
    pub fn tip(&self) -> Option<&'static str> {
        match self {
            Self::Command {
                source: CommandError::Admin(source),
                ..
            }
            | Self::Connect(source) => Some(admin_tip(source)),
            Self::Command {
                source: CommandError::Output(_),
                ..
            } => Some("Tip: supported formats are `json`, `yaml`."),
            _ => None,
        }
    }
}

fn admin_tip(error: &AdminError) -> &'static str {
    use crate::admin::Code;

    match error.status().map(|status| status.code) {
        Some(Code::NotFound) => {
            "Tip: the instance config was not found. List configs via:\n  gcloud spanner instance-configs list"
        }
        Some(Code::AlreadyExists) => {
            "Tip: the custom config already exists. Delete it first or pick another --config-id."
        }
        Some(Code::FailedPrecondition) => {
            "Tip: the config may still be used by an instance. Check via:\n  gcloud spanner instances list"
        }
        Some(Code::Unauthenticated) | Some(Code::PermissionDenied) => {
            "Tip: check application default credentials via `gcloud auth application-default print-access-token`."
        }
        _ => match error {
            AdminError::Auth(_) => {
                "Tip: run `gcloud auth application-default login`, point GOOGLE_APPLICATION_CREDENTIALS at a key file, or set GOOGLE_OAUTH_ACCESS_TOKEN."
            }
            AdminError::DeadlineExceeded { .. } => {
                "Tip: raise the deadline with --timeout-secs and retry."
            }
            _ => "Tip: verify API access with `gcloud spanner instance-configs list` and then retry.",
        },
    }
}
