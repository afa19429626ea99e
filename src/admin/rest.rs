use serde::{Deserialize, de::DeserializeOwned};

use crate::error::AdminError;

use super::{
    AdminResult, CreateInstanceConfigRequest, Deadline, InstanceAdmin, InstanceConfig,
    ListInstanceConfigOperationsRequest, ListInstanceConfigOperationsResponse, Operation,
    UpdateInstanceConfigRequest,
    auth::Credentials,
    model::{Code, Status},
};

pub const DEFAULT_ENDPOINT: &str = "https://spanner.googleapis.com";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub authenticated: bool,
}

impl Endpoint {
    /// The explicit REST endpoint if given, else the public API.
    ///
    /// A host without a scheme gets `https://`; `http://` endpoints are sent
    /// without credentials.
    pub fn resolve(explicit: Option<&str>) -> Self {
        let explicit = explicit.map(str::trim).filter(|value| !value.is_empty());
        let Some(url) = explicit else {
            return Self {
                base_url: DEFAULT_ENDPOINT.to_string(),
                authenticated: true,
            };
        };

        let base_url = if url.contains("://") {
            url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", url.trim_end_matches('/'))
        };
        Self {
            authenticated: !base_url.starts_with("http://"),
            base_url,
        }
    }

    fn url(
        &self,
        resource: &str,
    ) -> String {
        format!("{}/v1/{}", self.base_url, resource.trim_start_matches('/'))
    }
}

/// Instance admin client over the public REST surface.
pub struct RestInstanceAdmin {
    http: reqwest::Client,
    endpoint: Endpoint,
    credentials: Credentials,
    deadline: Deadline,
}

impl RestInstanceAdmin {
    pub async fn connect(
        endpoint: Endpoint,
        deadline: Deadline,
    ) -> AdminResult<Self> {
        let credentials = if endpoint.authenticated {
            deadline.bound("Authenticate", Credentials::resolve()).await?
        } else {
            Credentials::Anonymous
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| AdminError::Transport {
                call: "Connect",
                source,
            })?;

        tracing::info!(endpoint = %endpoint.base_url, "instance admin client ready");
        Ok(Self {
            http,
            endpoint,
            credentials,
            deadline,
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        call: &'static str,
        request: reqwest::RequestBuilder,
    ) -> AdminResult<T> {
        self.deadline
            .bound(call, async {
                let request = self
                    .credentials
                    .authorize(request)
                    .await?
                    .timeout(self.deadline.remaining());
                tracing::debug!(call, "sending admin request");
                let response = request
                    .send()
                    .await
                    .map_err(|source| classify_transport(call, source))?;
                let status = response.status();
                let body = response
                    .bytes()
                    .await
                    .map_err(|source| classify_transport(call, source))?;

                if !status.is_success() {
                    let status = decode_error(status.as_u16(), &body);
                    tracing::debug!(call, code = %status.code, "admin request rejected");
                    return Err(AdminError::Api(status));
                }

                let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
                serde_json::from_slice(body).map_err(|source| AdminError::Decode { call, source })
            })
            .await
    }
}

#[async_trait::async_trait]
impl InstanceAdmin for RestInstanceAdmin {
    async fn get_instance_config(
        &self,
        name: &str,
    ) -> AdminResult<InstanceConfig> {
        let request = self.http.get(self.endpoint.url(name));
        self.send("GetInstanceConfig", request).await
    }

    async fn create_instance_config(
        &self,
        request: CreateInstanceConfigRequest,
    ) -> AdminResult<Operation> {
        let url = self
            .endpoint
            .url(&format!("{}/instanceConfigs", request.parent));
        self.send("CreateInstanceConfig", self.http.post(url).json(&request))
            .await
    }

    async fn update_instance_config(
        &self,
        request: UpdateInstanceConfigRequest,
    ) -> AdminResult<Operation> {
        let url = self.endpoint.url(&request.instance_config.name);
        self.send("UpdateInstanceConfig", self.http.patch(url).json(&request))
            .await
    }

    async fn delete_instance_config(
        &self,
        name: &str,
    ) -> AdminResult<()> {
        let request = self.http.delete(self.endpoint.url(name));
        let _: serde::de::IgnoredAny = self.send("DeleteInstanceConfig", request).await?;
        Ok(())
    }

    async fn get_operation(
        &self,
        name: &str,
    ) -> AdminResult<Operation> {
        let request = self.http.get(self.endpoint.url(name));
        self.send("GetOperation", request).await
    }

    async fn list_instance_config_operations(
        &self,
        request: &ListInstanceConfigOperationsRequest,
    ) -> AdminResult<ListInstanceConfigOperationsResponse> {
        let url = self
            .endpoint
            .url(&format!("{}/instanceConfigOperations", request.parent));
        let builder = self.http.get(url).query(&list_query(request));
        self.send("ListInstanceConfigOperations", builder).await
    }

    fn deadline(&self) -> Option<Deadline> {
        Some(self.deadline)
    }
}

fn list_query(request: &ListInstanceConfigOperationsRequest) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if !request.filter.is_empty() {
        query.push(("filter", request.filter.clone()));
    }
    if let Some(page_size) = request.page_size {
        query.push(("pageSize", page_size.to_string()));
    }
    if let Some(token) = request.page_token.as_deref().filter(|token| !token.is_empty()) {
        query.push(("pageToken", token.to_string()));
    }
    query
}

fn classify_transport(
    call: &'static str,
    source: reqwest::Error,
) -> AdminError {
    if source.is_timeout() {
        AdminError::DeadlineExceeded { call }
    } else {
        AdminError::Transport { call, source }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn decode_error(
    http_status: u16,
    body: &[u8],
) -> Status {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = envelope
                .error
                .status
                .as_deref()
                .and_then(Code::from_name)
                .unwrap_or_else(|| Code::from_http(http_status));
            Status::new(code, envelope.error.message)
        }
        Err(_) => Status::new(
            Code::from_http(http_status),
            String::from_utf8_lossy(body).trim().to_string(),
        ),
    }
}
