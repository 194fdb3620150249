//! registry::bsr
//!
//! Buf Schema Registry client over the Connect protocol (JSON codec).
//!
//! # Design
//!
//! Every RPC is a unary Connect call: `POST <api>/<package>.<Service>/<Method>`
//! with a JSON body and a bearer token. Failures come back as a non-2xx
//! response carrying `{"code": "...", "message": "..."}`; the code is what
//! [`RegistryError`] variants are chosen by. When the body is not a Connect
//! error (a proxy page, say) the HTTP status picks the variant instead.
//!
//! Field names follow the proto3 JSON mapping (lowerCamelCase) and file
//! contents are base64, as `bytes` fields are. A pushed module carries its
//! `.proto` files, the `buf.lock` pins, documentation and license as
//! separate fields.
//!
//! # Example
//!
//! ```ignore
//! use bufpush::core::types::{ModuleIdentity, Secret};
//! use bufpush::registry::{bsr::BsrClient, RegistryClient};
//!
//! let module = ModuleIdentity::parse("buf.build/acme/weather")?;
//! let registry = BsrClient::for_remote(Secret::new(token), module.remote());
//! let head = registry.get_track_head(&module, "main").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{RegistryClient, RegistryError, RepositoryTag, TrackHead};
use crate::core::module::ModuleBundle;
use crate::core::types::{CommitId, ModuleIdentity, Secret};

/// Proto package of the registry services.
const REGISTRY_PACKAGE: &str = "buf.alpha.registry.v1alpha1";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "buf-push-action";

/// Per-request timeout. Pushing a large module can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// BSR client.
pub struct BsrClient {
    /// HTTP client for making requests
    client: Client,
    /// Registry token
    token: Secret,
    /// API base URL, e.g. `https://api.buf.build`
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for BsrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BsrClient")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl BsrClient {
    /// Create a client for the registry at `remote` (e.g. `buf.build`).
    ///
    /// The API is served from the `api.` subdomain of the remote.
    pub fn for_remote(token: Secret, remote: &str) -> Self {
        Self::with_api_base(token, format!("https://api.{}", remote))
    }

    /// Create a client with an explicit API base URL.
    pub fn with_api_base(token: Secret, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// The API base URL requests are sent to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build URL for an RPC.
    fn rpc_url(&self, service: &str, method: &str) -> String {
        format!(
            "{}/{}.{}/{}",
            self.api_base, REGISTRY_PACKAGE, service, method
        )
    }

    /// Build common headers for RPC requests.
    fn headers(&self) -> Result<HeaderMap, RegistryError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
            .map_err(|_| {
                RegistryError::Unauthenticated("token contains invalid characters".into())
            })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("Connect-Protocol-Version", HeaderValue::from_static("1"));
        Ok(headers)
    }

    /// Execute a unary RPC.
    async fn call<Req, Resp>(
        &self,
        service: &str,
        method: &str,
        request: &Req,
    ) -> Result<Resp, RegistryError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.rpc_url(service, method);
        debug!(%url, "registry rpc");

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| RegistryError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        serde_json::from_slice(&body).map_err(|e| {
            RegistryError::InvalidResponse(format!("{}/{}: {}", service, method, e))
        })
    }
}

/// Map a failed response onto a `RegistryError`.
fn error_from_response(status: StatusCode, body: &[u8]) -> RegistryError {
    if let Ok(err) = serde_json::from_slice::<ConnectError>(body) {
        if let Some(code) = err.code {
            return RegistryError::from_code(&code, err.message.unwrap_or_default());
        }
    }

    let message = String::from_utf8_lossy(body).trim().to_string();
    let message = if message.is_empty() {
        status.to_string()
    } else {
        message
    };
    match status {
        StatusCode::NOT_FOUND => RegistryError::NotFound(message),
        StatusCode::CONFLICT => RegistryError::AlreadyExists(message),
        StatusCode::UNAUTHORIZED => RegistryError::Unauthenticated(message),
        StatusCode::FORBIDDEN => RegistryError::PermissionDenied(message),
        _ => RegistryError::Rpc {
            code: format!("http_{}", status.as_u16()),
            message,
        },
    }
}

#[async_trait]
impl RegistryClient for BsrClient {
    fn name(&self) -> &'static str {
        "bsr"
    }

    async fn get_track_head(
        &self,
        module: &ModuleIdentity,
        track: &str,
    ) -> Result<TrackHead, RegistryError> {
        let response: GetRepositoryCommitByReferenceResponse = self
            .call(
                "RepositoryCommitService",
                "GetRepositoryCommitByReference",
                &GetRepositoryCommitByReferenceRequest {
                    repository_owner: module.owner(),
                    repository_name: module.repository(),
                    reference: track,
                },
            )
            .await?;

        let commit = response.repository_commit.ok_or_else(|| {
            RegistryError::InvalidResponse("response has no repositoryCommit".into())
        })?;
        Ok(TrackHead {
            commit: CommitId::new(commit.name)
                .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?,
            tags: commit.tags.into_iter().map(|t| t.name).collect(),
        })
    }

    async fn push(
        &self,
        module: &ModuleIdentity,
        bundle: &ModuleBundle,
        tags: &[String],
        tracks: &[String],
    ) -> Result<CommitId, RegistryError> {
        let response: PushResponse = self
            .call(
                "PushService",
                "Push",
                &PushRequest {
                    owner: module.owner(),
                    repository: module.repository(),
                    branch: "",
                    module: ProtoModule::from_bundle(bundle),
                    tags,
                    tracks,
                },
            )
            .await?;

        let pin = response.local_module_pin.ok_or_else(|| {
            RegistryError::InvalidResponse("response has no localModulePin".into())
        })?;
        CommitId::new(pin.commit).map_err(|e| RegistryError::InvalidResponse(e.to_string()))
    }

    async fn tag_existing_commit(
        &self,
        module: &ModuleIdentity,
        tag: &str,
        commit: &CommitId,
    ) -> Result<RepositoryTag, RegistryError> {
        let full_name = module.full_name();
        let repository: GetRepositoryByFullNameResponse = self
            .call(
                "RepositoryService",
                "GetRepositoryByFullName",
                &GetRepositoryByFullNameRequest {
                    full_name: &full_name,
                },
            )
            .await?;
        let repository_id = repository
            .repository
            .map(|r| r.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RegistryError::InvalidResponse("response has no repository".into()))?;

        let response: CreateRepositoryTagResponse = self
            .call(
                "RepositoryTagService",
                "CreateRepositoryTag",
                &CreateRepositoryTagRequest {
                    repository_id: &repository_id,
                    name: tag,
                    commit_name: commit.as_str(),
                },
            )
            .await
            .map_err(|e| match e {
                // The repository was just found, so this is the commit.
                RegistryError::NotFound(_) => RegistryError::ReferenceNotFound(commit.to_string()),
                other => other,
            })?;

        let created = response.repository_tag.ok_or_else(|| {
            RegistryError::InvalidResponse("response has no repositoryTag".into())
        })?;
        let tagged_commit = if created.commit_name.is_empty() {
            commit.clone()
        } else {
            CommitId::new(created.commit_name)
                .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?
        };
        Ok(RepositoryTag {
            name: created.name,
            commit: tagged_commit,
        })
    }

    async fn delete_track(
        &self,
        module: &ModuleIdentity,
        track: &str,
    ) -> Result<(), RegistryError> {
        let _: Empty = self
            .call(
                "RepositoryTrackService",
                "DeleteRepositoryTrackByName",
                &DeleteRepositoryTrackByNameRequest {
                    owner_name: module.owner(),
                    repository_name: module.repository(),
                    name: track,
                },
            )
            .await?;
        Ok(())
    }
}

// --------------------------------------------------------------------------
// Wire types
// --------------------------------------------------------------------------

/// Connect error body.
#[derive(Deserialize)]
struct ConnectError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetRepositoryCommitByReferenceRequest<'a> {
    repository_owner: &'a str,
    repository_name: &'a str,
    reference: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetRepositoryCommitByReferenceResponse {
    repository_commit: Option<RepositoryCommit>,
}

#[derive(Deserialize)]
struct RepositoryCommit {
    name: String,
    #[serde(default)]
    tags: Vec<RepositoryTagMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryTagMessage {
    name: String,
    #[serde(default)]
    commit_name: String,
}

#[derive(Serialize)]
struct ProtoModuleFile<'a> {
    path: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ProtoModulePin<'a> {
    remote: &'a str,
    owner: &'a str,
    repository: &'a str,
    commit: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProtoModule<'a> {
    files: Vec<ProtoModuleFile<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<ProtoModulePin<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documentation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documentation_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<&'a str>,
}

impl<'a> ProtoModule<'a> {
    fn from_bundle(bundle: &'a ModuleBundle) -> Self {
        let doc = bundle.documentation();
        Self {
            files: bundle
                .files()
                .iter()
                .map(|f| ProtoModuleFile {
                    path: &f.path,
                    content: BASE64.encode(&f.content),
                })
                .collect(),
            dependencies: bundle
                .dependencies()
                .iter()
                .map(|pin| ProtoModulePin {
                    remote: &pin.remote,
                    owner: &pin.owner,
                    repository: &pin.repository,
                    commit: &pin.commit,
                })
                .collect(),
            documentation: doc.map(|d| d.content.as_str()),
            documentation_path: doc.map(|d| d.path.as_str()),
            license: bundle.license(),
        }
    }
}

#[derive(Serialize)]
struct PushRequest<'a> {
    owner: &'a str,
    repository: &'a str,
    branch: &'a str,
    module: ProtoModule<'a>,
    tags: &'a [String],
    tracks: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushResponse {
    local_module_pin: Option<LocalModulePin>,
}

#[derive(Deserialize)]
struct LocalModulePin {
    commit: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetRepositoryByFullNameRequest<'a> {
    full_name: &'a str,
}

#[derive(Deserialize)]
struct GetRepositoryByFullNameResponse {
    repository: Option<Repository>,
}

#[derive(Deserialize)]
struct Repository {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRepositoryTagRequest<'a> {
    repository_id: &'a str,
    name: &'a str,
    commit_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRepositoryTagResponse {
    repository_tag: Option<RepositoryTagMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRepositoryTrackByNameRequest<'a> {
    owner_name: &'a str,
    repository_name: &'a str,
    name: &'a str,
}

/// Empty response message.
#[derive(Deserialize)]
struct Empty {}
