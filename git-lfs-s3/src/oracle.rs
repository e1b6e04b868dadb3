use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use hyper::{Body, Client, Request, StatusCode};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use log::debug;
use serde_derive::Deserialize;
use url::Url;

use crate::config::Repository;
use crate::credentials::Credentials;

const GITHUB_JSON: &str = "application/vnd.github+json";
const CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A collaborator's role on a repository.
///
/// https://docs.github.com/en/rest/collaborators/collaborators#get-repository-permissions-for-a-user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
    #[serde(rename = "none")]
    NoAccess,
    #[serde(other)]
    Other,
}

impl Permission {
    pub fn can_upload(&self) -> bool {
        matches!(self, Permission::Admin | Permission::Write)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OracleError {
    /// GitHub answered, and refused.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("GitHub API base URL {0} cannot have path segments")]
    BaseUrl(Url),
    #[error("could not build GitHub request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("could not encode credentials: {0}")]
    Credentials(#[from] hyper::header::InvalidHeaderValue),
    #[error("request to GitHub failed: {0}")]
    Transport(#[from] hyper::Error),
    #[error("unexpected response from GitHub: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OracleError {
    /// HTTP status GitHub answered with, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            OracleError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// An oracle failure met while authorizing an upload.
#[derive(thiserror::Error, Debug)]
#[error("Invalid Github credentials: {}", self.detail())]
pub struct AuthorizationError {
    #[source]
    pub cause: OracleError,
}

impl AuthorizationError {
    /// What the oracle reported, without the surrounding protocol noise.
    pub fn detail(&self) -> String {
        match &self.cause {
            OracleError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<OracleError> for AuthorizationError {
    fn from(cause: OracleError) -> Self {
        Self { cause }
    }
}

/// Resolves what a set of credentials may do to a repository.
#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    async fn permission(
        &self,
        credentials: &Credentials,
        repository: &Repository,
    ) -> Result<Permission, OracleError>;
}

#[derive(Deserialize)]
struct PermissionResponse {
    permission: Permission,
}

#[derive(Deserialize)]
struct GithubErrorResponse {
    message: String,
}

pub struct GithubOracle {
    client: Client<HttpsConnector<HttpConnector>>,
    api: Url,
}

impl GithubOracle {
    pub fn new(api: Url) -> Result<Self, OracleError> {
        if api.cannot_be_a_base() {
            return Err(OracleError::BaseUrl(api));
        }
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        Ok(Self {
            client: Client::builder().build(connector),
            api,
        })
    }

    fn permission_url(&self, repository: &Repository, username: &str) -> Result<Url, OracleError> {
        let mut url = self.api.clone();
        url.path_segments_mut()
            .map_err(|_| OracleError::BaseUrl(self.api.clone()))?
            .pop_if_empty()
            .extend(&[
                "repos",
                &repository.owner,
                &repository.name,
                "collaborators",
                username,
                "permission",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl AuthorizationOracle for GithubOracle {
    async fn permission(
        &self,
        credentials: &Credentials,
        repository: &Repository,
    ) -> Result<Permission, OracleError> {
        let url = self.permission_url(repository, &credentials.username)?;
        debug!("checking {} on {}", credentials.username, repository);
        let request = Request::get(url.as_str())
            .header(AUTHORIZATION, credentials.to_header()?)
            .header(ACCEPT, GITHUB_JSON)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .body(Body::empty())?;

        let response = self.client.request(request).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;

        if status.is_success() {
            let PermissionResponse { permission } =
                serde_json::from_slice::<PermissionResponse>(&body)?;
            Ok(permission)
        } else {
            let message = serde_json::from_slice::<GithubErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });
            Err(OracleError::Rejected { status, message })
        }
    }
}
