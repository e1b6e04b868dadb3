use futures::future::try_join_all;
use git_lfs_spec::batch::{
    Action, Actions, BatchRequest, BatchResponse, LfsErrorResponse, ObjectError, ObjectResponse,
    Operation,
};
use git_lfs_spec::{Object, GIT_LFS_CONTENT_TYPE};
use http_body::{LengthLimitError, Limited};
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::BatchError;
use crate::oracle::{AuthorizationError, AuthorizationOracle};
use crate::signer::{PresignedUpload, UrlSigner};

pub const BATCH_PATH: &str = "/objects/batch";

/// Largest batch request body read before answering 413.
pub const MAX_BATCH_BODY: usize = 4 * 1024 * 1024;

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md
///
/// Stateless apart from its immutable collaborators, so one instance serves
/// every connection.
pub struct BatchHandler {
    config: Arc<Config>,
    oracle: Arc<dyn AuthorizationOracle>,
    signer: Arc<dyn UrlSigner>,
}

impl BatchHandler {
    pub fn new(
        config: Arc<Config>,
        oracle: Arc<dyn AuthorizationOracle>,
        signer: Arc<dyn UrlSigner>,
    ) -> Self {
        Self {
            config,
            oracle,
            signer,
        }
    }

    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let (status, body) = match self.route(request).await {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    BatchError::Signing(cause) => error!("{}", cause),
                    BatchError::BodyRead(cause) => warn!("could not read request body: {}", cause),
                    BatchError::CredentialsInvalid(cause) => warn!(
                        "oracle refused upload (status {:?}): {}",
                        cause.cause.status(),
                        cause.cause
                    ),
                    _ => {}
                }
                (
                    err.status(),
                    serde_json::to_vec(&LfsErrorResponse::new(err.to_string())),
                )
            }
        };
        let (status, body) = match body {
            Ok(body) => (status, body),
            Err(err) => {
                error!("could not serialize response: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    br#"{"message":"Internal server error"}"#.to_vec(),
                )
            }
        };
        info!("respond: {}", String::from_utf8_lossy(&body));

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(GIT_LFS_CONTENT_TYPE));
        response
    }

    async fn route(
        &self,
        request: Request<Body>,
    ) -> Result<(StatusCode, serde_json::Result<Vec<u8>>), BatchError> {
        if request.uri().path() == "/" {
            let banner = format!("Github LFS server for {}", self.config.repository);
            return Ok((StatusCode::OK, serde_json::to_vec(&banner)));
        }
        if request.uri().path() != BATCH_PATH || request.method() != Method::POST {
            return Err(BatchError::Routing);
        }
        let response = self.batch(request).await?;
        Ok((StatusCode::OK, serde_json::to_vec(&response)))
    }

    async fn batch(&self, request: Request<Body>) -> Result<BatchResponse, BatchError> {
        let (parts, body) = request.into_parts();
        let body = hyper::body::to_bytes(Limited::new(body, MAX_BATCH_BODY))
            .await
            .map_err(|err| {
                if err.is::<LengthLimitError>() {
                    BatchError::PayloadTooLarge
                } else {
                    BatchError::BodyRead(err)
                }
            })?;
        let BatchRequest { operation, objects } = serde_json::from_slice::<BatchRequest>(&body)?;
        let operation = operation
            .parse::<Operation>()
            .map_err(BatchError::Operation)?;

        if operation == Operation::Upload {
            let credentials = Credentials::from_header(parts.headers.get(AUTHORIZATION))
                .ok_or(BatchError::CredentialsMissing)?;
            self.authorize_upload(&credentials).await?;
        }

        let objects = try_join_all(
            objects
                .into_iter()
                .map(|object| self.object_response(operation, object)),
        )
        .await?;
        Ok(BatchResponse::basic(objects))
    }

    async fn authorize_upload(&self, credentials: &Credentials) -> Result<(), BatchError> {
        let permission = self
            .oracle
            .permission(credentials, &self.config.repository)
            .await
            .map_err(AuthorizationError::from)?;
        if permission.can_upload() {
            Ok(())
        } else {
            info!(
                "{} has {:?} on {}, refusing upload",
                credentials.username, permission, self.config.repository
            );
            Err(BatchError::PermissionDenied)
        }
    }

    async fn object_response(
        &self,
        operation: Operation,
        object: Object,
    ) -> Result<ObjectResponse, BatchError> {
        if !object.is_valid() {
            return Ok(ObjectResponse::error(object, ObjectError::VALIDATION_ERROR));
        }
        let expires_in = self.config.expires_in;
        let action = match operation {
            Operation::Download => Action::new(self.signer.public_url(&object.oid)?, expires_in),
            Operation::Upload => {
                let PresignedUpload { href, header } = self
                    .signer
                    .presign_upload(&object.oid, Duration::from_secs(expires_in))
                    .await?;
                Action::new(href, expires_in).with_header(header)
            }
        };
        Ok(ObjectResponse::success(
            object,
            Actions::new(operation, action),
        ))
    }
}
