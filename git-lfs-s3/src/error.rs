use hyper::StatusCode;

use crate::oracle::AuthorizationError;
use crate::signer::SignError;

/// Everything that ends a batch request early. The `Display` of each variant
/// is the `message` the client sees.
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Not found")]
    Routing,
    #[error("Could not read request body")]
    BodyRead(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Invalid request body")]
    RequestFormat(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid operation")]
    Operation(#[source] git_lfs_spec::batch::UnknownOperation),
    #[error("Invalid username/password.")]
    CredentialsMissing,
    #[error(transparent)]
    CredentialsInvalid(#[from] AuthorizationError),
    #[error("Github user needs write access to the repository.")]
    PermissionDenied,
    #[error("Internal server error")]
    Signing(#[from] SignError),
}

impl BatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            BatchError::Routing => StatusCode::NOT_FOUND,
            BatchError::BodyRead(_) => StatusCode::BAD_REQUEST,
            BatchError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            BatchError::RequestFormat(_) | BatchError::Operation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BatchError::CredentialsMissing
            | BatchError::CredentialsInvalid(_)
            | BatchError::PermissionDenied => StatusCode::UNAUTHORIZED,
            BatchError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        BatchError::RequestFormat(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use git_lfs_spec::batch::UnknownOperation;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_and_statuses() {
        let rejected = AuthorizationError::from(OracleError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            message: "Bad credentials".to_string(),
        });
        let body_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let cases = [
            (BatchError::Routing, 404, "Not found"),
            (
                BatchError::BodyRead("connection reset".into()),
                400,
                "Could not read request body",
            ),
            (BatchError::PayloadTooLarge, 413, "Request body too large"),
            (BatchError::from(body_error), 422, "Invalid request body"),
            (
                BatchError::Operation(UnknownOperation("delete".to_string())),
                422,
                "Invalid operation",
            ),
            (
                BatchError::CredentialsMissing,
                401,
                "Invalid username/password.",
            ),
            (
                BatchError::from(rejected),
                401,
                "Invalid Github credentials: Bad credentials",
            ),
            (
                BatchError::PermissionDenied,
                401,
                "Github user needs write access to the repository.",
            ),
        ];
        for (err, status, message) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn signing_failures_are_internal() {
        let err = BatchError::from(SignError::Url {
            key: "oid".to_string(),
            source: url::ParseError::EmptyHost,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }
}
