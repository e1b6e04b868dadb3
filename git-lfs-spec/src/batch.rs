use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::Object;

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md#requests
///
/// `operation` is kept as sent so that an unknown operation can be told apart
/// from a malformed body. Other request properties (`transfers`, `ref`,
/// `hash_algo`) are accepted and ignored.
#[derive(PartialEq, Eq, Debug, Deserialize)]
pub struct BatchRequest {
    pub operation: String,
    pub objects: Vec<Object>,
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md#successful-responses
#[derive(PartialEq, Eq, Debug, Serialize)]
pub struct BatchResponse {
    pub transfer: Transfer,
    pub objects: Vec<ObjectResponse>,
}

impl BatchResponse {
    pub fn basic(objects: Vec<ObjectResponse>) -> Self {
        Self {
            transfer: Transfer::Basic,
            objects,
        }
    }
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md#requests
#[derive(PartialEq, Eq, Debug, Deserialize, Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Download,
    Upload,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Download => "download",
            Operation::Upload => "upload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(Operation::Download),
            "upload" => Ok(Operation::Upload),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/basic-transfers.md#basic-transfer-api
#[derive(PartialEq, Eq, Debug, Deserialize, Serialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transfer {
    #[default]
    Basic,
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md#successful-responses
///
/// Errors are reported inline next to the object rather than nested under an
/// `error` key.
#[derive(PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum ObjectResponse {
    Success {
        #[serde(flatten)]
        object: Object,
        authenticated: bool,
        actions: Actions,
    },
    Error {
        #[serde(flatten)]
        object: Object,
        #[serde(flatten)]
        error: ObjectError,
    },
}

impl ObjectResponse {
    pub fn success(object: Object, actions: Actions) -> Self {
        ObjectResponse::Success {
            object,
            authenticated: true,
            actions,
        }
    }

    pub fn error(object: Object, error: ObjectError) -> Self {
        ObjectResponse::Error { object, error }
    }
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md#response-errors
#[derive(PartialEq, Eq, Debug, Serialize, Clone, Copy)]
pub struct ObjectError {
    pub code: u16,
    pub message: &'static str,
}

impl ObjectError {
    pub const VALIDATION_ERROR: Self = Self {
        code: 422,
        message: "Validation error",
    };
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/basic-transfers.md#basic-transfer-api
#[derive(PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum Actions {
    Download { download: Action },
    Upload { upload: Action },
}

impl Actions {
    /// Keys the action by the operation it was issued for.
    pub fn new(operation: Operation, action: Action) -> Self {
        match operation {
            Operation::Download => Actions::Download { download: action },
            Operation::Upload => Actions::Upload { upload: action },
        }
    }
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/basic-transfers.md#basic-transfer-api
#[derive(PartialEq, Eq, Debug, Serialize)]
pub struct Action {
    pub href: Url,
    /// Headers the client must send along with `href`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HashMap<String, String>>,
    pub expires_in: u64,
}

impl Action {
    pub fn new(href: Url, expires_in: u64) -> Self {
        Self {
            href,
            header: None,
            expires_in,
        }
    }

    /// An empty map leaves `header` out entirely.
    pub fn with_header(mut self, header: HashMap<String, String>) -> Self {
        self.header = if header.is_empty() { None } else { Some(header) };
        self
    }
}

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md#response-errors
#[derive(PartialEq, Eq, Debug, Serialize)]
pub struct LfsErrorResponse {
    pub message: String,
}

impl LfsErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn batch_request_deserializes_correctly() {
        let request: BatchRequest =
            serde_json::from_str(include_str!("test/batch_request.json")).unwrap();
        assert_eq!(
            request,
            BatchRequest {
                operation: "upload".to_string(),
                objects: vec![
                    Object {
                        oid: "12345678".to_string(),
                        size: 123,
                    },
                    Object {
                        oid: "87654321".to_string(),
                        size: -4,
                    },
                ],
            }
        );
        assert_eq!(request.operation.parse::<Operation>(), Ok(Operation::Upload));
    }

    #[test]
    fn batch_request_rejects_wrong_types() {
        assert!(serde_json::from_str::<BatchRequest>(r#"{"operation":"upload"}"#).is_err());
        assert!(serde_json::from_str::<BatchRequest>(
            r#"{"operation":"upload","objects":[{"oid":"a","size":"12"}]}"#
        )
        .is_err());
        assert!(
            serde_json::from_str::<BatchRequest>(r#"{"operation":1,"objects":[]}"#).is_err()
        );
    }

    #[test]
    fn unknown_operation_does_not_parse() {
        assert_eq!(
            "delete".parse::<Operation>(),
            Err(UnknownOperation("delete".to_string()))
        );
        assert!("Download".parse::<Operation>().is_err());
    }

    #[test]
    fn batch_response_serializes_correctly() {
        assert_eq!(
            include_str!("test/batch_response_success.json"),
            serde_json::to_string_pretty(&BatchResponse::basic(vec![ObjectResponse::success(
                Object {
                    oid: "1111111".to_string(),
                    size: 123,
                },
                Actions::new(
                    Operation::Download,
                    Action::new(Url::parse("https://some-download.com").unwrap(), 3600),
                ),
            )]))
            .unwrap(),
        );

        assert_eq!(
            include_str!("test/batch_response_error.json"),
            serde_json::to_string_pretty(&BatchResponse::basic(vec![ObjectResponse::error(
                Object {
                    oid: "bad".to_string(),
                    size: -1,
                },
                ObjectError::VALIDATION_ERROR,
            )]))
            .unwrap()
        );
    }

    #[test]
    fn upload_actions_are_keyed_by_upload() {
        let json = serde_json::to_value(Actions::new(
            Operation::Upload,
            Action::new(Url::parse("https://bucket.example/oid?sig=1").unwrap(), 60),
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "upload": {"href": "https://bucket.example/oid?sig=1", "expires_in": 60}
            })
        );
    }

    #[test]
    fn action_carries_signed_headers() {
        let header: HashMap<String, String> = [("x-amz-acl", "public-read")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let action = Action::new(Url::parse("https://bucket.example/oid").unwrap(), 60)
            .with_header(header);
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            serde_json::json!({
                "href": "https://bucket.example/oid",
                "header": {"x-amz-acl": "public-read"},
                "expires_in": 60
            })
        );

        let bare = Action::new(Url::parse("https://bucket.example/oid").unwrap(), 60)
            .with_header(HashMap::new());
        assert_eq!(bare.header, None);
    }

    #[test]
    fn lfs_error_serializes_correctly() {
        assert_eq!(
            include_str!("test/lfs_error.json"),
            serde_json::to_string_pretty(&LfsErrorResponse::new("Not found")).unwrap(),
        );
    }
}
