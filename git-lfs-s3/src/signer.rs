use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const OBJECT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(thiserror::Error, Debug)]
pub enum SignError {
    #[error("invalid URL for {key}: {source}")]
    Url {
        key: String,
        #[source]
        source: url::ParseError,
    },
    #[error("could not presign upload of {key}: {source}")]
    Presign {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A presigned PUT and the headers that were signed into it.
///
/// `header` never includes `host`; the client derives it from `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUpload {
    pub href: Url,
    pub header: HashMap<String, String>,
}

/// Mints URLs that let clients talk to object storage directly.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Where a stored object can be read without credentials.
    fn public_url(&self, key: &str) -> Result<Url, SignError>;

    /// A time-limited URL that authorizes a single PUT of `key`.
    async fn presign_upload(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUpload, SignError>;
}

#[derive(Debug, Clone)]
pub struct S3Signer {
    client: Client,
    bucket: String,
}

impl S3Signer {
    /// Uses the transfer acceleration endpoint for both reads and uploads.
    pub fn new(sdk_config: &aws_config::SdkConfig, bucket: impl Into<String>) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .accelerate(true)
            .build();
        Self::from_client(Client::from_conf(s3_config), bucket)
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl UrlSigner for S3Signer {
    fn public_url(&self, key: &str) -> Result<Url, SignError> {
        Url::parse(&format!(
            "https://{}.s3-accelerate.amazonaws.com/{}",
            self.bucket, key
        ))
        .map_err(|source| SignError::Url {
            key: key.to_string(),
            source,
        })
    }

    async fn presign_upload(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUpload, SignError> {
        let presign_error = |source: Box<dyn std::error::Error + Send + Sync>| SignError::Presign {
            key: key.to_string(),
            source,
        };
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| presign_error(Box::new(e)))?;
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(OBJECT_CONTENT_TYPE)
            .presigned(presigning)
            .await
            .map_err(|e| presign_error(Box::new(e)))?;
        let href = Url::parse(request.uri()).map_err(|source| SignError::Url {
            key: key.to_string(),
            source,
        })?;
        let header = request
            .headers()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("host"))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Ok(PresignedUpload { href, header })
    }
}
