use serde_derive::{Deserialize, Serialize};

pub mod batch;

pub const GIT_LFS_CONTENT_TYPE: &str = "application/vnd.git-lfs+json";

/// https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md#requests
///
/// `size` is signed so a negative size can be echoed back in a per-object
/// validation error instead of failing the whole request. A size beyond
/// `i64::MAX` does not fit and fails deserialization of the whole request.
#[derive(PartialEq, Eq, Debug, Deserialize, Serialize, Clone)]
pub struct Object {
    pub oid: String,
    pub size: i64,
}

impl Object {
    /// SHA-256 oids are 64 lowercase hex characters.
    pub const OID_LEN: usize = 64;

    pub fn is_valid(&self) -> bool {
        self.size >= 0
            && self.oid.len() == Self::OID_LEN
            && self
                .oid
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(oid: &str, size: i64) -> Object {
        Object {
            oid: oid.to_string(),
            size,
        }
    }

    #[test]
    fn sha256_oid_with_non_negative_size_is_valid() {
        assert!(object(&"a".repeat(64), 10).is_valid());
        assert!(object(
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
            0
        )
        .is_valid());
    }

    #[test]
    fn size_beyond_i64_fails_to_deserialize() {
        let json = format!(r#"{{"oid":"{}","size":{}}}"#, "a".repeat(64), u64::MAX);
        assert!(serde_json::from_str::<Object>(&json).is_err());
        let json = format!(r#"{{"oid":"{}","size":{}}}"#, "a".repeat(64), i64::MAX);
        assert_eq!(serde_json::from_str::<Object>(&json).unwrap().size, i64::MAX);
    }

    #[test]
    fn negative_size_is_invalid() {
        assert!(!object(&"a".repeat(64), -1).is_valid());
    }

    #[test]
    fn malformed_oids_are_invalid() {
        assert!(!object("bad", 5).is_valid());
        assert!(!object(&"a".repeat(63), 5).is_valid());
        assert!(!object(&"a".repeat(65), 5).is_valid());
        assert!(!object(&"A".repeat(64), 5).is_valid());
        assert!(!object(&"g".repeat(64), 5).is_valid());
        assert!(!object("", 5).is_valid());
    }
}
