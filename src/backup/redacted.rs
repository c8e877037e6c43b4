//! Secret string handling with redacted display and serialization.
//!
//! Database passwords are kept in a `RedactedString` so that a `{:?}` of a
//! `BackupTarget` in a log line never prints the credential.

use bon::Builder;
use derive_more::From;
use getset::Getters;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::result;
use zeroize::Zeroize;

/// Placeholder text shown instead of the actual password in logs/debug output
pub static REDACTED_SECRET: &str = "###REDACTED_SECRET###";

/// A string that gets redacted in debug output and serialization
///
/// The inner value is only reachable through the `secret()` getter and is
/// zeroed when the value is dropped.
#[derive(Clone, Zeroize, From, Builder, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RedactedString {
    #[builder(into)]
    secret: String,
}

impl From<&str> for RedactedString {
    fn from(value: &str) -> Self {
        RedactedString::builder().secret(value).build()
    }
}

impl Debug for RedactedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", REDACTED_SECRET)
    }
}

impl Serialize for RedactedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED_SECRET)
    }
}

impl<'de> Deserialize<'de> for RedactedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_any(RedactedStringVisitor)
    }
}

impl Drop for RedactedString {
    fn drop(&mut self) {
        self.zeroize();
    }
}

pub struct RedactedStringVisitor;

impl Visitor<'_> for RedactedStringVisitor {
    type Value = RedactedString;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(RedactedString::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let redacted = RedactedString::from("hunter2");
        assert_eq!(format!("{:?}", redacted), REDACTED_SECRET);
        assert_eq!(redacted.secret(), "hunter2");
    }

    #[test]
    fn test_serialize_is_redacted() {
        let redacted = RedactedString::from("hunter2");
        let serialized = serde_json::to_string(&redacted).unwrap();
        assert_eq!(serialized, format!("\"{}\"", REDACTED_SECRET));
    }

    #[test]
    fn test_deserialize_keeps_secret() {
        let redacted: RedactedString = serde_yml::from_str("s3cr3t").unwrap();
        assert_eq!(redacted.secret(), "s3cr3t");
    }

    #[test]
    fn test_deserialize_rejects_numbers() {
        // 0x1F would otherwise become "31"
        assert!(serde_yml::from_str::<RedactedString>("0x1F").is_err());
        assert!(serde_yml::from_str::<RedactedString>("1e3").is_err());
        let quoted: RedactedString = serde_yml::from_str("\"0x1F\"").unwrap();
        assert_eq!(quoted.secret(), "0x1F");
    }

    #[test]
    fn test_zeroize_clears_secret() {
        let mut redacted = RedactedString::from("hunter2");
        redacted.zeroize();
        assert!(redacted.secret().is_empty());
    }
}
