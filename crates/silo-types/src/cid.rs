use crate::error::{Result, SiloError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content identifier: a content-addressed reference to a piece of data,
/// stable across storage and retrieval operations.
///
/// The node's JSON wire format wraps CIDs in the IPLD link form
/// `{"/": "<cid>"}`, and that is how this type serializes. The inner text is
/// validated only as far as a client needs to: multibase strings are ASCII
/// alphanumeric and never shorter than eight characters, so anything else is
/// rejected before it can reach a filename or a log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "LinkForm", try_from = "LinkForm")]
pub struct ContentId(String);

/// IPLD link envelope used by the node for every CID on the wire.
#[derive(Serialize, Deserialize)]
struct LinkForm {
    #[serde(rename = "/")]
    cid: String,
}

/// Serde adapter for a link-form field that must survive as raw text.
///
/// Deserializing straight into [`ContentId`] rejects a malformed identifier
/// at the envelope, which is wrong for wire records carrying untrusted
/// peer data: there the whole record should parse and the bad identifier be
/// flagged during validation. Use as `#[serde(with = "silo_types::cid::raw_link")]`
/// on a `String` field.
pub mod raw_link {
    use super::LinkForm;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(cid: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        LinkForm {
            cid: cid.to_owned(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        LinkForm::deserialize(deserializer).map(|link| link.cid)
    }
}

impl ContentId {
    pub fn parse(cid: impl Into<String>) -> Result<Self> {
        let cid = cid.into();
        if cid.len() < 8 || !cid.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SiloError::InvalidCid(cid));
        }
        Ok(Self(cid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<ContentId> for LinkForm {
    fn from(id: ContentId) -> Self {
        Self { cid: id.0 }
    }
}

impl TryFrom<LinkForm> for ContentId {
    type Error = SiloError;

    fn try_from(link: LinkForm) -> Result<Self> {
        Self::parse(link.cid)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
