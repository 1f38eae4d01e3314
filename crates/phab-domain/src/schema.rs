//! Review record definitions
//!
//! `Diff` and `Revision` mirror the payloads returned by the Conduit
//! `differential.querydiffs` and `differential.query` methods. Optional
//! wire fields default rather than fail, so partial payloads still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Module for (de)serializing Conduit epoch-second timestamps.
///
/// Conduit emits timestamps as epoch seconds, usually as JSON strings
/// (`"1404329408"`) but occasionally as bare integers. Absent and `null`
/// fields both map to `None`.
pub mod epoch_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawEpoch {
        Int(i64),
        Str(String),
    }

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_some(&d.timestamp().to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = match Option::<RawEpoch>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(RawEpoch::Int(v)) => v,
            Some(RawEpoch::Str(s)) => s.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
        };
        Ok(DateTime::from_timestamp(secs, 0))
    }
}

/// Treat a `null` wire value as the empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a status code as either an integer or a numeric string.
fn lenient_status_code<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Int(i64),
        Str(String),
    }

    match Option::<RawCode>::deserialize(deserializer)? {
        None => Ok(0),
        Some(RawCode::Int(v)) => Ok(v as i32),
        Some(RawCode::Str(s)) => s.trim().parse::<i32>().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// DIFF - one uploaded diff of a revision
// ============================================================================

/// A single Differential diff.
///
/// `revision_id` is a by-value reference to the owning [`Revision`]; no
/// cross-validation is performed. All fields are open for mutation after
/// construction, matching how the deserializer populates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diff {
    /// Diff identifier.
    pub id: String,

    /// Identifier of the revision this diff belongs to.
    #[serde(rename = "revisionID")]
    pub revision_id: String,

    /// When the diff was created (absent if the server omitted it).
    #[serde(rename = "dateCreated", with = "epoch_opt")]
    pub date_created: Option<DateTime<Utc>>,

    /// When the diff was last modified.
    #[serde(rename = "dateModified", with = "epoch_opt")]
    pub date_modified: Option<DateTime<Utc>>,

    /// Branch the diff was generated from.
    #[serde(deserialize_with = "null_as_empty")]
    pub branch: String,

    /// Unit-test status code (opaque; the server defines the mapping).
    #[serde(rename = "unitStatus", deserialize_with = "lenient_status_code")]
    pub unit_status: i32,

    /// Lint status code (opaque; the server defines the mapping).
    #[serde(rename = "lintStatus", deserialize_with = "lenient_status_code")]
    pub lint_status: i32,
}

impl Diff {
    /// Monogram label of the owning revision: `"D"` + revision id.
    ///
    /// Pure concatenation with no shape validation; an empty revision id
    /// yields the literal `"D"`.
    pub fn formatted_revision_id(&self) -> String {
        format!("D{}", self.revision_id)
    }
}

// ============================================================================
// REVISION - the persistent review entity
// ============================================================================

/// A Differential revision.
///
/// `id` and `phid` are required at construction; everything else defaults
/// and is filled in afterwards by the deserializer or the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision identifier.
    pub id: String,

    /// Globally unique PHID of the revision.
    pub phid: String,

    /// Revision title.
    #[serde(default)]
    pub title: String,

    /// Web URI of the revision.
    #[serde(default)]
    pub uri: String,

    /// When the revision was created.
    #[serde(default, rename = "dateCreated", with = "epoch_opt")]
    pub date_created: Option<DateTime<Utc>>,

    /// When the revision was last modified.
    #[serde(default, rename = "dateModified", with = "epoch_opt")]
    pub date_modified: Option<DateTime<Utc>>,

    /// PHID of the revision author.
    #[serde(default, rename = "authorPHID")]
    pub author_phid: String,

    /// Review status code (opaque; the server defines the mapping).
    #[serde(default, deserialize_with = "lenient_status_code")]
    pub status: i32,

    /// Human-readable status, as supplied by the server.
    #[serde(default, rename = "statusName")]
    pub status_name: String,

    /// Branch the revision targets.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub branch: String,
}

impl Revision {
    /// Create a revision from its two mandatory identifiers.
    pub fn new(id: impl Into<String>, phid: impl Into<String>) -> Self {
        Revision {
            id: id.into(),
            phid: phid.into(),
            title: String::new(),
            uri: String::new(),
            date_created: None,
            date_modified: None,
            author_phid: String::new(),
            status: 0,
            status_name: String::new(),
            branch: String::new(),
        }
    }
}
