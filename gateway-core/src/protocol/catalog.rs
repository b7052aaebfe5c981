//! Catalog item descriptions and query-field vocabulary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::ProtocolError;

/// Resource kind discriminator. Each kind has a fixed set of hyperlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureFamily {
    #[serde(rename = "node")]
    Node,
    #[serde(rename = "array")]
    Array,
    #[serde(rename = "dataframe")]
    DataFrame,
    #[serde(rename = "xarray_data_array")]
    XarrayDataArray,
    #[serde(rename = "xarray_dataset")]
    XarrayDataset,
}

impl StructureFamily {
    pub const ALL: [StructureFamily; 5] = [
        StructureFamily::Node,
        StructureFamily::Array,
        StructureFamily::DataFrame,
        StructureFamily::XarrayDataArray,
        StructureFamily::XarrayDataset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StructureFamily::Node => "node",
            StructureFamily::Array => "array",
            StructureFamily::DataFrame => "dataframe",
            StructureFamily::XarrayDataArray => "xarray_data_array",
            StructureFamily::XarrayDataset => "xarray_dataset",
        }
    }

    /// Names of the hyperlinks a resource of this kind exposes, in wire order.
    pub fn link_fields(&self) -> &'static [&'static str] {
        match self {
            StructureFamily::Node => &["self", "search", "full"],
            StructureFamily::Array => &["self", "full", "block"],
            StructureFamily::DataFrame => &["self", "full", "partition"],
            StructureFamily::XarrayDataArray => &["self", "full_variable"],
            StructureFamily::XarrayDataset => {
                &["self", "full_variable", "full_coord", "full_dataset"]
            }
        }
    }
}

impl fmt::Display for StructureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StructureFamily {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StructureFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownResourceKind(s.to_string()))
    }
}

/// Fields a client may select when listing or fetching catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryFields {
    #[serde(rename = "metadata")]
    Metadata,
    #[serde(rename = "structure_family")]
    StructureFamily,
    #[serde(rename = "structure.micro")]
    Microstructure,
    #[serde(rename = "structure.macro")]
    Macrostructure,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "sorting")]
    Sorting,
    #[serde(rename = "specs")]
    Specs,
    #[serde(rename = "")]
    None,
}

impl EntryFields {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryFields::Metadata => "metadata",
            EntryFields::StructureFamily => "structure_family",
            EntryFields::Microstructure => "structure.micro",
            EntryFields::Macrostructure => "structure.macro",
            EntryFields::Count => "count",
            EntryFields::Sorting => "sorting",
            EntryFields::Specs => "specs",
            EntryFields::None => "",
        }
    }
}

impl FromStr for EntryFields {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metadata" => Ok(EntryFields::Metadata),
            "structure_family" => Ok(EntryFields::StructureFamily),
            "structure.micro" => Ok(EntryFields::Microstructure),
            "structure.macro" => Ok(EntryFields::Macrostructure),
            "count" => Ok(EntryFields::Count),
            "sorting" => Ok(EntryFields::Sorting),
            "specs" => Ok(EntryFields::Specs),
            "" => Ok(EntryFields::None),
            other => Err(ProtocolError::UnknownEntryField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub micro: Option<serde_json::Value>,
    #[serde(rename = "macro")]
    pub macrostructure: Option<serde_json::Value>,
}

/// Sort order, carried on the wire as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortingDirection {
    Ascending,
    Descending,
}

impl SortingDirection {
    pub fn as_i8(&self) -> i8 {
        match self {
            SortingDirection::Ascending => 1,
            SortingDirection::Descending => -1,
        }
    }
}

impl Serialize for SortingDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for SortingDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i8::deserialize(deserializer)? {
            1 => Ok(SortingDirection::Ascending),
            -1 => Ok(SortingDirection::Descending),
            other => Err(serde::de::Error::custom(format!(
                "invalid sorting direction {}, expected 1 or -1",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortingItem {
    pub key: String,
    pub direction: SortingDirection,
}

/// Attributes of a catalog entry as returned inside a [`super::Resource`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub ancestors: Vec<String>,
    pub structure_family: Option<StructureFamily>,
    pub specs: Option<Vec<String>>,
    /// Free-form, user-specified metadata.
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    pub structure: Option<Structure>,
    pub count: Option<u64>,
    pub sorting: Option<Vec<SortingItem>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyDict {}
