use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::StructureFamily;
use super::error::ProtocolError;

/// Links of a paginated listing. Every field is mandatory; what a boundary page puts in
/// `prev`/`next` is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub next: String,
    pub prev: String,
    pub first: String,
    pub last: String,
}

impl PaginationLinks {
    pub fn new(
        self_link: impl Into<String>,
        next: impl Into<String>,
        prev: impl Into<String>,
        first: impl Into<String>,
        last: impl Into<String>,
    ) -> Self {
        Self {
            self_link: self_link.into(),
            next: next.into(),
            prev: prev.into(),
            first: first.into(),
            last: last.into(),
        }
    }
}

/// Links of a resource that is not a catalog entry (principals, API keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfLinkOnly {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub search: String,
    pub full: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArrayLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub full: String,
    pub block: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataFrameLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub full: String,
    pub partition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XarrayDataArrayLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub full_variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XarrayDatasetLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub full_variable: String,
    pub full_coord: String,
    pub full_dataset: String,
}

/// Closed mapping from resource kind to its link set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceLinks {
    Node(NodeLinks),
    Array(ArrayLinks),
    DataFrame(DataFrameLinks),
    XarrayDataArray(XarrayDataArrayLinks),
    XarrayDataset(XarrayDatasetLinks),
}

impl ResourceLinks {
    pub fn family(&self) -> StructureFamily {
        match self {
            ResourceLinks::Node(_) => StructureFamily::Node,
            ResourceLinks::Array(_) => StructureFamily::Array,
            ResourceLinks::DataFrame(_) => StructureFamily::DataFrame,
            ResourceLinks::XarrayDataArray(_) => StructureFamily::XarrayDataArray,
            ResourceLinks::XarrayDataset(_) => StructureFamily::XarrayDataset,
        }
    }

    pub fn self_link(&self) -> &str {
        match self {
            ResourceLinks::Node(l) => &l.self_link,
            ResourceLinks::Array(l) => &l.self_link,
            ResourceLinks::DataFrame(l) => &l.self_link,
            ResourceLinks::XarrayDataArray(l) => &l.self_link,
            ResourceLinks::XarrayDataset(l) => &l.self_link,
        }
    }

    /// Build the link set for `kind` from named URLs. Every link of the kind must be present
    /// and no other name is accepted.
    pub fn from_fields(
        kind: &str,
        mut fields: BTreeMap<String, String>,
    ) -> Result<Self, ProtocolError> {
        let family: StructureFamily = kind.parse()?;

        let mut take = |field: &'static str| {
            fields
                .remove(field)
                .ok_or(ProtocolError::MissingLinkField {
                    kind: family,
                    field,
                })
        };

        let links = match family {
            StructureFamily::Node => ResourceLinks::Node(NodeLinks {
                self_link: take("self")?,
                search: take("search")?,
                full: take("full")?,
            }),
            StructureFamily::Array => ResourceLinks::Array(ArrayLinks {
                self_link: take("self")?,
                full: take("full")?,
                block: take("block")?,
            }),
            StructureFamily::DataFrame => ResourceLinks::DataFrame(DataFrameLinks {
                self_link: take("self")?,
                full: take("full")?,
                partition: take("partition")?,
            }),
            StructureFamily::XarrayDataArray => {
                ResourceLinks::XarrayDataArray(XarrayDataArrayLinks {
                    self_link: take("self")?,
                    full_variable: take("full_variable")?,
                })
            }
            StructureFamily::XarrayDataset => ResourceLinks::XarrayDataset(XarrayDatasetLinks {
                self_link: take("self")?,
                full_variable: take("full_variable")?,
                full_coord: take("full_coord")?,
                full_dataset: take("full_dataset")?,
            }),
        };

        if let Some(field) = fields.into_keys().next() {
            return Err(ProtocolError::UnexpectedLinkField {
                kind: family,
                field,
            });
        }

        Ok(links)
    }

    /// Canonical links for the catalog entry at `path` under `base_url`.
    pub fn for_path(kind: &str, base_url: &str, path: &str) -> Result<Self, ProtocolError> {
        let family: StructureFamily = kind.parse()?;
        let base = base_url.trim_end_matches('/');
        let path = path.trim_matches('/');
        let self_link = format!("{}/node/metadata/{}", base, path);

        let links = match family {
            StructureFamily::Node => ResourceLinks::Node(NodeLinks {
                self_link,
                search: format!("{}/node/search/{}", base, path),
                full: format!("{}/node/full/{}", base, path),
            }),
            StructureFamily::Array => ResourceLinks::Array(ArrayLinks {
                self_link,
                full: format!("{}/array/full/{}", base, path),
                block: format!("{}/array/block/{}?block={{index}}", base, path),
            }),
            StructureFamily::DataFrame => ResourceLinks::DataFrame(DataFrameLinks {
                self_link,
                full: format!("{}/node/full/{}", base, path),
                partition: format!("{}/dataframe/partition/{}?partition={{index}}", base, path),
            }),
            StructureFamily::XarrayDataArray => {
                ResourceLinks::XarrayDataArray(XarrayDataArrayLinks {
                    self_link,
                    full_variable: format!("{}/array/full/{}", base, path),
                })
            }
            StructureFamily::XarrayDataset => ResourceLinks::XarrayDataset(XarrayDatasetLinks {
                self_link,
                full_variable: format!("{}/array/full/{}?variable={{variable}}", base, path),
                full_coord: format!("{}/array/full/{}?coord={{coord}}", base, path),
                full_dataset: format!("{}/node/full/{}", base, path),
            }),
        };

        Ok(links)
    }
}
