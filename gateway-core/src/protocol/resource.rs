use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::StructureFamily;
use super::error::ProtocolError;
use super::links::ResourceLinks;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Uuid(Uuid),
    Key(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Uuid(id) => write!(f, "{}", id),
            ResourceId::Key(key) => f.write_str(key),
        }
    }
}

impl From<Uuid> for ResourceId {
    fn from(id: Uuid) -> Self {
        ResourceId::Uuid(id)
    }
}

impl From<String> for ResourceId {
    fn from(key: String) -> Self {
        ResourceId::Key(key)
    }
}

impl From<&str> for ResourceId {
    fn from(key: &str) -> Self {
        ResourceId::Key(key.to_string())
    }
}

/// A JSON API resource: one item with its attributes and hyperlinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<A, L = ResourceLinks, M = serde_json::Value> {
    pub id: ResourceId,
    pub attributes: A,
    pub links: Option<L>,
    pub meta: Option<M>,
}

impl<A, L, M> Resource<A, L, M> {
    pub fn new(id: impl Into<ResourceId>, attributes: A) -> Self {
        Self {
            id: id.into(),
            attributes,
            links: None,
            meta: None,
        }
    }

    pub fn with_links(mut self, links: L) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_meta(mut self, meta: M) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl<A, M> Resource<A, ResourceLinks, M> {
    /// Build a catalog resource of the given kind. The links must belong to that kind.
    pub fn for_kind(
        id: impl Into<ResourceId>,
        attributes: A,
        kind: &str,
        links: ResourceLinks,
    ) -> Result<Self, ProtocolError> {
        let kind: StructureFamily = kind.parse()?;
        if links.family() != kind {
            return Err(ProtocolError::LinksKindMismatch {
                kind,
                links: links.family(),
            });
        }

        Ok(Self::new(id, attributes).with_links(links))
    }
}
