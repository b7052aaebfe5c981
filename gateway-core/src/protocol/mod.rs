//! JSON:API-style response protocol shared by every endpoint of the gateway.
//!
//! Every body leaving the gateway is an [`Envelope`]; single items inside it are [`Resource`]s
//! whose hyperlinks depend on the catalog [`StructureFamily`] of the item.

pub mod catalog;
pub mod envelope;
pub mod error;
pub mod links;
pub mod resource;

pub use catalog::{
    EmptyDict, EntryFields, NodeAttributes, NodeMeta, SortingDirection, SortingItem,
    Structure, StructureFamily,
};
pub use envelope::{ApiError, Envelope};
pub use error::ProtocolError;
pub use links::{
    ArrayLinks, DataFrameLinks, NodeLinks, PaginationLinks, ResourceLinks, SelfLinkOnly,
    XarrayDataArrayLinks, XarrayDatasetLinks,
};
pub use resource::{Resource, ResourceId};
