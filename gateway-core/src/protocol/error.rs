use thiserror::Error;

use super::catalog::StructureFamily;

/// Violations of the response protocol. These are programming errors in the code assembling a
/// response and are never rendered to a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("Unknown resource kind: '{0}'")]
    UnknownResourceKind(String),

    #[error("Links for '{links}' cannot describe a '{kind}' resource")]
    LinksKindMismatch {
        kind: StructureFamily,
        links: StructureFamily,
    },

    #[error("Missing link '{field}' for '{kind}' resource")]
    MissingLinkField {
        kind: StructureFamily,
        field: &'static str,
    },

    #[error("Unexpected link '{field}' for '{kind}' resource")]
    UnexpectedLinkField { kind: StructureFamily, field: String },

    #[error("Unknown entry field: '{0}'")]
    UnknownEntryField(String),

    #[error("Payload cannot be serialized: {0}")]
    Serialization(String),
}
