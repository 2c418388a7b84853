use thiserror::Error;

use crate::{key::VariantKey, object::ObjectId};

/// A second instance of a singleton variant became active while the variant's duplicate
/// action is [`Reject`](crate::DuplicateAction::Reject).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate singleton {variant}: {duplicate} conflicts with registered instance {existing}")]
pub struct ConflictError {
    /// The variant with two live instances.
    pub variant: VariantKey,
    /// The instance that was already registered.
    pub existing: ObjectId,
    /// The instance whose activation failed.
    pub duplicate: ObjectId,
}

/// Failures of asset identity operations backed by an asset database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The object never reached persistent storage.
    #[error("object {0} was not persisted")]
    NotPersisted(ObjectId),
    /// The database has no GUID for the object's storage location.
    #[error("no guid is known for storage location '{0}'")]
    UnknownLocation(String),
    /// A second persisted asset of a singleton asset type, under the
    /// [`Reject`](crate::DuplicateAction::Reject) action.
    #[error("duplicate singleton asset {variant}: {location} conflicts with {existing}")]
    DuplicateAsset {
        variant: VariantKey,
        /// Storage location of the asset being checked.
        location: String,
        /// Storage location of the asset already in the project.
        existing: String,
    },
}
