//! Project-wide uniqueness of singleton assets.
//!
//! A [`Singleton`] asset type may have at most one persisted instance. The check runs once
//! the asset has reached storage. When another asset of exactly the same type is already
//! stored, the type's [`DuplicateAction`] decides:
//!
//! | Action | Outcome |
//! |--------|---------|
//! | `Reject` | [`IdentityError::DuplicateAsset`], storage untouched |
//! | `DiscardDuplicate`, `DiscardContainer` | the checked asset is deleted |

use std::sync::Arc;

use log::{error, warn};

use crate::{
    error::IdentityError,
    identity::AssetDatabase,
    key::VariantKey,
    object::ObjectId,
    singleton::{DuplicateAction, Singleton},
};

/// Outcome of [`check_unique_asset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetCheck {
    /// No other asset of the type is stored.
    Unique,
    /// The checked asset was deleted in favour of the one at `existing`.
    Deleted { location: String, existing: String },
}

/// The stored instance of asset type `T`, if the project has one.
pub fn project_instance<T: Send + Sync + 'static, D: AssetDatabase>(
    database: &D,
) -> Option<Arc<T>> {
    database
        .find_assets(VariantKey::of::<T>())
        .iter()
        .find_map(|location| database.load(location)?.downcast::<T>().ok())
}

/// Verify that `object` is the only stored asset of type `T`.
///
/// Blocks until the database reports the object as persisted.
///
/// # Errors
///
/// [`IdentityError::NotPersisted`] if the object never reaches storage, and
/// [`IdentityError::DuplicateAsset`] if another asset of `T` is stored and the type rejects
/// duplicates.
pub fn check_unique_asset<T: Singleton, D: AssetDatabase>(
    database: &D,
    object: ObjectId,
) -> Result<AssetCheck, IdentityError> {
    let location = database
        .wait_until_persisted(object)
        .ok_or(IdentityError::NotPersisted(object))?;
    let variant = VariantKey::of::<T>();

    let existing = database
        .find_assets(variant)
        .into_iter()
        .filter(|other| *other != location)
        .find(|other| database.load(other).is_some_and(|asset| asset.is::<T>()));
    let Some(existing) = existing else {
        return Ok(AssetCheck::Unique);
    };

    match T::ON_DUPLICATE {
        DuplicateAction::Reject => {
            let conflict = IdentityError::DuplicateAsset {
                variant,
                location,
                existing,
            };
            error!("{conflict}");
            Err(conflict)
        }
        action => {
            database.delete_asset(&location);
            warn!(
                "{action}: deleted {location}, singleton asset {} is already stored at {existing}",
                variant.short_name()
            );
            Ok(AssetCheck::Deleted { location, existing })
        }
    }
}
