//! Seeding of the default password rules and roles.

use tracing::info;

use membership_core::result::AppResult;
use membership_core::traits::Store;
use membership_entity::policy::keys::{DEFAULT_ROLES, PASSWORD_RULES, PASSWORD_RULE_DEFAULTS};

use crate::repositories::{PolicyRepository, RoleRepository};

/// Insert the default password rules and roles that are not present yet.
///
/// Existing values are never overwritten.
pub async fn seed_defaults(store: &dyn Store) -> AppResult<()> {
    let mut uow = store.begin().await?;

    let mut inserted_params = 0;
    for (key, value) in PASSWORD_RULE_DEFAULTS {
        inserted_params += PolicyRepository::insert_missing(&mut *uow, PASSWORD_RULES, key, value).await?;
    }

    let mut inserted_roles = 0;
    for name in DEFAULT_ROLES {
        if RoleRepository::find_by_name(&mut *uow, name).await?.is_none() {
            RoleRepository::insert(&mut *uow, name).await?;
            inserted_roles += 1;
        }
    }

    uow.commit().await?;

    info!(
        parameters = inserted_params,
        roles = inserted_roles,
        "Default password rules and roles seeded"
    );
    Ok(())
}
