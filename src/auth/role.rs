use log::warn;

use crate::auth::Identity;
use crate::error::{Error, Result};
use crate::model::{db::Role, mongodb::Id};
use crate::store::Store;

/// Does the given user hold admin rights?
///
/// Absence of privilege is the safe default: a missing user or a failed
/// lookup both answer `false`.
pub async fn is_admin(store: &dyn Store, user_id: Id) -> bool {
    match store.user_by_id(user_id).await {
        Ok(Some(user)) => match user.role {
            Role::Admin => true,
            Role::Voter => false,
        },
        Ok(None) => {
            warn!("User not found for role check: {user_id}");
            false
        }
        Err(err) => {
            warn!("Role check for {user_id} failed, denying: {err}");
            false
        }
    }
}

/// Fail with `Forbidden` unless the identity holds admin rights.
pub async fn require_admin(store: &dyn Store, identity: &Identity, action: &str) -> Result<()> {
    if is_admin(store, identity.user_id).await {
        Ok(())
    } else {
        Err(Error::Forbidden(format!("Only admins can {action}")))
    }
}
