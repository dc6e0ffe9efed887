/// Ownership checks
///
/// Every resource in Tipul belongs to exactly one therapist. Most lookups
/// enforce this in SQL (`find_owned` returns `None` for foreign rows, which
/// surfaces as 404). The helpers here cover the places where a row is loaded
/// first and its owner compared afterwards.
///
/// # Example
///
/// ```
/// use tipul_shared::auth::authorization::require_ownership;
/// use tipul_shared::auth::middleware::AuthContext;
/// use uuid::Uuid;
///
/// let me = Uuid::new_v4();
/// let auth = AuthContext::from_jwt(me);
/// assert!(require_ownership(&auth, me).is_ok());
/// assert!(require_ownership(&auth, Uuid::new_v4()).is_err());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// `Ok(())` if the authenticated therapist owns the resource
pub fn require_ownership(auth: &AuthContext, resource_owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id != resource_owner_id {
        return Err(AuthzError::NotAuthorized);
    }

    Ok(())
}

/// Same as [`require_ownership`] for resources whose owner may be unknown
///
/// A missing owner is treated as foreign.
pub fn require_optional_ownership(
    auth: &AuthContext,
    resource_owner_id: Option<Uuid>,
) -> Result<(), AuthzError> {
    match resource_owner_id {
        Some(owner) => require_ownership(auth, owner),
        None => Err(AuthzError::NotAuthorized),
    }
}
