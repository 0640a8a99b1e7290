//! Authorization predicate.
//!
//! Ownership and role checks are evaluated once per operation into a tagged
//! [`Access`] value instead of being branched inline at every call site.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A regular user; may act only on resources they own.
    #[default]
    Customer,
    /// May act on any resource.
    Admin,
}

/// The authenticated caller of an operation.
///
/// Always constructed from the identity the auth layer provides; a
/// client-supplied user id in a request body is never trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates a regular-user actor.
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    /// Creates an administrator actor.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Returns true if the actor is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Evaluates access to a resource owned by `owner`.
    ///
    /// A non-owner gets `NotFoundForCaller`, not `Forbidden`: reporting a
    /// permission error would leak that the resource exists.
    pub fn access_to(&self, owner: UserId) -> Access {
        if self.is_admin() || self.user_id == owner {
            Access::Allowed
        } else {
            Access::NotFoundForCaller
        }
    }

    /// Evaluates access to an admin-only operation.
    pub fn admin_access(&self) -> Access {
        if self.is_admin() {
            Access::Allowed
        } else {
            Access::Forbidden
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The operation may proceed.
    Allowed,
    /// The caller is authenticated but lacks the required role.
    Forbidden,
    /// The resource must appear missing to this caller.
    NotFoundForCaller,
}

impl Access {
    /// Converts the check into a result, naming the resource for the
    /// `NotFound` case.
    pub fn require(self, entity: &'static str, id: String) -> Result<(), DomainError> {
        match self {
            Access::Allowed => Ok(()),
            Access::Forbidden => Err(DomainError::Forbidden("administrator role required")),
            Access::NotFoundForCaller => Err(DomainError::NotFound { entity, id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_allowed() {
        let user = UserId::new();
        assert_eq!(Actor::customer(user).access_to(user), Access::Allowed);
    }

    #[test]
    fn admin_is_allowed_on_any_resource() {
        let admin = Actor::admin(UserId::new());
        assert_eq!(admin.access_to(UserId::new()), Access::Allowed);
        assert_eq!(admin.admin_access(), Access::Allowed);
    }

    #[test]
    fn non_owner_sees_not_found_not_forbidden() {
        let actor = Actor::customer(UserId::new());
        let access = actor.access_to(UserId::new());
        assert_eq!(access, Access::NotFoundForCaller);

        let err = access.require("order", "x".to_string()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "order", .. }));
    }

    #[test]
    fn customer_is_forbidden_from_admin_operations() {
        let err = Actor::customer(UserId::new())
            .admin_access()
            .require("order", String::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
