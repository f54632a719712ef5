use uuid::Uuid;

use crate::error::{AppError, Result};

/// A resource that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Access::Allow
    }

    /// Turn a denial into `Forbidden` naming the resource kind.
    pub fn require(self, resource: &str) -> Result<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny => Err(AppError::Forbidden(format!(
                "You do not have access to this {}",
                resource
            ))),
        }
    }
}

/// Ownership check run before every read or mutation of a task or its media.
pub fn authorize<R: Owned + ?Sized>(requester: Uuid, resource: &R) -> Access {
    if resource.owner_id() == requester {
        Access::Allow
    } else {
        Access::Deny
    }
}
