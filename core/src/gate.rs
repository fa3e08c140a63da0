//! Capability gate: the access check consulted before a view or action is
//! exposed.

use std::sync::Arc;

use crate::error::ApiError;
use crate::error::ErrorKind;
use crate::permissions::PermissionResolver;
use crate::session::SessionStore;

/// Decision for a guarded route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// No identity. Always a redirect, never an in-place denial.
    RedirectToLogin,
    /// Authenticated but lacking `permission`. Rendered in place, never a
    /// redirect.
    Denied { permission: String },
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted)
    }
}

#[derive(Debug, Clone)]
pub struct CapabilityGate {
    session: Arc<SessionStore>,
    resolver: Arc<PermissionResolver>,
}

impl CapabilityGate {
    pub fn new(session: Arc<SessionStore>, resolver: Arc<PermissionResolver>) -> Self {
        Self { session, resolver }
    }

    /// True when nothing is required, or when an identity is present and holds
    /// `required`.
    pub fn can_render(&self, required: Option<&str>) -> bool {
        match required {
            None => true,
            Some(permission) => {
                self.session.is_authenticated() && self.resolver.has_permission(permission)
            }
        }
    }

    /// Route check for private routes: an identity is always required.
    pub fn guard(&self, required: Option<&str>) -> Access {
        if !self.session.is_authenticated() {
            return Access::RedirectToLogin;
        }
        match required {
            Some(permission) if !self.resolver.has_permission(permission) => Access::Denied {
                permission: permission.to_string(),
            },
            _ => Access::Granted,
        }
    }

    /// Action check: `Unauthorized` without an identity, `Forbidden` without
    /// the permission.
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        match self.guard(Some(permission)) {
            Access::Granted => Ok(()),
            Access::RedirectToLogin => Err(ApiError::new(ErrorKind::Unauthorized)),
            Access::Denied { .. } => Err(ApiError::new(ErrorKind::Forbidden)),
        }
    }
}
