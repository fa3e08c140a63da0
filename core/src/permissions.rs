//! Permission resolver.
//!
//! Aggregates the permissions of every role held by the current identity into
//! one de-duplicated capability set and answers membership queries against it
//! synchronously.
//!
//! # Refresh
//!
//! 1. Fetch the identity's roles (through a [`ResourceSlot`]).
//! 2. Fetch each role's permissions concurrently.
//! 3. Once every per-role fetch has settled, replace the capability set in one
//!    commit.
//!
//! Each refresh takes a generation number. A refresh that finishes after a
//! newer one started is discarded, so out-of-order completion cannot leave a
//! stale capability set behind.
//!
//! A committed set is bound to the session epoch its refresh started under.
//! Once the session changes, every query answers `false` until a refresh for
//! the new identity commits.
//!
//! [`PermissionResolver::refresh_with_roles`] re-derives the set from a role
//! list synchronized elsewhere, so the capability set always follows the role
//! list last loaded for the identity.
//!
//! # Partial failure
//!
//! Under [`PartialFailurePolicy::Permissive`] a role whose permissions cannot be
//! fetched contributes nothing, the failure is logged and recorded, and the
//! rest of the set still commits. [`PartialFailurePolicy::Strict`] fails the
//! whole refresh instead and keeps the previous set.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;
use crate::error::ApiResult;
use crate::models::Role;
use crate::resource::ResourceEntry;
use crate::resource::ResourceSlot;
use crate::session::SessionStore;

/// What to do when some, but not all, per-role permission fetches fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialFailurePolicy {
    /// Commit the permissions of the roles that resolved.
    #[default]
    Permissive,
    /// Fail the refresh and keep the previous set.
    Strict,
}

/// Backend queries the resolver depends on.
///
/// Implemented over the HTTP gateway by [`crate::roles::RolesApi`]; tests
/// substitute in-memory sources.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// Roles assigned to the current identity.
    async fn my_roles(&self) -> ApiResult<Vec<Role>>;

    /// Permission tokens granted by `role_id`.
    async fn role_permissions(&self, role_id: i64) -> ApiResult<Vec<String>>;
}

/// A role whose permissions could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFailure {
    pub role_id: i64,
    pub role_name: String,
    pub error: ApiError,
}

/// Result of a refresh that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Every role resolved and the set was committed.
    Complete,
    /// The set was committed without the listed roles.
    Partial { failures: Vec<RoleFailure> },
    /// A newer refresh (or a session change) overtook this one; nothing was
    /// committed.
    Superseded,
}

#[derive(Debug)]
struct Committed {
    epoch: u64,
    roles: Vec<Role>,
    capabilities: BTreeSet<String>,
}

pub struct PermissionResolver {
    source: Arc<dyn RoleSource>,
    session: Arc<SessionStore>,
    policy: PartialFailurePolicy,
    roles: ResourceSlot<Vec<Role>>,
    generation: AtomicU64,
    committed: RwLock<Option<Committed>>,
    last_failures: RwLock<Vec<RoleFailure>>,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("policy", &self.policy)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

impl PermissionResolver {
    pub fn new(source: Arc<dyn RoleSource>, session: Arc<SessionStore>) -> Self {
        Self {
            source,
            session,
            policy: PartialFailurePolicy::default(),
            roles: ResourceSlot::new(),
            generation: AtomicU64::new(0),
            committed: RwLock::new(None),
            last_failures: RwLock::new(Vec::new()),
        }
    }

    pub fn with_policy(mut self, policy: PartialFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PartialFailurePolicy {
        self.policy
    }

    /// Re-resolves the capability set for the current identity.
    ///
    /// Returns `Err` when the role list cannot be fetched, or under the strict
    /// policy when any role fails. The previously committed set is kept in both
    /// cases.
    pub async fn refresh(&self) -> ApiResult<RefreshOutcome> {
        let (generation, epoch) = self.start_refresh();

        let roles = match self.roles.run(self.source.my_roles()).await {
            Ok(roles) => roles,
            Err(err) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    return Ok(RefreshOutcome::Superseded);
                }
                tracing::warn!("role list fetch failed: {err}");
                return Err(err);
            }
        };
        self.resolve(generation, epoch, roles).await
    }

    /// Re-derives the capability set from a role list the caller already
    /// synchronized, skipping the role-list fetch.
    ///
    /// Supersedes any refresh still in flight.
    pub async fn refresh_with_roles(&self, roles: Vec<Role>) -> ApiResult<RefreshOutcome> {
        let (generation, epoch) = self.start_refresh();
        self.roles.settle(&Ok(roles.clone()));
        self.resolve(generation, epoch, roles).await
    }

    fn start_refresh(&self) -> (u64, u64) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = self.session.epoch();
        tracing::debug!(generation, epoch, "permission refresh started");
        (generation, epoch)
    }

    async fn resolve(
        &self,
        generation: u64,
        epoch: u64,
        roles: Vec<Role>,
    ) -> ApiResult<RefreshOutcome> {
        let fetches = roles.iter().map(|role| async move {
            (role, self.source.role_permissions(role.id).await)
        });
        let mut capabilities = BTreeSet::new();
        let mut failures = Vec::new();
        for (role, result) in join_all(fetches).await {
            match result {
                Ok(permissions) => capabilities.extend(permissions),
                Err(error) => {
                    tracing::warn!(
                        role_id = role.id,
                        role = %role.name,
                        kind = %error.kind,
                        "role permissions unavailable"
                    );
                    failures.push(RoleFailure {
                        role_id: role.id,
                        role_name: role.name.clone(),
                        error,
                    });
                }
            }
        }

        let mut committed = self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_stale(generation, epoch) {
            tracing::debug!(generation, "discarding superseded permission refresh");
            return Ok(RefreshOutcome::Superseded);
        }

        *self
            .last_failures
            .write()
            .unwrap_or_else(PoisonError::into_inner) = failures.clone();

        if let (PartialFailurePolicy::Strict, Some(first)) = (self.policy, failures.first()) {
            tracing::warn!(
                failed = failures.len(),
                "strict policy: keeping previous capability set"
            );
            return Err(first.error.clone());
        }

        tracing::info!(
            roles = roles.len(),
            capabilities = capabilities.len(),
            failed = failures.len(),
            "capability set committed"
        );
        *committed = Some(Committed {
            epoch,
            roles,
            capabilities,
        });

        if failures.is_empty() {
            Ok(RefreshOutcome::Complete)
        } else {
            Ok(RefreshOutcome::Partial { failures })
        }
    }

    /// Whether the committed set for the current identity contains
    /// `permission`. `false` until a refresh has committed.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.with_current(|c| c.capabilities.contains(permission))
            .unwrap_or(false)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.with_current(|c| c.roles.iter().any(|role| role.name == name))
            .unwrap_or(false)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.with_current(|c| c.roles.clone()).unwrap_or_default()
    }

    pub fn capabilities(&self) -> BTreeSet<String> {
        self.with_current(|c| c.capabilities.clone())
            .unwrap_or_default()
    }

    /// Roles that failed during the last settled refresh.
    pub fn last_failures(&self) -> Vec<RoleFailure> {
        self.last_failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// State of the role-list fetch.
    pub fn roles_entry(&self) -> ResourceEntry<Vec<Role>> {
        self.roles.snapshot()
    }

    /// Forgets everything and discards refreshes still in flight.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.last_failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.roles.reset();
    }

    fn is_stale(&self, generation: u64, epoch: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation || self.session.epoch() != epoch
    }

    fn with_current<R>(&self, f: impl FnOnce(&Committed) -> R) -> Option<R> {
        let committed = self.committed.read().unwrap_or_else(PoisonError::into_inner);
        committed
            .as_ref()
            .filter(|c| c.epoch == self.session.epoch())
            .map(f)
    }
}
