//! Root of the `solguard-core` library.
//!
//! Client-side authorization and data synchronization for the SolGuard
//! dashboard: the session store, the HTTP gateway, the permission resolver,
//! the generic resource synchronizer and the capability gate, plus one API
//! type per backend resource.

// Library code reports through `tracing`; only the binary prints.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod ai;
pub mod analysis;
pub mod audit;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod models;
pub mod permissions;
pub mod projects;
pub mod resource;
pub mod roles;
pub mod session;
pub mod token_storage;

pub use client::DashboardClient;
pub use config::ClientConfig;
pub use config::ConfigLoader;
pub use error::ApiError;
pub use error::ApiResult;
pub use error::ErrorKind;
pub use gate::Access;
pub use gate::CapabilityGate;
pub use gateway::HttpGateway;
pub use permissions::PartialFailurePolicy;
pub use permissions::PermissionResolver;
pub use permissions::RefreshOutcome;
pub use resource::Collection;
pub use resource::ResourceSlot;
pub use resource::ResourceStatus;
pub use session::SessionStore;
