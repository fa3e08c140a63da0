//! Wires the session, gateway, resources and permission layer together.

use std::sync::Arc;

use solguard_keyring_store::DefaultKeyringStore;
use solguard_keyring_store::KeyringStore;

use crate::ai::AiApi;
use crate::analysis::AnalysisApi;
use crate::audit::AuditApi;
use crate::auth::AuthApi;
use crate::config::ClientConfig;
use crate::config::ConfigError;
use crate::config::CredentialStoreKind;
use crate::gate::CapabilityGate;
use crate::gateway::HttpGateway;
use crate::permissions::PermissionResolver;
use crate::projects::ProjectsApi;
use crate::roles::RolesApi;
use crate::session::CredentialPersistence;
use crate::session::SessionStore;
use crate::token_storage::FileTokenStorage;

/// One dashboard client per process.
#[derive(Debug)]
pub struct DashboardClient {
    config: ClientConfig,
    session: Arc<SessionStore>,
    auth: AuthApi,
    projects: ProjectsApi,
    analysis: AnalysisApi,
    ai: AiApi,
    roles: Arc<RolesApi>,
    audit: AuditApi,
    resolver: Arc<PermissionResolver>,
    gate: CapabilityGate,
}

impl DashboardClient {
    /// Builds a client whose session is persisted as `config` says, restoring
    /// any credential saved by an earlier run.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let session = match credential_backend(&config) {
            Some(backend) => {
                let persistence =
                    CredentialPersistence::new(backend).with_key(config.token_key.clone());
                SessionStore::with_persistence(persistence)
            }
            None => SessionStore::new(),
        };
        session.restore();
        Self::with_session(config, Arc::new(session))
    }

    /// Builds a client around an existing session store.
    pub fn with_session(
        config: ClientConfig,
        session: Arc<SessionStore>,
    ) -> Result<Self, ConfigError> {
        let gateway = HttpGateway::new(&config, session.clone())?;
        Ok(Self::from_gateway(config, gateway))
    }

    /// Builds a client on a ready gateway.
    pub fn from_gateway(config: ClientConfig, gateway: HttpGateway) -> Self {
        let session = gateway.session().clone();
        let roles = Arc::new(RolesApi::new(gateway.clone()));
        let resolver = Arc::new(
            PermissionResolver::new(roles.clone(), session.clone())
                .with_policy(config.partial_failure_policy),
        );
        roles.attach(&resolver);
        let gate = CapabilityGate::new(session.clone(), resolver.clone());
        Self {
            auth: AuthApi::new(gateway.clone()),
            projects: ProjectsApi::new(gateway.clone()),
            analysis: AnalysisApi::new(gateway.clone()),
            ai: AiApi::new(gateway.clone()),
            audit: AuditApi::new(gateway),
            config,
            session,
            roles,
            resolver,
            gate,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub fn projects(&self) -> &ProjectsApi {
        &self.projects
    }

    pub fn analysis(&self) -> &AnalysisApi {
        &self.analysis
    }

    pub fn ai(&self) -> &AiApi {
        &self.ai
    }

    pub fn roles(&self) -> &RolesApi {
        &self.roles
    }

    pub fn audit(&self) -> &AuditApi {
        &self.audit
    }

    pub fn permissions(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.gate
    }

    /// Ends the session and drops everything derived from it.
    pub async fn logout(&self) {
        self.auth.logout().await;
        self.resolver.clear();
        self.projects.state().reset();
        self.analysis.state().reset();
        self.ai.state().reset();
        self.roles.assigned().reset();
        self.roles.catalogue().reset();
        self.audit.page().reset();
    }
}

fn credential_backend(config: &ClientConfig) -> Option<Arc<dyn KeyringStore>> {
    match config.credential_store {
        CredentialStoreKind::Keyring => Some(Arc::new(DefaultKeyringStore)),
        CredentialStoreKind::File => Some(Arc::new(FileTokenStorage::in_home(&config.home))),
        CredentialStoreKind::Memory => None,
    }
}
