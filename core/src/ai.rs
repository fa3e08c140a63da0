//! AI-assisted analysis operations.
//!
//! Unlike the other resources these endpoints answer with bare JSON bodies in
//! camelCase. Each operation kind owns its own slot; analyses and suggestions
//! also accumulate in an in-memory history.

use std::sync::Mutex;
use std::sync::PoisonError;

use crate::error::ApiResult;
use crate::gateway::HttpGateway;
use crate::models::AiAnalysis;
use crate::models::CodeRequest;
use crate::models::GenerateRequest;
use crate::models::GeneratedCode;
use crate::models::ModelConfigs;
use crate::models::SecurityPattern;
use crate::models::VulnerabilityAnalysis;
use crate::models::VulnerabilityRequest;
use crate::resource::ResourceSlot;

#[derive(Debug, Default)]
pub struct AiState {
    pub current: ResourceSlot<AiAnalysis>,
    pub generated: ResourceSlot<GeneratedCode>,
    pub vulnerability: ResourceSlot<VulnerabilityAnalysis>,
    pub patterns: ResourceSlot<Vec<SecurityPattern>>,
    pub model_configs: ResourceSlot<ModelConfigs>,
    history: Mutex<Vec<AiAnalysis>>,
}

impl AiState {
    /// Analyses and suggestions, oldest first.
    pub fn history(&self) -> Vec<AiAnalysis> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drops every result and the history.
    pub fn reset(&self) {
        self.current.reset();
        self.generated.reset();
        self.vulnerability.reset();
        self.patterns.reset();
        self.model_configs.reset();
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, analysis: &AiAnalysis) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(analysis.clone());
    }
}

#[derive(Debug)]
pub struct AiApi {
    gateway: HttpGateway,
    state: AiState,
}

impl AiApi {
    pub fn new(gateway: HttpGateway) -> Self {
        Self {
            gateway,
            state: AiState::default(),
        }
    }

    pub fn state(&self) -> &AiState {
        &self.state
    }

    pub async fn analyze(&self, code: &str, project_id: &str) -> ApiResult<AiAnalysis> {
        self.code_operation("/ai/analyze", code, project_id).await
    }

    pub async fn suggest(&self, code: &str, project_id: &str) -> ApiResult<AiAnalysis> {
        self.code_operation("/ai/suggest", code, project_id).await
    }

    pub async fn generate(&self, requirements: &str, project_id: &str) -> ApiResult<GeneratedCode> {
        let request = GenerateRequest {
            requirements: requirements.to_string(),
            project_id: project_id.to_string(),
        };
        self.state
            .generated
            .run(self.gateway.post("/ai/generate", &request))
            .await
    }

    pub async fn analyze_vulnerability(
        &self,
        vulnerability_id: &str,
        project_id: &str,
    ) -> ApiResult<VulnerabilityAnalysis> {
        let request = VulnerabilityRequest {
            vulnerability_id: vulnerability_id.to_string(),
            project_id: project_id.to_string(),
        };
        self.state
            .vulnerability
            .run(self.gateway.post("/ai/analyze-vulnerability", &request))
            .await
    }

    pub async fn patterns(&self, project_id: &str) -> ApiResult<Vec<SecurityPattern>> {
        let query = [("project_id", Some(project_id.to_string()))];
        self.state
            .patterns
            .run(self.gateway.get_with_query("/ai/patterns", &query))
            .await
    }

    pub async fn model_configs(&self, project_id: &str) -> ApiResult<ModelConfigs> {
        let query = [("project_id", Some(project_id.to_string()))];
        self.state
            .model_configs
            .run(self.gateway.get_with_query("/ai/model-configs", &query))
            .await
    }

    async fn code_operation(
        &self,
        path: &str,
        code: &str,
        project_id: &str,
    ) -> ApiResult<AiAnalysis> {
        let request = CodeRequest {
            code: code.to_string(),
            project_id: project_id.to_string(),
        };
        let result = self
            .state
            .current
            .run(self.gateway.post(path, &request))
            .await;
        if let Ok(analysis) = &result {
            self.state.record(analysis);
        }
        result
    }
}
