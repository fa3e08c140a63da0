//! Static analysis runs and per-project history.
//!
//! History is newest first: a freshly run analysis is prepended and becomes the
//! current one, while loading a project's history replaces the whole list.

use crate::error::ApiResult;
use crate::gateway::HttpGateway;
use crate::models::AnalysisResult;
use crate::models::DataEnvelope;
use crate::models::RunAnalysisRequest;
use crate::resource::Collection;
use crate::resource::InsertPosition;

#[derive(Debug)]
pub struct AnalysisApi {
    gateway: HttpGateway,
    history: Collection<AnalysisResult>,
}

impl AnalysisApi {
    pub fn new(gateway: HttpGateway) -> Self {
        Self {
            gateway,
            history: Collection::new(),
        }
    }

    pub fn state(&self) -> &Collection<AnalysisResult> {
        &self.history
    }

    pub async fn run(&self, project_id: &str, file_path: &str) -> ApiResult<AnalysisResult> {
        let request = RunAnalysisRequest {
            project_id: project_id.to_string(),
            file_path: file_path.to_string(),
        };
        self.history
            .create_selected(InsertPosition::Prepend, async {
                let body: DataEnvelope<AnalysisResult> =
                    self.gateway.post("/analysis/analyze", &request).await?;
                Ok(body.data)
            })
            .await
    }

    pub async fn get(&self, analysis_id: &str) -> ApiResult<AnalysisResult> {
        let path = format!("/analysis/{analysis_id}");
        self.history
            .fetch_one(async {
                let body: DataEnvelope<AnalysisResult> = self.gateway.get(&path).await?;
                Ok(body.data)
            })
            .await
    }

    pub async fn history(&self, project_id: &str) -> ApiResult<Vec<AnalysisResult>> {
        let path = format!("/analysis/project/{project_id}");
        self.history
            .fetch_all(async {
                let body: DataEnvelope<Vec<AnalysisResult>> = self.gateway.get(&path).await?;
                Ok(body.data)
            })
            .await
    }
}
