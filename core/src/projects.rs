//! Projects resource.

use crate::error::ApiResult;
use crate::gateway::HttpGateway;
use crate::models::DataEnvelope;
use crate::models::NewProject;
use crate::models::Project;
use crate::models::ProjectUpdate;
use crate::resource::Collection;
use crate::resource::InsertPosition;

#[derive(Debug)]
pub struct ProjectsApi {
    gateway: HttpGateway,
    projects: Collection<Project>,
}

impl ProjectsApi {
    pub fn new(gateway: HttpGateway) -> Self {
        Self {
            gateway,
            projects: Collection::new(),
        }
    }

    /// Synchronized list and "current project".
    pub fn state(&self) -> &Collection<Project> {
        &self.projects
    }

    pub async fn list(&self) -> ApiResult<Vec<Project>> {
        self.projects
            .fetch_all(async {
                let body: DataEnvelope<Vec<Project>> = self.gateway.get("/projects").await?;
                Ok(body.data)
            })
            .await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Project> {
        let path = format!("/projects/{id}");
        self.projects
            .fetch_one(async {
                let body: DataEnvelope<Project> = self.gateway.get(&path).await?;
                Ok(body.data)
            })
            .await
    }

    pub async fn create(&self, project: &NewProject) -> ApiResult<Project> {
        self.projects
            .create(InsertPosition::Append, async {
                let body: DataEnvelope<Project> = self.gateway.post("/projects", project).await?;
                Ok(body.data)
            })
            .await
    }

    pub async fn update(&self, id: &str, update: &ProjectUpdate) -> ApiResult<Project> {
        let path = format!("/projects/{id}");
        self.projects
            .update(async {
                let body: DataEnvelope<Project> = self.gateway.put(&path, update).await?;
                Ok(body.data)
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let path = format!("/projects/{id}");
        self.projects
            .delete(id.to_string(), self.gateway.delete(&path))
            .await
    }
}
