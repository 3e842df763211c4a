use async_trait::async_trait;
use geodrill_core::error::Result;
use geodrill_core::models::{
    ChatMessage, NewMessage, NewProject, Project, ProjectId, ProjectUpdate,
};

/// Port for project records
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert a fresh project with an empty path and floor metrics
    async fn create_project(&self, project: &NewProject) -> Result<Project>;

    /// Retrieve a project by ID
    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>>;

    /// List all projects, newest first
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Write the fields present in `update` and return the stored record.
    ///
    /// Fails with `ProjectNotFound` when the project does not exist.
    async fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> Result<Project>;
}

/// Port for the per-project message log
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message to a project's log
    async fn insert_message(&self, message: &NewMessage) -> Result<ChatMessage>;

    /// List a project's messages ordered by creation time
    async fn list_messages(&self, project_id: ProjectId) -> Result<Vec<ChatMessage>>;
}

/// Port for frame image storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key` and return the public URL of the object
    async fn store_object(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String>;
}
