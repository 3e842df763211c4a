//! In-memory storage implementations for development and testing.
//!
//! These implementations use `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For production workloads, use the PostgreSQL backend.

use async_trait::async_trait;
use chrono::Utc;
use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{
    ChatMessage, MessageId, NewMessage, NewProject, Project, ProjectId, ProjectUpdate,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ports::{MessageStore, ObjectStorage, ProjectStore};

/// In-memory implementation of ProjectStore
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectStore {
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
}

impl MemoryProjectStore {
    /// Create a new in-memory project store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a full project record
    pub fn put(&self, project: Project) {
        self.projects.write().unwrap().insert(project.id, project);
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let created = Project::create(ProjectId::new(), project);
        self.projects.write().unwrap().insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.projects.read().unwrap().get(&id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.projects.read().unwrap().values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> Result<Project> {
        let mut projects = self.projects.write().unwrap();
        let project = projects.get_mut(&id).ok_or_else(|| GeodrillError::ProjectNotFound {
            id: id.to_string(),
        })?;
        project.apply(update);
        Ok(project.clone())
    }
}

/// In-memory implementation of MessageStore
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
}

impl MemoryMessageStore {
    /// Create a new in-memory message store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of messages across all projects
    pub fn len(&self) -> usize {
        self.messages.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert_message(&self, message: &NewMessage) -> Result<ChatMessage> {
        let stored = ChatMessage {
            id: MessageId::new(),
            project_id: message.project_id,
            role: message.role,
            content: message.content.clone(),
            image_url: message.image_url.clone(),
            created_at: Utc::now(),
        };
        self.messages.write().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, project_id: ProjectId) -> Result<Vec<ChatMessage>> {
        // Insertion order is creation order
        Ok(self
            .messages
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }
}

/// Object stored in memory
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory implementation of ObjectStorage
#[derive(Debug, Clone)]
pub struct MemoryObjectStorage {
    bucket: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryObjectStorage {
    /// Create a new in-memory object storage for `bucket`
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::default(),
        }
    }

    pub fn get_object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Public URL an object stored under `key` is published at
    pub fn public_url(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("project-images")
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn store_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        self.objects.write().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.public_url(key))
    }
}
