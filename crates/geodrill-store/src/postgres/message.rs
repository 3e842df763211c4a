use async_trait::async_trait;
use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{ChatMessage, MessageId, MessageRole, NewMessage, ProjectId};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::PostgresStore;
use crate::ports::MessageStore;

fn message_from_row(row: &PgRow) -> Result<ChatMessage> {
    let get_err = |e: sqlx::Error| GeodrillError::Storage(format!("Failed to read message row: {}", e));

    let id: Uuid = row.try_get("id").map_err(get_err)?;
    let project_id: Uuid = row.try_get("project_id").map_err(get_err)?;
    let role: String = row.try_get("role").map_err(get_err)?;
    let role = MessageRole::parse(&role)
        .ok_or_else(|| GeodrillError::Storage(format!("Unknown message role: {}", role)))?;

    Ok(ChatMessage {
        id: MessageId(id),
        project_id: ProjectId(project_id),
        role,
        content: row.try_get("content").map_err(get_err)?,
        image_url: row.try_get("image_url").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
    })
}

#[async_trait]
impl MessageStore for PostgresStore {
    async fn insert_message(&self, message: &NewMessage) -> Result<ChatMessage> {
        let row = sqlx::query(
            r#"
            INSERT INTO chat_messages (id, project_id, role, content, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, role, content, image_url, created_at
            "#,
        )
        .bind(MessageId::new().0)
        .bind(message.project_id.0)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&message.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GeodrillError::Storage(format!("Failed to insert message: {}", e)))?;

        message_from_row(&row)
    }

    async fn list_messages(&self, project_id: ProjectId) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, role, content, image_url, created_at
            FROM chat_messages
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GeodrillError::Storage(format!("Failed to list messages: {}", e)))?;

        rows.iter().map(message_from_row).collect()
    }
}
