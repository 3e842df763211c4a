use async_trait::async_trait;
use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{
    DrillingPath, NewProject, Project, ProjectId, ProjectUpdate,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{from_db_int, to_db_int, PostgresStore};
use crate::ports::ProjectStore;

const PROJECT_COLUMNS: &str = "id, name, current_index, meters_drilled, precision_improvement, \
     image_quality, initial_image_url, current_image_url, external_api_url, polling_active, \
     polling_interval, drilling_path_data, created_at, updated_at";

fn project_from_row(row: &PgRow) -> Result<Project> {
    let get_err = |e: sqlx::Error| GeodrillError::Storage(format!("Failed to read project row: {}", e));

    let id: Uuid = row.try_get("id").map_err(get_err)?;
    let current_index: i64 = row.try_get("current_index").map_err(get_err)?;
    let polling_interval: i64 = row.try_get("polling_interval").map_err(get_err)?;
    let path: Option<Json<DrillingPath>> = row.try_get("drilling_path_data").map_err(get_err)?;

    Ok(Project {
        id: ProjectId(id),
        name: row.try_get("name").map_err(get_err)?,
        current_index: from_db_int(current_index, "current_index")?,
        meters_drilled: row.try_get("meters_drilled").map_err(get_err)?,
        precision_improvement: row.try_get("precision_improvement").map_err(get_err)?,
        image_quality: row.try_get("image_quality").map_err(get_err)?,
        initial_image_url: row.try_get("initial_image_url").map_err(get_err)?,
        current_image_url: row.try_get("current_image_url").map_err(get_err)?,
        external_api_url: row.try_get("external_api_url").map_err(get_err)?,
        polling_active: row.try_get("polling_active").map_err(get_err)?,
        polling_interval: from_db_int(polling_interval, "polling_interval")?,
        drilling_path_data: path.map(|Json(path)| path),
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

#[async_trait]
impl ProjectStore for PostgresStore {
    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let created = Project::create(ProjectId::new(), project);

        let query = format!(
            r#"
            INSERT INTO projects (id, name, current_index, meters_drilled, precision_improvement,
                image_quality, external_api_url, polling_active, polling_interval,
                drilling_path_data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(created.id.0)
            .bind(&created.name)
            .bind(to_db_int(created.current_index, "current_index")?)
            .bind(created.meters_drilled)
            .bind(created.precision_improvement)
            .bind(created.image_quality)
            .bind(&created.external_api_url)
            .bind(created.polling_active)
            .bind(to_db_int(created.polling_interval, "polling_interval")?)
            .bind(created.drilling_path_data.clone().map(Json))
            .bind(created.created_at)
            .bind(created.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GeodrillError::Storage(format!("Failed to create project: {}", e)))?;

        project_from_row(&row)
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let query = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GeodrillError::Storage(format!("Failed to get project: {}", e)))?;

        row.as_ref().map(project_from_row).transpose()
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let query = format!(
            "SELECT {} FROM projects ORDER BY created_at DESC",
            PROJECT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GeodrillError::Storage(format!("Failed to list projects: {}", e)))?;

        rows.iter().map(project_from_row).collect()
    }

    async fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> Result<Project> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE projects SET updated_at = NOW()");

        if let Some(name) = &update.name {
            builder.push(", name = ").push_bind(name.clone());
        }
        if let Some(url) = &update.external_api_url {
            builder.push(", external_api_url = ").push_bind(url.clone());
        }
        if let Some(interval) = update.polling_interval {
            builder
                .push(", polling_interval = ")
                .push_bind(to_db_int(interval, "polling_interval")?);
        }
        if let Some(index) = update.current_index {
            builder
                .push(", current_index = ")
                .push_bind(to_db_int(index, "current_index")?);
        }
        if let Some(metrics) = update.metrics {
            builder
                .push(", meters_drilled = ")
                .push_bind(metrics.meters_drilled)
                .push(", precision_improvement = ")
                .push_bind(metrics.precision_improvement)
                .push(", image_quality = ")
                .push_bind(metrics.image_quality);
        }
        if let Some(url) = &update.initial_image_url {
            builder.push(", initial_image_url = ").push_bind(url.clone());
        }
        if let Some(url) = &update.current_image_url {
            builder.push(", current_image_url = ").push_bind(url.clone());
        }
        if let Some(active) = update.polling_active {
            builder.push(", polling_active = ").push_bind(active);
        }
        if let Some(path) = &update.drilling_path_data {
            builder
                .push(", drilling_path_data = ")
                .push_bind(path.clone().map(Json));
        }

        builder.push(" WHERE id = ").push_bind(id.0);
        builder.push(" RETURNING ").push(PROJECT_COLUMNS);

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GeodrillError::Storage(format!("Failed to update project: {}", e)))?;

        match row {
            Some(row) => project_from_row(&row),
            None => Err(GeodrillError::ProjectNotFound { id: id.to_string() }),
        }
    }
}
