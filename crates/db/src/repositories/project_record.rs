//! Project documents and the project activity log.
//!
//! Both hang off a project; every call first checks the project lies in the
//! caller's scope and then addresses rows by `(project_id, id)`.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::info;
use uuid::Uuid;

use opsledger_core::access::Principal;
use opsledger_core::invoice::Patch;
use opsledger_shared::types::{PageRequest, PageResponse};

use crate::entities::sea_orm_active_enums::DocumentType;
use crate::entities::{files, project_activities, project_documents};

use super::project::{ProjectError, visible_project};

/// A document with its stored file.
#[derive(Debug, Clone)]
pub struct ProjectDocument {
    /// Document row.
    pub document: project_documents::Model,
    /// Stored file.
    pub file: Option<files::Model>,
}

/// Input for recording an activity.
#[derive(Debug, Clone)]
pub struct CreateActivityInput {
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// When it happened (now when absent).
    pub activity_date: Option<DateTime<Utc>>,
}

/// Partial activity update.
#[derive(Debug, Clone, Default)]
pub struct UpdateActivityInput {
    /// New title.
    pub title: Option<String>,
    /// Description.
    pub description: Patch<String>,
    /// New date.
    pub activity_date: Option<DateTime<Utc>>,
}

/// Repository for documents and activities attached to projects.
#[derive(Debug, Clone)]
pub struct ProjectRecordRepository {
    db: DatabaseConnection,
}

impl ProjectRecordRepository {
    /// Creates a new project record repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an uploaded file as a project document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, or a database error.
    pub async fn add_document(
        &self,
        principal: &Principal,
        project_id: Uuid,
        name: String,
        document_type: DocumentType,
        file: files::Model,
        now: DateTime<Utc>,
    ) -> Result<ProjectDocument, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;

        let timestamp = now.into();
        let document = project_documents::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            name: Set(name),
            document_type: Set(document_type),
            file_id: Set(file.id),
            uploaded_by_id: Set(principal.user_id),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await?;

        info!(project_id = %project_id, document_id = %document.id, "project document added");
        Ok(ProjectDocument {
            document,
            file: Some(file),
        })
    }

    /// Lists a project's documents, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, or a database error.
    pub async fn list_documents(
        &self,
        principal: &Principal,
        project_id: Uuid,
    ) -> Result<Vec<ProjectDocument>, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;

        Ok(project_documents::Entity::find()
            .filter(project_documents::Column::ProjectId.eq(project_id))
            .order_by_desc(project_documents::Column::CreatedAt)
            .find_also_related(files::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|(document, file)| ProjectDocument { document, file })
            .collect())
    }

    /// Renames or retypes a document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `DocumentNotFound`, or a database error.
    pub async fn update_document(
        &self,
        principal: &Principal,
        project_id: Uuid,
        id: Uuid,
        name: Option<String>,
        document_type: Option<DocumentType>,
        now: DateTime<Utc>,
    ) -> Result<project_documents::Model, ProjectError> {
        let document = self.find_document(principal, project_id, id).await?;

        let mut active: project_documents::ActiveModel = document.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(document_type) = document_type {
            active.document_type = Set(document_type);
        }
        active.updated_at = Set(now.into());

        let updated = active.update(&self.db).await?;
        info!(project_id = %project_id, document_id = %id, "project document updated");
        Ok(updated)
    }

    /// Deletes a document row and returns its file so the caller can remove
    /// the stored object.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `DocumentNotFound`, or a database error.
    pub async fn delete_document(
        &self,
        principal: &Principal,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<files::Model>, ProjectError> {
        let document = self.find_document(principal, project_id, id).await?;
        let file = files::Entity::find_by_id(document.file_id).one(&self.db).await?;

        project_documents::Entity::delete_by_id(id).exec(&self.db).await?;

        info!(project_id = %project_id, document_id = %id, "project document deleted");
        Ok(file)
    }

    /// Records an activity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, or a database error.
    pub async fn add_activity(
        &self,
        principal: &Principal,
        project_id: Uuid,
        input: CreateActivityInput,
        now: DateTime<Utc>,
    ) -> Result<project_activities::Model, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;

        let timestamp = now.into();
        let activity = project_activities::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            title: Set(input.title),
            description: Set(input.description),
            activity_date: Set(input.activity_date.unwrap_or(now).into()),
            created_by_id: Set(principal.user_id),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await?;

        info!(project_id = %project_id, activity_id = %activity.id, "project activity recorded");
        Ok(activity)
    }

    /// Lists a project's activities, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, or a database error.
    pub async fn list_activities(
        &self,
        principal: &Principal,
        project_id: Uuid,
        page: PageRequest,
    ) -> Result<PageResponse<project_activities::Model>, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;
        let page = page.normalized();

        let query = project_activities::Entity::find()
            .filter(project_activities::Column::ProjectId.eq(project_id));

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(project_activities::Column::ActivityDate)
            .order_by_desc(project_activities::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Applies a partial update to an activity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `ActivityNotFound`, or a database error.
    pub async fn update_activity(
        &self,
        principal: &Principal,
        project_id: Uuid,
        id: Uuid,
        input: UpdateActivityInput,
        now: DateTime<Utc>,
    ) -> Result<project_activities::Model, ProjectError> {
        let activity = self.find_activity(principal, project_id, id).await?;
        let description = input.description.apply(activity.description.clone());

        let mut active: project_activities::ActiveModel = activity.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(activity_date) = input.activity_date {
            active.activity_date = Set(activity_date.into());
        }
        active.description = Set(description);
        active.updated_at = Set(now.into());

        let updated = active.update(&self.db).await?;
        info!(project_id = %project_id, activity_id = %id, "project activity updated");
        Ok(updated)
    }

    /// Deletes an activity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `ActivityNotFound`, or a database error.
    pub async fn delete_activity(
        &self,
        principal: &Principal,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<(), ProjectError> {
        self.find_activity(principal, project_id, id).await?;
        project_activities::Entity::delete_by_id(id).exec(&self.db).await?;

        info!(project_id = %project_id, activity_id = %id, "project activity deleted");
        Ok(())
    }

    async fn find_document(
        &self,
        principal: &Principal,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<project_documents::Model, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;
        project_documents::Entity::find_by_id(id)
            .filter(project_documents::Column::ProjectId.eq(project_id))
            .one(&self.db)
            .await?
            .ok_or(ProjectError::DocumentNotFound(id))
    }

    async fn find_activity(
        &self,
        principal: &Principal,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<project_activities::Model, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;
        project_activities::Entity::find_by_id(id)
            .filter(project_activities::Column::ProjectId.eq(project_id))
            .one(&self.db)
            .await?
            .ok_or(ProjectError::ActivityNotFound(id))
    }
}
