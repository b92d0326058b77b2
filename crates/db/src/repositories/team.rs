//! Team repository.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{error, info};
use uuid::Uuid;

use opsledger_core::invoice::Patch;
use opsledger_shared::AppError;
use opsledger_shared::types::{PageRequest, PageResponse};

use crate::entities::{team_members, teams, users};

use super::{escape_like, is_unique_violation};

/// Error types for team operations.
#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    /// Team not found.
    #[error("Team not found: {0}")]
    NotFound(Uuid),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// User is not a member of the team.
    #[error("User {0} is not a member of this team")]
    MemberNotFound(Uuid),

    /// User is already a member of the team.
    #[error("User {0} is already a member of this team")]
    DuplicateMember(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<TeamError> for AppError {
    fn from(err: TeamError) -> Self {
        match err {
            TeamError::NotFound(_) | TeamError::UserNotFound(_) | TeamError::MemberNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            TeamError::DuplicateMember(_) => Self::Conflict(err.to_string()),
            TeamError::Database(e) => {
                error!(error = %e, "team query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct UpdateTeamInput {
    /// New name.
    pub name: Option<String>,
    /// Description.
    pub description: Patch<String>,
}

/// A team member with the user record.
#[derive(Debug, Clone)]
pub struct TeamMember {
    /// Membership row.
    pub membership: team_members::Model,
    /// The member.
    pub user: Option<users::Model>,
}

/// A team with its members.
#[derive(Debug, Clone)]
pub struct TeamDetail {
    /// The team.
    pub team: teams::Model,
    /// Members, in joining order.
    pub members: Vec<TeamMember>,
}

/// Team repository.
#[derive(Debug, Clone)]
pub struct TeamRepository {
    db: DatabaseConnection,
}

impl TeamRepository {
    /// Creates a new team repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a team.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<teams::Model, TeamError> {
        let timestamp = now.into();
        let team = teams::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(description),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await?;

        info!(team_id = %team.id, name = %team.name, "team created");
        Ok(team)
    }

    /// Lists teams ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<PageResponse<teams::Model>, TeamError> {
        let page = page.normalized();
        let mut condition = Condition::all();
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            condition =
                condition.add(Expr::col((teams::Entity, teams::Column::Name)).ilike(pattern.as_str()));
        }

        let total = teams::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let rows = teams::Entity::find()
            .filter(condition)
            .order_by_asc(teams::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Loads a team with its members.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn find_one(&self, id: Uuid) -> Result<TeamDetail, TeamError> {
        let team = find_team(&self.db, id).await?;
        let members = load_members(&self.db, id).await?;
        Ok(TeamDetail { team, members })
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateTeamInput,
        now: DateTime<Utc>,
    ) -> Result<teams::Model, TeamError> {
        let team = find_team(&self.db, id).await?;
        let description = input.description.apply(team.description.clone());

        let mut active: teams::ActiveModel = team.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        active.description = Set(description);
        active.updated_at = Set(now.into());

        let updated = active.update(&self.db).await?;
        info!(team_id = %id, "team updated");
        Ok(updated)
    }

    /// Deletes a team and its memberships.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn delete(&self, id: Uuid) -> Result<(), TeamError> {
        let result = teams::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(TeamError::NotFound(id));
        }

        info!(team_id = %id, "team deleted");
        Ok(())
    }

    /// Adds a user to a team.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `UserNotFound`, `DuplicateMember`, or a database error.
    pub async fn add_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TeamMember, TeamError> {
        find_team(&self.db, team_id).await?;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(TeamError::UserNotFound(user_id))?;

        let membership = team_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            team_id: Set(team_id),
            user_id: Set(user_id),
            joined_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TeamError::DuplicateMember(user_id)
            } else {
                TeamError::Database(e)
            }
        })?;

        info!(team_id = %team_id, user_id = %user_id, "team member added");
        Ok(TeamMember {
            membership,
            user: Some(user),
        })
    }

    /// Removes a user from a team.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `MemberNotFound`, or a database error.
    pub async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<(), TeamError> {
        find_team(&self.db, team_id).await?;

        let result = team_members::Entity::delete_many()
            .filter(team_members::Column::TeamId.eq(team_id))
            .filter(team_members::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TeamError::MemberNotFound(user_id));
        }

        info!(team_id = %team_id, user_id = %user_id, "team member removed");
        Ok(())
    }
}

async fn find_team<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<teams::Model, TeamError> {
    teams::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(TeamError::NotFound(id))
}

async fn load_members<C: ConnectionTrait>(db: &C, team_id: Uuid) -> Result<Vec<TeamMember>, DbErr> {
    Ok(team_members::Entity::find()
        .filter(team_members::Column::TeamId.eq(team_id))
        .order_by_asc(team_members::Column::JoinedAt)
        .find_also_related(users::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(membership, user)| TeamMember { membership, user })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_member_is_conflict() {
        let err = AppError::from(TeamError::DuplicateMember(Uuid::new_v4()));
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_missing_member_is_not_found() {
        let err = AppError::from(TeamError::MemberNotFound(Uuid::new_v4()));
        assert_eq!(err.status_code(), 404);
    }
}
