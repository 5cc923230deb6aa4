use log::debug;
use sqlx::{Any, Executor, Pool};

use crate::{
    error::RecipeError,
    schema::{RelationKind, Uuid},
};

use super::{get_recipe, get_user_by_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationChange {
    Created,
    Removed,
}

pub async fn relation_exists<'e, E>(
    kind: RelationKind,
    subject: Uuid,
    object: Uuid,
    executor: E,
) -> Result<bool, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let query = format!(
        "SELECT id FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.object_column()
    );
    let result: Option<(Uuid,)> = sqlx::query_as(&query)
        .bind(subject)
        .bind(object)
        .fetch_optional(executor)
        .await?;

    Ok(result.is_some())
}

async fn ensure_target(kind: RelationKind, object: Uuid, pool: &Pool<Any>) -> Result<(), RecipeError> {
    match kind {
        RelationKind::Follow => {
            if get_user_by_id(object, pool).await?.is_none() {
                return Err(RecipeError::UserNotFound(object));
            }
        }
        RelationKind::Favorite | RelationKind::Cart => {
            if get_recipe(object, pool).await?.is_none() {
                return Err(RecipeError::RecipeNotFound(object));
            }
        }
    }
    Ok(())
}

/// Marks `subject` as favoriting, carting or following `object`.
pub async fn add_relation(
    kind: RelationKind,
    subject: Uuid,
    object: Uuid,
    pool: &Pool<Any>,
) -> Result<RelationChange, RecipeError> {
    if kind == RelationKind::Follow && subject == object {
        return Err(RecipeError::SelfFollowForbidden);
    }
    ensure_target(kind, object, pool).await?;

    let query = format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table(),
        kind.object_column()
    );
    let result = sqlx::query(&query)
        .bind(subject)
        .bind(object)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RecipeError::AlreadyExists);
    }

    debug!("{kind:?} {subject} -> {object} created");
    Ok(RelationChange::Created)
}

pub async fn remove_relation(
    kind: RelationKind,
    subject: Uuid,
    object: Uuid,
    pool: &Pool<Any>,
) -> Result<RelationChange, RecipeError> {
    ensure_target(kind, object, pool).await?;

    let query = format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.object_column()
    );
    let result = sqlx::query(&query)
        .bind(subject)
        .bind(object)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RecipeError::NotFound);
    }

    debug!("{kind:?} {subject} -> {object} removed");
    Ok(RelationChange::Removed)
}
