use sqlx::{Any, Executor, Pool};

use crate::{
    error::RecipeError,
    pagination::{PageContext, PageRequest},
    schema::{Recipe, RecipeShort, RelationKind, SubscriptionView, User, UserRole, UserView, Uuid},
};

use super::relation_exists;

pub async fn create_user(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    role: UserRole,
    pool: &Pool<Any>,
) -> Result<User, RecipeError> {
    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, username, first_name, last_name, role
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_id<'e, E>(user_id: Uuid, executor: E) -> Result<Option<User>, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let row: Option<User> = sqlx::query_as(
        "SELECT id, email, username, first_name, last_name, role FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// `viewer` is the requesting user, if any; it only decides `is_subscribed`.
pub async fn get_user_view(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Any>,
) -> Result<UserView, RecipeError> {
    let user = get_user_by_id(user_id, pool)
        .await?
        .ok_or(RecipeError::UserNotFound(user_id))?;

    let is_subscribed = match viewer {
        Some(viewer) => relation_exists(RelationKind::Follow, viewer, user.id, pool).await?,
        None => false,
    };

    Ok(UserView::from_user(user, is_subscribed))
}

pub async fn get_subscription_view(
    author_id: Uuid,
    viewer: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Any>,
) -> Result<SubscriptionView, RecipeError> {
    let author = get_user_view(author_id, Some(viewer), pool).await?;

    let recipes: Vec<Recipe> = match recipes_limit {
        Some(limit) => sqlx::query_as(
            "SELECT id, author_id, name, text, image, cooking_time, created_at FROM recipes WHERE author_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(author_id)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?,
        None => sqlx::query_as(
            "SELECT id, author_id, name, text, image, cooking_time, created_at FROM recipes WHERE author_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(author_id)
        .fetch_all(pool)
        .await?,
    };

    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await?;

    Ok(SubscriptionView {
        author,
        recipes: recipes.into_iter().map(RecipeShort::from).collect(),
        recipes_count: recipes_count.0,
    })
}

/// Authors `user_id` follows, each with their recipes.
pub async fn fetch_subscriptions(
    user_id: Uuid,
    request: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Any>,
) -> Result<PageContext<SubscriptionView>, RecipeError> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follow_edges WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let authors: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT author_id FROM follow_edges WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    let mut rows = Vec::with_capacity(authors.len());
    for (author_id,) in authors {
        rows.push(get_subscription_view(author_id, user_id, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(rows, total.0, request))
}
