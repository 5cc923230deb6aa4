use sqlx::{Any, Executor, Pool};

use crate::{
    error::RecipeError,
    schema::{Tag, Uuid},
};

pub async fn create_tag(
    name: &str,
    slug: &str,
    color: &str,
    pool: &Pool<Any>,
) -> Result<Tag, RecipeError> {
    let tag: Tag = sqlx::query_as(
        "INSERT INTO tags (name, slug, color) VALUES ($1, $2, $3) RETURNING id, name, slug, color",
    )
    .bind(name)
    .bind(slug)
    .bind(color)
    .fetch_one(pool)
    .await?;

    Ok(tag)
}

pub async fn get_tag<'e, E>(id: Uuid, executor: E) -> Result<Option<Tag>, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, slug, color FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Any>) -> Result<Vec<Tag>, RecipeError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, slug, color FROM tags ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_recipe_tags<'e, E>(recipe_id: Uuid, executor: E) -> Result<Vec<Tag>, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id, t.name, t.slug, t.color
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await?;

    Ok(list)
}
