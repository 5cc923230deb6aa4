use sqlx::{Any, Executor, Pool};

use crate::{
    error::RecipeError,
    schema::{Ingredient, IngredientLine, RecipeIngredient, Uuid},
};

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Any>,
) -> Result<Ingredient, RecipeError> {
    let ingredient: Ingredient = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        RETURNING id, name, measurement_unit
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await?;

    Ok(ingredient)
}

pub async fn get_ingredient<'e, E>(id: Uuid, executor: E) -> Result<Option<Ingredient>, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let row: Option<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

    Ok(row)
}

fn escape_like(value: &str) -> String {
    value
        .chars()
        .fold(String::with_capacity(value.len()), |mut s, c| {
            if matches!(c, '\\' | '%' | '_') {
                s.push('\\');
            }
            s.push(c);
            s
        })
}

/// Ingredients whose name starts with `name` (case-insensitive), by name.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Any>,
) -> Result<Vec<Ingredient>, RecipeError> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => sqlx::query_as(
            "
            SELECT id, name, measurement_unit FROM ingredients
            WHERE LOWER(name) LIKE $1 ESCAPE '\\'
            ORDER BY name, id
        ",
        )
        .bind(format!("{}%", escape_like(&name.to_lowercase())))
        .fetch_all(pool)
        .await?,
        None => {
            sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn list_recipe_ingredients<'e, E>(
    recipe_id: Uuid,
    executor: E,
) -> Result<Vec<RecipeIngredient>, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, l.amount AS amount
        FROM ingredient_lines l
        INNER JOIN ingredients i ON i.id = l.ingredient_id
        WHERE l.recipe_id = $1
        ORDER BY l.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

pub async fn list_ingredient_lines<'e, E>(
    recipe_id: Uuid,
    executor: E,
) -> Result<Vec<IngredientLine>, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let rows: Vec<IngredientLine> = sqlx::query_as(
        "SELECT id, recipe_id, ingredient_id, amount FROM ingredient_lines WHERE recipe_id = $1 ORDER BY id",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
