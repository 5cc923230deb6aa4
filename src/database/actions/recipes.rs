use chrono::Utc;
use log::{debug, info};
use sqlx::{Any, AnyConnection, Executor, Pool};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    error::RecipeError,
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{Recipe, RecipeFields, RecipeView, RelationKind, UserView, Uuid},
    validation::ValidatedRecipeInput,
};

use super::{
    get_ingredient, get_tag, get_user_by_id, list_recipe_ingredients, list_recipe_tags,
    relation_exists,
};

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.created_at";

pub async fn get_recipe<'e, E>(id: Uuid, executor: E) -> Result<Option<Recipe>, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let row: Option<Recipe> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Loads a recipe the session is allowed to change: its own, or any for admins.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Any>,
) -> Result<Recipe, RecipeError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or(RecipeError::RecipeNotFound(id))?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if session.is_admin || recipe.author_id == session.user_id {
        Ok(recipe)
    } else {
        Err(RecipeError::Forbidden)
    }
}

/// Resolves every tag and ingredient of `input` and links them to the recipe.
async fn associate(
    recipe_id: Uuid,
    input: &ValidatedRecipeInput,
    conn: &mut AnyConnection,
) -> Result<(), RecipeError> {
    for &tag_id in &input.tags {
        if get_tag(tag_id, &mut *conn).await?.is_none() {
            return Err(RecipeError::TagNotFound(tag_id));
        }

        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    for ingredient in &input.ingredients {
        if get_ingredient(ingredient.id, &mut *conn).await?.is_none() {
            return Err(RecipeError::IngredientNotFound(ingredient.id));
        }

        sqlx::query(
            "INSERT INTO ingredient_lines (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(ingredient.id)
        .bind(ingredient.amount)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Inserts a recipe with its tags and ingredient lines in one transaction.
pub async fn create_recipe(
    author_id: Uuid,
    fields: RecipeFields,
    input: &ValidatedRecipeInput,
    pool: &Pool<Any>,
) -> Result<Recipe, RecipeError> {
    let mut tr = pool.begin().await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, author_id, name, text, image, cooking_time, created_at
    ",
    )
    .bind(author_id)
    .bind(fields.name)
    .bind(fields.text)
    .bind(fields.image.unwrap_or_default())
    .bind(fields.cooking_time)
    .bind(Utc::now().timestamp())
    .fetch_one(&mut *tr)
    .await?;

    // An early return drops `tr`, rolling the recipe row back with it.
    associate(recipe.id, input, &mut tr).await?;

    tr.commit().await?;

    info!("Recipe {} created by user {}", recipe.id, author_id);
    Ok(recipe)
}

/// Replaces the recipe's tags and ingredient lines with `input` and
/// overwrites its fields. The image is kept when `fields.image` is `None`.
pub async fn update_recipe(
    recipe: &Recipe,
    fields: RecipeFields,
    input: &ValidatedRecipeInput,
    pool: &Pool<Any>,
) -> Result<Recipe, RecipeError> {
    let mut tr = pool.begin().await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM ingredient_lines WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;

    associate(recipe.id, input, &mut tr).await?;

    let image = fields.image.unwrap_or_else(|| recipe.image.clone());
    let updated: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = $4
        WHERE id = $5
        RETURNING id, author_id, name, text, image, cooking_time, created_at
    ",
    )
    .bind(fields.name)
    .bind(fields.text)
    .bind(fields.cooking_time)
    .bind(image)
    .bind(recipe.id)
    .fetch_optional(&mut *tr)
    .await?
    .ok_or(RecipeError::RecipeNotFound(recipe.id))?;

    tr.commit().await?;

    info!("Recipe {} updated", recipe.id);
    Ok(updated)
}

/// Deletes a recipe and every row pointing at it.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Uuid, pool: &Pool<Any>) -> Result<(), RecipeError> {
    let mut tr = pool.begin().await?;

    for table in [
        "recipe_tags",
        "ingredient_lines",
        "cart_entries",
        "favorite_entries",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
            .bind(id)
            .execute(&mut *tr)
            .await?;
    }

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RecipeError::RecipeNotFound(id));
    }

    tr.commit().await?;

    info!("Recipe {} deleted", id);
    Ok(())
}

/// Shapes a recipe for `viewer`; anonymous viewers get every flag `false`.
pub async fn build_recipe_view(
    recipe: Recipe,
    viewer: Option<Uuid>,
    pool: &Pool<Any>,
) -> Result<RecipeView, RecipeError> {
    let author = get_user_by_id(recipe.author_id, pool)
        .await?
        .ok_or(RecipeError::UserNotFound(recipe.author_id))?;
    let tags = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;

    let (is_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            relation_exists(RelationKind::Follow, viewer, author.id, pool).await?,
            relation_exists(RelationKind::Favorite, viewer, recipe.id, pool).await?,
            relation_exists(RelationKind::Cart, viewer, recipe.id, pool).await?,
        ),
        None => (false, false, false),
    };
    let image = recipe.image().map(str::to_owned);

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author: UserView::from_user(author, is_subscribed),
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn get_recipe_view(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Any>,
) -> Result<RecipeView, RecipeError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or(RecipeError::RecipeNotFound(id))?;

    build_recipe_view(recipe, viewer, pool).await
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub page: PageRequest,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        Self {
            author: None,
            tags: vec![],
            is_favorited: false,
            is_in_shopping_cart: false,
            page: PageRequest::new(None, None, RECIPE_COUNT_PER_PAGE),
        }
    }
}

enum Bind {
    Id(Uuid),
    Text(String),
}

impl RecipeFilter {
    /// WHERE clause with `$n` placeholders, plus the values to bind in order.
    fn where_clause(&self, viewer: Option<Uuid>) -> (String, Vec<Bind>) {
        let mut conditions: Vec<String> = vec![];
        let mut binds: Vec<Bind> = vec![];

        if let Some(author) = self.author {
            binds.push(Bind::Id(author));
            conditions.push(format!("r.author_id = ${}", binds.len()));
        }

        if !self.tags.is_empty() {
            let mut placeholders = Vec::with_capacity(self.tags.len());
            for slug in &self.tags {
                binds.push(Bind::Text(slug.to_owned()));
                placeholders.push(format!("${}", binds.len()));
            }
            conditions.push(format!(
                "r.id IN (SELECT rt.recipe_id FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug IN ({}))",
                placeholders.join(", ")
            ));
        }

        // Both flags only narrow the list for a signed-in viewer.
        if let Some(viewer) = viewer {
            if self.is_favorited {
                binds.push(Bind::Id(viewer));
                conditions.push(format!(
                    "r.id IN (SELECT f.recipe_id FROM favorite_entries f WHERE f.user_id = ${})",
                    binds.len()
                ));
            }
            if self.is_in_shopping_cart {
                binds.push(Bind::Id(viewer));
                conditions.push(format!(
                    "r.id IN (SELECT c.recipe_id FROM cart_entries c WHERE c.user_id = ${})",
                    binds.len()
                ));
            }
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), binds)
        }
    }
}

/// Newest recipes first, narrowed by `filter`.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    pool: &Pool<Any>,
) -> Result<PageContext<RecipeView>, RecipeError> {
    let (where_clause, binds) = filter.where_clause(viewer);

    let count_sql = format!("SELECT COUNT(*) FROM recipes r {where_clause}");
    let mut count = sqlx::query_as::<_, (i64,)>(&count_sql);
    for bind in &binds {
        count = match bind {
            Bind::Id(id) => count.bind(*id),
            Bind::Text(text) => count.bind(text.as_str()),
        };
    }
    let total = count.fetch_one(pool).await?.0;

    let page_sql = format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r {where_clause} ORDER BY r.created_at DESC, r.id DESC LIMIT ${} OFFSET ${}",
        binds.len() + 1,
        binds.len() + 2
    );
    debug!("Fetching recipes: {page_sql}");
    let mut rows = sqlx::query_as::<_, Recipe>(&page_sql);
    for bind in &binds {
        rows = match bind {
            Bind::Id(id) => rows.bind(*id),
            Bind::Text(text) => rows.bind(text.as_str()),
        };
    }
    let recipes = rows
        .bind(filter.page.limit)
        .bind(filter.page.offset())
        .fetch_all(pool)
        .await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(build_recipe_view(recipe, viewer, pool).await?);
    }

    Ok(PageContext::from_rows(views, total, filter.page))
}
