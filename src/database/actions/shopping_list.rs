use sqlx::{Any, Executor};

use crate::{error::RecipeError, schema::Uuid, shopping_list::ShoppingList};

/// Sums the ingredients of every recipe in the user's cart.
pub async fn aggregate_shopping_list<'e, E>(
    user_id: Uuid,
    executor: E,
) -> Result<ShoppingList, RecipeError>
where
    E: Executor<'e, Database = Any>,
{
    let lines: Vec<(String, String, f64)> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, l.amount
        FROM ingredient_lines l
        INNER JOIN ingredients i ON i.id = l.ingredient_id
        WHERE l.recipe_id IN (SELECT recipe_id FROM cart_entries WHERE user_id = $1)
        ORDER BY l.id
    ",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(ShoppingList::aggregate(lines))
}
