#![allow(dead_code)]

use foodgram_sdk::{
    actions::{create_ingredient, create_recipe, create_tag, create_user},
    config::DatabaseUrl,
    schema::{Ingredient, Recipe, RecipeFields, Tag, User, UserRole, Uuid},
    setup::connect,
    validation::{validate, IngredientInput},
};
use serde_json::json;
use sqlx::{Any, Pool};

pub struct Kitchen {
    pub pool: Pool<Any>,
    pub alice: User,
    pub bob: User,
    pub admin: User,
    pub breakfast: Tag,
    pub dinner: Tag,
    pub flour: Ingredient,
    pub egg: Ingredient,
    pub butter: Ingredient,
    pub milk: Ingredient,
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fresh in-memory store seeded with a few users, tags and ingredients.
pub async fn kitchen() -> Kitchen {
    init_logging();

    let pool = connect(&DatabaseUrl::Memory, 1)
        .await
        .expect("connect to in-memory store");

    let alice = create_user("alice@example.com", "alice", "Alice", "Baker", UserRole::User, &pool)
        .await
        .unwrap();
    let bob = create_user("bob@example.com", "bob", "Bob", "Cook", UserRole::User, &pool)
        .await
        .unwrap();
    let admin = create_user("root@example.com", "root", "Ro", "Ot", UserRole::Admin, &pool)
        .await
        .unwrap();

    let breakfast = create_tag("Breakfast", "breakfast", "#E26C2D", &pool)
        .await
        .unwrap();
    let dinner = create_tag("Dinner", "dinner", "#49B64E", &pool)
        .await
        .unwrap();

    let flour = create_ingredient("Flour", "g", &pool).await.unwrap();
    let egg = create_ingredient("Egg", "pcs", &pool).await.unwrap();
    let butter = create_ingredient("Butter", "g", &pool).await.unwrap();
    let milk = create_ingredient("Milk", "ml", &pool).await.unwrap();

    Kitchen {
        pool,
        alice,
        bob,
        admin,
        breakfast,
        dinner,
        flour,
        egg,
        butter,
        milk,
    }
}

pub fn fields(name: &str) -> RecipeFields {
    RecipeFields {
        name: name.to_owned(),
        text: "Mix everything and cook".to_owned(),
        cooking_time: 15,
        image: None,
    }
}

pub fn fields_with_image(name: &str, image: &str) -> RecipeFields {
    RecipeFields {
        image: Some(image.to_owned()),
        ..fields(name)
    }
}

pub fn lines(items: &[(Uuid, f64)]) -> Vec<IngredientInput> {
    items
        .iter()
        .map(|&(id, amount)| IngredientInput {
            id,
            amount: json!(amount),
        })
        .collect()
}

pub async fn recipe(
    kitchen: &Kitchen,
    author: &User,
    name: &str,
    ingredients: &[(Uuid, f64)],
    tags: &[Uuid],
) -> Recipe {
    let input = validate(Some(&lines(ingredients)), tags).unwrap();
    create_recipe(author.id, fields(name), &input, &kitchen.pool)
        .await
        .unwrap()
}
