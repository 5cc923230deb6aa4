mod common;

use common::{fields, fields_with_image, kitchen, lines, recipe};
use foodgram_sdk::{
    actions::*,
    error::RecipeError,
    jwt::SessionData,
    schema::{RelationKind, UserRole},
    validation::validate,
};

fn session_of(user: &foodgram_sdk::schema::User) -> SessionData {
    SessionData {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role(),
        is_admin: user.role() == UserRole::Admin,
    }
}

async fn recipe_count(pool: &sqlx::Pool<sqlx::Any>) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn creates_recipe_with_lines_and_tags() {
    let k = kitchen().await;

    let created = recipe(
        &k,
        &k.alice,
        "Pancakes",
        &[(k.flour.id, 200.), (k.egg.id, 2.)],
        &[k.breakfast.id],
    )
    .await;

    let view = get_recipe_view(created.id, None, &k.pool).await.unwrap();
    assert_eq!(view.name, "Pancakes");
    assert_eq!(view.author.id, k.alice.id);
    assert_eq!(view.tags, vec![k.breakfast.clone()]);

    let names: Vec<(&str, f64)> = view
        .ingredients
        .iter()
        .map(|i| (i.name.as_str(), i.amount))
        .collect();
    assert_eq!(names, vec![("Flour", 200.), ("Egg", 2.)]);
}

#[tokio::test]
async fn disjoint_update_leaves_only_new_lines() {
    let k = kitchen().await;
    let created = recipe(
        &k,
        &k.alice,
        "Pancakes",
        &[(k.flour.id, 200.), (k.egg.id, 2.)],
        &[k.breakfast.id],
    )
    .await;

    let input = validate(
        Some(&lines(&[(k.butter.id, 50.), (k.milk.id, 300.)])),
        &[k.dinner.id],
    )
    .unwrap();
    let updated = update_recipe(&created, fields("Crepes"), &input, &k.pool)
        .await
        .unwrap();

    let stored = list_ingredient_lines(updated.id, &k.pool).await.unwrap();
    let ids: Vec<_> = stored.iter().map(|l| l.ingredient_id).collect();
    assert_eq!(ids, vec![k.butter.id, k.milk.id]);

    let tags = list_recipe_tags(updated.id, &k.pool).await.unwrap();
    assert_eq!(tags, vec![k.dinner.clone()]);
    assert_eq!(updated.name, "Crepes");
}

#[tokio::test]
async fn update_without_image_keeps_previous_image() {
    let k = kitchen().await;
    let input = validate(Some(&lines(&[(k.flour.id, 100.)])), &[]).unwrap();
    let created = create_recipe(
        k.alice.id,
        fields_with_image("Bread", "recipes/images/bread.png"),
        &input,
        &k.pool,
    )
    .await
    .unwrap();

    let updated = update_recipe(&created, fields("Rye bread"), &input, &k.pool)
        .await
        .unwrap();

    assert_eq!(updated.image(), Some("recipes/images/bread.png"));
    assert_eq!(updated.name, "Rye bread");
}

#[tokio::test]
async fn recipes_with_and_without_image_read_back() {
    let k = kitchen().await;
    let input = validate(Some(&lines(&[(k.flour.id, 0.1)])), &[]).unwrap();

    let plain = create_recipe(k.alice.id, fields("Plain"), &input, &k.pool)
        .await
        .unwrap();
    let pictured = create_recipe(
        k.alice.id,
        fields_with_image("Pictured", "recipes/images/pie.png"),
        &input,
        &k.pool,
    )
    .await
    .unwrap();

    assert_eq!(plain.image(), None);
    let stored = get_recipe(plain.id, &k.pool).await.unwrap().unwrap();
    assert_eq!(stored.image(), None);
    let view = get_recipe_view(plain.id, Some(k.bob.id), &k.pool)
        .await
        .unwrap();
    assert_eq!(view.image, None);

    let view = get_recipe_view(pictured.id, None, &k.pool).await.unwrap();
    assert_eq!(view.image.as_deref(), Some("recipes/images/pie.png"));

    let page = fetch_recipes(&RecipeFilter::default(), None, &k.pool)
        .await
        .unwrap();
    let images: Vec<_> = page.results.iter().map(|r| r.image.as_deref()).collect();
    assert_eq!(images, vec![Some("recipes/images/pie.png"), None]);
}

#[tokio::test]
async fn update_can_replace_image() {
    let k = kitchen().await;
    let created = recipe(&k, &k.alice, "Bread", &[(k.flour.id, 100.)], &[]).await;
    let input = validate(Some(&lines(&[(k.flour.id, 100.)])), &[]).unwrap();

    let updated = update_recipe(
        &created,
        fields_with_image("Bread", "recipes/images/new.png"),
        &input,
        &k.pool,
    )
    .await
    .unwrap();

    assert_eq!(updated.image(), Some("recipes/images/new.png"));
}

#[tokio::test]
async fn missing_tag_rolls_back_create() {
    let k = kitchen().await;
    let input = validate(Some(&lines(&[(k.flour.id, 100.)])), &[k.breakfast.id, 999]).unwrap();

    let result = create_recipe(k.alice.id, fields("Ghost"), &input, &k.pool).await;

    assert!(matches!(result, Err(RecipeError::TagNotFound(999))));
    assert_eq!(recipe_count(&k.pool).await, 0);
}

#[tokio::test]
async fn missing_ingredient_rolls_back_create() {
    let k = kitchen().await;
    let input = validate(Some(&lines(&[(k.flour.id, 100.), (424242, 1.)])), &[]).unwrap();

    let result = create_recipe(k.alice.id, fields("Ghost"), &input, &k.pool).await;

    assert!(matches!(result, Err(RecipeError::IngredientNotFound(424242))));
    assert_eq!(recipe_count(&k.pool).await, 0);
}

#[tokio::test]
async fn failed_update_keeps_old_lines() {
    let k = kitchen().await;
    let created = recipe(&k, &k.alice, "Omelette", &[(k.egg.id, 3.)], &[]).await;

    let input = validate(Some(&lines(&[(777, 1.)])), &[]).unwrap();
    let result = update_recipe(&created, fields("Broken"), &input, &k.pool).await;
    assert!(matches!(result, Err(RecipeError::IngredientNotFound(777))));

    let stored = list_ingredient_lines(created.id, &k.pool).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ingredient_id, k.egg.id);
    assert_eq!(get_recipe(created.id, &k.pool).await.unwrap().unwrap().name, "Omelette");
}

#[tokio::test]
async fn delete_removes_dependent_rows() {
    let k = kitchen().await;
    let created = recipe(&k, &k.alice, "Toast", &[(k.butter.id, 10.)], &[k.breakfast.id]).await;
    add_relation(RelationKind::Cart, k.bob.id, created.id, &k.pool)
        .await
        .unwrap();
    add_relation(RelationKind::Favorite, k.bob.id, created.id, &k.pool)
        .await
        .unwrap();

    delete_recipe(created.id, &k.pool).await.unwrap();

    assert!(get_recipe(created.id, &k.pool).await.unwrap().is_none());
    assert!(list_ingredient_lines(created.id, &k.pool).await.unwrap().is_empty());
    assert!(aggregate_shopping_list(k.bob.id, &k.pool).await.unwrap().is_empty());
    assert!(!relation_exists(RelationKind::Favorite, k.bob.id, created.id, &k.pool)
        .await
        .unwrap());
}

#[tokio::test]
async fn only_author_or_admin_may_change_recipe() {
    let k = kitchen().await;
    let created = recipe(&k, &k.alice, "Soup", &[(k.milk.id, 500.)], &[]).await;

    assert!(get_recipe_mut(created.id, &session_of(&k.alice), &k.pool)
        .await
        .is_ok());
    assert!(matches!(
        get_recipe_mut(created.id, &session_of(&k.bob), &k.pool).await,
        Err(RecipeError::Forbidden)
    ));
    assert!(get_recipe_mut(created.id, &session_of(&k.admin), &k.pool)
        .await
        .is_ok());
    assert!(matches!(
        get_recipe_mut(31337, &session_of(&k.alice), &k.pool).await,
        Err(RecipeError::RecipeNotFound(31337))
    ));
}

#[tokio::test]
async fn fetch_recipes_filters_and_pages() {
    let k = kitchen().await;
    let first = recipe(&k, &k.alice, "Porridge", &[(k.milk.id, 200.)], &[k.breakfast.id]).await;
    let second = recipe(&k, &k.bob, "Stew", &[(k.butter.id, 20.)], &[k.dinner.id]).await;
    let third = recipe(&k, &k.alice, "Eggs", &[(k.egg.id, 2.)], &[k.breakfast.id]).await;
    add_relation(RelationKind::Favorite, k.bob.id, first.id, &k.pool)
        .await
        .unwrap();

    let all = fetch_recipes(&RecipeFilter::default(), None, &k.pool)
        .await
        .unwrap();
    let ids: Vec<_> = all.results.iter().map(|r| r.id).collect();
    assert_eq!(all.count, 3);
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let breakfast = RecipeFilter {
        tags: vec!["breakfast".to_owned()],
        ..Default::default()
    };
    let page = fetch_recipes(&breakfast, None, &k.pool).await.unwrap();
    assert_eq!(page.count, 2);

    let by_bob = RecipeFilter {
        author: Some(k.bob.id),
        ..Default::default()
    };
    let page = fetch_recipes(&by_bob, None, &k.pool).await.unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, second.id);

    let favorites = RecipeFilter {
        is_favorited: true,
        ..Default::default()
    };
    let page = fetch_recipes(&favorites, Some(k.bob.id), &k.pool)
        .await
        .unwrap();
    assert_eq!(page.results.len(), 1);
    assert!(page.results[0].is_favorited);

    let anonymous = fetch_recipes(&favorites, None, &k.pool).await.unwrap();
    assert_eq!(anonymous.count, 3);
    assert!(anonymous.results.iter().all(|r| !r.is_favorited));
}

#[tokio::test]
async fn anonymous_viewer_sees_no_flags() {
    let k = kitchen().await;
    let created = recipe(&k, &k.alice, "Cake", &[(k.flour.id, 300.)], &[]).await;
    add_relation(RelationKind::Favorite, k.bob.id, created.id, &k.pool)
        .await
        .unwrap();
    add_relation(RelationKind::Cart, k.bob.id, created.id, &k.pool)
        .await
        .unwrap();
    add_relation(RelationKind::Follow, k.bob.id, k.alice.id, &k.pool)
        .await
        .unwrap();

    let seen_by_bob = get_recipe_view(created.id, Some(k.bob.id), &k.pool)
        .await
        .unwrap();
    assert!(seen_by_bob.is_favorited);
    assert!(seen_by_bob.is_in_shopping_cart);
    assert!(seen_by_bob.author.is_subscribed);

    let anonymous = get_recipe_view(created.id, None, &k.pool).await.unwrap();
    assert!(!anonymous.is_favorited);
    assert!(!anonymous.is_in_shopping_cart);
    assert!(!anonymous.author.is_subscribed);
}

#[tokio::test]
async fn lists_ingredients_by_prefix() {
    let k = kitchen().await;

    let matches = list_ingredients(Some("fl"), &k.pool).await.unwrap();
    assert_eq!(matches, vec![k.flour.clone()]);

    let all = list_ingredients(None, &k.pool).await.unwrap();
    let names: Vec<_> = all.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Butter", "Egg", "Flour", "Milk"]);
}
