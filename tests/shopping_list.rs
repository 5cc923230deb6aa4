mod common;

use common::{kitchen, recipe};
use foodgram_sdk::{
    actions::{add_relation, aggregate_shopping_list, create_ingredient},
    schema::RelationKind,
    shopping_list::ShoppingListItem,
};

fn item(name: &str, amount: f64, unit: &str) -> ShoppingListItem {
    ShoppingListItem {
        name: name.to_owned(),
        amount,
        measurement_unit: unit.to_owned(),
    }
}

#[tokio::test]
async fn sums_cart_by_ingredient_name() {
    let k = kitchen().await;
    let a = recipe(&k, &k.alice, "A", &[(k.flour.id, 200.)], &[]).await;
    let b = recipe(&k, &k.alice, "B", &[(k.flour.id, 300.), (k.egg.id, 2.)], &[]).await;

    for id in [a.id, b.id] {
        add_relation(RelationKind::Cart, k.bob.id, id, &k.pool)
            .await
            .unwrap();
    }

    let list = aggregate_shopping_list(k.bob.id, &k.pool).await.unwrap();

    assert_eq!(list.items, vec![item("Flour", 500., "g"), item("Egg", 2., "pcs")]);
    assert_eq!(list.to_string(), "Flour - 500 g\nEgg - 2 pcs\n");
}

#[tokio::test]
async fn empty_cart_gives_empty_list() {
    let k = kitchen().await;
    recipe(&k, &k.alice, "A", &[(k.flour.id, 200.)], &[]).await;

    let list = aggregate_shopping_list(k.bob.id, &k.pool).await.unwrap();

    assert!(list.is_empty());
    assert_eq!(list.to_string(), "");
}

#[tokio::test]
async fn same_name_merges_keeping_first_unit() {
    let k = kitchen().await;
    let coarse = create_ingredient("Flour", "kg", &k.pool).await.unwrap();
    let a = recipe(&k, &k.alice, "A", &[(k.flour.id, 200.)], &[]).await;
    let b = recipe(&k, &k.alice, "B", &[(coarse.id, 1.)], &[]).await;

    for id in [a.id, b.id] {
        add_relation(RelationKind::Cart, k.bob.id, id, &k.pool)
            .await
            .unwrap();
    }

    let list = aggregate_shopping_list(k.bob.id, &k.pool).await.unwrap();

    assert_eq!(list.items, vec![item("Flour", 201., "g")]);
}

#[tokio::test]
async fn other_carts_are_ignored() {
    let k = kitchen().await;
    let a = recipe(&k, &k.alice, "A", &[(k.butter.id, 12.5)], &[]).await;
    let b = recipe(&k, &k.alice, "B", &[(k.milk.id, 250.)], &[]).await;
    add_relation(RelationKind::Cart, k.bob.id, a.id, &k.pool)
        .await
        .unwrap();
    add_relation(RelationKind::Cart, k.alice.id, b.id, &k.pool)
        .await
        .unwrap();

    let list = aggregate_shopping_list(k.bob.id, &k.pool).await.unwrap();

    assert_eq!(list.to_string(), "Butter - 12.5 g\n");
}
