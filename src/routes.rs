use std::{convert::Infallible, sync::Arc};

use log::{error, warn};
use serde::Deserialize;
use serde_json::json;
use sqlx::{Any, Pool};
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reply::{self, Response},
    Filter, Rejection, Reply,
};

use crate::{
    actions::*,
    constants::{RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME, SUBSCRIPTION_COUNT_PER_PAGE},
    error::RecipeError,
    form::RecipeForm,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    permissions::ActionType,
    schema::{RecipeShort, RelationKind, Uuid},
};

fn reject(e: RecipeError) -> Rejection {
    warp::reject::custom(e)
}

fn with_pool(pool: Pool<Any>) -> impl Filter<Extract = (Pool<Any>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

fn created<T: serde::Serialize>(value: &T) -> Response {
    reply::with_status(reply::json(value), StatusCode::CREATED).into_response()
}

fn no_content() -> Response {
    reply::with_status(reply::reply(), StatusCode::NO_CONTENT).into_response()
}

#[derive(Deserialize, Debug, Default)]
struct IngredientQuery {
    name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct SubscriptionQuery {
    page: Option<i64>,
    limit: Option<i64>,
    recipes_limit: Option<i64>,
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, RecipeError> {
    value.trim().parse().map_err(|_| RecipeError::InvalidField {
        field,
        reason: "must be an integer",
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true")
}

/// Builds a recipe filter from raw query pairs; `tags` may repeat.
fn recipe_filter(pairs: Vec<(String, String)>) -> Result<RecipeFilter, RecipeError> {
    let mut page = None;
    let mut limit = None;
    let mut filter = RecipeFilter::default();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => page = Some(parse_int("page", &value)?),
            "limit" => limit = Some(parse_int("limit", &value)?),
            "author" => filter.author = Some(parse_int("author", &value)?),
            "tags" => filter.tags.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|slug| !slug.is_empty())
                    .map(str::to_owned),
            ),
            "is_favorited" => filter.is_favorited = parse_flag(&value),
            "is_in_shopping_cart" => filter.is_in_shopping_cart = parse_flag(&value),
            _ => {}
        }
    }
    filter.page = PageRequest::new(page, limit, RECIPE_COUNT_PER_PAGE);

    Ok(filter)
}

async fn list_tags_handler(pool: Pool<Any>) -> Result<Response, Rejection> {
    let tags = list_tags(&pool).await.map_err(reject)?;
    Ok(reply::json(&tags).into_response())
}

async fn get_tag_handler(id: Uuid, pool: Pool<Any>) -> Result<Response, Rejection> {
    let tag = get_tag(id, &pool)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(RecipeError::NotFound))?;
    Ok(reply::json(&tag).into_response())
}

async fn list_ingredients_handler(
    query: IngredientQuery,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let ingredients = list_ingredients(query.name.as_deref(), &pool)
        .await
        .map_err(reject)?;
    Ok(reply::json(&ingredients).into_response())
}

async fn list_recipes_handler(
    pairs: Vec<(String, String)>,
    session: Option<SessionData>,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let filter = recipe_filter(pairs).map_err(reject)?;
    let viewer = session.map(|s| s.user_id);

    let page = fetch_recipes(&filter, viewer, &pool).await.map_err(reject)?;
    Ok(reply::json(&page).into_response())
}

async fn create_recipe_handler(
    session: SessionData,
    form: RecipeForm,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    session
        .authenticate(ActionType::CreateRecipes)
        .map_err(reject)?;
    let (fields, input) = form.into_parts().map_err(reject)?;

    let recipe = create_recipe(session.user_id, fields, &input, &pool)
        .await
        .map_err(reject)?;
    let view = build_recipe_view(recipe, Some(session.user_id), &pool)
        .await
        .map_err(reject)?;
    Ok(created(&view))
}

async fn get_recipe_handler(
    id: Uuid,
    session: Option<SessionData>,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let view = get_recipe_view(id, session.map(|s| s.user_id), &pool)
        .await
        .map_err(reject)?;
    Ok(reply::json(&view).into_response())
}

async fn update_recipe_handler(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &pool).await.map_err(reject)?;
    let (fields, input) = form.into_parts().map_err(reject)?;

    let recipe = update_recipe(&recipe, fields, &input, &pool)
        .await
        .map_err(reject)?;
    let view = build_recipe_view(recipe, Some(session.user_id), &pool)
        .await
        .map_err(reject)?;
    Ok(reply::json(&view).into_response())
}

async fn delete_recipe_handler(
    id: Uuid,
    session: SessionData,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &pool).await.map_err(reject)?;
    delete_recipe(recipe.id, &pool).await.map_err(reject)?;
    Ok(no_content())
}

async fn add_recipe_relation(
    kind: RelationKind,
    id: Uuid,
    session: SessionData,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    session
        .authenticate(ActionType::ManageOwnRelations)
        .map_err(reject)?;
    add_relation(kind, session.user_id, id, &pool)
        .await
        .map_err(reject)?;

    let recipe = get_recipe(id, &pool)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(RecipeError::RecipeNotFound(id)))?;
    Ok(created(&RecipeShort::from(recipe)))
}

async fn remove_relation_handler(
    kind: RelationKind,
    id: Uuid,
    session: SessionData,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    session
        .authenticate(ActionType::ManageOwnRelations)
        .map_err(reject)?;
    remove_relation(kind, session.user_id, id, &pool)
        .await
        .map_err(reject)?;
    Ok(no_content())
}

async fn download_shopping_cart_handler(
    session: SessionData,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let list = aggregate_shopping_list(session.user_id, &pool)
        .await
        .map_err(reject)?;

    Ok(reply::with_header(
        list.to_string(),
        "Content-Disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
    .into_response())
}

async fn get_user_handler(
    id: Uuid,
    session: Option<SessionData>,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let view = get_user_view(id, session.map(|s| s.user_id), &pool)
        .await
        .map_err(reject)?;
    Ok(reply::json(&view).into_response())
}

async fn subscriptions_handler(
    session: SessionData,
    query: SubscriptionQuery,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    let request = PageRequest::new(query.page, query.limit, SUBSCRIPTION_COUNT_PER_PAGE);
    let page = fetch_subscriptions(session.user_id, request, query.recipes_limit, &pool)
        .await
        .map_err(reject)?;
    Ok(reply::json(&page).into_response())
}

async fn subscribe_handler(
    id: Uuid,
    session: SessionData,
    query: SubscriptionQuery,
    pool: Pool<Any>,
) -> Result<Response, Rejection> {
    session
        .authenticate(ActionType::ManageOwnRelations)
        .map_err(reject)?;
    add_relation(RelationKind::Follow, session.user_id, id, &pool)
        .await
        .map_err(reject)?;

    let view = get_subscription_view(id, session.user_id, query.recipes_limit, &pool)
        .await
        .map_err(reject)?;
    Ok(created(&view))
}

fn tag_routes(pool: Pool<Any>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(list_tags_handler);

    let get = warp::path!("api" / "tags" / Uuid)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(get_tag_handler);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_pool(pool))
        .and_then(list_ingredients_handler);

    list.or(get).unify().or(ingredients).unify().boxed()
}

fn recipe_routes(pool: Pool<Any>, secret: Arc<Vec<u8>>) -> BoxedFilter<(Response,)> {
    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(download_shopping_cart_handler);

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(list_recipes_handler);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(create_recipe_handler);

    let get = warp::path!("api" / "recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(get_recipe_handler);

    let update = warp::path!("api" / "recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(update_recipe_handler);

    let delete = warp::path!("api" / "recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(delete_recipe_handler);

    let favorite = warp::path!("api" / "recipes" / Uuid / "favorite")
        .map(|id: Uuid| (RelationKind::Favorite, id));
    let cart = warp::path!("api" / "recipes" / Uuid / "shopping_cart")
        .map(|id: Uuid| (RelationKind::Cart, id));
    let relation = favorite.or(cart).unify().untuple_one();

    let add = relation
        .clone()
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(add_recipe_relation);

    let remove = relation
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_pool(pool))
        .and_then(remove_relation_handler);

    download
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(add)
        .unify()
        .or(remove)
        .unify()
        .boxed()
}

fn user_routes(pool: Pool<Any>, secret: Arc<Vec<u8>>) -> BoxedFilter<(Response,)> {
    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(warp::query::<SubscriptionQuery>())
        .and(with_pool(pool.clone()))
        .and_then(subscriptions_handler);

    let get = warp::path!("api" / "users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(get_user_handler);

    let subscribe = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(warp::query::<SubscriptionQuery>())
        .and(with_pool(pool.clone()))
        .and_then(subscribe_handler);

    let unsubscribe = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_pool(pool))
        .and_then(|id: Uuid, session: SessionData, pool: Pool<Any>| {
            remove_relation_handler(RelationKind::Follow, id, session, pool)
        });

    subscriptions
        .or(get)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

/// Every endpoint of the API, with rejections turned into JSON errors.
pub fn routes(
    pool: Pool<Any>,
    secret: Arc<Vec<u8>>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    tag_routes(pool.clone())
        .or(recipe_routes(pool.clone(), secret.clone()))
        .unify()
        .or(user_routes(pool, secret))
        .unify()
        .with(warp::log("foodgram"))
        .recover(handle_rejection)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<RecipeError>() {
        let status = e.status();
        if status.is_server_error() {
            error!("Request failed: {e}");
            (status, "Internal server error".to_owned())
        } else {
            warn!("Rejected request: {e}");
            (status, e.to_string())
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_owned())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        warn!("Rejected body: {e}");
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_owned())
    } else {
        error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_owned(),
        )
    };

    Ok(reply::with_status(
        reply::json(&json!({ "errors": message })),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn collects_repeated_tags() {
        let filter = recipe_filter(pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch,dinner"),
            ("is_favorited", "1"),
            ("page", "2"),
        ]))
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "lunch", "dinner"]);
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
        assert_eq!(filter.page.page, 2);
        assert_eq!(filter.page.limit, RECIPE_COUNT_PER_PAGE);
    }

    #[test]
    fn rejects_non_numeric_author() {
        assert!(matches!(
            recipe_filter(pairs(&[("author", "me")])),
            Err(RecipeError::InvalidField { field: "author", .. })
        ));
    }
}
