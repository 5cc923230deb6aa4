use serde::{Deserialize, Serialize};

pub type Uuid = i64;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Eq, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl From<&str> for UserRole {
    // Unknown roles never gain privileges.
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

/// Join tables whose rows carry nothing but their existence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Favorite,
    Cart,
    Follow,
}

impl RelationKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorite_entries",
            RelationKind::Cart => "cart_entries",
            RelationKind::Follow => "follow_edges",
        }
    }

    pub(crate) fn object_column(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Cart => "recipe_id",
            RelationKind::Follow => "author_id",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub role: String,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    /// Empty when the recipe has no image.
    pub image: String,
    pub cooking_time: i64,
    pub created_at: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct IngredientLine {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub amount: f64,
}

/// An ingredient line joined with its ingredient, as shown inside a recipe.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: f64,
}

impl Recipe {
    pub fn image(&self) -> Option<&str> {
        Some(self.image.as_str()).filter(|image| !image.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i64,
}

impl From<Recipe> for RecipeShort {
    fn from(value: Recipe) -> Self {
        let image = value.image().map(str::to_owned);
        Self {
            id: value.id,
            name: value.name,
            image,
            cooking_time: value.cooking_time,
        }
    }
}

/// Scalar fields of a recipe as submitted by its author.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFields {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}
