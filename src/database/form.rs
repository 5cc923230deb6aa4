use serde::Deserialize;

use super::{
    error::RecipeError,
    schema::{RecipeFields, Uuid},
    validation::{validate, validate_fields, IngredientInput, ValidatedRecipeInput},
};

/// Body of a create or update request.
#[derive(Deserialize, Debug, Clone)]
pub struct RecipeForm {
    #[serde(default)]
    pub ingredients: Option<Vec<IngredientInput>>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
}

impl RecipeForm {
    /// Validates the whole form; nothing is written when this fails.
    pub fn into_parts(self) -> Result<(RecipeFields, ValidatedRecipeInput), RecipeError> {
        let input = validate(self.ingredients.as_deref(), &self.tags)?;

        let fields = RecipeFields {
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            image: self.image.filter(|image| !image.trim().is_empty()),
        };
        validate_fields(&fields)?;

        Ok((fields, input))
    }
}
