use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    constants::{MIN_COOKING_TIME, RECIPE_NAME_MAX_LENGTH},
    error::RecipeError,
    schema::{RecipeFields, Uuid},
};

/// One `{ "id": .., "amount": .. }` entry exactly as the client sent it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IngredientInput {
    pub id: Uuid,
    pub amount: Value,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ValidatedIngredient {
    pub id: Uuid,
    pub amount: f64,
}

impl From<&ValidatedIngredient> for IngredientInput {
    fn from(value: &ValidatedIngredient) -> Self {
        Self {
            id: value.id,
            amount: Value::from(value.amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecipeInput {
    pub ingredients: Vec<ValidatedIngredient>,
    pub tags: Vec<Uuid>,
}

impl ValidatedRecipeInput {
    pub fn to_input(&self) -> (Vec<IngredientInput>, Vec<Uuid>) {
        (
            self.ingredients.iter().map(IngredientInput::from).collect(),
            self.tags.clone(),
        )
    }
}

/// Accepts a JSON number, or a string holding a finite decimal number.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    amount.is_finite().then_some(amount)
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_owned(),
        other => other.to_string(),
    }
}

/// Checks a submitted ingredient list and tag list.
///
/// A repeated ingredient is reported before any amount problem, so a list
/// with duplicates always fails with [`RecipeError::DuplicateIngredient`].
pub fn validate(
    ingredients: Option<&[IngredientInput]>,
    tags: &[Uuid],
) -> Result<ValidatedRecipeInput, RecipeError> {
    let ingredients = match ingredients {
        Some(ingredients) if !ingredients.is_empty() => ingredients,
        _ => return Err(RecipeError::MissingIngredients),
    };

    let mut seen = HashSet::with_capacity(ingredients.len());
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            return Err(RecipeError::DuplicateIngredient(ingredient.id));
        }
    }

    let validated = ingredients
        .iter()
        .map(|ingredient| match parse_amount(&ingredient.amount) {
            Some(amount) if amount > 0. => Ok(ValidatedIngredient {
                id: ingredient.id,
                amount,
            }),
            _ => Err(RecipeError::NonPositiveAmount {
                ingredient_id: ingredient.id,
                amount: describe(&ingredient.amount),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen_tags = HashSet::with_capacity(tags.len());
    let tags = tags
        .iter()
        .copied()
        .filter(|tag| seen_tags.insert(*tag))
        .collect();

    Ok(ValidatedRecipeInput {
        ingredients: validated,
        tags,
    })
}

pub fn validate_fields(fields: &RecipeFields) -> Result<(), RecipeError> {
    if fields.name.trim().is_empty() {
        return Err(RecipeError::InvalidField {
            field: "name",
            reason: "must not be empty",
        });
    }
    if fields.name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        return Err(RecipeError::InvalidField {
            field: "name",
            reason: "must be at most 200 characters",
        });
    }
    if fields.text.trim().is_empty() {
        return Err(RecipeError::InvalidField {
            field: "text",
            reason: "must not be empty",
        });
    }
    if fields.cooking_time < MIN_COOKING_TIME {
        return Err(RecipeError::InvalidField {
            field: "cooking_time",
            reason: "must be at least 1 minute",
        });
    }

    Ok(())
}
