// Copyright 2023 Remi Bernotavicius

//! The external recipe representation, and conversion to and from stored entities.

use super::reconcile::{IngredientLine, RecipeDraft};
use crate::database::models::{
    IngredientId, Measure, NewRecipe, Recipe, RecipeId, RecipeIngredient, RecipeIngredientId,
};
use crate::database::store::EntityStore;
use crate::search::predicate::recipes_in;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientView {
    #[serde(default)]
    pub ingredient_id: Option<IngredientId>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredientView {
    #[serde(default)]
    pub recipe_ingredient_id: Option<RecipeIngredientId>,
    #[serde(default)]
    pub recipe_id: Option<RecipeId>,
    pub ingredient: IngredientView,
    pub amount: i32,
    pub measure: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeView {
    #[serde(default)]
    pub recipe_id: Option<RecipeId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub created_at: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub number_of_servings: Option<i32>,
    #[serde(default)]
    pub recipe_ingredients: Vec<RecipeIngredientView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeList {
    pub recipes: Vec<RecipeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRecipe {
    pub recipe_id: RecipeId,
}

/// Strips `&`, `<` and `>`. Blank text is returned untouched.
pub fn sanitize(text: &str) -> String {
    if text.trim().is_empty() {
        return text.into();
    }
    text.chars().filter(|c| !matches!(c, '&' | '<' | '>')).collect()
}

impl From<RecipeIngredient> for RecipeIngredientView {
    fn from(line: RecipeIngredient) -> Self {
        Self {
            recipe_ingredient_id: Some(line.id),
            recipe_id: Some(line.recipe_id),
            ingredient: IngredientView {
                ingredient_id: Some(line.ingredient.id),
                name: line.ingredient.name,
            },
            amount: line.amount,
            measure: line.measure,
        }
    }
}

fn to_view(recipe: Recipe, recipe_ingredients: Vec<RecipeIngredientView>) -> RecipeView {
    RecipeView {
        recipe_id: Some(recipe.id),
        name: recipe.name,
        description: recipe.description,
        image: recipe.image,
        instruction: recipe.instruction,
        created_at: recipe.created_at,
        is_vegetarian: recipe.is_vegetarian,
        number_of_servings: recipe.number_of_servings,
        recipe_ingredients,
    }
}

/// Attaches each recipe's ingredient lines, loaded in one query.
pub fn to_views(store: &mut dyn EntityStore, recipes: Vec<Recipe>) -> Result<Vec<RecipeView>> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: BTreeSet<_> = recipes.iter().map(|r| r.id).collect();
    let mut lines: BTreeMap<RecipeId, Vec<RecipeIngredientView>> = BTreeMap::new();
    for line in store.recipe_ingredients().find_by_predicate(&recipes_in(ids))? {
        lines.entry(line.recipe_id).or_default().push(line.into());
    }

    Ok(recipes
        .into_iter()
        .map(|recipe| {
            let recipe_lines = lines.remove(&recipe.id).unwrap_or_default();
            to_view(recipe, recipe_lines)
        })
        .collect())
}

pub fn to_draft(view: RecipeView) -> Result<RecipeDraft> {
    if view.name.trim().is_empty() {
        return Err(Error::bad_request("recipe name must not be empty"));
    }

    let lines = view
        .recipe_ingredients
        .into_iter()
        .map(|line| IngredientLine {
            name: line.ingredient.name,
            amount: line.amount,
            measure: line.measure,
        })
        .collect();

    Ok(RecipeDraft {
        recipe: NewRecipe {
            id: view.recipe_id,
            name: view.name,
            description: view.description,
            image: view.image,
            instruction: view.instruction.as_deref().map(sanitize),
            created_at: view.created_at,
            is_vegetarian: view.is_vegetarian,
            number_of_servings: view.number_of_servings,
        },
        lines,
    })
}

#[test]
fn sanitize_instruction() {
    assert_eq!(sanitize("Mix <b>flour</b> & eggs"), "Mix bflour/b  eggs");
    assert_eq!(sanitize("   "), "   ");
    assert_eq!(sanitize(""), "");
    assert_eq!(sanitize("Bake at 200"), "Bake at 200");
}

#[test]
fn recipe_json() {
    let json = serde_json::json!({
        "name": "pancakes",
        "instruction": "Fry & flip",
        "created_at": "2023-04-01",
        "is_vegetarian": true,
        "number_of_servings": 4,
        "recipe_ingredients": [
            {"ingredient": {"name": "flour"}, "amount": 200, "measure": "gram"},
            {"ingredient": {"name": "milk"}, "amount": 300, "measure": "ml"}
        ]
    });
    let view: RecipeView = serde_json::from_value(json).unwrap();
    let draft = to_draft(view).unwrap();

    assert_eq!(draft.recipe.id, None);
    assert_eq!(draft.recipe.instruction.as_deref(), Some("Fry  flip"));
    assert_eq!(
        draft.recipe.created_at,
        chrono::NaiveDate::from_ymd_opt(2023, 4, 1)
    );
    assert_eq!(
        draft.lines,
        [
            IngredientLine {
                name: "flour".into(),
                amount: 200,
                measure: Measure::Gram
            },
            IngredientLine {
                name: "milk".into(),
                amount: 300,
                measure: Measure::Milliliter
            }
        ]
    );
}

#[test]
fn empty_name_is_rejected() {
    use crate::error::Status;

    let view: RecipeView = serde_json::from_value(serde_json::json!({"name": "  "})).unwrap();
    let error = to_draft(view).unwrap_err();
    assert_eq!(error.status(), Some(Status::BadRequest));
}

#[test]
fn views_carry_their_lines() {
    use crate::test_data::{add_recipe, TestRecipe};

    let mut conn = crate::database::establish_test_connection();
    let cake = add_recipe(
        &mut conn,
        TestRecipe {
            name: "cake",
            ingredients: &["egg", "flour"],
            ..Default::default()
        },
    );
    let toast = add_recipe(
        &mut conn,
        TestRecipe {
            name: "toast",
            ..Default::default()
        },
    );

    let views = to_views(&mut conn, vec![toast.clone(), cake.clone()]).unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].recipe_id, Some(toast.id));
    assert!(views[0].recipe_ingredients.is_empty());
    assert_eq!(views[1].recipe_id, Some(cake.id));

    let names: Vec<_> = views[1]
        .recipe_ingredients
        .iter()
        .map(|l| l.ingredient.name.as_str())
        .collect();
    assert_eq!(names, ["egg", "flour"]);
    assert!(views[1]
        .recipe_ingredients
        .iter()
        .all(|l| l.recipe_id == Some(cake.id) && l.measure == Measure::Gram));
}
