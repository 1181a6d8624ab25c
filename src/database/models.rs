// Copyright 2023 Remi Bernotavicius

use derive_more::Display;
use diesel::associations::Identifiable;
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::{AsChangeset, Insertable};
use diesel_derive_enum::DbEnum;
use diesel_derive_newtype::DieselNewType;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

#[derive(
    DieselNewType,
    Debug,
    Display,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct IngredientId(i32);

impl IngredientId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }
}

/// An entry in the shared ingredient pool. Recipes reference ingredients, they never own them.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
}

#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct NewIngredient {
    pub id: Option<IngredientId>,
    pub name: String,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RecipeId(i32);

impl RecipeId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub instruction: Option<String>,
    pub created_at: Option<chrono::NaiveDate>,
    pub is_vegetarian: bool,
    pub number_of_servings: Option<i32>,
}

/// Scalar fields of a recipe about to be written. With an `id` that is already stored, saving
/// overwrites that recipe in place.
#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(treat_none_as_null = true)]
pub struct NewRecipe {
    pub id: Option<RecipeId>,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub instruction: Option<String>,
    pub created_at: Option<chrono::NaiveDate>,
    pub is_vegetarian: bool,
    pub number_of_servings: Option<i32>,
}

impl From<Recipe> for NewRecipe {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: Some(recipe.id),
            name: recipe.name,
            description: recipe.description,
            image: recipe.image,
            instruction: recipe.instruction,
            created_at: recipe.created_at,
            is_vegetarian: recipe.is_vegetarian,
            number_of_servings: recipe.number_of_servings,
        }
    }
}

#[derive(
    Debug,
    Display,
    EnumIter,
    Hash,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    DbEnum,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    #[display("gram")]
    Gram,
    #[serde(alias = "ml")]
    #[display("milliliter")]
    Milliliter,
    #[display("cup")]
    Cup,
    #[display("teaspoon")]
    Teaspoon,
    #[display("tablespoon")]
    Tablespoon,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RecipeIngredientId(i32);

impl RecipeIngredientId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }
}

/// A `recipe_ingredients` row as stored, with the ingredient still unresolved.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredientRow {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub amount: i32,
    pub measure: Measure,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredientInsert {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub amount: i32,
    pub measure: Measure,
}

/// One ingredient line of a recipe, joined with the ingredient it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient: Ingredient,
    pub amount: i32,
    pub measure: Measure,
}

impl From<(RecipeIngredientRow, Ingredient)> for RecipeIngredient {
    fn from((row, ingredient): (RecipeIngredientRow, Ingredient)) -> Self {
        Self {
            id: row.id,
            recipe_id: row.recipe_id,
            ingredient,
            amount: row.amount,
            measure: row.measure,
        }
    }
}

impl RecipeIngredient {
    /// Same recipe, ingredient name, amount and measure.
    pub fn matches(&self, line: &NewRecipeIngredient) -> bool {
        self.amount == line.amount
            && self.measure == line.measure
            && self.ingredient.name == line.ingredient.name()
            && self.recipe_id == line.recipe_id
    }
}

/// How a new ingredient line refers to its ingredient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngredientRef {
    /// Found in the shared pool by name.
    Pooled(Ingredient),
    /// Not in the pool; saving the line creates it.
    Unresolved(String),
}

impl IngredientRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Pooled(ingredient) => &ingredient.name,
            Self::Unresolved(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient: IngredientRef,
    pub amount: i32,
    pub measure: Measure,
}

#[test]
fn measure_names() {
    use strum::IntoEnumIterator as _;

    let names: Vec<_> = Measure::iter().map(|m| m.to_string()).collect();
    assert_eq!(
        names,
        ["gram", "milliliter", "cup", "teaspoon", "tablespoon"]
    );

    let parsed: Measure = serde_json::from_str("\"ml\"").unwrap();
    assert_eq!(parsed, Measure::Milliliter);
    assert_eq!(
        serde_json::to_string(&Measure::Tablespoon).unwrap(),
        "\"tablespoon\""
    );
}
