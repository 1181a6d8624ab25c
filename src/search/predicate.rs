// Copyright 2023 Remi Bernotavicius

//! Composable conditions over recipes, ingredient lines and ingredients.
//!
//! A [`Predicate`] is a conjunction: every condition it holds must match. The store decides how
//! each condition is evaluated.

use crate::database::models::{IngredientId, Measure, RecipeId, RecipeIngredientId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<C> {
    conditions: Vec<C>,
}

impl<C> Predicate<C> {
    /// Matches everything.
    pub fn all() -> Self {
        Self {
            conditions: vec![],
        }
    }

    pub fn new(condition: C) -> Self {
        Self {
            conditions: vec![condition],
        }
    }

    pub fn and(mut self, other: Self) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn conditions(&self) -> &[C] {
        &self.conditions
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecipeCondition {
    IdIn(BTreeSet<RecipeId>),
    /// Already lower-cased.
    InstructionContains(String),
    IsVegetarian(bool),
    NumberOfServings(i32),
    NumberOfServingsAtLeast(i32),
    /// Any of the recipe's ingredient lines names an ingredient in the set.
    HasIngredientNamed(BTreeSet<String>),
    /// None of the recipe's ingredient lines names an ingredient in the set.
    HasNoIngredientNamed(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecipeIngredientCondition {
    IdIn(BTreeSet<RecipeIngredientId>),
    RecipeIn(BTreeSet<RecipeId>),
    AmountIn(BTreeSet<i32>),
    MeasureIn(BTreeSet<Measure>),
    IngredientNameIn(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngredientCondition {
    IdIn(BTreeSet<IngredientId>),
    NameIn(BTreeSet<String>),
}

pub fn ingredients_contain(names: BTreeSet<String>) -> Predicate<RecipeCondition> {
    Predicate::new(RecipeCondition::HasIngredientNamed(names))
}

pub fn ingredients_do_not_contain(names: BTreeSet<String>) -> Predicate<RecipeCondition> {
    Predicate::new(RecipeCondition::HasNoIngredientNamed(names))
}

pub fn instruction_contains_ignore_case(instruction: &str) -> Predicate<RecipeCondition> {
    Predicate::new(RecipeCondition::InstructionContains(
        instruction.to_lowercase(),
    ))
}

pub fn recipe_is_vegetarian(is_vegetarian: bool) -> Predicate<RecipeCondition> {
    Predicate::new(RecipeCondition::IsVegetarian(is_vegetarian))
}

pub fn number_of_servings_equal(number_of_servings: i32) -> Predicate<RecipeCondition> {
    Predicate::new(RecipeCondition::NumberOfServings(number_of_servings))
}

pub fn number_of_servings_at_least(number_of_servings: i32) -> Predicate<RecipeCondition> {
    Predicate::new(RecipeCondition::NumberOfServingsAtLeast(
        number_of_servings,
    ))
}

pub fn recipe_is_equal(recipe_id: RecipeId) -> Predicate<RecipeIngredientCondition> {
    recipes_in(BTreeSet::from([recipe_id]))
}

pub fn recipes_in(recipe_ids: BTreeSet<RecipeId>) -> Predicate<RecipeIngredientCondition> {
    Predicate::new(RecipeIngredientCondition::RecipeIn(recipe_ids))
}

pub fn amount_in(amounts: BTreeSet<i32>) -> Predicate<RecipeIngredientCondition> {
    Predicate::new(RecipeIngredientCondition::AmountIn(amounts))
}

pub fn measures_in(measures: BTreeSet<Measure>) -> Predicate<RecipeIngredientCondition> {
    Predicate::new(RecipeIngredientCondition::MeasureIn(measures))
}

pub fn recipe_ingredient_names_in(
    names: BTreeSet<String>,
) -> Predicate<RecipeIngredientCondition> {
    Predicate::new(RecipeIngredientCondition::IngredientNameIn(names))
}

pub fn ingredient_names_in(names: BTreeSet<String>) -> Predicate<IngredientCondition> {
    Predicate::new(IngredientCondition::NameIn(names))
}

#[test]
fn conjunction() {
    use maplit::btreeset;

    let predicate = instruction_contains_ignore_case("Bake at 200")
        .and(recipe_is_vegetarian(true))
        .and(number_of_servings_equal(3));
    assert_eq!(
        predicate.conditions(),
        [
            RecipeCondition::InstructionContains("bake at 200".into()),
            RecipeCondition::IsVegetarian(true),
            RecipeCondition::NumberOfServings(3),
        ]
    );

    let predicate = Predicate::all().and(ingredients_contain(btreeset! {"egg".into()}));
    assert_eq!(
        predicate.conditions(),
        [RecipeCondition::HasIngredientNamed(btreeset! {"egg".into()})]
    );

    assert!(Predicate::<IngredientCondition>::all().conditions().is_empty());
}
