// Copyright 2023 Remi Bernotavicius

use crate::database::models::{
    IngredientRef, Measure, NewRecipe, NewRecipeIngredient, Recipe,
};
use crate::database::store::EntityStore;
use crate::database::Connection;
use crate::search::predicate::ingredient_names_in;
use std::collections::BTreeSet;

#[derive(Default)]
pub struct TestRecipe {
    pub name: &'static str,
    pub instruction: &'static str,
    pub is_vegetarian: bool,
    pub number_of_servings: i32,
    pub ingredients: &'static [&'static str],
}

pub fn new_recipe(name: &str) -> NewRecipe {
    NewRecipe {
        id: None,
        name: name.into(),
        description: None,
        image: None,
        instruction: None,
        created_at: None,
        is_vegetarian: false,
        number_of_servings: None,
    }
}

/// Stores the recipe with one 100 gram line per ingredient, reusing pooled ingredients.
pub fn add_recipe(conn: &mut Connection, recipe: TestRecipe) -> Recipe {
    let store: &mut dyn EntityStore = conn;

    let mut draft = new_recipe(recipe.name);
    draft.instruction = Some(recipe.instruction.into());
    draft.is_vegetarian = recipe.is_vegetarian;
    draft.number_of_servings = Some(recipe.number_of_servings);
    let saved = store.recipes().save_all(vec![draft]).unwrap().remove(0);

    let mut lines = vec![];
    for &name in recipe.ingredients {
        let pooled = store
            .ingredients()
            .find_by_predicate(&ingredient_names_in(BTreeSet::from([name.to_owned()])))
            .unwrap()
            .into_iter()
            .next();
        lines.push(NewRecipeIngredient {
            recipe_id: saved.id,
            ingredient: pooled
                .map(IngredientRef::Pooled)
                .unwrap_or_else(|| IngredientRef::Unresolved(name.into())),
            amount: 100,
            measure: Measure::Gram,
        });
    }
    store.recipe_ingredients().save_all(lines).unwrap();
    saved
}
