// Copyright 2023 Remi Bernotavicius

use super::IngredientUpdate;
use crate::database::models::{
    Ingredient, IngredientRef, Measure, NewRecipe, NewRecipeIngredient, RecipeId,
};
use crate::database::store::EntityStore;
use crate::search::predicate::{
    amount_in, ingredient_names_in, measures_in, recipe_ingredient_names_in, recipe_is_equal,
};
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// An ingredient line as a caller describes it, by ingredient name.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientLine {
    pub name: String,
    pub amount: i32,
    pub measure: Measure,
}

/// A full incoming recipe: its scalar fields plus every ingredient line.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub recipe: NewRecipe,
    pub lines: Vec<IngredientLine>,
}

pub fn recipe_does_not_exist(recipe_id: RecipeId) -> Error {
    Error::not_found(format!("Recipe with id: {recipe_id} does not exist"))
}

/// Binds the lines to `recipe_id`, pointing each at the first pooled ingredient with exactly its
/// name. Names missing from the pool stay unresolved and are created when saved.
fn resolve_lines(
    store: &mut dyn EntityStore,
    recipe_id: RecipeId,
    lines: Vec<IngredientLine>,
) -> Result<Vec<NewRecipeIngredient>> {
    if lines.is_empty() {
        return Ok(vec![]);
    }

    let names: BTreeSet<_> = lines.iter().map(|l| l.name.clone()).collect();
    let mut pool: HashMap<String, Ingredient> = HashMap::new();
    for ingredient in store
        .ingredients()
        .find_by_predicate(&ingredient_names_in(names))?
    {
        pool.entry(ingredient.name.clone()).or_insert(ingredient);
    }

    Ok(lines
        .into_iter()
        .map(|line| {
            let ingredient = match pool.get(&line.name) {
                Some(ingredient) => IngredientRef::Pooled(ingredient.clone()),
                None => IngredientRef::Unresolved(line.name),
            };
            NewRecipeIngredient {
                recipe_id,
                ingredient,
                amount: line.amount,
                measure: line.measure,
            }
        })
        .collect())
}

pub fn create(store: &mut dyn EntityStore, draft: RecipeDraft) -> Result<RecipeId> {
    if let Some(id) = draft.recipe.id {
        if store.recipes().get_by_id(id)?.is_some() {
            return Err(Error::conflict(format!(
                "Recipe with id: {id} already exists"
            )));
        }
    }

    let recipe = store
        .recipes()
        .save_all(vec![draft.recipe])?
        .pop()
        .ok_or(diesel::result::Error::NotFound)?;

    let lines = resolve_lines(store, recipe.id, draft.lines)?;
    log::debug!(
        "saving {} ingredient lines for new recipe {}",
        lines.len(),
        recipe.id
    );
    if !lines.is_empty() {
        store.recipe_ingredients().save_all(lines)?;
    }
    Ok(recipe.id)
}

/// Overwrites the recipe's scalar fields and writes only the ingredient lines that are not
/// already stored. With [`IngredientUpdate::Replace`] stored lines missing from the draft are
/// deleted too.
pub fn update(
    store: &mut dyn EntityStore,
    recipe_id: RecipeId,
    draft: RecipeDraft,
    mode: IngredientUpdate,
) -> Result<()> {
    if store.recipes().get_by_id(recipe_id)?.is_none() {
        return Err(recipe_does_not_exist(recipe_id));
    }

    let RecipeDraft { mut recipe, lines } = draft;

    let amounts: BTreeSet<_> = lines.iter().map(|l| l.amount).collect();
    let names: BTreeSet<_> = lines.iter().map(|l| l.name.clone()).collect();
    let measures: BTreeSet<_> = lines.iter().map(|l| l.measure).collect();
    let candidates = store.recipe_ingredients().find_by_predicate(
        &recipe_is_equal(recipe_id)
            .and(amount_in(amounts))
            .and(recipe_ingredient_names_in(names))
            .and(measures_in(measures)),
    )?;

    recipe.id = Some(recipe_id);
    store.recipes().save_all(vec![recipe])?;

    let incoming = resolve_lines(store, recipe_id, lines)?;

    if mode == IngredientUpdate::Replace {
        let stale: Vec<_> = store
            .recipe_ingredients()
            .find_by_predicate(&recipe_is_equal(recipe_id))?
            .into_iter()
            .filter(|row| !incoming.iter().any(|line| row.matches(line)))
            .collect();
        log::debug!(
            "deleting {} stale ingredient lines of recipe {recipe_id}",
            stale.len()
        );
        for row in stale {
            store.recipe_ingredients().delete_by_id(row.id)?;
        }
    }

    let batch: Vec<_> = incoming
        .into_iter()
        .filter(|line| !candidates.iter().any(|row| row.matches(line)))
        .collect();
    log::debug!(
        "saving {} new ingredient lines for recipe {recipe_id}",
        batch.len()
    );
    if !batch.is_empty() {
        store.recipe_ingredients().save_all(batch)?;
    }
    Ok(())
}

pub fn delete(store: &mut dyn EntityStore, recipe_id: RecipeId) -> Result<()> {
    if store.recipes().get_by_id(recipe_id)?.is_none() {
        return Err(recipe_does_not_exist(recipe_id));
    }
    store.recipes().delete_by_id(recipe_id)?;
    Ok(())
}

#[cfg(test)]
fn line(name: &str, amount: i32, measure: Measure) -> IngredientLine {
    IngredientLine {
        name: name.into(),
        amount,
        measure,
    }
}

#[cfg(test)]
fn stored_lines(
    store: &mut dyn EntityStore,
    recipe_id: RecipeId,
) -> Vec<(String, i32, Measure)> {
    store
        .recipe_ingredients()
        .find_by_predicate(&recipe_is_equal(recipe_id))
        .unwrap()
        .into_iter()
        .map(|r| (r.ingredient.name, r.amount, r.measure))
        .collect()
}

#[test]
fn create_reuses_pooled_ingredients() {
    use crate::test_data::new_recipe;

    let mut conn = crate::database::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let first = create(
        store,
        RecipeDraft {
            recipe: new_recipe("omelette"),
            lines: vec![line("egg", 2, Measure::Cup)],
        },
    )
    .unwrap();
    let second = create(
        store,
        RecipeDraft {
            recipe: new_recipe("cake"),
            lines: vec![
                line("egg", 3, Measure::Cup),
                line("flour", 200, Measure::Gram),
            ],
        },
    )
    .unwrap();
    assert_ne!(first, second);

    let names: Vec<_> = store
        .ingredients()
        .get_all()
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["egg", "flour"]);
    assert_eq!(
        stored_lines(store, second),
        [
            ("egg".to_owned(), 3, Measure::Cup),
            ("flour".to_owned(), 200, Measure::Gram)
        ]
    );
}

#[test]
fn duplicate_pool_names_resolve_to_lowest_id() {
    use crate::database::models::NewIngredient;
    use crate::test_data::new_recipe;

    let mut conn = crate::database::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let egg = || NewIngredient {
        id: None,
        name: "egg".into(),
    };
    let pooled = store.ingredients().save_all(vec![egg(), egg()]).unwrap();
    let lowest = pooled.iter().map(|i| i.id).min().unwrap();

    let recipe_id = create(
        store,
        RecipeDraft {
            recipe: new_recipe("omelette"),
            lines: vec![line("egg", 2, Measure::Cup), line("Egg", 1, Measure::Cup)],
        },
    )
    .unwrap();

    let lines = store
        .recipe_ingredients()
        .find_by_predicate(&recipe_is_equal(recipe_id))
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].ingredient.id, lowest);
    assert_eq!(lines[0].ingredient.name, "egg");

    // Names match exactly, so a different case is a new ingredient.
    assert_eq!(lines[1].ingredient.name, "Egg");
    assert!(pooled.iter().all(|i| i.id != lines[1].ingredient.id));
    assert_eq!(store.ingredients().get_all().unwrap().len(), 3);
}

#[test]
fn create_with_existing_id_conflicts() {
    use crate::error::Status;
    use crate::test_data::new_recipe;

    let mut conn = crate::database::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let mut recipe = new_recipe("soup");
    recipe.id = Some(RecipeId::new(7));
    let draft = RecipeDraft {
        recipe,
        lines: vec![],
    };
    assert_eq!(create(store, draft.clone()).unwrap(), RecipeId::new(7));

    let error = create(store, draft).unwrap_err();
    assert_eq!(error.status(), Some(Status::Conflict));
    assert_eq!(error.to_string(), "Recipe with id: 7 already exists");
}

#[test]
fn additive_update_only_writes_new_lines() {
    use crate::test_data::new_recipe;

    let mut conn = crate::database::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let recipe_id = create(
        store,
        RecipeDraft {
            recipe: new_recipe("omelette"),
            lines: vec![line("egg", 100, Measure::Gram)],
        },
    )
    .unwrap();

    let mut renamed = new_recipe("scrambled eggs");
    renamed.number_of_servings = Some(2);
    update(
        store,
        recipe_id,
        RecipeDraft {
            recipe: renamed.clone(),
            lines: vec![line("egg", 100, Measure::Gram)],
        },
        IngredientUpdate::Additive,
    )
    .unwrap();
    assert_eq!(store.recipe_ingredients().get_all().unwrap().len(), 1);
    let stored = store.recipes().get_by_id(recipe_id).unwrap().unwrap();
    assert_eq!(stored.name, "scrambled eggs");
    assert_eq!(stored.number_of_servings, Some(2));

    update(
        store,
        recipe_id,
        RecipeDraft {
            recipe: renamed,
            lines: vec![line("egg", 200, Measure::Gram)],
        },
        IngredientUpdate::Additive,
    )
    .unwrap();
    assert_eq!(
        stored_lines(store, recipe_id),
        [
            ("egg".to_owned(), 100, Measure::Gram),
            ("egg".to_owned(), 200, Measure::Gram)
        ]
    );
    assert_eq!(store.ingredients().get_all().unwrap().len(), 1);
}

#[test]
fn replace_update_deletes_stale_lines() {
    use crate::test_data::new_recipe;

    let mut conn = crate::database::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let recipe_id = create(
        store,
        RecipeDraft {
            recipe: new_recipe("omelette"),
            lines: vec![
                line("egg", 100, Measure::Gram),
                line("salt", 1, Measure::Teaspoon),
            ],
        },
    )
    .unwrap();

    update(
        store,
        recipe_id,
        RecipeDraft {
            recipe: new_recipe("omelette"),
            lines: vec![
                line("egg", 200, Measure::Gram),
                line("salt", 1, Measure::Teaspoon),
            ],
        },
        IngredientUpdate::Replace,
    )
    .unwrap();
    assert_eq!(
        stored_lines(store, recipe_id),
        [
            ("salt".to_owned(), 1, Measure::Teaspoon),
            ("egg".to_owned(), 200, Measure::Gram)
        ]
    );
}

#[test]
fn update_and_delete_unknown_recipe() {
    use crate::error::Status;
    use crate::test_data::new_recipe;

    let mut conn = crate::database::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let draft = RecipeDraft {
        recipe: new_recipe("ghost"),
        lines: vec![],
    };
    let error = update(store, RecipeId::new(3), draft, IngredientUpdate::Additive).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));
    assert_eq!(error.to_string(), "Recipe with id: 3 does not exist");

    let error = delete(store, RecipeId::new(3)).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));
    assert!(store.recipes().get_all().unwrap().is_empty());
}

#[test]
fn delete_removes_recipe_and_lines() {
    use crate::test_data::new_recipe;

    let mut conn = crate::database::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let recipe_id = create(
        store,
        RecipeDraft {
            recipe: new_recipe("omelette"),
            lines: vec![line("egg", 100, Measure::Gram)],
        },
    )
    .unwrap();
    delete(store, recipe_id).unwrap();
    assert!(store.recipes().get_by_id(recipe_id).unwrap().is_none());
    assert!(store.recipe_ingredients().get_all().unwrap().is_empty());
}
