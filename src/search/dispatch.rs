// Copyright 2023 Remi Bernotavicius

use super::predicate::{
    ingredients_contain, ingredients_do_not_contain, instruction_contains_ignore_case,
    number_of_servings_at_least, number_of_servings_equal, recipe_is_vegetarian,
};
use super::SearchFilter;
use crate::database::models::Recipe;
use crate::database::store::EntityStore;
use crate::{Error, Result};
use std::collections::BTreeSet;

fn names_display(names: &BTreeSet<String>) -> String {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    format!("[{}]", names.join(", "))
}

/// Every recipe with at least one of the named ingredients, or `not_found` if there are none.
fn recipes_with_ingredients(
    store: &mut dyn EntityStore,
    ingredients: &BTreeSet<String>,
    not_found: impl FnOnce() -> String,
) -> Result<Vec<Recipe>> {
    let recipes = store
        .recipes()
        .find_by_predicate(&ingredients_contain(ingredients.clone()))?;
    if recipes.is_empty() {
        return Err(Error::not_found(not_found()));
    }
    Ok(recipes)
}

fn ingredients_not_found(ingredients: &BTreeSet<String>) -> String {
    format!(
        "Recipe with ingredients name {} was not found",
        names_display(ingredients)
    )
}

/// Runs the one query strategy that belongs to the filter's criterion.
pub fn search(store: &mut dyn EntityStore, filter: &SearchFilter) -> Result<Vec<Recipe>> {
    log::info!("searching recipes by {}", filter.criterion());

    let recipes = match filter {
        SearchFilter::Instruction { instruction } => store
            .recipes()
            .find_by_predicate(&instruction_contains_ignore_case(instruction))?,
        SearchFilter::IsVegetarian { is_vegetarian } => store
            .recipes()
            .find_by_predicate(&recipe_is_vegetarian(*is_vegetarian))?,
        SearchFilter::NumberOfServings { number_of_servings } => store
            .recipes()
            .find_by_predicate(&number_of_servings_equal(*number_of_servings))?,
        SearchFilter::NumberOfServingsGreaterThanEqual { number_of_servings } => store
            .recipes()
            .find_by_predicate(&number_of_servings_at_least(*number_of_servings))?,
        SearchFilter::InclIngredients { ingredients } => {
            recipes_with_ingredients(store, ingredients, || ingredients_not_found(ingredients))?
        }
        SearchFilter::ExclIngredients { ingredients } => {
            recipes_with_ingredients(store, ingredients, || ingredients_not_found(ingredients))?;
            store
                .recipes()
                .find_by_predicate(&ingredients_do_not_contain(ingredients.clone()))?
        }
        SearchFilter::IsVegetarianAndNumberOfServings {
            is_vegetarian,
            number_of_servings,
        } => store.recipes().find_by_predicate(
            &recipe_is_vegetarian(*is_vegetarian)
                .and(number_of_servings_equal(*number_of_servings)),
        )?,
        SearchFilter::IngredientAndNumberOfServings {
            ingredients,
            number_of_servings,
        } => store.recipes().find_by_predicate(
            &ingredients_contain(ingredients.clone())
                .and(number_of_servings_equal(*number_of_servings)),
        )?,
        SearchFilter::ExclIngredientAndInclInstruction {
            ingredients,
            instruction,
        } => {
            recipes_with_ingredients(store, ingredients, || {
                format!(
                    "Recipe with excluded ingredients \"{}\" and instruction \"{instruction}\" \
                    was not found",
                    names_display(ingredients)
                )
            })?;
            store.recipes().find_by_predicate(
                &ingredients_do_not_contain(ingredients.clone())
                    .and(instruction_contains_ignore_case(instruction)),
            )?
        }
        SearchFilter::InstructionAndIsVegetarianAndNumberOfServings {
            instruction,
            is_vegetarian,
            number_of_servings,
        } => store.recipes().find_by_predicate(
            &instruction_contains_ignore_case(instruction)
                .and(recipe_is_vegetarian(*is_vegetarian))
                .and(number_of_servings_equal(*number_of_servings)),
        )?,
        SearchFilter::IngredientsAndInstructionAndIsVegetarianAndNumberOfServings {
            ingredients,
            instruction,
            is_vegetarian,
            number_of_servings,
        } => {
            let found = store.recipes().find_by_predicate(
                &ingredients_contain(ingredients.clone())
                    .and(instruction_contains_ignore_case(instruction))
                    .and(recipe_is_vegetarian(*is_vegetarian))
                    .and(number_of_servings_equal(*number_of_servings)),
            )?;
            dedup_by_id(found)
        }
    };
    Ok(recipes)
}

/// Keeps the first recipe seen for each id, in order.
fn dedup_by_id(recipes: Vec<Recipe>) -> Vec<Recipe> {
    let mut seen = BTreeSet::new();
    recipes.into_iter().filter(|r| seen.insert(r.id)).collect()
}

#[cfg(test)]
fn seed(conn: &mut crate::database::Connection) {
    use crate::test_data::{add_recipe, TestRecipe};

    add_recipe(
        conn,
        TestRecipe {
            name: "omelette",
            instruction: "Whisk the eggs. Fry in butter",
            is_vegetarian: true,
            number_of_servings: 1,
            ingredients: &["egg", "butter"],
        },
    );
    add_recipe(
        conn,
        TestRecipe {
            name: "cake",
            instruction: "Add eggs, flour, to a pan. Bake at 200 for 1 hour",
            is_vegetarian: true,
            number_of_servings: 3,
            ingredients: &["egg", "sugar", "flour"],
        },
    );
    add_recipe(
        conn,
        TestRecipe {
            name: "salmon",
            instruction: "Bake at 180 for 20 minutes",
            is_vegetarian: false,
            number_of_servings: 3,
            ingredients: &["salmon", "lemon"],
        },
    );
    add_recipe(
        conn,
        TestRecipe {
            name: "toast",
            instruction: "Toast the bread",
            is_vegetarian: true,
            number_of_servings: 4,
            ingredients: &[],
        },
    );
}

#[cfg(test)]
fn search_names(conn: &mut crate::database::Connection, filter: SearchFilter) -> Vec<String> {
    search(conn, &filter)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect()
}

#[test]
fn single_field_strategies() {
    let mut conn = crate::database::establish_test_connection();
    seed(&mut conn);

    let filter = SearchFilter::Instruction {
        instruction: "bake".into(),
    };
    assert_eq!(search_names(&mut conn, filter), ["cake", "salmon"]);

    let filter = SearchFilter::IsVegetarian {
        is_vegetarian: true,
    };
    assert_eq!(
        search_names(&mut conn, filter),
        ["omelette", "cake", "toast"]
    );

    let filter = SearchFilter::IsVegetarian {
        is_vegetarian: false,
    };
    assert_eq!(search_names(&mut conn, filter), ["salmon"]);

    let filter = SearchFilter::NumberOfServings {
        number_of_servings: 3,
    };
    assert_eq!(search_names(&mut conn, filter), ["cake", "salmon"]);

    let filter = SearchFilter::NumberOfServingsGreaterThanEqual {
        number_of_servings: 3,
    };
    assert_eq!(
        search_names(&mut conn, filter),
        ["cake", "salmon", "toast"]
    );
}

#[test]
fn instruction_search_folds_non_ascii_case() {
    use crate::test_data::{add_recipe, TestRecipe};

    let mut conn = crate::database::establish_test_connection();
    seed(&mut conn);
    add_recipe(
        &mut conn,
        TestRecipe {
            name: "brulee",
            instruction: "Torch the CRÈME until golden",
            is_vegetarian: true,
            number_of_servings: 2,
            ..Default::default()
        },
    );

    for needle in ["crème", "CRÈME", "Crème"] {
        let filter = SearchFilter::Instruction {
            instruction: needle.into(),
        };
        assert_eq!(search_names(&mut conn, filter), ["brulee"]);
    }
}

#[test]
fn including_ingredients() {
    use crate::error::Status;
    use crate::test_data::{add_recipe, TestRecipe};
    use maplit::btreeset;

    let mut conn = crate::database::establish_test_connection();

    let filter = SearchFilter::InclIngredients {
        ingredients: btreeset! {"egg".into(), "sugar".into()},
    };
    let error = search(&mut conn, &filter).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));
    assert_eq!(
        error.to_string(),
        "Recipe with ingredients name [egg, sugar] was not found"
    );

    add_recipe(
        &mut conn,
        TestRecipe {
            name: "meringue",
            ingredients: &["egg", "sugar"],
            ..Default::default()
        },
    );
    add_recipe(
        &mut conn,
        TestRecipe {
            name: "salad",
            ingredients: &["lettuce"],
            ..Default::default()
        },
    );
    assert_eq!(search_names(&mut conn, filter), ["meringue"]);
}

#[test]
fn excluding_ingredients() {
    use crate::error::Status;
    use maplit::btreeset;

    let mut conn = crate::database::establish_test_connection();
    seed(&mut conn);

    let filter = SearchFilter::ExclIngredients {
        ingredients: btreeset! {"egg".into()},
    };
    assert_eq!(search_names(&mut conn, filter), ["salmon", "toast"]);

    let filter = SearchFilter::ExclIngredients {
        ingredients: btreeset! {"truffle".into()},
    };
    let error = search(&mut conn, &filter).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));
}

#[test]
fn compound_strategies() {
    use crate::error::Status;
    use maplit::btreeset;

    let mut conn = crate::database::establish_test_connection();
    seed(&mut conn);

    let filter = SearchFilter::IsVegetarianAndNumberOfServings {
        is_vegetarian: true,
        number_of_servings: 3,
    };
    assert_eq!(search_names(&mut conn, filter), ["cake"]);

    // No error step here, an empty match is just empty.
    let filter = SearchFilter::IngredientAndNumberOfServings {
        ingredients: btreeset! {"egg".into()},
        number_of_servings: 4,
    };
    assert!(search_names(&mut conn, filter).is_empty());

    let filter = SearchFilter::IngredientAndNumberOfServings {
        ingredients: btreeset! {"egg".into(), "salmon".into()},
        number_of_servings: 3,
    };
    assert_eq!(search_names(&mut conn, filter), ["cake", "salmon"]);

    let filter = SearchFilter::ExclIngredientAndInclInstruction {
        ingredients: btreeset! {"egg".into()},
        instruction: "BAKE".into(),
    };
    assert_eq!(search_names(&mut conn, filter), ["salmon"]);

    let filter = SearchFilter::ExclIngredientAndInclInstruction {
        ingredients: btreeset! {"truffle".into()},
        instruction: "bake".into(),
    };
    let error = search(&mut conn, &filter).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));
    assert_eq!(
        error.to_string(),
        "Recipe with excluded ingredients \"[truffle]\" and instruction \"bake\" was not found"
    );

    let filter = SearchFilter::InstructionAndIsVegetarianAndNumberOfServings {
        instruction: "bake at".into(),
        is_vegetarian: false,
        number_of_servings: 3,
    };
    assert_eq!(search_names(&mut conn, filter), ["salmon"]);
}

#[test]
fn four_way_conjunction_has_no_duplicates() {
    use maplit::btreeset;

    let mut conn = crate::database::establish_test_connection();
    seed(&mut conn);

    // The cake matches through three of its ingredient lines.
    let filter = SearchFilter::IngredientsAndInstructionAndIsVegetarianAndNumberOfServings {
        ingredients: btreeset! {"egg".into(), "sugar".into(), "flour".into()},
        instruction: "Bake".into(),
        is_vegetarian: true,
        number_of_servings: 3,
    };
    assert_eq!(search_names(&mut conn, filter), ["cake"]);
}

#[test]
fn dedup_keeps_first() {
    let mut conn = crate::database::establish_test_connection();
    seed(&mut conn);

    let store: &mut dyn EntityStore = &mut conn;
    let all = store.recipes().get_all().unwrap();
    let doubled: Vec<_> = all.iter().chain(all.iter()).cloned().collect();
    assert_eq!(dedup_by_id(doubled), all);
}
