// Copyright 2023 Remi Bernotavicius

use super::models::{
    Ingredient, IngredientId, IngredientRef, NewIngredient, NewRecipe, NewRecipeIngredient,
    Recipe, RecipeId, RecipeIngredient, RecipeIngredientId, RecipeIngredientInsert,
    RecipeIngredientRow,
};
use super::schema::{ingredients, recipe_ingredients, recipes};
use super::{unicode_lower, Connection};
use crate::search::predicate::{
    IngredientCondition, Predicate, RecipeCondition, RecipeIngredientCondition,
};
use diesel::dsl;
use diesel::expression_methods::TextExpressionMethods as _;
use diesel::prelude::Connection as _;
use diesel::result::QueryResult;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::{BTreeSet, HashMap};

pub trait Entity: Sized {
    type Id: Copy + Ord;
    type Condition;
    /// What `save_all` accepts.
    type Draft;

    fn id_in(ids: BTreeSet<Self::Id>) -> Self::Condition;
}

impl Entity for Recipe {
    type Id = RecipeId;
    type Condition = RecipeCondition;
    type Draft = NewRecipe;

    fn id_in(ids: BTreeSet<RecipeId>) -> RecipeCondition {
        RecipeCondition::IdIn(ids)
    }
}

impl Entity for Ingredient {
    type Id = IngredientId;
    type Condition = IngredientCondition;
    type Draft = NewIngredient;

    fn id_in(ids: BTreeSet<IngredientId>) -> IngredientCondition {
        IngredientCondition::IdIn(ids)
    }
}

impl Entity for RecipeIngredient {
    type Id = RecipeIngredientId;
    type Condition = RecipeIngredientCondition;
    type Draft = NewRecipeIngredient;

    fn id_in(ids: BTreeSet<RecipeIngredientId>) -> RecipeIngredientCondition {
        RecipeIngredientCondition::IdIn(ids)
    }
}

/// Read and write access to one entity collection.
pub trait Repository<E: Entity> {
    fn find_by_predicate(&mut self, predicate: &Predicate<E::Condition>) -> QueryResult<Vec<E>>;

    /// Returns what was persisted, with identities filled in.
    fn save_all(&mut self, drafts: Vec<E::Draft>) -> QueryResult<Vec<E>>;

    fn delete_by_id(&mut self, id: E::Id) -> QueryResult<()>;

    fn get_by_id(&mut self, id: E::Id) -> QueryResult<Option<E>> {
        Ok(self.find_by_id_set(&BTreeSet::from([id]))?.into_iter().next())
    }

    fn get_all(&mut self) -> QueryResult<Vec<E>> {
        self.find_by_predicate(&Predicate::all())
    }

    fn find_by_id_set(&mut self, ids: &BTreeSet<E::Id>) -> QueryResult<Vec<E>> {
        self.find_by_predicate(&Predicate::new(E::id_in(ids.clone())))
    }
}

/// Everything the recipe service persists through.
pub trait EntityStore {
    fn recipes(&mut self) -> &mut dyn Repository<Recipe>;
    fn ingredients(&mut self) -> &mut dyn Repository<Ingredient>;
    fn recipe_ingredients(&mut self) -> &mut dyn Repository<RecipeIngredient>;
}

impl<T> EntityStore for T
where
    T: Repository<Recipe> + Repository<Ingredient> + Repository<RecipeIngredient>,
{
    fn recipes(&mut self) -> &mut dyn Repository<Recipe> {
        self
    }

    fn ingredients(&mut self) -> &mut dyn Repository<Ingredient> {
        self
    }

    fn recipe_ingredients(&mut self) -> &mut dyn Repository<RecipeIngredient> {
        self
    }
}

type RecipeIdsWithIngredients = dsl::Select<
    dsl::Filter<
        dsl::InnerJoin<recipe_ingredients::table, ingredients::table>,
        dsl::EqAny<ingredients::name, Vec<String>>,
    >,
    recipe_ingredients::recipe_id,
>;

/// Subquery for the ids of recipes with a line naming one of `names`.
fn recipe_ids_with_ingredients(names: &BTreeSet<String>) -> RecipeIdsWithIngredients {
    recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(ingredients::name.eq_any(names.iter().cloned().collect::<Vec<_>>()))
        .select(recipe_ingredients::recipe_id)
}

impl Repository<Recipe> for Connection {
    fn find_by_predicate(
        &mut self,
        predicate: &Predicate<RecipeCondition>,
    ) -> QueryResult<Vec<Recipe>> {
        let mut query = recipes::table
            .select(Recipe::as_select())
            .order(recipes::id)
            .into_boxed();
        for condition in predicate.conditions() {
            query = match condition {
                RecipeCondition::IdIn(ids) => {
                    query.filter(recipes::id.eq_any(ids.iter().copied().collect::<Vec<_>>()))
                }
                // Both sides are folded the same way; LIKE alone only ignores ASCII case.
                RecipeCondition::InstructionContains(needle) => {
                    query.filter(unicode_lower(recipes::instruction).like(format!("%{needle}%")))
                }
                RecipeCondition::IsVegetarian(is_vegetarian) => {
                    query.filter(recipes::is_vegetarian.eq(*is_vegetarian))
                }
                RecipeCondition::NumberOfServings(number_of_servings) => {
                    query.filter(recipes::number_of_servings.eq(*number_of_servings))
                }
                RecipeCondition::NumberOfServingsAtLeast(number_of_servings) => {
                    query.filter(recipes::number_of_servings.ge(*number_of_servings))
                }
                RecipeCondition::HasIngredientNamed(names) => {
                    query.filter(recipes::id.eq_any(recipe_ids_with_ingredients(names)))
                }
                RecipeCondition::HasNoIngredientNamed(names) => {
                    query.filter(recipes::id.ne_all(recipe_ids_with_ingredients(names)))
                }
            };
        }
        query.load(self)
    }

    fn save_all(&mut self, drafts: Vec<NewRecipe>) -> QueryResult<Vec<Recipe>> {
        self.transaction(|conn| {
            drafts
                .iter()
                .map(|draft| {
                    diesel::insert_into(recipes::table)
                        .values(draft)
                        .on_conflict(recipes::id)
                        .do_update()
                        .set(draft)
                        .returning(Recipe::as_returning())
                        .get_result(conn)
                })
                .collect()
        })
    }

    fn delete_by_id(&mut self, delete_id: RecipeId) -> QueryResult<()> {
        self.transaction(|conn| {
            diesel::delete(
                recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(delete_id)),
            )
            .execute(conn)?;
            diesel::delete(recipes::table.filter(recipes::id.eq(delete_id))).execute(conn)?;
            Ok(())
        })
    }
}

impl Repository<Ingredient> for Connection {
    fn find_by_predicate(
        &mut self,
        predicate: &Predicate<IngredientCondition>,
    ) -> QueryResult<Vec<Ingredient>> {
        let mut query = ingredients::table
            .select(Ingredient::as_select())
            .order(ingredients::id)
            .into_boxed();
        for condition in predicate.conditions() {
            query = match condition {
                IngredientCondition::IdIn(ids) => {
                    query.filter(ingredients::id.eq_any(ids.iter().copied().collect::<Vec<_>>()))
                }
                IngredientCondition::NameIn(names) => query
                    .filter(ingredients::name.eq_any(names.iter().cloned().collect::<Vec<_>>())),
            };
        }
        query.load(self)
    }

    fn save_all(&mut self, drafts: Vec<NewIngredient>) -> QueryResult<Vec<Ingredient>> {
        self.transaction(|conn| {
            drafts
                .iter()
                .map(|draft| {
                    diesel::insert_into(ingredients::table)
                        .values(draft)
                        .on_conflict(ingredients::id)
                        .do_update()
                        .set(draft)
                        .returning(Ingredient::as_returning())
                        .get_result(conn)
                })
                .collect()
        })
    }

    fn delete_by_id(&mut self, delete_id: IngredientId) -> QueryResult<()> {
        diesel::delete(ingredients::table.filter(ingredients::id.eq(delete_id))).execute(self)?;
        Ok(())
    }
}

impl Repository<RecipeIngredient> for Connection {
    fn find_by_predicate(
        &mut self,
        predicate: &Predicate<RecipeIngredientCondition>,
    ) -> QueryResult<Vec<RecipeIngredient>> {
        let mut query = recipe_ingredients::table
            .inner_join(ingredients::table)
            .select((RecipeIngredientRow::as_select(), Ingredient::as_select()))
            .order(recipe_ingredients::id)
            .into_boxed();
        for condition in predicate.conditions() {
            query = match condition {
                RecipeIngredientCondition::IdIn(ids) => query.filter(
                    recipe_ingredients::id.eq_any(ids.iter().copied().collect::<Vec<_>>()),
                ),
                RecipeIngredientCondition::RecipeIn(ids) => query.filter(
                    recipe_ingredients::recipe_id.eq_any(ids.iter().copied().collect::<Vec<_>>()),
                ),
                RecipeIngredientCondition::AmountIn(amounts) => query.filter(
                    recipe_ingredients::amount.eq_any(amounts.iter().copied().collect::<Vec<_>>()),
                ),
                RecipeIngredientCondition::MeasureIn(measures) => query.filter(
                    recipe_ingredients::measure
                        .eq_any(measures.iter().copied().collect::<Vec<_>>()),
                ),
                RecipeIngredientCondition::IngredientNameIn(names) => query
                    .filter(ingredients::name.eq_any(names.iter().cloned().collect::<Vec<_>>())),
            };
        }
        Ok(query
            .load::<(RecipeIngredientRow, Ingredient)>(self)?
            .into_iter()
            .map(RecipeIngredient::from)
            .collect())
    }

    /// Unresolved ingredients are created on the way; the same unresolved name is only created
    /// once per batch.
    fn save_all(
        &mut self,
        drafts: Vec<NewRecipeIngredient>,
    ) -> QueryResult<Vec<RecipeIngredient>> {
        self.transaction(|conn| {
            let mut created: HashMap<String, Ingredient> = HashMap::new();
            let mut saved = Vec::with_capacity(drafts.len());
            for draft in drafts {
                let ingredient = match draft.ingredient {
                    IngredientRef::Pooled(ingredient) => ingredient,
                    IngredientRef::Unresolved(name) => {
                        if let Some(existing) = created.get(&name) {
                            existing.clone()
                        } else {
                            let new_ingredient: Ingredient =
                                diesel::insert_into(ingredients::table)
                                    .values(ingredients::name.eq(&name))
                                    .returning(Ingredient::as_returning())
                                    .get_result(conn)?;
                            created.insert(name, new_ingredient.clone());
                            new_ingredient
                        }
                    }
                };

                let row: RecipeIngredientRow = diesel::insert_into(recipe_ingredients::table)
                    .values(RecipeIngredientInsert {
                        recipe_id: draft.recipe_id,
                        ingredient_id: ingredient.id,
                        amount: draft.amount,
                        measure: draft.measure,
                    })
                    .returning(RecipeIngredientRow::as_returning())
                    .get_result(conn)?;
                saved.push(RecipeIngredient::from((row, ingredient)));
            }
            Ok(saved)
        })
    }

    fn delete_by_id(&mut self, delete_id: RecipeIngredientId) -> QueryResult<()> {
        diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::id.eq(delete_id)))
            .execute(self)?;
        Ok(())
    }
}

#[cfg(test)]
use crate::test_data::new_recipe;

#[test]
fn recipe_save_all_inserts_then_overwrites() {
    let mut conn = super::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let saved = store
        .recipes()
        .save_all(vec![new_recipe("pancakes"), new_recipe("waffles")])
        .unwrap();
    assert_eq!(saved.len(), 2);
    assert_ne!(saved[0].id, saved[1].id);

    let mut changed = NewRecipe::from(saved[0].clone());
    changed.name = "crepes".into();
    changed.number_of_servings = Some(4);
    store.recipes().save_all(vec![changed]).unwrap();

    let all = store.recipes().get_all().unwrap();
    assert_eq!(all.len(), 2);
    let crepes = store.recipes().get_by_id(saved[0].id).unwrap().unwrap();
    assert_eq!(crepes.name, "crepes");
    assert_eq!(crepes.number_of_servings, Some(4));
}

#[test]
fn recipe_save_all_keeps_supplied_id() {
    let mut conn = super::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let mut draft = new_recipe("soup");
    draft.id = Some(RecipeId::new(42));
    let saved = store.recipes().save_all(vec![draft]).unwrap();
    assert_eq!(saved[0].id, RecipeId::new(42));
    assert!(store.recipes().get_by_id(RecipeId::new(41)).unwrap().is_none());
}

#[test]
fn recipe_ingredient_save_all_creates_unresolved_ingredients_once() {
    use crate::database::models::Measure;
    use crate::search::predicate::{ingredient_names_in, recipe_is_equal};
    use maplit::btreeset;

    let mut conn = super::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let recipe = store.recipes().save_all(vec![new_recipe("omelette")]).unwrap()[0].clone();
    let line = |name: &str, amount| NewRecipeIngredient {
        recipe_id: recipe.id,
        ingredient: IngredientRef::Unresolved(name.into()),
        amount,
        measure: Measure::Gram,
    };
    let saved = store
        .recipe_ingredients()
        .save_all(vec![line("egg", 100), line("egg", 50), line("salt", 1)])
        .unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved[0].ingredient, saved[1].ingredient);

    let eggs = store
        .ingredients()
        .find_by_predicate(&ingredient_names_in(btreeset! {"egg".into()}))
        .unwrap();
    assert_eq!(eggs.len(), 1);

    let lines = store
        .recipe_ingredients()
        .find_by_predicate(&recipe_is_equal(recipe.id))
        .unwrap();
    assert_eq!(lines, saved);

    store.recipes().delete_by_id(recipe.id).unwrap();
    assert!(store.recipe_ingredients().get_all().unwrap().is_empty());
    // The pool outlives the recipe.
    assert_eq!(store.ingredients().get_all().unwrap().len(), 2);
}

#[test]
fn recipe_conditions() {
    use crate::database::models::Measure;
    use crate::search::predicate::{
        ingredients_contain, ingredients_do_not_contain, instruction_contains_ignore_case,
        number_of_servings_at_least,
    };
    use maplit::btreeset;

    let mut conn = super::establish_test_connection();
    let store: &mut dyn EntityStore = &mut conn;

    let mut cake = new_recipe("cake");
    cake.instruction = Some("Bake at 200 for 1 hour".into());
    cake.number_of_servings = Some(8);
    let mut salad = new_recipe("salad");
    salad.instruction = Some("Toss everything".into());
    salad.number_of_servings = Some(2);
    let saved = store.recipes().save_all(vec![cake, salad]).unwrap();
    let (cake, salad) = (saved[0].clone(), saved[1].clone());

    store
        .recipe_ingredients()
        .save_all(vec![NewRecipeIngredient {
            recipe_id: cake.id,
            ingredient: IngredientRef::Unresolved("egg".into()),
            amount: 2,
            measure: Measure::Cup,
        }])
        .unwrap();

    let found = store
        .recipes()
        .find_by_predicate(&instruction_contains_ignore_case("BAKE"))
        .unwrap();
    assert_eq!(found, [cake.clone()]);

    let found = store
        .recipes()
        .find_by_predicate(&number_of_servings_at_least(2))
        .unwrap();
    assert_eq!(found, [cake.clone(), salad.clone()]);

    let found = store
        .recipes()
        .find_by_predicate(&ingredients_contain(btreeset! {"egg".into()}))
        .unwrap();
    assert_eq!(found, [cake.clone()]);

    let found = store
        .recipes()
        .find_by_predicate(&ingredients_do_not_contain(btreeset! {"egg".into()}))
        .unwrap();
    assert_eq!(found, [salad]);

    let found = store
        .recipes()
        .find_by_predicate(&ingredients_contain(btreeset! {"Egg".into()}))
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn ingredient_conditions_scale_past_bind_limits() {
    use crate::search::predicate::{ingredients_contain, ingredients_do_not_contain};
    use maplit::btreeset;

    // More recipes than SQLite allows bound parameters in one statement.
    const EGG_RECIPES: i32 = 33_000;

    let mut conn = super::establish_test_connection();
    conn.transaction(|conn| {
        diesel::insert_into(ingredients::table)
            .values((ingredients::id.eq(1), ingredients::name.eq("egg")))
            .execute(conn)?;
        diesel::sql_query(
            "INSERT INTO recipes (id, name) \
            WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < ?) \
            SELECT i, 'recipe ' || i FROM n",
        )
        .bind::<diesel::sql_types::Integer, _>(EGG_RECIPES + 1)
        .execute(conn)?;
        diesel::sql_query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, measure) \
            SELECT id, 1, 1, ? FROM recipes WHERE id <= ?",
        )
        .bind::<super::models::MeasureMapping, _>(super::models::Measure::Gram)
        .bind::<diesel::sql_types::Integer, _>(EGG_RECIPES)
        .execute(conn)?;
        QueryResult::Ok(())
    })
    .unwrap();

    let store: &mut dyn EntityStore = &mut conn;
    let with_egg = store
        .recipes()
        .find_by_predicate(&ingredients_contain(btreeset! {"egg".into()}))
        .unwrap();
    assert_eq!(with_egg.len(), EGG_RECIPES as usize);

    let without_egg = store
        .recipes()
        .find_by_predicate(&ingredients_do_not_contain(btreeset! {"egg".into()}))
        .unwrap();
    let names: Vec<_> = without_egg.into_iter().map(|r| r.name).collect();
    assert_eq!(names, [format!("recipe {}", EGG_RECIPES + 1)]);
}
