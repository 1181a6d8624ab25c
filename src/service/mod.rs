// Copyright 2023 Remi Bernotavicius

use crate::database::models::RecipeId;
use crate::database::store::EntityStore;
use crate::search::{dispatch, SearchFilter, SearchFilterRequest};
use crate::Result;
use mapper::RecipeView;

pub mod mapper;
pub mod reconcile;

/// What an update does with stored ingredient lines the incoming recipe no longer lists.
#[derive(clap::ValueEnum, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum IngredientUpdate {
    /// Keep them; only new or changed lines are written.
    #[default]
    Additive,
    /// Delete them, so the stored lines end up equal to the incoming ones.
    Replace,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Reject unknown filter criteria instead of answering with no recipes.
    pub strict_criteria: bool,
    pub ingredient_update: IngredientUpdate,
}

pub struct RecipeService<'a> {
    store: &'a mut dyn EntityStore,
    settings: ServiceSettings,
}

impl<'a> RecipeService<'a> {
    pub fn new(store: &'a mut dyn EntityStore, settings: ServiceSettings) -> Self {
        Self { store, settings }
    }

    pub fn list_recipes(&mut self) -> Result<Vec<RecipeView>> {
        let recipes = self.store.recipes().get_all()?;
        mapper::to_views(self.store, recipes)
    }

    pub fn get_recipe(&mut self, recipe_id: RecipeId) -> Result<RecipeView> {
        let recipe = self
            .store
            .recipes()
            .get_by_id(recipe_id)?
            .ok_or_else(|| reconcile::recipe_does_not_exist(recipe_id))?;
        let mut views = mapper::to_views(self.store, vec![recipe])?;
        views
            .pop()
            .ok_or_else(|| reconcile::recipe_does_not_exist(recipe_id))
    }

    pub fn create_recipe(&mut self, recipe: RecipeView) -> Result<RecipeId> {
        let draft = mapper::to_draft(recipe)?;
        let recipe_id = reconcile::create(self.store, draft)?;
        log::info!("created recipe {recipe_id}");
        Ok(recipe_id)
    }

    pub fn update_recipe(&mut self, recipe_id: RecipeId, recipe: RecipeView) -> Result<()> {
        let draft = mapper::to_draft(recipe)?;
        reconcile::update(self.store, recipe_id, draft, self.settings.ingredient_update)?;
        log::info!("updated recipe {recipe_id}");
        Ok(())
    }

    pub fn delete_recipe(&mut self, recipe_id: RecipeId) -> Result<()> {
        reconcile::delete(self.store, recipe_id)?;
        log::info!("deleted recipe {recipe_id}");
        Ok(())
    }

    pub fn search_recipes(&mut self, request: SearchFilterRequest) -> Result<Vec<RecipeView>> {
        let Some(filter) = SearchFilter::from_request(request, self.settings.strict_criteria)?
        else {
            return Ok(vec![]);
        };
        let recipes = dispatch::search(self.store, &filter)?;
        mapper::to_views(self.store, recipes)
    }
}

#[cfg(test)]
fn pancakes() -> RecipeView {
    serde_json::from_value(serde_json::json!({
        "name": "pancakes",
        "instruction": "Whisk and fry",
        "is_vegetarian": true,
        "number_of_servings": 4,
        "recipe_ingredients": [
            {"ingredient": {"name": "egg"}, "amount": 100, "measure": "gram"},
            {"ingredient": {"name": "milk"}, "amount": 1, "measure": "cup"}
        ]
    }))
    .unwrap()
}

#[test]
fn create_then_get() {
    let mut conn = crate::database::establish_test_connection();
    let mut service = RecipeService::new(&mut conn, ServiceSettings::default());

    let recipe_id = service.create_recipe(pancakes()).unwrap();
    let stored = service.get_recipe(recipe_id).unwrap();
    assert_eq!(stored.recipe_id, Some(recipe_id));
    assert_eq!(stored.name, "pancakes");
    assert_eq!(stored.recipe_ingredients.len(), 2);

    let all = service.list_recipes().unwrap();
    assert_eq!(all, [stored]);
}

#[test]
fn unknown_ids() {
    use crate::error::Status;

    let mut conn = crate::database::establish_test_connection();
    let mut service = RecipeService::new(&mut conn, ServiceSettings::default());
    let missing = RecipeId::new(12);

    let error = service.get_recipe(missing).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));
    let error = service.update_recipe(missing, pancakes()).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));
    let error = service.delete_recipe(missing).unwrap_err();
    assert_eq!(error.status(), Some(Status::NotFound));

    let mut with_id = pancakes();
    with_id.recipe_id = Some(missing);
    assert_eq!(service.create_recipe(with_id.clone()).unwrap(), missing);
    let error = service.create_recipe(with_id).unwrap_err();
    assert_eq!(error.status(), Some(Status::Conflict));
}

#[test]
fn replace_mode_update() {
    let mut conn = crate::database::establish_test_connection();
    let settings = ServiceSettings {
        ingredient_update: IngredientUpdate::Replace,
        ..Default::default()
    };
    let mut service = RecipeService::new(&mut conn, settings);

    let recipe_id = service.create_recipe(pancakes()).unwrap();
    let mut changed = service.get_recipe(recipe_id).unwrap();
    changed.recipe_ingredients.truncate(1);
    changed.recipe_ingredients[0].amount = 150;
    service.update_recipe(recipe_id, changed).unwrap();

    let stored = service.get_recipe(recipe_id).unwrap();
    let lines: Vec<_> = stored
        .recipe_ingredients
        .iter()
        .map(|l| (l.ingredient.name.as_str(), l.amount))
        .collect();
    assert_eq!(lines, [("egg", 150)]);
}

#[test]
fn search_by_criterion() {
    use crate::error::Status;
    use crate::search::FilterValues;

    let mut conn = crate::database::establish_test_connection();
    let mut service = RecipeService::new(&mut conn, ServiceSettings::default());
    service.create_recipe(pancakes()).unwrap();

    let found = service
        .search_recipes(SearchFilterRequest {
            filter_criteria: "IS_VEGETARIAN".into(),
            filter_values: FilterValues {
                is_vegetarian: Some(true),
                ..Default::default()
            },
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].recipe_ingredients.len(), 2);

    let found = service
        .search_recipes(SearchFilterRequest {
            filter_criteria: "BY_COLOUR".into(),
            filter_values: FilterValues::default(),
        })
        .unwrap();
    assert!(found.is_empty());

    let mut strict = RecipeService::new(
        &mut conn,
        ServiceSettings {
            strict_criteria: true,
            ..Default::default()
        },
    );
    let error = strict
        .search_recipes(SearchFilterRequest {
            filter_criteria: "BY_COLOUR".into(),
            filter_values: FilterValues::default(),
        })
        .unwrap_err();
    assert_eq!(error.status(), Some(Status::BadRequest));
}
