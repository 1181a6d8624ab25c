// Copyright 2023 Remi Bernotavicius

use crate::database::models::RecipeId;
use crate::database::Connection;
use crate::search::SearchFilterRequest;
use crate::service::mapper::{CreatedRecipe, RecipeList, RecipeView};
use crate::service::{RecipeService, ServiceSettings};
use crate::{Error, Result};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    settings: ServiceSettings,
}

impl AppState {
    pub fn new(conn: Connection, settings: ServiceSettings) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            settings,
        }
    }

    /// Runs `f` on the blocking pool with exclusive use of the connection.
    async fn with_service<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut RecipeService<'_>) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let settings = self.settings;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| Error::Poisoned)?;
            let mut service = RecipeService::new(&mut *conn, settings);
            f(&mut service)
        })
        .await?
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/filter", post(search_recipes))
        .route(
            "/recipes/:recipe_id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .with_state(state)
}

async fn list_recipes(State(state): State<AppState>) -> Result<Json<RecipeList>> {
    let recipes = state.with_service(|s| s.list_recipes()).await?;
    Ok(Json(RecipeList { recipes }))
}

async fn get_recipe(
    State(state): State<AppState>,
    path: std::result::Result<Path<RecipeId>, PathRejection>,
) -> Result<Json<RecipeView>> {
    let Path(recipe_id) = path?;
    let recipe = state.with_service(move |s| s.get_recipe(recipe_id)).await?;
    Ok(Json(recipe))
}

async fn create_recipe(
    State(state): State<AppState>,
    body: std::result::Result<Json<RecipeView>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(recipe) = body?;
    let recipe_id = state.with_service(|s| s.create_recipe(recipe)).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/recipes/{recipe_id}"))],
        Json(CreatedRecipe { recipe_id }),
    ))
}

async fn update_recipe(
    State(state): State<AppState>,
    path: std::result::Result<Path<RecipeId>, PathRejection>,
    body: std::result::Result<Json<RecipeView>, JsonRejection>,
) -> Result<StatusCode> {
    let Path(recipe_id) = path?;
    let Json(recipe) = body?;
    state
        .with_service(move |s| s.update_recipe(recipe_id, recipe))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_recipe(
    State(state): State<AppState>,
    path: std::result::Result<Path<RecipeId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(recipe_id) = path?;
    state
        .with_service(move |s| s.delete_recipe(recipe_id))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn search_recipes(
    State(state): State<AppState>,
    body: std::result::Result<Json<SearchFilterRequest>, JsonRejection>,
) -> Result<Json<RecipeList>> {
    let Json(request) = body?;
    let recipes = state
        .with_service(|s| s.search_recipes(request))
        .await?;
    Ok(Json(RecipeList { recipes }))
}

#[cfg(test)]
fn test_router() -> Router {
    router(AppState::new(
        crate::database::establish_test_connection(),
        ServiceSettings::default(),
    ))
}

#[cfg(test)]
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
}

#[tokio::test]
async fn recipe_lifecycle() {
    use serde_json::json;

    let app = test_router();
    let omelette = json!({
        "name": "omelette",
        "instruction": "Whisk & fry",
        "is_vegetarian": true,
        "number_of_servings": 1,
        "recipe_ingredients": [
            {"ingredient": {"name": "egg"}, "amount": 100, "measure": "gram"}
        ]
    });

    let (status, headers, body) = send(&app, "POST", "/recipes", Some(omelette.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let recipe_id = body["recipe_id"].as_i64().unwrap();
    assert_eq!(headers[header::LOCATION], format!("/recipes/{recipe_id}"));

    let uri = format!("/recipes/{recipe_id}");
    let (status, _, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "omelette");
    assert_eq!(body["instruction"], "Whisk  fry");
    assert_eq!(body["recipe_ingredients"][0]["ingredient"]["name"], "egg");
    assert_eq!(body["recipe_ingredients"][0]["measure"], "gram");

    let mut changed = omelette;
    changed["name"] = json!("big omelette");
    let (status, _, _) = send(&app, "PUT", &uri, Some(changed)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = send(&app, "GET", "/recipes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(body["recipes"][0]["name"], "big omelette");
    assert_eq!(
        body["recipes"][0]["recipe_ingredients"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let (status, _, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "404 Not Found");
    assert_eq!(
        body["message"],
        format!("Recipe with id: {recipe_id} does not exist")
    );
}

#[tokio::test]
async fn filter_endpoint() {
    use serde_json::json;

    let app = test_router();

    let filter = json!({
        "filter_criteria": "INCL_INGREDIENTS",
        "filter_values": {"ingredients": ["egg", "sugar"]}
    });
    let (status, _, body) = send(&app, "POST", "/recipes/filter", Some(filter.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "404 Not Found");

    for (name, ingredient) in [("meringue", "sugar"), ("salad", "lettuce")] {
        let recipe = json!({
            "name": name,
            "recipe_ingredients": [
                {"ingredient": {"name": ingredient}, "amount": 1, "measure": "cup"}
            ]
        });
        let (status, _, _) = send(&app, "POST", "/recipes", Some(recipe)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, body) = send(&app, "POST", "/recipes/filter", Some(filter)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["meringue"]);

    let filter = json!({
        "filter_criteria": "NUMBER_OF_SERVINGS",
        "filter_values": {}
    });
    let (status, _, body) = send(&app, "POST", "/recipes/filter", Some(filter)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "400 Bad Request");
}

#[tokio::test]
async fn malformed_bodies() {
    let app = test_router();

    let (status, _, body) = send(
        &app,
        "POST",
        "/recipes",
        Some(serde_json::json!({"recipe_ingredients": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "400 Bad Request");

    let empty_name = serde_json::json!({"name": ""});
    let (status, _, _) = send(&app, "POST", "/recipes", Some(empty_name)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_recipe_ids() {
    let app = test_router();

    for method in ["GET", "DELETE"] {
        let (status, _, body) = send(&app, method, "/recipes/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "400 Bad Request");
        assert!(body["message"].as_str().unwrap().contains("abc"));
    }

    let recipe = serde_json::json!({"name": "soup"});
    let (status, _, body) = send(&app, "PUT", "/recipes/abc", Some(recipe)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "400 Bad Request");
}
