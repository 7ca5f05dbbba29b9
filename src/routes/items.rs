use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::db::{CreateStockItem, StockItem, UpdateStockItem};
use crate::error::AppResult;
use crate::middleware::StockContext;
use crate::services::ItemService;
use crate::AppState;

/// Item CRUD on the effective owner's partition (`ctx.stock_user.id`).
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
) -> AppResult<Json<Vec<StockItem>>> {
    let items = ItemService::list(&state.db, &ctx.stock_user.id).await?;
    Ok(Json(items))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
    Path(id): Path<String>,
) -> AppResult<Json<StockItem>> {
    let item = ItemService::get(&state.db, &ctx.stock_user.id, &id).await?;
    Ok(Json(item))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
    Json(input): Json<CreateStockItem>,
) -> AppResult<(StatusCode, Json<StockItem>)> {
    let item = ItemService::create(&state.db, &ctx.stock_user.id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
    Path(id): Path<String>,
    Json(update): Json<UpdateStockItem>,
) -> AppResult<Json<StockItem>> {
    let item = ItemService::update(&state.db, &ctx.stock_user.id, &id, update).await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    ItemService::delete(&state.db, &ctx.stock_user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::test_support::{test_app, token_for};

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token));
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let (app, _state) = test_app().await;
        let user = token_for("auth-a", "a@x.test");

        let (status, item) = call(
            &app,
            "POST",
            "/api/items",
            &user,
            Some(json!({ "name": "Pasta", "targetQuantity": 3, "unit": "pack" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["currentQuantity"], 0.0);
        let id = item["id"].as_str().unwrap().to_string();

        let (status, updated) = call(
            &app,
            "PUT",
            &format!("/api/items/{}", id),
            &user,
            Some(json!({ "currentQuantity": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["currentQuantity"], 2.0);
        assert_eq!(updated["name"], "Pasta");

        let (status, _) = call(&app, "DELETE", &format!("/api/items/{}", id), &user, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, "GET", &format!("/api/items/{}", id), &user, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_items_are_rejected() {
        let (app, _state) = test_app().await;
        let user = token_for("auth-a", "a@x.test");

        let (status, _) = call(
            &app,
            "POST",
            "/api/items",
            &user,
            Some(json!({ "name": "", "targetQuantity": 1, "unit": "kg" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            "/api/items",
            &user,
            Some(json!({ "name": "Flour", "targetQuantity": -1, "unit": "kg" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn accepted_target_works_in_owner_partition() {
        let (app, _state) = test_app().await;
        let owner = token_for("auth-o", "o@x.test");
        let target = token_for("auth-t", "t@x.test");

        let (_, owned) = call(
            &app,
            "POST",
            "/api/items",
            &owner,
            Some(json!({ "name": "Milk", "targetQuantity": 2, "unit": "l" })),
        )
        .await;

        // Before sharing, partitions are disjoint.
        let (_, items) = call(&app, "GET", "/api/items", &target, None).await;
        assert_eq!(items.as_array().unwrap().len(), 0);

        let (_, share) = call(
            &app,
            "POST",
            "/api/account-share/request",
            &owner,
            Some(json!({ "targetEmail": "t@x.test" })),
        )
        .await;
        call(
            &app,
            "POST",
            "/api/account-share/respond",
            &target,
            Some(json!({ "requestId": share["id"], "decision": "accept" })),
        )
        .await;

        let (_, items) = call(&app, "GET", "/api/items", &target, None).await;
        assert_eq!(items[0]["id"], owned["id"]);

        // Writes by the target land in the owner's partition.
        let (status, created) = call(
            &app,
            "POST",
            "/api/items",
            &target,
            Some(json!({ "name": "Eggs", "targetQuantity": 12, "unit": "pcs" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["userId"], owned["userId"]);

        let (_, items) = call(&app, "GET", "/api/items", &owner, None).await;
        assert_eq!(items.as_array().unwrap().len(), 2);

        // After stopping, the target is back in their own empty partition.
        call(&app, "POST", "/api/account-share/stop", &target, None).await;
        let (_, items) = call(&app, "GET", "/api/items", &target, None).await;
        assert_eq!(items.as_array().unwrap().len(), 0);
    }
}
