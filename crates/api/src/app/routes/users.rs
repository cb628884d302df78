use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use userhub_core::UserId;
use userhub_events::BusConnector;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router<C>() -> Router
where
    C: BusConnector + 'static,
{
    Router::new()
        .route("/", post(create_user::<C>))
        .route("/:id", get(get_user::<C>).delete(delete_user::<C>))
}

pub async fn create_user<C>(
    Extension(services): Extension<Arc<AppServices<C>>>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> axum::response::Response
where
    C: BusConnector + 'static,
{
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                rejection.body_text(),
            );
        }
    };

    match services
        .writer()
        .add(&body.name, &body.email, body.user_type_id)
        .await
    {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(e) => errors::write_error_to_response(e),
    }
}

pub async fn delete_user<C>(
    Extension(services): Extension<Arc<AppServices<C>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    C: BusConnector + 'static,
{
    let id = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.writer().delete(id).await {
        Ok(deleted) => (StatusCode::OK, Json(json!({ "deleted": deleted }))).into_response(),
        Err(e) => errors::write_error_to_response(e),
    }
}

/// Returns the user mapping, or `{}` when no user matches.
pub async fn get_user<C>(
    Extension(services): Extension<Arc<AppServices<C>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    C: BusConnector + 'static,
{
    let id = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.reader().get_by_id(id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(json!(user))).into_response(),
        Ok(None) => (StatusCode::OK, Json(json!({}))).into_response(),
        Err(e) => errors::storage_error_to_response(e),
    }
}
