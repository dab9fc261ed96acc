//! JSON handlers for the `/api` routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{AppError, AppState};
use crate::content::{as_object_mut, set_id, Collection, SETTINGS_ID};
use crate::strategy::{StrategyRequest, StrategyResponse};

type ApiResult<T> = Result<T, AppError>;

/// Rejects the request unless it carries the configured admin token.
///
/// Always passes when no token is configured.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.options.admin_token.as_deref() else {
        return Ok(());
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if presented == Some(expected) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

fn parse_collection(segment: &str) -> ApiResult<Collection> {
    Ok(segment.parse::<Collection>()?)
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(AppError::PayloadTooLarge)
        }
        Err(rejection) => Err(AppError::MalformedPayload(rejection.body_text())),
    }
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(json!({ "status": "ok", "store": state.store.kind() })).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "store": state.store.kind(), "message": e.to_string() })),
        )
            .into_response(),
    }
}

/// `GET /api/{collection}`
pub async fn list_records(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Value>>> {
    let collection = parse_collection(&segment)?;
    if collection.is_private() {
        require_admin(&state, &headers)?;
    }
    let records = state.store.list(collection).await?;
    debug!(%collection, count = records.len(), "Listed records");
    Ok(Json(records))
}

/// `GET /api/{collection}/{id}`
pub async fn get_record(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let collection = parse_collection(&segment)?;
    if collection.is_private() {
        require_admin(&state, &headers)?;
    }
    state
        .store
        .get(collection, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No {} record with id {}", collection, id)))
}

/// `POST /api/{collection}`
///
/// Leads are the public contact form: anyone may post one, and the server
/// assigns the id, the timestamp and the `new` status. Admins change the
/// status later through `PUT`.
pub async fn create_record(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let collection = parse_collection(&segment)?;
    if collection != Collection::Leads {
        require_admin(&state, &headers)?;
    }
    let mut record = body(payload)?;

    if collection == Collection::Leads {
        prepare_lead(&mut record)?;
    } else if collection.is_singleton() {
        set_id(&mut record, SETTINGS_ID)?;
    }

    let saved = state.store.upsert(collection, record).await?;
    let id = saved.get("id").and_then(|v| v.as_str()).unwrap_or("");
    info!(%collection, id, "Record created");
    Ok((StatusCode::CREATED, Json(saved)))
}

fn prepare_lead(record: &mut Value) -> ApiResult<()> {
    let object = as_object_mut(record)?;
    object.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
    object.insert("createdAt".into(), Value::String(chrono::Utc::now().to_rfc3339()));
    object.insert("status".into(), Value::String("new".into()));
    Ok(())
}

/// `PUT /api/{collection}/{id}`; the path id wins over any id in the body.
pub async fn put_record(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let collection = parse_collection(&segment)?;
    require_admin(&state, &headers)?;
    let mut record = body(payload)?;

    let id = if collection.is_singleton() { SETTINGS_ID } else { id.as_str() };
    set_id(&mut record, id)?;

    let saved = state.store.upsert(collection, record).await?;
    info!(%collection, id, "Record saved");
    Ok(Json(saved))
}

/// `DELETE /api/{collection}/{id}`
pub async fn delete_record(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let collection = parse_collection(&segment)?;
    require_admin(&state, &headers)?;

    if state.store.delete(collection, &id).await? {
        info!(%collection, %id, "Record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No {} record with id {}", collection, id)))
    }
}

/// `GET /api/settings`; `{}` until settings are first saved.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let settings = state.store.get(Collection::Settings, SETTINGS_ID).await?;
    Ok(Json(settings.unwrap_or_else(|| Value::Object(Map::new()))))
}

/// `PUT /api/settings`
pub async fn put_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let mut record = body(payload)?;
    set_id(&mut record, SETTINGS_ID)?;
    let saved = state.store.upsert(Collection::Settings, record).await?;
    info!("Site settings saved");
    Ok(Json(saved))
}

/// `POST /api/strategy`
pub async fn strategy(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<StrategyResponse>> {
    let client = state.strategy.as_ref().ok_or(AppError::StrategyDisabled)?;
    let request: StrategyRequest = serde_json::from_value(body(payload)?)
        .map_err(|e| AppError::MalformedPayload(e.to_string()))?;

    let strategy = client.generate(&request).await?;
    Ok(Json(StrategyResponse { strategy }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::MemoryStore;
    use crate::server::SiteOptions;
    use std::sync::Arc;

    fn state(token: Option<&str>) -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new()),
            None,
            SiteOptions {
                admin_token: token.map(str::to_string),
                ..SiteOptions::default()
            },
        )
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        headers
    }

    #[test]
    fn admin_gate_checks_the_bearer_token() {
        let open = state(None);
        assert!(require_admin(&open, &HeaderMap::new()).is_ok());

        let locked = state(Some("s3cret"));
        assert!(require_admin(&locked, &bearer("s3cret")).is_ok());
        assert!(matches!(
            require_admin(&locked, &bearer("guess")),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            require_admin(&locked, &HeaderMap::new()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn leads_get_a_fresh_id_timestamp_and_status() {
        let mut lead = json!({ "id": "client-chosen", "name": "Dana", "email": "dana@example.com" });
        prepare_lead(&mut lead).unwrap();
        assert_ne!(lead["id"], json!("client-chosen"));
        assert_eq!(lead["status"], json!("new"));
        assert!(lead["createdAt"].as_str().is_some());

        let mut self_triaged = json!({ "name": "Eve", "status": "won" });
        prepare_lead(&mut self_triaged).unwrap();
        assert_eq!(self_triaged["status"], json!("new"));

        assert!(prepare_lead(&mut json!(["not", "an", "object"])).is_err());
    }
}
