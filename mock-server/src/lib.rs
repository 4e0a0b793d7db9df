use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const ENDPOINTS: [&str; 6] = ["people", "organizations", "tasks", "tags", "segments", "workspaces"];
pub const DEFAULT_ITEMS_PER_PAGE: usize = 30;

/// In-memory collections keyed by endpoint, items kept in insertion order.
pub struct Store {
    api_key: String,
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

pub type Db = Arc<Store>;

impl Store {
    pub fn new(api_key: &str) -> Db {
        let collections = ENDPOINTS.iter().map(|e| (e.to_string(), Vec::new())).collect();
        Arc::new(Store {
            api_key: api_key.to_string(),
            collections: RwLock::new(collections),
        })
    }

    /// Add an item to `endpoint`. An existing `id` is kept, otherwise one is
    /// generated; `@id` is always derived from it.
    pub async fn insert(&self, endpoint: &str, item: Value) -> Option<Value> {
        let mut collections = self.collections.write().await;
        let items = collections.get_mut(endpoint)?;
        let stored = with_identity(endpoint, item);
        items.push(stored.clone());
        Some(stored)
    }

    pub async fn len(&self, endpoint: &str) -> usize {
        self.collections.read().await.get(endpoint).map_or(0, Vec::len)
    }
}

fn with_identity(endpoint: &str, item: Value) -> Value {
    let mut fields = match item {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    let id = match fields.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            let id = Uuid::new_v4().to_string();
            fields.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    };
    fields.insert("@id".to_string(), Value::String(format!("/{endpoint}/{id}")));
    Value::Object(fields)
}

fn item_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Error bodies shaped like the real API's problem documents.
pub enum Failure {
    Unauthorized,
    NotFound,
    UnsupportedMediaType,
    BadRequest(String),
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Failure::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"code": 401, "message": "JWT Token not found"}),
            ),
            Failure::NotFound => (
                StatusCode::NOT_FOUND,
                json!({"title": "An error occurred", "detail": "Not Found", "status": 404}),
            ),
            Failure::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                json!({"title": "An error occurred", "detail": "The content-type is not supported.", "status": 415}),
            ),
            Failure::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({"title": "An error occurred", "detail": detail, "status": 400}),
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub fn app(api_key: &str) -> Router {
    router(Store::new(api_key))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/{endpoint}", get(list_items).post(create_item))
        .route("/{endpoint}/{id}", get(get_item).patch(update_item).delete(delete_item))
        .layer(middleware::from_fn_with_state(db.clone(), require_api_key))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, router(db)).await
}

async fn require_api_key(State(db): State<Db>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| key == db.api_key);
    if !authorized {
        return Failure::Unauthorized.into_response();
    }
    next.run(request).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub items_per_page: Option<usize>,
    pub page: Option<usize>,
}

async fn list_items(
    State(db): State<Db>,
    Path(endpoint): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, Failure> {
    let collections = db.collections.read().await;
    let items = collections.get(&endpoint).ok_or(Failure::NotFound)?;

    let per_page = query.items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE).max(1);
    let page = query.page.unwrap_or(1).max(1);
    let last = items.len().div_ceil(per_page).max(1);
    // Pages past the end, including ones too large to address, are empty.
    let offset = (page - 1).checked_mul(per_page).unwrap_or(usize::MAX);
    let member: Vec<Value> = items.iter().skip(offset).take(per_page).cloned().collect();
    debug!(%endpoint, page, per_page, count = member.len(), "list");

    let link = |p: usize| format!("/{endpoint}?itemsPerPage={per_page}&page={p}");
    let mut view = json!({
        "@id": link(page),
        "@type": "PartialCollectionView",
        "first": link(1),
        "last": link(last),
    });
    if page < last {
        view["next"] = Value::String(link(page + 1));
    }
    if page > 1 {
        view["previous"] = Value::String(link(page - 1));
    }

    Ok(Json(json!({
        "@id": format!("/{endpoint}"),
        "@type": "Collection",
        "totalItems": items.len(),
        "member": member,
        "view": view,
    })))
}

async fn create_item(
    State(db): State<Db>,
    Path(endpoint): Path<String>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if !input.is_object() {
        return Err(Failure::BadRequest("Body must be a JSON object.".to_string()));
    }
    let mut fields = input;
    if let Some(obj) = fields.as_object_mut() {
        obj.remove("id");
        obj.remove("@id");
    }
    let created = db.insert(&endpoint, fields).await.ok_or(Failure::NotFound)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_item(
    State(db): State<Db>,
    Path((endpoint, id)): Path<(String, String)>,
) -> Result<Json<Value>, Failure> {
    let collections = db.collections.read().await;
    collections
        .get(&endpoint)
        .and_then(|items| items.iter().find(|i| item_id(i).as_deref() == Some(id.as_str())))
        .cloned()
        .map(Json)
        .ok_or(Failure::NotFound)
}

async fn update_item(
    State(db): State<Db>,
    Path((endpoint, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, Failure> {
    let is_merge_patch = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/merge-patch+json"));
    if !is_merge_patch {
        return Err(Failure::UnsupportedMediaType);
    }
    let patch: Value = serde_json::from_str(&body).map_err(|e| Failure::BadRequest(e.to_string()))?;

    let mut collections = db.collections.write().await;
    let item = collections
        .get_mut(&endpoint)
        .and_then(|items| items.iter_mut().find(|i| item_id(i).as_deref() == Some(id.as_str())))
        .ok_or(Failure::NotFound)?;
    merge_patch(item, patch);
    Ok(Json(item.clone()))
}

async fn delete_item(
    State(db): State<Db>,
    Path((endpoint, id)): Path<(String, String)>,
) -> Result<StatusCode, Failure> {
    let mut collections = db.collections.write().await;
    let items = collections.get_mut(&endpoint).ok_or(Failure::NotFound)?;
    let index = items
        .iter()
        .position(|i| item_id(i).as_deref() == Some(id.as_str()))
        .ok_or(Failure::NotFound)?;
    items.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

/// RFC 7396 JSON merge patch. Identity fields are never touched.
pub fn merge_patch(target: &mut Value, patch: Value) {
    let Value::Object(patch) = patch else {
        *target = patch;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(fields) = target {
        for (key, value) in patch {
            if key == "id" || key == "@id" {
                continue;
            }
            if value.is_null() {
                fields.remove(&key);
            } else {
                merge_patch(fields.entry(key).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_generated_when_missing() {
        let item = with_identity("people", json!({"givenName": "Ada"}));
        let id = item["id"].as_str().unwrap();
        assert_eq!(item["@id"], format!("/people/{id}"));
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn numeric_identity_is_kept() {
        let item = with_identity("workspaces", json!({"id": 3, "title": "Sales"}));
        assert_eq!(item["id"], 3);
        assert_eq!(item["@id"], "/workspaces/3");
    }

    #[test]
    fn merge_patch_replaces_and_removes() {
        let mut target = json!({"id": "1", "title": "Old", "website": "a", "address": {"city": "X", "street": "Y"}});
        merge_patch(
            &mut target,
            json!({"id": "2", "title": "New", "website": null, "address": {"city": "Z"}}),
        );
        assert_eq!(
            target,
            json!({"id": "1", "title": "New", "address": {"city": "Z", "street": "Y"}})
        );
    }

    #[test]
    fn list_query_fields_optional() {
        let q: ListQuery = serde_json::from_str("{}").unwrap();
        assert!(q.items_per_page.is_none());
        assert!(q.page.is_none());
    }
}
