//! Checklist REST endpoints
//!
//! - `GET    /api/inspection` - current document
//! - `POST   /api/inspection` - replace top-level fields with a client copy
//! - `POST   /api/inspection/item` - add an item (`{name}`)
//! - `DELETE /api/inspection/item/{id}` - remove an item
//! - `PUT    /api/inspection/item/{id}/status` - set status (`{status, user_id?}`)
//!
//! Mutations broadcast to push-channel observers before responding, so REST
//! callers and observers see the same document.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::{error_response, json_response};
use crate::inspection::validate::sanitize_value;
use crate::inspection::{is_canonical_id, DocumentPatch, DocumentState, InspectionDocument, InspectionItem};
use crate::types::InspectionError;

/// Body of a successful mutation
#[derive(Serialize)]
pub struct MutationResponse<'a> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<&'a InspectionItem>,
    pub data: &'a InspectionDocument,
}

impl<'a> MutationResponse<'a> {
    fn new(data: &'a InspectionDocument) -> Self {
        Self {
            success: true,
            item: None,
            data,
        }
    }
}

/// Route-level match on the item path (`/api/inspection/item/...`)
#[derive(Debug, PartialEq, Eq)]
pub enum ItemRoute<'a> {
    Item(&'a str),
    Status(&'a str),
}

impl<'a> ItemRoute<'a> {
    pub fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api/inspection/item/")?;
        match rest.strip_suffix("/status") {
            Some(id) if !id.is_empty() && !id.contains('/') => Some(Self::Status(id)),
            Some(_) => None,
            None if !rest.is_empty() && !rest.contains('/') => Some(Self::Item(rest)),
            None => None,
        }
    }
}

/// GET /api/inspection
pub async fn handle_get_document(state: &DocumentState) -> Response<Full<Bytes>> {
    let doc = state.snapshot().await;
    json_response(StatusCode::OK, &doc)
}

/// POST /api/inspection
pub async fn handle_sync_document(state: &DocumentState, body: Bytes) -> Response<Full<Bytes>> {
    let patch: DocumentPatch = match serde_json::from_slice(&body) {
        Ok(patch) => patch,
        Err(e) => {
            warn!(error = %e, "Rejected document sync body");
            return error_response(StatusCode::BAD_REQUEST, "Invalid request");
        }
    };
    let doc = state.replace_with(patch).await;
    json_response(StatusCode::OK, &MutationResponse::new(&doc))
}

/// POST /api/inspection/item
pub async fn handle_add_item(state: &DocumentState, body: Bytes) -> Response<Full<Bytes>> {
    let Some(name) = parse_object(&body).and_then(|mut obj| obj.remove("name")) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid request");
    };
    // A non-text name sanitizes to empty and is rejected as invalid below
    let name = name.as_str().unwrap_or_default();

    match state.add_item(name).await {
        Ok((item, doc)) => json_response(
            StatusCode::OK,
            &MutationResponse {
                success: true,
                item: Some(&item),
                data: &doc,
            },
        ),
        Err(e) => failure(e),
    }
}

/// DELETE /api/inspection/item/{id}
pub async fn handle_delete_item(state: &DocumentState, id: &str) -> Response<Full<Bytes>> {
    match state.remove_item(id).await {
        Ok(doc) => json_response(StatusCode::OK, &MutationResponse::new(&doc)),
        Err(e) => failure(e),
    }
}

/// PUT /api/inspection/item/{id}/status
pub async fn handle_update_status(
    state: &DocumentState,
    id: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    // Id format is checked before the body, matching the operation's order
    if !is_canonical_id(id) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid item ID");
    }
    let Some(mut obj) = parse_object(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid request");
    };
    let Some(status) = obj.remove("status") else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid request");
    };
    // Non-text values fail the status parse and non-text actors sanitize to empty
    let status = status.as_str().unwrap_or_default().to_string();
    let actor = obj.remove("user_id").map(|v| sanitize_value(&v));

    match state.set_item_status(id, &status, actor.as_deref()).await {
        Ok(doc) => json_response(StatusCode::OK, &MutationResponse::new(&doc)),
        Err(e) => failure(e),
    }
}

fn parse_object(body: &[u8]) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn failure(err: InspectionError) -> Response<Full<Bytes>> {
    let (status, message) = err.into_status_code_and_body();
    if status.is_server_error() {
        warn!(error = %message, "Inspection request failed");
    }
    error_response(status, &message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::{InspectionStore, ItemStatus, OverallStatus};
    use crate::sync::SyncHub;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;

    async fn fresh_state(dir: &TempDir) -> DocumentState {
        let store = InspectionStore::new(dir.path().join("inspection_data.json"));
        DocumentState::load(store, Arc::new(SyncHub::new(16))).await
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn body(value: Value) -> Bytes {
        Bytes::from(value.to_string())
    }

    #[test]
    fn test_item_route_parse() {
        assert_eq!(
            ItemRoute::parse("/api/inspection/item/abc"),
            Some(ItemRoute::Item("abc"))
        );
        assert_eq!(
            ItemRoute::parse("/api/inspection/item/abc/status"),
            Some(ItemRoute::Status("abc"))
        );
        assert_eq!(ItemRoute::parse("/api/inspection/item/"), None);
        assert_eq!(ItemRoute::parse("/api/inspection/item//status"), None);
        assert_eq!(ItemRoute::parse("/api/inspection/item/a/b"), None);
        assert_eq!(ItemRoute::parse("/api/inspection"), None);
    }

    #[tokio::test]
    async fn test_get_document() {
        let dir = TempDir::new().unwrap();
        let state = fresh_state(&dir).await;

        let response = handle_get_document(&state).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["items"].as_array().unwrap().len(), 5);
        assert_eq!(value["overall_status"], "in_progress");
    }

    #[tokio::test]
    async fn test_add_item_success_shape() {
        let dir = TempDir::new().unwrap();
        let state = fresh_state(&dir).await;

        let response = handle_add_item(&state, body(json!({"name": "Check valves"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["success"], true);
        assert_eq!(value["item"]["name"], "Check valves");
        assert_eq!(value["item"]["status"], "pending");
        assert_eq!(value["data"]["items"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_add_item_rejections() {
        let dir = TempDir::new().unwrap();
        let state = fresh_state(&dir).await;

        let cases = [
            (Bytes::from_static(b"not json"), "Invalid request"),
            (body(json!({"title": "x"})), "Invalid request"),
            (body(json!(["x"])), "Invalid request"),
            (body(json!({"name": ""})), "Invalid item name"),
            (body(json!({"name": "<b></b>"})), "Invalid item name"),
            (body(json!({"name": 7})), "Invalid item name"),
            (body(json!({"name": "x".repeat(101)})), "Invalid item name"),
        ];
        for (payload, message) in cases {
            let response = handle_add_item(&state, payload).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let value = body_json(response).await;
            assert_eq!(value["success"], false);
            assert_eq!(value["error"], message);
        }
        assert_eq!(state.snapshot().await.items.len(), 5);
    }

    #[tokio::test]
    async fn test_delete_item() {
        let dir = TempDir::new().unwrap();
        let state = fresh_state(&dir).await;
        let id = state.snapshot().await.items[0].id.clone();

        let response = handle_delete_item(&state, &id).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["items"].as_array().unwrap().len(), 4);

        let response = handle_delete_item(&state, &id).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Item not found");
        assert_eq!(state.snapshot().await.items.len(), 4);

        let response = handle_delete_item(&state, "not-a-uuid").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid item ID");
    }

    #[tokio::test]
    async fn test_update_status() {
        let dir = TempDir::new().unwrap();
        let state = fresh_state(&dir).await;
        let id = state.snapshot().await.items[0].id.clone();

        let response =
            handle_update_status(&state, &id, body(json!({"status": "completed", "user_id": "Alice"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        let item = &value["data"]["items"][0];
        assert_eq!(item["status"], "completed");
        assert_eq!(item["completed_by"], "Alice");
        assert_ne!(item["completed_at"], "");

        let response = handle_update_status(&state, &id, body(json!({"status": "pending"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = state.snapshot().await;
        assert_eq!(doc.items[0].status, ItemStatus::Pending);
        assert_eq!(doc.items[0].completed_by, "");
        assert_eq!(doc.overall_status, OverallStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_status_rejections() {
        let dir = TempDir::new().unwrap();
        let state = fresh_state(&dir).await;
        let id = state.snapshot().await.items[0].id.clone();
        let before = state.snapshot().await;
        let mut rx = state.hub().subscribe();

        let cases = [
            ("not-a-uuid", body(json!({"status": "completed"})), StatusCode::BAD_REQUEST, "Invalid item ID"),
            (id.as_str(), Bytes::from_static(b"{"), StatusCode::BAD_REQUEST, "Invalid request"),
            (id.as_str(), body(json!({"user_id": "Alice"})), StatusCode::BAD_REQUEST, "Invalid request"),
            (id.as_str(), body(json!({"status": "done"})), StatusCode::BAD_REQUEST, "Invalid status"),
            (id.as_str(), body(json!({"status": true})), StatusCode::BAD_REQUEST, "Invalid status"),
            (
                "00000000-0000-4000-8000-000000000000",
                body(json!({"status": "completed"})),
                StatusCode::NOT_FOUND,
                "Item not found",
            ),
        ];
        for (item_id, payload, status, message) in cases {
            let response = handle_update_status(&state, item_id, payload).await;
            assert_eq!(response.status(), status);
            assert_eq!(body_json(response).await["error"], message);
        }

        assert_eq!(state.snapshot().await, before);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_sync_document() {
        let dir = TempDir::new().unwrap();
        let state = fresh_state(&dir).await;

        let mut local = state.snapshot().await;
        local.items.truncate(3);
        let response = handle_sync_document(&state, body(serde_json::to_value(&local).unwrap())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["items"].as_array().unwrap().len(), 3);

        let response = handle_sync_document(&state, body(json!({"unexpected": 1}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.snapshot().await.items.len(), 3);
    }
}
