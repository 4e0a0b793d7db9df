use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, router, Store};
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY: &str = "secret";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-KEY", KEY)
        .header(http::header::ACCEPT, "application/ld+json")
        .body(String::new())
        .unwrap()
}

fn body_request(method: &str, uri: &str, content_type: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-KEY", KEY)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_key_is_rejected() {
    let resp = app(KEY)
        .oneshot(Request::builder().uri("/people").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "JWT Token not found");
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let resp = app("other")
        .oneshot(request("GET", "/people"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- list ---

#[tokio::test]
async fn list_empty_has_no_next() {
    let resp = app(KEY).oneshot(request("GET", "/tags")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["member"], json!([]));
    assert_eq!(body["totalItems"], 0);
    assert!(body["view"].get("next").is_none());
}

#[tokio::test]
async fn list_pages_link_to_next() {
    let db = Store::new(KEY);
    for n in 0..5 {
        db.insert("segments", json!({"title": format!("S{n}")})).await;
    }

    let resp = router(db.clone())
        .oneshot(request("GET", "/segments?itemsPerPage=2&page=1"))
        .await
        .unwrap();
    let first = body_json(resp).await;
    assert_eq!(first["member"].as_array().unwrap().len(), 2);
    assert_eq!(first["view"]["next"], "/segments?itemsPerPage=2&page=2");

    let resp = router(db)
        .oneshot(request("GET", "/segments?itemsPerPage=2&page=3"))
        .await
        .unwrap();
    let last = body_json(resp).await;
    assert_eq!(last["member"][0]["title"], "S4");
    assert!(last["view"].get("next").is_none());
    assert_eq!(last["view"]["previous"], "/segments?itemsPerPage=2&page=2");
}

#[tokio::test]
async fn huge_page_is_empty() {
    let db = Store::new(KEY);
    db.insert("tags", json!({"title": "vip"})).await;

    let uri = format!("/tags?itemsPerPage=1000&page={}", usize::MAX);
    let resp = router(db).oneshot(request("GET", &uri)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["member"], json!([]));
    assert_eq!(body["totalItems"], 1);
    assert!(body["view"].get("next").is_none());
}

#[tokio::test]
async fn unknown_endpoint_is_404() {
    let resp = app(KEY).oneshot(request("GET", "/invoices")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- create ---

#[tokio::test]
async fn create_assigns_identity() {
    let resp = app(KEY)
        .oneshot(body_request(
            "POST",
            "/people",
            "application/json",
            r#"{"givenName":"Ada","familyName":"Lovelace"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let person = body_json(resp).await;
    let id = person["id"].as_str().unwrap();
    assert_eq!(person["@id"], format!("/people/{id}"));
    assert_eq!(person["givenName"], "Ada");
}

#[tokio::test]
async fn create_non_object_is_400() {
    let resp = app(KEY)
        .oneshot(body_request("POST", "/tasks", "application/json", "[1,2]"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- get ---

#[tokio::test]
async fn get_unknown_id_is_404_with_detail() {
    let resp = app(KEY)
        .oneshot(request("GET", "/tasks/does-not-exist"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["detail"], "Not Found");
}

// --- update ---

#[tokio::test]
async fn patch_requires_merge_patch_content_type() {
    let db = Store::new(KEY);
    let org = db.insert("organizations", json!({"title": "Acme"})).await.unwrap();
    let id = org["id"].as_str().unwrap();

    let resp = router(db)
        .oneshot(body_request(
            "PATCH",
            &format!("/organizations/{id}"),
            "application/json",
            r#"{"title":"Acme BV"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn patch_unknown_id_is_404() {
    let resp = app(KEY)
        .oneshot(body_request(
            "PATCH",
            "/people/nope",
            "application/merge-patch+json",
            r#"{"jobTitle":"CTO"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_unknown_id_is_404() {
    let resp = app(KEY)
        .oneshot(request("DELETE", "/people/nope"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let db = Store::new(KEY);
    let mut app = router(db.clone()).into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(body_request(
            "POST",
            "/organizations",
            "application/json",
            r#"{"title":"Acme","website":"https://acme.test"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();

    // update: title changes, website removed, description added
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(body_request(
            "PATCH",
            &format!("/organizations/{id}"),
            "application/merge-patch+json",
            r#"{"title":"Acme BV","website":null,"description":"Anvils"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["title"], "Acme BV");
    assert_eq!(updated["description"], "Anvils");
    assert!(updated.get("website").is_none());
    assert_eq!(updated["id"], id.as_str());

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("/organizations/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["title"], "Acme BV");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", &format!("/organizations/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
    assert_eq!(db.len("organizations").await, 0);

    // get after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("/organizations/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
