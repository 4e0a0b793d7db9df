//! Request building and response parsing for the CRM API.
//!
//! # Design
//! `RogerClient` holds only the credentials and carries no mutable state
//! between calls. Each call is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`; the
//! `Transport` in between belongs to the host.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::credentials::{CredentialStatus, Credentials, INVALID_KEY_MESSAGE};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::params::Pagination;
use crate::types::{Collection, Resource};

/// Stateless client for the CRM API.
#[derive(Debug, Clone)]
pub struct RogerClient {
    credentials: Credentials,
}

impl RogerClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Credentials::new(credentials.api_key, &credentials.api_base_url),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<&Value>) -> HttpRequest {
        HttpRequest::build(method, url, &self.credentials.api_key, body)
    }

    fn collection_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.credentials.api_base_url)
    }

    /// `{base}/{endpoint}/{id}`. An IRI such as `/people/12` is accepted in
    /// place of the bare id.
    fn item_url(&self, resource: Resource, id: &str) -> String {
        let prefix = format!("/{}/", resource.endpoint());
        let id = id.strip_prefix(&prefix).unwrap_or(id);
        format!("{}/{id}", self.collection_url(resource.endpoint()))
    }

    /// First-page URL of a get-many walk.
    pub fn list_url(&self, resource: Resource, pagination: &Pagination) -> String {
        let mut url = format!(
            "{}?itemsPerPage={}",
            self.collection_url(resource.endpoint()),
            pagination.items_per_page
        );
        if let Some(page) = pagination.page {
            url.push_str(&format!("&page={page}"));
        }
        url
    }

    /// URL of an option-loading endpoint such as `people` or `workspaces`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        self.collection_url(endpoint)
    }

    pub fn build_list(&self, reference: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.credentials.resolve(reference), None)
    }

    pub fn build_get(&self, resource: Resource, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.item_url(resource, id), None)
    }

    pub fn build_create(&self, resource: Resource, body: &Value) -> HttpRequest {
        self.request(HttpMethod::Post, self.collection_url(resource.endpoint()), Some(body))
    }

    pub fn build_update(&self, resource: Resource, id: &str, body: &Value) -> HttpRequest {
        self.request(HttpMethod::Patch, self.item_url(resource, id), Some(body))
    }

    pub fn build_delete(&self, resource: Resource, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.item_url(resource, id), None)
    }

    pub fn build_credential_test(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.collection_url(Resource::Person.endpoint()), None)
    }

    /// Parse any 2xx response into JSON. An empty body yields `null`.
    pub fn parse_json(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Parse one page of a JSON-LD collection.
    pub fn parse_collection(&self, response: HttpResponse) -> Result<Collection, ApiError> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Interpret the credential test response. The API signals a bad key
    /// with a `message` of "JWT Token not found", whatever the status.
    pub fn parse_credential_test(&self, response: HttpResponse) -> Result<CredentialStatus, ApiError> {
        let message = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned));
        if message.as_deref() == Some(INVALID_KEY_MESSAGE) {
            return Ok(CredentialStatus::Invalid {
                message: "Invalid or missing API key".to_string(),
            });
        }
        check_status(&response)?;
        Ok(CredentialStatus::Valid)
    }

    /// Send `request` and parse the JSON answer.
    #[instrument(skip(self, transport, request), fields(method = request.method.as_str(), url = %request.url))]
    pub fn execute<T: Transport + ?Sized>(&self, transport: &T, request: HttpRequest) -> Result<Value, ApiError> {
        let response = transport.send(&request)?;
        debug!(status = response.status, "response received");
        self.parse_json(response)
    }

    /// Check the credentials against `GET {base}/people`.
    pub fn test_credentials<T: Transport + ?Sized>(&self, transport: &T) -> Result<CredentialStatus, ApiError> {
        let response = transport.send(&self.build_credential_test())?;
        self.parse_credential_test(response)
    }
}

/// Map non-2xx responses to `ApiError::Http`, lifting the upstream `detail`
/// (or `message`) field out of JSON bodies.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let detail = serde_json::from_str::<Value>(&response.body).ok().and_then(|v| {
        v.get("detail")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    });
    Err(ApiError::Http {
        status: response.status,
        detail,
        body: response.body.clone(),
    })
}
