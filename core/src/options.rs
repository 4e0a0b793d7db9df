//! Option loaders: the choice lists a host shows before execution.
//!
//! # Design
//! An `OptionSession` owns the client, the transport and the `ColumnCache`
//! for one option-loading phase. Loading workspaces fills the cache as a side
//! effect; loading columns only reads it. The host is expected to load
//! workspaces before columns in the same session, otherwise columns come back
//! empty.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CachedColumn, ColumnCache};
use crate::client::RogerClient;
use crate::error::{AdapterError, ApiError};
use crate::http::Transport;
use crate::pagination::{walk, WalkMode};
use crate::types::{OptionItem, Resource};

const WORKSPACES_ENDPOINT: &str = "workspaces";

/// Display names for the API's built-in column titles.
const COLUMN_TITLES: [(&str, &str); 3] = [
    ("workspace.column.open", "Open"),
    ("workspace.column.inprogress", "In Progress"),
    ("workspace.column.done", "Done"),
];

pub fn prettify_column_title(raw: &str) -> &str {
    COLUMN_TITLES
        .iter()
        .find(|(key, _)| *key == raw)
        .map_or(raw, |(_, pretty)| *pretty)
}

/// The loaders a host can call, by their host-facing method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionLoader {
    People,
    Organizations,
    Tags,
    Segments,
    Workspaces,
    Columns,
}

impl OptionLoader {
    pub fn method_name(self) -> &'static str {
        match self {
            OptionLoader::People => "getPeople",
            OptionLoader::Organizations => "getOrganizations",
            OptionLoader::Tags => "getTags",
            OptionLoader::Segments => "getSegments",
            OptionLoader::Workspaces => "getWorkspaces",
            OptionLoader::Columns => "getColumns",
        }
    }
}

impl FromStr for OptionLoader {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            OptionLoader::People,
            OptionLoader::Organizations,
            OptionLoader::Tags,
            OptionLoader::Segments,
            OptionLoader::Workspaces,
            OptionLoader::Columns,
        ]
        .into_iter()
        .find(|l| l.method_name() == s)
        .ok_or_else(|| AdapterError::UnknownLoader(s.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RemoteColumn {
    id: Value,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct RemoteWorkspace {
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    columns: Option<Vec<RemoteColumn>>,
}

/// Which workspace the columns list is for, as seen from the row being
/// edited: the status details of a task update, otherwise `workspace`.
/// Resolve the workspace reference the columns loader should use.
///
/// A task update reads `updateFields.taskStatus.statusDetails.workspace`;
/// every other context reads the top-level `workspace`. Bare ids are
/// expanded to `/workspaces/{id}`. Other parameters are not inspected.
pub fn selected_workspace(parameters: &Value) -> Option<String> {
    let is_task_update = parameters.get("resource").and_then(Value::as_str) == Some("task")
        && parameters.get("operation").and_then(Value::as_str) == Some("update");
    let workspace = if is_task_update {
        parameters.pointer("/updateFields/taskStatus/statusDetails/workspace")
    } else {
        parameters.get("workspace")
    };
    let workspace = scalar(workspace?)?;
    if workspace.starts_with('/') {
        Some(workspace)
    } else {
        Some(format!("/{WORKSPACES_ENDPOINT}/{workspace}"))
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn title_of(item: &Value) -> String {
    item.get("title").and_then(Value::as_str).unwrap_or_default().to_string()
}

fn full_name(person: &Value) -> String {
    ["givenName", "familyName"]
        .iter()
        .filter_map(|key| person.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Owns the state of one option-loading phase.
pub struct OptionSession<T> {
    client: RogerClient,
    transport: T,
    columns: ColumnCache,
}

impl<T: Transport> OptionSession<T> {
    pub fn new(client: RogerClient, transport: T) -> Self {
        Self {
            client,
            transport,
            columns: ColumnCache::new(),
        }
    }

    pub fn client(&self) -> &RogerClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn column_cache(&self) -> &ColumnCache {
        &self.columns
    }

    /// Run the loader named by the host. `parameters` are the current row's
    /// parameters; only the columns loader looks at them.
    pub fn load(&mut self, loader: OptionLoader, parameters: &Value) -> Result<Vec<OptionItem>, AdapterError> {
        match loader {
            OptionLoader::People => self.people(),
            OptionLoader::Organizations => self.organizations(),
            OptionLoader::Tags => self.tags(),
            OptionLoader::Segments => self.segments(),
            OptionLoader::Workspaces => self.workspaces(),
            OptionLoader::Columns => Ok(self.columns(selected_workspace(parameters).as_deref())),
        }
    }

    /// Every item of `endpoint`, labelled by `label` and valued by `@id`.
    fn load_all(
        &self,
        what: &str,
        endpoint: &str,
        label: fn(&Value) -> String,
    ) -> Result<Vec<OptionItem>, AdapterError> {
        let url = self.client.endpoint_url(endpoint);
        let walk = walk(&self.client, &self.transport, &url, WalkMode::Full).map_err(|source| {
            AdapterError::LoadOptions {
                what: what.to_string(),
                source,
            }
        })?;
        let options: Vec<_> = walk
            .items
            .iter()
            .filter_map(|item| {
                let id = item.get("@id").and_then(scalar)?;
                Some(OptionItem::new(label(item), id))
            })
            .collect();
        debug!(what, count = options.len(), "options loaded");
        Ok(options)
    }

    pub fn people(&self) -> Result<Vec<OptionItem>, AdapterError> {
        self.load_all("people", Resource::Person.endpoint(), full_name)
    }

    pub fn organizations(&self) -> Result<Vec<OptionItem>, AdapterError> {
        self.load_all("organizations", Resource::Organization.endpoint(), title_of)
    }

    pub fn tags(&self) -> Result<Vec<OptionItem>, AdapterError> {
        self.load_all("tags", Resource::Tag.endpoint(), title_of)
    }

    pub fn segments(&self) -> Result<Vec<OptionItem>, AdapterError> {
        self.load_all("segments", Resource::Segment.endpoint(), title_of)
    }

    /// List workspaces and record each one's columns in the cache.
    pub fn workspaces(&mut self) -> Result<Vec<OptionItem>, AdapterError> {
        let url = self.client.endpoint_url(WORKSPACES_ENDPOINT);
        let fail = |source: ApiError| AdapterError::LoadOptions {
            what: "workspaces".to_string(),
            source,
        };
        let walk = walk(&self.client, &self.transport, &url, WalkMode::Full).map_err(fail)?;

        let mut options = Vec::with_capacity(walk.items.len());
        for item in walk.items {
            let workspace = RemoteWorkspace::deserialize(&item)
                .map_err(|e| fail(ApiError::Deserialization(e.to_string())))?;
            let Some(id) = scalar(&workspace.id) else {
                continue;
            };
            let key = format!("/{WORKSPACES_ENDPOINT}/{id}");
            let columns = workspace
                .columns
                .unwrap_or_default()
                .into_iter()
                .filter_map(|c| {
                    Some(CachedColumn {
                        id: scalar(&c.id)?,
                        title: c.title,
                    })
                })
                .collect();
            self.columns.insert(key.clone(), columns);
            options.push(OptionItem::new(workspace.title, key));
        }
        info!(workspaces = options.len(), "workspace columns cached");
        Ok(options)
    }

    /// Columns of `workspace`, read from the cache. No network access.
    pub fn columns(&self, workspace: Option<&str>) -> Vec<OptionItem> {
        let Some(workspace) = workspace.filter(|w| !w.is_empty()) else {
            return Vec::new();
        };
        let Some(columns) = self.columns.get(workspace) else {
            debug!(workspace, "no cached columns; workspaces not loaded yet");
            return Vec::new();
        };
        columns
            .iter()
            .map(|c| {
                OptionItem::new(
                    prettify_column_title(&c.title),
                    format!("{workspace}/columns/{}", c.id),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::credentials::Credentials;
    use crate::http::{HttpRequest, HttpResponse};

    /// Serves fixed bodies by URL and counts requests.
    #[derive(Default)]
    struct Routes {
        bodies: HashMap<String, (u16, Value)>,
        calls: RefCell<usize>,
    }

    impl Routes {
        fn with(mut self, url: &str, status: u16, body: Value) -> Self {
            self.bodies.insert(url.to_string(), (status, body));
            self
        }
    }

    impl Transport for Routes {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            *self.calls.borrow_mut() += 1;
            let (status, body) = self
                .bodies
                .get(&request.url)
                .cloned()
                .ok_or_else(|| ApiError::Transport(format!("unexpected {}", request.url)))?;
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            })
        }
    }

    fn session(routes: Routes) -> OptionSession<Routes> {
        OptionSession::new(RogerClient::new(Credentials::new("k", "http://api.test")), routes)
    }

    fn workspaces_body() -> Value {
        json!({"member": [
            {"id": 1, "title": "Sales", "columns": [
                {"id": 10, "title": "workspace.column.open"},
                {"id": 11, "title": "Waiting on customer"},
                {"id": 12, "title": "workspace.column.done"}
            ]},
            {"id": 2, "title": "Support"}
        ]})
    }

    #[test]
    fn people_are_labelled_by_full_name_across_pages() {
        let routes = Routes::default()
            .with(
                "http://api.test/people",
                200,
                json!({"member": [{"@id": "/people/1", "givenName": "Ada", "familyName": "Lovelace"}],
                       "view": {"next": "/people?page=2"}}),
            )
            .with(
                "http://api.test/people?page=2",
                200,
                json!({"member": [{"@id": "/people/2", "givenName": "Grace", "familyName": "Hopper"}]}),
            );
        let people = session(routes).people().unwrap();
        assert_eq!(
            people,
            [
                OptionItem::new("Ada Lovelace", "/people/1"),
                OptionItem::new("Grace Hopper", "/people/2"),
            ]
        );
    }

    #[test]
    fn tags_use_title() {
        let routes = Routes::default().with(
            "http://api.test/tags",
            200,
            json!({"member": [{"@id": "/tags/3", "title": "VIP"}]}),
        );
        assert_eq!(session(routes).tags().unwrap(), [OptionItem::new("VIP", "/tags/3")]);
    }

    #[test]
    fn loader_failure_is_wrapped() {
        let routes = Routes::default().with(
            "http://api.test/segments",
            401,
            json!({"code": 401, "message": "JWT Token not found"}),
        );
        let err = session(routes).segments().unwrap_err();
        assert_eq!(err.to_string(), "Failed to load segments: JWT Token not found");
    }

    #[test]
    fn columns_before_workspaces_is_empty() {
        let session = session(Routes::default());
        assert!(session.columns(Some("/workspaces/1")).is_empty());
        assert_eq!(*session.transport().calls.borrow(), 0);
    }

    #[test]
    fn columns_after_workspaces_come_from_cache() {
        let routes = Routes::default().with("http://api.test/workspaces", 200, workspaces_body());
        let mut session = session(routes);

        let workspaces = session.workspaces().unwrap();
        assert_eq!(
            workspaces,
            [
                OptionItem::new("Sales", "/workspaces/1"),
                OptionItem::new("Support", "/workspaces/2"),
            ]
        );

        let columns = session.columns(Some("/workspaces/1"));
        assert_eq!(
            columns,
            [
                OptionItem::new("Open", "/workspaces/1/columns/10"),
                OptionItem::new("Waiting on customer", "/workspaces/1/columns/11"),
                OptionItem::new("Done", "/workspaces/1/columns/12"),
            ]
        );
        assert!(session.columns(Some("/workspaces/2")).is_empty());
        assert_eq!(*session.transport().calls.borrow(), 1);
    }

    #[test]
    fn no_workspace_selected_is_empty() {
        let routes = Routes::default().with("http://api.test/workspaces", 200, workspaces_body());
        let mut session = session(routes);
        session.workspaces().unwrap();
        assert!(session.columns(None).is_empty());
        assert!(session.columns(Some("")).is_empty());
    }

    #[test]
    fn selected_workspace_depends_on_context() {
        let create = json!({"resource": "task", "operation": "create", "workspace": "/workspaces/1"});
        assert_eq!(selected_workspace(&create).as_deref(), Some("/workspaces/1"));

        let update = json!({
            "resource": "task",
            "operation": "update",
            "workspace": "/workspaces/1",
            "updateFields": {"taskStatus": {"statusDetails": {"workspace": "/workspaces/2"}}}
        });
        assert_eq!(selected_workspace(&update).as_deref(), Some("/workspaces/2"));

        let bare_update = json!({"resource": "task", "operation": "update"});
        assert!(selected_workspace(&bare_update).is_none());
    }

    #[test]
    fn selected_workspace_ignores_unrelated_fields() {
        let create = json!({
            "resource": "task",
            "operation": "create",
            "workspace": 5,
            "taskTitle": 12,
            "additionalFields": {"tags": "not-a-list"}
        });
        assert_eq!(selected_workspace(&create).as_deref(), Some("/workspaces/5"));

        let update = json!({
            "resource": "task",
            "operation": "update",
            "updateFields": {
                "tags": 7,
                "taskStatus": {"statusDetails": {"workspace": "/workspaces/2", "column": false}}
            }
        });
        assert_eq!(selected_workspace(&update).as_deref(), Some("/workspaces/2"));
    }

    #[test]
    fn load_by_method_name() {
        let routes = Routes::default().with("http://api.test/workspaces", 200, workspaces_body());
        let mut session = session(routes);
        let params = json!({"resource": "task", "operation": "create", "workspace": "/workspaces/1"});

        let loader: OptionLoader = "getColumns".parse().unwrap();
        assert!(session.load(loader, &params).unwrap().is_empty());
        session.load("getWorkspaces".parse().unwrap(), &params).unwrap();
        assert_eq!(session.load(loader, &params).unwrap().len(), 3);

        assert!("getInvoices".parse::<OptionLoader>().is_err());
    }

    #[test]
    fn known_column_titles_are_prettified() {
        assert_eq!(prettify_column_title("workspace.column.inprogress"), "In Progress");
        assert_eq!(prettify_column_title("Backlog"), "Backlog");
    }
}
