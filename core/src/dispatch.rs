//! Row execution: resolve each row to a [`Command`], run it, package the
//! result.
//!
//! # Design
//! Rows run strictly one after another. A failing row either becomes an
//! error record (when the run tolerates failures) or aborts the run with
//! the row's index attached.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, info_span, warn};

use crate::body::ToBody;
use crate::client::RogerClient;
use crate::error::{AdapterError, ApiError, ExecutionError};
use crate::http::{HttpRequest, Transport};
use crate::pagination::{walk, WalkMode};
use crate::params::{Command, ItemAction, Pagination};
use crate::types::Resource;

/// One input item: its resolved parameters and its original JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InputRow {
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub json: Map<String, Value>,
}

impl InputRow {
    pub fn new(parameters: Value) -> Self {
        Self {
            parameters,
            json: Map::new(),
        }
    }

    pub fn with_json(mut self, json: Map<String, Value>) -> Self {
        self.json = json;
        self
    }
}

/// One output item, paired with the input row it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub json: Map<String, Value>,
    #[serde(rename = "pairedItem")]
    pub paired_item: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSettings {
    /// Turn failing rows into `{error, ...input}` records instead of
    /// aborting the run.
    #[serde(default)]
    pub continue_on_fail: bool,
}

/// Runs commands against the API through a host transport.
pub struct Dispatcher<'a, T: ?Sized> {
    client: &'a RogerClient,
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> Dispatcher<'a, T> {
    pub fn new(client: &'a RogerClient, transport: &'a T) -> Self {
        Self { client, transport }
    }

    /// Execute every row in order.
    pub fn execute(
        &self,
        rows: &[InputRow],
        settings: ExecutionSettings,
    ) -> Result<Vec<OutputRecord>, ExecutionError> {
        let mut output = Vec::with_capacity(rows.len());
        for (item_index, row) in rows.iter().enumerate() {
            let _span = info_span!("row", item_index).entered();
            match self.execute_row(row) {
                Ok(json) => output.push(OutputRecord {
                    json,
                    paired_item: item_index,
                }),
                Err(source) if settings.continue_on_fail => {
                    warn!(error = %source, "row failed, continuing");
                    let mut json = Map::new();
                    json.insert("error".to_string(), Value::String(source.to_string()));
                    json.extend(row.json.clone());
                    output.push(OutputRecord {
                        json,
                        paired_item: item_index,
                    });
                }
                Err(source) => return Err(ExecutionError { item_index, source }),
            }
        }
        Ok(output)
    }

    fn execute_row(&self, row: &InputRow) -> Result<Map<String, Value>, AdapterError> {
        let command = Command::from_parameters(&row.parameters)?;
        let (resource, operation) = (command.resource(), command.operation());
        let response = self.run(&command)?;
        info!(%resource, %operation, "row succeeded");

        let mut json = Map::new();
        json.insert("resource".to_string(), json!(resource));
        json.insert("operation".to_string(), json!(operation));
        match response {
            Value::Object(fields) => json.extend(fields),
            Value::Null => {}
            other => {
                json.insert("data".to_string(), other);
            }
        }
        Ok(json)
    }

    /// Run a validated command and return the API's answer.
    pub fn run(&self, command: &Command) -> Result<Value, AdapterError> {
        match command {
            Command::Person(action) => self.item(Resource::Person, action),
            Command::Organization(action) => self.item(Resource::Organization, action),
            Command::Task(action) => self.item(Resource::Task, action),
            Command::Tag(pagination) => self.get_many(Resource::Tag, pagination),
            Command::Segment(pagination) => self.get_many(Resource::Segment, pagination),
        }
    }

    fn item<F: ToBody>(&self, resource: Resource, action: &ItemAction<F>) -> Result<Value, AdapterError> {
        match action {
            ItemAction::Get { id } => self.send(
                format!("get {resource} \"{id}\""),
                self.client.build_get(resource, id),
            ),
            ItemAction::GetMany(pagination) => self.get_many(resource, pagination),
            ItemAction::Create(fields) => self.send(
                format!("create {resource}"),
                self.client.build_create(resource, &fields.to_body()),
            ),
            ItemAction::Update { id, fields } => self.send(
                format!("update {resource} \"{id}\""),
                self.client.build_update(resource, id, &fields.to_body()),
            ),
            ItemAction::Delete { id } => self.send(
                format!("delete {resource} \"{id}\""),
                self.client.build_delete(resource, id),
            ),
        }
    }

    fn send(&self, action: String, request: HttpRequest) -> Result<Value, AdapterError> {
        self.client
            .execute(self.transport, request)
            .map_err(|source| AdapterError::Request { action, source })
    }

    /// `{items, view}`: one page when `page` is set, every page otherwise.
    fn get_many(&self, resource: Resource, pagination: &Pagination) -> Result<Value, AdapterError> {
        let mode = match pagination.page {
            Some(_) => WalkMode::SinglePage,
            None => WalkMode::Full,
        };
        let url = self.client.list_url(resource, pagination);
        let walk = walk(self.client, self.transport, &url, mode).map_err(|source: ApiError| {
            AdapterError::Request {
                action: format!("get many {resource}"),
                source,
            }
        })?;
        Ok(json!({ "items": walk.items, "view": walk.view }))
    }
}
