//! Typed row parameters.
//!
//! # Design
//! The host hands over each row's parameters as one JSON object using its own
//! field names (`personId`, `additionalFields`, `updateFields`, ...). They are
//! validated here, once, into a [`Command`]: one variant per resource, each
//! carrying only that resource's fields. Every optional field records whether
//! it was absent, explicitly empty, or set, via [`Presence`]. Text fields hold
//! the raw JSON value so numbers and booleans reach the API untouched.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::AdapterError;
use crate::types::{Operation, Resource};

pub const DEFAULT_ITEMS_PER_PAGE: u32 = 15;

/// Presence state of an optional field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence<T> {
    /// The key was not supplied.
    Absent,
    /// The key was supplied as `null`, `""`, `[]` or an all-empty object.
    Empty,
    Value(T),
}

impl<T> Default for Presence<T> {
    fn default() -> Self {
        Presence::Absent
    }
}

impl<T> Presence<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Presence::Value(_))
    }
}

impl<T> From<Option<T>> for Presence<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Presence::Absent, Presence::Value)
    }
}

/// Values that count as "empty" when supplied.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

/// `null` and `""` are empty; anything else is forwarded as given.
impl Blank for Value {
    fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<'de, T> Deserialize<'de> for Presence<T>
where
    T: Deserialize<'de> + Blank,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) if !v.is_blank() => Presence::Value(v),
            _ => Presence::Empty,
        })
    }
}

/// Postal address. Organizations also carry a country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: Presence<Value>,
    pub city: Presence<Value>,
    pub postal_code: Presence<Value>,
    pub country: Presence<Value>,
}

impl Blank for Address {
    fn is_blank(&self) -> bool {
        !(self.street.is_set()
            || self.city.is_set()
            || self.postal_code.is_set()
            || self.country.is_set())
    }
}

/// Host shape `address: { addressDetails: {...} }`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AddressCollection {
    address_details: Presence<Address>,
}

impl Blank for AddressCollection {
    fn is_blank(&self) -> bool {
        !self.address_details.is_set()
    }
}

fn flatten_address(address: Presence<AddressCollection>) -> Presence<Address> {
    match address {
        Presence::Value(collection) => collection.address_details,
        Presence::Empty => Presence::Empty,
        Presence::Absent => Presence::Absent,
    }
}

/// Fields of a person body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFields {
    pub given_name: Presence<Value>,
    pub family_name: Presence<Value>,
    pub email_addresses: Presence<Vec<String>>,
    pub phone_numbers: Presence<Vec<String>>,
    pub address: Presence<Address>,
    pub linkedin_id: Presence<Value>,
    pub job_title: Presence<Value>,
    pub customer_id: Presence<Value>,
    pub organizations: Presence<Vec<String>>,
    pub tags: Presence<Vec<String>>,
    pub segments: Presence<Vec<String>>,
}

/// Fields of an organization body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationFields {
    pub title: Presence<Value>,
    pub website: Presence<Value>,
    pub description: Presence<Value>,
    pub email_addresses: Presence<Vec<String>>,
    pub phone_numbers: Presence<Vec<String>>,
    pub customer_id: Presence<Value>,
    pub chamber_of_commerce_number: Presence<Value>,
    pub tags: Presence<Vec<String>>,
    pub segments: Presence<Vec<String>>,
    pub people: Presence<Vec<String>>,
    pub address: Presence<Address>,
}

/// Fields of a task body. `status` is a column reference
/// (`/workspaces/{id}/columns/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    pub title: Presence<Value>,
    pub workspace: Presence<Value>,
    pub status: Presence<Value>,
    pub description: Presence<Value>,
    pub tags: Presence<Vec<String>>,
    pub people: Presence<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersonExtras {
    email_addresses: Presence<Vec<String>>,
    phone_numbers: Presence<Vec<String>>,
    linkedin_id: Presence<Value>,
    job_title: Presence<Value>,
    customer_id: Presence<Value>,
    organizations: Presence<Vec<String>>,
    tags: Presence<Vec<String>>,
    segments: Presence<Vec<String>>,
    address: Presence<AddressCollection>,
}

impl PersonExtras {
    fn with_names(self, given_name: Presence<Value>, family_name: Presence<Value>) -> PersonFields {
        PersonFields {
            given_name,
            family_name,
            email_addresses: self.email_addresses,
            phone_numbers: self.phone_numbers,
            address: flatten_address(self.address),
            linkedin_id: self.linkedin_id,
            job_title: self.job_title,
            customer_id: self.customer_id,
            organizations: self.organizations,
            tags: self.tags,
            segments: self.segments,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonCreateParams {
    #[serde(default)]
    name: Presence<Value>,
    #[serde(default)]
    surname: Presence<Value>,
    #[serde(default)]
    additional_fields: PersonExtras,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersonUpdateFields {
    first_name: Presence<Value>,
    surname: Presence<Value>,
    #[serde(flatten)]
    extras: PersonExtras,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonUpdateParams {
    #[serde(default)]
    update_fields: PersonUpdateFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OrganizationExtras {
    website: Presence<Value>,
    description: Presence<Value>,
    email_addresses: Presence<Vec<String>>,
    phone_numbers: Presence<Vec<String>>,
    customer_id: Presence<Value>,
    chamber_of_commerce_number: Presence<Value>,
    tags: Presence<Vec<String>>,
    segments: Presence<Vec<String>>,
    people: Presence<Vec<String>>,
    address: Presence<AddressCollection>,
}

impl OrganizationExtras {
    fn with_title(self, title: Presence<Value>) -> OrganizationFields {
        OrganizationFields {
            title,
            website: self.website,
            description: self.description,
            email_addresses: self.email_addresses,
            phone_numbers: self.phone_numbers,
            customer_id: self.customer_id,
            chamber_of_commerce_number: self.chamber_of_commerce_number,
            tags: self.tags,
            segments: self.segments,
            people: self.people,
            address: flatten_address(self.address),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationCreateParams {
    #[serde(default)]
    organization_name: Presence<Value>,
    #[serde(default)]
    additional_fields: OrganizationExtras,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OrganizationUpdateFields {
    organization_name: Presence<Value>,
    #[serde(flatten)]
    extras: OrganizationExtras,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationUpdateParams {
    #[serde(default)]
    update_fields: OrganizationUpdateFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskExtras {
    description: Presence<Value>,
    tags: Presence<Vec<String>>,
    people: Presence<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreateParams {
    #[serde(default)]
    task_title: Presence<Value>,
    #[serde(default)]
    workspace: Presence<Value>,
    #[serde(default)]
    column: Presence<Value>,
    #[serde(default)]
    additional_fields: TaskExtras,
}

/// `taskStatus.statusDetails` of a task update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatusDetails {
    workspace: Presence<Value>,
    column: Presence<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskStatus {
    status_details: Option<StatusDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskUpdateFields {
    title: Presence<Value>,
    task_status: Option<TaskStatus>,
    #[serde(flatten)]
    extras: TaskExtras,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskUpdateParams {
    #[serde(default)]
    update_fields: TaskUpdateFields,
}

fn parse<'a, T: Deserialize<'a>>(params: &'a Value) -> Result<T, AdapterError> {
    T::deserialize(params).map_err(|e| AdapterError::InvalidParameters(e.to_string()))
}

/// Resource-specific parameter parsing for single-item operations.
pub trait ResourceFields: Sized {
    /// Name of the host parameter holding the item identifier.
    const ID_PARAMETER: &'static str;

    fn from_create(params: &Value) -> Result<Self, AdapterError>;
    fn from_update(params: &Value) -> Result<Self, AdapterError>;
}

impl ResourceFields for PersonFields {
    const ID_PARAMETER: &'static str = "personId";

    fn from_create(params: &Value) -> Result<Self, AdapterError> {
        let p: PersonCreateParams = parse(params)?;
        Ok(p.additional_fields.with_names(p.name, p.surname))
    }

    fn from_update(params: &Value) -> Result<Self, AdapterError> {
        let p: PersonUpdateParams = parse(params)?;
        let f = p.update_fields;
        Ok(f.extras.with_names(f.first_name, f.surname))
    }
}

impl ResourceFields for OrganizationFields {
    const ID_PARAMETER: &'static str = "organizationId";

    fn from_create(params: &Value) -> Result<Self, AdapterError> {
        let p: OrganizationCreateParams = parse(params)?;
        Ok(p.additional_fields.with_title(p.organization_name))
    }

    fn from_update(params: &Value) -> Result<Self, AdapterError> {
        let p: OrganizationUpdateParams = parse(params)?;
        let f = p.update_fields;
        Ok(f.extras.with_title(f.organization_name))
    }
}

impl ResourceFields for TaskFields {
    const ID_PARAMETER: &'static str = "taskId";

    fn from_create(params: &Value) -> Result<Self, AdapterError> {
        let p: TaskCreateParams = parse(params)?;
        Ok(TaskFields {
            title: p.task_title,
            workspace: p.workspace,
            status: p.column,
            description: p.additional_fields.description,
            tags: p.additional_fields.tags,
            people: p.additional_fields.people,
        })
    }

    fn from_update(params: &Value) -> Result<Self, AdapterError> {
        let p: TaskUpdateParams = parse(params)?;
        let f = p.update_fields;
        let details = f.task_status.and_then(|s| s.status_details).unwrap_or_default();
        Ok(TaskFields {
            title: f.title,
            workspace: details.workspace,
            status: details.column,
            description: f.extras.description,
            tags: f.extras.tags,
            people: f.extras.people,
        })
    }
}

/// Pagination controls of a get-many row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    /// Set: fetch exactly this page. Unset: walk every page.
    #[serde(default)]
    pub page: Option<u32>,
}

fn default_items_per_page() -> u32 {
    DEFAULT_ITEMS_PER_PAGE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            page: None,
        }
    }
}

/// A single-item or list operation on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAction<F> {
    Get { id: String },
    GetMany(Pagination),
    Create(F),
    Update { id: String, fields: F },
    Delete { id: String },
}

impl<F: ResourceFields> ItemAction<F> {
    fn parse(operation: Operation, params: &Value) -> Result<Self, AdapterError> {
        Ok(match operation {
            Operation::Get => ItemAction::Get {
                id: required_id::<F>(params)?,
            },
            Operation::GetMany => ItemAction::GetMany(parse(params)?),
            Operation::Create => ItemAction::Create(F::from_create(params)?),
            Operation::Update => ItemAction::Update {
                id: required_id::<F>(params)?,
                fields: F::from_update(params)?,
            },
            Operation::Delete => ItemAction::Delete {
                id: required_id::<F>(params)?,
            },
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            ItemAction::Get { .. } => Operation::Get,
            ItemAction::GetMany(_) => Operation::GetMany,
            ItemAction::Create(_) => Operation::Create,
            ItemAction::Update { .. } => Operation::Update,
            ItemAction::Delete { .. } => Operation::Delete,
        }
    }
}

fn required_id<F: ResourceFields>(params: &Value) -> Result<String, AdapterError> {
    match params.get(F::ID_PARAMETER) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(AdapterError::MissingParameter(F::ID_PARAMETER)),
    }
}

/// A fully validated row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Person(ItemAction<PersonFields>),
    Organization(ItemAction<OrganizationFields>),
    Task(ItemAction<TaskFields>),
    Tag(Pagination),
    Segment(Pagination),
}

#[derive(Debug, Deserialize)]
struct Selector {
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    operation: Option<String>,
}

impl Command {
    /// Validate a row's parameter object.
    pub fn from_parameters(params: &Value) -> Result<Self, AdapterError> {
        let selector: Selector = parse(params)?;
        let resource: Resource = selector
            .resource
            .ok_or(AdapterError::MissingParameter("resource"))?
            .parse()?;
        let operation: Operation = selector
            .operation
            .ok_or(AdapterError::MissingParameter("operation"))?
            .parse()?;
        Self::parse(resource, operation, params)
    }

    /// Validate a row whose resource and operation are already known.
    pub fn parse(resource: Resource, operation: Operation, params: &Value) -> Result<Self, AdapterError> {
        if !resource.supports(operation) {
            return Err(AdapterError::UnsupportedOperation {
                resource: resource.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(match resource {
            Resource::Person => Command::Person(ItemAction::parse(operation, params)?),
            Resource::Organization => Command::Organization(ItemAction::parse(operation, params)?),
            Resource::Task => Command::Task(ItemAction::parse(operation, params)?),
            Resource::Tag => Command::Tag(parse(params)?),
            Resource::Segment => Command::Segment(parse(params)?),
        })
    }

    pub fn resource(&self) -> Resource {
        match self {
            Command::Person(_) => Resource::Person,
            Command::Organization(_) => Resource::Organization,
            Command::Task(_) => Resource::Task,
            Command::Tag(_) => Resource::Tag,
            Command::Segment(_) => Resource::Segment,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Command::Person(a) => a.operation(),
            Command::Organization(a) => a.operation(),
            Command::Task(a) => a.operation(),
            Command::Tag(_) | Command::Segment(_) => Operation::GetMany,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_distinguishes_absent_empty_and_value() {
        let fields = PersonFields::from_create(&json!({
            "name": "Ada",
            "surname": "",
            "additionalFields": { "tags": [] , "jobTitle": null }
        }))
        .unwrap();
        assert_eq!(fields.given_name, Presence::Value(json!("Ada")));
        assert_eq!(fields.family_name, Presence::Empty);
        assert_eq!(fields.tags, Presence::Empty);
        assert_eq!(fields.job_title, Presence::Empty);
        assert_eq!(fields.linkedin_id, Presence::Absent);
    }

    #[test]
    fn person_update_uses_first_name() {
        let fields = PersonFields::from_update(&json!({
            "personId": "/people/1",
            "updateFields": { "firstName": "Grace", "emailAddresses": ["g@example.com"] }
        }))
        .unwrap();
        assert_eq!(fields.given_name.value().and_then(Value::as_str), Some("Grace"));
        assert_eq!(fields.email_addresses.value().map(Vec::len), Some(1));
    }

    #[test]
    fn address_details_are_unwrapped() {
        let fields = OrganizationFields::from_create(&json!({
            "organizationName": "Acme",
            "additionalFields": {
                "address": { "addressDetails": { "city": "Utrecht", "country": "NL" } }
            }
        }))
        .unwrap();
        let address = fields.address.value().unwrap();
        assert_eq!(address.city.value().and_then(Value::as_str), Some("Utrecht"));
        assert_eq!(address.street, Presence::Absent);
    }

    #[test]
    fn all_empty_address_is_empty() {
        let fields = PersonFields::from_create(&json!({
            "additionalFields": { "address": { "addressDetails": { "street": "" } } }
        }))
        .unwrap();
        assert!(!fields.address.is_set());
    }

    #[test]
    fn task_update_reads_status_details() {
        let fields = TaskFields::from_update(&json!({
            "taskId": "/tasks/4",
            "updateFields": {
                "title": "Ship it",
                "taskStatus": { "statusDetails": {
                    "workspace": "/workspaces/1",
                    "column": "/workspaces/1/columns/3"
                } }
            }
        }))
        .unwrap();
        assert_eq!(fields.workspace.value().and_then(Value::as_str), Some("/workspaces/1"));
        assert_eq!(
            fields.status.value().and_then(Value::as_str),
            Some("/workspaces/1/columns/3")
        );
    }

    #[test]
    fn command_requires_identifier_for_get() {
        let err = Command::from_parameters(&json!({"resource": "task", "operation": "get"})).unwrap_err();
        assert!(matches!(err, AdapterError::MissingParameter("taskId")));
    }

    #[test]
    fn command_rejects_unknown_resource() {
        let err = Command::from_parameters(&json!({"resource": "invoice", "operation": "delete"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource: invoice");
    }

    #[test]
    fn command_rejects_unknown_operation() {
        let err = Command::from_parameters(&json!({"resource": "person", "operation": "upsert"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation: upsert");
    }

    #[test]
    fn tags_only_list() {
        let cmd = Command::from_parameters(&json!({"resource": "tag", "operation": "getMany"})).unwrap();
        assert_eq!(cmd, Command::Tag(Pagination::default()));
        let err = Command::from_parameters(&json!({"resource": "tag", "operation": "create"}))
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedOperation { .. }));
    }

    #[test]
    fn get_many_pagination() {
        let cmd = Command::from_parameters(&json!({
            "resource": "task", "operation": "getMany", "itemsPerPage": 50, "page": 2
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::Task(ItemAction::GetMany(Pagination {
                items_per_page: 50,
                page: Some(2)
            }))
        );

        let cmd = Command::from_parameters(&json!({
            "resource": "task", "operation": "getMany", "page": null
        }))
        .unwrap();
        assert_eq!(cmd, Command::Task(ItemAction::GetMany(Pagination::default())));
    }

    #[test]
    fn non_text_scalars_are_kept_as_given() {
        let fields = OrganizationFields::from_create(&json!({
            "organizationName": "Acme",
            "additionalFields": {
                "chamberOfCommerceNumber": 12345678,
                "customerId": true,
                "address": { "addressDetails": { "postalCode": 90210 } }
            }
        }))
        .unwrap();
        assert_eq!(fields.chamber_of_commerce_number, Presence::Value(json!(12345678)));
        assert_eq!(fields.customer_id, Presence::Value(json!(true)));
        let address = fields.address.value().unwrap();
        assert_eq!(address.postal_code, Presence::Value(json!(90210)));
    }

    #[test]
    fn numeric_name_builds_a_command() {
        let cmd = Command::from_parameters(&json!({
            "resource": "person", "operation": "create", "name": 42
        }))
        .unwrap();
        let Command::Person(ItemAction::Create(fields)) = cmd else {
            panic!("expected person create, got {cmd:?}");
        };
        assert_eq!(fields.given_name, Presence::Value(json!(42)));
    }

    #[test]
    fn wrong_list_type_is_invalid_parameters() {
        let err = Command::from_parameters(&json!({
            "resource": "person", "operation": "create", "additionalFields": {"tags": 3}
        }))
        .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParameters(_)));
    }
}
