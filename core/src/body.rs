//! Request body assembly for create and update calls.
//!
//! Bodies are sparse: only fields that were supplied with a non-empty value
//! appear. The same body shape serves creation (POST) and partial update
//! (merge-patch). Values are forwarded untouched; the remote API validates.

use serde_json::{Map, Value};

use crate::params::{Address, OrganizationFields, PersonFields, Presence, TaskFields};

/// Produces the JSON body for a resource's fields.
pub trait ToBody {
    fn to_body(&self) -> Value;
}

/// Builder that skips anything not set.
#[derive(Default)]
struct Sparse(Map<String, Value>);

impl Sparse {
    fn text(mut self, key: &str, field: &Presence<Value>) -> Self {
        if let Some(v) = field.value() {
            self.0.insert(key.to_string(), v.clone());
        }
        self
    }

    fn list(mut self, key: &str, field: &Presence<Vec<String>>) -> Self {
        if let Some(values) = field.value() {
            let items = values.iter().cloned().map(Value::String).collect();
            self.0.insert(key.to_string(), Value::Array(items));
        }
        self
    }

    /// `["a", "b"]` becomes `[{element: "a"}, {element: "b"}]`.
    fn wrapped(mut self, key: &str, element: &str, field: &Presence<Vec<String>>) -> Self {
        if let Some(values) = field.value() {
            let items = values
                .iter()
                .map(|v| {
                    let mut entry = Map::new();
                    entry.insert(element.to_string(), Value::String(v.clone()));
                    Value::Object(entry)
                })
                .collect();
            self.0.insert(key.to_string(), Value::Array(items));
        }
        self
    }

    fn nested(mut self, key: &str, inner: Sparse) -> Self {
        if !inner.0.is_empty() {
            self.0.insert(key.to_string(), Value::Object(inner.0));
        }
        self
    }

    fn finish(self) -> Value {
        Value::Object(self.0)
    }
}

fn address(address: &Presence<Address>, with_country: bool) -> Sparse {
    let Some(a) = address.value() else {
        return Sparse::default();
    };
    let sparse = Sparse::default()
        .text("street", &a.street)
        .text("city", &a.city)
        .text("postalCode", &a.postal_code);
    if with_country {
        sparse.text("country", &a.country)
    } else {
        sparse
    }
}

impl ToBody for PersonFields {
    fn to_body(&self) -> Value {
        Sparse::default()
            .text("givenName", &self.given_name)
            .text("familyName", &self.family_name)
            .text("linkedinId", &self.linkedin_id)
            .text("jobTitle", &self.job_title)
            .text("customerId", &self.customer_id)
            .list("organizations", &self.organizations)
            .list("tags", &self.tags)
            .list("segments", &self.segments)
            .wrapped("emailAddresses", "email", &self.email_addresses)
            .wrapped("phoneNumbers", "phoneNumber", &self.phone_numbers)
            .nested("address", address(&self.address, false))
            .finish()
    }
}

impl ToBody for OrganizationFields {
    fn to_body(&self) -> Value {
        Sparse::default()
            .text("title", &self.title)
            .text("website", &self.website)
            .text("description", &self.description)
            .text("customerId", &self.customer_id)
            .text("chamberOfCommerceNumber", &self.chamber_of_commerce_number)
            .list("tags", &self.tags)
            .list("segments", &self.segments)
            .list("people", &self.people)
            .wrapped("emailAddresses", "email", &self.email_addresses)
            .wrapped("phoneNumbers", "phoneNumber", &self.phone_numbers)
            .nested("address", address(&self.address, true))
            .finish()
    }
}

impl ToBody for TaskFields {
    fn to_body(&self) -> Value {
        Sparse::default()
            .text("title", &self.title)
            .text("workspace", &self.workspace)
            .text("status", &self.status)
            .text("description", &self.description)
            .list("tags", &self.tags)
            .list("people", &self.people)
            .finish()
    }
}
