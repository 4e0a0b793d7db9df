//! Synchronous adapter core for the RogerRoger CRM API.
//!
//! # Overview
//! Exposes people, organizations, tasks, tags and segments as declarative
//! row operations for a workflow-automation host, plus the option loaders
//! that fill the host's selectors. The core builds `HttpRequest` values and
//! interprets `HttpResponse` values; the host executes the round-trip through
//! a [`Transport`], keeping the core deterministic and testable.
//!
//! # Design
//! - `RogerClient` is stateless: it holds only the credentials.
//! - Row parameters are validated once into a [`Command`], one variant per
//!   resource.
//! - Bodies are sparse: absent and empty fields are left out.
//! - List calls follow `view.next` through [`pagination::walk`].
//! - The workspace column cache lives in an [`OptionSession`] owned by the
//!   caller, not in global state.

pub mod body;
pub mod cache;
pub mod client;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod options;
pub mod pagination;
pub mod params;
pub mod types;

pub use body::ToBody;
pub use cache::{CachedColumn, ColumnCache};
pub use client::RogerClient;
pub use credentials::{CredentialStatus, Credentials};
pub use dispatch::{Dispatcher, ExecutionSettings, InputRow, OutputRecord};
pub use error::{AdapterError, ApiError, ExecutionError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use options::{OptionLoader, OptionSession};
pub use pagination::{walk, Walk, WalkMode};
pub use params::{
    Address, Command, ItemAction, OrganizationFields, Pagination, PersonFields, Presence,
    TaskFields,
};
pub use types::{Collection, Operation, OperationOption, OptionItem, PageView, Resource};
