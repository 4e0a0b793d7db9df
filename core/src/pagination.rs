//! Following `view.next` links across a JSON-LD collection.

use serde_json::Value;
use tracing::{debug, trace};

use crate::client::RogerClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::types::PageView;

/// How far a walk goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Follow `next` until the server stops sending one.
    Full,
    /// Stop after the first response, whatever it says about `next`.
    SinglePage,
}

/// Items gathered by a walk, in the order the server yielded them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Walk {
    pub items: Vec<Value>,
    /// View of the last page fetched.
    pub view: Option<PageView>,
}

/// Walk a collection starting at `start`, which may be absolute or relative
/// to the base URL. Any failing page aborts the whole walk; nothing gathered
/// so far is returned.
pub fn walk<T: Transport + ?Sized>(
    client: &RogerClient,
    transport: &T,
    start: &str,
    mode: WalkMode,
) -> Result<Walk, ApiError> {
    let mut items = Vec::new();
    let mut next = Some(start.to_string());
    let mut view = None;
    let mut pages = 0usize;

    while let Some(reference) = next.take() {
        let request = client.build_list(&reference);
        trace!(url = %request.url, "fetching page");
        let page = client.parse_collection(transport.send(&request)?)?;
        pages += 1;
        items.extend(page.member);
        next = page.view.as_ref().and_then(|v| v.next.clone());
        view = page.view;
        if mode == WalkMode::SinglePage {
            break;
        }
    }

    debug!(pages, items = items.len(), "walk finished");
    Ok(Walk { items, view })
}
