/*!
 * Request correlation for outgoing placement calls.
 *
 * Every submission runs inside a task-local [`RequestId`] scope. The HTTP
 * collaborators read it back with [`current_request_id`] and send it as the
 * `x-request-id` header, so backend logs for the check, remove and create
 * of one relocation share an id.
 */

use std::{cell::RefCell, fmt, future::Future};
use uuid::Uuid;

/// Header carrying the request id on outgoing calls.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID tracking information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Returns the scoped id, or a fresh one outside any scope.
pub fn current_or_new_request_id() -> RequestId {
    current_request_id().unwrap_or_default()
}
