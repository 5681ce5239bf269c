use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type TryHandle = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: &[TryHandle] = &[
    handlers::core::try_handle,
    handlers::setup::try_handle,
    handlers::auth::try_handle,
    handlers::dashboards::try_handle,
    handlers::academies::try_handle,
    handlers::colleges::try_handle,
    handlers::departments::try_handle,
    handlers::people::try_handle,
    handlers::classrooms::try_handle,
    handlers::subjects::try_handle,
    handlers::content::try_handle,
    handlers::grades::try_handle,
    handlers::attendance::try_handle,
    handlers::stats::try_handle,
    handlers::student::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(id = %req.id, method = %req.method, "request");
    for try_handle in HANDLERS {
        if let Some(resp) = try_handle(state, &req) {
            return resp;
        }
    }

    tracing::warn!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
