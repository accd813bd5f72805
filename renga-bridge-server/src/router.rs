//! Dispatch of requests to command handlers.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use renga_bridge_core::protocol::{Request, Response, GET_WALLS, UPDATE_POINTS};
use renga_bridge_core::{BridgeError, Result};
use serde_json::Value;

use crate::handlers::{GetWallsHandler, UpdatePointsHandler};
use crate::identity::IdentityMap;
use crate::reconcile::ColumnReconciler;
use crate::store::ModelStore;

/// Executes one command.
pub trait CommandHandler: Send + Sync {
    /// Handles `request`, returning the response `data` on success.
    fn handle(&self, request: &Request) -> Result<Value>;
}

impl<F> CommandHandler for F
where
    F: Fn(&Request) -> Result<Value> + Send + Sync,
{
    fn handle(&self, request: &Request) -> Result<Value> {
        self(request)
    }
}

/// Maps command names to handlers.
#[derive(Default, Clone)]
pub struct CommandRouter {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("commands", &self.commands())
            .finish()
    }
}

impl CommandRouter {
    /// Creates a router with no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router serving `update_points` and `get_walls` over `store`.
    pub fn with_default_handlers(
        store: Arc<dyn ModelStore>,
        identities: Arc<IdentityMap>,
        default_column_height: f64,
    ) -> Self {
        let reconciler = ColumnReconciler::new(store.clone(), identities, default_column_height);

        let mut router = Self::new();
        router.register(UPDATE_POINTS, UpdatePointsHandler::new(store.clone(), reconciler));
        router.register(GET_WALLS, GetWallsHandler::new(store));
        router
    }

    /// Registers `handler` for `command`, replacing any previous handler.
    pub fn register(&mut self, command: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.handlers.insert(command.into(), Arc::new(handler));
    }

    /// Returns the registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Routes `request` to its handler.
    ///
    /// Never fails: unknown commands, handler errors and handler panics all
    /// become a failed response carrying the request id.
    pub fn route(&self, request: &Request) -> Response {
        let Some(handler) = self.handlers.get(&request.command) else {
            tracing::debug!(command = %request.command, "unknown command");
            let err = BridgeError::UnknownCommand(request.command.clone());
            return Response::failure(request.id.clone(), err.to_string());
        };

        match catch_unwind(AssertUnwindSafe(|| handler.handle(request))) {
            Ok(Ok(data)) => Response::success(request.id.clone(), data),
            Ok(Err(e)) => {
                tracing::debug!(command = %request.command, error = %e, "command failed");
                Response::failure(request.id.clone(), failure_message(&e))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(command = %request.command, panic = %message, "handler panicked");
                Response::failure(request.id.clone(), format!("handler panicked: {}", message))
            }
        }
    }
}

/// Text sent to the client for a failed command.
///
/// Validation and model failures are reported without the category prefix.
fn failure_message(err: &BridgeError) -> String {
    match err {
        BridgeError::Validation(message) | BridgeError::ModelStore(message) => message.clone(),
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
