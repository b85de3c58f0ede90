// Application layer modules
pub mod echo_handler;
pub mod handler;
pub mod invocation_adapter;

// Re-exports
pub use echo_handler::EchoHandler;
pub use handler::{handler_fn, json_handler_fn, HandlerError, HandlerFn, InvocationHandler, JsonHandlerFn};
pub use invocation_adapter::{InvocationAdapter, InvocationPhase, DEFAULT_INVOCATION_TIMEOUT};
