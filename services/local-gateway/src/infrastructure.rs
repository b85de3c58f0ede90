// Infrastructure layer modules
pub mod api_gateway;
pub mod config;
pub mod error;
pub mod front_door;
pub mod logging;

// Re-exports
pub use api_gateway::{from_proxy_response, lambda_fn, to_proxy_request, ApiGatewayConversionError, LambdaFn};
pub use config::{BridgeConfig, BridgeConfigError};
pub use error::ApiError;
pub use front_door::{bind, create_router, serve, serve_with_shutdown, shutdown_signal, ServeError};
pub use logging::init_logging;
