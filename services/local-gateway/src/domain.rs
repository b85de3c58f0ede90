// Domain layer modules
pub mod error_body;
pub mod inbound_request;
pub mod invocation_envelope;
pub mod invocation_result;
pub mod mount_prefix;

// Re-exports
pub use error_body::ErrorBody;
pub use inbound_request::{parse_query, InboundRequest, QueryValue};
pub use invocation_envelope::{strip_mount_prefix, InvocationEnvelope};
pub use invocation_result::{InvocationResult, MalformedResultError};
pub use mount_prefix::{MountPrefix, MountPrefixError};
