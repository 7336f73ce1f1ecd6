//! Request middleware: schema validation and request tracing.

pub mod tracing_layer;
pub mod validate;
