//! # loan-schema: Request Validation
//!
//! Declarative JSON Schema (Draft 2020-12) documents for every request
//! payload the API accepts, and a validator that reports *every* violation
//! in one aggregated message rather than stopping at the first.
//!
//! ## Schema extensions
//!
//! Two vendor keywords ride along in the schema documents. The validation
//! engine ignores them; [`RequestSchema`] interprets them.
//!
//! - `x-messages`: per-property map from a JSON Schema keyword (`required`,
//!   `type`, `exclusiveMinimum`, ...) to the human-readable message reported
//!   when that keyword fails.
//! - `x-default: "now"`: fill a missing property with the current UTC time
//!   (RFC 3339). Literal `default` values are applied too.
//!
//! Unknown extra fields are tolerated and passed through.

pub mod error;
pub mod schemas;
pub mod validate;

pub use error::{SchemaError, Violation};
pub use schemas::Schemas;
pub use validate::{merge_sources, RequestSchema};
