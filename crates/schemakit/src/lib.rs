//! # Schemakit
//!
//! The subset of JSON-Schema needed to classify REST operation schemas.
//!
//! ## Core Concepts
//!
//! - **Schema**: a serde model of one schema node (`type`, `properties`,
//!   `required`, `items`, `default`, `enum`, combinators)
//! - **Flattening**: resolving `oneOf`/`anyOf`/`allOf` into a single node
//! - **Comparison**: strict structural equality ([`compare`]) and the looser
//!   shape check ([`similar`])
//! - **Validation**: checking a result value against its declared schema
//!
//! ## Example
//!
//! ```
//! use schemakit::{Schema, similar};
//!
//! let created = Schema::object([("id", Schema::string())]);
//! let read: Schema = serde_json::from_value(serde_json::json!({
//!     "type": "object",
//!     "properties": {"id": {"type": "string", "description": "identifier"}}
//! })).unwrap();
//!
//! assert!(similar(&created, &read));
//! ```

pub mod compare;
pub mod error;
pub mod flatten;
pub mod schema;
pub mod validate;

pub use compare::{compare, similar};
pub use error::{Error, Result};
pub use flatten::flatten;
pub use schema::{Schema, SchemaType, TypeDecl};
pub use validate::validate;
