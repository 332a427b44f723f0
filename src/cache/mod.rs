//! Normalized entity cache
//!
//! Server entities are stored once under their `Typename:id` identity and
//! referenced from wherever they appear. Top-level fields and client-local
//! fields live on the root record. Resolved query results are memoized and
//! invalidated per (entity, field) as writes change values.

pub mod normalize;
pub mod store;
pub mod value;

pub use normalize::Resolution;
pub use store::{Dependency, EntityStore, SharedStore};
pub use value::{EntityKey, FieldValue, Record, ROOT_QUERY};
