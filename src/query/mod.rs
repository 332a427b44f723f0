//! Query shapes, execution and pagination

pub mod executor;
pub mod pagination;
pub mod shape;

pub use executor::{FetchPolicy, QueryExecutor, QueryHandle, QueryState, QueryStatus};
pub use pagination::{ConnectionSpec, FetchMoreOutcome};
pub use shape::{variables, Argument, Field, FieldKind, Operation, OperationKind, Variables};
