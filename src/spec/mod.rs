pub mod endpoint;
pub mod loader;
pub mod schema;
pub mod specification;

pub use endpoint::{Endpoint, HttpMethod, MediaContent, Parameter, ParameterLocation, RequestBody};
pub use loader::{SpecLoader, SpecSource};
pub use schema::{Schema, SchemaResolver};
pub use specification::{INLINE_SOURCE, Specification};
