pub mod library_store;
pub mod schema;

pub use library_store::{LibraryStore, LookupTable};
pub use schema::SCHEMA_SCRIPT;
