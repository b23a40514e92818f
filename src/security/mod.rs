pub mod validation;

pub use validation::{sanitize_collection_name, validate_identifier, InvalidIdentifier};
