use thiserror::Error;

/// Rejection reasons for a table or column identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidIdentifier {
    #[error("identifier must not be empty")]
    Empty,
    #[error("identifier contains forbidden character {0:?}")]
    ForbiddenCharacter(char),
}

/// Validate a caller-supplied table or column name before it is interpolated
/// into dynamically built query text.
///
/// Only ASCII letters, digits and underscores are accepted. Any syntactically
/// valid name passes, including names of tables that do not exist; absence is
/// the introspector's concern, not the validator's.
pub fn validate_identifier(name: &str) -> Result<(), InvalidIdentifier> {
    if name.is_empty() {
        return Err(InvalidIdentifier::Empty);
    }

    if let Some(bad) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(InvalidIdentifier::ForbiddenCharacter(bad));
    }

    Ok(())
}

/// Reduce a caller-supplied collection name to the filesystem-safe subset
/// (letters, digits, underscore, dash). Everything else is dropped, so a name
/// like `../../etc` cannot escape the data directory.
pub fn sanitize_collection_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
