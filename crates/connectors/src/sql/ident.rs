use crate::error::QueryError;

/// Validates a SQL identifier against the allow-list: a bare name or a
/// single `schema.name` qualification, each part `[A-Za-z_][A-Za-z0-9_]*`.
/// Identifiers come from trusted caller configuration, never from end-user
/// input, but the check keeps a typo or a smuggled quote from ever reaching
/// interpolated SQL text.
pub fn validate(identifier: &str) -> Result<&str, QueryError> {
    let mut parts = identifier.split('.');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => valid_part(name),
        (Some(schema), Some(name), None) => valid_part(schema) && valid_part(name),
        _ => false,
    };

    if valid {
        Ok(identifier)
    } else {
        Err(QueryError::InvalidIdentifier(identifier.to_string()))
    }
}

fn valid_part(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
