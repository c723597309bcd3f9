use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// A table or column name failed the identifier allow-list. Identifiers
    /// are the only text interpolated into SQL; everything else is bound.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// The underlying store rejected or failed the query.
    #[error("Query execution failed: {source}")]
    Execution {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A result column came back in a type the value model cannot carry.
    #[error("Unsupported type '{ty}' in column '{column}'")]
    UnsupportedType { column: String, ty: String },

    /// A result column failed to decode into the expected representation.
    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl QueryError {
    pub fn execution<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        QueryError::Execution {
            source: Box::new(source),
        }
    }
}
