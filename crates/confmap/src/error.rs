use confmap_schema::MaterializeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no schema has been loaded")]
    NoSchema,
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}
