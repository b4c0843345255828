pub mod error;
pub mod report;
pub mod session;
pub mod slot;

pub use confmap_document as document;
pub use confmap_schema as schema;

pub use error::SessionError;
pub use session::Session;
pub use slot::SchemaSlot;
