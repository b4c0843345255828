//! Atomic publication of finished schemas.

use std::sync::{Arc, PoisonError, RwLock};

use confmap_schema::SchemaDocument;

/// Shared handle to the current schema.
///
/// A schema is only stored once fully built, so readers observe either the
/// previous schema or the complete new one. Clones share the same slot, which
/// lets a builder thread publish while sessions read.
#[derive(Debug, Clone, Default)]
pub struct SchemaSlot {
    inner: Arc<RwLock<Option<Arc<SchemaDocument>>>>,
}

impl SchemaSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current schema and returns the published handle.
    pub fn publish(&self, schema: SchemaDocument) -> Arc<SchemaDocument> {
        let schema = Arc::new(schema);
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(schema.clone());
        schema
    }

    pub fn current(&self) -> Option<Arc<SchemaDocument>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_slot_is_shareable() {
        assert_send_sync::<SchemaSlot>();
        assert_send_sync::<SchemaDocument>();
    }

    #[test]
    fn test_publish_from_another_thread() {
        let slot = SchemaSlot::new();
        assert!(slot.current().is_none());

        let writer = slot.clone();
        let published = std::thread::spawn(move || writer.publish(SchemaDocument::default()))
            .join()
            .unwrap();

        let current = slot.current().unwrap();
        assert!(Arc::ptr_eq(&current, &published));

        slot.clear();
        assert!(slot.current().is_none());
    }
}
