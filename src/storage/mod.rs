mod engine;
mod recorder;
mod seed;
mod store;
mod updates;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

pub use engine::{Advance, WorkflowBinding};
pub use recorder::{AuditRecorder, Mutation, StoreEvent, RECENT_ACTIVITY_LIMIT};
pub use seed::STANDARD_TEMPLATE;
pub use store::{EntityStore, Stored};
pub use updates::{
    AuthorizerUpdate, DepartmentUpdate, DocumentUpdate, EmailTemplateUpdate, RoleUpdate,
    SignatureUpdate, TemplateUpdate, WorkflowTemplateUpdate, WorkflowUpdate,
};

/// Shared, cloneable handle to one [`EntityStore`].
///
/// Constructed explicitly and passed to every consumer; there is no global
/// store. Each operation holds the lock for a single synchronous mutation.
#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Arc<Mutex<EntityStore>>,
}

impl StoreHandle {
    pub fn new(store: EntityStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn seeded() -> Self {
        Self::new(EntityStore::seeded())
    }

    pub async fn lock(&self) -> MutexGuard<'_, EntityStore> {
        self.inner.lock().await
    }

    /// Clear all collections, for test isolation.
    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }
}
