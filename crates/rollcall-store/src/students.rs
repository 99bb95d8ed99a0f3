use std::sync::Arc;

use rollcall_core::{now_timestamp, NewStudent, Student};
use tracing::instrument;

use crate::error::StoreError;
use crate::storage::{MemoryStorage, Storage};

/// Student registrations. No duplicate checking on `studentId` or `rfidTag`.
pub struct StudentRepo {
    storage: Arc<dyn Storage<Student>>,
}

impl StudentRepo {
    pub fn new(storage: Arc<dyn Storage<Student>>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Register a student under the next sequential id.
    #[instrument(skip(self, new), fields(student_id = %new.student_id))]
    pub fn register(&self, new: NewStudent) -> Result<Student, StoreError> {
        let registered_at = now_timestamp();
        let student = self
            .storage
            .append(&mut |id| new.clone().into_student(id, registered_at.clone()))?;
        tracing::info!(id = student.id, "student registered");
        Ok(student)
    }

    /// All students in registration order.
    pub fn list(&self) -> Result<Vec<Student>, StoreError> {
        self.storage.all()
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<usize, StoreError> {
        self.storage.count()
    }
}
