use parking_lot::RwLock;

use crate::error::StoreError;

/// Append-only row storage behind the repositories.
///
/// Ids are assigned by the storage: the next id is the current row count
/// plus one, computed under the same lock as the append.
pub trait Storage<T>: Send + Sync {
    /// Build the row for the next id, append it and return a copy.
    fn append(&self, build: &mut dyn FnMut(u64) -> T) -> Result<T, StoreError>;

    /// Every row in insertion order.
    fn all(&self) -> Result<Vec<T>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

/// Volatile in-process storage. Contents are lost on restart.
pub struct MemoryStorage<T> {
    rows: RwLock<Vec<T>>,
}

impl<T> MemoryStorage<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl<T> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> Storage<T> for MemoryStorage<T> {
    fn append(&self, build: &mut dyn FnMut(u64) -> T) -> Result<T, StoreError> {
        let mut rows = self.rows.write();
        let row = build(rows.len() as u64 + 1);
        rows.push(row.clone());
        Ok(row)
    }

    fn all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.rows.read().clone())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.rows.read().len())
    }
}
