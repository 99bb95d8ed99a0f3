use std::sync::Arc;

use parking_lot::Mutex;
use rollcall_core::{now_timestamp, AttendanceRecord, NewAttendance, RealtimeEvent};
use tokio::sync::broadcast;
use tracing::instrument;

use crate::error::StoreError;
use crate::storage::{MemoryStorage, Storage};

/// Attendance log. Every appended record is published as
/// [`RealtimeEvent::NewAttendance`] on the broadcast channel.
pub struct AttendanceRepo {
    storage: Arc<dyn Storage<AttendanceRecord>>,
    events: broadcast::Sender<RealtimeEvent>,
    /// Held across append and publish so notifications leave in id order.
    ingest: Mutex<()>,
}

impl AttendanceRepo {
    pub fn new(
        storage: Arc<dyn Storage<AttendanceRecord>>,
        events: broadcast::Sender<RealtimeEvent>,
    ) -> Self {
        Self {
            storage,
            events,
            ingest: Mutex::new(()),
        }
    }

    pub fn in_memory(events: broadcast::Sender<RealtimeEvent>) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), events)
    }

    /// Append a record under the next sequential id and publish it.
    ///
    /// The student id is not checked against registered students.
    #[instrument(skip(self, new), fields(student_id = %new.student_id))]
    pub fn record(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let _ingest = self.ingest.lock();
        let recorded_at = now_timestamp();
        let record = self
            .storage
            .append(&mut |id| new.clone().into_record(id, recorded_at.clone()))?;

        match self.events.send(RealtimeEvent::NewAttendance(record.clone())) {
            Ok(receivers) => {
                tracing::debug!(id = record.id, receivers, "attendance published");
            }
            Err(_) => {
                tracing::debug!(id = record.id, "no realtime subscribers");
            }
        }

        tracing::info!(id = record.id, device_id = %record.device_id, "attendance recorded");
        Ok(record)
    }

    /// All records in creation order.
    pub fn list(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.storage.all()
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<usize, StoreError> {
        self.storage.count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events.subscribe()
    }
}
