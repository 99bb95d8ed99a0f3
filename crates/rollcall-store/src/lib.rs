pub mod attendance;
pub mod error;
pub mod storage;
pub mod students;

pub use attendance::AttendanceRepo;
pub use error::StoreError;
pub use storage::{MemoryStorage, Storage};
pub use students::StudentRepo;
