use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding the static HTML shell; `index.html` is the fallback.
    pub public_dir: PathBuf,
    /// Per-client realtime send queue length.
    pub max_send_queue: usize,
    /// Capacity of the attendance event broadcast channel.
    pub broadcast_capacity: usize,
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            public_dir: PathBuf::from("public"),
            max_send_queue: 256,
            broadcast_capacity: 1024,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}
