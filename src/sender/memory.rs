use super::{PointWriter, WriteRequest};
use parking_lot::Mutex;
use std::sync::Arc;

/// Keeps submitted requests in memory instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    requests: Arc<Mutex<Vec<WriteRequest>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submitted requests in submission order.
    pub fn requests(&self) -> Vec<WriteRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn point_count(&self) -> usize {
        self.requests.lock().iter().map(|r| r.points).sum()
    }
}

impl PointWriter for MemoryWriter {
    fn submit(&self, request: WriteRequest) {
        self.requests.lock().push(request);
    }
}
