use tokio::task::JoinHandle;

/// Owns the background tasks of one connection (reader, heart-beat).
///
/// Dropping the manager aborts everything it still tracks, so a session that
/// is replaced never leaves its reader running.
pub struct TaskManager {
    label: String,
    handles: Vec<JoinHandle<()>>,
}

impl TaskManager {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            handles: Vec::new(),
        }
    }

    /// Spawn a task and track it
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(future));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        if !self.handles.is_empty() {
            tracing::debug!("[{}] Aborting {} task(s)", self.label, self.handles.len());
        }
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
