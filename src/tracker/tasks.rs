use tokio::task::JoinHandle;

/// Owns at most one background task and aborts it when replaced or dropped
#[derive(Debug, Default)]
pub struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn set(&mut self, handle: JoinHandle<()>) {
        self.abort();
        self.handle = Some(handle);
    }

    pub fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.abort();
    }
}
