use crate::error::{Result, SemrelError};
use crate::hvcs::ReleasePublisher;
use std::cell::{Cell, RefCell};

/// Publisher recording `(tag, notes)` for every release creation call
#[derive(Default)]
pub struct MockPublisher {
    releases: RefCell<Vec<(String, String)>>,
    fail: Cell<bool>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every release creation fail with a transport error
    pub fn fail(&self) {
        self.fail.set(true);
    }

    pub fn releases(&self) -> Vec<(String, String)> {
        self.releases.borrow().clone()
    }
}

impl ReleasePublisher for MockPublisher {
    fn create_release(&self, tag: &str, notes: &str) -> Result<String> {
        self.releases
            .borrow_mut()
            .push((tag.to_string(), notes.to_string()));
        if self.fail.get() {
            return Err(SemrelError::transport(format!(
                "mock release for {} failed",
                tag
            )));
        }
        Ok(format!("release-{}", tag))
    }
}
