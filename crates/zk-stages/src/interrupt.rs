use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::StageError;

/// Cancellation flag shared between the driver and running stages.
///
/// Stages poll it between blocks, batches and L1 ranges, never mid-write.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self) {
        self.0.fetch_or(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), StageError> {
        if self.is_set() {
            return Err(StageError::Interrupted);
        }
        Ok(())
    }
}
