use crate::cipher::CipherExecutor;
use ticketry_core::Result;

/// Identity cipher used when payload encryption is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCipherExecutor;

impl NoOpCipherExecutor {
    pub const fn new() -> Self {
        Self
    }
}

impl<T: Clone + Send + Sync> CipherExecutor<T, T> for NoOpCipherExecutor {
    fn encode(&self, value: &T) -> Result<T> {
        Ok(value.clone())
    }

    fn decode(&self, value: &T) -> Result<T> {
        Ok(value.clone())
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
