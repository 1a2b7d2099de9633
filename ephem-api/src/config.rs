use ephem_core::MIN_ID_BYTES;

/// Creation service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Random bytes per paste id (hex id is twice as long)
    pub id_bytes: usize,

    /// How many fresh ids to try when the store reports a collision
    pub max_id_attempts: u32,

    /// Maximum content size in bytes (None = unlimited)
    pub max_content_bytes: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id_bytes: MIN_ID_BYTES,
            max_id_attempts: 3,
            max_content_bytes: None,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_bytes(mut self, bytes: usize) -> Self {
        self.id_bytes = bytes;
        self
    }

    pub fn with_max_id_attempts(mut self, attempts: u32) -> Self {
        self.max_id_attempts = attempts;
        self
    }

    pub fn with_max_content_bytes(mut self, max: usize) -> Self {
        self.max_content_bytes = Some(max);
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.id_bytes < MIN_ID_BYTES {
            return Err(format!("id_bytes must be at least {}", MIN_ID_BYTES));
        }

        if self.id_bytes > 64 {
            return Err("id_bytes must be at most 64".to_string());
        }

        if self.max_id_attempts == 0 {
            return Err("max_id_attempts must be greater than 0".to_string());
        }

        if self.max_content_bytes == Some(0) {
            return Err("max_content_bytes must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}
