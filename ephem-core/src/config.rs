/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of independently locked stripes in the record table
    pub num_stripes: usize,

    /// fsync the paste log after every accepted write (DiskStore only).
    /// Without it a write is handed to the OS but may be lost on power failure.
    pub sync_writes: bool,

    /// Rewrite the paste log once it grows past this many bytes (DiskStore only).
    /// The log is also allowed to reach twice its size after the last rewrite.
    pub checkpoint_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            num_stripes: 256,
            sync_writes: true,
            checkpoint_bytes: 64 * 1024 * 1024,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of stripes
    pub fn with_num_stripes(mut self, stripes: usize) -> Self {
        self.num_stripes = stripes;
        self
    }

    /// Enable or disable fsync on every write
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Set the log size that triggers a checkpoint
    pub fn with_checkpoint_bytes(mut self, bytes: u64) -> Self {
        self.checkpoint_bytes = bytes;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.num_stripes == 0 {
            return Err("num_stripes must be greater than 0".to_string());
        }

        if self.num_stripes > 65_536 {
            return Err("num_stripes must be at most 65536".to_string());
        }

        if self.checkpoint_bytes == 0 {
            return Err("checkpoint_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.num_stripes, 256);
        assert!(config.sync_writes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = StoreConfig::new().with_num_stripes(8).with_sync_writes(false);
        assert_eq!(config.num_stripes, 8);
        assert!(!config.sync_writes);
    }

    #[test]
    fn test_validate_zero_stripes() {
        assert!(StoreConfig::new().with_num_stripes(0).validate().is_err());
    }

    #[test]
    fn test_validate_checkpoint_bytes() {
        assert_eq!(StoreConfig::default().checkpoint_bytes, 64 * 1024 * 1024);
        assert!(StoreConfig::new().with_checkpoint_bytes(0).validate().is_err());
        assert!(StoreConfig::new().with_checkpoint_bytes(4096).validate().is_ok());
    }
}
