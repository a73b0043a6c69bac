//! Process configuration for offline band access

/// Settings consulted when an offline band loads its pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterConfig {
    /// Allow offline bands to open their external files
    pub enable_offline_rasters: bool,

    /// Memory-map external files instead of reading them into memory
    pub use_mmap: bool,

    /// Number of decoded TIFF strips or tiles kept per open source
    pub chunk_cache_size: usize,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            enable_offline_rasters: true,
            use_mmap: true,
            chunk_cache_size: 64,
        }
    }
}

impl RasterConfig {
    /// Creates a configuration that refuses to touch external files
    pub fn offline_disabled() -> Self {
        Self {
            enable_offline_rasters: false,
            ..Self::default()
        }
    }

    pub fn with_offline_rasters(mut self, enabled: bool) -> Self {
        self.enable_offline_rasters = enabled;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_chunk_cache_size(mut self, chunks: usize) -> Self {
        self.chunk_cache_size = chunks;
        self
    }
}
