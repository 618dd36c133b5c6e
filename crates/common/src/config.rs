//! Configuration structs for the loader.

use serde::{Deserialize, Serialize};

/// Frame loader configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Name given to the loader's worker thread.
    pub thread_name: String,
    /// Maximum number of decoder handles retained between passes.
    pub max_decoders: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            thread_name: "frame-loader".to_string(),
            max_decoders: 4,
        }
    }
}
