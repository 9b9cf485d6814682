use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::DEFAULT_WINDOW_SIZE;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DeltaConfig {
    /// Number of target bytes covered by one delta window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Accept an svndiff stream that ends in the middle of a window.
    #[serde(default = "default_tolerate_early_close")]
    pub tolerate_early_close: bool,
}

fn default_window_size() -> usize {
    debug!("Using default delta window size: {DEFAULT_WINDOW_SIZE}");
    DEFAULT_WINDOW_SIZE
}

fn default_tolerate_early_close() -> bool {
    debug!("Using default svndiff early close tolerance: false");
    false
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            tolerate_early_close: default_tolerate_early_close(),
        }
    }
}
