//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Tier selection constants
pub mod tiers {
    /// Maximum number of files fetched and analyzed per priority tier
    pub const DEFAULT_MAX_FILES_PER_TIER: usize = 20;
}

/// Repository gateway constants
pub mod gateway {
    /// Number of file-content fetches issued concurrently per batch
    pub const FETCH_BATCH_SIZE: usize = 5;

    /// Delay between fetch batches to stay under upstream rate limits (milliseconds)
    pub const BATCH_DELAY_MS: u64 = 200;

    /// File-tree cache time-to-live (seconds)
    pub const TREE_CACHE_TTL_SECS: u64 = 300;

    /// Request timeout for hosting-provider calls (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Analysis engine constants
pub mod engine {
    /// Sampling temperature for analysis requests
    pub const TEMPERATURE: f32 = 0.2;

    /// Output-token ceiling for one tier analysis.
    ///
    /// Sized well above the largest observed findings payload: a tight
    /// ceiling truncates the JSON mid-stream and the whole tier parses to
    /// zero findings.
    pub const MAX_OUTPUT_TOKENS: u32 = 16_384;

    /// Request timeout for one streaming completion call (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 600;

    /// Maximum characters of a single file included in the prompt
    pub const MAX_FILE_CHARS: usize = 30_000;
}

/// Pricing model defaults (USD per million tokens)
pub mod pricing {
    pub const DEFAULT_INPUT_PER_MTOK: f64 = 3.0;
    pub const DEFAULT_OUTPUT_PER_MTOK: f64 = 15.0;

    /// Empirical output/input token ratio used for pre-flight estimates
    pub const OUTPUT_RATIO: f64 = 0.2;
}

/// Event stream constants
pub mod stream {
    /// Heartbeat cadence while a run is paused awaiting approval (seconds)
    pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;

    /// Outbound event channel capacity
    pub const EVENT_CHANNEL_CAPACITY: usize = 64;
}
