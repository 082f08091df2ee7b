//! Application-level configuration constants.

// Profile loading
pub const PROFILE_BATCH_MS: u32 = 500;
pub const PROFILE_EVENT_BATCH_MS: u32 = 300;

// Subscriptions
pub const SUBSCRIBE_TIMEOUT_MS: u32 = 3000;
pub const DEFERRED_DISPATCH_MS: u32 = 50;

// Content feed
pub const CONTENT_WINDOW_DAYS: u64 = 30;
pub const CONTENT_LIMIT: usize = 1000;
pub const FEED_PAGE_SIZE: usize = 30;

// Infinite scroll
pub const SCROLL_DELAY_MS: u32 = 500;
pub const SCROLL_THRESHOLD_PX: f64 = 4000.0;
