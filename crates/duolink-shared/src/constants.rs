/// Application name
pub const APP_NAME: &str = "Duolink";

/// Camera capture width in pixels (HD)
pub const VIDEO_WIDTH: u32 = 1280;

/// Camera capture height in pixels
pub const VIDEO_HEIGHT: u32 = 720;

/// Screen capture target frame rate
pub const SCREEN_CAPTURE_FPS: u32 = 60;

/// Quiet window after the last typing signal before the indicator clears
pub const TYPING_CLEAR_MS: u64 = 2000;

/// Maximum serialized payload size accepted from the data channel (256 KiB)
pub const MAX_PAYLOAD_SIZE: usize = 262_144;

/// Buffer size for command and notification channels
pub const CHANNEL_BUFFER: usize = 256;
