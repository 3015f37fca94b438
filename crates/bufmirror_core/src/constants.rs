//! Shared constants used across bufmirror crates.

/// Directory the editor creates modification channels in.
pub const DEFAULT_CHANNEL_DIR: &str = "/dev/shm";

/// File name prefix of modification channels.
pub const CHANNEL_FILE_PREFIX: &str = "kakoune";

/// Initial poll delay, and the amount it grows by on every idle poll.
pub const DEFAULT_POLL_STEP_MS: u64 = 10;

/// Upper bound for the idle poll delay.
pub const DEFAULT_POLL_MAX_MS: u64 = 250;

/// Default upper bound for a single record payload.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// Width of one header field on the wire (a native `c_int`).
pub const HEADER_FIELD_LEN: usize = std::mem::size_of::<std::os::raw::c_int>();

/// Number of header fields preceding each payload.
pub const HEADER_FIELD_COUNT: usize = 4;

/// Total header length of an edit record.
pub const HEADER_LEN: usize = HEADER_FIELD_LEN * HEADER_FIELD_COUNT;
