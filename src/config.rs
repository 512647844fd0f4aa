//! Process-wide constants and decode options.
//!
//! Nothing here is read from the environment or from files: the codec is a
//! pure transformation and callers pass [`DecodeOptions`] explicitly.

/// Lowest protocol version a playlist is created with.
///
/// Version 3 is the first one allowing floating-point `EXTINF` durations,
/// which is how segment durations are always kept.
pub const MIN_VERSION: u8 = 3;

/// Ring-buffer capacity of media playlists created by the top-level decoders.
/// The buffer is doubled whenever a decoded manifest holds more segments.
pub const DEFAULT_DECODE_CAPACITY: usize = 1024;

/// Date and time layout of `EXT-X-PROGRAM-DATE-TIME` values (RFC 3339).
///
/// The writer appends up to nine fractional digits with trailing zeros
/// trimmed, then `Z` for a zero UTC offset or `+hh:mm` otherwise.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Options for the top-level decode helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail on malformed or out-of-place tags instead of skipping them.
    pub strict: bool,
    /// Initial ring-buffer capacity of a decoded media playlist.
    pub capacity: usize,
}

impl DecodeOptions {
    /// Strict decoding with the default capacity.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Lenient decoding: bad lines are logged and skipped.
    pub fn lenient() -> Self {
        Self::default()
    }

    /// Starts decoded media playlists with `capacity` slots.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            capacity: DEFAULT_DECODE_CAPACITY,
        }
    }
}
