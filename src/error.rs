use thiserror::Error;

/// Errors raised by playlist building, encoding and decoding.
#[derive(Error, Debug)]
pub enum HlsError {
    /// Reading or writing failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No free slot left in the segment ring
    #[error("playlist is full")]
    CapacityExceeded,

    /// A segment was needed but the playlist holds none
    #[error("playlist is empty")]
    EmptyPlaylist,

    /// The live window does not fit the capacity
    #[error("window size {winsize} exceeds capacity {capacity}")]
    InvalidWindowSize {
        /// Requested window size
        winsize: usize,
        /// Playlist capacity
        capacity: usize,
    },

    /// The operation does not fit the playlist's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A tag could not be parsed
    #[error("malformed tag {line:?}: {reason}")]
    MalformedTag {
        /// The offending line
        line: String,
        /// What was wrong with it
        reason: String,
    },

    /// Strict decoding found no `#EXTM3U`
    #[error("#EXTM3U absent")]
    MissingHeader,

    /// No tag told master and media playlists apart
    #[error("can't detect playlist type")]
    UnknownPlaylistType,

    /// Master and media tags in the same input
    #[error("mixed playlist: {0}")]
    MixedPlaylist(String),
}

impl HlsError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        HlsError::MalformedTag {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, HlsError>;
