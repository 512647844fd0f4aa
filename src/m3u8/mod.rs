//! # M3U8 Playlists
//!
//! Media and master playlist models with an encoder that reproduces the
//! same bytes for the same state, and a line-driven decoder.
//!
//! ## Core Features
//!
//! - **Media playlists**: fixed-capacity ring buffer of segments with a
//!   sliding live window, keys, maps, byte ranges, SCTE-35 cues,
//!   discontinuities and program date-times
//! - **Master playlists**: variants, I-frame variants and rendition groups
//! - **Version negotiation**: setters raise `EXT-X-VERSION` to the lowest
//!   value supporting the features in use
//! - **Decoding**: strict or lenient, with playlist type detection
//! - **Caching**: `encode` hands out the same buffer until the playlist changes
//!
//! ## Example Usage
//!
//! ### Building a live playlist
//!
//! ```rust
//! use hlsio::m3u8::{MediaPlaylist, MediaSegment};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut playlist = MediaPlaylist::new(3, 10)?;
//! for i in 0..5 {
//!     playlist.slide(MediaSegment::new(format!("seg{}.ts", i), "", 6.0))?;
//! }
//! assert_eq!(playlist.count(), 3);
//! assert_eq!(playlist.seq_no, 2);
//!
//! let text = playlist.encode();
//! assert!(text.starts_with(b"#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-MEDIA-SEQUENCE:2\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Decoding an unknown manifest
//!
//! ```rust
//! use hlsio::m3u8::{decode, Manifest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = b"#EXTM3U\n#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=1500000\nhigh.m3u8\n";
//! match decode(data, true)? {
//!     Manifest::Master(master) => assert_eq!(master.variants[0].uri, "high.m3u8"),
//!     Manifest::Media(_) => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::BufRead;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::config::DecodeOptions;
use crate::error::Result;

mod decoder;
mod encoder;
mod master;
mod media;
mod types;


pub use self::master::MasterPlaylist;
pub use self::media::MediaPlaylist;
pub use self::types::*;

use self::decoder::Decoder;

/// Operations shared by master and media playlists.
#[async_trait]
pub trait Playlist: fmt::Display + Send {
    /// Renders the playlist, reusing the previous output while unchanged.
    fn encode(&mut self) -> Bytes;

    /// Decodes manifest text into this playlist.
    fn decode(&mut self, data: &[u8], strict: bool) -> Result<()>;

    /// Decodes a line-oriented reader into this playlist.
    fn decode_from<R: BufRead + Send>(&mut self, reader: R, strict: bool) -> Result<()>;

    /// Writes the encoded playlist to an async writer.
    async fn write_to<W: AsyncWrite + Unpin + Send>(&mut self, writer: &mut W) -> Result<()>;
}

#[async_trait]
impl Playlist for MediaPlaylist {
    fn encode(&mut self) -> Bytes {
        MediaPlaylist::encode(self)
    }

    fn decode(&mut self, data: &[u8], strict: bool) -> Result<()> {
        MediaPlaylist::decode(self, data, strict)
    }

    fn decode_from<R: BufRead + Send>(&mut self, reader: R, strict: bool) -> Result<()> {
        MediaPlaylist::decode_from(self, reader, strict)
    }

    async fn write_to<W: AsyncWrite + Unpin + Send>(&mut self, writer: &mut W) -> Result<()> {
        MediaPlaylist::write_to(self, writer).await
    }
}

#[async_trait]
impl Playlist for MasterPlaylist {
    fn encode(&mut self) -> Bytes {
        MasterPlaylist::encode(self)
    }

    fn decode(&mut self, data: &[u8], strict: bool) -> Result<()> {
        MasterPlaylist::decode(self, data, strict)
    }

    fn decode_from<R: BufRead + Send>(&mut self, reader: R, strict: bool) -> Result<()> {
        MasterPlaylist::decode_from(self, reader, strict)
    }

    async fn write_to<W: AsyncWrite + Unpin + Send>(&mut self, writer: &mut W) -> Result<()> {
        MasterPlaylist::write_to(self, writer).await
    }
}

/// A decoded playlist of either kind.
#[derive(Debug, Clone)]
pub enum Manifest {
    /// A master playlist
    Master(MasterPlaylist),
    /// A media playlist
    Media(MediaPlaylist),
}

impl Manifest {
    /// Kind of the decoded playlist.
    pub fn list_type(&self) -> ListType {
        match self {
            Manifest::Master(_) => ListType::Master,
            Manifest::Media(_) => ListType::Media,
        }
    }

    /// Encodes whichever playlist this is.
    pub fn encode(&mut self) -> Bytes {
        match self {
            Manifest::Master(master) => master.encode(),
            Manifest::Media(media) => media.encode(),
        }
    }

    /// The master playlist, if this is one.
    pub fn as_master(&self) -> Option<&MasterPlaylist> {
        match self {
            Manifest::Master(master) => Some(master),
            Manifest::Media(_) => None,
        }
    }

    /// The media playlist, if this is one.
    pub fn as_media(&self) -> Option<&MediaPlaylist> {
        match self {
            Manifest::Media(media) => Some(media),
            Manifest::Master(_) => None,
        }
    }

    /// Unwraps a master playlist.
    pub fn into_master(self) -> Option<MasterPlaylist> {
        match self {
            Manifest::Master(master) => Some(master),
            Manifest::Media(_) => None,
        }
    }

    /// Unwraps a media playlist.
    pub fn into_media(self) -> Option<MediaPlaylist> {
        match self {
            Manifest::Media(media) => Some(media),
            Manifest::Master(_) => None,
        }
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Manifest::Master(master) => master.fmt(f),
            Manifest::Media(media) => media.fmt(f),
        }
    }
}

fn into_manifest(list_type: ListType, master: MasterPlaylist, media: MediaPlaylist) -> Manifest {
    match list_type {
        ListType::Master => Manifest::Master(master),
        ListType::Media => Manifest::Media(media),
    }
}

/// Decodes manifest text of unknown kind.
pub fn decode(data: &[u8], strict: bool) -> Result<Manifest> {
    decode_from(data, strict)
}

/// Decodes a line-oriented reader of unknown kind.
pub fn decode_from<R: BufRead>(reader: R, strict: bool) -> Result<Manifest> {
    let options = DecodeOptions {
        strict,
        ..DecodeOptions::default()
    };
    decode_with(reader, &options)
}

/// Decodes a line-oriented reader with explicit options. A media playlist
/// starts with `options.capacity` slots and an unbounded window.
pub fn decode_with<R: BufRead>(reader: R, options: &DecodeOptions) -> Result<Manifest> {
    let mut master = MasterPlaylist::new();
    let mut media = MediaPlaylist::new(0, options.capacity)?;
    let list_type = {
        let mut decoder = Decoder::new(&mut master, &mut media, None, options.strict);
        decoder.read_lines(reader)?;
        decoder.finish()?
    };
    Ok(into_manifest(list_type, master, media))
}

/// Async variant of [`decode_with`].
pub async fn decode_from_async<R: AsyncBufRead + Unpin>(
    reader: R,
    options: &DecodeOptions,
) -> Result<Manifest> {
    let mut master = MasterPlaylist::new();
    let mut media = MediaPlaylist::new(0, options.capacity)?;
    let list_type = {
        let mut decoder = Decoder::new(&mut master, &mut media, None, options.strict);
        decoder.read_lines_async(reader).await?;
        decoder.finish()?
    };
    Ok(into_manifest(list_type, master, media))
}
