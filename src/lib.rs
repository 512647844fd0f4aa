#![doc(html_root_url = "https://docs.rs/hlsio/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # hlsio - HLS Manifest Codec
//!
//! `hlsio` reads and writes HTTP Live Streaming (M3U8) manifests. It is meant
//! for packagers and origin servers that keep live playlists in memory and
//! rewrite them after every new segment.
//!
//! ## Features
//!
//! ### Media Playlists
//! - Fixed-capacity segment store with a sliding live window
//! - Encryption keys, initialization maps and byte ranges
//! - SCTE-35 cues in the SCTE 67 and OATCLS syntaxes
//! - Discontinuities and program date-times
//! - Widevine packager tags
//!
//! ### Master Playlists
//! - Variant and I-frame variant streams
//! - Rendition groups (`EXT-X-MEDIA`) written once per group
//!
//! ### Codec
//! - `EXT-X-VERSION` raised automatically to what the features in use need
//! - Cached encoding, shared as [`bytes::Bytes`]
//! - Strict and lenient decoding with playlist type detection
//! - Async writing and decoding on top of tokio
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! hlsio = "0.1.0"
//! ```
//!
//! ### Live Playlist Example
//!
//! ```rust
//! use hlsio::m3u8::{Key, MediaPlaylist, MediaSegment};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut playlist = MediaPlaylist::new(3, 5)?;
//! playlist.set_default_key(Key::new("AES-128", "https://example.com/key", "", "", ""));
//! playlist.append(MediaSegment::new("seg0.ts", "", 6.0))?;
//! playlist.append(MediaSegment::new("seg1.ts", "", 5.5))?;
//! playlist.set_discontinuity()?;
//!
//! println!("{}", playlist);
//! # Ok(())
//! # }
//! ```
//!
//! ### Writing To A File
//!
//! ```rust,no_run
//! use hlsio::m3u8::{MediaPlaylist, MediaSegment};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut playlist = MediaPlaylist::new(0, 16)?;
//!     playlist.append(MediaSegment::new("seg0.ts", "", 6.0))?;
//!     playlist.close();
//!
//!     let mut file = tokio::fs::File::create("vod.m3u8").await?;
//!     playlist.write_to(&mut file).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Decoding Example
//!
//! ```rust
//! use hlsio::config::DecodeOptions;
//! use hlsio::m3u8::{decode_with, ListType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:9.009,\nfirst.ts\n#EXT-X-ENDLIST\n";
//! let manifest = decode_with(data.as_bytes(), &DecodeOptions::strict())?;
//! assert_eq!(manifest.list_type(), ListType::Media);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `m3u8`: Playlist models, encoder and decoder
//!   - Media and master playlists
//!   - Segment, key, map, SCTE-35 and rendition types
//!   - The `Playlist` trait and the `Manifest` enum
//!
//! - `config`: Protocol constants and decode options
//!
//! - `error`: Error handling types and utilities
//!   - Error enum for every failure of the codec
//!   - Result type alias for convenience
//!
//! - `utils`: Common utilities and helper functions
//!   - Attribute-list tokenizing
//!   - Float, duration and date-time formatting
//!

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Media and master playlist codec
pub mod m3u8;

/// Common utilities and helper functions
pub mod utils;

pub use error::{HlsError, Result};

pub use m3u8::{Manifest, MasterPlaylist, MediaPlaylist, MediaSegment, Playlist};
