use std::fmt;
use std::sync::Arc;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;

use super::media::MediaPlaylist;

// Compatibility floors (section 7 of the HLS draft)
/// Integer `EXTINF` durations
pub const VERSION_INTEGER_DURATIONS: u8 = 3;
/// `EXT-X-BYTERANGE`
pub const VERSION_BYTE_RANGE: u8 = 4;
/// `EXT-X-I-FRAMES-ONLY`
pub const VERSION_IFRAMES_ONLY: u8 = 4;
/// `EXT-X-MEDIA` rendition groups
pub const VERSION_ALTERNATIVES: u8 = 4;
/// `KEYFORMAT` / `KEYFORMATVERSIONS` key attributes
pub const VERSION_KEY_FORMAT: u8 = 5;
/// `EXT-X-MAP`
pub const VERSION_MAP: u8 = 5;

/// Raises `ver` to `required` if it is lower. Versions only grow here; the
/// playlists' `set_version` is the one way to lower them again.
pub(crate) fn check_version(ver: &mut u8, required: u8) {
    if *ver < required {
        *ver = required;
    }
}

/// Kind of a decoded playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListType {
    /// Variant streams (`EXT-X-STREAM-INF`)
    Master,
    /// Media segments (`EXTINF`)
    Media,
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListType::Master => write!(f, "master"),
            ListType::Media => write!(f, "media"),
        }
    }
}

/// Value of `EXT-X-PLAYLIST-TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// Segments may only be appended
    Event,
    /// The playlist never changes
    Vod,
}

/// Tag syntax of a SCTE-35 cue that does not use `EXT-X-DATERANGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scte35Syntax {
    /// `#EXT-SCTE35:CUE="...",ID="...",TIME=...` (SCTE 67 2014)
    #[default]
    Syntax672014,
    /// `#EXT-OATCLS-SCTE35` / `#EXT-X-CUE-OUT` / `-CONT` / `#EXT-X-CUE-IN`
    Oatcls,
}

/// Position of a segment relative to an ad break. Only the OATCLS syntax
/// renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CueType {
    /// First segment of the break (`#EXT-X-CUE-OUT`)
    #[default]
    Start,
    /// Inside the break (`#EXT-X-CUE-OUT-CONT`)
    Mid,
    /// First segment after the break (`#EXT-X-CUE-IN`)
    End,
}

/// A SCTE-35 ad-signalling cue attached to a segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scte {
    /// Tag family used on output
    pub syntax: Scte35Syntax,
    /// Position within the break
    pub cue_type: CueType,
    /// Base64 splice_info_section
    pub cue: String,
    /// `ID` of a SCTE 67 cue
    pub id: String,
    /// SCTE 67 `TIME`, or the OATCLS break duration
    pub time: f64,
    /// Seconds elapsed since the break started
    pub elapsed: f64,
}

impl Scte {
    /// Decodes the base64 cue payload into the raw splice_info_section.
    pub fn cue_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(self.cue.trim())
    }
}

/// Encryption parameters of an `EXT-X-KEY` tag.
///
/// Keys are shared through `Arc`. The encoder decides whether a segment
/// switches keys by handle identity (`Arc::ptr_eq`), not by comparing fields:
/// a value-equal copy of the default key is still written out as a new tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Key {
    /// `NONE`, `AES-128` or `SAMPLE-AES`
    pub method: String,
    /// Where the key is fetched from
    pub uri: String,
    /// Hex initialization vector, written unquoted
    pub iv: String,
    /// Key format; empty means `identity`
    pub keyformat: String,
    /// Slash-separated key format versions
    pub keyformatversions: String,
}

impl Key {
    /// Builds a key. Empty strings leave the attribute out.
    pub fn new(
        method: impl Into<String>,
        uri: impl Into<String>,
        iv: impl Into<String>,
        keyformat: impl Into<String>,
        keyformatversions: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            iv: iv.into(),
            keyformat: keyformat.into(),
            keyformatversions: keyformatversions.into(),
        }
    }

    pub(crate) fn required_version(&self) -> Option<u8> {
        if !self.keyformat.is_empty() || !self.keyformatversions.is_empty() {
            Some(VERSION_KEY_FORMAT)
        } else {
            None
        }
    }
}

/// Location of the Media Initialization Section (`EXT-X-MAP`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Map {
    /// Initialization section URI
    pub uri: String,
    /// Byte-range length; the range is omitted when zero
    pub limit: u64,
    /// Byte-range start
    pub offset: u64,
}

impl Map {
    /// Builds a map. A zero `limit` writes no `BYTERANGE`.
    pub fn new(uri: impl Into<String>, limit: u64, offset: u64) -> Self {
        Self {
            uri: uri.into(),
            limit,
            offset,
        }
    }
}

/// Vendor tags written by the Widevine Live Packager (`#WV-...`).
///
/// Zero numbers and empty strings are not written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Widevine {
    /// `#WV-AUDIO-CHANNELS`
    pub audio_channels: u32,
    /// `#WV-AUDIO-FORMAT`
    pub audio_format: u32,
    /// `#WV-AUDIO-PROFILE-IDC`
    pub audio_profile_idc: u32,
    /// `#WV-AUDIO-SAMPLE-SIZE`
    pub audio_sample_size: u32,
    /// `#WV-AUDIO-SAMPLING-FREQUENCY`
    pub audio_sampling_frequency: u32,
    /// `#WV-CYPHER-VERSION`
    pub cypher_version: String,
    /// `#WV-ECM`
    pub ecm: String,
    /// `#WV-VIDEO-FORMAT`
    pub video_format: u32,
    /// `#WV-VIDEO-FRAME-RATE`
    pub video_frame_rate: u32,
    /// `#WV-VIDEO-LEVEL-IDC`
    pub video_level_idc: u32,
    /// `#WV-VIDEO-PROFILE-IDC`
    pub video_profile_idc: u32,
    /// `#WV-VIDEO-RESOLUTION`
    pub video_resolution: String,
    /// `#WV-VIDEO-SAR`
    pub video_sar: String,
}

/// One media segment of a media playlist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaSegment {
    /// Media sequence number, assigned on append
    pub seq_id: u64,
    /// Optional second parameter of `EXTINF`
    pub title: String,
    /// Segment URI
    pub uri: String,
    /// Seconds; always kept as a float whatever the output mode
    pub duration: f64,
    /// `EXT-X-BYTERANGE` length, no tag when zero
    pub limit: u64,
    /// `EXT-X-BYTERANGE` start
    pub offset: u64,
    /// Key that applies from this segment on
    pub key: Option<Arc<Key>>,
    /// Initialization section; ignored on output under a playlist default
    pub map: Option<Arc<Map>>,
    /// Preceded by `EXT-X-DISCONTINUITY`
    pub discontinuity: bool,
    /// Ad-break cue
    pub scte: Option<Scte>,
    /// `EXT-X-PROGRAM-DATE-TIME`
    pub program_date_time: Option<DateTime<FixedOffset>>,
    /// Unrecognised `#EXT` lines written verbatim before the segment's own tags
    pub extra_tags: Vec<String>,
}

impl MediaSegment {
    /// Builds a segment with no key, map, range or cue.
    pub fn new(uri: impl Into<String>, title: impl Into<String>, duration: f64) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            duration,
            ..Default::default()
        }
    }
}

/// A media playlist a variant points at, shared with whoever keeps
/// appending to it.
pub type SharedMediaPlaylist = Arc<Mutex<MediaPlaylist>>;

/// One `EXT-X-MEDIA` rendition group entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alternative {
    /// `GROUP-ID`
    pub group_id: String,
    /// `URI`, omitted when empty
    pub uri: String,
    /// `TYPE`: `AUDIO`, `VIDEO`, `SUBTITLES` or `CLOSED-CAPTIONS`
    pub media_type: String,
    /// `LANGUAGE`
    pub language: String,
    /// `NAME`
    pub name: String,
    /// `DEFAULT`, always written
    pub default: bool,
    /// `AUTOSELECT`, omitted when `None`
    pub autoselect: Option<bool>,
    /// `FORCED`, omitted when `None`
    pub forced: Option<bool>,
    /// `CHARACTERISTICS`
    pub characteristics: String,
    /// `SUBTITLES`
    pub subtitles: String,
}

impl Alternative {
    /// Identity used to write each rendition group once per master playlist.
    pub fn dedup_key(&self) -> (&str, &str, &str, &str) {
        (&self.media_type, &self.group_id, &self.name, &self.language)
    }
}

/// Attributes of `EXT-X-STREAM-INF` / `EXT-X-I-FRAME-STREAM-INF`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantParams {
    /// `PROGRAM-ID`
    pub program_id: u32,
    /// `BANDWIDTH` in bits per second
    pub bandwidth: u32,
    /// `CODECS`
    pub codecs: String,
    /// `RESOLUTION`, e.g. `1280x720`
    pub resolution: String,
    /// `AUDIO` group reference
    pub audio: String,
    /// `VIDEO` group reference
    pub video: String,
    /// `SUBTITLES` group reference
    pub subtitles: String,
    /// `CLOSED-CAPTIONS` group reference or `NONE`
    pub captions: String,
    /// Non-standard Wowza/JWPlayer quality label
    pub name: String,
    /// Written as `EXT-X-I-FRAME-STREAM-INF`
    pub iframe: bool,
    /// Rendition groups written ahead of the variant
    pub alternatives: Vec<Alternative>,
}

/// A variant stream of a master playlist.
#[derive(Debug, Clone, Default)]
pub struct Variant {
    /// Media playlist URI
    pub uri: String,
    /// Not used for encoding, only for callers introspecting the rendition
    pub chunklist: Option<SharedMediaPlaylist>,
    /// Stream attributes
    pub params: VariantParams,
    /// Unrecognised `#EXT` lines written verbatim before the variant's own tags
    pub extra_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_version_is_monotonic() {
        let mut ver = 3;
        check_version(&mut ver, 5);
        assert_eq!(ver, 5);
        check_version(&mut ver, 4);
        assert_eq!(ver, 5);
    }

    #[test]
    fn test_key_required_version() {
        assert_eq!(Key::new("AES-128", "k", "", "", "").required_version(), None);
        assert_eq!(
            Key::new("AES-128", "k", "", "identity", "").required_version(),
            Some(VERSION_KEY_FORMAT)
        );
        assert_eq!(
            Key::new("AES-128", "k", "", "", "1").required_version(),
            Some(VERSION_KEY_FORMAT)
        );
    }

    #[test]
    fn test_scte_cue_bytes() {
        let scte = Scte {
            cue: "/DAlAAAAAAAAAP/wFAUAAAABf+/+ANgNkv4AFJlwAAEBAQAA5xULLA==".to_string(),
            ..Default::default()
        };
        let raw = scte.cue_bytes().unwrap();
        // splice_info_section table_id
        assert_eq!(raw[0], 0xfc);

        let bad = Scte {
            cue: "not base64!".to_string(),
            ..Default::default()
        };
        assert!(bad.cue_bytes().is_err());
    }

    #[test]
    fn test_alternative_dedup_key() {
        let alt = Alternative {
            media_type: "AUDIO".into(),
            group_id: "aac".into(),
            name: "English".into(),
            language: "en".into(),
            uri: "a.m3u8".into(),
            ..Default::default()
        };
        let mut other = alt.clone();
        other.uri = "b.m3u8".into();
        assert_eq!(alt.dedup_key(), other.dedup_key());
    }
}
