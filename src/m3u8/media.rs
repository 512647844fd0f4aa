use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, FixedOffset};

use super::types::*;
use crate::config::{DEFAULT_DECODE_CAPACITY, MIN_VERSION};
use crate::error::{HlsError, Result};

/// A single-bitrate playlist backed by a fixed-capacity ring buffer.
///
/// `winsize` segments starting at the oldest live one are written on encode
/// (all of them when `winsize` is 0, as for VOD). Appending never grows the
/// buffer implicitly except through [`MediaPlaylist::append_with_auto_extend`].
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    /// Rendered as the ceiling integer
    pub target_duration: f64,
    /// `EXT-X-MEDIA-SEQUENCE`: sequence number of the oldest live segment
    pub seq_no: u64,
    /// Query string appended to every segment URI (`URI?args`)
    pub args: String,
    /// `EXT-X-I-FRAMES-ONLY`
    pub iframe: bool,
    /// VOD (closed) or live (sliding)
    pub closed: bool,
    /// `EXT-X-PLAYLIST-TYPE`
    pub media_type: Option<MediaType>,
    /// Default key written once in the header
    pub key: Option<Arc<Key>>,
    /// Default map; per-segment maps are not written while it is set
    pub map: Option<Arc<Map>>,
    /// Widevine packager metadata written after the header
    pub widevine: Option<Widevine>,
    pub(crate) segments: Vec<Option<MediaSegment>>,
    pub(crate) duration_as_int: bool,
    pub(crate) winsize: usize,
    pub(crate) capacity: usize,
    pub(crate) head: usize,
    pub(crate) tail: usize,
    pub(crate) count: usize,
    pub(crate) ver: u8,
    pub(crate) cache: Option<Bytes>,
}

impl MediaPlaylist {
    /// Creates an empty playlist showing `winsize` segments out of a buffer
    /// of `capacity` slots.
    pub fn new(winsize: usize, capacity: usize) -> Result<Self> {
        if winsize > capacity {
            return Err(HlsError::InvalidWindowSize { winsize, capacity });
        }
        Ok(Self {
            target_duration: 0.0,
            seq_no: 0,
            args: String::new(),
            iframe: false,
            closed: false,
            media_type: None,
            key: None,
            map: None,
            widevine: None,
            segments: vec![None; capacity],
            duration_as_int: false,
            winsize,
            capacity,
            head: 0,
            tail: 0,
            count: 0,
            ver: MIN_VERSION,
            cache: None,
        })
    }

    fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Slot of the most recently appended segment.
    fn last(&self) -> usize {
        if self.tail == 0 {
            self.capacity - 1
        } else {
            self.tail - 1
        }
    }

    /// Appends a segment at the tail.
    ///
    /// Returns `CapacityExceeded` without touching the playlist when the
    /// buffer is full; extend the capacity or remove old segments first.
    pub fn append(&mut self, mut segment: MediaSegment) -> Result<()> {
        if self.is_full() {
            return Err(HlsError::CapacityExceeded);
        }
        segment.seq_id = self.seq_no + self.count as u64;
        if self.target_duration < segment.duration {
            self.target_duration = segment.duration.ceil();
        }
        self.segments[self.tail] = Some(segment);
        self.tail = (self.tail + 1) % self.capacity;
        self.count += 1;
        self.cache = None;
        Ok(())
    }

    /// Appends a segment, doubling the capacity first once the buffer is
    /// more than two thirds full.
    pub fn append_with_auto_extend(&mut self, segment: MediaSegment) -> Result<()> {
        if self.count > self.capacity * 2 / 3 {
            self.extend_capacity()?;
        }
        self.append(segment)
    }

    /// Drops the oldest segment from the live window. The sequence number
    /// advances unless the playlist is closed.
    pub fn remove(&mut self) -> Result<()> {
        if self.count == 0 {
            return Err(HlsError::EmptyPlaylist);
        }
        self.head = (self.head + 1) % self.capacity;
        self.count -= 1;
        if !self.closed {
            self.seq_no += 1;
        }
        self.cache = None;
        Ok(())
    }

    /// Live-playlist step: removes the oldest segment once the window is
    /// full, then appends. Does nothing on a closed playlist.
    pub fn slide(&mut self, segment: MediaSegment) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.winsize > 0 && self.count >= self.winsize {
            self.remove()?;
        }
        self.append(segment)
    }

    /// Grows the buffer by `count` slots, which doubles it when full.
    ///
    /// The live window is moved to start at slot 0 so the tail lands right
    /// after it.
    pub fn extend_capacity(&mut self) -> Result<()> {
        if self.count == 0 {
            return Err(HlsError::InvalidState(
                "cannot extend the capacity of an empty playlist".into(),
            ));
        }
        if self.head != 0 {
            self.segments.rotate_left(self.head);
            self.head = 0;
        }
        let grown = self.segments.len() + self.count;
        self.segments.resize(grown, None);
        self.capacity = self.segments.len();
        self.tail = self.count;
        log::debug!("media playlist capacity extended to {}", self.capacity);
        self.cache = None;
        Ok(())
    }

    /// Makes room for one more segment while decoding: a zero-capacity
    /// playlist gets the default decode capacity, a full one is extended.
    pub(crate) fn ensure_room(&mut self) -> Result<()> {
        if !self.is_full() {
            return Ok(());
        }
        if self.count == 0 {
            self.segments = vec![None; DEFAULT_DECODE_CAPACITY];
            self.capacity = DEFAULT_DECODE_CAPACITY;
            self.head = 0;
            self.tail = 0;
            return Ok(());
        }
        self.extend_capacity()
    }

    /// Mutable access to the most recently appended segment. Invalidates
    /// the cached encoding.
    pub fn last_segment_mut(&mut self) -> Result<&mut MediaSegment> {
        if self.count == 0 {
            return Err(HlsError::EmptyPlaylist);
        }
        self.cache = None;
        let last = self.last();
        self.segments[last].as_mut().ok_or(HlsError::EmptyPlaylist)
    }

    /// Sets an encryption key on the last segment. Accepts a fresh [`Key`]
    /// or a handle already shared with other segments.
    pub fn set_key(&mut self, key: impl Into<Arc<Key>>) -> Result<()> {
        let key = key.into();
        let required = key.required_version();
        self.last_segment_mut()?.key = Some(key);
        if let Some(required) = required {
            check_version(&mut self.ver, required);
        }
        Ok(())
    }

    /// Sets the initialization section of the last segment.
    pub fn set_map(&mut self, map: impl Into<Arc<Map>>) -> Result<()> {
        self.last_segment_mut()?.map = Some(map.into());
        check_version(&mut self.ver, VERSION_MAP);
        Ok(())
    }

    /// Sets the byte range of the last segment.
    pub fn set_range(&mut self, limit: u64, offset: u64) -> Result<()> {
        let segment = self.last_segment_mut()?;
        segment.limit = limit;
        segment.offset = offset;
        check_version(&mut self.ver, VERSION_BYTE_RANGE);
        Ok(())
    }

    /// Attaches an ad-break cue to the last segment.
    pub fn set_scte35(&mut self, scte: Scte) -> Result<()> {
        self.last_segment_mut()?.scte = Some(scte);
        Ok(())
    }

    /// Marks a discontinuity before the last segment.
    pub fn set_discontinuity(&mut self) -> Result<()> {
        self.last_segment_mut()?.discontinuity = true;
        Ok(())
    }

    /// Sets the absolute date and time of the last segment's first sample.
    pub fn set_program_date_time(&mut self, value: DateTime<FixedOffset>) -> Result<()> {
        self.last_segment_mut()?.program_date_time = Some(value);
        Ok(())
    }

    /// Sets the key written once in the header for the whole playlist.
    pub fn set_default_key(&mut self, key: impl Into<Arc<Key>>) {
        let key = key.into();
        if let Some(required) = key.required_version() {
            check_version(&mut self.ver, required);
        }
        self.key = Some(key);
        self.cache = None;
    }

    /// Sets the map written once in the header for the whole playlist.
    pub fn set_default_map(&mut self, map: impl Into<Arc<Map>>) {
        check_version(&mut self.ver, VERSION_MAP);
        self.map = Some(map.into());
        self.cache = None;
    }

    /// Marks every segment as a single I-frame.
    pub fn set_iframe_only(&mut self) {
        check_version(&mut self.ver, VERSION_IFRAMES_ONLY);
        self.iframe = true;
        self.cache = None;
    }

    /// Writes `EXTINF` durations as ceiling integers instead of 3-decimal
    /// floats (some old Android players choke on floats).
    pub fn duration_as_int(&mut self, yes: bool) {
        if yes {
            check_version(&mut self.ver, VERSION_INTEGER_DURATIONS);
        }
        self.duration_as_int = yes;
        self.cache = None;
    }

    /// Marks the playlist as VOD. An already cached encoding gets the
    /// end-list tag appended instead of being rebuilt.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Some(cached) = self.cache.take() {
            let mut buf = BytesMut::with_capacity(cached.len() + 15);
            buf.put_slice(&cached);
            buf.put_slice(b"#EXT-X-ENDLIST\n");
            self.cache = Some(buf.freeze());
        }
        self.closed = true;
    }

    /// Number of live segments.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of slots in the ring buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of segments written on encode, 0 for all.
    pub fn win_size(&self) -> usize {
        self.winsize
    }

    /// Changes the window size; it may not exceed the capacity.
    pub fn set_win_size(&mut self, winsize: usize) -> Result<()> {
        if winsize > self.capacity {
            return Err(HlsError::InvalidWindowSize {
                winsize,
                capacity: self.capacity,
            });
        }
        self.winsize = winsize;
        self.cache = None;
        Ok(())
    }

    /// Protocol version written in `EXT-X-VERSION`.
    pub fn version(&self) -> u8 {
        self.ver
    }

    /// Overrides the negotiated version, lower values included. Later
    /// setters may raise it again.
    pub fn set_version(&mut self, ver: u8) {
        self.ver = ver;
        self.cache = None;
    }

    /// Whether durations are written as integers.
    pub fn is_duration_as_int(&self) -> bool {
        self.duration_as_int
    }

    /// Forces the next `encode` to rebuild the output. Needed after mutating
    /// public fields or segments directly.
    pub fn reset_cache(&mut self) {
        self.cache = None;
    }

    /// The `i`-th live segment counting from the oldest.
    pub fn get(&self, i: usize) -> Option<&MediaSegment> {
        if i >= self.count {
            return None;
        }
        self.segments[(self.head + i) % self.capacity].as_ref()
    }

    /// Live segments, oldest first.
    pub fn segments(&self) -> impl Iterator<Item = &MediaSegment> + '_ {
        (0..self.count).filter_map(move |i| self.segments[(self.head + i) % self.capacity].as_ref())
    }
}
