use std::io::BufRead;
use std::mem;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::master::MasterPlaylist;
use super::media::MediaPlaylist;
use super::types::*;
use crate::error::{HlsError, Result};
use crate::utils::{parse_attributes, parse_date_time, parse_yes_no, Attribute};

/// One classified input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    /// `#EXT...` directive; `value` is whatever follows the first `:`
    Tag { name: &'a str, value: Option<&'a str> },
    /// `#WV-NAME value` Widevine packager line
    Widevine { name: &'a str, value: &'a str },
    Comment,
    Uri(&'a str),
}

impl<'a> Line<'a> {
    /// Lines that may sit between `#EXTM3U` and the playlist-wide tags
    /// without ending the header.
    fn keeps_header(&self) -> bool {
        matches!(
            self,
            Line::Blank
                | Line::Comment
                | Line::Tag {
                    name: "#EXTM3U" | "#EXT-X-VERSION" | "#EXT-X-KEY" | "#EXT-X-MAP",
                    ..
                }
        )
    }

    fn classify(line: &'a str) -> Self {
        if line.is_empty() {
            Line::Blank
        } else if line.starts_with("#EXT") {
            match line.split_once(':') {
                Some((name, value)) => Line::Tag {
                    name,
                    value: Some(value),
                },
                None => Line::Tag { name: line, value: None },
            }
        } else if line.starts_with("#WV-") {
            let (name, value) = line.split_once(' ').unwrap_or((line, ""));
            Line::Widevine {
                name,
                value: value.trim(),
            }
        } else if line.starts_with('#') {
            Line::Comment
        } else {
            Line::Uri(line)
        }
    }
}

/// Tags seen since the last segment URI.
#[derive(Debug, Default)]
struct PendingSegment {
    has_inf: bool,
    duration: f64,
    title: String,
    limit: u64,
    offset: u64,
    discontinuity: bool,
    program_date_time: Option<DateTime<FixedOffset>>,
    scte: Option<Scte>,
    key: Option<Arc<Key>>,
    map: Option<Arc<Map>>,
}

/// Line-driven state machine filling either a master or a media playlist.
///
/// The first type-determining tag fixes the playlist kind; tags of the other
/// kind after that are rejected. Per-item tags accumulate until the next URI
/// line, which flushes them into a segment or a variant.
pub(crate) struct Decoder<'a> {
    strict: bool,
    list_type: Option<ListType>,
    m3u: bool,
    version: Option<u8>,
    /// Still between `#EXTM3U` and the first segment-scoped or listing tag.
    in_header: bool,
    master: &'a mut MasterPlaylist,
    media: &'a mut MediaPlaylist,
    segment: PendingSegment,
    variant: Option<Variant>,
    alternatives: Vec<Alternative>,
    extra_tags: Vec<String>,
}

fn parse_number<T: FromStr>(line: &str, value: &str, what: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HlsError::malformed(line, format!("invalid {} {:?}", what, value)))
}

fn tag_value<'v>(line: &str, value: Option<&'v str>) -> Result<&'v str> {
    value.ok_or_else(|| HlsError::malformed(line, "missing tag value"))
}

fn tag_attributes<'v>(line: &str, value: Option<&'v str>) -> Result<Vec<Attribute<'v>>> {
    let value = tag_value(line, value)?;
    parse_attributes(value).map_err(|err| match err {
        HlsError::MalformedTag { reason, .. } => HlsError::malformed(line, reason),
        other => other,
    })
}

/// Parses `<length>[@<offset>]`.
fn parse_byte_range(line: &str, value: &str) -> Result<(u64, u64)> {
    match value.split_once('@') {
        Some((limit, offset)) => Ok((
            parse_number(line, limit, "byte-range length")?,
            parse_number(line, offset, "byte-range offset")?,
        )),
        None => Ok((parse_number(line, value, "byte-range length")?, 0)),
    }
}

fn parse_flag(line: &str, value: &str, what: &str) -> Result<bool> {
    parse_yes_no(value)
        .ok_or_else(|| HlsError::malformed(line, format!("{} must be YES or NO", what)))
}

fn variant_params(line: &str, attrs: &[Attribute<'_>], params: &mut VariantParams) -> Result<()> {
    for attr in attrs {
        match attr.name {
            "PROGRAM-ID" => params.program_id = parse_number(line, attr.value, "program id")?,
            "BANDWIDTH" => params.bandwidth = parse_number(line, attr.value, "bandwidth")?,
            "CODECS" => params.codecs = attr.value.to_string(),
            "RESOLUTION" => params.resolution = attr.value.to_string(),
            "AUDIO" => params.audio = attr.value.to_string(),
            "VIDEO" => params.video = attr.value.to_string(),
            "SUBTITLES" => params.subtitles = attr.value.to_string(),
            "CLOSED-CAPTIONS" => params.captions = attr.value.to_string(),
            "NAME" => params.name = attr.value.to_string(),
            "URI" => {}
            other => log::debug!("ignoring variant attribute {}", other),
        }
    }
    Ok(())
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(
        master: &'a mut MasterPlaylist,
        media: &'a mut MediaPlaylist,
        list_type: Option<ListType>,
        strict: bool,
    ) -> Self {
        Self {
            strict,
            list_type,
            m3u: false,
            version: None,
            in_header: true,
            master,
            media,
            segment: PendingSegment::default(),
            variant: None,
            alternatives: Vec::new(),
            extra_tags: Vec::new(),
        }
    }

    /// Feeds one line. In lenient mode malformed and out-of-place lines are
    /// logged and skipped.
    pub(crate) fn feed(&mut self, line: &str) -> Result<()> {
        match self.handle_line(line.trim()) {
            Err(err @ (HlsError::MalformedTag { .. } | HlsError::MixedPlaylist(_)))
                if !self.strict =>
            {
                log::warn!("skipping line: {}", err);
                Ok(())
            }
            other => other,
        }
    }

    pub(crate) fn read_lines<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for line in reader.lines() {
            self.feed(&line?)?;
        }
        Ok(())
    }

    pub(crate) async fn read_lines_async<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<()> {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            self.feed(&line)?;
        }
        Ok(())
    }

    /// Resolves the playlist kind and applies the declared version.
    pub(crate) fn finish(self) -> Result<ListType> {
        if self.strict && !self.m3u {
            return Err(HlsError::MissingHeader);
        }
        let list_type = self.list_type.ok_or(HlsError::UnknownPlaylistType)?;
        if self.segment.has_inf || self.variant.is_some() {
            log::debug!("input ended before the URI of the last item");
        }
        if !self.extra_tags.is_empty() {
            log::debug!("dropping {} trailing unknown tags", self.extra_tags.len());
        }

        match list_type {
            ListType::Media => {
                if let Some(ver) = self.version {
                    self.media.ver = ver;
                }
                self.media.cache = None;
                log::debug!("decoded media playlist with {} segments", self.media.count());
            }
            ListType::Master => {
                if let Some(ver) = self.version {
                    self.master.ver = ver;
                }
                self.master.cache = None;
                log::debug!(
                    "decoded master playlist with {} variants",
                    self.master.variants.len()
                );
            }
        }
        Ok(list_type)
    }

    /// Fixes the playlist kind on the first type-determining line.
    fn claim(&mut self, line: &str, list_type: ListType) -> Result<()> {
        match self.list_type {
            None => {
                self.list_type = Some(list_type);
                Ok(())
            }
            Some(current) if current == list_type => Ok(()),
            Some(current) => Err(HlsError::MixedPlaylist(format!(
                "{} line in a {} playlist: {}",
                list_type, current, line
            ))),
        }
    }

    fn handle_line(&mut self, line: &str) -> Result<()> {
        let line_kind = Line::classify(line);
        if !line_kind.keeps_header() {
            self.in_header = false;
        }
        match line_kind {
            Line::Blank | Line::Comment => Ok(()),
            Line::Uri(uri) => self.handle_uri(uri),
            Line::Widevine { name, value } => self.handle_widevine(line, name, value),
            Line::Tag { name, value } => self.handle_tag(line, name, value),
        }
    }

    fn handle_uri(&mut self, uri: &str) -> Result<()> {
        match self.list_type {
            Some(ListType::Media) => self.flush_segment(uri),
            Some(ListType::Master) => self.flush_variant(uri),
            None => Err(HlsError::malformed(uri, "URI before any playlist tag")),
        }
    }

    fn flush_segment(&mut self, uri: &str) -> Result<()> {
        if !self.segment.has_inf {
            return Err(HlsError::malformed(uri, "URI without preceding #EXTINF"));
        }
        let pending = mem::take(&mut self.segment);

        if pending.limit > 0 {
            check_version(&mut self.media.ver, VERSION_BYTE_RANGE);
        }
        if pending.map.is_some() {
            check_version(&mut self.media.ver, VERSION_MAP);
        }
        if let Some(required) = pending.key.as_ref().and_then(|key| key.required_version()) {
            check_version(&mut self.media.ver, required);
        }

        let segment = MediaSegment {
            seq_id: 0,
            title: pending.title,
            uri: uri.to_string(),
            duration: pending.duration,
            limit: pending.limit,
            offset: pending.offset,
            key: pending.key,
            map: pending.map,
            discontinuity: pending.discontinuity,
            scte: pending.scte,
            program_date_time: pending.program_date_time,
            extra_tags: mem::take(&mut self.extra_tags),
        };
        self.media.ensure_room()?;
        self.media.append(segment)?;
        Ok(())
    }

    fn flush_variant(&mut self, uri: &str) -> Result<()> {
        let mut variant = self
            .variant
            .take()
            .ok_or_else(|| HlsError::malformed(uri, "URI without preceding #EXT-X-STREAM-INF"))?;
        variant.uri = uri.to_string();
        self.master.push_variant(variant);
        Ok(())
    }

    fn handle_widevine(&mut self, line: &str, name: &str, value: &str) -> Result<()> {
        self.claim(line, ListType::Media)?;
        const KNOWN: &[&str] = &[
            "#WV-AUDIO-CHANNELS",
            "#WV-AUDIO-FORMAT",
            "#WV-AUDIO-PROFILE-IDC",
            "#WV-AUDIO-SAMPLE-SIZE",
            "#WV-AUDIO-SAMPLING-FREQUENCY",
            "#WV-CYPHER-VERSION",
            "#WV-ECM",
            "#WV-VIDEO-FORMAT",
            "#WV-VIDEO-FRAME-RATE",
            "#WV-VIDEO-LEVEL-IDC",
            "#WV-VIDEO-PROFILE-IDC",
            "#WV-VIDEO-RESOLUTION",
            "#WV-VIDEO-SAR",
        ];
        if !KNOWN.contains(&name) {
            log::debug!("passing through unknown Widevine line {:?}", line);
            self.extra_tags.push(line.to_string());
            return Ok(());
        }

        let number = |what| parse_number::<u32>(line, value, what);
        let wv = self.media.widevine.get_or_insert_with(Default::default);
        match name {
            "#WV-AUDIO-CHANNELS" => wv.audio_channels = number("audio channels")?,
            "#WV-AUDIO-FORMAT" => wv.audio_format = number("audio format")?,
            "#WV-AUDIO-PROFILE-IDC" => wv.audio_profile_idc = number("audio profile")?,
            "#WV-AUDIO-SAMPLE-SIZE" => wv.audio_sample_size = number("sample size")?,
            "#WV-AUDIO-SAMPLING-FREQUENCY" => {
                wv.audio_sampling_frequency = number("sampling frequency")?
            }
            "#WV-CYPHER-VERSION" => wv.cypher_version = value.to_string(),
            "#WV-ECM" => wv.ecm = value.to_string(),
            "#WV-VIDEO-FORMAT" => wv.video_format = number("video format")?,
            "#WV-VIDEO-FRAME-RATE" => wv.video_frame_rate = number("frame rate")?,
            "#WV-VIDEO-LEVEL-IDC" => wv.video_level_idc = number("video level")?,
            "#WV-VIDEO-PROFILE-IDC" => wv.video_profile_idc = number("video profile")?,
            "#WV-VIDEO-RESOLUTION" => wv.video_resolution = value.to_string(),
            _ => wv.video_sar = value.to_string(),
        }
        Ok(())
    }

    fn handle_tag(&mut self, line: &str, name: &str, value: Option<&str>) -> Result<()> {
        match name {
            "#EXTM3U" => {
                self.m3u = true;
                Ok(())
            }
            "#EXT-X-VERSION" => {
                self.version = Some(parse_number(line, tag_value(line, value)?, "version")?);
                Ok(())
            }

            "#EXT-X-STREAM-INF" => self.stream_inf(line, value),
            "#EXT-X-I-FRAME-STREAM-INF" => self.iframe_stream_inf(line, value),
            "#EXT-X-MEDIA" => self.media_tag(line, value),

            "#EXT-X-TARGETDURATION" => {
                let target = parse_number(line, tag_value(line, value)?, "target duration")?;
                self.claim(line, ListType::Media)?;
                self.media.target_duration = target;
                Ok(())
            }
            "#EXT-X-MEDIA-SEQUENCE" => {
                let seq_no = parse_number(line, tag_value(line, value)?, "media sequence")?;
                self.claim(line, ListType::Media)?;
                self.media.seq_no = seq_no;
                Ok(())
            }
            "#EXT-X-PLAYLIST-TYPE" => {
                let media_type = match tag_value(line, value)?.trim() {
                    "EVENT" => MediaType::Event,
                    "VOD" => MediaType::Vod,
                    other => {
                        return Err(HlsError::malformed(
                            line,
                            format!("unknown playlist type {:?}", other),
                        ))
                    }
                };
                self.claim(line, ListType::Media)?;
                self.media.media_type = Some(media_type);
                Ok(())
            }
            // regenerated from the playlist type on encode
            "#EXT-X-ALLOW-CACHE" => self.claim(line, ListType::Media),
            "#EXT-X-I-FRAMES-ONLY" => {
                self.claim(line, ListType::Media)?;
                self.media.set_iframe_only();
                Ok(())
            }
            "#EXT-X-ENDLIST" => {
                self.claim(line, ListType::Media)?;
                self.media.closed = true;
                Ok(())
            }
            "#EXT-X-KEY" => self.key_tag(line, value),
            "#EXT-X-MAP" => self.map_tag(line, value),
            "#EXT-X-PROGRAM-DATE-TIME" => {
                let raw = tag_value(line, value)?.trim();
                let pdt = parse_date_time(raw)
                    .map_err(|err| HlsError::malformed(line, err.to_string()))?;
                self.claim(line, ListType::Media)?;
                self.segment.program_date_time = Some(pdt);
                Ok(())
            }
            "#EXT-X-BYTERANGE" => {
                let (limit, offset) = parse_byte_range(line, tag_value(line, value)?.trim())?;
                self.claim(line, ListType::Media)?;
                self.segment.limit = limit;
                self.segment.offset = offset;
                Ok(())
            }
            "#EXT-X-DISCONTINUITY" => {
                self.claim(line, ListType::Media)?;
                self.segment.discontinuity = true;
                Ok(())
            }
            "#EXTINF" => self.inf_tag(line, value),

            "#EXT-SCTE35" => self.scte35_tag(line, value),
            "#EXT-OATCLS-SCTE35" => {
                let cue = tag_value(line, value)?.trim();
                self.claim(line, ListType::Media)?;
                self.segment.scte = Some(Scte {
                    syntax: Scte35Syntax::Oatcls,
                    cue_type: CueType::Start,
                    cue: cue.to_string(),
                    ..Default::default()
                });
                Ok(())
            }
            "#EXT-X-CUE-OUT" => self.cue_out_tag(line, value),
            "#EXT-X-CUE-OUT-CONT" => self.cue_out_cont_tag(line, value),
            "#EXT-X-CUE-IN" => {
                self.claim(line, ListType::Media)?;
                self.segment.scte = Some(Scte {
                    syntax: Scte35Syntax::Oatcls,
                    cue_type: CueType::End,
                    ..Default::default()
                });
                Ok(())
            }

            _ => {
                log::debug!("passing through unknown tag {:?}", line);
                self.extra_tags.push(line.to_string());
                Ok(())
            }
        }
    }

    fn inf_tag(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        if self.segment.has_inf {
            return Err(HlsError::malformed(line, "second #EXTINF before segment URI"));
        }
        let value = tag_value(line, value)?;
        let (duration, title) = match value.split_once(',') {
            Some((duration, title)) => (duration, title),
            None if self.strict => {
                return Err(HlsError::malformed(line, "missing ',' after duration"))
            }
            None => (value, ""),
        };
        let duration = if duration.trim().is_empty() {
            0.0
        } else {
            parse_number(line, duration, "duration")?
        };

        self.claim(line, ListType::Media)?;
        self.segment.has_inf = true;
        self.segment.duration = duration;
        self.segment.title = title.to_string();
        Ok(())
    }

    fn key_tag(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        let mut key = Key::default();
        let mut has_method = false;
        for attr in tag_attributes(line, value)? {
            match attr.name {
                "METHOD" => {
                    key.method = attr.value.to_string();
                    has_method = true;
                }
                "URI" => key.uri = attr.value.to_string(),
                "IV" => key.iv = attr.value.to_string(),
                "KEYFORMAT" => key.keyformat = attr.value.to_string(),
                "KEYFORMATVERSIONS" => key.keyformatversions = attr.value.to_string(),
                _ => {}
            }
        }
        if !has_method {
            return Err(HlsError::malformed(line, "missing METHOD attribute"));
        }
        self.claim(line, ListType::Media)?;

        let key = Arc::new(key);
        // a header key is the playlist default, shared with the first segment
        // so it is not written twice
        if self.in_header {
            self.media.set_default_key(key.clone());
        }
        self.segment.key = Some(key);
        Ok(())
    }

    fn map_tag(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        let mut map = Map::default();
        let mut has_uri = false;
        for attr in tag_attributes(line, value)? {
            match attr.name {
                "URI" => {
                    map.uri = attr.value.to_string();
                    has_uri = true;
                }
                "BYTERANGE" => {
                    let (limit, offset) = parse_byte_range(line, attr.value)?;
                    map.limit = limit;
                    map.offset = offset;
                }
                _ => {}
            }
        }
        if !has_uri {
            return Err(HlsError::malformed(line, "missing URI attribute"));
        }
        self.claim(line, ListType::Media)?;

        let map = Arc::new(map);
        if self.in_header {
            self.media.set_default_map(map.clone());
        }
        self.segment.map = Some(map);
        Ok(())
    }

    fn scte35_tag(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        let mut scte = Scte {
            syntax: Scte35Syntax::Syntax672014,
            ..Default::default()
        };
        for attr in tag_attributes(line, value)? {
            match attr.name {
                "CUE" => scte.cue = attr.value.to_string(),
                "ID" => scte.id = attr.value.to_string(),
                "TIME" => scte.time = parse_number(line, attr.value, "cue time")?,
                _ => {}
            }
        }
        self.claim(line, ListType::Media)?;
        self.segment.scte = Some(scte);
        Ok(())
    }

    fn cue_out_tag(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        self.claim(line, ListType::Media)?;
        match (&mut self.segment.scte, value) {
            (Some(scte), Some(value))
                if scte.syntax == Scte35Syntax::Oatcls && scte.cue_type == CueType::Start =>
            {
                scte.time = parse_number(line, value, "cue-out duration")?;
            }
            // a bare cue-out without its OATCLS payload is kept verbatim
            _ => self.extra_tags.push(line.to_string()),
        }
        Ok(())
    }

    fn cue_out_cont_tag(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        let mut scte = Scte {
            syntax: Scte35Syntax::Oatcls,
            cue_type: CueType::Mid,
            ..Default::default()
        };
        for attr in tag_attributes(line, value)? {
            match attr.name {
                "SCTE35" => scte.cue = attr.value.to_string(),
                "Duration" => scte.time = parse_number(line, attr.value, "cue duration")?,
                "ElapsedTime" => scte.elapsed = parse_number(line, attr.value, "elapsed time")?,
                _ => {}
            }
        }
        self.claim(line, ListType::Media)?;
        self.segment.scte = Some(scte);
        Ok(())
    }

    fn media_tag(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        let mut alt = Alternative::default();
        for attr in tag_attributes(line, value)? {
            match attr.name {
                "TYPE" => alt.media_type = attr.value.to_string(),
                "GROUP-ID" => alt.group_id = attr.value.to_string(),
                "LANGUAGE" => alt.language = attr.value.to_string(),
                "NAME" => alt.name = attr.value.to_string(),
                "DEFAULT" => alt.default = parse_flag(line, attr.value, "DEFAULT")?,
                "AUTOSELECT" => alt.autoselect = Some(parse_flag(line, attr.value, "AUTOSELECT")?),
                "FORCED" => alt.forced = Some(parse_flag(line, attr.value, "FORCED")?),
                "CHARACTERISTICS" => alt.characteristics = attr.value.to_string(),
                "SUBTITLES" => alt.subtitles = attr.value.to_string(),
                "URI" => alt.uri = attr.value.to_string(),
                _ => {}
            }
        }
        self.claim(line, ListType::Master)?;
        self.alternatives.push(alt);
        Ok(())
    }

    fn stream_inf(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        if self.variant.is_some() {
            return Err(HlsError::malformed(line, "previous #EXT-X-STREAM-INF has no URI"));
        }
        let attrs = tag_attributes(line, value)?;
        let mut params = VariantParams::default();
        variant_params(line, &attrs, &mut params)?;
        self.claim(line, ListType::Master)?;

        params.alternatives = mem::take(&mut self.alternatives);
        self.variant = Some(Variant {
            uri: String::new(),
            chunklist: None,
            params,
            extra_tags: mem::take(&mut self.extra_tags),
        });
        Ok(())
    }

    fn iframe_stream_inf(&mut self, line: &str, value: Option<&str>) -> Result<()> {
        let attrs = tag_attributes(line, value)?;
        let mut params = VariantParams {
            iframe: true,
            ..Default::default()
        };
        variant_params(line, &attrs, &mut params)?;
        let uri = attrs
            .iter()
            .find(|attr| attr.name == "URI")
            .map(|attr| attr.value.to_string())
            .unwrap_or_default();
        self.claim(line, ListType::Master)?;

        params.alternatives = mem::take(&mut self.alternatives);
        self.master.push_variant(Variant {
            uri,
            chunklist: None,
            params,
            extra_tags: mem::take(&mut self.extra_tags),
        });
        Ok(())
    }
}

impl MediaPlaylist {
    /// Decodes manifest text into this playlist, keeping its window size.
    pub fn decode(&mut self, data: &[u8], strict: bool) -> Result<()> {
        self.decode_from(data, strict)
    }

    /// Decodes a line-oriented reader into this playlist. Master playlist
    /// tags are rejected.
    pub fn decode_from<R: BufRead>(&mut self, reader: R, strict: bool) -> Result<()> {
        let mut master = MasterPlaylist::new();
        let mut decoder = Decoder::new(&mut master, self, Some(ListType::Media), strict);
        decoder.read_lines(reader)?;
        decoder.finish().map(|_| ())
    }
}

impl MasterPlaylist {
    /// Decodes manifest text into this playlist.
    pub fn decode(&mut self, data: &[u8], strict: bool) -> Result<()> {
        self.decode_from(data, strict)
    }

    /// Decodes a line-oriented reader into this playlist. Media playlist
    /// tags are rejected.
    pub fn decode_from<R: BufRead>(&mut self, reader: R, strict: bool) -> Result<()> {
        let mut media = MediaPlaylist::new(0, 0)?;
        let mut decoder = Decoder::new(self, &mut media, Some(ListType::Master), strict);
        decoder.read_lines(reader)?;
        decoder.finish().map(|_| ())
    }
}
