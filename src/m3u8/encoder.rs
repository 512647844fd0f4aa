use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::master::MasterPlaylist;
use super::media::MediaPlaylist;
use super::types::*;
use crate::error::Result;
use crate::utils::{format_date_time, format_duration, format_float, yes_no};

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
}

fn put_line(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(b'\n');
}

/// Writes `,NAME="value"`.
fn put_quoted(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_u8(b',');
    put_str(buf, name);
    put_str(buf, "=\"");
    put_str(buf, value);
    buf.put_u8(b'"');
}

/// Writes `,NAME="value"` unless `value` is empty.
fn put_quoted_opt(buf: &mut BytesMut, name: &str, value: &str) {
    if !value.is_empty() {
        put_quoted(buf, name, value);
    }
}

fn put_header(buf: &mut BytesMut, ver: u8) {
    put_str(buf, "#EXTM3U\n#EXT-X-VERSION:");
    put_line(buf, &ver.to_string());
}

fn put_key(buf: &mut BytesMut, key: &Key) {
    put_str(buf, "#EXT-X-KEY:METHOD=");
    put_str(buf, &key.method);
    if key.method != "NONE" {
        put_quoted(buf, "URI", &key.uri);
        if !key.iv.is_empty() {
            put_str(buf, ",IV=");
            put_str(buf, &key.iv);
        }
        put_quoted_opt(buf, "KEYFORMAT", &key.keyformat);
        put_quoted_opt(buf, "KEYFORMATVERSIONS", &key.keyformatversions);
    }
    buf.put_u8(b'\n');
}

fn put_map(buf: &mut BytesMut, map: &Map) {
    put_str(buf, "#EXT-X-MAP:URI=\"");
    put_str(buf, &map.uri);
    buf.put_u8(b'"');
    if map.limit > 0 {
        put_str(buf, &format!(",BYTERANGE={}@{}", map.limit, map.offset));
    }
    buf.put_u8(b'\n');
}

fn put_widevine(buf: &mut BytesMut, wv: &Widevine) {
    let numbers = [
        ("#WV-AUDIO-CHANNELS", wv.audio_channels),
        ("#WV-AUDIO-FORMAT", wv.audio_format),
        ("#WV-AUDIO-PROFILE-IDC", wv.audio_profile_idc),
        ("#WV-AUDIO-SAMPLE-SIZE", wv.audio_sample_size),
        ("#WV-AUDIO-SAMPLING-FREQUENCY", wv.audio_sampling_frequency),
    ];
    for (tag, value) in numbers {
        if value != 0 {
            put_line(buf, &format!("{} {}", tag, value));
        }
    }
    for (tag, value) in [("#WV-CYPHER-VERSION", &wv.cypher_version), ("#WV-ECM", &wv.ecm)] {
        if !value.is_empty() {
            put_line(buf, &format!("{} {}", tag, value));
        }
    }
    let numbers = [
        ("#WV-VIDEO-FORMAT", wv.video_format),
        ("#WV-VIDEO-FRAME-RATE", wv.video_frame_rate),
        ("#WV-VIDEO-LEVEL-IDC", wv.video_level_idc),
        ("#WV-VIDEO-PROFILE-IDC", wv.video_profile_idc),
    ];
    for (tag, value) in numbers {
        if value != 0 {
            put_line(buf, &format!("{} {}", tag, value));
        }
    }
    for (tag, value) in [
        ("#WV-VIDEO-RESOLUTION", &wv.video_resolution),
        ("#WV-VIDEO-SAR", &wv.video_sar),
    ] {
        if !value.is_empty() {
            put_line(buf, &format!("{} {}", tag, value));
        }
    }
}

fn put_scte(buf: &mut BytesMut, scte: &Scte) {
    match scte.syntax {
        Scte35Syntax::Syntax672014 => {
            put_str(buf, "#EXT-SCTE35:CUE=\"");
            put_str(buf, &scte.cue);
            buf.put_u8(b'"');
            put_quoted_opt(buf, "ID", &scte.id);
            if scte.time != 0.0 {
                put_str(buf, ",TIME=");
                put_str(buf, &format_float(scte.time));
            }
            buf.put_u8(b'\n');
        }
        Scte35Syntax::Oatcls => match scte.cue_type {
            CueType::Start => {
                put_str(buf, "#EXT-OATCLS-SCTE35:");
                put_line(buf, &scte.cue);
                put_str(buf, "#EXT-X-CUE-OUT:");
                put_line(buf, &format_float(scte.time));
            }
            CueType::Mid => {
                put_line(
                    buf,
                    &format!(
                        "#EXT-X-CUE-OUT-CONT:ElapsedTime={},Duration={},SCTE35={}",
                        format_float(scte.elapsed),
                        format_float(scte.time),
                        scte.cue
                    ),
                );
            }
            CueType::End => put_line(buf, "#EXT-X-CUE-IN"),
        },
    }
}

fn put_alternative(buf: &mut BytesMut, alt: &Alternative) {
    put_str(buf, "#EXT-X-MEDIA:");
    if !alt.media_type.is_empty() {
        // TYPE is an enumerated string, never quoted
        put_str(buf, "TYPE=");
        put_str(buf, &alt.media_type);
    }
    put_quoted_opt(buf, "GROUP-ID", &alt.group_id);
    put_quoted_opt(buf, "NAME", &alt.name);
    put_str(buf, ",DEFAULT=");
    put_str(buf, yes_no(alt.default));
    if let Some(autoselect) = alt.autoselect {
        put_str(buf, ",AUTOSELECT=");
        put_str(buf, yes_no(autoselect));
    }
    put_quoted_opt(buf, "LANGUAGE", &alt.language);
    if let Some(forced) = alt.forced {
        put_quoted(buf, "FORCED", yes_no(forced));
    }
    put_quoted_opt(buf, "CHARACTERISTICS", &alt.characteristics);
    put_quoted_opt(buf, "SUBTITLES", &alt.subtitles);
    put_quoted_opt(buf, "URI", &alt.uri);
    buf.put_u8(b'\n');
}

fn put_stream_inf_prefix(buf: &mut BytesMut, tag: &str, params: &VariantParams) {
    put_str(
        buf,
        &format!("{}:PROGRAM-ID={},BANDWIDTH={}", tag, params.program_id, params.bandwidth),
    );
    put_quoted_opt(buf, "CODECS", &params.codecs);
    if !params.resolution.is_empty() {
        put_str(buf, ",RESOLUTION=");
        put_str(buf, &params.resolution);
    }
}

fn put_variant(buf: &mut BytesMut, variant: &Variant, args: &str) {
    let params = &variant.params;
    if params.iframe {
        put_stream_inf_prefix(buf, "#EXT-X-I-FRAME-STREAM-INF", params);
        put_quoted_opt(buf, "VIDEO", &params.video);
        put_quoted_opt(buf, "URI", &variant.uri);
        buf.put_u8(b'\n');
        return;
    }

    put_stream_inf_prefix(buf, "#EXT-X-STREAM-INF", params);
    put_quoted_opt(buf, "AUDIO", &params.audio);
    put_quoted_opt(buf, "VIDEO", &params.video);
    if !params.captions.is_empty() {
        if params.captions == "NONE" {
            put_str(buf, ",CLOSED-CAPTIONS=NONE");
        } else {
            put_quoted(buf, "CLOSED-CAPTIONS", &params.captions);
        }
    }
    put_quoted_opt(buf, "SUBTITLES", &params.subtitles);
    put_quoted_opt(buf, "NAME", &params.name);
    buf.put_u8(b'\n');

    put_str(buf, &variant.uri);
    if !args.is_empty() {
        buf.put_u8(if variant.uri.contains('?') { b'&' } else { b'?' });
        put_str(buf, args);
    }
    buf.put_u8(b'\n');
}

impl MediaPlaylist {
    /// Builds the manifest text from scratch, ignoring the cache.
    pub(crate) fn render(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(256 + self.count * 64);

        put_header(&mut buf, self.ver);
        if let Some(key) = &self.key {
            put_key(&mut buf, key);
        }
        if let Some(map) = &self.map {
            put_map(&mut buf, map);
        }
        match self.media_type {
            Some(MediaType::Event) => {
                put_str(&mut buf, "#EXT-X-PLAYLIST-TYPE:EVENT\n#EXT-X-ALLOW-CACHE:NO\n")
            }
            Some(MediaType::Vod) => put_str(&mut buf, "#EXT-X-PLAYLIST-TYPE:VOD\n"),
            None => {}
        }
        put_line(&mut buf, &format!("#EXT-X-MEDIA-SEQUENCE:{}", self.seq_no));
        // EXT-X-TARGETDURATION must be an integer
        put_line(
            &mut buf,
            &format!("#EXT-X-TARGETDURATION:{}", self.target_duration.ceil() as i64),
        );
        if self.iframe {
            put_str(&mut buf, "#EXT-X-I-FRAMES-ONLY\n");
        }
        if let Some(wv) = &self.widevine {
            put_widevine(&mut buf, wv);
        }

        let mut durations: HashMap<u64, String> = HashMap::new();
        let mut head = self.head;
        let mut remaining = self.count;
        let mut shown = 0;
        while (self.winsize == 0 || shown < self.winsize) && remaining > 0 {
            let slot = &self.segments[head];
            head = (head + 1) % self.capacity;
            remaining -= 1;
            let Some(seg) = slot else {
                continue;
            };
            shown += 1;

            for tag in &seg.extra_tags {
                put_line(&mut buf, tag);
            }
            if let Some(scte) = &seg.scte {
                put_scte(&mut buf, scte);
            }
            if let Some(key) = &seg.key {
                let is_default = self
                    .key
                    .as_ref()
                    .is_some_and(|default| Arc::ptr_eq(default, key));
                if !is_default {
                    put_key(&mut buf, key);
                }
            }
            if seg.discontinuity {
                put_str(&mut buf, "#EXT-X-DISCONTINUITY\n");
            }
            if self.map.is_none() {
                if let Some(map) = &seg.map {
                    put_map(&mut buf, map);
                }
            }
            if let Some(pdt) = &seg.program_date_time {
                put_str(&mut buf, "#EXT-X-PROGRAM-DATE-TIME:");
                put_line(&mut buf, &format_date_time(pdt));
            }
            if seg.limit > 0 {
                put_line(
                    &mut buf,
                    &format!("#EXT-X-BYTERANGE:{}@{}", seg.limit, seg.offset),
                );
            }

            put_str(&mut buf, "#EXTINF:");
            let as_int = self.duration_as_int;
            let duration = durations
                .entry(seg.duration.to_bits())
                .or_insert_with(|| format_duration(seg.duration, as_int));
            put_str(&mut buf, duration);
            buf.put_u8(b',');
            put_line(&mut buf, &seg.title);

            put_str(&mut buf, &seg.uri);
            if !self.args.is_empty() {
                buf.put_u8(b'?');
                put_str(&mut buf, &self.args);
            }
            buf.put_u8(b'\n');
        }

        if self.closed {
            put_str(&mut buf, "#EXT-X-ENDLIST\n");
        }
        buf
    }

    /// Returns the manifest text, rendering it only if nothing is cached.
    pub fn encode(&mut self) -> Bytes {
        if let Some(cached) = &self.cache {
            log::trace!("media playlist served from cache");
            return cached.clone();
        }
        let out = self.render().freeze();
        self.cache = Some(out.clone());
        out
    }

    /// Encodes the playlist into an async writer.
    pub async fn write_to<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> Result<()> {
        let out = self.encode();
        writer.write_all(&out).await?;
        writer.flush().await?;
        Ok(())
    }
}

impl MasterPlaylist {
    pub(crate) fn render(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(128 + self.variants.len() * 160);
        put_header(&mut buf, self.ver);

        let mut written = HashSet::new();
        for variant in &self.variants {
            for tag in &variant.extra_tags {
                put_line(&mut buf, tag);
            }
            for alt in &variant.params.alternatives {
                if written.insert(alt.dedup_key()) {
                    put_alternative(&mut buf, alt);
                }
            }
            put_variant(&mut buf, variant, &self.args);
        }
        buf
    }

    /// Returns the manifest text, rendering it only if nothing is cached.
    pub fn encode(&mut self) -> Bytes {
        if let Some(cached) = &self.cache {
            log::trace!("master playlist served from cache");
            return cached.clone();
        }
        let out = self.render().freeze();
        self.cache = Some(out.clone());
        out
    }

    /// Encodes the playlist into an async writer.
    pub async fn write_to<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> Result<()> {
        let out = self.encode();
        writer.write_all(&out).await?;
        writer.flush().await?;
        Ok(())
    }
}

fn write_cached_or(
    f: &mut fmt::Formatter<'_>,
    cache: &Option<Bytes>,
    render: impl FnOnce() -> BytesMut,
) -> fmt::Result {
    match cache {
        Some(cached) => f.write_str(&String::from_utf8_lossy(cached)),
        None => f.write_str(&String::from_utf8_lossy(&render())),
    }
}

impl fmt::Display for MediaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_cached_or(f, &self.cache, || self.render())
    }
}

impl fmt::Display for MasterPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_cached_or(f, &self.cache, || self.render())
    }
}
