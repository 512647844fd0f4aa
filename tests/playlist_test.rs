#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tokio::fs::File;
    use tokio::io::BufReader;

    use hlsio::config::DecodeOptions;
    use hlsio::error::HlsError;
    use hlsio::m3u8::{
        decode, decode_from, decode_from_async, decode_with, CueType, Key, ListType, Manifest, Map,
        MasterPlaylist, MediaPlaylist, MediaSegment, Playlist, Scte35Syntax,
    };

    const OATCLS: &str = include_str!("fixtures/media-playlist-with-oatcls-scte35.m3u8");
    const DISCONTINUITY: &str = include_str!("fixtures/media-playlist-with-discontinuity.m3u8");
    const SCTE35: &str = include_str!("fixtures/media-playlist-with-scte35.m3u8");
    const KEYS_AND_MAP: &str = include_str!("fixtures/media-playlist-with-keys-and-map.m3u8");
    const SEGMENT_KEYS_AND_MAPS: &str =
        include_str!("fixtures/media-playlist-with-segment-keys-and-maps.m3u8");
    const VENDOR_TAGS: &str = include_str!("fixtures/media-playlist-with-vendor-tags.m3u8");
    const MASTER: &str = include_str!("fixtures/master-playlist.m3u8");

    const CUE: &str = "/DAlAAAAAAAAAP/wFAUAAAABf+/+ANgNkv4AFJlwAAEBAQAA5xULLA==";

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    fn media(data: &str, strict: bool) -> MediaPlaylist {
        decode(data.as_bytes(), strict)
            .unwrap()
            .into_media()
            .expect("media playlist")
    }

    fn encoded(p: &mut impl Playlist) -> String {
        String::from_utf8(p.encode().to_vec()).unwrap()
    }

    #[test]
    fn test_decode_oatcls_scte35() {
        let mut p = media(OATCLS, true);
        assert_eq!(p.count(), 3);
        assert_eq!(p.target_duration, 10.0);

        let first = p.get(0).unwrap().scte.clone().unwrap();
        assert_eq!(first.syntax, Scte35Syntax::Oatcls);
        assert_eq!(first.cue_type, CueType::Start);
        assert_eq!(first.cue, CUE);
        assert_eq!(first.time, 15.0);
        assert_eq!(first.cue_bytes().unwrap()[0], 0xfc);

        let mid = p.get(1).unwrap().scte.clone().unwrap();
        assert_eq!(mid.cue_type, CueType::Mid);
        assert_eq!(mid.elapsed, 8.844);
        assert_eq!(mid.time, 15.0);

        assert_eq!(
            p.get(2).unwrap().scte.as_ref().unwrap().cue_type,
            CueType::End
        );

        assert_eq!(encoded(&mut p), OATCLS);
    }

    #[test]
    fn test_decode_discontinuity_as_int() {
        let mut p = media(DISCONTINUITY, true);
        assert!(p.get(2).unwrap().discontinuity);
        p.duration_as_int(true);
        assert_eq!(
            encoded(&mut p),
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-TARGETDURATION:10\n\
             #EXTINF:10,\nad0.ts\n#EXTINF:8,\nad1.ts\n#EXT-X-DISCONTINUITY\n\
             #EXTINF:10,\nmovieA.ts\n#EXTINF:10,\nmovieB.ts\n"
        );
    }

    #[test]
    fn test_round_trip_fixtures() {
        for data in [OATCLS, SCTE35, KEYS_AND_MAP, SEGMENT_KEYS_AND_MAPS] {
            let mut p = media(data, true);
            assert_eq!(encoded(&mut p), data);
        }

        let mut m = decode(MASTER.as_bytes(), true)
            .unwrap()
            .into_master()
            .expect("master playlist");
        assert_eq!(encoded(&mut m), MASTER);
    }

    #[test]
    fn test_decode_segment_keys_and_maps() {
        let p = media(SEGMENT_KEYS_AND_MAPS, true);
        assert!(p.key.is_none());
        assert!(p.map.is_none());

        let first = p.get(0).unwrap();
        assert_eq!(first.key.as_ref().unwrap().iv, "0x01");
        assert_eq!(first.map.as_ref().unwrap().uri, "init1.mp4");
        assert!(p.get(1).unwrap().key.is_none());
        assert!(p.get(1).unwrap().map.is_none());

        let last = p.get(2).unwrap();
        assert_eq!(last.key.as_ref().unwrap().uri, "https://example.com/key2");
        let map = last.map.as_ref().unwrap();
        assert_eq!((map.uri.as_str(), map.limit, map.offset), ("init2.mp4", 512, 0));
    }

    #[test]
    fn test_segment_keys_and_maps_survive_re_encoding() {
        let mut p = MediaPlaylist::new(0, 4).unwrap();
        p.append(MediaSegment::new("a.m4s", "", 4.0)).unwrap();
        p.set_key(Key::new("AES-128", "k1", "", "", "")).unwrap();
        p.set_map(Map::new("init1.mp4", 0, 0)).unwrap();
        p.append(MediaSegment::new("b.m4s", "", 4.0)).unwrap();
        p.set_map(Map::new("init2.mp4", 0, 0)).unwrap();
        let first = encoded(&mut p);
        assert!(first.contains("#EXT-X-MAP:URI=\"init2.mp4\"\n#EXTINF:4.000,\nb.m4s\n"));

        let mut decoded = media(&first, true);
        assert_eq!(encoded(&mut decoded), first);
    }

    #[test]
    fn test_decode_keys_and_map() {
        let p = media(KEYS_AND_MAP, true);
        assert_eq!(p.version(), 5);
        assert!(p.closed);
        assert_eq!(p.seq_no, 1);
        assert_eq!(p.get(0).unwrap().seq_id, 1);

        let default_map = p.map.as_ref().unwrap();
        assert_eq!(default_map.uri, "init.mp4");
        assert_eq!((default_map.limit, default_map.offset), (720, 0));
        assert_eq!(p.key.as_ref().unwrap().iv, "0x1234");

        let last = p.get(2).unwrap();
        assert_eq!(last.key.as_ref().unwrap().method, "NONE");
        assert_eq!((last.limit, last.offset), (1000, 200));
        assert_eq!(last.title, "title");
        assert_eq!(
            last.program_date_time.unwrap().timestamp_subsec_millis(),
            500
        );
    }

    #[test]
    fn test_decode_master() {
        let m = decode(MASTER.as_bytes(), true)
            .unwrap()
            .into_master()
            .unwrap();
        assert_eq!(m.version(), 4);
        assert_eq!(m.variants.len(), 3);

        let low = &m.variants[0];
        assert_eq!(low.uri, "low/index.m3u8");
        assert_eq!(low.params.codecs, "avc1.42c015,mp4a.40.2");
        assert_eq!(low.params.captions, "NONE");
        assert_eq!(low.params.alternatives.len(), 2);
        assert_eq!(low.params.alternatives[1].language, "de");
        assert_eq!(low.params.alternatives[1].autoselect, Some(true));
        assert!(!low.params.alternatives[1].default);

        assert_eq!(m.variants[1].params.name, "HD 720p");
        assert!(m.variants[2].params.iframe);
        assert_eq!(m.variants[2].uri, "low/iframes.m3u8");
    }

    #[test]
    fn test_vendor_tags_pass_through() {
        assert!(matches!(
            decode(VENDOR_TAGS.as_bytes(), true),
            Err(HlsError::MalformedTag { .. })
        ));

        let mut p = media(VENDOR_TAGS, false);
        assert_eq!(p.count(), 3);
        assert_eq!(p.get(2).unwrap().seq_id, 102);
        assert_eq!(
            encoded(&mut p),
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-MEDIA-SEQUENCE:100\n#EXT-X-TARGETDURATION:4\n\
             #EXT-X-DISCONTINUITY-SEQUENCE:2\n#EXTINF:4.000,\nlive100.ts\n\
             #EXT-X-GAP\n#EXTINF:4.000,\nlive101.ts\n\
             #EXTINF:3.500,\nlive102.ts\n"
        );

        // the re-encoded form is stable
        let again = encoded(&mut media(&encoded(&mut p), true));
        assert_eq!(again, encoded(&mut p));
    }

    #[test]
    fn test_missing_header() {
        let data = "#EXT-X-TARGETDURATION:4\n#EXTINF:4.000,\na.ts\n";
        assert!(matches!(
            decode(data.as_bytes(), true),
            Err(HlsError::MissingHeader)
        ));
        assert_eq!(media(data, false).count(), 1);
    }

    #[test]
    fn test_unknown_playlist_type() {
        for strict in [true, false] {
            assert!(matches!(
                decode(b"#EXTM3U\n", strict),
                Err(HlsError::UnknownPlaylistType)
            ));
        }
    }

    #[test]
    fn test_mixed_playlist() {
        let data = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-STREAM-INF:BANDWIDTH=1\nx.m3u8\n\
                    #EXTINF:10.000,\na.ts\n";
        assert!(matches!(
            decode(data.as_bytes(), true),
            Err(HlsError::MixedPlaylist(_))
        ));

        let p = media(data, false);
        assert_eq!(p.count(), 1);
        assert_eq!(p.get(0).unwrap().uri, "a.ts");
    }

    #[test]
    fn test_malformed_tags() {
        let cases = [
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:abc,\na.ts\n",
            "#EXTM3U\n#EXT-X-TARGETDURATION:ten\n",
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-KEY:URI=\"k\"\n",
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-KEY:METHOD=AES-128,URI=\"k\n",
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-PLAYLIST-TYPE:LIVE\n",
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-PROGRAM-DATE-TIME:yesterday\n",
            "#EXTM3U\n#EXT-X-TARGETDURATION:10\na.ts\n",
            "#EXTM3U\n#EXT-X-MEDIA:TYPE=AUDIO,DEFAULT=MAYBE\n",
        ];
        for data in cases {
            let result = decode(data.as_bytes(), true);
            assert!(
                matches!(result, Err(HlsError::MalformedTag { .. })),
                "strict decode of {:?} gave {:?}",
                data,
                result
            );
        }

        // lenient decoding skips the broken lines
        let p = media(cases[0], false);
        assert_eq!(p.count(), 0);
        let p = media(cases[4], false);
        assert!(p.media_type.is_none());
    }

    #[test]
    fn test_comments_and_blank_lines_are_ignored() {
        let data = "#EXTM3U\n\n# a comment\n  #EXT-X-TARGETDURATION:4  \r\n#EXTINF:4.000,\r\n a.ts \n";
        let p = media(data, true);
        assert_eq!(p.count(), 1);
        assert_eq!(p.get(0).unwrap().uri, "a.ts");
        assert!(p.get(0).unwrap().extra_tags.is_empty());
    }

    #[test]
    fn test_decode_with_small_capacity() {
        let mut source = MediaPlaylist::new(0, 3000).unwrap();
        for i in 0..3000 {
            source
                .append(MediaSegment::new(format!("segment{}.ts", i), "", 6.006))
                .unwrap();
        }
        source.close();
        let expected = encoded(&mut source);

        let options = DecodeOptions::strict().with_capacity(16);
        let mut p = decode_with(expected.as_bytes(), &options)
            .unwrap()
            .into_media()
            .unwrap();
        assert_eq!(p.count(), 3000);
        assert_eq!(encoded(&mut p), expected);
    }

    #[test]
    fn test_decode_into_existing_playlist() {
        let mut p = MediaPlaylist::new(2, 50).unwrap();
        p.decode(DISCONTINUITY.as_bytes(), true).unwrap();
        assert_eq!(p.count(), 4);
        assert_eq!(p.win_size(), 2);
        assert!(!encoded(&mut p).contains("movieA.ts"));

        let mut p = MediaPlaylist::new(0, 8).unwrap();
        assert!(matches!(
            p.decode(MASTER.as_bytes(), true),
            Err(HlsError::MixedPlaylist(_))
        ));

        let mut m = MasterPlaylist::new();
        Playlist::decode(&mut m, MASTER.as_bytes(), true).unwrap();
        assert_eq!(m.variants.len(), 3);
    }

    #[test]
    fn test_decode_from_reader() {
        let file = std::fs::File::open(fixture_path("master-playlist.m3u8")).unwrap();
        let manifest = decode_from(std::io::BufReader::new(file), true).unwrap();
        assert_eq!(manifest.list_type(), ListType::Master);
        assert!(manifest.as_media().is_none());
        assert_eq!(manifest.to_string(), MASTER);
    }

    #[tokio::test]
    async fn test_decode_from_async_file() {
        let file = File::open(fixture_path("media-playlist-with-scte35.m3u8"))
            .await
            .unwrap();
        let mut manifest = decode_from_async(BufReader::new(file), &DecodeOptions::strict())
            .await
            .unwrap();
        assert_eq!(manifest.list_type(), ListType::Media);
        assert_eq!(&manifest.encode()[..], SCTE35.as_bytes());
    }

    #[tokio::test]
    async fn test_write_to_file_and_decode_back() {
        let path = std::env::temp_dir().join(format!("hlsio-{}.m3u8", std::process::id()));
        let mut p = media(KEYS_AND_MAP, true);
        {
            let mut file = File::create(&path).await.unwrap();
            p.write_to(&mut file).await.unwrap();
        }

        let file = File::open(&path).await.unwrap();
        let manifest = decode_from_async(BufReader::new(file), &DecodeOptions::default())
            .await
            .unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        match manifest {
            Manifest::Media(mut decoded) => assert_eq!(encoded(&mut decoded), KEYS_AND_MAP),
            Manifest::Master(_) => panic!("expected a media playlist"),
        }
    }
}
