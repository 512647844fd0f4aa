use bytes::Bytes;

use super::types::*;
use crate::config::MIN_VERSION;

/// A playlist of variant streams, each pointing at a media playlist.
#[derive(Debug, Clone)]
pub struct MasterPlaylist {
    /// Variant streams in output order
    pub variants: Vec<Variant>,
    /// Query string appended to every variant URI
    pub args: String,
    pub(crate) ver: u8,
    pub(crate) cache: Option<Bytes>,
}

impl MasterPlaylist {
    /// Creates an empty master playlist at the minimum version.
    pub fn new() -> Self {
        Self {
            variants: Vec::new(),
            args: String::new(),
            ver: MIN_VERSION,
            cache: None,
        }
    }

    /// Adds a variant. `chunklist` is kept for introspection only; encoding
    /// uses `uri` and `params`.
    pub fn append(
        &mut self,
        uri: impl Into<String>,
        chunklist: Option<SharedMediaPlaylist>,
        params: VariantParams,
    ) {
        self.push_variant(Variant {
            uri: uri.into(),
            chunklist,
            params,
            extra_tags: Vec::new(),
        });
    }

    pub(crate) fn push_variant(&mut self, variant: Variant) {
        if !variant.params.alternatives.is_empty() {
            // EXT-X-MEDIA is backward compatible to version 1 but older
            // clients may not play it well
            check_version(&mut self.ver, VERSION_ALTERNATIVES);
        }
        self.variants.push(variant);
        self.cache = None;
    }

    /// Protocol version written in `EXT-X-VERSION`.
    pub fn version(&self) -> u8 {
        self.ver
    }

    /// Overrides the negotiated version, lower values included.
    pub fn set_version(&mut self, ver: u8) {
        self.ver = ver;
        self.cache = None;
    }

    /// Forces the next `encode` to rebuild the output.
    pub fn reset_cache(&mut self) {
        self.cache = None;
    }
}

impl Default for MasterPlaylist {
    fn default() -> Self {
        Self::new()
    }
}
