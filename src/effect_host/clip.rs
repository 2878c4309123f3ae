//! Live clip instances
//!
//! One `ClipInstance` per clip the effect declared, created at
//! instantiation and destroyed with the effect. Tracks connection state,
//! the rendered view, the mip-map level, and the preferences computed by
//! negotiation.

use super::descriptor::ClipDescriptor;
use super::preferences::ClipPrefs;
use super::types::PropertyError;

/// What the upstream node connected to a clip delivers
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamSource {
    pub pixel_aspect: f64,
    pub frame_rate: f64,
    pub components: String,
    pub bit_depth: String,
}

/// A live image input/output port of an effect
#[derive(Clone, Debug)]
pub struct ClipInstance {
    descriptor: ClipDescriptor,
    index: usize,
    connection: Option<UpstreamSource>,
    rendered_view: Option<i32>,
    mip_map_level: u32,
    prefs: Option<ClipPrefs>,
}

impl ClipInstance {
    pub fn new(descriptor: ClipDescriptor, index: usize) -> Self {
        Self {
            descriptor,
            index,
            connection: None,
            rendered_view: None,
            mip_map_level: 0,
            prefs: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_output(&self) -> bool {
        self.descriptor.is_output
    }

    pub fn is_optional(&self) -> bool {
        self.descriptor.optional
    }

    pub fn can_transform(&self) -> bool {
        self.descriptor.can_transform
    }

    pub fn descriptor(&self) -> &ClipDescriptor {
        &self.descriptor
    }

    // ---- connection -------------------------------------------------------

    pub fn connect(&mut self, source: UpstreamSource) {
        self.connection = Some(source);
    }

    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn source(&self) -> Option<&UpstreamSource> {
        self.connection.as_ref()
    }

    /// Pixel aspect ratio seen through this clip: negotiated preference
    /// first, then the upstream source, then square pixels
    pub fn pixel_aspect(&self) -> f64 {
        if let Some(prefs) = &self.prefs {
            return prefs.pixel_aspect;
        }
        self.connection
            .as_ref()
            .map(|s| s.pixel_aspect)
            .unwrap_or(1.0)
    }

    // ---- per-clip render state --------------------------------------------

    pub fn set_rendered_view(&mut self, view: i32) {
        self.rendered_view = Some(view);
    }

    pub fn discard_view(&mut self) {
        self.rendered_view = None;
    }

    pub fn rendered_view(&self) -> Option<i32> {
        self.rendered_view
    }

    pub fn set_mip_map_level(&mut self, level: u32) {
        self.mip_map_level = level;
    }

    pub fn discard_mip_map_level(&mut self) {
        self.mip_map_level = 0;
    }

    pub fn mip_map_level(&self) -> u32 {
        self.mip_map_level
    }

    // ---- preferences ------------------------------------------------------

    pub fn set_preferences(&mut self, prefs: ClipPrefs) {
        self.prefs = Some(prefs);
    }

    pub fn preferences(&self) -> Option<&ClipPrefs> {
        self.prefs.as_ref()
    }

    /// Most preferred component layout, for the negotiation defaults.
    /// A descriptor listing none is a property-lookup fault.
    pub fn preferred_components(&self) -> Result<&str, PropertyError> {
        self.descriptor
            .supported_components
            .first()
            .map(String::as_str)
            .ok_or_else(|| PropertyError::NotFound(format!("{}:components", self.name())))
    }

    /// Most preferred bit depth, for the negotiation defaults
    pub fn preferred_bit_depth(&self) -> Result<&str, PropertyError> {
        self.descriptor
            .supported_bit_depths
            .first()
            .map(String::as_str)
            .ok_or_else(|| PropertyError::NotFound(format!("{}:bit depth", self.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_host::types::{BIT_DEPTH_FLOAT, COMPONENTS_RGBA};

    fn make_test_source() -> UpstreamSource {
        UpstreamSource {
            pixel_aspect: 2.0,
            frame_rate: 25.0,
            components: COMPONENTS_RGBA.to_string(),
            bit_depth: BIT_DEPTH_FLOAT.to_string(),
        }
    }

    #[test]
    fn test_connection_state() {
        let mut clip = ClipInstance::new(ClipDescriptor::source("Source"), 0);
        assert!(!clip.is_connected());
        assert_eq!(clip.pixel_aspect(), 1.0);

        clip.connect(make_test_source());
        assert!(clip.is_connected());
        assert_eq!(clip.pixel_aspect(), 2.0);
        assert_eq!(clip.source().unwrap().frame_rate, 25.0);

        clip.disconnect();
        assert!(!clip.is_connected());
    }

    #[test]
    fn test_negotiated_preferences_win() {
        let mut clip = ClipInstance::new(ClipDescriptor::source("Source"), 0);
        clip.connect(make_test_source());
        clip.set_preferences(ClipPrefs {
            bit_depth: BIT_DEPTH_FLOAT.to_string(),
            components: COMPONENTS_RGBA.to_string(),
            pixel_aspect: 1.5,
        });
        assert_eq!(clip.pixel_aspect(), 1.5);
    }

    #[test]
    fn test_view_and_mip_level_discard() {
        let mut clip = ClipInstance::new(ClipDescriptor::output(), 1);
        clip.set_rendered_view(1);
        clip.set_mip_map_level(3);
        assert_eq!(clip.rendered_view(), Some(1));
        assert_eq!(clip.mip_map_level(), 3);

        clip.discard_view();
        clip.discard_mip_map_level();
        assert_eq!(clip.rendered_view(), None);
        assert_eq!(clip.mip_map_level(), 0);
    }

    #[test]
    fn test_preferred_components_fault_when_unlisted() {
        let descriptor = ClipDescriptor::source("Source").with_components(Vec::new());
        let clip = ClipInstance::new(descriptor, 0);
        assert!(clip.preferred_components().is_err());
        assert_eq!(clip.preferred_bit_depth().unwrap(), BIT_DEPTH_FLOAT);
    }
}
