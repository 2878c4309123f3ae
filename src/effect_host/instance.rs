//! Effect instance
//!
//! `EffectInstance` is the live, host-side incarnation of one plugin: it
//! exclusively owns the parameter and clip instances it builds from the
//! plugin's descriptor, shares the backing knobs with the rest of the
//! application, and funnels every dispatch into plugin code through
//! `main_entry`.

use super::bridge::{ActionCallerGuard, HostContext};
use super::clip::{ClipInstance, UpstreamSource};
use super::descriptor::EffectDescriptor;
use super::hierarchy::attach_to_parents;
use super::params::{create_param, ParamInstance};
use super::plugin::EffectPlugin;
use super::preferences::EffectPrefs;
use super::types::*;
use crate::knob::SharedKnob;
use crate::project::Project;
use crate::ui::HostUi;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Parameter-edit grouping requested by the plugin. Only the bracket state
/// is tracked; command stacks live elsewhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamEditLevel {
    #[default]
    Off,
    /// The next parameter writes belong to one undo bracket
    OnCreateNewCommand,
}

/// A hosted effect: plugin, parameters, clips, and the services bridging
/// them
pub struct EffectInstance {
    descriptor: EffectDescriptor,
    plugin: Box<dyn EffectPlugin>,
    host: HostContext,
    params: Vec<ParamInstance>,
    knobs: Vec<SharedKnob>,
    pub(super) clips: BTreeMap<String, ClipInstance>,
    pub(super) effect_prefs: EffectPrefs,
    pub(super) prefs_dirty: bool,
    edit_level: ParamEditLevel,
}

impl std::fmt::Debug for EffectInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectInstance")
            .field("prefs_dirty", &self.prefs_dirty)
            .field("edit_level", &self.edit_level)
            .finish_non_exhaustive()
    }
}

impl EffectInstance {
    /// Instantiate a plugin: describe, build clips and parameters, resolve
    /// the parameter hierarchy, then run the create-instance action.
    ///
    /// Construction fails on malformed descriptors, unsupported or
    /// uninitializable parameters, and a failing create-instance action.
    pub fn new(
        plugin: Box<dyn EffectPlugin>,
        project: Arc<Project>,
        ui: Arc<dyn HostUi>,
        script_name: &str,
    ) -> HostResult<Self> {
        let descriptor = plugin.describe();
        descriptor.validate()?;

        let host = HostContext::new(project, ui, script_name, &descriptor.label);

        let mut clips = BTreeMap::new();
        for (index, clip_desc) in descriptor.clips.iter().enumerate() {
            clips.insert(
                clip_desc.name.clone(),
                ClipInstance::new(clip_desc.clone(), index),
            );
        }

        let mut params = Vec::new();
        let mut knobs = Vec::new();
        let mut edges = Vec::new();
        for param_desc in &descriptor.params {
            let (param, edge) = create_param(&param_desc.name, param_desc)?;
            knobs.push(param.knob().clone());
            if let Some(edge) = edge {
                edges.push(edge);
            }
            params.push(param);
        }
        attach_to_parents(&params, edges, &mut knobs);

        let mut instance = Self {
            descriptor,
            plugin,
            host,
            params,
            knobs,
            clips,
            effect_prefs: EffectPrefs::default(),
            prefs_dirty: true,
            edit_level: ParamEditLevel::default(),
        };

        let status = instance.main_entry(ACTION_CREATE_INSTANCE, None, None);
        if status != ActionStatus::Ok && status != ActionStatus::ReplyDefault {
            return Err(HostError::ActionFailed {
                action: ACTION_CREATE_INSTANCE.to_string(),
                status,
            });
        }
        Ok(instance)
    }

    /// Dispatch a named action into plugin code. The calling thread is
    /// marked as the action caller for the duration of the call, released
    /// on return or unwind. Status codes are relayed verbatim.
    pub fn main_entry(
        &mut self,
        action: &str,
        in_args: Option<&PropertySet>,
        out_args: Option<&mut PropertySet>,
    ) -> ActionStatus {
        let _guard = ActionCallerGuard::new();
        debug!(action, effect = %self.host.script_name(), "dispatching plugin action");
        self.plugin.action(&self.host, action, in_args, out_args)
    }

    /// Run the destroy-instance action; the node calls this before
    /// dropping the effect
    pub fn destroy(&mut self) -> ActionStatus {
        self.main_entry(ACTION_DESTROY_INSTANCE, None, None)
    }

    // ---- accessors --------------------------------------------------------

    pub fn descriptor(&self) -> &EffectDescriptor {
        &self.descriptor
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn script_name(&self) -> &str {
        self.host.script_name()
    }

    pub fn label(&self) -> &str {
        self.host.label()
    }

    pub fn params(&self) -> &[ParamInstance] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamInstance> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// All knobs of the effect, separators included
    pub fn knobs(&self) -> &[SharedKnob] {
        &self.knobs
    }

    pub fn knob(&self, name: &str) -> Option<SharedKnob> {
        self.knobs
            .iter()
            .find(|k| k.lock().unwrap().name() == name)
            .cloned()
    }

    pub fn clips(&self) -> &BTreeMap<String, ClipInstance> {
        &self.clips
    }

    pub fn clip(&self, name: &str) -> Option<&ClipInstance> {
        self.clips.get(name)
    }

    pub fn clip_mut(&mut self, name: &str) -> Option<&mut ClipInstance> {
        self.clips.get_mut(name)
    }

    // ---- connections ------------------------------------------------------

    /// Connect an upstream source to a clip. Invalidates the cached
    /// preferences.
    pub fn connect_clip(&mut self, name: &str, source: UpstreamSource) -> bool {
        match self.clips.get_mut(name) {
            Some(clip) => {
                clip.connect(source);
                self.prefs_dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn disconnect_clip(&mut self, name: &str) -> bool {
        match self.clips.get_mut(name) {
            Some(clip) => {
                clip.disconnect();
                self.prefs_dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn all_non_optional_clips_connected(&self) -> bool {
        !self
            .clips
            .values()
            .any(|clip| !clip.is_output() && !clip.is_optional() && !clip.is_connected())
    }

    // ---- clip fan-out -----------------------------------------------------

    pub fn set_clips_view(&mut self, view: i32) {
        for clip in self.clips.values_mut() {
            clip.set_rendered_view(view);
        }
    }

    pub fn discard_clips_view(&mut self) {
        for clip in self.clips.values_mut() {
            clip.discard_view();
        }
    }

    pub fn set_clips_mip_map_level(&mut self, level: u32) {
        for clip in self.clips.values_mut() {
            clip.set_mip_map_level(level);
        }
    }

    pub fn discard_clips_mip_map_level(&mut self) {
        for clip in self.clips.values_mut() {
            clip.discard_mip_map_level();
        }
    }

    // ---- capabilities -----------------------------------------------------

    /// The first clip advertising transform concatenation, if any. An
    /// output clip advertising it is a plugin logic fault and is
    /// conservatively rejected.
    pub fn can_apply_transform(&self) -> Option<&str> {
        for clip in self.clips.values() {
            if clip.can_transform() {
                if clip.is_output() {
                    warn!(
                        effect = %self.host.script_name(),
                        "output clip advertises transform capability"
                    );
                    return None;
                }
                return Some(clip.name());
            }
        }
        None
    }

    /// Fielding advertised when the plugin negotiates none
    pub fn default_output_fielding(&self) -> &'static str {
        FIELDING_NONE
    }

    // ---- preference cache -------------------------------------------------

    pub fn effect_preferences(&self) -> &EffectPrefs {
        &self.effect_prefs
    }

    pub fn preferences_dirty(&self) -> bool {
        self.prefs_dirty
    }

    pub fn mark_preferences_dirty(&mut self) {
        self.prefs_dirty = true;
    }

    // ---- edit scope -------------------------------------------------------

    /// The plugin begins a batch of parameter writes that should undo as
    /// one step
    pub fn edit_begin(&mut self, _name: &str) -> ActionStatus {
        self.edit_level = ParamEditLevel::OnCreateNewCommand;
        ActionStatus::Ok
    }

    pub fn edit_end(&mut self) -> ActionStatus {
        self.edit_level = ParamEditLevel::Off;
        ActionStatus::Ok
    }

    pub fn edit_level(&self) -> ParamEditLevel {
        self.edit_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_host::descriptor::{ClipDescriptor, ParamDescriptor, ParamKind};
    use crate::effect_host::mock_plugin::MockBlur;
    use crate::ui::HeadlessUi;

    fn make_test_instance() -> EffectInstance {
        EffectInstance::new(
            Box::new(MockBlur::new()),
            Arc::new(Project::new()),
            Arc::new(HeadlessUi),
            "blur1",
        )
        .unwrap()
    }

    fn make_test_source(pixel_aspect: f64, frame_rate: f64) -> UpstreamSource {
        UpstreamSource {
            pixel_aspect,
            frame_rate,
            components: COMPONENTS_RGBA.to_string(),
            bit_depth: BIT_DEPTH_FLOAT.to_string(),
        }
    }

    /// Minimal plugin whose descriptor the test controls
    struct ScriptedEffect {
        descriptor: EffectDescriptor,
    }

    impl EffectPlugin for ScriptedEffect {
        fn describe(&self) -> EffectDescriptor {
            self.descriptor.clone()
        }

        fn action(
            &mut self,
            _host: &HostContext,
            _action: &str,
            _in_args: Option<&PropertySet>,
            _out_args: Option<&mut PropertySet>,
        ) -> ActionStatus {
            ActionStatus::ReplyDefault
        }
    }

    #[test]
    fn test_construction_builds_knobs_and_clips() {
        let fx = make_test_instance();
        assert_eq!(fx.label(), "MockBlur");
        assert_eq!(fx.script_name(), "blur1");
        assert!(fx.param("size").is_some());
        assert!(fx.knob("size").is_some());
        assert!(fx.clip("Source").is_some());
        assert!(fx.clip("Output").is_some());
        assert!(fx.preferences_dirty());
    }

    #[test]
    fn test_unknown_knob_lookup() {
        let fx = make_test_instance();
        assert!(fx.param("absent").is_none());
        assert!(fx.knob("absent").is_none());
    }

    #[test]
    fn test_connection_tracking() {
        let mut fx = make_test_instance();
        assert!(!fx.all_non_optional_clips_connected());

        assert!(fx.connect_clip("Source", make_test_source(1.0, 24.0)));
        assert!(fx.all_non_optional_clips_connected());

        assert!(!fx.connect_clip("Ghost", make_test_source(1.0, 24.0)));
        assert!(fx.disconnect_clip("Source"));
        assert!(!fx.all_non_optional_clips_connected());
    }

    #[test]
    fn test_clip_fan_out_is_uniform() {
        let mut fx = make_test_instance();
        fx.set_clips_view(1);
        fx.set_clips_mip_map_level(2);
        assert!(fx
            .clips()
            .values()
            .all(|c| c.rendered_view() == Some(1) && c.mip_map_level() == 2));

        fx.discard_clips_view();
        fx.discard_clips_mip_map_level();
        assert!(fx
            .clips()
            .values()
            .all(|c| c.rendered_view().is_none() && c.mip_map_level() == 0));
    }

    #[test]
    fn test_can_apply_transform_selects_input() {
        let fx = make_test_instance();
        // MockBlur's Source clip advertises the capability
        assert_eq!(fx.can_apply_transform(), Some("Source"));
    }

    #[test]
    fn test_can_apply_transform_rejects_output_clip() {
        let descriptor = EffectDescriptor::new("photon.test.badclip", "BadClip")
            .clip(ClipDescriptor::source("Source"))
            .clip(ClipDescriptor::output().transforming());
        let fx = EffectInstance::new(
            Box::new(ScriptedEffect { descriptor }),
            Arc::new(Project::new()),
            Arc::new(HeadlessUi),
            "bad1",
        )
        .unwrap();
        assert_eq!(fx.can_apply_transform(), None);
    }

    #[test]
    fn test_construction_fails_on_bad_parametric_defaults() {
        use crate::knob::ParametricCurve;
        let descriptor = EffectDescriptor::new("photon.test.badcurve", "BadCurve")
            .param(ParamDescriptor::new(
                "falloff",
                ParamKind::Parametric {
                    curves: vec![ParametricCurve::new(vec![(0.5, 0.0)])],
                },
            ))
            .clip(ClipDescriptor::output());
        let err = EffectInstance::new(
            Box::new(ScriptedEffect { descriptor }),
            Arc::new(Project::new()),
            Arc::new(HeadlessUi),
            "bad2",
        )
        .unwrap_err();
        assert!(matches!(err, HostError::CurveInitialization(_)));
    }

    #[test]
    fn test_edit_scope_levels() {
        let mut fx = make_test_instance();
        assert_eq!(fx.edit_level(), ParamEditLevel::Off);
        assert_eq!(fx.edit_begin("tweak"), ActionStatus::Ok);
        assert_eq!(fx.edit_level(), ParamEditLevel::OnCreateNewCommand);
        assert_eq!(fx.edit_end(), ActionStatus::Ok);
        assert_eq!(fx.edit_level(), ParamEditLevel::Off);
    }

    #[test]
    fn test_destroy_dispatches() {
        let mut fx = make_test_instance();
        assert_eq!(fx.destroy(), ActionStatus::Ok);
    }

    #[test]
    fn test_default_output_fielding() {
        let fx = make_test_instance();
        assert_eq!(fx.default_output_fielding(), FIELDING_NONE);
    }
}
