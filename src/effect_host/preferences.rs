//! Clip Preference Negotiation
//!
//! Asks the plugin what it wants from each clip (bit depth, component
//! layout, pixel aspect ratio) and from the effect as a whole (frame rate,
//! fielding, premultiplication, sampling behaviour). Negotiation is
//! all-or-nothing: a failing preference action leaves every clip untouched.
//!
//! Inputs that disagree on pixel aspect ratio or frame rate are an
//! upstream wiring error the adapter cannot resolve; it warns persistently
//! on the effect and falls back to the first connected input's values.

use super::instance::EffectInstance;
use super::types::*;
use std::collections::HashMap;
use tracing::warn;

/// Preferences negotiated for one clip
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipPrefs {
    pub bit_depth: String,
    pub components: String,
    pub pixel_aspect: f64,
}

/// Preferences negotiated for the effect as a whole
#[derive(Clone, Debug, PartialEq)]
pub struct EffectPrefs {
    pub frame_rate: f64,
    pub fielding: String,
    pub premult: String,
    /// Whether the effect can sample at non-integer frames
    pub continuous_samples: bool,
    /// Whether the output changes frame to frame even with static inputs
    pub frame_varying: bool,
}

impl Default for EffectPrefs {
    fn default() -> Self {
        Self {
            frame_rate: 24.0,
            fielding: FIELDING_NONE.to_string(),
            premult: PREMULT_PREMULTIPLIED.to_string(),
            continuous_samples: false,
            frame_varying: false,
        }
    }
}

/// Persistent warning attached when inputs disagree on pixel aspect ratio
pub const WARN_PIXEL_ASPECT_MISMATCH: &str =
    "This node has several input clips with different pixel aspect ratios, which it cannot handle.";

/// Persistent warning attached when inputs disagree on frame rate
pub const WARN_FRAME_RATE_MISMATCH: &str =
    "This node has several input clips with different frame rates, which it cannot handle.";

/// Persistent warning attached when inputs disagree on both
pub const WARN_PIXEL_ASPECT_AND_FRAME_RATE_MISMATCH: &str =
    "This node has several input clips with different pixel aspect ratios and different frame rates, which it cannot handle.";

impl EffectInstance {
    /// Seed the negotiation out-arguments with per-clip and effect-level
    /// defaults. Fails with a property-lookup fault when a clip cannot be
    /// enumerated (no supported components or bit depths).
    fn setup_clip_preferences_args(&self, out: &mut PropertySet) -> Result<(), PropertyError> {
        for (name, clip) in self.clips() {
            let components = clip.preferred_components()?.to_string();
            let bit_depth = clip.preferred_bit_depth()?.to_string();
            out.set_string(&clip_scoped_key(PROP_CLIP_COMPONENTS, name), &components);
            out.set_string(&clip_scoped_key(PROP_CLIP_BIT_DEPTH, name), &bit_depth);
            out.set_double(
                &clip_scoped_key(PROP_CLIP_PIXEL_ASPECT, name),
                clip.pixel_aspect(),
            );
        }
        out.set_double(PROP_EFFECT_FRAME_RATE, self.host().frame_rate());
        out.set_string(PROP_EFFECT_FIELDING, FIELDING_NONE);
        out.set_string(PROP_EFFECT_PREMULT, PREMULT_PREMULTIPLIED);
        out.set_int(PROP_EFFECT_CONTINUOUS, 0);
        out.set_int(PROP_EFFECT_FRAME_VARYING, 0);
        Ok(())
    }

    /// Run the plugin's preference action and extract the results.
    ///
    /// Fills `out_clip_prefs` (keyed by clip name) and `out_effect_prefs`
    /// and returns `true` on success, marking the cached preferences
    /// clean. Returns `false` without touching any clip state when the
    /// plugin reports anything other than OK or use-defaults.
    pub fn negotiate_preferences(
        &mut self,
        out_clip_prefs: &mut HashMap<String, ClipPrefs>,
        out_effect_prefs: &mut EffectPrefs,
    ) -> bool {
        // One representative pixel aspect ratio and frame rate across the
        // connected inputs; disagreement is flagged per dimension.
        let mut input_par = 1.0;
        let mut input_par_set = false;
        let mut par_conflict = false;
        let mut input_rate = self.effect_prefs.frame_rate;
        let mut input_rate_set = false;
        let mut rate_conflict = false;
        for clip in self.clips().values() {
            if clip.is_output() {
                continue;
            }
            let Some(source) = clip.source() else {
                continue;
            };
            if !input_par_set {
                input_par = source.pixel_aspect;
                input_par_set = true;
            } else if (input_par - source.pixel_aspect).abs() > f64::EPSILON {
                par_conflict = true;
            }
            if !input_rate_set {
                input_rate = source.frame_rate;
                input_rate_set = true;
            } else if (input_rate - source.frame_rate).abs() > 0.01 {
                rate_conflict = true;
            }
        }

        let mut out_args = PropertySet::new();
        if self.setup_clip_preferences_args(&mut out_args).is_err() {
            // Cannot enumerate the clips; fall back to single-value defaults
            out_args.set_double(
                &clip_scoped_key(PROP_CLIP_PIXEL_ASPECT, "Output"),
                input_par,
            );
            out_args.set_double(PROP_EFFECT_FRAME_RATE, self.host().frame_rate());
        }

        if par_conflict {
            warn!(
                effect = %self.script_name(),
                "inputs disagree on pixel aspect ratio; the wiring should have prevented this"
            );
            out_args.set_double(
                &clip_scoped_key(PROP_CLIP_PIXEL_ASPECT, "Output"),
                input_par,
            );
        }
        if rate_conflict {
            warn!(
                effect = %self.script_name(),
                "inputs disagree on frame rate; the wiring should have prevented this"
            );
            out_args.set_double(PROP_EFFECT_FRAME_RATE, self.host().frame_rate());
        }

        match (par_conflict, rate_conflict) {
            (true, true) => {
                self.host().set_persistent_message(
                    MessageKind::Warning,
                    WARN_PIXEL_ASPECT_AND_FRAME_RATE_MISMATCH,
                );
            }
            (true, false) => {
                self.host()
                    .set_persistent_message(MessageKind::Warning, WARN_PIXEL_ASPECT_MISMATCH);
            }
            (false, true) => {
                self.host()
                    .set_persistent_message(MessageKind::Warning, WARN_FRAME_RATE_MISMATCH);
            }
            (false, false) => {
                if self.host().has_persistent_message() {
                    self.host().clear_persistent_message();
                }
            }
        }

        let status = self.main_entry(ACTION_GET_CLIP_PREFERENCES, None, Some(&mut out_args));
        if status != ActionStatus::Ok && status != ActionStatus::ReplyDefault {
            return false;
        }

        // Pump the negotiated values back out, per clip then effect-wide.
        for (name, _) in self.clips() {
            let prefs = ClipPrefs {
                bit_depth: out_args
                    .get_string(&clip_scoped_key(PROP_CLIP_BIT_DEPTH, name))
                    .unwrap_or_default(),
                components: out_args
                    .get_string(&clip_scoped_key(PROP_CLIP_COMPONENTS, name))
                    .unwrap_or_default(),
                pixel_aspect: out_args
                    .get_double(&clip_scoped_key(PROP_CLIP_PIXEL_ASPECT, name))
                    .unwrap_or(1.0),
            };
            out_clip_prefs.insert(name.clone(), prefs);
        }

        *out_effect_prefs = EffectPrefs {
            frame_rate: out_args
                .get_double(PROP_EFFECT_FRAME_RATE)
                .unwrap_or(input_rate),
            fielding: out_args
                .get_string(PROP_EFFECT_FIELDING)
                .unwrap_or_else(|_| FIELDING_NONE.to_string()),
            premult: out_args
                .get_string(PROP_EFFECT_PREMULT)
                .unwrap_or_else(|_| PREMULT_PREMULTIPLIED.to_string()),
            continuous_samples: out_args.get_int(PROP_EFFECT_CONTINUOUS).unwrap_or(0) != 0,
            frame_varying: out_args.get_int(PROP_EFFECT_FRAME_VARYING).unwrap_or(0) != 0,
        };

        self.prefs_dirty = false;
        true
    }

    /// Apply an externally-computed effect preference set without running
    /// negotiation, e.g. when preferences propagate from a connected
    /// upstream effect
    pub fn update_preferences(&mut self, prefs: &EffectPrefs) {
        self.effect_prefs = prefs.clone();
    }

    /// Distribute negotiated per-clip preferences to the clip instances
    pub fn apply_clip_preferences(&mut self, prefs: &HashMap<String, ClipPrefs>) {
        for (name, clip_prefs) in prefs {
            if let Some(clip) = self.clips.get_mut(name) {
                clip.set_preferences(clip_prefs.clone());
            }
        }
    }
}
