//! Mock effect plugin for testing
//!
//! A deterministic effect whose descriptor exercises every parameter kind
//! the standard defines, plus the negotiation and render actions. Used by
//! the test suite and the CLI so nothing depends on external plugin
//! binaries.

use super::bridge::HostContext;
use super::descriptor::{
    ClipDescriptor, EffectDescriptor, LayoutHint, ParamDescriptor, ParamKind,
};
use super::plugin::EffectPlugin;
use super::types::*;
use crate::knob::ParametricCurve;

fn center_interact(_action: &str, _args: &PropertySet) -> ActionStatus {
    ActionStatus::Ok
}

/// Deterministic blur-shaped effect covering the whole parameter surface
pub struct MockBlur {
    fail_clip_preferences: bool,
}

impl Default for MockBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBlur {
    pub const ID: &'static str = "photon.mock.blur";

    pub fn new() -> Self {
        Self {
            fail_clip_preferences: false,
        }
    }

    /// Variant whose preference action always fails, for negotiation tests
    pub fn failing_clip_preferences() -> Self {
        Self {
            fail_clip_preferences: true,
        }
    }
}

impl EffectPlugin for MockBlur {
    fn describe(&self) -> EffectDescriptor {
        EffectDescriptor {
            grouping: "Filter".to_string(),
            description: "Separable blur used to exercise the hosting layer".to_string(),
            ..EffectDescriptor::new(Self::ID, "MockBlur")
        }
        .param(ParamDescriptor::new(
            "controls",
            ParamKind::Page {
                children: vec![
                    "size".to_string(),
                    "strength".to_string(),
                    "invert".to_string(),
                    "channels".to_string(),
                    "advanced".to_string(),
                ],
            },
        ))
        .param(
            ParamDescriptor::new("size", ParamKind::Double { default: 3.0 })
                .labeled("Size")
                .with_hint("Blur radius in pixels")
                .layout(LayoutHint::TrailingSeparator),
        )
        .param(
            ParamDescriptor::new("strength", ParamKind::Integer { default: 1 })
                .labeled("Strength"),
        )
        .param(
            ParamDescriptor::new("invert", ParamKind::Boolean { default: false })
                .labeled("Invert Matte")
                .layout(LayoutHint::NoNewLine),
        )
        .param(ParamDescriptor::new(
            "channels",
            ParamKind::Choice {
                options: vec![
                    COMPONENTS_RGBA.to_string(),
                    COMPONENTS_RGB.to_string(),
                    COMPONENTS_ALPHA.to_string(),
                ],
                default: 0,
            },
        ))
        .param(ParamDescriptor::new(
            "advanced",
            ParamKind::Group { open: false },
        ))
        .param(
            ParamDescriptor::new(
                "tint",
                ParamKind::Rgba {
                    default: [1.0, 1.0, 1.0, 1.0],
                },
            )
            .parented("advanced"),
        )
        .param(
            ParamDescriptor::new(
                "background",
                ParamKind::Rgb {
                    default: [0.0, 0.0, 0.0],
                },
            )
            .parented("advanced"),
        )
        .param(
            ParamDescriptor::new("center", ParamKind::Double2D { default: [0.5, 0.5] })
                .with_interact(center_interact),
        )
        .param(
            ParamDescriptor::new("offset_px", ParamKind::Integer2D { default: [0, 0] })
                .parented("advanced"),
        )
        .param(ParamDescriptor::new(
            "axis",
            ParamKind::Double3D {
                default: [0.0, 1.0, 0.0],
            },
        ))
        .param(
            ParamDescriptor::new("grid", ParamKind::Integer3D { default: [8, 8, 1] })
                .parented("advanced"),
        )
        .param(
            ParamDescriptor::new(
                "caption",
                ParamKind::Text {
                    default: String::new(),
                },
            )
            .labeled("Caption"),
        )
        .param(
            ParamDescriptor::new(
                "state_blob",
                ParamKind::Custom {
                    default: "v1;0;0".to_string(),
                },
            )
            .hidden(),
        )
        .param(ParamDescriptor::new("apply", ParamKind::PushButton).labeled("Apply"))
        .param(ParamDescriptor::new(
            "falloff",
            ParamKind::Parametric {
                curves: vec![ParametricCurve::new(vec![(0.0, 0.0), (1.0, 1.0)])],
            },
        ))
        .clip(ClipDescriptor::source("Source").transforming())
        .clip(ClipDescriptor::source("Matte").optional())
        .clip(ClipDescriptor::output())
    }

    fn action(
        &mut self,
        host: &HostContext,
        action: &str,
        _in_args: Option<&PropertySet>,
        out_args: Option<&mut PropertySet>,
    ) -> ActionStatus {
        match action {
            ACTION_CREATE_INSTANCE | ACTION_DESTROY_INSTANCE | ACTION_INSTANCE_CHANGED => {
                ActionStatus::Ok
            }
            ACTION_GET_CLIP_PREFERENCES => {
                if self.fail_clip_preferences {
                    return ActionStatus::Failed;
                }
                if let Some(out) = out_args {
                    // A blur over a matte never introduces alpha
                    out.set_string(PROP_EFFECT_PREMULT, PREMULT_OPAQUE);
                }
                ActionStatus::Ok
            }
            ACTION_RENDER => {
                host.progress_start("Rendering");
                let passes = 4;
                for pass in 0..=passes {
                    if host.aborted() {
                        break;
                    }
                    if !host.progress_update(f64::from(pass) / f64::from(passes)) {
                        break;
                    }
                }
                host.progress_end();
                ActionStatus::Ok
            }
            _ => ActionStatus::ReplyDefault,
        }
    }
}
