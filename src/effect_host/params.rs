//! Parameter Instance Factory
//!
//! Builds a live, typed parameter from each plugin-supplied descriptor,
//! wires the knob's animation-level notification into the instance, applies
//! the descriptor's UI properties to the knob, and records the parent edge
//! consumed later by the hierarchy builder.

use super::descriptor::{InteractDescriptor, LayoutHint, ParamDescriptor, ParamKind};
use super::types::*;
use crate::knob::{AnimationLevel, Knob, ParametricCurve, SharedKnob};
use std::sync::{Arc, Mutex, Weak};

/// Deferred (parameter -> parent name) edge recorded during construction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentEdge {
    pub param: String,
    pub parent: String,
}

/// Subscription to a knob's animation-level notifications; deregisters on
/// drop
struct ListenerHandle {
    knob: Weak<Mutex<Knob>>,
    id: u64,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(knob) = self.knob.upgrade() {
            knob.lock().unwrap().remove_animation_listener(self.id);
        }
    }
}

/// A live parameter created 1:1 from a descriptor entry.
///
/// Owns exactly one backing knob reference; the knob itself is shared with
/// the rest of the parameter system.
pub struct ParamInstance {
    name: String,
    descriptor: ParamDescriptor,
    knob: SharedKnob,
    animation_level: Arc<Mutex<AnimationLevel>>,
    listener: Option<ListenerHandle>,
    interact: Option<InteractDescriptor>,
}

impl std::fmt::Debug for ParamInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamInstance")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ParamInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &ParamDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> &ParamKind {
        &self.descriptor.kind
    }

    pub fn knob(&self) -> &SharedKnob {
        &self.knob
    }

    pub fn is_page(&self) -> bool {
        matches!(self.descriptor.kind, ParamKind::Page { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self.descriptor.kind, ParamKind::Group { .. })
    }

    pub fn layout_hint(&self) -> LayoutHint {
        self.descriptor.layout_hint
    }

    /// The instance's mirror of the knob's animation level, kept current by
    /// the registered listener
    pub fn animation_level(&self) -> AnimationLevel {
        *self.animation_level.lock().unwrap()
    }

    pub fn has_animation_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub fn interact(&self) -> Option<&InteractDescriptor> {
        self.interact.as_ref()
    }
}

/// Whether instances of this kind subscribe to their knob's animation
/// notifications
fn wires_animation(kind: &ParamKind) -> bool {
    !matches!(
        kind,
        ParamKind::Group { .. }
            | ParamKind::Page { .. }
            | ParamKind::PushButton
            | ParamKind::Parametric { .. }
    )
}

/// Build the default curves a parametric parameter declared. Each curve
/// needs at least two control points with x in [0, 1] in non-decreasing
/// order; anything else is a fatal construction error.
fn default_initialize_curves(
    param: &str,
    curves: &[ParametricCurve],
) -> HostResult<Vec<ParametricCurve>> {
    for curve in curves {
        if curve.points.len() < 2 {
            return Err(HostError::CurveInitialization(param.to_string()));
        }
        let mut last_x = f64::NEG_INFINITY;
        for &(x, _) in &curve.points {
            if !(0.0..=1.0).contains(&x) || x < last_x {
                return Err(HostError::CurveInitialization(param.to_string()));
            }
            last_x = x;
        }
    }
    Ok(curves.to_vec())
}

/// Create the live parameter matching a descriptor.
///
/// Returns the instance plus the parent edge to resolve once all of the
/// effect's parameters exist.
pub fn create_param(
    name: &str,
    desc: &ParamDescriptor,
) -> HostResult<(ParamInstance, Option<ParentEdge>)> {
    // Dispatch order mirrors the standard's type enumeration.
    let knob = match &desc.kind {
        ParamKind::Integer { default } => Knob::int(name, &[*default]),
        ParamKind::Double { default } => Knob::double(name, &[*default]),
        ParamKind::Boolean { default } => Knob::boolean(name, *default),
        ParamKind::Choice { options, default } => Knob::choice(name, options.clone(), *default),
        ParamKind::Rgba { default } => Knob::color(name, default),
        ParamKind::Rgb { default } => Knob::color(name, default),
        ParamKind::Double2D { default } => Knob::double(name, default),
        ParamKind::Integer2D { default } => Knob::int(name, default),
        ParamKind::Double3D { default } => Knob::double(name, default),
        ParamKind::Integer3D { default } => Knob::int(name, default),
        ParamKind::Text { default } => Knob::text(name, default),
        // Opaque string payload; mandatory to support even though the host
        // cannot interpret it
        ParamKind::Custom { default } => Knob::custom(name, default),
        ParamKind::Group { open } => Knob::group(name, *open),
        ParamKind::Page { .. } => Knob::page(name),
        ParamKind::PushButton => Knob::button(name),
        ParamKind::Parametric { curves } => {
            let initialized = default_initialize_curves(name, curves)?;
            Knob::parametric(name, initialized)
        }
    };

    let animation_level = Arc::new(Mutex::new(AnimationLevel::None));
    let listener = if wires_animation(&desc.kind) {
        let mirror = Arc::clone(&animation_level);
        let id = knob
            .lock()
            .unwrap()
            .add_animation_listener(Box::new(move |_dimension, level| {
                *mirror.lock().unwrap() = level;
            }));
        Some(ListenerHandle {
            knob: Arc::downgrade(&knob),
            id,
        })
    } else {
        None
    };

    {
        let mut k = knob.lock().unwrap();
        k.set_name(name);
        k.set_label(&desc.label);
        k.set_evaluate_on_change(desc.evaluate_on_change);

        // Containers hold no value worth saving, whatever the descriptor says
        let persistent = if desc.kind.is_container() {
            false
        } else {
            desc.persistent
        };
        k.set_persistent(persistent);

        k.set_animation_enabled(desc.can_animate);
        k.set_secret(desc.secret);
        k.set_enabled(desc.enabled);
        k.set_tooltip(&desc.hint);
        k.set_can_undo(desc.can_undo);
        k.set_spacing(desc.spacing);
        match desc.layout_hint {
            LayoutHint::TrailingSeparator => k.set_add_separator(true),
            LayoutHint::NoNewLine => k.set_add_new_line(false),
            LayoutHint::Normal => {}
        }
    }

    let interact = desc.interact.map(|entry| {
        let mut interact_desc = InteractDescriptor::new(entry);
        interact_desc.describe(8, false);
        interact_desc
    });

    let edge = desc
        .parent
        .as_ref()
        .filter(|parent| !parent.is_empty())
        .map(|parent| ParentEdge {
            param: name.to_string(),
            parent: parent.clone(),
        });

    Ok((
        ParamInstance {
            name: name.to_string(),
            descriptor: desc.clone(),
            knob,
            animation_level,
            listener,
            interact,
        },
        edge,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<(&'static str, ParamKind)> {
        vec![
            ("strength", ParamKind::Integer { default: 5 }),
            ("size", ParamKind::Double { default: 3.0 }),
            ("invert", ParamKind::Boolean { default: true }),
            (
                "channels",
                ParamKind::Choice {
                    options: vec!["RGBA".to_string(), "Alpha".to_string()],
                    default: 0,
                },
            ),
            (
                "tint",
                ParamKind::Rgba {
                    default: [1.0, 1.0, 1.0, 1.0],
                },
            ),
            (
                "background",
                ParamKind::Rgb {
                    default: [0.0, 0.0, 0.0],
                },
            ),
            ("center", ParamKind::Double2D { default: [0.5, 0.5] }),
            ("offset_px", ParamKind::Integer2D { default: [0, 0] }),
            (
                "axis",
                ParamKind::Double3D {
                    default: [0.0, 1.0, 0.0],
                },
            ),
            ("grid", ParamKind::Integer3D { default: [8, 8, 1] }),
            (
                "caption",
                ParamKind::Text {
                    default: "untitled".to_string(),
                },
            ),
            (
                "state_blob",
                ParamKind::Custom {
                    default: "v1;0;0".to_string(),
                },
            ),
            ("advanced", ParamKind::Group { open: false }),
            (
                "controls",
                ParamKind::Page {
                    children: vec!["size".to_string()],
                },
            ),
            ("apply", ParamKind::PushButton),
            (
                "falloff",
                ParamKind::Parametric {
                    curves: vec![ParametricCurve::new(vec![(0.0, 0.0), (1.0, 1.0)])],
                },
            ),
        ]
    }

    #[test]
    fn test_every_kind_builds_a_matching_knob() {
        for (name, kind) in all_kinds() {
            let desc = ParamDescriptor::new(name, kind.clone());
            let (param, edge) = create_param(name, &desc).unwrap();
            assert!(edge.is_none());

            let knob = param.knob().lock().unwrap();
            assert_eq!(knob.name(), name);
            assert_eq!(knob.can_animate(), desc.can_animate);
            assert_eq!(knob.is_secret(), desc.secret);
            assert_eq!(knob.is_enabled(), desc.enabled);
            if kind.is_container() {
                assert!(!knob.is_persistent());
            } else {
                assert!(knob.is_persistent());
            }
        }
    }

    #[test]
    fn test_declared_flags_reach_the_knob() {
        let desc = ParamDescriptor::new("size", ParamKind::Double { default: 1.0 })
            .labeled("Size")
            .with_hint("Blur radius in pixels")
            .hidden()
            .disabled()
            .non_animating()
            .non_persistent();
        let (param, _) = create_param("size", &desc).unwrap();

        let knob = param.knob().lock().unwrap();
        assert_eq!(knob.label(), "Size");
        assert_eq!(knob.tooltip(), "Blur radius in pixels");
        assert!(knob.is_secret());
        assert!(!knob.is_enabled());
        assert!(!knob.can_animate());
        assert!(!knob.is_persistent());
    }

    #[test]
    fn test_container_forced_non_persistent() {
        // Descriptor claims persistence; containers override it
        let desc = ParamDescriptor::new("advanced", ParamKind::Group { open: true });
        assert!(desc.persistent);
        let (param, _) = create_param("advanced", &desc).unwrap();
        assert!(!param.knob().lock().unwrap().is_persistent());
        assert!(!param.has_animation_listener());
    }

    #[test]
    fn test_layout_hints_reach_the_knob() {
        let sep = ParamDescriptor::new("size", ParamKind::Double { default: 0.0 })
            .layout(LayoutHint::TrailingSeparator);
        let (param, _) = create_param("size", &sep).unwrap();
        assert!(param.knob().lock().unwrap().separator_requested());
        assert!(param.knob().lock().unwrap().adds_new_line());

        let inline = ParamDescriptor::new("mix", ParamKind::Double { default: 0.0 })
            .layout(LayoutHint::NoNewLine);
        let (param, _) = create_param("mix", &inline).unwrap();
        assert!(!param.knob().lock().unwrap().adds_new_line());
    }

    #[test]
    fn test_animation_listener_mirrors_level() {
        let desc = ParamDescriptor::new("size", ParamKind::Double { default: 0.0 });
        let (param, _) = create_param("size", &desc).unwrap();
        assert!(param.has_animation_listener());
        assert_eq!(param.animation_level(), AnimationLevel::None);

        param
            .knob()
            .lock()
            .unwrap()
            .set_animation_level(0, AnimationLevel::OnKeyframe);
        assert_eq!(param.animation_level(), AnimationLevel::OnKeyframe);
    }

    #[test]
    fn test_listener_deregisters_on_drop() {
        let desc = ParamDescriptor::new("size", ParamKind::Double { default: 0.0 });
        let (param, _) = create_param("size", &desc).unwrap();
        let knob = Arc::clone(param.knob());
        assert_eq!(knob.lock().unwrap().listener_count(), 1);

        drop(param);
        assert_eq!(knob.lock().unwrap().listener_count(), 0);
    }

    #[test]
    fn test_parent_edge_recorded() {
        let desc =
            ParamDescriptor::new("size", ParamKind::Double { default: 0.0 }).parented("advanced");
        let (_, edge) = create_param("size", &desc).unwrap();
        assert_eq!(
            edge,
            Some(ParentEdge {
                param: "size".to_string(),
                parent: "advanced".to_string(),
            })
        );
    }

    #[test]
    fn test_parametric_curve_initialization_failure_is_fatal() {
        let bad = ParamDescriptor::new(
            "falloff",
            ParamKind::Parametric {
                curves: vec![ParametricCurve::new(vec![(0.0, 0.0), (2.0, 1.0)])],
            },
        );
        let err = create_param("falloff", &bad).unwrap_err();
        assert!(matches!(err, HostError::CurveInitialization(ref p) if p == "falloff"));

        let too_few = ParamDescriptor::new(
            "falloff",
            ParamKind::Parametric {
                curves: vec![ParametricCurve::new(vec![(0.0, 0.0)])],
            },
        );
        assert!(create_param("falloff", &too_few).is_err());
    }

    #[test]
    fn test_interact_registration() {
        fn entry(_action: &str, _args: &PropertySet) -> ActionStatus {
            ActionStatus::Ok
        }
        let desc =
            ParamDescriptor::new("center", ParamKind::Double2D { default: [0.5, 0.5] })
                .with_interact(entry);
        let (param, _) = create_param("center", &desc).unwrap();

        let interact = param.interact().unwrap();
        assert!(interact.is_described());
        assert!(interact.props().contains("InteractSize"));
    }
}
