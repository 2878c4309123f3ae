//! Host parameter objects ("knobs")
//!
//! A knob is the application's live parameter: typed value storage plus the
//! UI metadata the parameter panels read (secrecy, enabled state, tooltip,
//! layout). Knobs are shared between the effect-plugin adapter that creates
//! them and the rest of the application, so they live behind `Arc<Mutex<_>>`.
//!
//! Animation-state changes propagate through an explicit observer list:
//! interested parties register a callback and deregister it when they go
//! away. There is no implicit global dispatch.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Shared handle to a knob
pub type SharedKnob = Arc<Mutex<Knob>>;

/// How a knob's value relates to its animation at the current time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationLevel {
    /// No animation
    #[default]
    None,
    /// Animated, current time falls between keyframes
    Interpolated,
    /// Animated, current time sits on a keyframe
    OnKeyframe,
}

/// A single curve of a parametric knob, as (x, y) control points with x
/// normalized to [0, 1]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParametricCurve {
    pub points: Vec<(f64, f64)>,
}

impl ParametricCurve {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }
}

/// Typed value storage. Container variants own their children.
#[derive(Clone, Debug)]
pub enum KnobValue {
    Int(Vec<i64>),
    Double(Vec<f64>),
    Bool(bool),
    Choice { index: usize, options: Vec<String> },
    Color(Vec<f64>),
    Text(String),
    /// Opaque plugin-defined string payload
    Custom(String),
    Group { open: bool, children: Vec<SharedKnob> },
    Page { children: Vec<SharedKnob> },
    Button,
    Parametric { curves: Vec<ParametricCurve> },
    /// Zero-width visual divider
    Separator,
}

/// Callback invoked with (dimension, level) when a knob's animation level
/// changes
pub type AnimationListener = Box<dyn Fn(i32, AnimationLevel) + Send>;

/// A live host parameter
pub struct Knob {
    name: String,
    label: String,
    value: KnobValue,
    persistent: bool,
    can_undo: bool,
    can_animate: bool,
    secret: bool,
    enabled: bool,
    evaluate_on_change: bool,
    tooltip: String,
    spacing: i32,
    add_new_line: bool,
    add_separator: bool,
    parent: Option<String>,
    animation_level: AnimationLevel,
    listeners: Vec<(u64, AnimationListener)>,
    next_listener_id: u64,
}

impl fmt::Debug for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Knob")
            .field("name", &self.name)
            .field("kind", &self.kind_name())
            .field("secret", &self.secret)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Knob {
    fn with_value(name: &str, value: KnobValue) -> SharedKnob {
        Arc::new(Mutex::new(Self {
            name: name.to_string(),
            label: name.to_string(),
            value,
            persistent: true,
            can_undo: true,
            can_animate: true,
            secret: false,
            enabled: true,
            evaluate_on_change: true,
            tooltip: String::new(),
            spacing: 0,
            add_new_line: true,
            add_separator: false,
            parent: None,
            animation_level: AnimationLevel::None,
            listeners: Vec::new(),
            next_listener_id: 0,
        }))
    }

    pub fn int(name: &str, values: &[i64]) -> SharedKnob {
        Self::with_value(name, KnobValue::Int(values.to_vec()))
    }

    pub fn double(name: &str, values: &[f64]) -> SharedKnob {
        Self::with_value(name, KnobValue::Double(values.to_vec()))
    }

    pub fn boolean(name: &str, value: bool) -> SharedKnob {
        Self::with_value(name, KnobValue::Bool(value))
    }

    pub fn choice(name: &str, options: Vec<String>, index: usize) -> SharedKnob {
        Self::with_value(name, KnobValue::Choice { index, options })
    }

    /// Color knob with 3 (RGB) or 4 (RGBA) components
    pub fn color(name: &str, values: &[f64]) -> SharedKnob {
        Self::with_value(name, KnobValue::Color(values.to_vec()))
    }

    pub fn text(name: &str, value: &str) -> SharedKnob {
        Self::with_value(name, KnobValue::Text(value.to_string()))
    }

    pub fn custom(name: &str, value: &str) -> SharedKnob {
        Self::with_value(name, KnobValue::Custom(value.to_string()))
    }

    pub fn group(name: &str, open: bool) -> SharedKnob {
        Self::with_value(
            name,
            KnobValue::Group {
                open,
                children: Vec::new(),
            },
        )
    }

    pub fn page(name: &str) -> SharedKnob {
        Self::with_value(
            name,
            KnobValue::Page {
                children: Vec::new(),
            },
        )
    }

    pub fn button(name: &str) -> SharedKnob {
        Self::with_value(name, KnobValue::Button)
    }

    pub fn parametric(name: &str, curves: Vec<ParametricCurve>) -> SharedKnob {
        Self::with_value(name, KnobValue::Parametric { curves })
    }

    pub fn separator(name: &str) -> SharedKnob {
        let knob = Self::with_value(name, KnobValue::Separator);
        knob.lock().unwrap().set_persistent(false);
        knob
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    pub fn value(&self) -> &KnobValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut KnobValue {
        &mut self.value
    }

    /// Short name of the value variant, for display and debugging
    pub fn kind_name(&self) -> &'static str {
        match &self.value {
            KnobValue::Int(_) => "int",
            KnobValue::Double(_) => "double",
            KnobValue::Bool(_) => "bool",
            KnobValue::Choice { .. } => "choice",
            KnobValue::Color(_) => "color",
            KnobValue::Text(_) => "text",
            KnobValue::Custom(_) => "custom",
            KnobValue::Group { .. } => "group",
            KnobValue::Page { .. } => "page",
            KnobValue::Button => "button",
            KnobValue::Parametric { .. } => "parametric",
            KnobValue::Separator => "separator",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self.value,
            KnobValue::Group { .. } | KnobValue::Page { .. }
        )
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    pub fn can_undo(&self) -> bool {
        self.can_undo
    }

    pub fn set_can_undo(&mut self, can_undo: bool) {
        self.can_undo = can_undo;
    }

    pub fn can_animate(&self) -> bool {
        self.can_animate
    }

    pub fn set_animation_enabled(&mut self, enabled: bool) {
        self.can_animate = enabled;
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    pub fn set_secret(&mut self, secret: bool) {
        self.secret = secret;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn evaluate_on_change(&self) -> bool {
        self.evaluate_on_change
    }

    pub fn set_evaluate_on_change(&mut self, evaluate: bool) {
        self.evaluate_on_change = evaluate;
    }

    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    pub fn set_tooltip(&mut self, tooltip: &str) {
        self.tooltip = tooltip.to_string();
    }

    pub fn spacing(&self) -> i32 {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: i32) {
        self.spacing = spacing;
    }

    /// Whether the layout starts a new line after this knob
    pub fn adds_new_line(&self) -> bool {
        self.add_new_line
    }

    pub fn set_add_new_line(&mut self, add: bool) {
        self.add_new_line = add;
    }

    /// Whether a separator was requested immediately after this knob
    pub fn separator_requested(&self) -> bool {
        self.add_separator
    }

    pub fn set_add_separator(&mut self, add: bool) {
        self.add_separator = add;
    }

    /// Name of the container that claimed this knob, if any
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    pub fn animation_level(&self) -> AnimationLevel {
        self.animation_level
    }

    /// Update the animation level and notify every registered listener
    pub fn set_animation_level(&mut self, dimension: i32, level: AnimationLevel) {
        self.animation_level = level;
        for (_, listener) in &self.listeners {
            listener(dimension, level);
        }
    }

    /// Register an animation-level listener; returns the id used to
    /// deregister it
    pub fn add_animation_listener(&mut self, listener: AnimationListener) -> u64 {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_animation_listener(&mut self, id: u64) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Children of a Group or Page knob; empty for anything else
    pub fn children(&self) -> Vec<SharedKnob> {
        match &self.value {
            KnobValue::Group { children, .. } | KnobValue::Page { children } => children.clone(),
            _ => Vec::new(),
        }
    }
}

/// Append `child` to a Group or Page knob's child list and record the
/// parent on the child.
///
/// Parenting is set-like: a child already present (by handle or by name) is
/// not added again. Returns whether the child was appended.
pub fn add_child(container: &SharedKnob, child: &SharedKnob) -> bool {
    if Arc::ptr_eq(container, child) {
        return false;
    }
    let child_name = child.lock().unwrap().name().to_string();
    let container_name;
    {
        let mut c = container.lock().unwrap();
        container_name = c.name().to_string();
        match c.value_mut() {
            KnobValue::Group { children, .. } | KnobValue::Page { children } => {
                let present = children.iter().any(|k| {
                    Arc::ptr_eq(k, child) || k.lock().unwrap().name() == child_name
                });
                if present {
                    return false;
                }
                children.push(Arc::clone(child));
            }
            _ => return false,
        }
    }
    child.lock().unwrap().set_parent(Some(container_name));
    true
}
