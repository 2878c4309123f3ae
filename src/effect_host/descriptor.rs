//! Immutable plugin-supplied descriptors
//!
//! Descriptors are the declarative side of the plugin standard: what
//! parameters and clips an effect has and how they should behave. They are
//! produced by plugin code at describe time and never change afterwards;
//! the host builds its live objects from them.

use super::types::*;
use crate::knob::ParametricCurve;

/// Layout hint attached to a parameter. Wire values are 0/1/2.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutHint {
    #[default]
    Normal,
    /// Insert a separator immediately after this parameter
    TrailingSeparator,
    /// Suppress the line break after this parameter
    NoNewLine,
}

impl LayoutHint {
    pub fn from_wire(value: i32) -> Self {
        match value {
            1 => LayoutHint::TrailingSeparator,
            2 => LayoutHint::NoNewLine,
            _ => LayoutHint::Normal,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            LayoutHint::Normal => 0,
            LayoutHint::TrailingSeparator => 1,
            LayoutHint::NoNewLine => 2,
        }
    }
}

/// Entry point of a parameter's custom on-viewer interaction
pub type InteractEntry = fn(action: &str, args: &PropertySet) -> ActionStatus;

/// Descriptor of a parameter's custom interaction.
///
/// The standard defines the size/aspect properties on the parameter
/// descriptor, but the interact's describe call expects them on the
/// interact descriptor, so they are installed here with their fixed
/// defaults before describing.
#[derive(Clone, Debug)]
pub struct InteractDescriptor {
    props: PropertySet,
    entry: InteractEntry,
    described: bool,
}

impl InteractDescriptor {
    pub fn new(entry: InteractEntry) -> Self {
        let mut props = PropertySet::new();
        props.set_int_list("InteractSize", vec![0, 0]);
        props.set_double("InteractSizeAspect", 1.0);
        props.set_double_list("InteractMinimumSize", vec![10.0, 10.0]);
        props.set_int_list("InteractPreferredSize", vec![10, 10]);
        Self {
            props,
            entry,
            described: false,
        }
    }

    /// Run the interact's describe entry point
    pub fn describe(&mut self, bit_depth: i32, has_alpha: bool) -> ActionStatus {
        self.props.set_int("InteractBitDepth", i64::from(bit_depth));
        self.props
            .set_int("InteractHasAlpha", i64::from(has_alpha));
        self.described = true;
        (self.entry)("describeInteract", &self.props)
    }

    pub fn props(&self) -> &PropertySet {
        &self.props
    }

    pub fn is_described(&self) -> bool {
        self.described
    }
}

/// The closed set of parameter kinds defined by the plugin standard, with
/// their kind-specific declaration payloads.
///
/// Variant order mirrors the standard's type enumeration. Dispatch over
/// this enum is exhaustive, so an unhandled kind is a build error; tags
/// only exist as data at the declarative boundary (`from_tag`).
#[derive(Clone, Debug, PartialEq)]
pub enum ParamKind {
    Integer { default: i64 },
    Double { default: f64 },
    Boolean { default: bool },
    Choice { options: Vec<String>, default: usize },
    Rgba { default: [f64; 4] },
    Rgb { default: [f64; 3] },
    Double2D { default: [f64; 2] },
    Integer2D { default: [i64; 2] },
    Double3D { default: [f64; 3] },
    Integer3D { default: [i64; 3] },
    Text { default: String },
    /// Opaque string payload; animation and interpolation are the plugin's
    /// business. Mandatory to support.
    Custom { default: String },
    Group { open: bool },
    Page { children: Vec<String> },
    PushButton,
    Parametric { curves: Vec<ParametricCurve> },
}

impl ParamKind {
    /// The kind's wire tag, as the standard spells it
    pub fn tag(&self) -> &'static str {
        match self {
            ParamKind::Integer { .. } => "Integer",
            ParamKind::Double { .. } => "Double",
            ParamKind::Boolean { .. } => "Boolean",
            ParamKind::Choice { .. } => "Choice",
            ParamKind::Rgba { .. } => "RGBA",
            ParamKind::Rgb { .. } => "RGB",
            ParamKind::Double2D { .. } => "Double2D",
            ParamKind::Integer2D { .. } => "Integer2D",
            ParamKind::Double3D { .. } => "Double3D",
            ParamKind::Integer3D { .. } => "Integer3D",
            ParamKind::Text { .. } => "String",
            ParamKind::Custom { .. } => "Custom",
            ParamKind::Group { .. } => "Group",
            ParamKind::Page { .. } => "Page",
            ParamKind::PushButton => "PushButton",
            ParamKind::Parametric { .. } => "Parametric",
        }
    }

    /// Build a kind with neutral defaults from a wire tag. Tags outside the
    /// standard's closed set are rejected.
    pub fn from_tag(tag: &str) -> HostResult<Self> {
        match tag {
            "Integer" => Ok(ParamKind::Integer { default: 0 }),
            "Double" => Ok(ParamKind::Double { default: 0.0 }),
            "Boolean" => Ok(ParamKind::Boolean { default: false }),
            "Choice" => Ok(ParamKind::Choice {
                options: Vec::new(),
                default: 0,
            }),
            "RGBA" => Ok(ParamKind::Rgba {
                default: [0.0, 0.0, 0.0, 1.0],
            }),
            "RGB" => Ok(ParamKind::Rgb {
                default: [0.0, 0.0, 0.0],
            }),
            "Double2D" => Ok(ParamKind::Double2D { default: [0.0, 0.0] }),
            "Integer2D" => Ok(ParamKind::Integer2D { default: [0, 0] }),
            "Double3D" => Ok(ParamKind::Double3D {
                default: [0.0, 0.0, 0.0],
            }),
            "Integer3D" => Ok(ParamKind::Integer3D { default: [0, 0, 0] }),
            "String" => Ok(ParamKind::Text {
                default: String::new(),
            }),
            "Custom" => Ok(ParamKind::Custom {
                default: String::new(),
            }),
            "Group" => Ok(ParamKind::Group { open: true }),
            "Page" => Ok(ParamKind::Page {
                children: Vec::new(),
            }),
            "PushButton" => Ok(ParamKind::PushButton),
            "Parametric" => Ok(ParamKind::Parametric { curves: Vec::new() }),
            other => Err(HostError::UnsupportedParamType(other.to_string())),
        }
    }

    /// Group, Page and PushButton hold no persistent value
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ParamKind::Group { .. } | ParamKind::Page { .. } | ParamKind::PushButton
        )
    }
}

/// Immutable declaration of one parameter
#[derive(Clone, Debug)]
pub struct ParamDescriptor {
    pub name: String,
    pub label: String,
    pub kind: ParamKind,
    /// Name of the group this parameter wants to live in
    pub parent: Option<String>,
    pub persistent: bool,
    pub can_animate: bool,
    pub can_undo: bool,
    pub secret: bool,
    pub enabled: bool,
    pub evaluate_on_change: bool,
    pub hint: String,
    pub spacing: i32,
    pub layout_hint: LayoutHint,
    pub interact: Option<InteractEntry>,
}

impl ParamDescriptor {
    pub fn new(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            kind,
            parent: None,
            persistent: true,
            can_animate: true,
            can_undo: true,
            secret: false,
            enabled: true,
            evaluate_on_change: true,
            hint: String::new(),
            spacing: 0,
            layout_hint: LayoutHint::Normal,
            interact: None,
        }
    }

    /// Declarative construction from a wire tag; fails on tags outside the
    /// standard's closed set and constructs nothing
    pub fn from_tag(name: &str, tag: &str) -> HostResult<Self> {
        Ok(Self::new(name, ParamKind::from_tag(tag)?))
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn parented(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = hint.to_string();
        self
    }

    pub fn layout(mut self, hint: LayoutHint) -> Self {
        self.layout_hint = hint;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn non_persistent(mut self) -> Self {
        self.persistent = false;
        self
    }

    pub fn non_animating(mut self) -> Self {
        self.can_animate = false;
        self
    }

    pub fn with_interact(mut self, entry: InteractEntry) -> Self {
        self.interact = Some(entry);
        self
    }
}

/// Immutable declaration of one clip
#[derive(Clone, Debug)]
pub struct ClipDescriptor {
    pub name: String,
    pub label: String,
    pub optional: bool,
    pub is_output: bool,
    /// Component layouts the clip accepts, most preferred first
    pub supported_components: Vec<String>,
    /// Bit depths the clip accepts, most preferred first
    pub supported_bit_depths: Vec<String>,
    /// Whether the clip can receive concatenated transforms
    pub can_transform: bool,
}

impl ClipDescriptor {
    /// An input clip
    pub fn source(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            optional: false,
            is_output: false,
            supported_components: vec![COMPONENTS_RGBA.to_string()],
            supported_bit_depths: vec![BIT_DEPTH_FLOAT.to_string()],
            can_transform: false,
        }
    }

    /// The effect's output clip
    pub fn output() -> Self {
        let mut clip = Self::source("Output");
        clip.is_output = true;
        clip
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn transforming(mut self) -> Self {
        self.can_transform = true;
        self
    }

    pub fn with_components(mut self, components: Vec<String>) -> Self {
        self.supported_components = components;
        self
    }

    pub fn with_bit_depths(mut self, depths: Vec<String>) -> Self {
        self.supported_bit_depths = depths;
        self
    }
}

/// Immutable declaration of a whole effect
#[derive(Clone, Debug)]
pub struct EffectDescriptor {
    pub id: String,
    pub label: String,
    pub version: String,
    pub grouping: String,
    pub description: String,
    pub params: Vec<ParamDescriptor>,
    pub clips: Vec<ClipDescriptor>,
}

impl EffectDescriptor {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            version: "1.0.0".to_string(),
            grouping: String::new(),
            description: String::new(),
            params: Vec::new(),
            clips: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn clip(mut self, clip: ClipDescriptor) -> Self {
        self.clips.push(clip);
        self
    }

    /// Structural checks applied before any live object is built
    pub fn validate(&self) -> HostResult<()> {
        if self.id.is_empty() {
            return Err(HostError::InvalidDescriptor(
                "effect id is empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(HostError::InvalidDescriptor(format!(
                    "duplicate parameter name: {}",
                    param.name
                )));
            }
        }
        let mut clip_names = std::collections::HashSet::new();
        for clip in &self.clips {
            if !clip_names.insert(clip.name.as_str()) {
                return Err(HostError::InvalidDescriptor(format!(
                    "duplicate clip name: {}",
                    clip.name
                )));
            }
        }
        if self.clips.iter().filter(|c| c.is_output).count() != 1 {
            return Err(HostError::InvalidDescriptor(
                "an effect declares exactly one output clip".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_hint_wire_values() {
        assert_eq!(LayoutHint::from_wire(0), LayoutHint::Normal);
        assert_eq!(LayoutHint::from_wire(1), LayoutHint::TrailingSeparator);
        assert_eq!(LayoutHint::from_wire(2), LayoutHint::NoNewLine);
        assert_eq!(LayoutHint::from_wire(99), LayoutHint::Normal);
        assert_eq!(LayoutHint::TrailingSeparator.to_wire(), 1);
    }

    #[test]
    fn test_kind_tags_round_trip() {
        let tags = [
            "Integer",
            "Double",
            "Boolean",
            "Choice",
            "RGBA",
            "RGB",
            "Double2D",
            "Integer2D",
            "Double3D",
            "Integer3D",
            "String",
            "Custom",
            "Group",
            "Page",
            "PushButton",
            "Parametric",
        ];
        for tag in tags {
            let kind = ParamKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = ParamDescriptor::from_tag("size", "Bezier").unwrap_err();
        assert!(matches!(err, HostError::UnsupportedParamType(ref tag) if tag == "Bezier"));
    }

    #[test]
    fn test_interact_descriptor_fixed_props() {
        fn entry(_action: &str, _args: &PropertySet) -> ActionStatus {
            ActionStatus::Ok
        }
        let mut desc = InteractDescriptor::new(entry);
        assert_eq!(desc.props().get_int_list("InteractSize").unwrap(), vec![0, 0]);
        assert_eq!(desc.props().get_double("InteractSizeAspect").unwrap(), 1.0);
        assert_eq!(
            desc.props().get_double_list("InteractMinimumSize").unwrap(),
            vec![10.0, 10.0]
        );
        assert_eq!(
            desc.props().get_int_list("InteractPreferredSize").unwrap(),
            vec![10, 10]
        );
        assert!(!desc.is_described());
        assert_eq!(desc.describe(8, false), ActionStatus::Ok);
        assert!(desc.is_described());
    }

    #[test]
    fn test_descriptor_validation() {
        let ok = EffectDescriptor::new("photon.test", "Test")
            .param(ParamDescriptor::new("size", ParamKind::Double { default: 1.0 }))
            .clip(ClipDescriptor::source("Source"))
            .clip(ClipDescriptor::output());
        assert!(ok.validate().is_ok());

        let dup = EffectDescriptor::new("photon.test", "Test")
            .param(ParamDescriptor::new("size", ParamKind::Double { default: 1.0 }))
            .param(ParamDescriptor::new("size", ParamKind::Integer { default: 0 }))
            .clip(ClipDescriptor::output());
        assert!(matches!(
            dup.validate(),
            Err(HostError::InvalidDescriptor(_))
        ));

        let no_output =
            EffectDescriptor::new("photon.test", "Test").clip(ClipDescriptor::source("Source"));
        assert!(no_output.validate().is_err());
    }
}
