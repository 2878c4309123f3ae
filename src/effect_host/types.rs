//! Core vocabulary of the image-effect plugin standard
//!
//! Defines the fixed sets the host and plugins exchange across the dispatch
//! boundary: action names, status codes, message kinds, dynamically-typed
//! property sets, and the error types of the hosting subsystem.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Status returned by plugin actions and host suite calls.
///
/// These codes conform to the plugin standard's calling convention and are
/// relayed verbatim between host and plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionStatus {
    /// All was well
    Ok,
    /// Affirmative answer to a question message
    ReplyYes,
    /// Negative answer to a question message
    ReplyNo,
    /// The caller should fall back to its default behaviour
    ReplyDefault,
    /// The action failed
    Failed,
    /// The instance handle passed in was invalid
    BadHandle,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Ok => write!(f, "OK"),
            ActionStatus::ReplyYes => write!(f, "ReplyYes"),
            ActionStatus::ReplyNo => write!(f, "ReplyNo"),
            ActionStatus::ReplyDefault => write!(f, "ReplyDefault"),
            ActionStatus::Failed => write!(f, "Failed"),
            ActionStatus::BadHandle => write!(f, "BadHandle"),
        }
    }
}

/// Message classification used by both persistent and transient messaging
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Unrecoverable error, shown to the user
    Fatal,
    /// Error, shown to the user
    Error,
    /// Warning, shown to the user
    Warning,
    /// Informational, shown to the user
    Info,
    /// Routed to the process-wide log sink, never surfaced
    Log,
    /// Expects a yes/no answer from the user
    Question,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Fatal => write!(f, "fatal"),
            MessageKind::Error => write!(f, "error"),
            MessageKind::Warning => write!(f, "warning"),
            MessageKind::Info => write!(f, "info"),
            MessageKind::Log => write!(f, "log"),
            MessageKind::Question => write!(f, "question"),
        }
    }
}

// Action names the host dispatches into plugin code.
pub const ACTION_CREATE_INSTANCE: &str = "createInstance";
pub const ACTION_DESTROY_INSTANCE: &str = "destroyInstance";
pub const ACTION_INSTANCE_CHANGED: &str = "instanceChanged";
pub const ACTION_GET_CLIP_PREFERENCES: &str = "getClipPreferences";
pub const ACTION_RENDER: &str = "render";

// Per-clip negotiation output properties, scoped as `<base>_<clipName>`.
pub const PROP_CLIP_BIT_DEPTH: &str = "ImageClipBitDepth";
pub const PROP_CLIP_COMPONENTS: &str = "ImageClipComponents";
pub const PROP_CLIP_PIXEL_ASPECT: &str = "ImageClipPixelAspect";

// Effect-level negotiation output properties, unscoped.
pub const PROP_EFFECT_FRAME_RATE: &str = "ImageEffectFrameRate";
pub const PROP_EFFECT_FIELDING: &str = "ImageEffectFielding";
pub const PROP_EFFECT_PREMULT: &str = "ImageEffectPreMultiplication";
pub const PROP_EFFECT_CONTINUOUS: &str = "ImageClipContinuousSamples";
pub const PROP_EFFECT_FRAME_VARYING: &str = "ImageEffectFrameVarying";

// Component layouts and bit depths, as spelled on the wire.
pub const COMPONENTS_RGBA: &str = "RGBA";
pub const COMPONENTS_RGB: &str = "RGB";
pub const COMPONENTS_ALPHA: &str = "Alpha";
pub const COMPONENTS_NONE: &str = "None";
pub const BIT_DEPTH_BYTE: &str = "Byte";
pub const BIT_DEPTH_SHORT: &str = "Short";
pub const BIT_DEPTH_FLOAT: &str = "Float";

// Fielding and premultiplication states.
pub const FIELDING_NONE: &str = "none";
pub const FIELDING_LOWER: &str = "lower";
pub const FIELDING_UPPER: &str = "upper";
pub const PREMULT_OPAQUE: &str = "opaque";
pub const PREMULT_PREMULTIPLIED: &str = "premultiplied";
pub const PREMULT_UNPREMULTIPLIED: &str = "unpremultiplied";

/// Build a per-clip output property key following the standard's
/// `<BasePropertyName>_<clipName>` convention
pub fn clip_scoped_key(base: &str, clip_name: &str) -> String {
    format!("{}_{}", base, clip_name)
}

/// A single dynamically-typed property value
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    Str(String),
    IntList(Vec<i64>),
    DoubleList(Vec<f64>),
    StrList(Vec<String>),
}

impl PropertyValue {
    fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "int",
            PropertyValue::Double(_) => "double",
            PropertyValue::Str(_) => "string",
            PropertyValue::IntList(_) => "int list",
            PropertyValue::DoubleList(_) => "double list",
            PropertyValue::StrList(_) => "string list",
        }
    }
}

/// Error raised by typed property access
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyError {
    /// No property with that name
    NotFound(String),
    /// Property exists but holds another type
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::NotFound(key) => write!(f, "property not found: {}", key),
            PropertyError::WrongType {
                key,
                expected,
                found,
            } => write!(
                f,
                "property {} holds a {} where a {} was expected",
                key, found, expected
            ),
        }
    }
}

impl std::error::Error for PropertyError {}

/// String-keyed, dynamically-typed property bag used for action in/out
/// arguments
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertySet {
    values: HashMap<String, PropertyValue>,
}

impl PropertySet {
    /// Create an empty property set
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), PropertyValue::Int(value));
    }

    pub fn set_double(&mut self, key: &str, value: f64) {
        self.values
            .insert(key.to_string(), PropertyValue::Double(value));
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_string(), PropertyValue::Str(value.to_string()));
    }

    pub fn set_int_list(&mut self, key: &str, value: Vec<i64>) {
        self.values
            .insert(key.to_string(), PropertyValue::IntList(value));
    }

    pub fn set_double_list(&mut self, key: &str, value: Vec<f64>) {
        self.values
            .insert(key.to_string(), PropertyValue::DoubleList(value));
    }

    pub fn set_string_list(&mut self, key: &str, value: Vec<String>) {
        self.values
            .insert(key.to_string(), PropertyValue::StrList(value));
    }

    fn get(&self, key: &str) -> Result<&PropertyValue, PropertyError> {
        self.values
            .get(key)
            .ok_or_else(|| PropertyError::NotFound(key.to_string()))
    }

    pub fn get_int(&self, key: &str) -> Result<i64, PropertyError> {
        match self.get(key)? {
            PropertyValue::Int(v) => Ok(*v),
            other => Err(PropertyError::WrongType {
                key: key.to_string(),
                expected: "int",
                found: other.type_name(),
            }),
        }
    }

    pub fn get_double(&self, key: &str) -> Result<f64, PropertyError> {
        match self.get(key)? {
            PropertyValue::Double(v) => Ok(*v),
            other => Err(PropertyError::WrongType {
                key: key.to_string(),
                expected: "double",
                found: other.type_name(),
            }),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<String, PropertyError> {
        match self.get(key)? {
            PropertyValue::Str(v) => Ok(v.clone()),
            other => Err(PropertyError::WrongType {
                key: key.to_string(),
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    pub fn get_int_list(&self, key: &str) -> Result<Vec<i64>, PropertyError> {
        match self.get(key)? {
            PropertyValue::IntList(v) => Ok(v.clone()),
            other => Err(PropertyError::WrongType {
                key: key.to_string(),
                expected: "int list",
                found: other.type_name(),
            }),
        }
    }

    pub fn get_double_list(&self, key: &str) -> Result<Vec<f64>, PropertyError> {
        match self.get(key)? {
            PropertyValue::DoubleList(v) => Ok(v.clone()),
            other => Err(PropertyError::WrongType {
                key: key.to_string(),
                expected: "double list",
                found: other.type_name(),
            }),
        }
    }

    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>, PropertyError> {
        match self.get(key)? {
            PropertyValue::StrList(v) => Ok(v.clone()),
            other => Err(PropertyError::WrongType {
                key: key.to_string(),
                expected: "string list",
                found: other.type_name(),
            }),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Errors raised by the effect-hosting subsystem
#[derive(Debug)]
pub enum HostError {
    /// A declarative parameter declaration named a type tag outside the
    /// standard's closed set
    UnsupportedParamType(String),
    /// A parametric parameter's default curves could not be built
    CurveInitialization(String),
    /// Typed property access failed
    Property(PropertyError),
    /// The effect descriptor is malformed
    InvalidDescriptor(String),
    /// No registered effect with that identifier
    EffectNotFound(String),
    /// An effect with that identifier is already registered
    DuplicateEffect(String),
    /// A mandatory action returned a failure status
    ActionFailed {
        action: String,
        status: ActionStatus,
    },
    /// Plugin memory request could not be satisfied
    OutOfMemory { label: String, bytes: usize },
    /// IO error
    IoError(std::io::Error),
    /// Serialization error
    SerdeError(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::UnsupportedParamType(tag) => {
                write!(f, "unsupported parameter type tag: {}", tag)
            }
            HostError::CurveInitialization(param) => write!(
                f,
                "parameter {} failed to build curves from its plugin-supplied defaults",
                param
            ),
            HostError::Property(e) => write!(f, "property error: {}", e),
            HostError::InvalidDescriptor(msg) => write!(f, "invalid effect descriptor: {}", msg),
            HostError::EffectNotFound(id) => write!(f, "effect not found: {}", id),
            HostError::DuplicateEffect(id) => write!(f, "effect already registered: {}", id),
            HostError::ActionFailed { action, status } => {
                write!(f, "action {} failed with status {}", action, status)
            }
            HostError::OutOfMemory { label, bytes } => {
                write!(f, "{} failed to allocate {} bytes", label, bytes)
            }
            HostError::IoError(e) => write!(f, "IO error: {}", e),
            HostError::SerdeError(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::IoError(e)
    }
}

impl From<PropertyError> for HostError {
    fn from(e: PropertyError) -> Self {
        HostError::Property(e)
    }
}

/// Result type for hosting operations
pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", ActionStatus::Ok), "OK");
        assert_eq!(format!("{}", ActionStatus::ReplyDefault), "ReplyDefault");
        assert_eq!(format!("{}", ActionStatus::BadHandle), "BadHandle");
    }

    #[test]
    fn test_clip_scoped_key() {
        assert_eq!(
            clip_scoped_key(PROP_CLIP_COMPONENTS, "Output"),
            "ImageClipComponents_Output"
        );
        assert_eq!(
            clip_scoped_key(PROP_CLIP_PIXEL_ASPECT, "Source"),
            "ImageClipPixelAspect_Source"
        );
    }

    #[test]
    fn test_property_set_typed_access() {
        let mut props = PropertySet::new();
        props.set_int("frames", 240);
        props.set_double("rate", 24.0);
        props.set_string("fielding", FIELDING_NONE);
        props.set_double_list("scale", vec![1.0, 1.0]);

        assert_eq!(props.get_int("frames").unwrap(), 240);
        assert_eq!(props.get_double("rate").unwrap(), 24.0);
        assert_eq!(props.get_string("fielding").unwrap(), "none");
        assert_eq!(props.get_double_list("scale").unwrap(), vec![1.0, 1.0]);

        // Missing key
        assert_eq!(
            props.get_int("missing"),
            Err(PropertyError::NotFound("missing".to_string()))
        );

        // Type mismatch
        assert!(matches!(
            props.get_int("rate"),
            Err(PropertyError::WrongType { .. })
        ));
    }

    #[test]
    fn test_property_set_overwrite() {
        let mut props = PropertySet::new();
        props.set_int("x", 1);
        props.set_int("x", 2);
        assert_eq!(props.get_int("x").unwrap(), 2);
        assert_eq!(props.len(), 1);

        assert!(props.remove("x"));
        assert!(props.is_empty());
    }
}
