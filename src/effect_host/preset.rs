//! Effect presets
//!
//! Human-readable TOML snapshots of an effect's knob values, designed for
//! version control. Only persistent knobs are captured; opaque custom
//! payloads are base64-encoded so arbitrary plugin state survives the text
//! format. Parametric curves are plugin-authored defaults and are not
//! captured.

use super::instance::EffectInstance;
use super::types::{HostError, HostResult};
use crate::knob::KnobValue;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One captured knob value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetValue {
    Flag(bool),
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

/// Optional preset metadata
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetMetadata {
    pub author: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A preset file for one effect
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectPreset {
    /// Effect identifier this preset is for
    pub effect_id: String,
    /// Effect version, for compatibility checking
    pub effect_version: Option<String>,
    /// Captured knob values by knob name
    pub parameters: BTreeMap<String, PresetValue>,
    /// Opaque custom-knob payloads, base64 encoded
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_state: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PresetMetadata>,
}

impl EffectPreset {
    pub fn new(effect_id: &str) -> Self {
        Self {
            effect_id: effect_id.to_string(),
            effect_version: None,
            parameters: BTreeMap::new(),
            custom_state: BTreeMap::new(),
            metadata: None,
        }
    }

    /// Snapshot the persistent knobs of a live effect
    pub fn from_instance(fx: &EffectInstance) -> Self {
        let mut preset = Self::new(&fx.descriptor().id);
        preset.effect_version = Some(fx.descriptor().version.clone());

        for knob in fx.knobs() {
            let knob = knob.lock().unwrap();
            if !knob.is_persistent() {
                continue;
            }
            let name = knob.name().to_string();
            match knob.value() {
                KnobValue::Int(values) => {
                    preset.parameters.insert(name, int_values(values));
                }
                KnobValue::Double(values) => {
                    preset.parameters.insert(name, double_values(values));
                }
                KnobValue::Bool(value) => {
                    preset.parameters.insert(name, PresetValue::Flag(*value));
                }
                KnobValue::Choice { index, options } => {
                    let value = options
                        .get(*index)
                        .map(|option| PresetValue::Text(option.clone()))
                        .unwrap_or(PresetValue::Number(*index as f64));
                    preset.parameters.insert(name, value);
                }
                KnobValue::Color(values) => {
                    preset
                        .parameters
                        .insert(name, PresetValue::Numbers(values.clone()));
                }
                KnobValue::Text(value) => {
                    preset.parameters.insert(name, PresetValue::Text(value.clone()));
                }
                KnobValue::Custom(value) => {
                    preset.custom_state.insert(name, BASE64.encode(value));
                }
                KnobValue::Group { .. }
                | KnobValue::Page { .. }
                | KnobValue::Button
                | KnobValue::Parametric { .. }
                | KnobValue::Separator => {}
            }
        }
        preset
    }

    /// Restore captured values into a live effect by knob name. Returns how
    /// many knobs were updated; unknown names and mismatched shapes are
    /// skipped.
    pub fn apply_to(&self, fx: &EffectInstance) -> usize {
        let mut applied = 0;

        for (name, value) in &self.parameters {
            let Some(knob) = fx.knob(name) else {
                continue;
            };
            let mut knob = knob.lock().unwrap();
            let updated = match (value, knob.value_mut()) {
                (PresetValue::Number(n), KnobValue::Int(values)) if values.len() == 1 => {
                    values[0] = *n as i64;
                    true
                }
                (PresetValue::Numbers(ns), KnobValue::Int(values))
                    if ns.len() == values.len() =>
                {
                    for (slot, n) in values.iter_mut().zip(ns) {
                        *slot = *n as i64;
                    }
                    true
                }
                (PresetValue::Number(n), KnobValue::Double(values)) if values.len() == 1 => {
                    values[0] = *n;
                    true
                }
                (PresetValue::Numbers(ns), KnobValue::Double(values))
                    if ns.len() == values.len() =>
                {
                    values.copy_from_slice(ns);
                    true
                }
                (PresetValue::Flag(flag), KnobValue::Bool(value)) => {
                    *value = *flag;
                    true
                }
                (PresetValue::Text(text), KnobValue::Choice { index, options }) => {
                    match options.iter().position(|option| option == text) {
                        Some(found) => {
                            *index = found;
                            true
                        }
                        None => false,
                    }
                }
                (PresetValue::Number(n), KnobValue::Choice { index, options })
                    if (*n as usize) < options.len() =>
                {
                    *index = *n as usize;
                    true
                }
                (PresetValue::Numbers(ns), KnobValue::Color(values))
                    if ns.len() == values.len() =>
                {
                    values.copy_from_slice(ns);
                    true
                }
                (PresetValue::Text(text), KnobValue::Text(value)) => {
                    *value = text.clone();
                    true
                }
                _ => false,
            };
            if updated {
                applied += 1;
            }
        }

        for (name, encoded) in &self.custom_state {
            let Some(knob) = fx.knob(name) else {
                continue;
            };
            let Ok(bytes) = BASE64.decode(encoded) else {
                continue;
            };
            let Ok(payload) = String::from_utf8(bytes) else {
                continue;
            };
            let mut knob = knob.lock().unwrap();
            if let KnobValue::Custom(value) = knob.value_mut() {
                *value = payload;
                applied += 1;
            }
        }
        applied
    }

    /// Parse from TOML text
    pub fn parse(content: &str) -> HostResult<Self> {
        toml::from_str(content).map_err(|e| HostError::SerdeError(e.to_string()))
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> HostResult<String> {
        toml::to_string_pretty(self).map_err(|e| HostError::SerdeError(e.to_string()))
    }

    pub fn load(path: &Path) -> HostResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn save(&self, path: &Path) -> HostResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

fn int_values(values: &[i64]) -> PresetValue {
    if values.len() == 1 {
        PresetValue::Number(values[0] as f64)
    } else {
        PresetValue::Numbers(values.iter().map(|&v| v as f64).collect())
    }
}

fn double_values(values: &[f64]) -> PresetValue {
    if values.len() == 1 {
        PresetValue::Number(values[0])
    } else {
        PresetValue::Numbers(values.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_host::mock_plugin::MockBlur;
    use crate::project::Project;
    use crate::ui::HeadlessUi;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn make_test_instance() -> EffectInstance {
        EffectInstance::new(
            Box::new(MockBlur::new()),
            Arc::new(Project::new()),
            Arc::new(HeadlessUi),
            "blur1",
        )
        .unwrap()
    }

    #[test]
    fn test_capture_skips_non_persistent_knobs() {
        let fx = make_test_instance();
        let preset = EffectPreset::from_instance(&fx);

        assert_eq!(preset.effect_id, MockBlur::ID);
        assert!(preset.parameters.contains_key("size"));
        assert!(preset.parameters.contains_key("channels"));
        // Containers, buttons and separators hold nothing worth saving
        assert!(!preset.parameters.contains_key("controls"));
        assert!(!preset.parameters.contains_key("advanced"));
        assert!(!preset.parameters.contains_key("apply"));
        assert!(!preset.parameters.contains_key("size_separator"));
        // Custom payloads travel separately, encoded
        assert!(preset.custom_state.contains_key("state_blob"));
        assert!(!preset.parameters.contains_key("state_blob"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let fx = make_test_instance();

        // Change some values, snapshot, reset, re-apply
        {
            let knob = fx.knob("size").unwrap();
            let mut knob = knob.lock().unwrap();
            if let KnobValue::Double(values) = knob.value_mut() {
                values[0] = 7.5;
            }
        }
        {
            let knob = fx.knob("channels").unwrap();
            let mut knob = knob.lock().unwrap();
            if let KnobValue::Choice { index, .. } = knob.value_mut() {
                *index = 2;
            }
        }
        {
            let knob = fx.knob("state_blob").unwrap();
            let mut knob = knob.lock().unwrap();
            if let KnobValue::Custom(value) = knob.value_mut() {
                *value = "v1;42;teapot".to_string();
            }
        }

        let toml_text = EffectPreset::from_instance(&fx).to_toml().unwrap();
        assert!(toml_text.contains("size = 7.5"));
        assert!(toml_text.contains("channels = \"Alpha\""));

        let restored = EffectPreset::parse(&toml_text).unwrap();
        let fresh = make_test_instance();
        let applied = restored.apply_to(&fresh);
        assert!(applied >= 3);

        let size = fresh.knob("size").unwrap();
        assert!(matches!(
            size.lock().unwrap().value(),
            KnobValue::Double(v) if v[0] == 7.5
        ));
        let channels = fresh.knob("channels").unwrap();
        assert!(matches!(
            channels.lock().unwrap().value(),
            KnobValue::Choice { index: 2, .. }
        ));
        let blob = fresh.knob("state_blob").unwrap();
        assert!(matches!(
            blob.lock().unwrap().value(),
            KnobValue::Custom(v) if v == "v1;42;teapot"
        ));
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let fx = make_test_instance();
        let mut preset = EffectPreset::new(MockBlur::ID);
        preset
            .parameters
            .insert("ghost".to_string(), PresetValue::Number(1.0));
        assert_eq!(preset.apply_to(&fx), 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("soft_blur.toml");

        let fx = make_test_instance();
        let preset = EffectPreset::from_instance(&fx);
        preset.save(&path).unwrap();

        let loaded = EffectPreset::load(&path).unwrap();
        assert_eq!(loaded.effect_id, preset.effect_id);
        assert_eq!(loaded.parameters, preset.parameters);
        assert_eq!(loaded.custom_state, preset.custom_state);
    }
}
