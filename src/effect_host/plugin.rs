//! Effect plugin trait and registry
//!
//! Plugins implement `EffectPlugin`; the registry maps effect identifiers
//! to factories and keeps a serializable metadata cache so the UI can list
//! effects without instantiating anything. Real dynamic loading of plugin
//! binaries belongs to the loading subsystem; factories here are
//! in-process.

use super::bridge::HostContext;
use super::descriptor::{EffectDescriptor, ParamKind};
use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// What a hosted image-effect plugin implements
pub trait EffectPlugin: Send {
    /// Declarative description of the effect's parameters and clips.
    /// Called once per instantiation; the result is immutable.
    fn describe(&self) -> EffectDescriptor;

    /// Dispatch a named action. `host` carries the services the plugin may
    /// call back into. Status codes are relayed verbatim by the host.
    fn action(
        &mut self,
        host: &HostContext,
        action: &str,
        in_args: Option<&PropertySet>,
        out_args: Option<&mut PropertySet>,
    ) -> ActionStatus;
}

/// Factory producing fresh plugin instances
pub type EffectFactory = Box<dyn Fn() -> Box<dyn EffectPlugin> + Send + Sync>;

/// One parameter as recorded in the metadata cache
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSummary {
    pub name: String,
    pub tag: String,
}

/// Serializable effect metadata shown in registries and the CLI
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectInfo {
    pub id: String,
    pub label: String,
    pub version: String,
    pub grouping: String,
    pub description: String,
    pub params: Vec<ParamSummary>,
    pub clips: Vec<String>,
}

impl EffectInfo {
    pub fn from_descriptor(desc: &EffectDescriptor) -> Self {
        Self {
            id: desc.id.clone(),
            label: desc.label.clone(),
            version: desc.version.clone(),
            grouping: desc.grouping.clone(),
            description: desc.description.clone(),
            params: desc
                .params
                .iter()
                .map(|p| ParamSummary {
                    name: p.name.clone(),
                    tag: p.kind.tag().to_string(),
                })
                .collect(),
            clips: desc.clips.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

struct RegisteredEffect {
    info: EffectInfo,
    factory: Option<EffectFactory>,
}

/// Registry of hostable effects
#[derive(Default)]
pub struct EffectRegistry {
    by_id: HashMap<String, RegisteredEffect>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
        }
    }

    /// Register an effect factory. The factory is probed once for its
    /// descriptor, which must validate. A cache-only entry under the same
    /// id is replaced; a second factory is a duplicate.
    pub fn register(&mut self, factory: EffectFactory) -> HostResult<()> {
        let descriptor = factory().describe();
        descriptor.validate()?;
        let info = EffectInfo::from_descriptor(&descriptor);
        if let Some(existing) = self.by_id.get(&info.id) {
            if existing.factory.is_some() {
                return Err(HostError::DuplicateEffect(info.id));
            }
        }
        self.by_id.insert(
            info.id.clone(),
            RegisteredEffect {
                info,
                factory: Some(factory),
            },
        );
        Ok(())
    }

    /// Instantiate a fresh plugin for the given effect id
    pub fn create(&self, id: &str) -> HostResult<Box<dyn EffectPlugin>> {
        let registered = self
            .by_id
            .get(id)
            .ok_or_else(|| HostError::EffectNotFound(id.to_string()))?;
        match &registered.factory {
            Some(factory) => Ok(factory()),
            // Cache-only entries carry metadata but no way to instantiate
            None => Err(HostError::EffectNotFound(id.to_string())),
        }
    }

    /// Find by id, then case-insensitive label, then prefix, then substring
    pub fn find(&self, name: &str) -> Option<&EffectInfo> {
        if let Some(registered) = self.by_id.get(name) {
            return Some(&registered.info);
        }

        let name_lower = name.to_lowercase();
        if let Some(registered) = self
            .by_id
            .values()
            .find(|r| r.info.label.to_lowercase() == name_lower)
        {
            return Some(&registered.info);
        }
        if let Some(registered) = self
            .by_id
            .values()
            .find(|r| r.info.label.to_lowercase().starts_with(&name_lower))
        {
            return Some(&registered.info);
        }
        self.by_id
            .values()
            .find(|r| r.info.label.to_lowercase().contains(&name_lower))
            .map(|r| &r.info)
    }

    /// All effects whose id or label contains the pattern
    pub fn search(&self, pattern: &str) -> Vec<&EffectInfo> {
        let pattern_lower = pattern.to_lowercase();
        let mut results: Vec<&EffectInfo> = self
            .by_id
            .values()
            .filter(|r| {
                r.info.id.to_lowercase().contains(&pattern_lower)
                    || r.info.label.to_lowercase().contains(&pattern_lower)
            })
            .map(|r| &r.info)
            .collect();
        results.sort_by(|a, b| a.id.cmp(&b.id));
        results
    }

    /// All registered effects, sorted by id
    pub fn list(&self) -> Vec<&EffectInfo> {
        let mut infos: Vec<&EffectInfo> = self.by_id.values().map(|r| &r.info).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Load cached metadata. Cached entries cannot be instantiated until a
    /// factory re-registers under the same id; entries with unknown
    /// parameter tags are skipped. Returns the number of entries loaded.
    pub fn load_cache(&mut self, path: &Path) -> HostResult<usize> {
        if !path.exists() {
            return Ok(0);
        }
        let data = std::fs::read_to_string(path)?;
        let infos: Vec<EffectInfo> =
            serde_json::from_str(&data).map_err(|e| HostError::SerdeError(e.to_string()))?;

        let mut loaded = 0;
        for info in infos {
            if let Some(bad) = info
                .params
                .iter()
                .find(|p| ParamKind::from_tag(&p.tag).is_err())
            {
                warn!(
                    effect = %info.id,
                    param = %bad.name,
                    tag = %bad.tag,
                    "skipping cached effect with unknown parameter tag"
                );
                continue;
            }
            if !self.by_id.contains_key(&info.id) {
                self.by_id.insert(
                    info.id.clone(),
                    RegisteredEffect {
                        info,
                        factory: None,
                    },
                );
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Save the metadata cache
    pub fn save_cache(&self, path: &Path) -> HostResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let infos: Vec<&EffectInfo> = self.list();
        let data = serde_json::to_string_pretty(&infos)
            .map_err(|e| HostError::SerdeError(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_host::mock_plugin::MockBlur;
    use tempfile::tempdir;

    fn make_test_registry() -> EffectRegistry {
        let mut registry = EffectRegistry::new();
        registry
            .register(Box::new(|| Box::new(MockBlur::new())))
            .unwrap();
        registry
    }

    #[test]
    fn test_register_and_create() {
        let registry = make_test_registry();
        assert_eq!(registry.len(), 1);
        assert!(registry.create(MockBlur::ID).is_ok());
        assert!(registry.create("photon.absent").is_err());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = make_test_registry();
        let err = registry
            .register(Box::new(|| Box::new(MockBlur::new())))
            .unwrap_err();
        assert!(matches!(err, HostError::DuplicateEffect(_)));
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let registry = make_test_registry();
        assert!(registry.find(MockBlur::ID).is_some());
        assert!(registry.find("mockblur").is_some());
        assert!(registry.find("mock").is_some()); // prefix
        assert!(registry.find("nothing-here").is_none());
    }

    #[test]
    fn test_search_matches_id_and_label() {
        let registry = make_test_registry();
        assert_eq!(registry.search("blur").len(), 1);
        assert_eq!(registry.search("photon.mock").len(), 1);
        assert!(registry.search("sharpen").is_empty());
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("effects.json");

        let registry = make_test_registry();
        registry.save_cache(&path).unwrap();

        let mut restored = EffectRegistry::new();
        assert_eq!(restored.load_cache(&path).unwrap(), 1);
        let info = restored.find(MockBlur::ID).unwrap();
        assert_eq!(info.label, "MockBlur");
        assert!(!info.params.is_empty());

        // Metadata came back, but nothing can be instantiated from it
        assert!(restored.create(MockBlur::ID).is_err());

        // A factory re-registering under the cached id takes over
        restored
            .register(Box::new(|| Box::new(MockBlur::new())))
            .unwrap();
        assert!(restored.create(MockBlur::ID).is_ok());
    }

    #[test]
    fn test_cache_skips_unknown_tags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("effects.json");
        let data = r#"[{
            "id": "photon.bad",
            "label": "Bad",
            "version": "1.0.0",
            "grouping": "",
            "description": "",
            "params": [{"name": "curve", "tag": "Bezier"}],
            "clips": ["Output"]
        }]"#;
        std::fs::write(&path, data).unwrap();

        let mut registry = EffectRegistry::new();
        assert_eq!(registry.load_cache(&path).unwrap(), 0);
        assert!(registry.is_empty());
    }
}
