//! Effect Host Module
//!
//! Hosts third-party image-effect plugins: turns their declarative
//! parameter and clip descriptors into live knobs and clips, negotiates
//! per-clip format preferences, and relays host services (timeline,
//! messaging, progress, memory) back to plugin code.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Node graph                                                 │
//! │  blur1 = Blur(Source -> Output)                             │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  EffectRegistry: register, cache, lookup                    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  EffectInstance: params, clips, dispatch, preferences       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  HostContext: timeline, messages, progress, memory          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All parameter and clip mutation happens from the effect's dispatch
//! thread; only memory accounting and the abort/overlay flags are safe to
//! touch from render workers.

pub mod bridge;
pub mod clip;
pub mod descriptor;
pub mod hierarchy;
pub mod instance;
pub mod mock_plugin;
pub mod params;
pub mod plugin;
pub mod preferences;
pub mod preset;
pub mod types;

// Re-exports for convenience
pub use bridge::{is_action_caller, ActionCallerGuard, HostContext};
pub use clip::{ClipInstance, UpstreamSource};
pub use descriptor::{
    ClipDescriptor, EffectDescriptor, InteractDescriptor, LayoutHint, ParamDescriptor, ParamKind,
};
pub use instance::{EffectInstance, ParamEditLevel};
pub use mock_plugin::MockBlur;
pub use params::ParamInstance;
pub use plugin::{EffectInfo, EffectPlugin, EffectRegistry};
pub use preferences::{ClipPrefs, EffectPrefs};
pub use preset::EffectPreset;
pub use types::{
    ActionStatus, HostError, HostResult, MessageKind, PropertyError, PropertySet,
};
