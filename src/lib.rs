//! # Photon - Compositing Effect Host
//!
//! Photon is the effect-hosting core of a node-based compositing engine.
//! It loads third-party image-effect plugins, bridges their declared
//! parameters into the application's knob system, negotiates per-clip
//! format preferences, and exposes the host services (timeline, messaging,
//! progress, memory) plugin code calls back into.
//!
//! ## Core pieces
//!
//! - **Knobs**: the host's live parameters, shared between the adapter and
//!   the rest of the application
//! - **EffectRegistry**: registered effect factories plus a serializable
//!   metadata cache
//! - **EffectInstance**: one hosted plugin with its parameters, clips and
//!   preference negotiation
//! - **HostContext**: the services handed to plugin code at every dispatch
//!
//! ## Quick start
//!
//! ```rust
//! use photon::effect_host::{EffectInstance, MockBlur};
//! use photon::project::Project;
//! use photon::ui::HeadlessUi;
//! use std::sync::Arc;
//!
//! let project = Arc::new(Project::new());
//! let fx = EffectInstance::new(
//!     Box::new(MockBlur::new()),
//!     project,
//!     Arc::new(HeadlessUi),
//!     "blur1",
//! )
//! .unwrap();
//!
//! // The plugin's declared parameters are live knobs now
//! let size = fx.knob("size").unwrap();
//! assert_eq!(size.lock().unwrap().label(), "Size");
//! ```

pub mod config;
pub mod effect_host;
pub mod knob;
pub mod memory;
pub mod project;
pub mod rect;
pub mod timeline;
pub mod ui;
