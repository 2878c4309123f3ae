//! Project state shared with hosted effects
//!
//! Holds what hosted effects query from the host side: frame rate, frame
//! range, the render format, the timeline, and the viewers currently
//! attached to the project. Shared across threads behind `Arc`.

use crate::config::HostConfig;
use crate::rect::Format;
use crate::timeline::Timeline;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// A viewer attached to the project, with its resolution reduction level
#[derive(Debug)]
pub struct Viewer {
    name: String,
    mip_map_level: AtomicU32,
}

impl Viewer {
    pub fn new(name: &str, mip_map_level: u32) -> Self {
        Self {
            name: name.to_string(),
            mip_map_level: AtomicU32::new(mip_map_level),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mip_map_level(&self) -> u32 {
        self.mip_map_level.load(Ordering::Acquire)
    }

    pub fn set_mip_map_level(&self, level: u32) {
        self.mip_map_level.store(level, Ordering::Release);
    }
}

/// Shared project state
pub struct Project {
    frame_rate: Mutex<f64>,
    frame_range: Mutex<(i64, i64)>,
    render_format: Mutex<Format>,
    timeline: Arc<Timeline>,
    viewers: Mutex<Vec<Arc<Viewer>>>,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config(&HostConfig::default())
    }

    pub fn with_config(config: &HostConfig) -> Self {
        Self {
            frame_rate: Mutex::new(config.frame_rate),
            frame_range: Mutex::new((1, 250)),
            render_format: Mutex::new(config.render_format()),
            timeline: Arc::new(Timeline::new(1)),
            viewers: Mutex::new(Vec::new()),
        }
    }

    pub fn frame_rate(&self) -> f64 {
        *self.frame_rate.lock().unwrap()
    }

    pub fn set_frame_rate(&self, rate: f64) {
        *self.frame_rate.lock().unwrap() = rate;
    }

    /// First and last frame of the project
    pub fn frame_range(&self) -> (i64, i64) {
        *self.frame_range.lock().unwrap()
    }

    pub fn set_frame_range(&self, first: i64, last: i64) {
        *self.frame_range.lock().unwrap() = (first, last);
    }

    pub fn render_format(&self) -> Format {
        self.render_format.lock().unwrap().clone()
    }

    pub fn set_render_format(&self, format: Format) {
        *self.render_format.lock().unwrap() = format;
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn attach_viewer(&self, viewer: Arc<Viewer>) {
        self.viewers.lock().unwrap().push(viewer);
    }

    pub fn detach_viewer(&self, name: &str) -> bool {
        let mut viewers = self.viewers.lock().unwrap();
        let before = viewers.len();
        viewers.retain(|v| v.name() != name);
        viewers.len() != before
    }

    /// The first attached viewer, if any
    pub fn first_viewer(&self) -> Option<Arc<Viewer>> {
        self.viewers.lock().unwrap().first().cloned()
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.lock().unwrap().len()
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::SeekReason;

    #[test]
    fn test_project_defaults() {
        let project = Project::new();
        assert_eq!(project.frame_rate(), 24.0);
        assert_eq!(project.frame_range(), (1, 250));
        assert_eq!(project.render_format().width(), 1920);
        assert_eq!(project.viewer_count(), 0);
    }

    #[test]
    fn test_timeline_is_shared() {
        let project = Project::new();
        let timeline = Arc::clone(project.timeline());
        timeline.seek(100, SeekReason::UserSeek);
        assert_eq!(project.timeline().current_frame(), 100);
    }

    #[test]
    fn test_viewer_attachment() {
        let project = Project::new();
        project.attach_viewer(Arc::new(Viewer::new("viewer1", 2)));
        project.attach_viewer(Arc::new(Viewer::new("viewer2", 0)));

        let first = project.first_viewer().unwrap();
        assert_eq!(first.name(), "viewer1");
        assert_eq!(first.mip_map_level(), 2);

        assert!(project.detach_viewer("viewer1"));
        assert!(!project.detach_viewer("viewer1"));
        assert_eq!(project.viewer_count(), 1);
    }
}
