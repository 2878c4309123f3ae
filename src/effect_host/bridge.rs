//! Host Service Bridge
//!
//! `HostContext` is the per-effect bundle of host services handed to plugin
//! code at every action dispatch: project geometry, timeline access,
//! messaging, progress, abort polling, and memory allocation. It is an
//! explicit context object rather than global state, except for the two
//! pieces that are genuinely thread-scoped: the action-caller mark and the
//! render time pinned during recursive evaluation.

use super::types::*;
use crate::memory::EffectMemory;
use crate::project::Project;
use crate::rect::RectD;
use crate::timeline::SeekReason;
use crate::ui::{HostUi, MessageLog, MessageReply};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

thread_local! {
    static ACTION_CALL_DEPTH: Cell<u32> = Cell::new(0);
    static RENDER_TIME: Cell<Option<f64>> = Cell::new(None);
}

/// Marks the current thread as the plugin-action caller for its lifetime.
///
/// Reentrant dispatch nests; the mark is released on drop, including on
/// unwinds, so it can never leak past a dispatch.
pub struct ActionCallerGuard;

impl ActionCallerGuard {
    pub fn new() -> Self {
        ACTION_CALL_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Default for ActionCallerGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActionCallerGuard {
    fn drop(&mut self) {
        ACTION_CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// True while the current thread is inside a plugin action dispatch
pub fn is_action_caller() -> bool {
    ACTION_CALL_DEPTH.with(|depth| depth.get() > 0)
}

/// Render time pinned to the current thread during recursive evaluation
pub fn thread_render_time() -> Option<f64> {
    RENDER_TIME.with(|t| t.get())
}

pub fn set_thread_render_time(time: f64) {
    RENDER_TIME.with(|t| t.set(Some(time)));
}

pub fn clear_thread_render_time() {
    RENDER_TIME.with(|t| t.set(None));
}

/// Persistent message attached to an effect until cleared
pub type MessageSlot = Arc<Mutex<Option<(MessageKind, String)>>>;

/// Host services exposed to one hosted effect
pub struct HostContext {
    project: Arc<Project>,
    ui: Arc<dyn HostUi>,
    abort: Arc<AtomicBool>,
    overlay_redraw: Arc<AtomicBool>,
    message_slot: MessageSlot,
    script_name: String,
    label: String,
}

impl HostContext {
    pub fn new(project: Arc<Project>, ui: Arc<dyn HostUi>, script_name: &str, label: &str) -> Self {
        Self {
            project,
            ui,
            abort: Arc::new(AtomicBool::new(false)),
            overlay_redraw: Arc::new(AtomicBool::new(false)),
            message_slot: Arc::new(Mutex::new(None)),
            script_name: script_name.to_string(),
            label: label.to_string(),
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    // ---- project geometry -------------------------------------------------

    fn canonical_format(&self) -> RectD {
        let format = self.project.render_format();
        format.rect().to_canonical(0, format.pixel_aspect())
    }

    /// Size of the project's render window in canonical coordinates
    pub fn project_size(&self) -> (f64, f64) {
        let c = self.canonical_format();
        (c.width(), c.height())
    }

    /// Bottom-left corner of the render window in canonical coordinates
    pub fn project_offset(&self) -> (f64, f64) {
        let c = self.canonical_format();
        (c.left(), c.bottom())
    }

    /// Top-right corner of the project extent; the extent is always rooted
    /// at the origin
    pub fn project_extent(&self) -> (f64, f64) {
        let c = self.canonical_format();
        (c.right(), c.top())
    }

    pub fn project_pixel_aspect(&self) -> f64 {
        self.project.render_format().pixel_aspect()
    }

    /// Frame rate of the project the effect lives in
    pub fn frame_rate(&self) -> f64 {
        self.project.frame_rate()
    }

    // ---- timeline ---------------------------------------------------------

    /// Current frame on the shared timeline. Not necessarily the frame
    /// being rendered.
    pub fn get_time(&self) -> f64 {
        self.project.timeline().current_frame() as f64
    }

    /// Reposition the timeline. Pins the render time to this thread and
    /// drops any pending overlay redraw, since the seek forces a fresh
    /// render of the target frame. Never starts playback.
    pub fn goto_time(&self, time: f64) {
        set_thread_render_time(time);
        let _ = self.overlay_redraw.swap(false, Ordering::AcqRel);
        self.project
            .timeline()
            .seek(time as i64, SeekReason::PlaybackSeek);
    }

    /// First and last frame of the project
    pub fn timeline_bounds(&self) -> (f64, f64) {
        let (first, last) = self.project.frame_range();
        (first as f64, last as f64)
    }

    /// Frame fed to a recursive instance-changed evaluation
    pub fn frame_recursive(&self) -> f64 {
        self.project.timeline().current_frame() as f64
    }

    /// Render scale fed to a recursive evaluation: derived from the first
    /// attached viewer's mip-map level, 1.0 with no viewer attached
    pub fn render_scale_recursive(&self) -> (f64, f64) {
        match self.project.first_viewer() {
            Some(viewer) => {
                let scale = 1.0 / (1u64 << viewer.mip_map_level()) as f64;
                (scale, scale)
            }
            None => (1.0, 1.0),
        }
    }

    // ---- messaging --------------------------------------------------------

    /// Attach a persistent message to the effect. Only Error, Warning and
    /// Info kinds attach; everything else is ignored.
    pub fn set_persistent_message(&self, kind: MessageKind, text: &str) -> ActionStatus {
        match kind {
            MessageKind::Error | MessageKind::Warning | MessageKind::Info => {
                *self.message_slot.lock().unwrap() = Some((kind, text.to_string()));
            }
            _ => {}
        }
        ActionStatus::Ok
    }

    pub fn clear_persistent_message(&self) -> ActionStatus {
        *self.message_slot.lock().unwrap() = None;
        ActionStatus::Ok
    }

    pub fn persistent_message(&self) -> Option<(MessageKind, String)> {
        self.message_slot.lock().unwrap().clone()
    }

    pub fn has_persistent_message(&self) -> bool {
        self.message_slot.lock().unwrap().is_some()
    }

    /// Show a one-shot message. Question kind returns the user's answer;
    /// Log kind goes to the process-wide log sink and is never surfaced;
    /// everything else replies with the default status.
    pub fn transient_message(&self, kind: MessageKind, text: &str) -> ActionStatus {
        match kind {
            MessageKind::Log => {
                MessageLog::write(&format!("{}: {}", self.label, text));
            }
            MessageKind::Fatal | MessageKind::Error => {
                self.ui.transient_message(MessageKind::Error, text);
            }
            MessageKind::Warning => {
                self.ui.transient_message(MessageKind::Warning, text);
            }
            MessageKind::Info => {
                self.ui.transient_message(MessageKind::Info, text);
            }
            MessageKind::Question => {
                return match self.ui.transient_message(MessageKind::Question, text) {
                    MessageReply::Yes => ActionStatus::ReplyYes,
                    MessageReply::No => ActionStatus::ReplyNo,
                };
            }
        }
        ActionStatus::ReplyDefault
    }

    // ---- progress ---------------------------------------------------------

    pub fn progress_start(&self, message: &str) {
        self.ui.progress_start(&self.label, message);
    }

    /// Report progress in [0, 1]. A `false` return asks the plugin to
    /// abandon the operation; the plugin is expected to poll and stop.
    pub fn progress_update(&self, fraction: f64) -> bool {
        self.ui.progress_update(&self.label, fraction)
    }

    pub fn progress_end(&self) {
        self.ui.progress_end(&self.label);
    }

    // ---- abort ------------------------------------------------------------

    /// Cheap poll of the effect's abort flag
    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn reset_abort(&self) {
        self.abort.store(false, Ordering::Release);
    }

    // ---- overlay redraw ---------------------------------------------------

    pub fn request_overlay_redraw(&self) {
        self.overlay_redraw.store(true, Ordering::Release);
    }

    /// Consume the pending overlay-redraw request, if any
    pub fn take_overlay_redraw(&self) -> bool {
        self.overlay_redraw.swap(false, Ordering::AcqRel)
    }

    pub fn overlay_redraw_pending(&self) -> bool {
        self.overlay_redraw.load(Ordering::Acquire)
    }

    // ---- memory -----------------------------------------------------------

    /// Allocate host-accounted memory on behalf of the effect. Failure
    /// surfaces the out-of-memory dialog and is returned to the caller.
    pub fn new_memory(&self, bytes: usize) -> HostResult<EffectMemory> {
        match EffectMemory::allocate(&self.label, bytes) {
            Some(memory) => Ok(memory),
            None => {
                self.ui.out_of_memory(&self.label, bytes);
                Err(HostError::OutOfMemory {
                    label: self.label.clone(),
                    bytes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Viewer;
    use crate::rect::Format;
    use crate::ui::HeadlessUi;

    fn make_test_context() -> HostContext {
        let project = Arc::new(Project::new());
        HostContext::new(project, Arc::new(HeadlessUi), "blur1", "Blur 1")
    }

    #[test]
    fn test_action_caller_guard_nests_and_releases() {
        assert!(!is_action_caller());
        {
            let _outer = ActionCallerGuard::new();
            assert!(is_action_caller());
            {
                let _inner = ActionCallerGuard::new();
                assert!(is_action_caller());
            }
            assert!(is_action_caller());
        }
        assert!(!is_action_caller());
    }

    #[test]
    fn test_action_caller_guard_releases_on_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _guard = ActionCallerGuard::new();
            panic!("plugin blew up");
        });
        assert!(result.is_err());
        assert!(!is_action_caller());
    }

    #[test]
    fn test_project_geometry_uses_canonical_coordinates() {
        let ctx = make_test_context();
        ctx.project()
            .set_render_format(Format::new("PAL", 720, 576, 16.0 / 15.0));

        let (w, h) = ctx.project_size();
        assert!((w - 768.0).abs() < 1e-9);
        assert_eq!(h, 576.0);
        assert_eq!(ctx.project_offset(), (0.0, 0.0));
        let (ex, ey) = ctx.project_extent();
        assert!((ex - 768.0).abs() < 1e-9);
        assert_eq!(ey, 576.0);
        assert!((ctx.project_pixel_aspect() - 16.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_goto_time_round_trips_and_clears_overlay() {
        let ctx = make_test_context();
        ctx.request_overlay_redraw();
        assert!(ctx.overlay_redraw_pending());

        ctx.goto_time(42.0);
        assert_eq!(ctx.get_time(), 42.0);
        assert!(!ctx.overlay_redraw_pending());
        assert_eq!(thread_render_time(), Some(42.0));
        clear_thread_render_time();
    }

    #[test]
    fn test_timeline_bounds_follow_project() {
        let ctx = make_test_context();
        ctx.project().set_frame_range(10, 90);
        assert_eq!(ctx.timeline_bounds(), (10.0, 90.0));
    }

    #[test]
    fn test_render_scale_from_first_viewer() {
        let ctx = make_test_context();
        assert_eq!(ctx.render_scale_recursive(), (1.0, 1.0));

        ctx.project().attach_viewer(Arc::new(Viewer::new("viewer1", 2)));
        assert_eq!(ctx.render_scale_recursive(), (0.25, 0.25));
    }

    #[test]
    fn test_persistent_message_kinds() {
        let ctx = make_test_context();

        ctx.set_persistent_message(MessageKind::Warning, "odd inputs");
        assert_eq!(
            ctx.persistent_message(),
            Some((MessageKind::Warning, "odd inputs".to_string()))
        );

        // Non-attachable kinds leave the slot alone
        ctx.set_persistent_message(MessageKind::Question, "really?");
        assert_eq!(
            ctx.persistent_message(),
            Some((MessageKind::Warning, "odd inputs".to_string()))
        );

        ctx.clear_persistent_message();
        assert!(!ctx.has_persistent_message());
    }

    #[test]
    fn test_transient_message_routing() {
        let ctx = make_test_context();

        // HeadlessUi answers yes to questions
        assert_eq!(
            ctx.transient_message(MessageKind::Question, "proceed?"),
            ActionStatus::ReplyYes
        );
        assert_eq!(
            ctx.transient_message(MessageKind::Error, "bad frame"),
            ActionStatus::ReplyDefault
        );

        assert_eq!(
            ctx.transient_message(MessageKind::Log, "pass 1 done"),
            ActionStatus::ReplyDefault
        );
        // Routed to the process-wide sink, never surfaced
        let lines = MessageLog::snapshot();
        assert!(lines.iter().any(|l| l.contains("pass 1 done")));
    }

    #[test]
    fn test_abort_is_polled() {
        let ctx = make_test_context();
        assert!(!ctx.aborted());
        ctx.request_abort();
        assert!(ctx.aborted());
        ctx.reset_abort();
        assert!(!ctx.aborted());
    }

    #[test]
    fn test_memory_through_host_accounting() {
        let ctx = make_test_context();
        let memory = ctx.new_memory(1024).unwrap();
        assert_eq!(memory.len(), 1024);
        assert_eq!(memory.label(), "Blur 1");
    }
}
