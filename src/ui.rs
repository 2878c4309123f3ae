//! Host UI surface
//!
//! Hosted effects talk to the user through a narrow trait: one-shot
//! messages, progress reporting, and the out-of-memory dialog. The GUI
//! implements it with real widgets; `HeadlessUi` covers the CLI and tests.
//!
//! Log-kind plugin messages never reach the user; they go to the
//! process-wide `MessageLog`.

use crate::effect_host::types::MessageKind;
use crate::memory::format_bytes;
use lazy_static::lazy_static;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Answer to a Question-kind transient message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageReply {
    Yes,
    No,
}

/// What the host application must provide for hosted effects to talk to
/// the user
pub trait HostUi: Send + Sync {
    /// Present a one-shot message. Question-kind messages expect an answer;
    /// for every other kind the reply is ignored.
    fn transient_message(&self, kind: MessageKind, text: &str) -> MessageReply;

    /// Tell the user an effect could not get the memory it asked for
    fn out_of_memory(&self, label: &str, bytes: usize);

    /// A long-running operation began
    fn progress_start(&self, label: &str, message: &str);

    /// Report completion in [0, 1]. Returning `false` asks the operation to
    /// stop; the plugin is expected to poll and abandon its work.
    fn progress_update(&self, label: &str, fraction: f64) -> bool;

    /// The long-running operation finished
    fn progress_end(&self, label: &str);
}

/// UI surface for the CLI and tests: logs everything, answers yes, never
/// asks to abort
pub struct HeadlessUi;

impl HostUi for HeadlessUi {
    fn transient_message(&self, kind: MessageKind, text: &str) -> MessageReply {
        match kind {
            MessageKind::Fatal | MessageKind::Error => error!("{}", text),
            MessageKind::Warning => warn!("{}", text),
            _ => info!("{}", text),
        }
        MessageReply::Yes
    }

    fn out_of_memory(&self, label: &str, bytes: usize) {
        error!(
            "Out of memory: {} failed to allocate memory ({})",
            label,
            format_bytes(bytes)
        );
    }

    fn progress_start(&self, label: &str, message: &str) {
        info!("{}: {}", label, message);
    }

    fn progress_update(&self, _label: &str, _fraction: f64) -> bool {
        true
    }

    fn progress_end(&self, label: &str) {
        info!("{}: done", label);
    }
}

lazy_static! {
    static ref MESSAGE_LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());
}

/// Process-wide sink for Log-kind plugin messages
pub struct MessageLog;

impl MessageLog {
    /// Append a line; also mirrored to the tracing output
    pub fn write(line: &str) {
        info!(target: "plugin_log", "{}", line);
        MESSAGE_LOG.lock().unwrap().push(line.to_string());
    }

    /// Copy of the accumulated lines
    pub fn snapshot() -> Vec<String> {
        MESSAGE_LOG.lock().unwrap().clone()
    }

    /// Drain the accumulated lines
    pub fn take() -> Vec<String> {
        std::mem::take(&mut *MESSAGE_LOG.lock().unwrap())
    }

    pub fn clear() {
        MESSAGE_LOG.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_ui_answers_yes() {
        let ui = HeadlessUi;
        assert_eq!(
            ui.transient_message(MessageKind::Question, "overwrite?"),
            MessageReply::Yes
        );
        assert!(ui.progress_update("fx", 0.5));
    }

    #[test]
    fn test_message_log_accumulates() {
        // The sink is process-wide and other tests may write concurrently,
        // so only assert on our own lines.
        MessageLog::write("ui_test: pass 1 of 2");
        MessageLog::write("ui_test: pass 2 of 2");

        let lines = MessageLog::snapshot();
        assert!(lines.iter().any(|l| l.contains("ui_test: pass 1")));
        assert!(lines.iter().any(|l| l.contains("ui_test: pass 2")));
    }
}
