use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crossterm::event::{KeyEvent, MouseEvent};

use crate::model::Plan;
use crate::ops::comments::TocEntry;
use crate::render::RenderedDoc;

/// Every input the event loop consumes: terminal events forwarded by the
/// input thread, and typed results posted back by background tasks.
/// Variants carrying an `id` use generation counters so stale timers are
/// ignored instead of cancelled.
#[derive(Debug, Clone)]
pub enum Msg {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),

    /// Rendered preview for the cache
    PlanContent { path: String, doc: Arc<RenderedDoc> },
    /// Before/after plan for a single status change (drives undo)
    StatusUpdated { old: Box<Plan>, new: Box<Plan> },
    LabelsUpdated { plan: Box<Plan> },
    /// Full plan list replacement after delete or external rescan
    Reload { plans: Vec<Plan> },
    /// Batch status/label result with a status-bar summary
    BatchDone {
        plans: Vec<Plan>,
        paths: Vec<String>,
        message: String,
    },
    /// Coalesced watcher batch (base filenames of changed .md files)
    FilesChanged { files: Vec<String> },
    /// Rescan triggered by a watcher batch; carries the changed names
    Rescanned {
        plans: Vec<Plan>,
        changed: Vec<String>,
    },
    /// The setup wizard finished; reload configuration
    ConfigUpdated,

    UndoExpired { id: u64 },
    BatchLingerExpired { id: u64 },
    StatusClear { id: u64 },
    NotificationClear { id: u64 },
    CopiedClear { id: u64 },
    ChangedSpinExpired { id: u64 },
    SpinnerTick,
    LabelFlashTick,
    DemoScriptTick { id: u64 },

    /// Comment mode loaded: body, rendering, and mapped ToC
    CommentLoaded {
        path: String,
        raw_body: String,
        doc: Arc<RenderedDoc>,
        toc: Vec<TocEntry>,
    },
    /// A comment write completed; same payload so the view refreshes
    CommentSaved {
        path: String,
        raw_body: String,
        doc: Arc<RenderedDoc>,
        toc: Vec<TocEntry>,
    },

    UpdateAvailable { version: String, url: String },
    ReleaseNotes { version: String, markdown: String },
    /// Combined result of the startup update + release-notes checks
    StartupUpdate {
        update: Option<(String, String)>,
        release_notes: Option<(String, String)>,
    },
    EditorLaunched,

    Error(String),
}

/// A deferred I/O task. Executes off the event loop and posts at most one
/// message back. Commands own their inputs; they never borrow model state.
pub type Cmd = Box<dyn FnOnce() -> Option<Msg> + Send + 'static>;

/// A timer command: sleep, then deliver the message. Obsolescence is
/// handled at the arrival site via the generation id carried in `msg`.
pub fn tick(after: Duration, msg: Msg) -> Cmd {
    Box::new(move || {
        thread::sleep(after);
        Some(msg)
    })
}

/// Run commands on their own threads, posting results into the fan-in
/// channel. Send failures mean the loop is gone; tasks just finish.
pub fn spawn_all(cmds: Vec<Cmd>, tx: &Sender<Msg>) {
    for cmd in cmds {
        let tx = tx.clone();
        thread::spawn(move || {
            if let Some(msg) = cmd() {
                let _ = tx.send(msg);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_spawn_all_posts_results() {
        let (tx, rx) = mpsc::channel();
        let cmds: Vec<Cmd> = vec![
            Box::new(|| Some(Msg::EditorLaunched)),
            Box::new(|| None),
            Box::new(|| Some(Msg::ConfigUpdated)),
        ];
        spawn_all(cmds, &tx);
        drop(tx);
        let got: Vec<Msg> = rx.iter().collect();
        // two messages, in either order; the None task posts nothing
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_tick_carries_message() {
        let cmd = tick(Duration::from_millis(1), Msg::UndoExpired { id: 7 });
        match cmd() {
            Some(Msg::UndoExpired { id }) => assert_eq!(id, 7),
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
