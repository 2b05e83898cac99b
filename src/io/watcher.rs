use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::msg::{Cmd, Msg};

/// Milliseconds since epoch of the last write this process made to a plan
/// file. The watcher drops event batches that arrive within
/// [`SELF_WRITE_WINDOW`] of it, so our own writes don't echo back as
/// external changes.
static LAST_SELF_WRITE: AtomicI64 = AtomicI64::new(0);

const SELF_WRITE_WINDOW: Duration = Duration::from_millis(500);
const COALESCE_WINDOW: Duration = Duration::from_millis(100);

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Record that the process is about to write a plan file. Called
/// immediately before every store-initiated write.
pub fn mark_self_write() {
    LAST_SELF_WRITE.store(now_millis(), Ordering::SeqCst);
}

fn within_self_write_window() -> bool {
    let last = LAST_SELF_WRITE.load(Ordering::SeqCst);
    if last == 0 {
        return false;
    }
    (now_millis() - last) < SELF_WRITE_WINDOW.as_millis() as i64
}

#[cfg(test)]
pub fn reset_self_write() {
    LAST_SELF_WRITE.store(0, Ordering::SeqCst);
}

/// File system watcher over the plan directories. Raw notify events are
/// filtered to `.md` write/create/remove in the callback; the consumer
/// side coalesces bursts and applies self-write suppression.
pub struct PlanWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<String>,
}

impl PlanWatcher {
    /// Start watching the given directories (agent dir plus every
    /// resolved project dir). Non-recursive: plans live one level deep.
    pub fn start(dirs: &[PathBuf]) -> Result<PlanWatcher, notify::Error> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }
                for path in event.paths {
                    if path.extension().and_then(|e| e.to_str()) != Some("md") {
                        continue;
                    }
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        let _ = tx.send(name.to_string());
                    }
                }
            },
            Config::default(),
        )?;

        for dir in dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        Ok(PlanWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Block until one coalesced batch of changed filenames survives
    /// self-write suppression. After the first event, waits out the
    /// coalescing window and drains everything that piled up. Returns
    /// None when the underlying event source has closed.
    pub fn next_batch(&self) -> Option<Vec<String>> {
        loop {
            let first = match self.rx.recv() {
                Ok(name) => name,
                Err(_) => return None,
            };
            std::thread::sleep(COALESCE_WINDOW);

            let mut changed = vec![first];
            while let Ok(name) = self.rx.try_recv() {
                if !changed.contains(&name) {
                    changed.push(name);
                }
            }

            // A batch arriving just after one of our own writes is an echo
            if within_self_write_window() {
                continue;
            }
            changed.sort();
            return Some(changed);
        }
    }
}

/// Arm the watcher: a command that blocks until the next surviving batch
/// and posts it as a single message. The core re-arms after handling
/// (never while demo mode is active).
pub fn watch_cmd(watcher: Arc<Mutex<PlanWatcher>>) -> Cmd {
    Box::new(move || {
        let guard = watcher.lock().ok()?;
        guard
            .next_batch()
            .map(|files| Msg::FilesChanged { files })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex as StdMutex;

    // the suppression timestamp is process-wide, so tests touching it
    // must not interleave
    static TEST_LOCK: StdMutex<()> = StdMutex::new(());

    #[test]
    fn test_self_write_window() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset_self_write();
        assert!(!within_self_write_window());
        mark_self_write();
        assert!(within_self_write_window());
        reset_self_write();
    }

    #[test]
    fn test_coalesces_burst_into_single_batch() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset_self_write();
        let tmp = tempfile::TempDir::new().unwrap();
        let watcher = PlanWatcher::start(&[tmp.path().to_path_buf()]).unwrap();

        fs::write(tmp.path().join("a.md"), "one").unwrap();
        fs::write(tmp.path().join("b.md"), "two").unwrap();
        fs::write(tmp.path().join("ignored.txt"), "not md").unwrap();

        let batch = watcher.next_batch().expect("watcher open");
        assert!(batch.contains(&"a.md".to_string()), "{:?}", batch);
        assert!(!batch.iter().any(|f| f.ends_with(".txt")));
    }

    #[test]
    fn test_self_write_suppression_drops_batch() {
        let _guard = TEST_LOCK.lock().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let watcher = PlanWatcher::start(&[dir.clone()]).unwrap();

        // consume batches from the start, as the armed command would
        let handle = std::thread::spawn(move || watcher.next_batch());

        mark_self_write();
        fs::write(dir.join("self.md"), "own write").unwrap();
        // after the window passes, an external write must get through
        std::thread::sleep(Duration::from_millis(600));
        fs::write(dir.join("external.md"), "outside").unwrap();

        let batch = handle.join().unwrap().expect("watcher open");
        assert!(batch.contains(&"external.md".to_string()), "{:?}", batch);
        assert!(!batch.contains(&"self.md".to_string()), "{:?}", batch);
        reset_self_write();
    }
}
