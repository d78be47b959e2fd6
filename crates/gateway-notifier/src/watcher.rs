//! File-system watcher mapping a local directory onto `/content`.

use crate::{
    error::NotifierError,
    event::{ChangeEvent, ChangeKind, CONTENT_ROOT},
    notifier::NotifierHandle,
};
use notify::{
    event::ModifyKind, Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Watches a directory tree and submits a change event per affected file.
///
/// `<root>/wknd/en.html` is reported as `/content/wknd/en.html`.
pub struct ContentWatcher {
    root: PathBuf,
    watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for ContentWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ContentWatcher {
    /// Start watching `root` recursively. Must be called inside a Tokio
    /// runtime.
    pub fn start(root: impl AsRef<Path>, notifier: NotifierHandle) -> Result<Self, NotifierError> {
        let root = std::fs::canonicalize(root.as_ref()).map_err(|source| {
            NotifierError::WatchRoot {
                path: root.as_ref().to_path_buf(),
                source,
            }
        })?;

        let (tx, mut rx) = mpsc::channel::<Event>(1024);
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => warn!(error = %e, "File watcher error"),
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let task_root = root.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(kind) = change_kind(&event.kind) else {
                    continue;
                };
                for path in &event.paths {
                    if let Some(content_path) = content_path(&task_root, path) {
                        debug!(path = %content_path, ?kind, "Detected content change");
                        notifier.submit(ChangeEvent::new(content_path, kind));
                    }
                }
            }
        });

        info!(root = %root.display(), "Watching content directory");
        Ok(Self {
            root,
            watcher,
            task,
        })
    }

    /// Stop watching and release the notifier handle
    pub async fn stop(self) {
        let Self { root, watcher, task } = self;
        drop(watcher);
        if let Err(e) = task.await {
            error!(error = %e, "Content watcher task failed");
        }
        info!(root = %root.display(), "Stopped watching content directory");
    }
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Changed),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Map a file below `root` onto its content path
fn content_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut content = String::from(CONTENT_ROOT);
    for component in relative.components() {
        let Component::Normal(part) = component else {
            return None;
        };
        content.push('/');
        content.push_str(part.to_str()?);
    }
    Some(content)
}
