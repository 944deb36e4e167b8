//! Watch orchestrator for `watch` and `watch-dev`.
//!
//! One recursive watcher on the project root feeds a debouncer; each settled
//! batch of changed paths is matched against three subscriptions:
//!
//! | Subscription | Paths         | Action                          |
//! |--------------|---------------|---------------------------------|
//! | style        | `paths.scss`  | run the style pipeline          |
//! | markup       | `paths.html`  | reload every browser            |
//! | script       | `paths.js`    | reload every browser            |
//!
//! Actions run on the rayon pool. Style rebuilds hold a lock so two
//! overlapping rebuilds never interleave their writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam::channel;
use notify::{EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::serve::DevServer;
use crate::config::{PathsConfig, ProjectConfig};
use crate::core::register_shutdown;
use crate::logger::{status_detach, status_error};
use crate::pipeline::style::{StyleTask, StyleVariant};
use crate::pipeline::{FileSet, GlobSet, PipelineResult};
use crate::reload::ReloadHandle;
use crate::utils::path::normalize_path;
use crate::{debug, log};

/// Quiet window that coalesces the events of a single save.
const DEBOUNCE_MS: u64 = 50;

/// Serve the project and react to changes until Ctrl+C.
pub fn watch(config: &ProjectConfig, variant: StyleVariant) -> Result<()> {
    let server = DevServer::start(config)?;
    log!("serve"; "http://{}", server.addr());
    let orchestrator = Orchestrator::new(config, variant, server.reload_handle())?;

    let result = orchestrator.run();
    server.stop();
    result
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Work a style trigger runs.
trait Rebuild: Send + Sync {
    fn rebuild(&self) -> PipelineResult<FileSet>;
}

impl Rebuild for StyleTask {
    fn rebuild(&self) -> PipelineResult<FileSet> {
        self.run()
    }
}

struct Orchestrator {
    root: PathBuf,
    canonical_root: PathBuf,
    subscriptions: Subscriptions,
    style: Arc<dyn Rebuild>,
    style_lock: Arc<Mutex<()>>,
    reload: ReloadHandle,
}

impl Orchestrator {
    fn new(config: &ProjectConfig, variant: StyleVariant, reload: ReloadHandle) -> Result<Self> {
        let root = config.get_root().to_path_buf();
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());

        Ok(Self {
            subscriptions: Subscriptions::new(&config.paths)?,
            style: Arc::new(StyleTask::new(config, variant, Some(Arc::clone(&reload)))?),
            style_lock: Arc::new(Mutex::new(())),
            reload,
            root,
            canonical_root,
        })
    }

    fn run(&self) -> Result<()> {
        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = event_tx.send(res);
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", self.root.display()))?;

        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
        register_shutdown(shutdown_tx);

        log!("watch"; "watching {}", self.root.display());
        status_detach();

        let mut debouncer = Debouncer::new();
        loop {
            channel::select! {
                recv(event_rx) -> msg => match msg {
                    Ok(Ok(event)) => debouncer.add_event(&event),
                    Ok(Err(e)) => log!("watch"; "watcher error: {}", e),
                    Err(_) => break,
                },
                recv(shutdown_rx) -> _ => break,
                default(debouncer.sleep_duration()) => {}
            }

            if let Some(paths) = debouncer.take_if_ready() {
                self.dispatch(&paths);
            }
        }

        debug!("watch"; "stopped");
        Ok(())
    }

    fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root)
            .or_else(|_| path.strip_prefix(&self.canonical_root))
            .ok()
    }

    fn dispatch(&self, paths: &[PathBuf]) {
        let relative: Vec<&Path> = paths.iter().filter_map(|p| self.relative(p)).collect();

        for trigger in self.subscriptions.triggered(&relative) {
            debug!("watch"; "{:?} triggered", trigger);
            match trigger {
                Trigger::Style => {
                    let task = Arc::clone(&self.style);
                    let lock = Arc::clone(&self.style_lock);
                    rayon::spawn(move || {
                        let _guard = lock.lock();
                        report(task.rebuild());
                    });
                }
                Trigger::Markup | Trigger::Script => {
                    let reload = Arc::clone(&self.reload);
                    let reason = trigger.label();
                    rayon::spawn(move || reload.reload_all(reason));
                }
            }
        }
    }
}

/// Compile errors end only this rebuild; the loop keeps going.
fn report<T>(result: PipelineResult<T>) {
    if let Err(e) = result {
        status_error(&e.summary(), e.detail());
    }
}

// =============================================================================
// Subscriptions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Trigger {
    Style,
    Markup,
    Script,
}

impl Trigger {
    fn label(self) -> &'static str {
        match self {
            Self::Style => "style changed",
            Self::Markup => "markup changed",
            Self::Script => "script changed",
        }
    }
}

struct Subscriptions {
    style: GlobSet,
    markup: GlobSet,
    script: GlobSet,
}

impl Subscriptions {
    fn new(paths: &PathsConfig) -> PipelineResult<Self> {
        Ok(Self {
            style: GlobSet::new(&paths.scss)?,
            markup: GlobSet::new(&paths.html)?,
            script: GlobSet::new(&paths.js)?,
        })
    }

    /// Subscriptions hit by any of the root-relative paths, each once.
    fn triggered(&self, paths: &[&Path]) -> Vec<Trigger> {
        [
            (Trigger::Style, &self.style),
            (Trigger::Markup, &self.markup),
            (Trigger::Script, &self.script),
        ]
        .into_iter()
        .filter(|(_, globs)| paths.iter().any(|p| globs.matches(p)))
        .map(|(trigger, _)| trigger)
        .collect()
    }
}

// =============================================================================
// Debouncer
// =============================================================================

/// Collects changed paths until no event arrived for the quiet window.
struct Debouncer {
    changes: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            changes: FxHashSet::default(),
            last_event: None,
        }
    }

    /// Record a notify event, ignoring metadata-only changes and editor
    /// temp files.
    fn add_event(&mut self, event: &notify::Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => {}
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => {}
            _ => return,
        }

        debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.changes.insert(normalize_path(path));
            self.last_event = Some(Instant::now());
        }
    }

    /// Settled paths, sorted, once the quiet window has passed.
    fn take_if_ready(&mut self) -> Option<Vec<PathBuf>> {
        let last_event = self.last_event?;
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return None;
        }

        self.last_event = None;
        let mut paths: Vec<_> = std::mem::take(&mut self.changes).into_iter().collect();
        if paths.is_empty() {
            return None;
        }
        paths.sort();
        Some(paths)
    }

    /// Time until the pending batch may settle.
    fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        Duration::from_millis(DEBOUNCE_MS)
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}
