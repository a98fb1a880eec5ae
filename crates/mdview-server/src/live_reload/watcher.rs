//! File change watcher.
//!
//! Watches a single file for write events and reports each burst of
//! writes as one change after a quiet period, so editor save patterns
//! (several rapid writes) trigger a single reload.

use std::path::Path;
use std::time::Duration;

use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::ServerError;

/// Quiet period between the last write event and the change callback.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// Watches one file for writes.
///
/// Dropping the handle stops the watch. Known limitation: if the file is
/// deleted and recreated, the watch is not re-established; editors that
/// save by replacing the file will stop triggering reloads.
pub(crate) struct FileWatcher {
    // Keeps the OS watch alive.
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Start watching `path`, invoking `on_change` after each debounced
    /// burst of write events.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be established (path missing,
    /// no permission, resource limits).
    pub(crate) fn start<F>(path: &Path, on_change: F) -> Result<Self, ServerError>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<notify::Event>(100);

        // The notify callback runs on its own thread, hence blocking_send.
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        let _ = tx.blocking_send(event);
                    }
                    Err(err) => tracing::warn!(error = %err, "File watcher error"),
                }
            })
            .map_err(|source| ServerError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| ServerError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        tokio::spawn(debounce_loop(rx, on_change));

        Ok(Self { _watcher: watcher })
    }
}

/// Consume raw watch events, firing `on_change` once per quiet period.
///
/// Each qualifying write restarts the quiet-period timer; the callback
/// fires only when the timer elapses with no further writes. Ends when
/// the event channel closes.
async fn debounce_loop<F>(mut rx: mpsc::Receiver<notify::Event>, on_change: F)
where
    F: Fn() + Send + 'static,
{
    let mut deadline: Option<Instant> = None;

    loop {
        let event = if let Some(at) = deadline {
            tokio::select! {
                event = rx.recv() => event,
                () = tokio::time::sleep_until(at) => {
                    deadline = None;
                    on_change();
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match event {
            Some(event) if is_write(&event) => {
                deadline = Some(Instant::now() + DEBOUNCE_DELAY);
            }
            // Attribute changes, renames, and removals are not reloads.
            Some(_) => {}
            None => break,
        }
    }
}

fn is_write(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use notify::event::{DataChange, MetadataKind, RemoveKind};

    fn write_event() -> notify::Event {
        notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any)))
    }

    fn spawn_counting_loop(rx: mpsc::Receiver<notify::Event>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        tokio::spawn(debounce_loop(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        count
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_burst_fires_once() {
        let (tx, rx) = mpsc::channel(100);
        let count = spawn_counting_loop(rx);

        for _ in 0..3 {
            tx.send(write_event()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_fires_after_quiet_period() {
        let (tx, rx) = mpsc::channel(100);
        let count = spawn_counting_loop(rx);

        tx.send(write_event()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_writes_fire_separately() {
        let (tx, rx) = mpsc::channel(100);
        let count = spawn_counting_loop(rx);

        tx.send(write_event()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        tx.send(write_event()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_write_events_ignored() {
        let (tx, rx) = mpsc::channel(100);
        let count = spawn_counting_loop(rx);

        tx.send(notify::Event::new(EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any,
        ))))
        .await
        .unwrap();
        tx.send(notify::Event::new(EventKind::Remove(RemoveKind::File)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_close_stops_without_firing() {
        let (tx, rx) = mpsc::channel(100);
        let count = spawn_counting_loop(rx);

        tx.send(write_event()).await.unwrap();
        tokio::task::yield_now().await;
        drop(tx);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_watch_reports_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.md");
        std::fs::write(&path, "one").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher = FileWatcher::start(&path, move || {
            let _ = tx.send(());
        })
        .unwrap();

        // Give the OS watch a moment to establish.
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, "two").unwrap();

        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher should report the write")
            .expect("channel should stay open");
    }

    #[tokio::test]
    async fn test_watch_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.md");

        let result = FileWatcher::start(&path, || {});
        assert!(matches!(result, Err(ServerError::Watch { .. })));
    }
}
