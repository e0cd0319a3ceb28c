// watcher.rs
use std::{collections::HashMap, fs, sync::Arc, time::Duration, time::SystemTime};

use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::dictionary::DictionaryStore;

/// Polls dictionary modification times and invalidates the store's index
/// when any of them changes.
pub struct ReloadWatcher {
    interval: Duration,
    store: Arc<DictionaryStore>,
    last_timestamps: HashMap<String, SystemTime>,
}

impl ReloadWatcher {
    /// `None` when there is nothing to watch or no (or a zero) interval.
    pub fn new(interval: Option<Duration>, store: Arc<DictionaryStore>) -> Option<Self> {
        let interval = interval.filter(|i| !i.is_zero())?;
        if store.is_empty() {
            return None;
        }
        Some(Self {
            interval,
            store,
            last_timestamps: HashMap::new(),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One polling pass. Returns true if the index was invalidated.
    ///
    /// The first timestamp seen for a dictionary is only a baseline. Missing
    /// files are skipped and keep whatever baseline they had.
    pub fn poll(&mut self) -> bool {
        let mut do_reload = false;
        for (dictionary_id, dictionary_path) in self.store.dictionaries() {
            if !dictionary_path.is_file() {
                continue;
            }

            let timestamp = match fs::metadata(dictionary_path).and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    warn!(
                        "poll_dictionaries: {} ({}): {}",
                        dictionary_path.display(),
                        dictionary_id,
                        e
                    );
                    continue;
                }
            };

            match self.last_timestamps.get(dictionary_id) {
                None => {
                    self.last_timestamps.insert(dictionary_id.clone(), timestamp);
                }
                Some(last) if *last != timestamp => {
                    debug!(
                        "Re-loading dictionary {} ({})",
                        dictionary_path.display(),
                        dictionary_id
                    );
                    self.last_timestamps.insert(dictionary_id.clone(), timestamp);
                    do_reload = true;
                }
                Some(_) => {}
            }
        }

        if do_reload {
            self.store.invalidate();
        }
        do_reload
    }

    /// Runs `poll` every interval on the current tokio runtime.
    pub fn spawn(mut self) -> JoinHandle<()> {
        info!("Polling dictionaries every {:?}", self.interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.poll();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        fs::File,
        path::{Path, PathBuf},
    };

    fn touch(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn store(paths: &[(&str, PathBuf)]) -> Arc<DictionaryStore> {
        Arc::new(DictionaryStore::new(
            paths.iter().map(|(id, p)| (id.to_string(), p.clone())).collect(),
        ))
    }

    #[test]
    fn disabled_without_interval_or_dictionaries() {
        let dir = tempfile::tempdir().unwrap();
        let one = store(&[("a", dir.path().join("a.dict"))]);
        assert!(ReloadWatcher::new(None, one.clone()).is_none());
        assert!(ReloadWatcher::new(Some(Duration::ZERO), one.clone()).is_none());
        assert!(ReloadWatcher::new(Some(Duration::from_secs(1)), store(&[])).is_none());
        assert!(ReloadWatcher::new(Some(Duration::from_secs(1)), one).is_some());
    }

    #[test]
    fn baseline_then_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dict");
        fs::write(&path, "foo F O O\n").unwrap();
        touch(&path, 1_000);

        let store = store(&[("a", path.clone())]);
        let mut watcher = ReloadWatcher::new(Some(Duration::from_secs(1)), store.clone()).unwrap();

        store.build().unwrap();
        assert!(!watcher.poll());
        assert!(store.is_loaded());
        assert!(!watcher.poll());
        assert!(store.is_loaded());

        touch(&path, 2_000);
        assert!(watcher.poll());
        assert!(!store.is_loaded());
        assert!(!watcher.poll());
    }

    #[test]
    fn missing_file_keeps_its_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dict");
        fs::write(&path, "foo F O O\n").unwrap();
        touch(&path, 1_000);

        let store = store(&[("a", path.clone())]);
        let mut watcher = ReloadWatcher::new(Some(Duration::from_secs(1)), store.clone()).unwrap();
        assert!(!watcher.poll());

        fs::remove_file(&path).unwrap();
        assert!(!watcher.poll());

        // Recreated with the same timestamp: no change is seen.
        fs::write(&path, "bar B A R\n").unwrap();
        touch(&path, 1_000);
        assert!(!watcher.poll());

        // Recreated with a different timestamp: compared to the old baseline.
        touch(&path, 500);
        assert!(watcher.poll());
    }

    #[test]
    fn one_invalidate_covers_all_dictionaries() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dict");
        let b = dir.path().join("b.dict");
        fs::write(&a, "foo F O O\n").unwrap();
        fs::write(&b, "bar B A R\n").unwrap();
        touch(&a, 10);
        touch(&b, 10);

        let store = store(&[("a", a.clone()), ("b", b.clone())]);
        let mut watcher = ReloadWatcher::new(Some(Duration::from_secs(1)), store.clone()).unwrap();
        watcher.poll();
        store.build().unwrap();

        touch(&a, 20);
        touch(&b, 20);
        assert!(watcher.poll());
        assert!(!store.is_loaded());
    }
}
