// dictionary/mod.rs
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use anyhow::Context;
use log::{debug, info, warn};
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    task::block_in_place,
};

use crate::{
    error::{G2pError, LineError},
    messages::Pronunciation,
};

pub mod parser;

pub use parser::{Entry, parse_line};

/// word -> pronunciations in file-then-line order.
pub type DictionaryIndex = HashMap<String, Vec<Pronunciation>>;

#[derive(Default)]
struct Snapshot {
    index: Option<Arc<DictionaryIndex>>,
    generation: u64,
}

/// Registered pronunciation dictionaries and a lazily built, immutable index.
///
/// The index is replaced wholesale: readers clone the `Arc` and never see a
/// partially built map. `invalidate` drops the cached snapshot; the next
/// lookup rebuilds it from every registered file.
pub struct DictionaryStore {
    dictionaries: Vec<(String, PathBuf)>,
    state: RwLock<Snapshot>,
}

impl DictionaryStore {
    pub fn new(dictionaries: Vec<(String, PathBuf)>) -> Self {
        Self {
            dictionaries,
            state: RwLock::new(Snapshot::default()),
        }
    }

    pub fn dictionaries(&self) -> &[(String, PathBuf)] {
        &self.dictionaries
    }

    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }

    pub fn contains(&self, dictionary_id: &str) -> bool {
        self.dictionaries.iter().any(|(id, _)| id == dictionary_id)
    }

    /// True when a built index is cached.
    pub fn is_loaded(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .is_some()
    }

    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.index = None;
        state.generation += 1;
        debug!("Dictionary index invalidated");
    }

    /// Reads every registered file and swaps in the new index.
    ///
    /// A file that cannot be read fails the whole build and leaves the cache
    /// untouched. If `invalidate` ran while the build was in progress the new
    /// index is returned but not cached.
    pub fn build(&self) -> Result<Arc<DictionaryIndex>, G2pError> {
        self.build_with(|| {})
    }

    /// `build`, running `before_swap` after the files are read and before the
    /// new index is considered for caching.
    fn build_with<F: FnOnce()>(&self, before_swap: F) -> Result<Arc<DictionaryIndex>, G2pError> {
        let generation = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation;

        let mut index = DictionaryIndex::new();
        for (dictionary_id, dictionary_path) in &self.dictionaries {
            info!(
                "Loading dictionary from {} ({})",
                dictionary_path.display(),
                dictionary_id
            );
            let count = load_dictionary_file(dictionary_id, dictionary_path, &mut index)?;
            debug!("Loaded {} entries from {}", count, dictionary_id);
        }
        let index = Arc::new(index);
        before_swap();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.generation == generation {
            state.index = Some(index.clone());
        } else {
            debug!("Dictionary index went stale during rebuild, not caching");
        }
        Ok(index)
    }

    fn snapshot(&self) -> Result<Arc<DictionaryIndex>, G2pError> {
        let cached = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .clone();
        match cached {
            Some(index) => Ok(index),
            None => self.build_in_place(),
        }
    }

    /// Builds on the current thread. Inside a multi-threaded runtime the
    /// worker is handed off first so file reads don't stall other tasks.
    fn build_in_place(&self) -> Result<Arc<DictionaryIndex>, G2pError> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                block_in_place(|| self.build())
            }
            _ => self.build(),
        }
    }

    /// Looks up `words`, keeping only pronunciations from `dictionary_ids`
    /// (`None` or empty means every registered dictionary). Words without a
    /// matching pronunciation are left out of the result.
    pub fn lookup(
        &self,
        words: &[String],
        dictionary_ids: Option<&[String]>,
    ) -> Result<BTreeMap<String, Vec<Pronunciation>>, G2pError> {
        let selected: Vec<&str> = match dictionary_ids {
            Some(ids) if !ids.is_empty() => {
                for id in ids {
                    if !self.contains(id) {
                        return Err(G2pError::UnknownDictionary(id.clone()));
                    }
                }
                ids.iter().map(String::as_str).collect()
            }
            _ => self.dictionaries.iter().map(|(id, _)| id.as_str()).collect(),
        };

        let index = self.snapshot()?;
        let mut found = BTreeMap::new();
        for word in words {
            if found.contains_key(word) {
                continue;
            }
            let Some(candidates) = index.get(word) else {
                continue;
            };
            let matches: Vec<Pronunciation> = candidates
                .iter()
                .filter(|p| p.dictionary_id().is_some_and(|id| selected.contains(&id)))
                .cloned()
                .collect();
            if !matches.is_empty() {
                found.insert(word.clone(), matches);
            }
        }
        Ok(found)
    }
}

/// Appends every entry of one dictionary file to `index`, returning how many
/// entries were added. Bad lines are logged and skipped.
pub fn load_dictionary_file(
    dictionary_id: &str,
    path: &Path,
    index: &mut DictionaryIndex,
) -> Result<usize, G2pError> {
    let bytes = fs::read(path).with_context(|| {
        format!(
            "failed to read dictionary {} ({})",
            path.display(),
            dictionary_id
        )
    })?;

    let mut count = 0;
    for (i, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = i + 1;
        let parsed = std::str::from_utf8(raw)
            .map_err(|e| LineError {
                dictionary_id: dictionary_id.to_string(),
                line: line_number,
                reason: e.to_string(),
            })
            .and_then(|line| parse_line(line, dictionary_id, line_number));

        match parsed {
            Ok(entries) => {
                for (word, phonemes) in entries {
                    let pronunciation =
                        Pronunciation::from_dictionary(&word, dictionary_id, phonemes);
                    index.entry(word).or_default().push(pronunciation);
                    count += 1;
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
    Ok(count)
}
