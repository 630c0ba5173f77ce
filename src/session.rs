//! Per-conversation state shared by every tool call
//!
//! Holds the lazily loaded HSN table, the "current corpus" marker, and the
//! cache of corpora known to exist. Nothing here is global: callers create a
//! `Session` per conversation and pass it to each tool.

use crate::hsn::{load_code_table, CodeTable, LoadError, LoadReport};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct CorpusState {
    current: Option<String>,
    /// Name or alias -> resource name
    known: HashMap<String, String>,
}

/// Session-scoped state
#[derive(Debug)]
pub struct Session {
    default_master_path: PathBuf,
    code_table: Mutex<Option<Arc<CodeTable>>>,
    corpora: Mutex<CorpusState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    /// Create a session that lazily loads the master table from `default_master_path`
    pub fn new(default_master_path: impl Into<PathBuf>) -> Self {
        Self {
            default_master_path: default_master_path.into(),
            code_table: Mutex::new(None),
            corpora: Mutex::new(CorpusState::default()),
        }
    }

    /// Create a session with an already built table
    pub fn with_code_table(default_master_path: impl Into<PathBuf>, table: CodeTable) -> Self {
        let session = Self::new(default_master_path);
        *lock(&session.code_table) = Some(Arc::new(table));
        session
    }

    pub fn default_master_path(&self) -> &Path {
        &self.default_master_path
    }

    /// The table if it has been loaded
    pub fn code_table(&self) -> Option<Arc<CodeTable>> {
        lock(&self.code_table).clone()
    }

    /// Return the table, loading it from the default path on first use
    ///
    /// The load runs under the table lock, so concurrent first calls load at
    /// most once. A failed load leaves the session without a table.
    pub fn ensure_code_table(&self) -> Result<Arc<CodeTable>, LoadError> {
        let mut slot = lock(&self.code_table);
        if let Some(table) = slot.as_ref() {
            return Ok(Arc::clone(table));
        }

        debug!(
            "HSN table not loaded yet, loading {}",
            self.default_master_path.display()
        );
        let loaded = load_code_table(&self.default_master_path)?;
        let table = Arc::new(loaded.table);
        *slot = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Async variant of [`Session::ensure_code_table`] for callers on the runtime
    ///
    /// The file is read on the blocking pool and the lock is only held to
    /// install the result. If two first calls race, the first table installed
    /// wins.
    pub async fn ensure_code_table_async(&self) -> Result<Arc<CodeTable>, LoadError> {
        if let Some(table) = self.code_table() {
            return Ok(table);
        }

        let path = self.default_master_path.clone();
        debug!(
            "HSN table not loaded yet, loading {} off the runtime",
            path.display()
        );
        let loaded = tokio::task::spawn_blocking(move || load_code_table(&path))
            .await
            .map_err(|e| LoadError::ParseFailure {
                path: self.default_master_path.clone(),
                reason: format!("load task failed: {}", e),
            })??;

        let mut slot = lock(&self.code_table);
        Ok(Arc::clone(slot.get_or_insert_with(|| Arc::new(loaded.table))))
    }

    /// Load `path` and replace whatever table the session had
    pub fn reload_code_table(&self, path: &Path) -> Result<LoadReport, LoadError> {
        let mut slot = lock(&self.code_table);
        let loaded = load_code_table(path)?;
        *slot = Some(Arc::new(loaded.table));
        info!("HSN table replaced from {}", path.display());
        Ok(loaded.report)
    }

    /// Corpus used when a tool is called with an empty corpus name
    pub fn current_corpus(&self) -> Option<String> {
        lock(&self.corpora).current.clone()
    }

    pub fn set_current_corpus(&self, name: impl Into<String>) {
        lock(&self.corpora).current = Some(name.into());
    }

    /// Resource name of a corpus already confirmed to exist in this session
    pub fn known_corpus(&self, name: &str) -> Option<String> {
        lock(&self.corpora).known.get(name).cloned()
    }

    /// Remember that `aliases` all refer to the existing corpus `resource_name`
    pub fn remember_corpus<'a, I>(&self, resource_name: &str, aliases: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = lock(&self.corpora);
        state
            .known
            .insert(resource_name.to_string(), resource_name.to_string());
        for alias in aliases {
            if !alias.is_empty() {
                state
                    .known
                    .insert(alias.to_string(), resource_name.to_string());
            }
        }
    }

    /// Forget a deleted corpus, clearing the current marker if it pointed there
    pub fn forget_corpus(&self, resource_name: &str) {
        let mut state = lock(&self.corpora);
        let current_is_deleted = state.current.as_deref().is_some_and(|current| {
            current == resource_name
                || state.known.get(current).map(String::as_str) == Some(resource_name)
        });
        if current_is_deleted {
            state.current = None;
        }
        state.known.retain(|_, resource| resource != resource_name);
    }
}
