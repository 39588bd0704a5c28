//! Embedded in-memory store
//!
//! A single-process implementation of [`StoreClient`] with the same
//! semantics a remote hierarchical store offers: a global, monotonically
//! increasing index stamped on every write, implicit parent directories,
//! and long-polls answered from a bounded change history so that a watcher
//! resuming at `last_seen + 1` never misses a write made while it was busy.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use crate::constants::DEFAULT_HISTORY_CAPACITY;
use crate::FetchOptions;
use crate::Node;
use crate::PollOptions;
use crate::StoreClient;
use crate::StoreError;
use crate::StoreResult;

const ROOT_KEY: &str = "/";

#[derive(Debug, Clone)]
enum Entry {
    Leaf { value: String, modified_index: u64 },
    Dir { modified_index: u64 },
}

#[derive(Debug)]
struct StoreState {
    /// Index of the latest write
    index: u64,
    /// Every leaf and directory except the root, keyed by normalized path
    entries: BTreeMap<String, Entry>,
    /// Most recent changes, oldest first
    history: VecDeque<Node>,
    /// Highest index evicted from `history` (0 while nothing was evicted)
    evicted_through: u64,
    /// Highest evicted index per key
    evicted: BTreeMap<String, u64>,
}

/// In-memory hierarchical store with index-based long-poll
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    index_tx: watch::Sender<u64>,
    history_capacity: usize,
    poll_timeout: Option<Duration>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (index_tx, _) = watch::channel(0);
        Self {
            state: RwLock::new(StoreState {
                index: 0,
                entries: BTreeMap::new(),
                history: VecDeque::new(),
                evicted_through: 0,
                evicted: BTreeMap::new(),
            }),
            index_tx,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            poll_timeout: None,
        }
    }

    /// Number of changes kept for long-poll catch-up (minimum 1)
    pub fn with_history_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// Fail long-polls with [`StoreError::TransientTimeout`] once they have
    /// waited `timeout` without a matching change, the way a proxy with a
    /// short idle timeout would
    pub fn with_poll_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Index of the latest write
    pub fn current_index(&self) -> u64 {
        self.state.read().index
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn fetch(
        &self,
        path: &str,
        options: FetchOptions,
    ) -> StoreResult<Option<Node>> {
        let key = normalize(path);
        let state = self.state.read();

        if key == ROOT_KEY {
            return Ok(Some(state.directory(&key, 0, options.recursive)));
        }

        let node = match state.entries.get(&key) {
            Some(Entry::Leaf {
                value,
                modified_index,
            }) => Some(Node::leaf(key.clone(), value.clone(), *modified_index)),
            Some(Entry::Dir { modified_index }) => {
                Some(state.directory(&key, *modified_index, options.recursive))
            }
            None => None,
        };
        trace!(%key, found = node.is_some(), "MemoryStore::fetch");
        Ok(node)
    }

    async fn write(
        &self,
        path: &str,
        value: String,
    ) -> StoreResult<Node> {
        let key = normalize(path);
        if key == ROOT_KEY {
            return Err(StoreError::NotAFile(key));
        }

        let node = {
            let mut state = self.state.write();

            if let Some(Entry::Dir { .. }) = state.entries.get(&key) {
                return Err(StoreError::NotAFile(key));
            }
            let parents = ancestors(&key);
            for parent in &parents {
                if let Some(Entry::Leaf { .. }) = state.entries.get(parent) {
                    return Err(StoreError::NotADirectory(parent.clone()));
                }
            }

            state.index += 1;
            let index = state.index;
            for parent in parents {
                state
                    .entries
                    .entry(parent)
                    .or_insert(Entry::Dir {
                        modified_index: index,
                    });
            }
            state.entries.insert(
                key.clone(),
                Entry::Leaf {
                    value: value.clone(),
                    modified_index: index,
                },
            );

            let node = Node::leaf(key, value, index);
            state.history.push_back(node.clone());
            while state.history.len() > self.history_capacity {
                if let Some(evicted) = state.history.pop_front() {
                    state.evicted_through = evicted.modified_index;
                    state.evicted.insert(evicted.key, evicted.modified_index);
                }
            }
            node
        };

        trace!(key = %node.key, index = node.modified_index, "MemoryStore::write");
        self.index_tx.send_replace(node.modified_index);
        Ok(node)
    }

    async fn long_poll(
        &self,
        path: &str,
        options: PollOptions,
        cancel: CancellationToken,
    ) -> StoreResult<Node> {
        let key = normalize(path);
        let deadline = self.poll_timeout.map(|timeout| Instant::now() + timeout);

        // Subscribe before looking at the history so no write slips between
        // the check and the wait.
        let mut index_rx = self.index_tx.subscribe();

        loop {
            let change = self.state.read().find_change(&key, options)?;
            if let Some(node) = change {
                trace!(%key, wait_index = options.wait_index, index = node.modified_index, "long-poll answered");
                return Ok(node);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%key, wait_index = options.wait_index, "long-poll cancelled");
                    return Err(StoreError::Cancelled);
                }
                _ = wait_until(deadline) => {
                    debug!(%key, wait_index = options.wait_index, "long-poll timed out");
                    return Err(StoreError::TransientTimeout);
                }
                changed = index_rx.changed() => {
                    if changed.is_err() {
                        return Err(StoreError::Unavailable("store dropped".to_string()));
                    }
                }
            }
        }
    }
}

impl StoreState {
    fn directory(
        &self,
        key: &str,
        modified_index: u64,
        recursive: bool,
    ) -> Node {
        let prefix = child_prefix(key);
        let children = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(child, _)| child.starts_with(&prefix))
            .filter(|(child, _)| !child[prefix.len()..].contains('/'))
            .map(|(child, entry)| match entry {
                Entry::Leaf {
                    value,
                    modified_index,
                } => Node::leaf(child.clone(), value.clone(), *modified_index),
                Entry::Dir { modified_index } if recursive => {
                    self.directory(child, *modified_index, true)
                }
                Entry::Dir { modified_index } => {
                    Node::directory(child.clone(), *modified_index, Vec::new())
                }
            })
            .collect();

        Node::directory(key, modified_index, children)
    }

    fn find_change(
        &self,
        key: &str,
        options: PollOptions,
    ) -> StoreResult<Option<Node>> {
        let prefix = child_prefix(key);

        // Only a gap holding a change to the watched key loses anything.
        if options.wait_index <= self.evicted_through
            && self.last_evicted(key, &prefix, options.recursive) >= options.wait_index
        {
            return Err(StoreError::IndexCleared {
                requested: options.wait_index,
                oldest: self.evicted_through + 1,
            });
        }

        Ok(self
            .history
            .iter()
            .filter(|change| change.modified_index >= options.wait_index)
            .find(|change| {
                change.key == key || (options.recursive && change.key.starts_with(&prefix))
            })
            .cloned())
    }

    /// Highest index of an evicted change to `key`, or to anything below it
    /// when `recursive`; 0 if none was evicted
    fn last_evicted(
        &self,
        key: &str,
        prefix: &str,
        recursive: bool,
    ) -> u64 {
        let own = self.evicted.get(key).copied().unwrap_or(0);
        if !recursive {
            return own;
        }

        self.evicted
            .range(prefix.to_string()..)
            .take_while(|(child, _)| child.starts_with(prefix))
            .map(|(_, index)| *index)
            .fold(own, u64::max)
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// `a//b/` and `/a/b` both become `/a/b`; the empty path is the root
pub(crate) fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn child_prefix(key: &str) -> String {
    if key == ROOT_KEY {
        ROOT_KEY.to_string()
    } else {
        format!("{key}/")
    }
}

/// Proper ancestors of a normalized key, outermost first, excluding the root
fn ancestors(key: &str) -> Vec<String> {
    key.match_indices('/')
        .skip(1)
        .map(|(at, _)| key[..at].to_string())
        .collect()
}
