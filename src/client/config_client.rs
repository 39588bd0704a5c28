use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::path::relative_key;
use crate::Error;
use crate::FetchOptions;
use crate::Node;
use crate::NodeMapper;
use crate::PathScheme;
use crate::Result;
use crate::StoreClient;
use crate::StoreError;
use crate::WatchHandle;
use crate::WatchLoop;

/// Decoded entries of a config directory, keyed by path relative to it
///
/// Nested entries use their `/`-joined relative path as key.
pub type Collection<T> = BTreeMap<String, T>;

/// Configuration client scoped to one program
///
/// Values are stored as JSON text under
/// `<namespace>/<cluster>/config/<program>/<key>`.
#[derive(Clone)]
pub struct ConfigClient {
    paths: PathScheme,
    program: String,
    watch_loop: WatchLoop,
}

impl ConfigClient {
    pub(crate) fn new(
        paths: PathScheme,
        program: String,
        watch_loop: WatchLoop,
    ) -> Self {
        Self {
            paths,
            program,
            watch_loop,
        }
    }

    /// Program this client reads and writes configuration for
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Store path of `key`
    pub fn path(
        &self,
        key: &str,
    ) -> String {
        self.paths.config(&self.program, key)
    }

    fn store(&self) -> &Arc<dyn StoreClient> {
        self.watch_loop.store()
    }

    /// Reads and decodes the value of `key`
    ///
    /// # Returns
    /// - `Ok(Some(value))` if the key is set
    /// - `Ok(None)` if it is not
    ///
    /// # Errors
    /// - [`Error::Codec`] if the stored text does not decode into `T`
    /// - [`Error::Store`] if the store fails or `key` names a collection
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>> {
        let path = self.path(key);
        match self.store().fetch(&path, FetchOptions::default()).await? {
            Some(node) => decode(&node).map(Some),
            None => Ok(None),
        }
    }

    /// Encodes `value` and stores it under `key`, replacing any previous value
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let path = self.path(key);
        let raw = serde_json::to_string(value)?;
        let node = self.store().write(&path, raw).await?;
        debug!(%path, index = node.modified_index, "config value set");
        Ok(())
    }

    /// Watches `key`, handing `on_change` the current value first and then
    /// every new value
    ///
    /// The session terminates with [`crate::WatchError::NotFound`] if `key` is
    /// not set, and with [`crate::WatchError::Mapper`] if a value does not
    /// decode into `T`.
    pub fn watch<T, N, Fut>(
        &self,
        key: &str,
        on_change: N,
    ) -> WatchHandle
    where
        T: DeserializeOwned + Send + 'static,
        N: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.watch_loop
            .start(self.path(key), false, ValueMapper::<T>::new(), on_change)
    }

    /// Reads every entry of the collection stored under `key`
    ///
    /// An absent collection is empty. Entries without a value, or with an
    /// empty one, are skipped.
    pub async fn get_collection<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Collection<T>> {
        let path = self.path(key);
        match self.store().fetch(&path, FetchOptions::recursive(true)).await? {
            Some(node) => {
                let mut collection = Collection::new();
                collect_entries(&node.key, &node, &mut collection)?;
                Ok(collection)
            }
            None => Ok(Collection::new()),
        }
    }

    /// Writes every entry of `entries` as `key/<entry key>`
    ///
    /// Writes are issued concurrently and all of them are awaited. There is
    /// no atomicity across entries: if some writes fail the others stay
    /// applied and [`Error::Collection`] reports the failures.
    pub async fn set_collection<I, K, V>(
        &self,
        key: &str,
        entries: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let mut writes = Vec::new();
        for (child_key, value) in entries {
            let path = self
                .paths
                .config_child(&self.program, key, child_key.as_ref());
            let raw = serde_json::to_string(&value)?;
            writes.push(async move { self.store().write(&path, raw).await });
        }

        let total = writes.len();
        let mut failures = join_all(writes)
            .await
            .into_iter()
            .filter_map(|written| written.err());
        let Some(first) = failures.next() else {
            debug!(key, total, "config collection set");
            return Ok(());
        };

        let failed = 1 + failures.count();
        warn!(key, failed, total, "config collection partially written: {}", first);
        Err(Error::Collection {
            failed,
            total,
            first: Box::new(first.into()),
        })
    }

    /// Watches the collection stored under `key`, handing `on_change` the
    /// full collection first and then the full, updated collection after
    /// every change to one of its entries
    ///
    /// Entries are added and updated but never removed from the delivered
    /// collection.
    pub fn watch_collection<T, N, Fut>(
        &self,
        key: &str,
        on_change: N,
    ) -> WatchHandle
    where
        T: DeserializeOwned + Clone + Send + 'static,
        N: FnMut(Collection<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.watch_loop
            .start(self.path(key), true, CollectionMapper::<T>::new(), on_change)
    }
}

/// Decodes a leaf's JSON text
fn decode<T: DeserializeOwned>(node: &Node) -> Result<T> {
    let raw = node
        .value()
        .ok_or_else(|| StoreError::NotAFile(node.key.clone()))?;
    Ok(serde_json::from_str(raw)?)
}

/// Adds every leaf below `node` to `collection`, keyed relative to `dir_key`
fn collect_entries<T: DeserializeOwned>(
    dir_key: &str,
    node: &Node,
    collection: &mut Collection<T>,
) -> Result<()> {
    for child in &node.children {
        if child.is_directory {
            collect_entries(dir_key, child, collection)?;
        } else {
            insert_entry(dir_key, child, collection)?;
        }
    }
    Ok(())
}

fn insert_entry<T: DeserializeOwned>(
    dir_key: &str,
    leaf: &Node,
    collection: &mut Collection<T>,
) -> Result<()> {
    let has_value = leaf.value().is_some_and(|raw| !raw.is_empty());
    let Some(entry_key) = relative_key(dir_key, &leaf.key).filter(|_| has_value) else {
        return Ok(());
    };
    collection.insert(entry_key.to_string(), decode(leaf)?);
    Ok(())
}

struct ValueMapper<T> {
    _value: PhantomData<fn() -> T>,
}

impl<T> ValueMapper<T> {
    fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send + 'static> NodeMapper for ValueMapper<T> {
    type Output = T;

    async fn initial(
        &mut self,
        node: Node,
    ) -> Result<T> {
        decode(&node)
    }

    async fn change(
        &mut self,
        node: Node,
    ) -> Result<T> {
        decode(&node)
    }
}

/// Keeps one collection up to date across a recursive watch
struct CollectionMapper<T> {
    dir_key: String,
    collection: Collection<T>,
}

impl<T> CollectionMapper<T> {
    fn new() -> Self {
        Self {
            dir_key: String::new(),
            collection: Collection::new(),
        }
    }
}

#[async_trait]
impl<T: DeserializeOwned + Clone + Send + 'static> NodeMapper for CollectionMapper<T> {
    type Output = Collection<T>;

    async fn initial(
        &mut self,
        node: Node,
    ) -> Result<Collection<T>> {
        self.dir_key = node.key.clone();
        self.collection.clear();
        collect_entries(&self.dir_key, &node, &mut self.collection)?;
        Ok(self.collection.clone())
    }

    async fn change(
        &mut self,
        node: Node,
    ) -> Result<Collection<T>> {
        insert_entry(&self.dir_key, &node, &mut self.collection)?;
        Ok(self.collection.clone())
    }
}
