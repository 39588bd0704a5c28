use std::future::Future;

use async_trait::async_trait;

use crate::Node;
use crate::Result;

/// Turns store nodes into the values a watch consumer receives
///
/// [`NodeMapper::initial`] sees the snapshot fetched when the session starts,
/// [`NodeMapper::change`] sees every changed node reported afterwards.
/// Calls never overlap, so a mapper may keep state across them (for example a
/// collection it keeps up to date). An `Err` terminates the session.
#[async_trait]
pub trait NodeMapper: Send + 'static {
    type Output: Send + 'static;

    async fn initial(
        &mut self,
        node: Node,
    ) -> Result<Self::Output>;

    async fn change(
        &mut self,
        node: Node,
    ) -> Result<Self::Output>;
}

/// Mapper built from a pair of async closures, see [`mapper_fn`]
pub struct FnMapper<I, C> {
    initial: I,
    change: C,
}

/// Builds a [`NodeMapper`] from one closure for the initial snapshot and one
/// for subsequent changes
///
/// # Example
/// ```ignore
/// let mapper = mapper_fn(
///     |node: Node| async move { Ok(node.value().map(str::to_string)) },
///     |node: Node| async move { Ok(node.value().map(str::to_string)) },
/// );
/// ```
pub fn mapper_fn<I, C, IF, CF, V>(
    initial: I,
    change: C,
) -> FnMapper<I, C>
where
    I: FnMut(Node) -> IF + Send + 'static,
    C: FnMut(Node) -> CF + Send + 'static,
    IF: Future<Output = Result<V>> + Send + 'static,
    CF: Future<Output = Result<V>> + Send + 'static,
    V: Send + 'static,
{
    FnMapper { initial, change }
}

#[async_trait]
impl<I, C, IF, CF, V> NodeMapper for FnMapper<I, C>
where
    I: FnMut(Node) -> IF + Send + 'static,
    C: FnMut(Node) -> CF + Send + 'static,
    IF: Future<Output = Result<V>> + Send + 'static,
    CF: Future<Output = Result<V>> + Send + 'static,
    V: Send + 'static,
{
    type Output = V;

    async fn initial(
        &mut self,
        node: Node,
    ) -> Result<V> {
        (self.initial)(node).await
    }

    async fn change(
        &mut self,
        node: Node,
    ) -> Result<V> {
        (self.change)(node).await
    }
}
