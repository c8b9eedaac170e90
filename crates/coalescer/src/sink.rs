//! Commit sinks: where settled values go

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use survey_core::MergeError;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a sink may report for one commit
///
/// The coalescer only logs and counts these. Retrying or surfacing them
/// to the user is the sink owner's business.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("commit rejected: {0}")]
    Rejected(String),

    #[error("commit sink closed")]
    Closed,

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Receiver of coalesced values
///
/// Invoked once per settled key. Calls for the same key may overlap when
/// a new quiet period elapses before the previous call resolved; a sink
/// that needs them serialized must do so itself.
#[async_trait]
pub trait CommitSink<K, V>: Send + Sync + 'static
where
    K: Send + 'static,
    V: Send + 'static,
{
    async fn commit(&self, key: K, value: V) -> Result<(), SinkError>;
}

#[async_trait]
impl<K, V, S> CommitSink<K, V> for Arc<S>
where
    K: Send + 'static,
    V: Send + 'static,
    S: CommitSink<K, V> + ?Sized,
{
    async fn commit(&self, key: K, value: V) -> Result<(), SinkError> {
        (**self).commit(key, value).await
    }
}

/// Sink backed by an async closure
pub struct FnSink<F>(F);

/// Wrap an async closure as a [`CommitSink`]
pub fn sink_fn<F>(f: F) -> FnSink<F> {
    FnSink(f)
}

#[async_trait]
impl<K, V, F, Fut> CommitSink<K, V> for FnSink<F>
where
    K: Send + 'static,
    V: Send + 'static,
    F: Fn(K, V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SinkError>> + Send + 'static,
{
    async fn commit(&self, key: K, value: V) -> Result<(), SinkError> {
        (self.0)(key, value).await
    }
}

/// One settled value
#[derive(Debug, Clone, PartialEq)]
pub struct Commit<K, V> {
    pub key: K,
    pub value: V,
}

/// Sink that forwards commits into an unbounded channel
pub struct ChannelSink<K, V> {
    tx: mpsc::UnboundedSender<Commit<K, V>>,
}

/// Create a channel sink and the receiver its commits arrive on
pub fn channel_sink<K, V>() -> (ChannelSink<K, V>, mpsc::UnboundedReceiver<Commit<K, V>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

impl<K, V> Clone for ChannelSink<K, V> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

#[async_trait]
impl<K, V> CommitSink<K, V> for ChannelSink<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    async fn commit(&self, key: K, value: V) -> Result<(), SinkError> {
        self.tx
            .send(Commit { key, value })
            .map_err(|_| SinkError::Closed)
    }
}
