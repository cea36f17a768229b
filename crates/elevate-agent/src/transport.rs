//! Transport abstraction for chat exchanges

use std::sync::Arc;

use async_trait::async_trait;
use elevate_ai::{
    ChatRequest, Error, Result, StreamEventStream,
    providers::{ChatProvider, FlowiseConfig, FlowiseProvider},
};
use tokio_util::sync::CancellationToken;

/// Opens the byte stream for one exchange and decodes it into events
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return its event stream.
    ///
    /// Dropping the returned stream must release the underlying connection.
    async fn open(&self, request: ChatRequest, cancel: CancellationToken) -> Result<StreamEventStream>;
}

/// HTTP transport backed by a chat provider
pub struct HttpTransport {
    provider: Arc<dyn ChatProvider>,
}

impl HttpTransport {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Transport talking to a Flowise deployment
    pub fn flowise(config: FlowiseConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(FlowiseProvider::new(config)?)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: ChatRequest, cancel: CancellationToken) -> Result<StreamEventStream> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Aborted),
            result = self.provider.stream(&request) => result,
        }
    }
}
