use std::pin::Pin;
use std::sync::Arc;

use solstice_model::{
    ChatRequest, ChatResponse, ModelProvider, ModelProviderError,
};
use tracing::Instrument;

type SendChatResult = Result<ChatResponse, Box<dyn ModelProviderError>>;
type BoxedSendChatFuture =
    Pin<Box<dyn Future<Output = SendChatResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ChatRequest) -> BoxedSendChatFuture + Send + Sync
>;

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Creates a client that forwards exchanges to `provider`.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_chat(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    match fut.await {
                        Ok(resp) => Ok(resp),
                        Err(err) => {
                            error!("got an error: {err:?}");
                            Err(Box::new(err) as Box<dyn ModelProviderError>)
                        }
                    }
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and returns the complete reply.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe as long as the underlying provider's
    /// future is.
    #[inline]
    pub async fn send_chat(&self, req: ChatRequest) -> SendChatResult {
        (self.handler_fn)(req).await
    }
}
