//! A local fake model for testing purpose.

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::sync::{Arc, Mutex};

use solstice_model::{
    ChatRequest, ChatResponse, ErrorKind, FinishReason, ModelProvider,
    ModelProviderError, ToolCall,
};

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the reply script: each
/// exchange pops the next scripted reply in FIFO order, and an empty
/// script produces a backend error. Clones share the same script and
/// request log, so a test can keep a handle after moving the provider
/// into the code under test.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<VecDeque<ChatResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl TestModelProvider {
    /// Appends a full reply to the script.
    #[inline]
    pub fn push_reply(&self, resp: ChatResponse) {
        self.script.lock().unwrap().push_back(resp);
    }

    /// Appends a plain text reply to the script.
    #[inline]
    pub fn push_text_reply<S: Into<String>>(&self, content: S) {
        self.push_reply(ChatResponse {
            content: content.into(),
            ..Default::default()
        });
    }

    /// Appends a reply carrying natively reported tool calls.
    #[inline]
    pub fn push_native_tool_reply<S: Into<String>>(
        &self,
        content: S,
        tool_calls: Vec<ToolCall>,
    ) {
        self.push_reply(ChatResponse {
            content: content.into(),
            tool_calls,
            finish_reason: FinishReason::ToolCalls,
            usage: None,
        });
    }

    /// Returns every request received so far.
    #[inline]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = Error;

    fn send_chat(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        self.requests.lock().unwrap().push(req.clone());
        let next = self.script.lock().unwrap().pop_front();
        ready(next.ok_or(Error {
            message: "reply script is exhausted",
            kind: ErrorKind::Other,
        }))
    }
}

#[cfg(test)]
mod tests {
    use solstice_model::ChatMessage;

    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let provider = TestModelProvider::default();
        provider.push_text_reply("first");
        provider.push_text_reply("second");

        let req = ChatRequest {
            messages: vec![ChatMessage::User("Hi".to_owned())],
            ..Default::default()
        };
        let resp = provider.send_chat(&req).await.unwrap();
        assert_eq!(resp.content, "first");
        let resp = provider.send_chat(&req).await.unwrap();
        assert_eq!(resp.content, "second");

        let err = provider.send_chat(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);

        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_script() {
        let provider = TestModelProvider::default();
        let clone = provider.clone();
        provider.push_text_reply("shared");

        let req = ChatRequest::default();
        let resp = clone.send_chat(&req).await.unwrap();
        assert_eq!(resp.content, "shared");
        assert_eq!(provider.requests().len(), 1);
    }
}
