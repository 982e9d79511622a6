use reqwest::Method;
use serde::Serialize;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::request::RequestDescriptor;
use crate::stream::{EventHandler, StreamHandle};

pub const CHAT_STREAM: &str = "/chat/stream";
pub const RAG_STREAM: &str = "/ai/rag";
pub const POST_CHAT: &str = "/post-chat";

#[derive(Serialize)]
struct PostChat<'a> {
    author: &'a str,
}

/// Streaming chat endpoints. Replies arrive as events on `handler`.
pub struct ChatApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> ChatApi<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub async fn chat_stream<H: EventHandler>(
        &self,
        message: &str,
        handler: H,
    ) -> Result<StreamHandle> {
        let request = RequestDescriptor::new(CHAT_STREAM).query("message", message);
        self.gateway.get_stream(request, handler).await
    }

    /// Retrieval-augmented answer over the accessible knowledge bases.
    pub async fn rag_stream<H: EventHandler>(
        &self,
        message: &str,
        handler: H,
    ) -> Result<StreamHandle> {
        let request = RequestDescriptor::new(RAG_STREAM).query("message", message);
        self.gateway.get_stream(request, handler).await
    }

    pub async fn post_chat_stream<H: EventHandler>(
        &self,
        author: &str,
        handler: H,
    ) -> Result<StreamHandle> {
        let request = RequestDescriptor::new(POST_CHAT)
            .method(Method::POST)
            .json(&PostChat { author })?;
        self.gateway.open_stream(request, handler).await
    }
}
