use reqwest::Method;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::request::RequestDescriptor;

pub const FIX_FILE_COUNTS: &str = "/admin/fix-knowledge-base-file-count";

pub struct AdminApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> AdminApi<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Resyncs every knowledge base's file count with its stored files.
    /// Returns the server's summary line.
    pub async fn fix_file_counts(&self) -> Result<String> {
        let request = RequestDescriptor::new(FIX_FILE_COUNTS).method(Method::POST);
        self.gateway.fetch(request).await
    }
}
