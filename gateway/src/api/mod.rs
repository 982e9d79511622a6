//! Typed call sites of the backend endpoints.
//!
//! Each API borrows the [`Gateway`](crate::Gateway) and adds nothing but
//! paths and payload shapes.

pub mod admin;
pub mod chat;
pub mod knowledge_base;
pub mod probe;
pub mod user;

use serde::{Deserialize, Deserializer};

pub use admin::AdminApi;
pub use chat::ChatApi;
pub use knowledge_base::{
    CreateKnowledgeBase, FileQuery, KnowledgeBase, KnowledgeBaseApi, KnowledgeBaseFile,
    KnowledgeBaseQuery, KnowledgeBaseType, UpdateKnowledgeBase,
};
pub use probe::{probe_auth, ProbeReport, ProbeStatus};
pub use user::{
    LoginResult, PageQuery, RegisterUser, UpdatePassword, UpdateUser, UserApi, UserInfo,
};

use crate::gateway::Gateway;

impl Gateway {
    pub fn users(&self) -> UserApi<'_> {
        UserApi::new(self)
    }

    pub fn knowledge_bases(&self) -> KnowledgeBaseApi<'_> {
        KnowledgeBaseApi::new(self)
    }

    pub fn chat(&self) -> ChatApi<'_> {
        ChatApi::new(self)
    }

    pub fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(self)
    }
}

/// Accepts ids sent either as JSON strings or numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}
