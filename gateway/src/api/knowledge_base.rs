use std::fmt;

use protocol::Page;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::Gateway;
use crate::request::{FilePart, MultipartForm, RequestDescriptor};

const BASE: &str = "/knowledge-base";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KnowledgeBaseType {
    Personal,
    Public,
}

impl KnowledgeBaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            KnowledgeBaseType::Personal => "PERSONAL",
            KnowledgeBaseType::Public => "PUBLIC",
        }
    }
}

impl fmt::Display for KnowledgeBaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: KnowledgeBaseType,
    pub creator_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub vector_collection_name: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseFile {
    pub id: i64,
    pub knowledge_base_id: i64,
    pub file_name: String,
    pub original_name: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub vector_ids: Option<String>,
    #[serde(default)]
    pub upload_user_id: Option<i64>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKnowledgeBase {
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: KnowledgeBaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKnowledgeBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Filters for the paged listing. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBaseQuery {
    pub kind: Option<KnowledgeBaseType>,
    pub keyword: Option<String>,
    pub creator_id: Option<i64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    pub knowledge_base_id: i64,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileIds<'a> {
    file_ids: &'a [i64],
}

pub struct KnowledgeBaseApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> KnowledgeBaseApi<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, kind: Option<KnowledgeBaseType>) -> Result<Vec<KnowledgeBase>> {
        let request = RequestDescriptor::new(BASE).query_opt("type", kind);
        self.gateway.fetch(request).await
    }

    pub async fn page(&self, query: &KnowledgeBaseQuery) -> Result<Page<KnowledgeBase>> {
        let request = RequestDescriptor::new(format!("{}/page", BASE))
            .query_opt("type", query.kind)
            .query_opt("keyword", query.keyword.as_deref())
            .query_opt("creatorId", query.creator_id)
            .query_opt("page", query.page)
            .query_opt("size", query.size);
        self.gateway.fetch_page(request).await
    }

    pub async fn accessible(&self) -> Result<Vec<KnowledgeBase>> {
        self.gateway
            .fetch(RequestDescriptor::new(format!("{}/accessible", BASE)))
            .await
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<KnowledgeBase>> {
        let request =
            RequestDescriptor::new(format!("{}/search", BASE)).query("keyword", keyword);
        self.gateway.fetch(request).await
    }

    pub async fn create(&self, body: &CreateKnowledgeBase) -> Result<KnowledgeBase> {
        let request = RequestDescriptor::new(BASE).method(Method::POST).json(body)?;
        self.gateway.fetch(request).await
    }

    pub async fn update(&self, id: i64, body: &UpdateKnowledgeBase) -> Result<KnowledgeBase> {
        let request = RequestDescriptor::new(format!("{}/{}", BASE, id))
            .method(Method::PUT)
            .json(body)?;
        self.gateway.fetch(request).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let request = RequestDescriptor::new(format!("{}/{}", BASE, id)).method(Method::DELETE);
        self.gateway.execute(request).await
    }

    pub async fn upload_file(&self, id: i64, file: FilePart) -> Result<KnowledgeBaseFile> {
        let file = FilePart { field: "file".to_string(), ..file };
        let request = RequestDescriptor::new(format!("{}/{}/files", BASE, id))
            .method(Method::POST)
            .multipart(MultipartForm::new().file(file));
        self.gateway.fetch(request).await
    }

    /// Every file goes out under the repeated `files` field.
    pub async fn upload_files(
        &self,
        id: i64,
        files: Vec<FilePart>,
    ) -> Result<Vec<KnowledgeBaseFile>> {
        let form = files.into_iter().fold(MultipartForm::new(), |form, file| {
            form.file(FilePart {
                field: "files".to_string(),
                ..file
            })
        });
        let request = RequestDescriptor::new(format!("{}/{}/files/batch", BASE, id))
            .method(Method::POST)
            .multipart(form);
        self.gateway.fetch(request).await
    }

    pub async fn files(&self, id: i64) -> Result<Vec<KnowledgeBaseFile>> {
        self.gateway
            .fetch(RequestDescriptor::new(format!("{}/{}/files", BASE, id)))
            .await
    }

    pub async fn files_page(&self, query: &FileQuery) -> Result<Page<KnowledgeBaseFile>> {
        let request =
            RequestDescriptor::new(format!("{}/{}/files/page", BASE, query.knowledge_base_id))
                .query("knowledgeBaseId", query.knowledge_base_id)
                .query_opt("fileName", query.file_name.as_deref())
                .query_opt("fileType", query.file_type.as_deref())
                .query_opt("page", query.page)
                .query_opt("size", query.size);
        self.gateway.fetch_page(request).await
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<()> {
        let request =
            RequestDescriptor::new(format!("{}/files/{}", BASE, file_id)).method(Method::DELETE);
        self.gateway.execute(request).await
    }

    pub async fn delete_files(&self, file_ids: &[i64]) -> Result<()> {
        let request = RequestDescriptor::new(format!("{}/files/batch", BASE))
            .method(Method::DELETE)
            .json(&FileIds { file_ids })?;
        self.gateway.execute(request).await
    }
}
