use protocol::Page;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::string_or_number;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::request::RequestDescriptor;
use crate::session::Credential;

pub const LOGIN: &str = "/user/login";
pub const REGISTER: &str = "/user/register";
pub const UPDATE: &str = "/user/update";
pub const UPDATE_PASSWORD: &str = "/user/updatePassword";
pub const PAGE: &str = "/user/page";
pub const INFO: &str = "/user/info";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

/// `data` of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    #[serde(default, alias = "userRole")]
    pub role: Option<String>,
    #[serde(default, alias = "id", deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

impl From<LoginResult> for Credential {
    fn from(login: LoginResult) -> Self {
        Credential {
            token: login.token,
            role: login.role,
            user_id: login.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub name: String,
    pub user_name: String,
    pub password: String,
    pub phone: String,
    pub sex: String,
    pub id_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub id: i64,
    pub name: String,
    pub user_name: String,
    pub phone: String,
    pub sex: String,
    pub id_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassword {
    pub id: i64,
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub size: u32,
    pub keyword: Option<String>,
}

impl PageQuery {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            keyword: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

pub struct UserApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> UserApi<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Logs in and stores the issued credential in the session.
    pub async fn login(&self, user_name: &str, password: &str) -> Result<Credential> {
        let request = RequestDescriptor::new(LOGIN).json(&LoginRequest {
            user_name,
            password,
        })?;

        let login: LoginResult = self.gateway.fetch(request.method(Method::POST)).await?;
        let credential = Credential::from(login);
        self.gateway.session().set(credential.clone())?;

        log::info!("Logged in as {}", user_name);
        Ok(credential)
    }

    /// Forgets the credential locally.
    pub fn logout(&self) -> Result<()> {
        self.gateway.session().clear()
    }

    pub async fn register(&self, user: &RegisterUser) -> Result<()> {
        let request = RequestDescriptor::new(REGISTER).json(user)?;
        self.gateway
            .execute(request.method(Method::POST))
            .await
    }

    pub async fn update(&self, user: &UpdateUser) -> Result<()> {
        let request = RequestDescriptor::new(UPDATE).json(user)?;
        self.gateway.execute(request.method(Method::PUT)).await
    }

    pub async fn update_password(&self, change: &UpdatePassword) -> Result<String> {
        let request = RequestDescriptor::new(UPDATE_PASSWORD).json(change)?;
        self.gateway
            .fetch(request.method(Method::POST))
            .await
    }

    pub async fn page(&self, query: &PageQuery) -> Result<Page<UserInfo>> {
        let request = RequestDescriptor::new(PAGE)
            .query("page", query.page)
            .query("size", query.size)
            .query_opt("keyword", query.keyword.as_deref());
        self.gateway.fetch_page(request).await
    }

    pub async fn info(&self) -> Result<UserInfo> {
        self.gateway.fetch(RequestDescriptor::new(INFO)).await
    }
}
