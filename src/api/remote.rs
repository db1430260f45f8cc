//! REST client for remote mode.
//!
//! One request per call, no retry. Any non-success status fails with
//! [`SigndeskError::RequestFailed`]; callers that treat absence as a value
//! use the `_optional` helpers, which turn a 404 into `None`.

use reqwest::header::HeaderValue;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::entity::Actor;
use crate::error::{Result, SigndeskError};

/// Request headers naming the user a remote mutation is attributed to.
pub const ACTOR_ID_HEADER: &str = "x-signdesk-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-signdesk-actor-name";

#[derive(Clone, Debug)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    actor: Option<Actor>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SigndeskError::Config(format!(
                "API base URL must be http(s): {}",
                base_url
            )));
        }
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url,
            actor: None,
        })
    }

    /// Attribute every request to `actor`.
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Remote request");
        let mut request = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(actor) = &self.actor {
            request = request.header(ACTOR_ID_HEADER, actor.id.as_bytes());
            if let Ok(name) = HeaderValue::from_bytes(actor.name.as_bytes()) {
                request = request.header(ACTOR_NAME_HEADER, name);
            }
        }
        request
    }

    /// Send; `None` on 404, error on any other non-success status.
    async fn execute(&self, request: RequestBuilder) -> Result<Option<Response>> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %response.url(), "Remote request failed");
            return Err(SigndeskError::RequestFailed {
                status: status.as_u16(),
            });
        }
        Ok(Some(response))
    }

    fn not_found_as_failure<T>(value: Option<T>) -> Result<T> {
        value.ok_or(SigndeskError::RequestFailed {
            status: StatusCode::NOT_FOUND.as_u16(),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        Ok(Self::not_found_as_failure(response)?.json().await?)
    }

    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.execute(self.request(Method::GET, path)).await? {
            Some(response) => Ok(Some(response.json().await?)),
            None => Ok(None),
        }
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .execute(self.request(Method::POST, path).json(body))
            .await?;
        Ok(Self::not_found_as_failure(response)?.json().await?)
    }

    pub async fn post_optional<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>> {
        match self
            .execute(self.request(Method::POST, path).json(body))
            .await?
        {
            Some(response) => Ok(Some(response.json().await?)),
            None => Ok(None),
        }
    }

    pub async fn patch_optional<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>> {
        match self
            .execute(self.request(Method::PATCH, path).json(body))
            .await?
        {
            Some(response) => Ok(Some(response.json().await?)),
            None => Ok(None),
        }
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .execute(self.request(Method::PUT, path).json(body))
            .await?;
        Ok(Self::not_found_as_failure(response)?.json().await?)
    }

    /// PUT where a 404 means the target does not exist.
    pub async fn put_existing<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        kind: &'static str,
        id: impl ToString,
        path: &str,
        body: &B,
    ) -> Result<T> {
        match self
            .execute(self.request(Method::PUT, path).json(body))
            .await?
        {
            Some(response) => Ok(response.json().await?),
            None => Err(SigndeskError::not_found(kind, id)),
        }
    }

    /// DELETE; `false` when the target did not exist.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        Ok(self
            .execute(self.request(Method::DELETE, path))
            .await?
            .is_some())
    }

    /// DELETE where a 404 means the target does not exist.
    pub async fn delete_existing(
        &self,
        kind: &'static str,
        id: impl ToString,
        path: &str,
    ) -> Result<()> {
        if self.delete(path).await? {
            Ok(())
        } else {
            Err(SigndeskError::not_found(kind, id))
        }
    }
}
