//! HTTP/JSON implementation of [`RemoteContentGateway`].
//!
//! Endpoints, relative to the configured base URL:
//! - `GET|PUT collections/{name}`
//! - `GET|PUT profiles/{id}` (404 on GET means "no profile yet")
//! - `GET leaderboard`
//! - `GET notifications`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use super::gateway::{OfflineGateway, RemoteContentGateway};
use super::types::ContentCollection;
use crate::content::{ContentItem, Notification, Profile};
use crate::error::SyncError;
use crate::storage::RemoteConfig;

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpGateway {
    /// # Errors
    ///
    /// [`SyncError::NotConfigured`] without a base URL, or
    /// [`SyncError::InvalidUrl`] when it does not parse.
    pub fn new(config: &RemoteConfig) -> Result<Self, SyncError> {
        let base = config
            .base_url
            .as_deref()
            .filter(|_| config.is_configured())
            .ok_or(SyncError::NotConfigured)?;
        let base_url = Url::parse(base.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// GET and decode. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, SyncError> {
        tracing::debug!(%url, "GET");
        let response = self.authorize(self.client.get(url.clone())).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                endpoint: url.path().to_string(),
            });
        }
        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn put_json<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<(), SyncError> {
        tracing::debug!(%url, "PUT");
        let response = self
            .authorize(self.client.put(url.clone()))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                endpoint: url.path().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteContentGateway for HttpGateway {
    async fn fetch_collection(
        &self,
        collection: ContentCollection,
    ) -> Result<Vec<ContentItem>, SyncError> {
        let url = self.endpoint(&["collections", collection.remote_name()]);
        Ok(self.get_json(url).await?.unwrap_or_default())
    }

    async fn save_collection(
        &self,
        collection: ContentCollection,
        items: &[ContentItem],
    ) -> Result<(), SyncError> {
        let url = self.endpoint(&["collections", collection.remote_name()]);
        self.put_json(url, items).await
    }

    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, SyncError> {
        self.get_json(self.endpoint(&["profiles", id])).await
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), SyncError> {
        self.put_json(self.endpoint(&["profiles", &profile.id]), profile).await
    }

    async fn fetch_leaderboard(&self) -> Result<Vec<Profile>, SyncError> {
        Ok(self.get_json(self.endpoint(&["leaderboard"])).await?.unwrap_or_default())
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, SyncError> {
        Ok(self.get_json(self.endpoint(&["notifications"])).await?.unwrap_or_default())
    }
}

/// Gateway for `config`: HTTP when a usable base URL is set, otherwise
/// [`OfflineGateway`].
pub fn gateway_from_config(config: &RemoteConfig) -> Arc<dyn RemoteContentGateway> {
    match HttpGateway::new(config) {
        Ok(gateway) => Arc::new(gateway),
        Err(SyncError::NotConfigured) => Arc::new(OfflineGateway),
        Err(e) => {
            tracing::warn!(error = %e, "remote store unusable, running offline");
            Arc::new(OfflineGateway)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> RemoteConfig {
        RemoteConfig {
            base_url: Some(base_url.to_string()),
            api_key: Some("secret".to_string()),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn missing_base_url_is_not_configured() {
        let result = HttpGateway::new(&RemoteConfig::default());
        assert!(matches!(result, Err(SyncError::NotConfigured)));
        assert!(!gateway_from_config(&RemoteConfig::default()).is_configured());
    }

    #[test]
    fn invalid_base_url_falls_back_offline() {
        assert!(matches!(
            HttpGateway::new(&config("not a url")),
            Err(SyncError::InvalidUrl(_))
        ));
        assert!(!gateway_from_config(&config("not a url")).is_configured());
    }

    #[test]
    fn endpoints_escape_ids_and_keep_base_path() {
        let gateway = HttpGateway::new(&config("https://api.example.com/v1/")).unwrap();
        assert_eq!(
            gateway.endpoint(&["profiles", "a b/c"]).as_str(),
            "https://api.example.com/v1/profiles/a%20b%2Fc"
        );
        let gateway = HttpGateway::new(&config("https://api.example.com/v1")).unwrap();
        assert_eq!(
            gateway.endpoint(&["leaderboard"]).as_str(),
            "https://api.example.com/v1/leaderboard"
        );
    }

    #[tokio::test]
    async fn fetch_collection_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/collections/modules")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"m1","title":"Basics","lessons":["l1","l2"]}]"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&config(&server.url())).unwrap();
        let items = gateway.fetch_collection(ContentCollection::Modules).await.unwrap();

        mock.assert_async().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].lesson_ids(), vec!["l1", "l2"]);
    }

    #[tokio::test]
    async fn missing_profile_maps_to_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/profiles/learner-1")
            .with_status(404)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&config(&server.url())).unwrap();
        assert_eq!(gateway.fetch_profile("learner-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_reported_with_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/leaderboard")
            .with_status(503)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&config(&server.url())).unwrap();
        match gateway.fetch_leaderboard().await {
            Err(SyncError::Status { status, endpoint }) => {
                assert_eq!(status, 503);
                assert_eq!(endpoint, "/leaderboard");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_profile_puts_camel_case_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/profiles/learner-1")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "id": "learner-1",
                "name": "Ada",
                "xp": 0,
                "level": 1
            })))
            .with_status(204)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&config(&server.url())).unwrap();
        let record = crate::progress::ProgressRecord::new("learner-1", "Ada");
        gateway
            .save_profile(&Profile::from_progress(&record, chrono::Utc::now()))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_body_is_serialization_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/notifications")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let gateway = HttpGateway::new(&config(&server.url())).unwrap();
        assert!(matches!(
            gateway.fetch_notifications().await,
            Err(SyncError::Serialization(_))
        ));
    }
}
