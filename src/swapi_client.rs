use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct LookupError {
    message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Read-only access to the character search of the remote API.
///
/// Implementations return the response body untouched; callers decide how to
/// present it.
#[async_trait]
pub trait CharacterLookup: Send + Sync {
    async fn search_people(&self, name: &str) -> Result<String, LookupError>;
}

#[derive(Debug, Clone)]
pub struct SwapiClient {
    base_url: Url,
    client: Client,
}

impl SwapiClient {
    pub fn new(base_url: Url) -> Result<Self, LookupError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn people_url(&self) -> String {
        format!("{}people/", self.base_url)
    }
}

#[async_trait]
impl CharacterLookup for SwapiClient {
    async fn search_people(&self, name: &str) -> Result<String, LookupError> {
        let url = self.people_url();
        debug!(url = %url, name = %name, "querying people endpoint");

        let response = self
            .client
            .get(&url)
            .query(&[("name", name)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "people endpoint returned non-success status");
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, net::SocketAddr};

    use axum::{extract::Query, http::StatusCode, routing::get, Router};

    use super::*;

    async fn spawn_upstream(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("upstream addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("upstream serve");
        });
        addr
    }

    fn client_for(addr: SocketAddr) -> SwapiClient {
        let base_url = format!("http://{addr}/api/").parse().expect("valid url");
        SwapiClient::new(base_url).expect("client build")
    }

    #[test]
    fn people_url_is_joined_to_base() {
        let client =
            SwapiClient::new("https://swapi.dev/api/".parse().expect("valid url")).expect("client");
        assert_eq!(client.people_url(), "https://swapi.dev/api/people/");
    }

    #[tokio::test]
    async fn returns_raw_body_verbatim() {
        let body = r#"{"results":[{"name":"Luke Skywalker"}]}"#;
        let router = Router::new().route("/api/people/", get(move || async move { body }));
        let addr = spawn_upstream(router).await;

        let text = client_for(addr)
            .search_people("Luke")
            .await
            .expect("lookup succeeds");
        assert_eq!(text, body);
    }

    #[tokio::test]
    async fn sends_name_as_encoded_query_value() {
        let router = Router::new().route(
            "/api/people/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                params.get("name").cloned().unwrap_or_default()
            }),
        );
        let addr = spawn_upstream(router).await;

        let echoed = client_for(addr)
            .search_people("Obi-Wan & Kenobi?x=1")
            .await
            .expect("lookup succeeds");
        assert_eq!(echoed, "Obi-Wan & Kenobi?x=1");
    }

    #[tokio::test]
    async fn non_success_status_body_is_forwarded() {
        let router = Router::new().route(
            "/api/people/",
            get(|| async { (StatusCode::NOT_FOUND, r#"{"detail":"Not found"}"#) }),
        );
        let addr = spawn_upstream(router).await;

        let text = client_for(addr)
            .search_people("Jar Jar")
            .await
            .expect("lookup succeeds");
        assert_eq!(text, r#"{"detail":"Not found"}"#);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind free port");
        let addr = listener.local_addr().expect("free port addr");
        drop(listener);

        let err = client_for(addr)
            .search_people("Luke")
            .await
            .expect_err("connection must fail");
        assert!(!err.message().is_empty());
    }
}
