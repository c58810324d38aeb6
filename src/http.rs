//! HTTP access used by listings, latest-version lookups and downloads.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::trace;
use url::Url;

use crate::config::Config;
use crate::error::WebDriverError;

const USER_AGENT: &str = concat!("webdrivermanager/", env!("CARGO_PKG_VERSION"));

type Credentials = Option<(String, String)>;

/// Thin wrapper over `reqwest::Client` carrying the configured credentials.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    github_token: Credentials,
    repository_credentials: Credentials,
}

impl HttpClient {
    /// Builds a client with the configured timeout and proxy.
    pub fn new(config: &Config) -> Result<Self, WebDriverError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout));

        if let Some(proxy_url) = &config.proxy {
            let proxy_url = if proxy_url.contains("://") {
                proxy_url.clone()
            } else {
                format!("http://{proxy_url}")
            };
            let mut proxy = reqwest::Proxy::all(&proxy_url)
                .map_err(|e| WebDriverError::config("wdm.proxy", &proxy_url, e.to_string()))?;
            if let (Some(user), Some(pass)) = (&config.proxy_user, &config.proxy_pass) {
                proxy = proxy.basic_auth(user, pass);
            }
            builder = builder.proxy(proxy);
        }

        let owned = |pair: Option<(&str, &str)>| pair.map(|(a, b)| (a.to_string(), b.to_string()));
        Ok(Self {
            client: builder.build()?,
            github_token: owned(config.github_token()),
            repository_credentials: owned(config.local_repository_credentials()),
        })
    }

    /// Sends a GET request, failing on any non-success status.
    pub async fn get(&self, url: &Url) -> Result<reqwest::Response, WebDriverError> {
        trace!("GET {}", url);
        let mut request = self.client.get(url.as_str());

        let credentials = if url.host_str() == Some("api.github.com") {
            &self.github_token
        } else {
            &self.repository_credentials
        };
        if let Some((user, secret)) = credentials {
            request = request.basic_auth(user, Some(secret));
        }

        Ok(request.send().await?.error_for_status()?)
    }

    pub async fn get_text(&self, url: &Url) -> Result<String, WebDriverError> {
        Ok(self.get(url).await?.text().await?)
    }

    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, WebDriverError> {
        Ok(self.get(url).await?.bytes().await?.to_vec())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, WebDriverError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| WebDriverError::JsonParseError {
            url: url.to_string(),
            source: e,
        })
    }
}

/// Parses a configured URL, reporting the offending key on failure.
pub fn parse_url(value: &str) -> Result<Url, WebDriverError> {
    Url::parse(value).map_err(|e| WebDriverError::InvalidUrl {
        url: value.to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn get_text_returns_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/LATEST_RELEASE")
            .with_status(200)
            .with_body("2.46")
            .create_async()
            .await;

        let client = HttpClient::new(&Config::default()).unwrap();
        let url = parse_url(&format!("{}/LATEST_RELEASE", server.url())).unwrap();
        assert_eq!(client.get_text(&url).await.unwrap(), "2.46");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new(&Config::default()).unwrap();
        let url = parse_url(&format!("{}/missing", server.url())).unwrap();
        assert!(matches!(
            client.get_text(&url).await,
            Err(WebDriverError::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn repository_credentials_are_sent() {
        let mut server = Server::new_async().await;
        // "user:secret" in base64
        let mock = server
            .mock("GET", "/listing")
            .match_header("authorization", "Basic dXNlcjpzZWNyZXQ=")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let mut config = Config::default();
        config.local_repository_user = Some("user".to_string());
        config.local_repository_password = Some("secret".to_string());
        let client = HttpClient::new(&config).unwrap();
        let url = parse_url(&format!("{}/listing", server.url())).unwrap();
        assert_eq!(client.get_text(&url).await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[test]
    fn invalid_urls_are_reported() {
        assert!(matches!(
            parse_url("not a url"),
            Err(WebDriverError::InvalidUrl { .. })
        ));
    }
}
