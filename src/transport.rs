use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{Result, ScopeError};

/// A decoded HTTP response: status, headers (lowercased names) and JSON body.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Issue a GET. `Err` means the request itself failed; an upstream error
    /// status is still `Ok` and must be checked by the caller.
    async fn get(&self, url: &str) -> Result<Response>;
}

pub struct HttpTransport {
    client: Client,
    token: Option<String>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ghscope/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ScopeError::Api(e.to_string()))?;

        Ok(Self { client, token })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("token {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Response> {
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| ScopeError::Api(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| ScopeError::Api(e.to_string()))?;

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                // Error pages are not always JSON; only a 2xx body must decode.
                Err(_) if !(200..300).contains(&status) => serde_json::Value::Null,
                Err(e) => return Err(ScopeError::Decode(e.to_string())),
            }
        };

        tracing::trace!(url, status, "GET");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("link".to_string(), "<x>; rel=\"last\"".to_string());
        let response = Response {
            status: 200,
            headers,
            body: serde_json::Value::Null,
        };
        assert_eq!(response.header("Link"), Some("<x>; rel=\"last\""));
        assert!(response.is_success());
    }

    #[test]
    fn non_2xx_is_not_success() {
        for status in [199, 301, 404, 500] {
            let response = Response {
                status,
                headers: HashMap::new(),
                body: serde_json::Value::Null,
            };
            assert!(!response.is_success(), "status {}", status);
        }
    }

    #[test]
    fn debug_hides_token() {
        let transport =
            HttpTransport::new(Some("secret".to_string()), Duration::from_secs(5)).unwrap();
        let rendered = format!("{:?}", transport);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("authenticated: true"));
    }

    #[test]
    fn authorization_header_only_with_token() {
        let anonymous = HttpTransport::new(None, Duration::from_secs(5)).unwrap();
        let request = anonymous.request("https://api.test/users/octocat/repos").build().unwrap();
        assert!(request.headers().get("authorization").is_none());
        assert_eq!(
            request.headers().get("accept").unwrap(),
            "application/vnd.github+json"
        );

        let authed = HttpTransport::new(Some("ghp_x".to_string()), Duration::from_secs(5)).unwrap();
        let request = authed.request("https://api.test/users/octocat/repos").build().unwrap();
        assert_eq!(request.headers().get("authorization").unwrap(), "token ghp_x");
    }

    #[tokio::test]
    async fn fake_answers_404_for_unknown_urls() {
        let fake = fake::FakeTransport::new();
        let response = fake.get("https://example.test/nope").await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(fake.calls("https://example.test/nope"), 1);
    }
}
