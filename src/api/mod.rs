use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::Config,
    errors::{AppError, AppResult},
};

/// Credentials of the signed-in user, passed explicitly to every request.
#[derive(Clone)]
pub struct Session {
    token: SecretString,
}

impl Session {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.expose_secret())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"[redacted]").finish()
    }
}

/// HTTP client for the school platform's REST collaborators.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session: Session::new(config.api_token.clone()),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        log::debug!("GET {}", url);

        let request = self.session.authorize(self.http.get(&url).query(query));
        let response = request.send().await?;
        let response = Self::check_status(response, &url)?;
        Ok(response.json::<T>().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B, request_id: &str) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        log::debug!("POST {} (request {})", url, request_id);

        let request = self
            .session
            .authorize(self.http.post(&url))
            .header("X-Request-Id", request_id)
            .json(body);
        let response = request.send().await?;
        let response = Self::check_status(response, &url)?;
        Ok(response.json::<T>().await?)
    }

    fn check_status(response: reqwest::Response, url: &str) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(AppError::Upstream(format!("{} returned {}", url, status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let mut config = Config::test_config();
        config.api_base_url = "http://localhost:5000/api/".to_string();
        let client = ApiClient::new(&config).expect("client should build");

        assert_eq!(client.url("/gradebook"), "http://localhost:5000/api/gradebook");
        assert_eq!(
            client.url("evaluation/attempts"),
            "http://localhost:5000/api/evaluation/attempts"
        );
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session::new(SecretString::from("super-secret".to_string()));
        let printed = format!("{:?}", session);
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiClient>();
    }
}
