//! Backend access for reset/seed and reachability checks

use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

pub const RESET_PATH: &str = "/api/testing/reset";
pub const USERS_PATH: &str = "/api/users";

/// A user account as the backend accepts it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub username: String,
    pub password: String,
}

impl User {
    pub fn new(name: &str, username: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl Default for User {
    fn default() -> Self {
        User::new("Berkan Sözer", "berkan", "123456")
    }
}

/// REST client for the testing endpoints of the blog backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wipe all users and blogs
    pub async fn reset(&self) -> E2eResult<()> {
        debug!("Resetting backend at {}", self.base_url);
        self.post(RESET_PATH, None).await
    }

    /// Create one user; the backend rejects duplicate usernames
    pub async fn create_user(&self, user: &User) -> E2eResult<()> {
        debug!("Seeding user '{}'", user.username);
        self.post(USERS_PATH, Some(serde_json::to_value(user)?)).await
    }

    async fn post(&self, path: &str, body: Option<serde_json::Value>) -> E2eResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| E2eError::Backend(format!("POST {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(E2eError::BackendStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Poll `url` until any HTTP response arrives or `timeout_duration` elapses.
///
/// Any status counts as reachable: a 404 on `/` still proves the process is
/// listening.
pub async fn wait_until_reachable(url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(url).send().await {
            Ok(_) => return Ok(()),
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", url);
                }
                // Connection refused is expected while the process starts
                if !e.is_connect() {
                    warn!("Reachability check error: {}", e);
                }
            }
        }

        if start.elapsed() >= timeout_duration {
            return Err(E2eError::Unreachable {
                url: url.to_string(),
                attempts,
            });
        }
        sleep(Duration::from_millis(100)).await;
    }
}

/// A backend that has been reset and seeded for one scenario.
///
/// `acquire` resets then seeds, strictly in that order, and must finish
/// before the page loads. `release` resets again and is called by the
/// runner whatever the scenario outcome.
pub struct CleanBackend {
    client: BackendClient,
    released: bool,
}

impl CleanBackend {
    pub async fn acquire(
        client: &BackendClient,
        seed_user: &User,
        extra_users: &[User],
    ) -> E2eResult<Self> {
        client.reset().await?;
        client.create_user(seed_user).await?;
        for user in extra_users {
            client.create_user(user).await?;
        }

        Ok(Self {
            client: client.clone(),
            released: false,
        })
    }

    pub async fn release(mut self) -> E2eResult<()> {
        self.released = true;
        self.client.reset().await
    }
}

impl Drop for CleanBackend {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Backend fixture for {} dropped without release; state left behind",
                self.client.base_url
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = BackendClient::new("http://localhost:3003/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3003");
    }

    #[test]
    fn test_user_body_shape() {
        let user = User::new("Matti Luukkainen", "mluukkai", "salainen");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Matti Luukkainen",
                "username": "mluukkai",
                "password": "salainen",
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}", port);

        let err = wait_until_reachable(&url, Duration::from_millis(250))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::Unreachable { .. }));
        assert_eq!(err.kind(), crate::error::FailureKind::Infrastructure);
    }
}
