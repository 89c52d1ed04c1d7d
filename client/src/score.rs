//! Score synchronization with the group server.
//!
//! Login is the one blocking call, made once at startup. Death reports are
//! fire-and-forget: a background task retries a bounded number of times and
//! then drops the report, logging either way. The game loop never waits on
//! the network.

use log::{info, warn};
use shared::{LoginRequest, LoginResponse, ScoreOutcome};
use std::time::Duration;
use tokio::runtime::Runtime;

pub const REPORT_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct ScoreReporter {
    runtime: Runtime,
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ScoreReporter {
    pub fn new(base_url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(ScoreReporter {
            runtime: Runtime::new()?,
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Authenticates against the server and stores the session token for
    /// later score submissions.
    pub fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, Box<dyn std::error::Error>> {
        let url = format!("{}/auth/login", self.base_url);
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let http = self.http.clone();

        let response: LoginResponse = self.runtime.block_on(async move {
            let response = http.post(&url).json(&body).send().await?;
            let response = response.error_for_status()?;
            response.json::<LoginResponse>().await
        })?;

        info!("logged in as {} (user {})", response.username, response.user_id);
        self.token = Some(response.token.clone());
        Ok(response)
    }

    /// Submits a final kill count for the group. Returns immediately; the
    /// submission runs in the background with bounded retries and is dropped
    /// if the server stays unreachable.
    pub fn report(&self, group_id: i64, kills: u32) {
        let Some(token) = self.token.clone() else {
            return;
        };
        let url = format!("{}/groups/{}/game/score", self.base_url, group_id);
        let http = self.http.clone();

        self.runtime.spawn(async move {
            for attempt in 1..=REPORT_ATTEMPTS {
                match submit(&http, &url, &token, kills).await {
                    Ok(outcome) => {
                        info!(
                            "score submitted: previous best {} -> {}",
                            outcome.previous, outcome.updated
                        );
                        return;
                    }
                    Err(e) => {
                        warn!(
                            "score submission attempt {}/{} failed: {}",
                            attempt, REPORT_ATTEMPTS, e
                        );
                        if attempt < REPORT_ATTEMPTS {
                            tokio::time::sleep(RETRY_DELAY * attempt).await;
                        }
                    }
                }
            }
            warn!(
                "dropping score report ({} kills) after {} attempts",
                kills, REPORT_ATTEMPTS
            );
        });
    }
}

async fn submit(
    http: &reqwest::Client,
    url: &str,
    token: &str,
    kills: u32,
) -> Result<ScoreOutcome, reqwest::Error> {
    let response = http
        .post(url)
        .bearer_auth(token)
        .json(&serde_json::json!({ "kills": kills }))
        .send()
        .await?;
    let response = response.error_for_status()?;
    response.json::<ScoreOutcome>().await
}
