use crate::domain::model::ProbeOutcome;
use crate::domain::ports::LivenessProbe;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// `GET http://127.0.0.1:<port>/admin/` 單次探測
#[derive(Debug, Clone)]
pub struct HttpLivenessProbe {
    client: Client,
    host: String,
}

impl HttpLivenessProbe {
    pub fn new(timeout: Duration, user_agent: &str) -> crate::utils::error::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            host: "127.0.0.1".to_string(),
        })
    }

    pub fn endpoint(&self, port: u16) -> String {
        format!("http://{}:{}/admin/", self.host, port)
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn probe(&self, port: u16) -> ProbeOutcome {
        let url = self.endpoint(port);
        match self.client.get(&url).send().await {
            Ok(response) => {
                tracing::debug!("probe {} -> {}", url, response.status());
                ProbeOutcome::Connected {
                    status: response.status().as_u16(),
                }
            }
            Err(e) => {
                tracing::debug!("probe {} -> {}", url, e);
                ProbeOutcome::NotConnected
            }
        }
    }
}
