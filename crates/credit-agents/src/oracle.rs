//! Oracle client: one persona + prompt in, one untrusted text reply out.
//!
//! `RigOracle` talks to any OpenAI-compatible chat endpoint through rig's
//! `CompletionsClient`. The client wraps a pooled HTTP client and is shared by
//! every concurrent evaluation; each call builds a throwaway agent carrying the
//! persona's preamble, so no conversational state lives in the client.
//!
//! No retries happen here. A timeout or transport failure is reported once and
//! the evaluation that issued the call fails.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::{debug, warn};

use crate::agents::Persona;
use crate::config::OracleConfig;
use crate::errors::{EvaluationError, OracleError};

/// External text-generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Ask `persona` to answer `prompt`.
    async fn complete(&self, persona: &Persona, prompt: &str) -> Result<String, OracleError>;
}

pub struct RigOracle {
    client: openai::CompletionsClient,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl RigOracle {
    pub fn from_config(config: &OracleConfig) -> Result<Self, EvaluationError> {
        let client = openai::CompletionsClient::builder()
            .api_key(&config.api_key)
            .base_url(&config.base_url)
            .build()
            .map_err(|e| {
                EvaluationError::Configuration(format!("failed to build oracle client: {e}"))
            })?;

        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Oracle for RigOracle {
    async fn complete(&self, persona: &Persona, prompt: &str) -> Result<String, OracleError> {
        let agent = self
            .client
            .agent(&self.model)
            .name(&persona.name)
            .description(&persona.description)
            .preamble(&persona.preamble)
            .temperature(self.temperature)
            .build();

        let started = Instant::now();
        let reply = tokio::time::timeout(self.timeout, async { agent.prompt(prompt).await }).await;

        match reply {
            Err(_) => {
                warn!(
                    persona = %persona.name,
                    timeout_secs = self.timeout.as_secs(),
                    "Oracle call timed out"
                );
                Err(OracleError::Timeout(self.timeout))
            }
            Ok(Err(e)) => {
                let err = classify_prompt_error(&e.to_string(), self.timeout);
                warn!(persona = %persona.name, error = %e, "Oracle call failed");
                Err(err)
            }
            Ok(Ok(text)) => {
                debug!(
                    persona = %persona.name,
                    prompt_chars = prompt.chars().count(),
                    reply_chars = text.chars().count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Oracle replied"
                );
                Ok(text)
            }
        }
    }
}

/// Map a provider error message onto the oracle taxonomy.
///
/// Transport-level timeouts surface as error text rather than as our own
/// deadline firing, so they are recognised by message.
fn classify_prompt_error(message: &str, timeout: Duration) -> OracleError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        OracleError::Timeout(timeout)
    } else {
        OracleError::Unavailable(message.to_string())
    }
}

/// Check if the oracle endpoint is reachable (GET {base_url}/models).
pub async fn check_endpoint(config: &OracleConfig) -> bool {
    let models_url = format!("{}/models", config.base_url.trim_end_matches('/'));
    match reqwest::Client::new()
        .get(&models_url)
        .bearer_auth(&config.api_key)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
