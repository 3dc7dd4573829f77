pub mod prompts;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
    Timeout(Duration),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
            LlmError::Timeout(limit) => {
                write!(f, "LLM call timed out after {}s", limit.as_secs_f32())
            }
        }
    }
}

impl Error for LlmError {}

/// A chat-style completion service: one user message in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError>;
}

pub struct LlmManager {
    generator: Box<dyn TextGenerator>,
    timeout: Duration,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let generator: Box<dyn TextGenerator> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config, timeout)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config, timeout)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { generator, timeout })
    }

    pub fn with_generator(generator: Box<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Runs one completion, bounded by the configured timeout. No retries.
    pub async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        debug!("LLM call at temperature {}", temperature);
        match tokio::time::timeout(self.timeout, self.generator.complete(prompt, temperature)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("LLM call exceeded {:?}", self.timeout);
                Err(LlmError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::{LlmError, TextGenerator};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    pub enum Reply {
        Text(String),
        Fail(String),
        Hang,
    }

    /// Scripted generator that records every prompt it receives.
    #[derive(Clone, Default)]
    pub struct ScriptedLlm {
        replies: Arc<Mutex<VecDeque<Reply>>>,
        pub calls: Arc<Mutex<Vec<(String, f32)>>>,
    }

    impl ScriptedLlm {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                calls: Arc::default(),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn prompt(&self, idx: usize) -> String {
            self.calls.lock().unwrap()[idx].0.clone()
        }

        pub fn temperature(&self, idx: usize) -> f32 {
            self.calls.lock().unwrap()[idx].1
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedLlm {
        async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), temperature));
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Fail(msg)) => Err(LlmError::ConnectionError(msg)),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
                None => Err(LlmError::ResponseError("no scripted reply left".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Reply, ScriptedLlm};
    use super::*;

    #[tokio::test]
    async fn slow_generator_is_cut_off_by_timeout() {
        let llm = ScriptedLlm::new(vec![Reply::Hang]);
        let manager = LlmManager::with_generator(Box::new(llm), Duration::from_millis(20));

        let err = manager.complete("anything", 0.0).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut config = crate::config::AppConfig::default().llm;
        config.backend = "local".to_string();
        match LlmManager::new(&config) {
            Err(LlmError::ConfigError(msg)) => assert!(msg.contains("local")),
            _ => panic!("expected a configuration error"),
        }
    }
}
