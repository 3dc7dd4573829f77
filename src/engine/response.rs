use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Irrelevant,
    LlmError,
    ExecutionError,
}

/// What a caller gets back for every question. `error` is `None` only on full success.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub summary: String,
    pub sql_query: String,
    pub data: Vec<Map<String, Value>>,
    pub error: Option<ErrorKind>,
}

impl ResponseEnvelope {
    pub fn success(summary: String, sql_query: String, data: Vec<Map<String, Value>>) -> Self {
        Self {
            summary,
            sql_query,
            data,
            error: None,
        }
    }

    pub fn irrelevant() -> Self {
        Self {
            summary: "I can only answer questions related to e-commerce data.".to_string(),
            sql_query: "N/A".to_string(),
            data: Vec::new(),
            error: Some(ErrorKind::Irrelevant),
        }
    }

    pub fn generation_failed(err: impl Display) -> Self {
        Self {
            summary: format!("Could not generate query: {}", err),
            sql_query: "Error during LLM call.".to_string(),
            data: Vec::new(),
            error: Some(ErrorKind::LlmError),
        }
    }

    /// The query ran but the model could not describe it; rows are still returned.
    pub fn summary_failed(sql_query: String, data: Vec<Map<String, Value>>, err: impl Display) -> Self {
        Self {
            summary: format!("Could not summarize results: {}", err),
            sql_query,
            data,
            error: Some(ErrorKind::LlmError),
        }
    }

    pub fn execution_failed(sql_query: String, err: impl Display) -> Self {
        Self {
            summary: format!("SQL query failed. Details: {}", err),
            sql_query,
            data: Vec::new(),
            error: Some(ErrorKind::ExecutionError),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
