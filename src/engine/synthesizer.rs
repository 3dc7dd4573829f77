//! Generative explorer: asks the model for SQL when no fixed rule applies.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::db::schema::SchemaSnapshot;
use crate::llm::prompts::{sql_prompt, UNRELATED_SENTINEL};
use crate::llm::{LlmError, LlmManager};

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:sql)?").expect("fence pattern is a valid regex"));

#[derive(Debug)]
pub enum Synthesis {
    Sql(String),
    /// The model judged the question out of domain, or produced nothing.
    Irrelevant,
}

fn strip_fences(raw: &str) -> String {
    FENCE.replace_all(raw, "").trim().to_string()
}

/// Byte offset of the first `;` outside single-quoted literals and double-quoted identifiers.
fn statement_end(sql: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in sql.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (None, ';') => return Some(i),
            (Some(open), _) if c == open => quote = None,
            _ => {}
        }
    }
    None
}

/// Strips code fences and trailing semicolons. Anything after a statement-ending `;` is
/// dropped so at most one statement reaches the store; semicolons inside quotes are kept.
pub fn clean_sql(raw: &str) -> String {
    let unfenced = strip_fences(raw);
    let first_statement = match statement_end(&unfenced) {
        Some(end) => &unfenced[..end],
        None => unfenced.as_str(),
    };
    first_statement.trim().to_string()
}

/// True when the reply carries the sentinel anywhere, in any case.
pub fn mentions_sentinel(raw: &str) -> bool {
    raw.to_uppercase().contains(UNRELATED_SENTINEL)
}

pub fn is_unrelated(cleaned: &str) -> bool {
    cleaned.is_empty() || mentions_sentinel(cleaned)
}

pub async fn synthesize(
    llm: &LlmManager,
    schema: &SchemaSnapshot,
    question: &str,
    temperature: f32,
) -> Result<Synthesis, LlmError> {
    info!("--- GENERATIVE EXPLORER: Using LLM for query generation ---");
    let prompt = sql_prompt(&schema.render(), question);
    debug!("Prepared LLM prompt: {}", prompt);

    let raw = llm.complete(&prompt, temperature).await?;
    debug!("Raw SQL reply: {}", raw);

    // Sentinel anywhere in the reply counts, even past a semicolon.
    let sql = clean_sql(&raw);
    if mentions_sentinel(&raw) || is_unrelated(&sql) {
        warn!("Question judged unrelated to the sales data");
        return Ok(Synthesis::Irrelevant);
    }

    info!("Generated SQL: {}", sql);
    Ok(Synthesis::Sql(sql))
}
