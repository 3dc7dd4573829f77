use tracing::{debug, info};

use crate::db::table::ResultTable;
use crate::llm::prompts::summary_prompt;
use crate::llm::{LlmError, LlmManager};

pub const EMPTY_RESULT_SUMMARY: &str = "The query ran successfully but returned no data.";

/// One-sentence description of the result. Empty results are described without the model.
pub async fn summarize(
    llm: &LlmManager,
    question: &str,
    table: &ResultTable,
    temperature: f32,
) -> Result<String, LlmError> {
    if table.is_empty() {
        info!("Empty result, skipping summary call");
        return Ok(EMPTY_RESULT_SUMMARY.to_string());
    }

    let prompt = summary_prompt(question, &table.render_text());
    debug!("Summary prompt: {}", prompt);

    let summary = llm.complete(&prompt, temperature).await?;
    Ok(summary.trim().to_string())
}
