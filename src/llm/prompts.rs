//! The two prompt templates sent to the model: SQL synthesis and result summarization.

/// Token the model emits when a question has nothing to do with the sales data.
pub const UNRELATED_SENTINEL: &str = "UNRELATED";

pub fn sql_prompt(schema: &str, question: &str) -> String {
    format!(
        r#"
You are an expert SQL data analyst. Write a single, valid SQL query to answer the user's question.
### Database Schema:
{schema}
### CRITICAL RULE:
When a query requires grouping data (e.g., "per product"), you MUST use an aggregate function like `SUM()` on the columns being calculated.
### INSTRUCTIONS:
- Output ONLY the raw SQL query.
- If the question is irrelevant, output {UNRELATED_SENTINEL}.
### User Question: "{question}"
### SQL Query:
"#
    )
}

pub fn summary_prompt(question: &str, table_text: &str) -> String {
    format!(
        r#"
Provide a short, single-sentence summary for the data, based on the original question.
CRITICAL: Do NOT use any currency symbols like '$' or '₹'. State the numbers directly.

Question: {question}
Data:
{table_text}

Summary:
"#
    )
}
