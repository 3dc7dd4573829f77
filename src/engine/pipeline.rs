use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::LlmConfig;
use crate::db::store::DataStore;
use crate::db::StoreError;
use crate::engine::chart::{select_chart, ChartSpec};
use crate::engine::response::ResponseEnvelope;
use crate::engine::rules::{match_intent, normalize, Intent};
use crate::engine::summarizer::summarize;
use crate::engine::synthesizer::{synthesize, Synthesis};
use crate::llm::LlmManager;

/// The envelope plus the chart picked for its rows.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    pub chart: Option<ChartSpec>,
    #[serde(skip)]
    pub intent: Intent,
}

impl Answer {
    fn without_chart(intent: Intent, envelope: ResponseEnvelope) -> Self {
        Self {
            envelope,
            chart: None,
            intent,
        }
    }
}

pub struct QueryPipeline {
    store: DataStore,
    llm: LlmManager,
    sql_temperature: f32,
    summary_temperature: f32,
}

impl QueryPipeline {
    pub fn new(store: DataStore, llm: LlmManager, config: &LlmConfig) -> Self {
        Self {
            store,
            llm,
            sql_temperature: config.sql_temperature,
            summary_temperature: config.summary_temperature,
        }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Resolves a question to SQL, runs it and describes the result.
    ///
    /// Request-level failures come back inside the envelope. The only `Err` is a store that
    /// cannot be introspected, which is a configuration problem rather than a bad question.
    pub async fn answer(&self, question: &str) -> Result<Answer, StoreError> {
        let intent = match_intent(&normalize(question));

        let sql = match intent.sql() {
            Some(sql) => {
                info!("--- ANALYTICS ENGINE: Using pre-defined query for {:?} ---", intent);
                sql
            }
            None => {
                let schema = self.store.schema().await?;
                match synthesize(&self.llm, &schema, question, self.sql_temperature).await {
                    Ok(Synthesis::Sql(sql)) => sql,
                    Ok(Synthesis::Irrelevant) => {
                        return Ok(Answer::without_chart(intent, ResponseEnvelope::irrelevant()));
                    }
                    Err(e) => {
                        error!("LLM could not generate query: {}", e);
                        return Ok(Answer::without_chart(
                            intent,
                            ResponseEnvelope::generation_failed(e),
                        ));
                    }
                }
            }
        };

        let table = match self.store.execute(&sql).await {
            Ok(table) => table,
            Err(e) => {
                warn!("SQL query failed: {} - SQL was: {}", e, sql);
                return Ok(Answer::without_chart(
                    intent,
                    ResponseEnvelope::execution_failed(sql, e),
                ));
            }
        };

        let data = table.to_records();
        let chart = select_chart(&table);

        let envelope = match summarize(&self.llm, question, &table, self.summary_temperature).await {
            Ok(summary) => ResponseEnvelope::success(summary, sql, data),
            Err(e) => {
                error!("LLM could not summarize results: {}", e);
                ResponseEnvelope::summary_failed(sql, data, e)
            }
        };

        Ok(Answer {
            envelope,
            chart,
            intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::fixtures::sales_db;
    use crate::engine::chart::ChartKind;
    use crate::engine::response::ErrorKind;
    use crate::engine::rules::SortDirection;
    use crate::engine::summarizer::EMPTY_RESULT_SUMMARY;
    use crate::llm::testing::{Reply, ScriptedLlm};
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;

    fn pipeline(path: &Path, llm: &ScriptedLlm, timeout: Duration) -> QueryPipeline {
        let config = AppConfig::default().llm;
        QueryPipeline::new(
            DataStore::new(path),
            LlmManager::with_generator(Box::new(llm.clone()), timeout),
            &config,
        )
    }

    fn text(s: &str) -> Reply {
        Reply::Text(s.to_string())
    }

    #[tokio::test]
    async fn total_sales_uses_the_fixed_query() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![text(" Total sales came to 1000. ")]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("What is the total sales?")
            .await
            .unwrap();

        assert_eq!(answer.intent, Intent::TotalSales);
        assert_eq!(answer.envelope.error, None);
        assert_eq!(answer.envelope.sql_query, Intent::TotalSales.sql().unwrap());
        assert_eq!(answer.envelope.data, vec![json!({"total_sales": 1000.0}).as_object().unwrap().clone()]);
        assert_eq!(answer.envelope.summary, "Total sales came to 1000.");
        assert!(answer.chart.is_none());

        // Only the summary call; no SQL synthesis.
        assert_eq!(llm.call_count(), 1);
        assert_eq!(llm.temperature(0), 0.5);
    }

    #[tokio::test]
    async fn highest_and_lowest_cpc_pick_opposite_items() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![text("Item 2."), text("Item 1.")]);
        let pipeline = pipeline(&path, &llm, Duration::from_secs(5));

        let highest = pipeline.answer("Which item has the highest CPC?").await.unwrap();
        assert_eq!(highest.intent, Intent::CpcExtremum(SortDirection::Desc));
        assert_eq!(highest.envelope.data[0]["item_id"], json!(2));
        assert_eq!(highest.envelope.data[0]["cpc"], json!(6.0));

        let lowest = pipeline.answer("lowest cpc please").await.unwrap();
        assert_eq!(lowest.intent, Intent::CpcExtremum(SortDirection::Asc));
        assert_eq!(lowest.envelope.data[0]["item_id"], json!(1));
        assert_eq!(lowest.envelope.data[0]["cpc"], json!(2.0));
    }

    #[tokio::test]
    async fn roas_never_reaches_the_synthesizer() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![text("RoAS is about 2.78.")]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("Calculate the RoAS (Return on Ad Spend).")
            .await
            .unwrap();

        assert_eq!(answer.intent, Intent::Roas);
        assert!(answer.envelope.is_success());
        assert_eq!(llm.call_count(), 1);
        assert!(!llm.prompt(0).contains("Database Schema:"));
        let roas = answer.envelope.data[0]["roas"].as_f64().unwrap();
        assert!((roas - 500.0 / 180.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unrelated_questions_are_rejected_without_running_sql() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![text("UNRELATED")]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("What's the weather today?")
            .await
            .unwrap();

        assert_eq!(answer.envelope.error, Some(ErrorKind::Irrelevant));
        assert!(answer.envelope.data.is_empty());
        assert_eq!(llm.call_count(), 1);
        assert_eq!(llm.temperature(0), 0.0);
        assert!(llm.prompt(0).contains("Table 'ad_sales':"));
        assert!(llm.prompt(0).contains("\"What's the weather today?\""));
    }

    #[tokio::test]
    async fn invalid_sql_is_an_execution_error_with_the_sql_attached() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![text("```sql\nSELEC item_id FRM ad_sales;\n```")]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("List every item")
            .await
            .unwrap();

        assert_eq!(answer.envelope.error, Some(ErrorKind::ExecutionError));
        assert_eq!(answer.envelope.sql_query, "SELEC item_id FRM ad_sales");
        assert!(answer.envelope.data.is_empty());
        assert!(answer.envelope.summary.starts_with("SQL query failed. Details: "));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_results_skip_the_summary_call() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![text("SELECT item_id FROM ad_sales WHERE clicks > 1000")]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("Items with more than 1000 clicks?")
            .await
            .unwrap();

        assert!(answer.envelope.is_success());
        assert_eq!(answer.envelope.summary, EMPTY_RESULT_SUMMARY);
        assert!(answer.envelope.data.is_empty());
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn generated_time_series_gets_a_line_chart() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![
            text("SELECT date, SUM(total_sales) AS revenue FROM total_sales GROUP BY date ORDER BY date;"),
            text("Revenue peaked on 2025-06-01."),
        ]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("Revenue per day?")
            .await
            .unwrap();

        assert!(answer.envelope.is_success());
        assert_eq!(answer.envelope.data.len(), 2);
        let chart = answer.chart.unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.x, "date");
        assert_eq!(chart.y, "revenue");
    }

    #[tokio::test]
    async fn synthesis_failure_is_an_llm_error() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![Reply::Fail("connection refused".to_string())]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("Units sold per item?")
            .await
            .unwrap();

        assert_eq!(answer.envelope.error, Some(ErrorKind::LlmError));
        assert_eq!(answer.envelope.sql_query, "Error during LLM call.");
        assert!(answer.envelope.summary.contains("connection refused"));
    }

    #[tokio::test]
    async fn hung_model_times_out_as_llm_error() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![Reply::Hang]);
        let answer = pipeline(&path, &llm, Duration::from_millis(20))
            .answer("Units sold per item?")
            .await
            .unwrap();

        assert_eq!(answer.envelope.error, Some(ErrorKind::LlmError));
        assert!(answer.envelope.summary.contains("timed out"));
    }

    #[tokio::test]
    async fn summary_failure_keeps_the_rows() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![Reply::Fail("model crashed".to_string())]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("What is the total sales?")
            .await
            .unwrap();

        assert_eq!(answer.envelope.error, Some(ErrorKind::LlmError));
        assert_eq!(answer.envelope.sql_query, Intent::TotalSales.sql().unwrap());
        assert_eq!(answer.envelope.data.len(), 1);
        assert!(answer.envelope.summary.contains("model crashed"));
    }

    #[tokio::test]
    async fn unreachable_store_is_fatal_only_for_introspection() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.duckdb");
        let llm = ScriptedLlm::new(vec![]);
        let pipeline = pipeline(&missing, &llm, Duration::from_secs(5));

        let err = pipeline.answer("Units sold per item?").await.unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
        assert_eq!(llm.call_count(), 0);

        let answer = pipeline.answer("What is the total sales?").await.unwrap();
        assert_eq!(answer.envelope.error, Some(ErrorKind::ExecutionError));
    }

    #[tokio::test]
    async fn answer_serializes_envelope_fields_and_chart() {
        let (_dir, path) = sales_db();
        let llm = ScriptedLlm::new(vec![text("UNRELATED")]);
        let answer = pipeline(&path, &llm, Duration::from_secs(5))
            .answer("Tell me a joke")
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&answer).unwrap(),
            json!({
                "summary": "I can only answer questions related to e-commerce data.",
                "sql_query": "N/A",
                "data": [],
                "error": "irrelevant",
                "chart": null
            })
        );
    }
}
