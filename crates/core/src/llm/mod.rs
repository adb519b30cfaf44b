pub mod anthropic;
pub mod error;
pub mod fallback;

use crate::domain::flight::Route;
use crate::domain::market::{PriceStatistics, Trend};
use crate::domain::recommendation::{ExplanationSource, Recommendation};
use error::{LlmDiagnosticsError, RAW_EXCERPT_CHARS};

/// What the explainer gets to see for one query.
#[derive(Debug, Clone)]
pub struct ExplainInput {
    pub route: Route,
    pub departure_date: chrono::NaiveDate,
    pub budget: f64,
    pub cheapest_price: Option<f64>,
    pub stats: PriceStatistics,
    pub recommendation: Option<Recommendation>,
    pub momentum: Trend,
}

#[derive(Debug, Clone)]
pub enum Provider {
    Anthropic,
}

#[async_trait::async_trait]
pub trait Explainer: Send + Sync {
    fn provider(&self) -> Provider;

    async fn explain(&self, input: &ExplainInput) -> anyhow::Result<String>;
}

/// Asks the explainer when one is configured and there is a recommendation to
/// explain; otherwise, or on any error, uses the offline template.
pub async fn explain_or_fallback(
    explainer: Option<&dyn Explainer>,
    input: &ExplainInput,
) -> (String, ExplanationSource) {
    if let (Some(explainer), Some(_)) = (explainer, input.recommendation.as_ref()) {
        match explainer.explain(input).await {
            Ok(text) => return (text, ExplanationSource::Llm),
            Err(err) => {
                tracing::warn!(
                    route = %input.route,
                    provider = ?explainer.provider(),
                    error = %err,
                    "explainer failed; using fallback template"
                );
                if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                    tracing::debug!(
                        route = %input.route,
                        stage = diag.stage,
                        raw = diag.raw_excerpt(RAW_EXCERPT_CHARS).as_deref().unwrap_or(""),
                        "explainer raw response"
                    );
                }
            }
        }
    }
    (fallback::explain(input), ExplanationSource::Fallback)
}
