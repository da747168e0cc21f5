use thiserror::Error;
use tracing::{error, info, warn};

use crate::gemini::{ChunkSource, GeminiClient, GenerationError, HttpChunkSource};
use crate::models::GenerationOptions;
use crate::normalize::{extract, preview, ExtractionError, ExtractionMethod};
use crate::prompt::build_prompt;
use crate::schema::{output_schema, validate, NormalizedResult, SchemaError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error(transparent)] Generation(#[from] GenerationError),
    #[error(transparent)] Extraction(#[from] ExtractionError),
    #[error(transparent)] Schema(#[from] SchemaError),
}

impl NamingError {
    /// Configuration problems are for operators, not for a retry button.
    pub fn is_configuration(&self) -> bool {
        matches!(self, NamingError::Generation(GenerationError::MissingCredential(_)))
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_configuration()
    }
}

pub struct NameStylist<S = HttpChunkSource> {
    client: GeminiClient<S>,
}

impl<S: ChunkSource> NameStylist<S> {
    pub fn new(client: GeminiClient<S>) -> Self {
        Self { client }
    }

    /// Runs one generation for `options`. Never retries.
    pub async fn generate_styled_name(&self, options: &GenerationOptions) -> Result<NormalizedResult, NamingError> {
        let variant = options.variant();
        info!("🎯 Generating {:?} Korean name for '{}'", variant, options.original_name());

        let prompt = build_prompt(options.gender, options.script_style, variant);
        let schema = output_schema(variant);
        let raw = self.client
            .generate(variant.tier(), &prompt, options.original_name(), &schema)
            .await?;

        let extraction = extract(&raw).map_err(|e| {
            warn!("⚠️ Could not extract JSON ({}); raw output: {}", e, preview(&raw));
            e
        })?;
        if extraction.method == ExtractionMethod::RegexFallback {
            warn!("⚠️ JSON recovered by trailing-object fallback (low confidence): {}", preview(&raw));
        }

        let result = validate(extraction.value, variant, options.original_name()).map_err(|e| {
            error!("❌ {:?} result rejected: {}", variant, e);
            e
        })?;

        info!("✅ Generated {} for '{}'", result.full_name().unwrap_or("<unnamed>"), options.original_name());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::tests::ScriptedSource;
    use crate::gemini::Credentials;
    use crate::models::{DetailLevel, GenderNuance, ResultVariant, ScriptStyle, Tier};
    use crate::schema::ORIGINAL_NAME;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn options(tier: Tier, detail: DetailLevel) -> GenerationOptions {
        GenerationOptions::new("Sophia Loren", GenderNuance::Feminine, ScriptStyle::SinoKorean, tier, detail).unwrap()
    }

    fn stylist(source: Arc<ScriptedSource>, credentials: Credentials) -> NameStylist<Arc<ScriptedSource>> {
        NameStylist::new(GeminiClient::new(source, credentials, "gemini-test"))
    }

    fn free_only() -> Credentials {
        Credentials { free: Some("free-key".into()), premium: None }
    }

    #[tokio::test]
    async fn free_name_survives_surrounding_prose() {
        let source = Arc::new(ScriptedSource::with_chunks(&[
            "Here you go:\n{\"korean_name_suggestion\":{\"full_name\":\"김서화\",",
            "\"romanization\":\"Kim Seo-hwa\"},\"social_share_content\":",
            "{\"headline\":\"Meet 김서화\",\"hashtags\":[\"#KoreanName\"]}}\nEnjoy!",
        ]));
        let result = stylist(source.clone(), free_only())
            .generate_styled_name(&options(Tier::Free, DetailLevel::Simple))
            .await
            .unwrap();

        assert_eq!(result.variant, ResultVariant::FreeSimple);
        assert_eq!(result.full_name(), Some("김서화"));
        assert_eq!(result.get(ORIGINAL_NAME), Some(&json!("Sophia Loren")));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declares_the_variant_schema() {
        let source = Arc::new(ScriptedSource::with_chunks(&["{}"]));
        let _ = stylist(source.clone(), free_only())
            .generate_styled_name(&options(Tier::Free, DetailLevel::Detailed))
            .await;
        let request = source.last_request.lock().clone().unwrap();
        assert_eq!(
            request.body["generationConfig"]["responseSchema"],
            output_schema(ResultVariant::FreeDetailed)
        );
    }

    #[tokio::test]
    async fn premium_without_credential_never_calls_upstream() {
        let source = Arc::new(ScriptedSource::with_chunks(&["{}"]));
        let err = stylist(source.clone(), free_only())
            .generate_styled_name(&options(Tier::Premium, DetailLevel::Simple))
            .await
            .unwrap_err();
        assert_eq!(err, NamingError::Generation(GenerationError::MissingCredential(Tier::Premium)));
        assert!(err.is_configuration());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn incomplete_detailed_result_is_rejected() {
        let source = Arc::new(ScriptedSource::with_chunks(&[
            "{\"korean_name_suggestion\":{\"full_name\":\"김서화\"},\"social_share_content\":{}}",
        ]));
        let err = stylist(source, free_only())
            .generate_styled_name(&options(Tier::Free, DetailLevel::Detailed))
            .await
            .unwrap_err();
        assert_eq!(err, NamingError::Schema(SchemaError::MissingField { field: "original_name_analysis".into() }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn refusal_is_an_extraction_error() {
        let source = Arc::new(ScriptedSource::with_chunks(&["I cannot help with that."]));
        let err = stylist(source, free_only())
            .generate_styled_name(&options(Tier::Free, DetailLevel::Simple))
            .await
            .unwrap_err();
        assert_eq!(err, NamingError::Extraction(ExtractionError::NoObject));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_interfere() {
        let source = Arc::new(ScriptedSource::with_chunks(&[
            "{\"korean_name_suggestion\":{\"full_name\":\"김서화\"},\"social_share_content\":{}}",
        ]));
        let stylist = Arc::new(stylist(source.clone(), free_only()));
        let handles: Vec<_> = ["Sophia Loren", "Leo Tolstoy", "Ada"]
            .into_iter()
            .map(|name| {
                let stylist = stylist.clone();
                tokio::spawn(async move {
                    let options = GenerationOptions::new(name, GenderNuance::Neutral, ScriptStyle::PureKorean, Tier::Free, DetailLevel::Simple).unwrap();
                    stylist.generate_styled_name(&options).await.unwrap()
                })
            })
            .collect();
        let mut names = Vec::new();
        for handle in handles {
            let result = handle.await.unwrap();
            names.push(result.get(ORIGINAL_NAME).cloned().unwrap());
        }
        assert_eq!(names, vec![json!("Sophia Loren"), json!("Leo Tolstoy"), json!("Ada")]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}
