//! Structured Analysis: turns extracted CV text into a `StructuredProfile`
//! through the text-generation service.
//!
//! The model's reply must be a JSON object (optionally fenced). Anything else
//! is an `InvalidResponse`. A parsed object is always normalized, so missing
//! fields come back as their defaults rather than absent.

pub mod prompts;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::prompts::{CV_ANALYSIS_PROMPT, LOW_CONFIDENCE_NOTE};
use crate::ingestion::extract::{Confidence, ExtractedText};
use crate::ingestion::format::DocumentFormat;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_INSTRUCTION};
use crate::llm_client::{strip_json_fences, LlmError, TextGenerator};
use crate::models::profile::StructuredProfile;

/// How much of an unparseable reply to echo back in the error message.
const RESPONSE_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis service call failed: {0}")]
    Inference(#[from] LlmError),

    #[error("Invalid response from analysis service: {0}")]
    InvalidResponse(String),
}

#[derive(Clone)]
pub struct StructuredAnalysisClient {
    generator: Arc<dyn TextGenerator>,
}

impl StructuredAnalysisClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn analyze(
        &self,
        extracted: &ExtractedText,
        format: DocumentFormat,
    ) -> Result<StructuredProfile, AnalysisError> {
        let prompt = build_prompt(extracted, format);
        debug!(
            "Requesting CV analysis: {} words, prompt {} chars",
            extracted.word_count(),
            prompt.len()
        );

        let reply = self.generator.generate(&prompt).await?;
        parse_profile(&reply)
    }
}

pub fn build_prompt(extracted: &ExtractedText, format: DocumentFormat) -> String {
    let quality_note = match extracted.confidence {
        Confidence::Low => LOW_CONFIDENCE_NOTE,
        Confidence::Normal => "",
    };

    CV_ANALYSIS_PROMPT
        .replace("{document_type}", format.label())
        .replace("{word_count}", &extracted.word_count().to_string())
        .replace("{quality_note}", quality_note)
        .replace("{grounding}", GROUNDING_INSTRUCTION)
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        // Last, so placeholders inside the CV text itself are left alone.
        .replace("{cv_text}", &extracted.text)
}

/// Parses a model reply into a profile, filling every missing field.
pub fn parse_profile(reply: &str) -> Result<StructuredProfile, AnalysisError> {
    let body = strip_json_fences(reply);

    let value: Value = serde_json::from_str(body).map_err(|e| {
        warn!("Analysis reply is not valid JSON: {e}");
        AnalysisError::InvalidResponse(format!(
            "expected a JSON object, got: {}",
            snippet(body)
        ))
    })?;

    if !value.is_object() {
        return Err(AnalysisError::InvalidResponse(format!(
            "expected a JSON object, got: {}",
            snippet(body)
        )));
    }

    Ok(StructuredProfile::from_value(&value))
}

fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(RESPONSE_SNIPPET_CHARS).collect();
    if text.chars().count() > RESPONSE_SNIPPET_CHARS {
        out.push_str("...");
    }
    out
}
