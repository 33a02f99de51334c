//! Human feedback on generated answers.
//!
//! Annotations are always kept in the session first; delivery to the trace
//! sink is advisory and handled by [`AnnotationClient`].

mod client;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use client::{AnnotationClient, DeliveryOutcome, FeedbackError};

pub const TEXT_FEEDBACK_LABEL: &str = "text_feedback";
pub const ANNOTATION_NAME: &str = "user_feedback";
pub const ANNOTATOR_KIND: &str = "HUMAN";

/// Score for text feedback submitted before any rating.
pub const NEUTRAL_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::Positive => "thumbs_up",
            Rating::Negative => "thumbs_down",
        }
    }

    pub fn score(self) -> f64 {
        match self {
            Rating::Positive => 1.0,
            Rating::Negative => 0.0,
        }
    }
}

/// Score of a text annotation given the turn's current rating.
pub fn text_score(prior: Option<Rating>) -> f64 {
    prior.map_or(NEUTRAL_SCORE, Rating::score)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnnotation {
    pub span_id: Option<String>,
    pub label: String,
    pub score: f64,
    pub explanation: String,
    /// Unix seconds.
    pub timestamp: f64,
}

impl FeedbackAnnotation {
    pub fn from_rating(rating: Rating, span_id: Option<String>) -> Self {
        Self::new(span_id, rating.label(), rating.score(), String::new())
    }

    pub fn from_text(prior: Option<Rating>, span_id: Option<String>, text: impl Into<String>) -> Self {
        Self::new(span_id, TEXT_FEEDBACK_LABEL, text_score(prior), text.into())
    }

    fn new(span_id: Option<String>, label: &str, score: f64, explanation: String) -> Self {
        Self {
            span_id,
            label: label.to_string(),
            score,
            explanation,
            timestamp: unix_seconds(),
        }
    }

    /// Body for `POST /v1/span_annotations`, or `None` without a span id.
    pub fn payload(&self) -> Option<Value> {
        let span_id = self.span_id.as_ref()?;
        Some(json!({
            "data": [{
                "span_id": span_id,
                "name": ANNOTATION_NAME,
                "annotator_kind": ANNOTATOR_KIND,
                "result": {
                    "label": self.label,
                    "score": self.score,
                    "explanation": self.explanation,
                },
                "metadata": {},
            }]
        }))
    }
}

fn unix_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
