//! Session-scoped chat state.
//!
//! Turns are append-only until `clear`; the feedback history is never
//! cleared because it is the durable record of what the user reported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feedback::{FeedbackAnnotation, Rating};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnFeedback {
    pub rating: Option<Rating>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    /// Present on assistant turns only.
    pub feedback: Option<TurnFeedback>,
    pub span_id: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No message at position {0}")]
    InvalidTurn(usize),

    #[error("Message at position {0} is not an assistant response")]
    NotAssistant(usize),

    #[error("Please enter some feedback text before submitting.")]
    EmptyFeedback,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    feedback_store: Vec<FeedbackAnnotation>,
    pending_text: HashMap<usize, String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn feedback_store(&self) -> &[FeedbackAnnotation] {
        &self.feedback_store
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> usize {
        self.turns.push(ChatTurn {
            role: Role::User,
            content: content.into(),
            feedback: None,
            span_id: None,
        });
        self.turns.len() - 1
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, span_id: Option<String>) -> usize {
        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content: content.into(),
            feedback: Some(TurnFeedback::default()),
            span_id,
        });
        self.turns.len() - 1
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.pending_text.clear();
    }

    /// Turn index of the `number`-th assistant message (1-based).
    pub fn assistant_turn(&self, number: usize) -> Option<usize> {
        if number == 0 {
            return None;
        }
        self.turns
            .iter()
            .enumerate()
            .filter(|(_, turn)| turn.role == Role::Assistant)
            .nth(number - 1)
            .map(|(idx, _)| idx)
    }

    /// Stores text typed for a turn before it is rated or submitted.
    pub fn draft_text(&mut self, idx: usize, text: impl Into<String>) -> Result<(), SessionError> {
        self.assistant_feedback(idx)?;
        self.pending_text.insert(idx, text.into());
        Ok(())
    }

    /// Overwrites the turn's rating and records one more annotation.
    pub fn rate(&mut self, idx: usize, rating: Rating) -> Result<FeedbackAnnotation, SessionError> {
        let draft = self.pending_text.get(&idx).cloned().unwrap_or_default();
        let span_id = self.turn(idx)?.span_id.clone();
        let feedback = self.assistant_feedback(idx)?;
        *feedback = TurnFeedback {
            rating: Some(rating),
            text: draft,
        };

        Ok(self.record(FeedbackAnnotation::from_rating(rating, span_id)))
    }

    /// Sets the turn's feedback text; the score follows its current rating.
    pub fn submit_text(&mut self, idx: usize, text: &str) -> Result<FeedbackAnnotation, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyFeedback);
        }
        let span_id = self.turn(idx)?.span_id.clone();
        let feedback = self.assistant_feedback(idx)?;
        feedback.text = text.to_string();
        let prior = feedback.rating;
        self.pending_text.insert(idx, text.to_string());

        Ok(self.record(FeedbackAnnotation::from_text(prior, span_id, text)))
    }

    fn record(&mut self, annotation: FeedbackAnnotation) -> FeedbackAnnotation {
        self.feedback_store.push(annotation.clone());
        annotation
    }

    fn turn(&self, idx: usize) -> Result<&ChatTurn, SessionError> {
        self.turns.get(idx).ok_or(SessionError::InvalidTurn(idx))
    }

    fn assistant_feedback(&mut self, idx: usize) -> Result<&mut TurnFeedback, SessionError> {
        let turn = self
            .turns
            .get_mut(idx)
            .ok_or(SessionError::InvalidTurn(idx))?;
        if turn.role != Role::Assistant {
            return Err(SessionError::NotAssistant(idx));
        }
        Ok(turn.feedback.get_or_insert_with(TurnFeedback::default))
    }
}
