// Contracts for the question generator, research agents and judge.
//
// These sit outside the tree core; implementations typically wrap LLM calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external collaborator. The message is kept as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(msg: impl Into<String>) -> Self {
        CollaboratorError(msg.into())
    }
}

/// Everything the question generator gets to see for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub reasoning_chain_fmt: Vec<String>,
    pub aggregation_pool_fmt: Vec<String>,
    pub depth_level: usize,
    pub width_count: usize,
    pub past_questions: Vec<String>,
    pub root_topic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTask {
    pub question: String,
    #[serde(default)]
    pub word_limit_instruction: String,
    #[serde(default)]
    pub checklist_width: Vec<String>,
    #[serde(default)]
    pub checklist_depth: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOutcome {
    pub final_answer: String,
    /// Messages to append to this agent's conversation history.
    pub messages: Vec<ChatMessage>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    AMuchBetter,
    ABetter,
    #[serde(rename = "Tie")]
    Tie,
    BBetter,
    BMuchBetter,
    /// The judge's response could not be parsed.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Verdict {
    /// Parses `A_MUCH_BETTER`, `[[B_BETTER]]`, `Tie` and so on.
    /// Anything unrecognised is [`Verdict::Error`].
    pub fn from_token(token: &str) -> Self {
        let token = token.trim().trim_start_matches("[[").trim_end_matches("]]");
        match token.to_uppercase().as_str() {
            "A_MUCH_BETTER" => Verdict::AMuchBetter,
            "A_BETTER" => Verdict::ABetter,
            "TIE" => Verdict::Tie,
            "B_BETTER" => Verdict::BBetter,
            "B_MUCH_BETTER" => Verdict::BMuchBetter,
            _ => Verdict::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::AMuchBetter => "A_MUCH_BETTER",
            Verdict::ABetter => "A_BETTER",
            Verdict::Tie => "Tie",
            Verdict::BBetter => "B_BETTER",
            Verdict::BMuchBetter => "B_MUCH_BETTER",
            Verdict::Error => "ERROR",
        }
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            Verdict::AMuchBetter | Verdict::ABetter => Some(Side::A),
            Verdict::BBetter | Verdict::BMuchBetter => Some(Side::B),
            Verdict::Tie | Verdict::Error => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the losing answer lacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoserFailure {
    Deep,
    Wide,
    Both,
    None,
}

impl LoserFailure {
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_uppercase().as_str() {
            "DEEP" => LoserFailure::Deep,
            "WIDE" => LoserFailure::Wide,
            "BOTH" => LoserFailure::Both,
            _ => LoserFailure::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TieQuality {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    pub verdict: Verdict,
    pub loser_failure: LoserFailure,
    pub tie_quality: Option<TieQuality>,
}

impl Judgement {
    pub fn error() -> Self {
        Self {
            verdict: Verdict::Error,
            loser_failure: LoserFailure::None,
            tie_quality: None,
        }
    }
}

pub trait QuestionGenerator {
    fn generate(&mut self, request: &QuestionRequest) -> Result<GeneratedTask, CollaboratorError>;
}

pub trait ResearchAgent {
    fn research(
        &mut self,
        question: &str,
        word_limit_instruction: &str,
        history: &[ChatMessage],
    ) -> Result<ResearchOutcome, CollaboratorError>;
}

/// Never fails outright; unparseable output is a [`Verdict::Error`].
pub trait Judge {
    fn judge(&mut self, task: &GeneratedTask, answer_a: &str, answer_b: &str) -> Judgement;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_tokens() {
        assert_eq!(Verdict::from_token("[[A_MUCH_BETTER]]"), Verdict::AMuchBetter);
        assert_eq!(Verdict::from_token("b_better"), Verdict::BBetter);
        assert_eq!(Verdict::from_token("Tie"), Verdict::Tie);
        assert_eq!(Verdict::from_token("garbled"), Verdict::Error);
        assert_eq!(Verdict::ABetter.winner(), Some(Side::A));
        assert_eq!(Verdict::Tie.winner(), None);
    }

    #[test]
    fn test_judgement_serializes_judge_tokens() {
        let judgement = Judgement {
            verdict: Verdict::AMuchBetter,
            loser_failure: LoserFailure::Deep,
            tie_quality: Some(TieQuality::High),
        };
        let value = serde_json::to_value(&judgement).unwrap();
        assert_eq!(value["verdict"], "A_MUCH_BETTER");
        assert_eq!(value["loser_failure"], "DEEP");
        assert_eq!(value["tie_quality"], "HIGH");

        assert_eq!(serde_json::to_value(Verdict::Tie).unwrap(), "Tie");
        assert_eq!(serde_json::to_value(LoserFailure::None).unwrap(), "NONE");
        let back: Verdict = serde_json::from_str("\"B_BETTER\"").unwrap();
        assert_eq!(back, Verdict::BBetter);
        assert_eq!(Verdict::BMuchBetter.to_string(), "B_MUCH_BETTER");
    }

    #[test]
    fn test_loser_failure_defaults_to_none() {
        assert_eq!(LoserFailure::from_token("deep"), LoserFailure::Deep);
        assert_eq!(LoserFailure::from_token("N/A"), LoserFailure::None);
    }
}
