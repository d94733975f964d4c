//! Judge protocol: prompt construction and verdict parsing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RetrievalError};
use crate::types::Query;

/// Highest rubric score a judge may assign
pub const MAX_RUBRIC_SCORE: u8 = 5;

/// Placeholder shown to the judge when a channel has no leading candidate
const NO_RESULT: &str = "No result";

/// What the judge is asked to rate
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub query: &'a Query,
    pub dense_snippet: Option<&'a str>,
    pub sparse_snippet: Option<&'a str>,
}

/// Raw rubric scores (0..=5) for the two leading candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub dense: u8,
    pub sparse: u8,
}

impl JudgeVerdict {
    /// Build a verdict, clamping each score into the rubric range
    pub fn clamped(dense: i64, sparse: i64) -> Self {
        let clamp = |v: i64| v.clamp(0, i64::from(MAX_RUBRIC_SCORE)) as u8;
        Self {
            dense: clamp(dense),
            sparse: clamp(sparse),
        }
    }

    /// Scores scaled into [0, 1]. Fields are public, so a verdict built
    /// without `clamped` is capped at the rubric maximum here.
    pub fn normalized(&self) -> (f64, f64) {
        let max = f64::from(MAX_RUBRIC_SCORE);
        let scale = |v: u8| f64::from(v.min(MAX_RUBRIC_SCORE)) / max;
        (scale(self.dense), scale(self.sparse))
    }
}

/// External relevance judge
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    /// Model or service identifier, for logs
    fn identifier(&self) -> &str;

    /// Rate both leading candidates. Failures are reported as
    /// `ScorerUnavailable`, `ScorerTimeout` or `JudgeMalformed`.
    async fn evaluate(&self, request: &JudgeRequest<'_>) -> Result<JudgeVerdict>;
}

/// Prompt asking the judge for two integers on a 0-5 rubric
pub fn build_evaluation_prompt(request: &JudgeRequest<'_>) -> String {
    let dense = request.dense_snippet.unwrap_or(NO_RESULT);
    let sparse = request.sparse_snippet.unwrap_or(NO_RESULT);

    format!(
        r#"You are judging two search methods, dense vector retrieval and BM25 keyword retrieval, by the top result each returned for the same question.

Score each method from 0 to 5 by how likely its top result, or the results right behind it, contain the correct answer:
- 5: the result answers the question directly.
- 4: very close; it names the right entities or gives a partial answer.
- 3: somewhat close; the method is heading in the right direction.
- 2: loosely related and partly misleading; a correct answer nearby is unlikely but possible.
- 1: shares keywords but is about something else.
- 0: unrelated.

Question: "{question}"
Dense retrieval top result: "{dense}"
BM25 retrieval top result: "{sparse}"

Answer with exactly two integers separated by a space: the dense score first, then the BM25 score. Example: 3 4
Output nothing else."#,
        question = request.query.text(),
        dense = dense,
        sparse = sparse,
    )
}

/// Parse "D S" from a judge response. Anything that does not start with two
/// integers is malformed.
pub fn parse_verdict(response: &str) -> Result<JudgeVerdict> {
    let mut numbers = response
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_digit() && c != '-'))
        .map(str::parse::<i64>);

    match (numbers.next(), numbers.next()) {
        (Some(Ok(dense)), Some(Ok(sparse))) => Ok(JudgeVerdict::clamped(dense, sparse)),
        _ => Err(RetrievalError::JudgeMalformed(format!(
            "expected two integers, got {:?}",
            response.trim()
        ))),
    }
}
