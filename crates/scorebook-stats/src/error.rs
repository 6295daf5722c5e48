use scorebook_types::MatchId;

/// Errors produced by statistics computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    /// The scorecard cannot be turned into deltas. Non-fatal per match.
    #[error("malformed scorecard for match {match_id}: {reason}")]
    MalformedScorecard { match_id: MatchId, reason: String },

    /// A retraction would drive a counter below zero, meaning the row never
    /// received the contribution being removed.
    #[error("retracting from {key} would underflow {field}")]
    Underflow { key: String, field: &'static str },

    #[error("applying to {key} would overflow {field}")]
    Overflow { key: String, field: &'static str },
}

impl StatsError {
    pub(crate) fn malformed(match_id: &MatchId, reason: impl Into<String>) -> Self {
        Self::MalformedScorecard {
            match_id: match_id.clone(),
            reason: reason.into(),
        }
    }
}
