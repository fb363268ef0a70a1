use nlq_history::HistoryError;
use nlq_schema::CatalogError;
use nlq_store::StoreError;
use nlq_synth::SynthError;
use nlq_types::ParseFailure;
use thiserror::Error;

/// Every way a request can end without an answer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("catalog refresh unavailable: no catalog source configured")]
    RefreshUnavailable,
}

impl QueryError {
    /// Stable machine-readable label, used in error envelopes and history.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Parse(ParseFailure::Unsupported(_)) => "unsupported_intent",
            QueryError::Parse(ParseFailure::Unavailable(_)) => "parser_unavailable",
            QueryError::Parse(_) => "parse_failure",
            QueryError::Synth(err) => match err {
                SynthError::UnknownTable(_) => "unknown_table",
                SynthError::UnknownColumn { .. } => "unknown_column",
                SynthError::AmbiguousReference { .. } => "ambiguous_reference",
                SynthError::AmbiguousJoin { .. } => "ambiguous_join",
                SynthError::NoJoinPath { .. } => "no_join_path",
                SynthError::UnsupportedIntent(_) => "unsupported_intent",
            },
            QueryError::Store(_) => "execution",
            QueryError::Catalog(_) => "catalog",
            QueryError::History(_) => "history",
            QueryError::RefreshUnavailable => "refresh_unavailable",
        }
    }

    /// The parser could not make sense of the question. Callers answer these
    /// with [`EXAMPLE_QUESTIONS`](crate::EXAMPLE_QUESTIONS).
    pub fn is_unparsed(&self) -> bool {
        matches!(self, QueryError::Parse(p) if !matches!(p, ParseFailure::Unavailable(_)))
    }

    /// The question itself could not be turned into a valid statement.
    pub fn is_rejection(&self) -> bool {
        matches!(self, QueryError::Synth(_)) || self.is_unparsed()
    }
}
