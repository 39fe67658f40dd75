use thiserror::Error;

/// Errors surfaced while decoding or encoding a wire message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("line exceeded the 1024-byte frame cap without a terminator")]
    FrameTooLong,
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("unknown seat letter {0:?}")]
    BadSeat(char),
    #[error("unknown suit letter {0:?}")]
    BadSuit(char),
    #[error("invalid rank token {0:?}")]
    BadRank(String),
}

/// Errors surfaced while loading the deal script file.
#[derive(Debug, Error)]
pub enum DealFileError {
    #[error("could not read game file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("game file line count ({0}) is not a positive multiple of 5")]
    BadLineCount(usize),
    #[error("record {record}: bad header line {line:?}")]
    BadHeader { record: usize, line: String },
    #[error("record {record}, seat {seat}: expected 13 cards, got malformed hand {line:?}")]
    BadHand { record: usize, seat: char, line: String },
    #[error(
        "record {record}: deck is not a permutation of the standard 52-card deck"
    )]
    BadDeck { record: usize },
}

/// A peer-level protocol error: never fatal to the server, always results in
/// the offending connection being closed and, if seated, its seat vacated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("frame error: {0}")]
    Frame(#[from] WireError),
    #[error("peer closed the connection")]
    Eof,
    #[error("message not permitted in current state")]
    Unexpected,
}
