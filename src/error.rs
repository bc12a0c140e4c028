use std::io;
use std::path::PathBuf;

/// A structural violation of the SRT grammar, reported by line number (1-based).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: expected a caption index, found '{content}'")]
    MalformedIndexLine { line: usize, content: String },

    #[error("line {line}: expected 'HH:MM:SS,mmm --> HH:MM:SS,mmm', found '{content}'")]
    MalformedTimeRangeLine { line: usize, content: String },
}

/// Errors from turning a song id into a cue sequence.
#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    #[error("no captions found for song '{song_id}'")]
    SourceNotFound { song_id: String },

    #[error("failed to look up captions for song '{song_id}'")]
    Resolve {
        song_id: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read captions from '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
