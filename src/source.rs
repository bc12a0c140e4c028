use crate::cue::Cue;
use crate::error::LyricsError;
use crate::parser::{InvalidPolicy, Parser};

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub const DEFAULT_FILE_NAME: &str = "lyrics.srt";

/// An opened caption file.
pub struct CaptionFile {
    pub path: PathBuf,
    pub reader: BufReader<File>,
}

/// Maps a song id to its caption content. An unknown song is `Ok(None)`.
pub trait CaptionSource {
    fn resolve(&self, song_id: &str) -> io::Result<Option<CaptionFile>>;
}

/// Song ids mapped to level directories, each of which may hold a caption file.
#[derive(Debug)]
pub struct LevelLibrary {
    levels: HashMap<String, PathBuf>,
    file_name: String,
}

impl LevelLibrary {
    pub fn new<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        Self {
            levels: levels.into_iter().collect(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }

    /// Every subdirectory of `root` is a level, named by its song id.
    pub fn scan<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let mut levels = Vec::new();
        for entry in std::fs::read_dir(root.as_ref())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                levels.push((name.to_string(), entry.path()));
            }
        }
        debug!(count = levels.len(), root = %root.as_ref().display(), "Scanned level library");
        Ok(Self::new(levels))
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl CaptionSource for LevelLibrary {
    fn resolve(&self, song_id: &str) -> io::Result<Option<CaptionFile>> {
        let dir = match self.levels.get(song_id) {
            Some(dir) => dir,
            None => return Ok(None),
        };
        let path = dir.join(&self.file_name);
        if !path.is_file() {
            info!("Couldn't find {} for {}", self.file_name, song_id);
            return Ok(None);
        }
        info!("Found {} for {}", self.file_name, song_id);
        let file = File::open(&path)?;
        Ok(Some(CaptionFile {
            path,
            reader: BufReader::new(file),
        }))
    }
}

/// Resolves and parses the captions for `song_id`. A malformed file yields
/// an empty sequence, not an error.
pub fn load_cues<S>(
    source: &S,
    song_id: &str,
    policy: InvalidPolicy,
) -> Result<Vec<Cue>, LyricsError>
where
    S: CaptionSource + ?Sized,
{
    let not_found = || LyricsError::SourceNotFound {
        song_id: song_id.to_string(),
    };
    let file = source
        .resolve(song_id)
        .map_err(|source| LyricsError::Resolve {
            song_id: song_id.to_string(),
            source,
        })?
        .ok_or_else(not_found)?;

    let mut cues = Vec::new();
    let path = file.path;
    let report = Parser::with_policy(policy)
        .parse_reader(file.reader, &mut cues)
        .map_err(|source| LyricsError::Io {
            path: path.clone(),
            source,
        })?;
    debug!(
        cues = report.cues,
        errors = report.errors.len(),
        path = %path.display(),
        "Parsed caption file"
    );
    Ok(cues)
}
