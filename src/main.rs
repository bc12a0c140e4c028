use lyricsync::console::{ConsoleDisplay, WallClock};
use lyricsync::cue::Cue;
use lyricsync::error::LyricsError;
use lyricsync::parser::{InvalidPolicy, Parser};
use lyricsync::player::{Notices, Player};
use lyricsync::scheduler::SessionEnd;
use lyricsync::serialiser;
use lyricsync::source::{self, LevelLibrary};

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Show SRT lyrics in time with a playing track")]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The file to read from. If not supplied, the subtitles will be read from standard input.",
        default_value = "-"
    )]
    input: String,
    #[arg(
        short,
        long,
        value_name = "ID",
        requires = "levels",
        help = "Look up the lyrics of this song in the level library instead of reading --input."
    )]
    song_id: Option<String>,
    #[arg(
        short,
        long,
        value_name = "DIR",
        help = "Directory holding one subdirectory per song, named by song id."
    )]
    levels: Option<PathBuf>,
    #[arg(
        long,
        value_name = "NAME",
        help = "Name of the lyrics file inside a song directory.",
        default_value = source::DEFAULT_FILE_NAME
    )]
    file_name: String,
    #[arg(
        long,
        value_name = "SECS",
        help = "Start as if the track had already been playing for this long.",
        default_value_t = 0.0
    )]
    start_at: f64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Length of the track. Defaults to the end of the last caption."
    )]
    track_length: Option<f64>,
    #[arg(
        long,
        help = "On a malformed caption block, drop what was parsed so far but keep reading."
    )]
    keep_going: bool,
    #[arg(long, help = "Parse the lyrics, print them back as SRT and exit.")]
    check: bool,
    #[arg(long, help = "Don't announce whether lyrics were found.")]
    no_notice: bool,
    #[arg(short, long, help = "Log debug output to stderr.")]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load(cli: &Cli, policy: InvalidPolicy) -> Result<Vec<Cue>> {
    if let Some(song_id) = &cli.song_id {
        let levels = cli
            .levels
            .as_ref()
            .ok_or_else(|| anyhow!("--song-id requires --levels"))?;
        let library = LevelLibrary::scan(levels)
            .context(format!("Failed to scan level library: '{}'", levels.display()))?
            .with_file_name(cli.file_name.as_str());
        if library.is_empty() {
            warn!("No song directories found in '{}'", levels.display());
        }
        return match source::load_cues(&library, song_id, policy) {
            Ok(cues) => Ok(cues),
            Err(LyricsError::SourceNotFound { .. }) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        };
    }

    let data = if cli.input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&cli.input)
            .context(format!("Failed to open input file: '{}'", cli.input))?
    };

    let mut cues = Vec::new();
    // Malformed blocks are logged by the parser itself.
    Parser::with_policy(policy).parse_str(&data, &mut cues);
    Ok(cues)
}

fn track_length(cues: &[Cue]) -> f64 {
    cues.iter()
        .map(|cue| cue.end().unwrap_or_else(|| cue.start()))
        .fold(0.0, f64::max)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let policy = if cli.keep_going {
        InvalidPolicy::ClearAndContinue
    } else {
        InvalidPolicy::Abort
    };
    let cues = load(&cli, policy)?;

    if cli.check {
        if cues.is_empty() {
            return Err(anyhow!("You appear to have supplied an empty file."));
        }
        serialiser::serialise(&cues, io::stdout())?;
        return Ok(());
    }

    let total = cli.track_length.unwrap_or_else(|| track_length(&cues));
    let clock = WallClock::new(cli.start_at, total);
    let notices = if cli.no_notice {
        Notices::none()
    } else {
        Notices::default()
    };
    let mut player = Player::new(clock, ConsoleDisplay::new(clock)).with_notices(notices);

    if !player.play_cues(cues) {
        return Ok(());
    }
    let session = match player.take_session() {
        Some(session) => session,
        None => return Ok(()),
    };

    tokio::select! {
        end = session.join() => {
            match end.context("Lyrics session failed")? {
                SessionEnd::Completed { shown } => info!(shown, "All lyrics shown"),
                SessionEnd::Cancelled { shown } => info!(shown, "Lyrics session cancelled"),
            }
        }
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted, stopping lyrics");
        }
    }

    Ok(())
}
