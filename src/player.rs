use crate::cue::Cue;
use crate::error::LyricsError;
use crate::parser::InvalidPolicy;
use crate::scheduler::{self, Clock, LyricDisplay, SessionHandle};
use crate::source::{load_cues, CaptionSource};

use tracing::debug;

/// Short messages shown when a song is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Notices {
    pub found: Option<String>,
    pub missing: Option<String>,
    pub duration: f64,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            found: Some("Found lyrics!".to_string()),
            missing: Some("Could not find lyrics!".to_string()),
            duration: 3.0,
        }
    }
}

impl Notices {
    pub fn none() -> Self {
        Self {
            found: None,
            missing: None,
            ..Self::default()
        }
    }
}

/// Loads lyrics by song id and drives at most one session at a time.
pub struct Player<C, D> {
    clock: C,
    display: D,
    policy: InvalidPolicy,
    notices: Notices,
    session: Option<SessionHandle>,
}

impl<C, D> Player<C, D>
where
    C: Clock + Clone + 'static,
    D: LyricDisplay + Clone + 'static,
{
    pub fn new(clock: C, display: D) -> Self {
        Self {
            clock,
            display,
            policy: InvalidPolicy::default(),
            notices: Notices::default(),
            session: None,
        }
    }

    /// How malformed caption files loaded through `play` are treated.
    pub fn with_policy(mut self, policy: InvalidPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_notices(mut self, notices: Notices) -> Self {
        self.notices = notices;
        self
    }

    /// Stops whatever is playing, then loads and starts `song_id`.
    /// Returns whether a session was started.
    pub fn play<S>(&mut self, source: &S, song_id: &str) -> Result<bool, LyricsError>
    where
        S: CaptionSource + ?Sized,
    {
        self.stop();

        let cues = match load_cues(source, song_id, self.policy) {
            Ok(cues) => cues,
            Err(LyricsError::SourceNotFound { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };
        if cues.is_empty() {
            debug!("No lyrics found for {}", song_id);
        }
        Ok(self.play_cues(cues))
    }

    /// Stops whatever is playing, then starts a session over `cues`.
    /// Returns whether a session was started.
    pub fn play_cues(&mut self, cues: Vec<Cue>) -> bool {
        self.stop();

        if cues.is_empty() {
            self.notice(self.notices.missing.clone());
            return false;
        }
        self.notice(self.notices.found.clone());

        debug!(cues = cues.len(), "Starting lyrics session");
        self.session = Some(scheduler::start(
            cues,
            self.clock.clone(),
            self.display.clone(),
        ));
        true
    }

    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cancel();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.session.as_ref().map_or(false, |s| !s.is_finished())
    }

    /// Hands the running session to the caller, e.g. to wait for it.
    pub fn take_session(&mut self) -> Option<SessionHandle> {
        self.session.take()
    }

    fn notice(&mut self, text: Option<String>) {
        if let Some(text) = text {
            self.display.on_emit(&text, self.notices.duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::scheduler::SessionEnd;
    use crate::source::{LevelLibrary, DEFAULT_FILE_NAME};
    use crate::testing::{Recorder, TestClock};

    use std::fs;
    use std::time::Duration;

    const SONG_A: &str = "1\n00:00:01,000 --> 00:00:02,000\nA1\n\n2\n00:00:03,000 --> 00:00:04,000\nA2\n\n";
    const SONG_B: &str = "1\n00:00:10,000 --> 00:00:12,000\nB1\n\n";

    fn library() -> (tempfile::TempDir, LevelLibrary) {
        let root = tempfile::tempdir().unwrap();
        for (id, contents) in &[("a", Some(SONG_A)), ("b", Some(SONG_B)), ("silent", None)] {
            let dir = root.path().join(id);
            fs::create_dir(&dir).unwrap();
            if let Some(contents) = contents {
                fs::write(dir.join(DEFAULT_FILE_NAME), contents).unwrap();
            }
        }
        let library = LevelLibrary::scan(root.path()).unwrap();
        (root, library)
    }

    #[tokio::test(start_paused = true)]
    async fn shows_found_notice_then_lyrics() {
        let (_root, library) = library();
        let clock = TestClock::starting_at(0.0, 60.0);
        let display = Recorder::new(clock);
        let mut player = Player::new(clock, display.clone());

        assert!(player.play(&library, "a").unwrap());
        let end = player.take_session().unwrap().join().await.unwrap();

        assert_eq!(end, SessionEnd::Completed { shown: 2 });
        assert_eq!(display.texts(), vec!["Found lyrics!", "A1\n", "A2\n"]);
        assert_eq!(display.events()[0].2, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_lyrics_show_notice_only() {
        let (_root, library) = library();
        let clock = TestClock::starting_at(0.0, 60.0);
        let display = Recorder::new(clock);
        let mut player = Player::new(clock, display.clone());

        assert!(!player.play(&library, "silent").unwrap());
        assert!(!player.play(&library, "unknown").unwrap());

        assert!(!player.is_playing());
        assert_eq!(
            display.texts(),
            vec!["Could not find lyrics!", "Could not find lyrics!"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn playing_again_replaces_running_session() {
        let (_root, library) = library();
        let clock = TestClock::starting_at(0.0, 60.0);
        let display = Recorder::new(clock);
        let mut player =
            Player::new(clock, display.clone()).with_notices(Notices::none());

        assert!(player.play(&library, "a").unwrap());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(player.is_playing());

        assert!(player.play(&library, "b").unwrap());
        player.take_session().unwrap().join().await.unwrap();

        assert_eq!(display.texts(), vec!["A1\n", "B1\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_session() {
        let (_root, library) = library();
        let clock = TestClock::starting_at(0.0, 60.0);
        let display = Recorder::new(clock);
        let mut player =
            Player::new(clock, display.clone()).with_notices(Notices::none());

        player.play(&library, "b").unwrap();
        player.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(!player.is_playing());
        assert!(display.texts().is_empty());
    }
}
