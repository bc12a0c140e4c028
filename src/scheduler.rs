use crate::cue::Cue;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

/// The external playback position. `now` must be cheap and side-effect free.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
    fn total_duration(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn total_duration(&self) -> f64 {
        (**self).total_duration()
    }
}

/// Receives each cue once it is due. `duration` is advisory and may be
/// negative if the clock jumped past the cue's end.
pub trait LyricDisplay: Send {
    fn on_emit(&mut self, text: &str, duration: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed { shown: usize },
    Cancelled { shown: usize },
}

/// Index of the first cue that has not started at `now`.
pub fn catch_up_index(cues: &[Cue], now: f64) -> usize {
    cues.iter().take_while(|cue| cue.start <= now).count()
}

/// How long `cues[index]` stays up when shown at `now`: until its own end,
/// else until the next cue starts, else until the track is over.
pub fn display_duration(cues: &[Cue], index: usize, now: f64, total: f64) -> f64 {
    let cue = &cues[index];
    match (cue.end, cues.get(index + 1)) {
        (Some(end), _) => end - now,
        (None, Some(next)) => next.start - now,
        (None, None) => total - now,
    }
}

fn wait_for(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

pub struct Scheduler<C, D> {
    cues: Vec<Cue>,
    clock: C,
    display: D,
    next_index: usize,
}

impl<C: Clock, D: LyricDisplay> Scheduler<C, D> {
    pub fn new(cues: Vec<Cue>, clock: C, display: D) -> Self {
        Self {
            cues,
            clock,
            display,
            next_index: 0,
        }
    }

    /// Shows every cue that has not yet started, in order, until all are
    /// shown or `cancelled` resolves. A pending cue is never shown after
    /// cancellation.
    pub async fn run_until<F>(mut self, cancelled: F) -> SessionEnd
    where
        F: Future<Output = ()>,
    {
        let now = self.clock.now();
        self.next_index = catch_up_index(&self.cues, now);
        if self.next_index > 0 {
            debug!(skipped = self.next_index, now, "Joining playback in progress");
        }

        tokio::pin!(cancelled);
        let mut shown = 0;
        while self.next_index < self.cues.len() {
            let wait = self.cues[self.next_index].start - self.clock.now();
            tokio::select! {
                biased;
                _ = &mut cancelled => {
                    info!(shown, remaining = self.cues.len() - self.next_index, "Lyrics session cancelled");
                    return SessionEnd::Cancelled { shown };
                }
                _ = tokio::time::sleep(wait_for(wait)) => {}
            }

            let now = self.clock.now();
            let duration =
                display_duration(&self.cues, self.next_index, now, self.clock.total_duration());
            let cue = &self.cues[self.next_index];
            debug!(index = self.next_index, now, duration, "Showing caption");
            self.display.on_emit(&cue.text, duration);

            self.next_index += 1;
            shown += 1;
        }

        SessionEnd::Completed { shown }
    }
}

/// A running lyrics session. Dropping the handle cancels the session.
pub struct SessionHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<SessionEnd>,
}

impl SessionHandle {
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<SessionEnd, JoinError> {
        let SessionHandle { cancel, task } = self;
        // Held until the task ends, otherwise the session would see a cancel.
        let _cancel = cancel;
        task.await
    }
}

/// Spawns the drive loop for `cues` on the current tokio runtime.
pub fn start<C, D>(cues: Vec<Cue>, clock: C, display: D) -> SessionHandle
where
    C: Clock + 'static,
    D: LyricDisplay + 'static,
{
    let (tx, rx) = oneshot::channel::<()>();
    let scheduler = Scheduler::new(cues, clock, display);
    let task = tokio::spawn(scheduler.run_until(async move {
        // Both an explicit cancel and a dropped handle end the session.
        let _ = rx.await;
    }));

    SessionHandle {
        cancel: Some(tx),
        task,
    }
}
