use crate::scheduler::{Clock, LyricDisplay};

use std::sync::{Arc, Mutex};

use tokio::time::Instant;

/// A clock that follows tokio's (usually paused) time, starting at `offset`.
#[derive(Debug, Clone, Copy)]
pub struct TestClock {
    origin: Instant,
    offset: f64,
    total: f64,
}

impl TestClock {
    pub fn starting_at(offset: f64, total: f64) -> Self {
        Self {
            origin: Instant::now(),
            offset,
            total,
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> f64 {
        self.offset + self.origin.elapsed().as_secs_f64()
    }

    fn total_duration(&self) -> f64 {
        self.total
    }
}

/// Records (text, clock time, duration) for every emit.
#[derive(Clone)]
pub struct Recorder {
    clock: TestClock,
    events: Arc<Mutex<Vec<(String, f64, f64)>>>,
}

impl Recorder {
    pub fn new(clock: TestClock) -> Self {
        Self {
            clock,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn events(&self) -> Vec<(String, f64, f64)> {
        self.events.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events().into_iter().map(|(text, _, _)| text).collect()
    }
}

impl LyricDisplay for Recorder {
    fn on_emit(&mut self, text: &str, duration: f64) {
        let now = self.clock.now();
        self.events
            .lock()
            .unwrap()
            .push((text.to_string(), now, duration));
    }
}
