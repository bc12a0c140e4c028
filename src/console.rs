use crate::scheduler::{Clock, LyricDisplay};
use crate::serialiser::format_ts;

use tokio::time::Instant;

/// Wall-clock playback position, as if the track started `offset` seconds ago.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
    offset: f64,
    total: f64,
}

impl WallClock {
    pub fn new(offset: f64, total: f64) -> Self {
        Self {
            origin: Instant::now(),
            offset,
            total,
        }
    }
}

impl Clock for WallClock {
    fn now(&self) -> f64 {
        self.offset + self.origin.elapsed().as_secs_f64()
    }

    fn total_duration(&self) -> f64 {
        self.total
    }
}

/// Prints each caption on one line, prefixed with the clock position.
#[derive(Debug, Clone)]
pub struct ConsoleDisplay<C> {
    clock: C,
}

impl<C: Clock> ConsoleDisplay<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn render(&self, text: &str, duration: f64) -> String {
        let lines: Vec<&str> = text.lines().collect();
        format!(
            "[{}] {} ({:.1}s)",
            format_ts(self.clock.now()),
            lines.join(" / "),
            duration.max(0.0)
        )
    }
}

impl<C: Clock> LyricDisplay for ConsoleDisplay<C> {
    fn on_emit(&mut self, text: &str, duration: f64) {
        println!("{}", self.render(text, duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct Fixed(f64);

    impl Clock for Fixed {
        fn now(&self) -> f64 {
            self.0
        }

        fn total_duration(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn renders_multiline_text_on_one_line() {
        let display = ConsoleDisplay::new(Fixed(62.5));
        assert_eq!(
            display.render("Hello\nthere\n", 2.5),
            "[00:01:02,500] Hello / there (2.5s)"
        );
    }

    #[test]
    fn clamps_negative_duration() {
        let display = ConsoleDisplay::new(Fixed(1.0));
        assert_eq!(display.render("late\n", -3.0), "[00:00:01,000] late (0.0s)");
    }

    #[tokio::test(start_paused = true)]
    async fn wall_clock_starts_at_offset() {
        let clock = WallClock::new(100.0, 240.0);
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert!((clock.now() - 102.0).abs() < 1e-3);
        assert_eq!(clock.total_duration(), 240.0);
    }
}
