/// A single timed caption. Times are in seconds on the playback clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub(crate) text: String,
    pub(crate) start: f64,
    pub(crate) end: Option<f64>,
}

impl Cue {
    pub fn new(text: impl Into<String>, start: f64, end: Option<f64>) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }
}
