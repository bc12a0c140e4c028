pub mod console;
pub mod cue;
pub mod error;
pub mod parser;
pub mod player;
pub mod scheduler;
pub mod serialiser;
pub mod source;

#[cfg(test)]
mod testing;
