use crate::cue::Cue;

use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

/// Writes `cues` as SRT, numbered from 1. A cue without an end is closed at its start.
pub fn serialise<W: Write>(cues: &[Cue], output: W) -> Result<()> {
    let mut writer = BufWriter::new(output);
    write_cues(&mut writer, cues).context("Failed to write to output.")?;
    writer.flush().context("Failed to write to output.")?;
    Ok(())
}

fn write_cues<W: Write>(buf: &mut W, cues: &[Cue]) -> Result<()> {
    for (idx, cue) in cues.iter().enumerate() {
        write_cue(buf, idx + 1, cue)?;
    }
    Ok(())
}

fn write_cue<W: Write>(buf: &mut W, seqnum: usize, cue: &Cue) -> Result<()> {
    writeln!(buf, "{}", seqnum)?;
    write_ts(buf, cue.start)?;
    write!(buf, " --> ")?;
    write_ts(buf, cue.end.unwrap_or(cue.start))?;
    writeln!(buf)?;
    for line in cue.text.lines() {
        writeln!(buf, "{}", line)?;
    }
    writeln!(buf)?;
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, secs: f64) -> Result<()> {
    write!(buf, "{}", format_ts(secs))?;
    Ok(())
}

/// Formats seconds as `HH:MM:SS,mmm`. Negative values clamp to zero.
pub fn format_ts(secs: f64) -> String {
    let total_millis = (secs.max(0.0) * 1000.0).round() as u64;
    let total_secs = total_millis / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
