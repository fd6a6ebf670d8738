//! Persistence seam for recorded data

use meridian_core::{Bar, Tick};
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RecorderError, Result};

/// Destination for recorded ticks and bars. Called from the recorder
/// worker thread only.
pub trait RecordSink: Send {
    fn save_ticks(&mut self, ticks: &[Tick]) -> Result<()>;

    fn save_bars(&mut self, bars: &[Bar]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One JSON object per line, one file per symbol and kind:
/// `<dir>/<vt_symbol>.tick.jsonl`, `<dir>/<vt_symbol>.bar.jsonl`
pub struct JsonLinesSink {
    dir: PathBuf,
    writers: HashMap<PathBuf, BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| RecorderError::io(&dir, e))?;
        Ok(Self {
            dir,
            writers: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that records `kind` for `vt_symbol`
    pub fn path_for(&self, vt_symbol: &str, kind: &str) -> PathBuf {
        self.dir.join(format!("{vt_symbol}.{kind}.jsonl"))
    }

    fn append<T: Serialize>(&mut self, path: PathBuf, record: &T) -> Result<()> {
        let writer = match self.writers.entry(path.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| RecorderError::io(&path, e))?;
                debug!(path = %path.display(), "Opened record file");
                entry.insert(BufWriter::new(file))
            }
        };
        serde_json::to_writer(&mut *writer, record)?;
        writer
            .write_all(b"\n")
            .map_err(|e| RecorderError::io(&path, e))
    }
}

impl RecordSink for JsonLinesSink {
    fn save_ticks(&mut self, ticks: &[Tick]) -> Result<()> {
        for tick in ticks {
            let path = self.path_for(&tick.vt_symbol(), "tick");
            self.append(path, tick)?;
        }
        Ok(())
    }

    fn save_bars(&mut self, bars: &[Bar]) -> Result<()> {
        for bar in bars {
            let path = self.path_for(&bar.vt_symbol(), "bar");
            self.append(path, bar)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for (path, writer) in &mut self.writers {
            writer.flush().map_err(|e| RecorderError::io(path, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::Exchange;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lines_appended_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::new(dir.path()).unwrap();

        let mut tick = Tick::new("btcusdt", Exchange::Huobi, "HUOBI", Utc::now());
        tick.last_price = dec!(1);
        sink.save_ticks(&[tick.clone(), tick]).unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(sink.path_for("btcusdt.HUOBI", "tick")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let decoded: Tick = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(decoded.last_price, dec!(1));
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let tick = Tick::new("ethusdt", Exchange::Huobi, "HUOBI", Utc::now());

        for _ in 0..2 {
            let mut sink = JsonLinesSink::new(dir.path()).unwrap();
            sink.save_ticks(std::slice::from_ref(&tick)).unwrap();
            sink.flush().unwrap();
        }

        let path = dir.path().join("ethusdt.HUOBI.tick.jsonl");
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 2);
    }
}
