//! Line-delimited JSON output sink
//!
//! One file per pipeline stage; each record is one JSON object per line,
//! in insertion order. Files are written to a `.tmp` path and renamed once
//! complete, so a readable file is always a whole stage.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Writes stage outputs into one directory.
pub struct JsonlWriter {
    output_dir: PathBuf,
}

impl JsonlWriter {
    /// Creates the output directory (and parents) up front.
    pub fn new(output_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Serialize `records` as JSONL under `filename`, returning the final path.
    pub fn write<T: Serialize>(
        &self,
        filename: &str,
        records: &[T],
    ) -> std::io::Result<PathBuf> {
        let final_path = self.output_dir.join(filename);
        let tmp_path = self.output_dir.join(format!("{filename}.tmp"));

        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let mut out = BufWriter::new(File::create(&tmp_path)?);
        for record in records {
            let line = serde_json::to_string(record)?;
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        drop(out);

        fs::rename(&tmp_path, &final_path)?;
        Ok(final_path)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
