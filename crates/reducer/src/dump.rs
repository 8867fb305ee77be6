//! Per-step debug output.
//!
//! The reducer hands every rendered prompt and its outcome to a
//! [`DumpSink`]. [`NoDump`] discards them; [`DirectoryDump`] writes one
//! markdown file per prompt and per response.

use issuefold_core::SummarizeError;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// One summarize call as seen by a dump sink.
#[derive(Debug)]
pub struct StepRecord<'a> {
    /// 1-based step number.
    pub step: usize,
    pub fragments: Range<usize>,
    pub prompt_tokens: usize,
    pub prompt: &'a str,
    pub outcome: Result<&'a str, &'a SummarizeError>,
}

/// Receives every step of a reduction.
pub trait DumpSink: Send {
    fn record(&mut self, step: &StepRecord<'_>) -> io::Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDump;

impl DumpSink for NoDump {
    fn record(&mut self, _step: &StepRecord<'_>) -> io::Result<()> {
        Ok(())
    }
}

/// Writes `step-NNN-prompt.md` and `step-NNN-response.md` into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryDump {
    dir: PathBuf,
}

impl DirectoryDump {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, step: usize, kind: &str) -> PathBuf {
        self.dir.join(format!("step-{step:03}-{kind}.md"))
    }
}

impl DumpSink for DirectoryDump {
    fn record(&mut self, step: &StepRecord<'_>) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(step.step, "prompt"), step.prompt)?;

        let response = match step.outcome {
            Ok(text) => text.to_string(),
            Err(e) => format!("ERROR: {e}\n"),
        };
        std::fs::write(self.path_for(step.step, "response"), response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_dump_writes_prompt_and_response() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectoryDump::new(tmp.path().join("dump"));

        sink.record(&StepRecord {
            step: 1,
            fragments: 0..2,
            prompt_tokens: 40,
            prompt: "prompt one",
            outcome: Ok("summary one"),
        })
        .unwrap();

        let err = SummarizeError::IncompleteGeneration {
            finish_reason: "MAX_TOKENS".into(),
        };
        sink.record(&StepRecord {
            step: 2,
            fragments: 2..3,
            prompt_tokens: 12,
            prompt: "prompt two",
            outcome: Err(&err),
        })
        .unwrap();

        let dir = sink.dir();
        assert_eq!(
            std::fs::read_to_string(dir.join("step-001-prompt.md")).unwrap(),
            "prompt one"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("step-001-response.md")).unwrap(),
            "summary one"
        );
        let failed = std::fs::read_to_string(dir.join("step-002-response.md")).unwrap();
        assert!(failed.starts_with("ERROR:"));
        assert!(failed.contains("MAX_TOKENS"));
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let mut sink = DirectoryDump::new(&file);
        let result = sink.record(&StepRecord {
            step: 1,
            fragments: 0..0,
            prompt_tokens: 0,
            prompt: "p",
            outcome: Ok("s"),
        });
        assert!(result.is_err());
    }
}
