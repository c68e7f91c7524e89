use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes files into one directory, staging each in a sibling temp file and
/// renaming it into place. The directory is created on the first write.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.prepare_dir()?;

        let target = self.dir.join(filename);
        let failed = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(failed)?;
        staged.write_all(content.as_bytes()).map_err(failed)?;
        staged.as_file().sync_all().map_err(failed)?;
        staged.persist(&target).map_err(|err| failed(err.error))?;
        Ok(target)
    }

    fn prepare_dir(&self) -> Result<(), PersistError> {
        let create_failed = |source: io::Error| PersistError::CreateDir {
            path: self.dir.clone(),
            source,
        };
        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(PersistError::NotADirectory(self.dir.clone())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.dir).map_err(create_failed)
            }
            Err(err) => Err(create_failed(err)),
        }
    }
}

/// One finished question/answer pair, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub chat_id: String,
    pub question: Option<String>,
    pub answer: String,
    pub answered_at: Option<DateTime<Utc>>,
}

impl Transcript {
    /// `<chat-id>.md`, with anything outside `[A-Za-z0-9_-]` replaced.
    pub fn filename(&self) -> String {
        let stem: String = self
            .chat_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{stem}.md")
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(&format!("chat_id: \"{}\"\n", self.chat_id.replace('"', "\\\"")));
        if let Some(at) = self.answered_at {
            out.push_str(&format!("answered_at: \"{}\"\n", at.to_rfc3339()));
        }
        out.push_str("---\n\n");
        if let Some(question) = &self.question {
            out.push_str("## Question\n\n");
            out.push_str(question.trim());
            out.push_str("\n\n");
        }
        out.push_str("## Answer\n\n");
        out.push_str(self.answer.trim_end());
        out.push('\n');
        out
    }

    pub fn save(&self, writer: &AtomicFileWriter) -> Result<PathBuf, PersistError> {
        writer.write(&self.filename(), &self.to_markdown())
    }
}
