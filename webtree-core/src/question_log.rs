// Append-only JSON Lines log of generated questions

use crate::collaborators::GeneratedTask;
use crate::error::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionLogEntry {
    #[serde(flatten)]
    pub task: GeneratedTask,
    pub round_id: usize,
    pub timestamp: String,
    pub current_depth: usize,
    pub current_width: usize,
    pub root_topic: String,
}

#[derive(Debug, Clone)]
pub struct QuestionLog {
    path: PathBuf,
}

impl QuestionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        task: &GeneratedTask,
        round_id: usize,
        current_depth: usize,
        current_width: usize,
        root_topic: &str,
    ) -> Result<()> {
        let entry = QuestionLogEntry {
            task: task.clone(),
            round_id,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            current_depth,
            current_width,
            root_topic: root_topic.to_string(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<QuestionLogEntry>> {
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(Into::into))
            .collect()
    }
}
