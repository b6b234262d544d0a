use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};

/// Report filename and path generated once per query.
///
/// The file itself is written by a tool; this only names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionArtifacts {
    pub filename: String,
    pub path: PathBuf,
}

impl SessionArtifacts {
    /// Name the report for `query` at the current local time
    pub fn generate(query: &str, output_dir: &Path) -> Self {
        Self::generate_at(query, output_dir, Local::now())
    }

    /// Name the report as `search_<query>_<YYYYMMDD_HHMMSS>.md` under `output_dir`
    pub fn generate_at<Tz: TimeZone>(query: &str, output_dir: &Path, now: DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let timestamp = now.format("%Y%m%d_%H%M%S");
        let filename = format!("search_{query}_{timestamp}.md");
        let path = output_dir.join(&filename);
        Self { filename, path }
    }

    /// Path rendered for prompts and summaries
    pub fn path_display(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Append the filename/path tags the planner and tools can pick up textually
    pub fn tag_query(&self, query: &str) -> String {
        format!(
            "{} [md_filename={}] [md_path={}]",
            query.trim(),
            self.filename,
            self.path_display()
        )
    }
}
