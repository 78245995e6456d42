//! Analyzer entities

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::value_objects::AnalyzerConfig;
use crate::application::errors::AnalysisError;
use crate::domain::source::{SourceFingerprint, Workspace};

/// Directories never handed to analyzers as candidate files
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Single issue reported by an analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisIssue {
    pub severity: Severity,
    pub message: String,
    pub rule: String,
    pub file: String,
    /// 1-indexed
    pub line: u32,
    /// 1-indexed
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl AnalysisIssue {
    /// Create an issue; line and column are clamped to at least 1
    pub fn new(
        severity: Severity,
        rule: impl Into<String>,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            rule: rule.into(),
            file: file.into(),
            line: line.max(1),
            column: column.max(1),
            source: None,
            suggestion: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Result from a single analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerResult {
    pub analyzer_id: String,
    /// 0–100
    pub score: f64,
    pub issues: Vec<AnalysisIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl AnalyzerResult {
    /// Create a result; the score is clamped into 0–100
    pub fn new(analyzer_id: impl Into<String>, score: f64, issues: Vec<AnalysisIssue>) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 100.0)
        };
        Self {
            analyzer_id: analyzer_id.into(),
            score,
            issues,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Input handed to analyzers for one run
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Project root (the workspace path)
    pub project_root: PathBuf,
    /// Candidate files, relative to `project_root`
    pub files: Vec<PathBuf>,
    /// Present when results for this run may be cached
    pub fingerprint: Option<SourceFingerprint>,
    /// Configuration of the analyzer currently being invoked
    pub config: AnalyzerConfig,
}

impl AnalysisContext {
    pub fn new(project_root: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            files,
            fingerprint: None,
            config: AnalyzerConfig::default(),
        }
    }

    /// Build a context by walking the workspace for candidate files.
    ///
    /// Skips `.git` and `node_modules`; unreadable entries are ignored.
    pub async fn from_workspace(workspace: &Workspace) -> std::io::Result<Self> {
        let root = workspace.path().to_path_buf();
        let walk_root = root.clone();
        let files = tokio::task::spawn_blocking(move || discover_files(&walk_root))
            .await
            .map_err(std::io::Error::other)?;

        Ok(Self::new(root, files).with_fingerprint(workspace.fingerprint().cloned()))
    }

    pub fn with_fingerprint(mut self, fingerprint: Option<SourceFingerprint>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Copy of this context carrying the given analyzer configuration
    pub fn with_config(&self, config: AnalyzerConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    /// Candidate files that pass the current config's include/exclude globs
    pub fn files_for(&self, analyzer_id: &str) -> Result<Vec<&Path>, AnalysisError> {
        let filter = self.config.file_filter(analyzer_id)?;
        Ok(self
            .files
            .iter()
            .map(PathBuf::as_path)
            .filter(|path| filter.matches(path))
            .collect())
    }

    /// Absolute path of a candidate file
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.project_root.join(relative)
    }
}

/// Regular files under `root`, relative to it, in sorted order
fn discover_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{ReleaseHandle, SourceKind};

    #[test]
    fn test_issue_position_is_one_indexed() {
        let issue = AnalysisIssue::new(Severity::Warning, "no-var", "use let", "a.js", 0, 0);
        assert_eq!((issue.line, issue.column), (1, 1));
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(AnalyzerResult::new("x", 140.0, vec![]).score, 100.0);
        assert_eq!(AnalyzerResult::new("x", -3.0, vec![]).score, 0.0);
        assert_eq!(AnalyzerResult::new("x", f64::NAN, vec![]).score, 0.0);
    }

    #[test]
    fn test_files_for_applies_config_globs() {
        let context = AnalysisContext::new(
            "/work",
            vec![PathBuf::from("src/a.ts"), PathBuf::from("docs/readme.md")],
        );
        let scoped =
            context.with_config(AnalyzerConfig::default().with_include(vec!["**/*.ts".into()]));

        assert_eq!(scoped.files_for("style").unwrap(), vec![Path::new("src/a.ts")]);
        assert_eq!(context.files_for("style").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_from_workspace_skips_vendored_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "").unwrap();
        std::fs::write(dir.path().join("node_modules/dep/index.js"), "").unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "").unwrap();

        let fingerprint = SourceFingerprint::new(SourceKind::Local, "v1");
        let workspace = Workspace::new(dir.path(), ReleaseHandle::new(dir.path()))
            .with_fingerprint(fingerprint.clone());

        let context = AnalysisContext::from_workspace(&workspace).await.unwrap();
        assert_eq!(context.files, vec![PathBuf::from("src/a.ts")]);
        assert_eq!(context.fingerprint, Some(fingerprint));
    }
}
