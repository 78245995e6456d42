//! Analyzer value objects

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::application::errors::AnalysisError;

/// Per-analyzer configuration, supplied by analyzer id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: None,
            include: None,
            exclude: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_rules(mut self, rules: serde_json::Map<String, serde_json::Value>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include = Some(patterns);
        self
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = Some(patterns);
        self
    }

    /// Compile include/exclude globs into a matcher
    pub fn file_filter(&self, analyzer_id: &str) -> Result<FileFilter, AnalysisError> {
        Ok(FileFilter {
            include: build_globset(analyzer_id, self.include.as_deref())?,
            exclude: build_globset(analyzer_id, self.exclude.as_deref())?,
        })
    }
}

/// Compiled include/exclude patterns
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl FileFilter {
    /// A path matches when it is included (or no include list is set) and not excluded
    pub fn matches(&self, relative_path: &std::path::Path) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|set| set.is_match(relative_path));
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|set| set.is_match(relative_path));
        included && !excluded
    }
}

fn build_globset(
    analyzer_id: &str,
    patterns: Option<&[String]>,
) -> Result<Option<GlobSet>, AnalysisError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            AnalysisError::invalid_config(analyzer_id, format!("bad glob {:?}: {}", pattern, e))
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| AnalysisError::invalid_config(analyzer_id, e.to_string()))
}
