//! Declarative storage key rewriting.
//!
//! Stage outputs are named by applying a [`KeyRule`] to the key of the object that triggered
//! the stage. Rules are plain data so rendition and transcript naming live in configuration
//! and can be tested without any service in the loop.

use serde::{Deserialize, Serialize};

/// Rename of a single directory segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRename {
    pub from: String,
    pub to: String,
}

/// Rewrite rule for deriving an output key from a source key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRule {
    /// Directory prepended to the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Replacement for the file extension (without the dot)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Directory segment renamed in place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_segment: Option<SegmentRename>,
}

impl KeyRule {
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_segment_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename_segment = Some(SegmentRename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Apply the rule. Each substitution happens at most once.
    pub fn apply(&self, key: &str) -> String {
        let (dir, file_name) = match key.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, key),
        };

        let file_name = match &self.extension {
            Some(ext) => replace_extension(file_name, ext),
            None => file_name.to_string(),
        };

        let dir = dir.map(|dir| match &self.rename_segment {
            Some(rename) => rename_first_segment(dir, rename),
            None => dir.to_string(),
        });

        let mut parts = Vec::with_capacity(3);
        if let Some(prefix) = self.normalized_prefix() {
            parts.push(prefix.to_string());
        }
        if let Some(dir) = dir {
            parts.push(dir);
        }
        parts.push(file_name);
        parts.join("/")
    }

    /// Whether `key` sits under the directory this rule prepends
    pub fn is_under_prefix(&self, key: &str) -> bool {
        match self.normalized_prefix() {
            Some(prefix) => key
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn normalized_prefix(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }
}

fn replace_extension(file_name: &str, extension: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    format!("{}.{}", stem, extension.trim_start_matches('.'))
}

fn rename_first_segment(dir: &str, rename: &SegmentRename) -> String {
    let mut renamed = false;
    dir.split('/')
        .map(|segment| {
            if !renamed && segment == rename.from {
                renamed = true;
                rename.to.as_str()
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
