use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Html,
    Css,
    Js,
    Images,
    Fonts,
    Config,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 7] = [
        FileCategory::Html,
        FileCategory::Css,
        FileCategory::Js,
        FileCategory::Images,
        FileCategory::Fonts,
        FileCategory::Config,
        FileCategory::Other,
    ];

    /// Text the reorganizer runs through the transform step.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Html | Self::Css | Self::Js)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
            Self::Images => "images",
            Self::Fonts => "fonts",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Extension table, checked in order; first match wins.
const EXTENSION_TABLE: &[(FileCategory, &[&str])] = &[
    (FileCategory::Html, &["html", "htm", "xhtml"]),
    (FileCategory::Css, &["css", "scss", "sass", "less"]),
    (FileCategory::Js, &["js", "mjs", "cjs", "jsx", "ts", "tsx"]),
    (
        FileCategory::Images,
        &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp", "avif"],
    ),
    (FileCategory::Fonts, &["woff", "woff2", "ttf", "otf", "eot"]),
    (
        FileCategory::Config,
        &["json", "xml", "yml", "yaml", "toml", "webmanifest"],
    ),
];

pub fn classify(path: &Path) -> FileCategory {
    let ext = match path.extension() {
        Some(e) => e.to_string_lossy().to_lowercase(),
        None => return FileCategory::Other,
    };
    EXTENSION_TABLE
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(FileCategory::Other)
}

/// Absolute file paths bucketed by category. Order within a bucket is not
/// meaningful.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedFileSet {
    buckets: BTreeMap<FileCategory, Vec<PathBuf>>,
}

impl Default for ClassifiedFileSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifiedFileSet {
    pub fn new() -> Self {
        Self {
            buckets: FileCategory::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    pub fn push(&mut self, category: FileCategory, path: PathBuf) {
        self.buckets.entry(category).or_default().push(path);
    }

    pub fn get(&self, category: FileCategory) -> &[PathBuf] {
        self.buckets
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, category: FileCategory) -> usize {
        self.get(category).len()
    }

    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Files in every category except `Other`.
    pub fn recognized_count(&self) -> usize {
        self.buckets
            .iter()
            .filter(|(c, _)| c.is_recognized())
            .map(|(_, v)| v.len())
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileCategory, &[PathBuf])> {
        self.buckets.iter().map(|(c, v)| (*c, v.as_slice()))
    }
}

#[cfg(test)]
#[path = "tests/classify_tests.rs"]
mod tests;
