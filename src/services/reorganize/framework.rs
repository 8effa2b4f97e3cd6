//! Best-effort front-end framework detection.

use crate::services::scanner::{ClassifiedFileSet, FileCategory};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Unknown,
    React,
    Vue,
    Angular,
}

impl Framework {
    /// Checked in this order; first match wins.
    const PRECEDENCE: [Framework; 3] = [Framework::React, Framework::Vue, Framework::Angular];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::React => "react",
            Self::Vue => "vue",
            Self::Angular => "angular",
        }
    }

    fn manifest_packages(&self) -> &'static [&'static str] {
        match self {
            Self::React => &["react", "react-dom"],
            Self::Vue => &["vue"],
            Self::Angular => &["@angular/core"],
            Self::Unknown => &[],
        }
    }

    fn import_pattern(&self) -> Option<&'static Regex> {
        match self {
            Self::React => Some(&*RE_REACT_IMPORT),
            Self::Vue => Some(&*RE_VUE_IMPORT),
            Self::Angular => Some(&*RE_ANGULAR_IMPORT),
            Self::Unknown => None,
        }
    }
}

static RE_REACT_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:from\s*|require\(\s*)['"]react(?:-dom)?(?:/[\w./-]*)?['"]"#)
        .expect("valid react import regex")
});
static RE_VUE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:from\s*|require\(\s*)['"]vue['"]"#).expect("valid vue import regex")
});
static RE_ANGULAR_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:from\s*|require\(\s*)['"]@angular/core['"]"#)
        .expect("valid angular import regex")
});

const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "devDependencies", "peerDependencies"];

/// Look at `package.json` manifests first (shallowest first), then fall
/// back to import statements in JS sources.
pub fn detect_framework(files: &ClassifiedFileSet) -> Framework {
    let mut manifests: Vec<&PathBuf> = files
        .get(FileCategory::Config)
        .iter()
        .filter(|p| p.file_name().is_some_and(|n| n == "package.json"))
        .collect();
    manifests.sort_by_key(|p| p.components().count());

    for manifest in manifests {
        if let Some(found) = detect_from_manifest(manifest) {
            log::info!("Detected {} from {}", found.name(), manifest.display());
            return found;
        }
    }

    for source in files.get(FileCategory::Js) {
        if let Some(found) = detect_from_source(source) {
            log::info!("Detected {} from imports in {}", found.name(), source.display());
            return found;
        }
    }

    log::debug!("No framework signature found");
    Framework::Unknown
}

pub fn detect_from_manifest(path: &Path) -> Option<Framework> {
    let text = fs::read_to_string(path)
        .map_err(|e| log::warn!("Unreadable manifest {}: {e}", path.display()))
        .ok()?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| log::warn!("Malformed manifest {}: {e}", path.display()))
        .ok()?;

    let declared: Vec<&str> = DEPENDENCY_SECTIONS
        .iter()
        .filter_map(|section| json.get(section)?.as_object())
        .flat_map(|deps| deps.keys().map(String::as_str))
        .collect();

    Framework::PRECEDENCE.into_iter().find(|framework| {
        framework
            .manifest_packages()
            .iter()
            .any(|pkg| declared.contains(pkg))
    })
}

pub fn detect_from_source(path: &Path) -> Option<Framework> {
    let bytes = fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    Framework::PRECEDENCE.into_iter().find(|framework| {
        framework
            .import_pattern()
            .is_some_and(|re| re.is_match(&text))
    })
}
