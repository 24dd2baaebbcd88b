//! Source providers for ID reconciliation
//!
//! A [`Sources`] hands every source file to a visitor, in a deterministic
//! order, and writes back whatever replacement text the visitor returns.

use crate::diagnostic::Warning;
use eyre::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// File extensions scanned for trice macros
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "c",   // C
    "h",   // C headers
    "cpp", // C++
    "hpp", // C++ headers
    "cc",  // C++
    "cxx", // C++
    "hh",  // C++ headers
    "hxx", // C++ headers
    "ino", // Arduino sketches
];

/// Check if a file extension is supported for scanning
pub fn is_supported_extension(ext: &OsStr) -> bool {
    ext.to_str()
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Callback receiving a file's path and content. Returning `Some(text)`
/// replaces the file's content with `text`.
pub type Visitor<'a> = dyn FnMut(&Path, &str) -> Result<Option<String>> + 'a;

/// Trait for providing source files to reconcile
pub trait Sources {
    /// Feed every file to `visitor`, returning the warnings collected on the way.
    ///
    /// An error from the visitor aborts the walk.
    fn visit(&mut self, visitor: &mut Visitor<'_>) -> Result<Vec<Warning>>;
}

/// In-memory sources (useful for testing)
#[derive(Debug, Clone, Default)]
pub struct MemorySources(Vec<(PathBuf, String)>);

impl MemorySources {
    /// Create empty memory sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with content
    pub fn add(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.0.push((path.into(), content.into()));
        self
    }

    /// Current content of the file at `path`
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        let path = path.as_ref();
        self.0
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content.as_str())
    }
}

impl Sources for MemorySources {
    fn visit(&mut self, visitor: &mut Visitor<'_>) -> Result<Vec<Warning>> {
        for (path, content) in &mut self.0 {
            if let Some(updated) = visitor(path, content)? {
                *content = updated;
            }
        }
        Ok(Vec::new())
    }
}

/// Gitignore-aware walker over one or more source roots.
///
/// Roots are visited in the given order, and files inside a directory root in
/// file name order. A root that is a file is visited whatever its extension.
#[cfg(feature = "walk")]
#[derive(Debug, Clone)]
pub struct WalkSources {
    roots: Vec<PathBuf>,
    exclude: Vec<String>,
}

#[cfg(feature = "walk")]
impl WalkSources {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    /// Add exclude patterns, matched against paths relative to their root
    /// (e.g., `["vendor/**"]`)
    pub fn exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }
}

#[cfg(feature = "walk")]
impl Sources for WalkSources {
    fn visit(&mut self, visitor: &mut Visitor<'_>) -> Result<Vec<Warning>> {
        use eyre::WrapErr;
        use ignore::WalkBuilder;

        let excluded = build_glob_set(&self.exclude)?;
        let mut warnings = Vec::new();

        for root in &self.roots {
            let metadata = match std::fs::metadata(root) {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(root = %root.display(), "source root does not exist");
                    warnings.push(Warning::missing_root(root));
                    continue;
                }
                Err(e) => {
                    return Err(e)
                        .wrap_err_with(|| format!("Failed to access source root {}", root.display()));
                }
            };

            if metadata.is_file() {
                visit_file(root, visitor, &mut warnings)?;
                continue;
            }

            let walker = WalkBuilder::new(root)
                .follow_links(true)
                .hidden(false)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .sort_by_file_name(|a, b| a.cmp(b))
                .build();

            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping walk entry");
                        continue;
                    }
                };
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }

                let path = entry.path();

                // Only supported file extensions
                if path
                    .extension()
                    .is_none_or(|ext| !is_supported_extension(ext))
                {
                    continue;
                }

                let relative = path.strip_prefix(root).unwrap_or(path);
                if excluded.is_match(relative) {
                    tracing::debug!(path = %path.display(), "excluded");
                    continue;
                }

                visit_file(path, visitor, &mut warnings)?;
            }
        }

        Ok(warnings)
    }
}

#[cfg(feature = "walk")]
fn build_glob_set(patterns: &[String]) -> Result<globset::GlobSet> {
    use eyre::WrapErr;

    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::Glob::new(&pattern.replace('\\', "/"))
            .wrap_err_with(|| format!("Invalid exclude pattern {pattern:?}"))?;
        builder.add(glob);
    }
    builder.build().wrap_err("Failed to build exclude patterns")
}

#[cfg(feature = "walk")]
fn visit_file(path: &Path, visitor: &mut Visitor<'_>, warnings: &mut Vec<Warning>) -> Result<()> {
    use eyre::WrapErr;

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "failed to read source file");
            warnings.push(Warning::unreadable(path, e.to_string()));
            return Ok(());
        }
    };
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(_) => {
            tracing::debug!(path = %path.display(), "source file is not valid UTF-8");
            warnings.push(Warning::unreadable(path, "not valid UTF-8"));
            return Ok(());
        }
    };

    if let Some(updated) = visitor(path, &content)? {
        std::fs::write(path, updated)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
