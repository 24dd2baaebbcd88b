//! Source-tree reconciliation
//!
//! One run owns the ID list from load to persist. Every source file is fed
//! through a [`Reconciler`], which applies one of the four [`Policy`] rules
//! to the file's occurrences left to right:
//!
//! - `renew` and `refresh` only read sources and collect the IDs they find
//!   into the list (`renew` starts from an empty list);
//! - `update` gives every occurrence without an ID a fresh (or shared) one
//!   and rewrites the source text;
//! - `zero` resets every embedded ID to `0` and leaves the list alone.
//!
//! The list is written at most once, after the whole walk.

use crate::alloc::allocate;
use crate::config::Config;
use crate::diagnostic::Warning;
use crate::id::{TriceFmt, TriceId};
use crate::lexer::{IdSite, SourceSpan, find_occurrences, format_specifier_count};
use crate::list::{ReverseIndex, TriceIdList};
use crate::sources::Sources;
use eyre::{Result, WrapErr};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a run does with the ID list and the source tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Rebuild the list from scratch out of the IDs in the sources
    Renew,
    /// Add IDs found in the sources to the existing list
    Refresh,
    /// Assign IDs to every occurrence that lacks one
    Update,
    /// Reset every embedded ID in the sources to `0`
    Zero,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Renew => "renew",
            Policy::Refresh => "refresh",
            Policy::Update => "update",
            Policy::Zero => "zero",
        }
    }

    /// Whether the policy rewrites source files
    pub fn writes_sources(&self) -> bool {
        matches!(self, Policy::Update | Policy::Zero)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct Outcome {
    pub policy: Policy,
    pub files_visited: usize,
    /// Files whose text changed (or would change, in a dry run)
    pub files_modified: Vec<PathBuf>,
    pub list_len_before: usize,
    pub list_len_after: usize,
    /// The list differs from what it was before the walk
    pub list_modified: bool,
    /// The list file was actually written
    pub list_written: bool,
    pub warnings: Vec<Warning>,
}

/// Rewritten text of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUpdate {
    pub text: String,
    pub file_modified: bool,
    /// The list gained an entry while processing this text
    pub list_modified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registration {
    Inserted,
    Known,
    Conflict,
}

/// Replacement of a byte span
struct Edit {
    span: SourceSpan,
    text: String,
}

/// Apply non-overlapping edits, last to first so earlier offsets stay valid
fn apply_edits(content: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.span.offset.cmp(&a.span.offset));
    let mut text = content.to_string();
    for edit in edits {
        text.replace_range(edit.span.range(), &edit.text);
    }
    text
}

/// Per-run state: the list being reconciled and everything derived from it
pub struct Reconciler<'c> {
    config: &'c Config,
    list: TriceIdList,
    /// Only maintained with shared IDs enabled
    reverse: Option<ReverseIndex>,
    list_modified: bool,
    warnings: Vec<Warning>,
    rng: StdRng,
}

impl<'c> Reconciler<'c> {
    pub fn new(config: &'c Config, list: TriceIdList) -> Self {
        let reverse = config.shared_ids.then(|| list.reverse_index());
        Self {
            config,
            list,
            reverse,
            list_modified: false,
            warnings: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Use `rng` for random ID allocation
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn list(&self) -> &TriceIdList {
        &self.list
    }

    pub fn list_modified(&self) -> bool {
        self.list_modified
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_parts(self) -> (TriceIdList, Vec<Warning>) {
        (self.list, self.warnings)
    }

    /// Record `id -> fmt` unless the ID is already taken.
    ///
    /// The first registration of an ID wins. A later format that only differs
    /// in the case of its `Type` is the same message and its spelling replaces
    /// the stored one; anything else is reported as a duplicate.
    fn register(&mut self, path: &Path, line: usize, id: TriceId, fmt: &TriceFmt) -> Registration {
        let Some(kept) = self.list.get(id) else {
            debug!(file = %path.display(), line, %id, %fmt, "registering ID");
            self.list.insert(id, fmt.clone());
            if let Some(reverse) = &mut self.reverse {
                reverse.insert(fmt, id);
            }
            self.list_modified = true;
            return Registration::Inserted;
        };

        if kept == fmt {
            return Registration::Known;
        }
        if kept.normalized() == fmt.normalized() {
            debug!(file = %path.display(), line, %id, %kept, %fmt, "same format, different type case");
            if let Some(reverse) = &mut self.reverse {
                reverse.insert(fmt, id);
            }
            self.list.insert(id, fmt.clone());
            return Registration::Known;
        }

        let kept = kept.clone();
        debug!(file = %path.display(), line, %id, %kept, found = %fmt, "ID already used by a different format");
        self.warnings
            .push(Warning::duplicate_id(path, line, id, kept, fmt.clone()));
        Registration::Conflict
    }

    /// An ID already in use for the same (normalized) format, if it belongs
    /// to the occurrence's range
    fn shared_id(&self, fmt: &TriceFmt, short: bool) -> Option<TriceId> {
        let id = self.reverse.as_ref()?.get(fmt)?;
        self.config.range_for(short).contains(id).then_some(id)
    }

    /// Allocate a fresh ID for `fmt` and register it
    fn assign(&mut self, path: &Path, line: usize, fmt: &TriceFmt, short: bool) -> Result<TriceId> {
        let range = self.config.range_for(short);
        let id = allocate(range, &self.list, self.config.method, &mut self.rng)
            .wrap_err_with(|| format!("Failed to assign an ID to {fmt} at {}:{line}", path.display()))?;
        info!(file = %path.display(), line, %id, %fmt, "assigned new ID");
        self.list.insert(id, fmt.clone());
        if let Some(reverse) = &mut self.reverse {
            reverse.insert(fmt, id);
        }
        self.list_modified = true;
        Ok(id)
    }

    /// Collect the nonzero IDs of `content` into the list. Never touches text.
    pub fn refresh_text(&mut self, path: &Path, content: &str) {
        for occ in find_occurrences(content) {
            if let Some(id) = occ.embedded_id() {
                self.register(path, occ.line, id, &occ.trice_fmt());
            }
        }
    }

    /// Give every occurrence of `content` an ID, returning the rewritten text.
    ///
    /// Fails only when an ID range is exhausted.
    pub fn update_text(&mut self, path: &Path, content: &str) -> Result<TextUpdate> {
        let mut edits = Vec::new();
        let mut list_modified = false;

        for occ in find_occurrences(content) {
            let mut fmt = occ.trice_fmt();
            let rename = (self.config.add_param_count && occ.name.lacks_param_count())
                .then(|| occ.name.with_param_count(format_specifier_count(&occ.format)));
            if let Some(name) = &rename {
                fmt.ty = name.clone();
            }

            if let Some(id) = occ.embedded_id() {
                match self.register(path, occ.line, id, &fmt) {
                    Registration::Conflict => continue,
                    Registration::Inserted => list_modified = true,
                    Registration::Known => {}
                }
            } else {
                let short = occ.name.is_short();
                let id = match self.shared_id(&fmt, short) {
                    Some(id) => {
                        debug!(file = %path.display(), line = occ.line, %id, %fmt, "reusing shared ID");
                        // Latest spelling of the type is kept, not a list change
                        self.list.insert(id, fmt.clone());
                        id
                    }
                    None => {
                        list_modified = true;
                        self.assign(path, occ.line, &fmt, short)?
                    }
                };
                let wrapper = occ.name.render_id(id);
                edits.push(match occ.id_site {
                    IdSite::Absent => Edit {
                        span: SourceSpan::new(occ.format_span.offset, 0),
                        text: format!("{wrapper}, "),
                    },
                    IdSite::Wrapped { span, .. } => Edit {
                        span,
                        text: wrapper,
                    },
                });
            }

            if let Some(name) = rename {
                debug!(file = %path.display(), line = occ.line, from = %occ.name, to = %name, "adding parameter count");
                edits.push(Edit {
                    span: occ.name_span,
                    text: name,
                });
            }
        }

        let text = apply_edits(content, edits);
        Ok(TextUpdate {
            file_modified: text != content,
            list_modified,
            text,
        })
    }
}

/// Reset every nonzero embedded ID of `content` to `0`, keeping the wrapper
/// spelling
pub fn zero_text(content: &str) -> TextUpdate {
    let edits: Vec<Edit> = find_occurrences(content)
        .into_iter()
        .filter_map(|occ| match occ.id_site {
            IdSite::Wrapped { span, spelling, id } if !id.is_unassigned() => Some(Edit {
                span,
                text: format!("{}(0)", spelling.as_str()),
            }),
            _ => None,
        })
        .collect();
    let text = apply_edits(content, edits);
    TextUpdate {
        file_modified: text != content,
        list_modified: false,
        text,
    }
}

/// Run `policy` over `sources`
pub fn run(policy: Policy, config: &Config, sources: &mut impl Sources) -> Result<Outcome> {
    match policy {
        Policy::Renew => renew(config, sources),
        Policy::Refresh => refresh(config, sources),
        Policy::Update => update(config, sources),
        Policy::Zero => zero(config, sources),
    }
}

/// Rebuild the list from the IDs found in the sources, ignoring the list file
pub fn renew(config: &Config, sources: &mut impl Sources) -> Result<Outcome> {
    config.validate(Policy::Renew)?;
    scan(Policy::Renew, config, TriceIdList::new(), sources)
}

/// Add the IDs found in the sources to the list file
pub fn refresh(config: &Config, sources: &mut impl Sources) -> Result<Outcome> {
    config.validate(Policy::Refresh)?;
    let list = TriceIdList::load(&config.id_list)?;
    scan(Policy::Refresh, config, list, sources)
}

fn scan(
    policy: Policy,
    config: &Config,
    list: TriceIdList,
    sources: &mut impl Sources,
) -> Result<Outcome> {
    info!(%policy, list = %config.id_list.display(), "scanning sources");
    let snapshot = list.clone();
    let mut reconciler = Reconciler::new(config, list);
    let mut files_visited = 0;

    let mut warnings = sources.visit(&mut |path: &Path, content: &str| -> Result<Option<String>> {
        files_visited += 1;
        reconciler.refresh_text(path, content);
        Ok(None)
    })?;

    let (list, engine_warnings) = reconciler.into_parts();
    warnings.extend(engine_warnings);
    let list_modified = list != snapshot;
    let list_written = list_modified && !config.dry_run;
    if list_written {
        list.persist(&config.id_list)?;
    }

    Ok(Outcome {
        policy,
        files_visited,
        files_modified: Vec::new(),
        list_len_before: snapshot.len(),
        list_len_after: list.len(),
        list_modified,
        list_written,
        warnings,
    })
}

/// Assign IDs in the sources and record them in the list file
pub fn update(config: &Config, sources: &mut impl Sources) -> Result<Outcome> {
    config.validate(Policy::Update)?;
    info!(
        list = %config.id_list.display(),
        method = %config.method,
        shared_ids = config.shared_ids,
        "updating sources"
    );
    let list = TriceIdList::load(&config.id_list)?;
    let list_len_before = list.len();
    let mut reconciler = Reconciler::new(config, list);
    let mut files_visited = 0;
    let mut files_modified = Vec::new();

    let mut warnings = sources.visit(&mut |path: &Path, content: &str| -> Result<Option<String>> {
        files_visited += 1;
        let update = reconciler.update_text(path, content)?;
        if !update.file_modified {
            return Ok(None);
        }
        debug!(file = %path.display(), dry_run = config.dry_run, "source changed");
        files_modified.push(path.to_path_buf());
        Ok((!config.dry_run).then_some(update.text))
    })?;

    let list_modified = reconciler.list_modified();
    let (list, engine_warnings) = reconciler.into_parts();
    warnings.extend(engine_warnings);
    let list_written = list_modified && !config.dry_run;
    if list_written {
        list.persist(&config.id_list)?;
    }

    Ok(Outcome {
        policy: Policy::Update,
        files_visited,
        files_modified,
        list_len_before,
        list_len_after: list.len(),
        list_modified,
        list_written,
        warnings,
    })
}

/// Reset every embedded ID in the sources to `0`. The list file is not read.
pub fn zero(config: &Config, sources: &mut impl Sources) -> Result<Outcome> {
    config.validate(Policy::Zero)?;
    info!("zeroing IDs in sources");
    let mut files_visited = 0;
    let mut files_modified = Vec::new();

    let warnings = sources.visit(&mut |path: &Path, content: &str| -> Result<Option<String>> {
        files_visited += 1;
        let update = zero_text(content);
        if !update.file_modified {
            return Ok(None);
        }
        files_modified.push(path.to_path_buf());
        Ok((!config.dry_run).then_some(update.text))
    })?;

    Ok(Outcome {
        policy: Policy::Zero,
        files_visited,
        files_modified,
        list_len_before: 0,
        list_len_after: 0,
        list_modified: false,
        list_written: false,
        warnings,
    })
}
