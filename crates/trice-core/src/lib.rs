//! trice-core - ID allocation and source-tree reconciliation for trice logging
//!
//! Trice macros such as `TRICE16_2(Id(1234), "temp %d.%d\n", a, b)` carry a
//! small numeric ID instead of their format string. This crate keeps those IDs
//! and the persisted ID list (`til.json`) consistent:
//!
//! - [`TriceIdList`] loads and persists the ID -> format mapping
//! - [`allocate`] finds a free ID in a range (random, upward or downward)
//! - [`find_occurrences`] recognizes trice invocations in C sources
//! - [`run`] walks the sources under one of the four [`Policy`] rules
//!
//! # Features
//!
//! - `walk` - Enable [`WalkSources`] for gitignore-aware directory walking (brings in `ignore` and `globset`)
//!
//! # Updating a single text
//!
//! ```
//! use std::path::Path;
//! use trice_core::{Config, Reconciler, SearchMethod, TriceIdList};
//!
//! let config = Config {
//!     method: SearchMethod::Upward,
//!     ..Config::default()
//! };
//! let mut reconciler = Reconciler::new(&config, TriceIdList::new());
//! let update = reconciler
//!     .update_text(Path::new("main.c"), r#"TRICE8_1("x=%d\n", x);"#)
//!     .unwrap();
//!
//! assert_eq!(update.text, r#"TRICE8_1(Id(  1000), "x=%d\n", x);"#);
//! assert_eq!(reconciler.list().len(), 1);
//! ```
//!
//! # In-Memory Sources (for testing)
//!
//! ```
//! use trice_core::{Config, MemorySources, Policy, run};
//!
//! let config = Config {
//!     roots: vec!["src".into()],
//!     ..Config::default()
//! };
//! let mut sources = MemorySources::new().add("src/main.c", r#"TRICE0(Id(42), "boot");"#);
//! let outcome = run(Policy::Zero, &config, &mut sources).unwrap();
//!
//! assert_eq!(outcome.files_modified.len(), 1);
//! assert_eq!(sources.get("src/main.c"), Some(r#"TRICE0(Id(0), "boot");"#));
//! ```

mod alloc;
mod config;
mod diagnostic;
mod id;
mod lexer;
mod list;
mod reconcile;
mod sources;

pub use alloc::{AllocError, Occupancy, SearchMethod, allocate};
pub use config::{
    Config, ConfigError, DEFAULT_ID_LIST, DEFAULT_ID_MAX, DEFAULT_ID_MAX_SHORT, DEFAULT_ID_MIN,
    DEFAULT_ID_MIN_SHORT, DEFAULT_ROOT,
};
pub use diagnostic::{Warning, WarningKind};
pub use id::{IdRange, MacroName, TriceFmt, TriceId, WrapperSpelling};
pub use lexer::{
    IdSite, Occurrence, SourceSpan, find_occurrences, format_specifier_count, parse_occurrence,
};
pub use list::{ReverseIndex, TriceIdList};
pub use reconcile::{
    Outcome, Policy, Reconciler, TextUpdate, refresh, renew, run, update, zero, zero_text,
};
pub use sources::{MemorySources, SUPPORTED_EXTENSIONS, Sources, Visitor, is_supported_extension};

#[cfg(feature = "walk")]
pub use sources::WalkSources;
