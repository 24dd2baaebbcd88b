//! The trice ID list: loading, persisting and the derived reverse index
//!
//! The list file is a JSON object mapping the decimal form of each ID to its
//! format:
//!
//! ```json
//! {
//! 	"12344": {
//! 		"Type": "Trice16_1",
//! 		"Strg": "hi %2d\\n"
//! 	}
//! }
//! ```
//!
//! Keys are written in ascending numeric order with tab indentation, so an
//! unchanged list always serializes to the same bytes.

use crate::id::{IdRange, MacroName, TriceFmt, TriceId};
use crate::lexer::format_specifier_count;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

/// The canonical ID -> format mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriceIdList(BTreeMap<TriceId, TriceFmt>);

impl TriceIdList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list from JSON. Empty or whitespace-only input is an empty list.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(json).wrap_err("Failed to parse ID list JSON")
    }

    /// Load the list file at `path`.
    ///
    /// The file has to exist; an empty file is an empty list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).wrap_err_with(|| {
            format!(
                "Failed to read ID list from {} (create an empty file first if this is a new project)",
                path.display()
            )
        })?;
        Self::from_json(&content)
            .wrap_err_with(|| format!("Failed to parse ID list from {}", path.display()))
    }

    /// Serialize as tab-indented JSON, keys in ascending numeric order
    pub fn to_json(&self) -> Result<String> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .wrap_err("Failed to serialize ID list")?;
        String::from_utf8(out).wrap_err("Serialized ID list is not valid UTF-8")
    }

    /// Write the list to `path`, replacing the file atomically.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .wrap_err_with(|| format!("Failed to create temporary file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .wrap_err_with(|| format!("Failed to write ID list for {}", path.display()))?;
        tmp.persist(path)
            .wrap_err_with(|| format!("Failed to replace ID list {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, id: TriceId) -> Option<&TriceFmt> {
        self.0.get(&id)
    }

    pub fn contains(&self, id: TriceId) -> bool {
        self.0.contains_key(&id)
    }

    /// Insert or replace the format for `id`, returning the previous one
    pub fn insert(&mut self, id: TriceId, fmt: TriceFmt) -> Option<TriceFmt> {
        self.0.insert(id, fmt)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending ID order
    pub fn iter(&self) -> impl Iterator<Item = (TriceId, &TriceFmt)> {
        self.0.iter().map(|(id, fmt)| (*id, fmt))
    }

    /// IDs of the list that fall inside `range`
    pub fn ids_in(&self, range: IdRange) -> impl Iterator<Item = TriceId> + '_ {
        self.0.range(range.min()..=range.max()).map(|(id, _)| *id)
    }

    /// Build the normalized format -> ID index used for shared IDs.
    ///
    /// Entries are folded in ascending ID order. Within one class (short or
    /// normal), formats that only differ in the case of their `Type` collapse
    /// onto one key and the highest ID wins.
    pub fn reverse_index(&self) -> ReverseIndex {
        let mut index = ReverseIndex::default();
        for (id, fmt) in self.iter() {
            index.insert(fmt, id);
        }
        index
    }

    /// Extend every `Type` without an explicit `_<n>` by the number of format
    /// specifiers in its `Strg`, e.g. `TRICE16 "hi %03u, %5x"` becomes
    /// `TRICE16_2`. Zero-parameter macros are left alone.
    pub fn add_format_count(&mut self) {
        for fmt in self.0.values_mut() {
            let Some(name) = MacroName::parse(&fmt.ty) else {
                continue;
            };
            if name.lacks_param_count() {
                fmt.ty = name.with_param_count(format_specifier_count(&fmt.strg));
            }
        }
    }
}

impl FromIterator<(TriceId, TriceFmt)> for TriceIdList {
    fn from_iter<I: IntoIterator<Item = (TriceId, TriceFmt)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalized format -> ID lookup, rebuilt on every run and never persisted.
///
/// Short and normal trices are keyed apart: `Trice0 "hi"` and `TRICE0 "hi"`
/// normalize to the same format but draw from different ranges.
#[derive(Debug, Clone, Default)]
pub struct ReverseIndex(HashMap<(bool, TriceFmt), TriceId>);

impl ReverseIndex {
    fn key(fmt: &TriceFmt) -> (bool, TriceFmt) {
        (fmt.is_short(), fmt.normalized())
    }

    pub fn get(&self, fmt: &TriceFmt) -> Option<TriceId> {
        self.0.get(&Self::key(fmt)).copied()
    }

    /// Point the class and normalized form of `fmt` at `id`, replacing any
    /// earlier ID
    pub fn insert(&mut self, fmt: &TriceFmt, id: TriceId) {
        self.0.insert(Self::key(fmt), id);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TriceIdList {
        [
            (TriceId(12345), TriceFmt::new("TRICE16_3", r"hi %2d, %13u, %64b\n")),
            (TriceId(123), TriceFmt::new("TRICE16_3", r"hi %2d, %13u, %64b\n")),
            (TriceId(13), TriceFmt::new("Trice16_1", r"hi %13u\n")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_to_json_numeric_order_tab_indent() {
        let expected = "{\n\
            \t\"13\": {\n\
            \t\t\"Type\": \"Trice16_1\",\n\
            \t\t\"Strg\": \"hi %13u\\\\n\"\n\
            \t},\n\
            \t\"123\": {\n\
            \t\t\"Type\": \"TRICE16_3\",\n\
            \t\t\"Strg\": \"hi %2d, %13u, %64b\\\\n\"\n\
            \t},\n\
            \t\"12345\": {\n\
            \t\t\"Type\": \"TRICE16_3\",\n\
            \t\t\"Strg\": \"hi %2d, %13u, %64b\\\\n\"\n\
            \t}\n\
            }";
        assert_eq!(sample().to_json().unwrap(), expected);
    }

    #[test]
    fn test_json_round_trip_is_stable() {
        let list = sample();
        let json = list.to_json().unwrap();
        let back = TriceIdList::from_json(&json).unwrap();
        assert_eq!(back, list);
        assert_eq!(back.to_json().unwrap(), json);
    }

    #[test]
    fn test_empty_payload_is_empty_list() {
        assert!(TriceIdList::from_json("").unwrap().is_empty());
        assert!(TriceIdList::from_json("  \n").unwrap().is_empty());
        assert!(TriceIdList::from_json("{}").unwrap().is_empty());
        assert_eq!(TriceIdList::new().to_json().unwrap(), "{}");
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(TriceIdList::from_json("{").is_err());
        assert!(TriceIdList::from_json(r#"{"abc": {"Type": "TRICE0", "Strg": ""}}"#).is_err());
        assert!(TriceIdList::from_json(r#"{"12": {"Type": "TRICE0"}}"#).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = TriceIdList::load(dir.path().join("til.json")).unwrap_err();
        assert!(
            format!("{err:#}").contains("create an empty file first"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("til.json");
        std::fs::write(&path, "").unwrap();
        assert!(TriceIdList::load(&path).unwrap().is_empty());

        let list = sample();
        list.persist(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        assert_eq!(TriceIdList::load(&path).unwrap(), list);

        list.persist(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_reverse_index_is_case_insensitive_on_type() {
        let list: TriceIdList = [
            (TriceId(98), TriceFmt::new("trice8_1", "Hi %d")),
            (TriceId(99), TriceFmt::new("trice8_1", "hi %d")),
        ]
        .into_iter()
        .collect();
        let index = list.reverse_index();
        assert_eq!(index.get(&TriceFmt::new("TRICE8_1", "hi %d")), Some(TriceId(99)));
        assert_eq!(index.get(&TriceFmt::new("trice8_1", "Hi %d")), Some(TriceId(98)));
        assert_eq!(index.get(&TriceFmt::new("trice8_1", "HI %d")), None);
    }

    #[test]
    fn test_reverse_index_collision_keeps_highest_id() {
        let list: TriceIdList = [
            (TriceId(7), TriceFmt::new("TRICE0", "x")),
            (TriceId(5), TriceFmt::new("trice0", "x")),
        ]
        .into_iter()
        .collect();
        let index = list.reverse_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&TriceFmt::new("trice0", "x")), Some(TriceId(7)));
    }

    #[test]
    fn test_reverse_index_keeps_classes_apart() {
        let list: TriceIdList = [
            (TriceId(15), TriceFmt::new("Trice8_1", "x")),
            (TriceId(1500), TriceFmt::new("TRICE8_1", "x")),
        ]
        .into_iter()
        .collect();
        let index = list.reverse_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&TriceFmt::new("Trice8_1", "x")), Some(TriceId(15)));
        assert_eq!(index.get(&TriceFmt::new("trice8_1", "x")), Some(TriceId(1500)));
        assert_eq!(index.get(&TriceFmt::new("TRICE8_1", "x")), Some(TriceId(1500)));
    }

    #[test]
    fn test_add_format_count() {
        let mut list: TriceIdList = [
            (TriceId(10000), TriceFmt::new("Trice8_2", "hi %03u, %5x")),
            (TriceId(10001), TriceFmt::new("TRICE16", "hi %03u, %5x")),
            (TriceId(10002), TriceFmt::new("trice8i", "%d%%")),
            (TriceId(10003), TriceFmt::new("Trice0", "no args")),
        ]
        .into_iter()
        .collect();
        list.add_format_count();
        let types: Vec<&str> = list.iter().map(|(_, fmt)| fmt.ty.as_str()).collect();
        assert_eq!(types, ["Trice8_2", "TRICE16_2", "trice8_1i", "Trice0"]);
    }
}
