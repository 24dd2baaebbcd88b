//! Lexer for trice macro invocations
//!
//! Recognizes the narrow shape
//!
//! ```text
//! trice<width>[_<n>][i] ( [Id(<decimal>),] "<format>" [, <value>]* )
//! ```
//!
//! anywhere in a source file. The family token is case-insensitive, the ID
//! wrapper is spelled `Id` or `id` regardless of the macro's case. A wrapper
//! holding anything other than a plain decimal literal (`Id(0x5)`, `Id(-0)`)
//! makes the whole invocation unrecognized, so no policy ever touches it.

use crate::id::{MacroName, TriceFmt, TriceId, WrapperSpelling};
use std::ops::Range;

/// Byte span in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    /// Byte offset from start of file
    pub offset: usize,
    /// Byte length
    pub length: usize,
}

impl SourceSpan {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    fn between(start: usize, end: usize) -> Self {
        Self::new(start, end - start)
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Where the ID of an occurrence lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSite {
    /// No wrapper: a new one goes right before the format string
    Absent,
    /// An `Id(n)` / `id(n)` wrapper with a decimal literal
    Wrapped {
        /// Span of the whole wrapper, `Id(` to `)`
        span: SourceSpan,
        spelling: WrapperSpelling,
        id: TriceId,
    },
}

/// One matched trice macro invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// From the first byte of the macro name to the closing `)`
    pub span: SourceSpan,
    pub name_span: SourceSpan,
    pub name: MacroName,
    pub id_site: IdSite,
    /// The format string literal including its quotes
    pub format_span: SourceSpan,
    /// The format string as written, escapes untouched
    pub format: String,
    /// Number of value arguments after the format string
    pub value_args: usize,
    /// Line number (1-indexed)
    pub line: usize,
}

impl Occurrence {
    /// The embedded ID, if there is one and it is not `0`
    pub fn embedded_id(&self) -> Option<TriceId> {
        match self.id_site {
            IdSite::Wrapped { id, .. } if !id.is_unassigned() => Some(id),
            _ => None,
        }
    }

    pub fn trice_fmt(&self) -> TriceFmt {
        TriceFmt::new(self.name.text.clone(), self.format.clone())
    }

    /// The matched invocation text
    pub fn text<'a>(&self, content: &'a str) -> &'a str {
        &content[self.span.range()]
    }

    /// The wrapper text, e.g. `Id(   59)`
    pub fn id_text<'a>(&self, content: &'a str) -> Option<&'a str> {
        match self.id_site {
            IdSite::Wrapped { span, .. } => Some(&content[span.range()]),
            IdSite::Absent => None,
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Find every trice invocation in `content`, left to right
pub fn find_occurrences(content: &str) -> Vec<Occurrence> {
    let bytes = content.as_bytes();

    // Track line starts for computing line numbers from byte offsets
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(content.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let get_line = |offset: usize| -> usize {
        match line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    };

    let mut occurrences = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_alphabetic() || (i > 0 && is_ident_byte(bytes[i - 1])) {
            i += 1;
            continue;
        }

        let mut end = i;
        while end < bytes.len() && is_ident_byte(bytes[end]) {
            end += 1;
        }

        match parse_invocation(content, i, end) {
            Some(mut occ) => {
                occ.line = get_line(i);
                i = occ.span.end();
                occurrences.push(occ);
            }
            None => i = end,
        }
    }
    occurrences
}

/// Parse a single invocation at the start of `text` (leading whitespace is
/// skipped). Nothing after the closing `)` is looked at.
pub fn parse_occurrence(text: &str) -> Option<Occurrence> {
    let bytes = text.as_bytes();
    let start = skip_ws(bytes, 0);
    let mut end = start;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    let mut occ = parse_invocation(text, start, end)?;
    occ.line = text[..start].matches('\n').count() + 1;
    Some(occ)
}

/// Try to parse an invocation whose name occupies `name_start..name_end`
fn parse_invocation(content: &str, name_start: usize, name_end: usize) -> Option<Occurrence> {
    let bytes = content.as_bytes();
    let name = MacroName::parse(content.get(name_start..name_end)?)?;

    let mut pos = skip_ws(bytes, name_end);
    if bytes.get(pos) != Some(&b'(') {
        return None;
    }
    pos = skip_ws(bytes, pos + 1);

    let id_site = match parse_wrapper(content, pos)? {
        Some((site, after)) => {
            pos = after;
            site
        }
        None => IdSite::Absent,
    };

    // Format string literal
    if bytes.get(pos) != Some(&b'"') {
        return None;
    }
    let format_start = pos;
    let format_end = skip_literal(bytes, pos)?;
    let format = content[format_start + 1..format_end - 1].to_string();

    // Value arguments up to the matching `)`
    pos = skip_ws(bytes, format_end);
    if !matches!(bytes.get(pos), Some(b',') | Some(b')')) {
        return None;
    }
    let mut depth = 0usize;
    let mut value_args = 0;
    loop {
        match *bytes.get(pos)? {
            b'"' | b'\'' => {
                pos = skip_literal(bytes, pos)?;
                continue;
            }
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            b',' if depth == 0 => value_args += 1,
            b';' if depth == 0 => return None,
            _ => {}
        }
        pos += 1;
    }
    let end = pos + 1;

    Some(Occurrence {
        span: SourceSpan::between(name_start, end),
        name_span: SourceSpan::between(name_start, name_end),
        name,
        id_site,
        format_span: SourceSpan::between(format_start, format_end),
        format,
        value_args,
        line: 1,
    })
}

/// Parse an optional ID wrapper at `pos`.
///
/// - `Some(None)`: no wrapper here
/// - `Some(Some((site, after)))`: a decimal wrapper and its trailing comma,
///   `after` points at the format string
/// - `None`: something wrapper-shaped that is not a decimal ID, the
///   invocation is not recognized
fn parse_wrapper(content: &str, pos: usize) -> Option<Option<(IdSite, usize)>> {
    let bytes = content.as_bytes();
    let Some(spelling) = content.get(pos..pos + 2).and_then(WrapperSpelling::parse) else {
        return Some(None);
    };
    let mut p = skip_ws(bytes, pos + 2);
    if bytes.get(p) != Some(&b'(') {
        return Some(None);
    }
    p = skip_ws(bytes, p + 1);

    let digits_start = p;
    while p < bytes.len() && bytes[p].is_ascii_digit() {
        p += 1;
    }
    if p == digits_start {
        return None;
    }
    let id: u32 = content[digits_start..p].parse().ok()?;

    p = skip_ws(bytes, p);
    if bytes.get(p) != Some(&b')') {
        return None;
    }
    let span = SourceSpan::between(pos, p + 1);

    p = skip_ws(bytes, p + 1);
    if bytes.get(p) != Some(&b',') {
        return None;
    }
    p = skip_ws(bytes, p + 1);

    Some(Some((
        IdSite::Wrapped {
            span,
            spelling,
            id: TriceId(id),
        },
        p,
    )))
}

/// Skip a string or char literal starting at `pos`, returning the offset just
/// past its closing quote. Literals do not span lines.
fn skip_literal(bytes: &[u8], pos: usize) -> Option<usize> {
    let quote = bytes[pos];
    let mut p = pos + 1;
    loop {
        match *bytes.get(p)? {
            b'\\' => p += 2,
            b'\n' => return None,
            b if b == quote => return Some(p + 1),
            _ => p += 1,
        }
    }
}

/// Count printf-style conversion specifiers in a format string.
///
/// Flags, width, precision and length modifiers belong to the specifier they
/// precede; `%%` is a literal percent sign.
pub fn format_specifier_count(strg: &str) -> usize {
    const CONVERSIONS: &[u8] = b"diouxXfFeEgGaAcspnb";
    let bytes = strg.as_bytes();
    let mut count = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        i += 1;
        if bytes.get(i) == Some(&b'%') {
            i += 1;
            continue;
        }

        // flags
        while i < bytes.len() && b"-+ #0".contains(&bytes[i]) {
            i += 1;
        }
        // width
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'*') {
            i += 1;
        }
        // precision
        if bytes.get(i) == Some(&b'.') {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'*') {
                i += 1;
            }
        }
        // length
        while i < bytes.len() && b"hljztL".contains(&bytes[i]) {
            i += 1;
        }

        if i < bytes.len() && CONVERSIONS.contains(&bytes[i]) {
            count += 1;
            i += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IdCheck {
        text: &'static str,
        id_text: &'static str,
        id: u32,
        fmt: (&'static str, &'static str),
    }

    const OK_SET: &[IdCheck] = &[
        IdCheck { text: r#"Trice0i(id(   59), "tt" )"#, id_text: "id(   59)", id: 59, fmt: ("Trice0i", "tt") },
        IdCheck { text: r#"Trice0(Id(   59), "tt" )"#, id_text: "Id(   59)", id: 59, fmt: ("Trice0", "tt") },
        IdCheck { text: r#"Trice0(id(   59), "tt" )"#, id_text: "id(   59)", id: 59, fmt: ("Trice0", "tt") },
        IdCheck { text: r#"TRICE0(Id(   59), "tt" )"#, id_text: "Id(   59)", id: 59, fmt: ("TRICE0", "tt") },
        IdCheck { text: r#"TRICE0(id(   59), "tt" )"#, id_text: "id(   59)", id: 59, fmt: ("TRICE0", "tt") },
        IdCheck { text: r#"TRICE0(Id(59   ), "tt" )"#, id_text: "Id(59   )", id: 59, fmt: ("TRICE0", "tt") },
        IdCheck { text: r#"TRICE0(Id(59), "tt" )"#, id_text: "Id(59)", id: 59, fmt: ("TRICE0", "tt") },
        IdCheck { text: r#"TRICE0(Id( 59 ), "tt" )"#, id_text: "Id( 59 )", id: 59, fmt: ("TRICE0", "tt") },
        IdCheck { text: r#"trice0(Id(59), "tt" )"#, id_text: "Id(59)", id: 59, fmt: ("trice0", "tt") },
        IdCheck { text: r#"trice64_2(Id(59), "%d,%x", -3, -4 )"#, id_text: "Id(59)", id: 59, fmt: ("trice64_2", "%d,%x") },
    ];

    #[test]
    fn test_parse_ok_set() {
        for check in OK_SET {
            let occ = parse_occurrence(check.text)
                .unwrap_or_else(|| panic!("not recognized: {}", check.text));
            assert_eq!(occ.text(check.text), check.text, "matched text");
            assert_eq!(occ.id_text(check.text), Some(check.id_text), "{}", check.text);
            assert_eq!(occ.embedded_id(), Some(TriceId(check.id)), "{}", check.text);
            assert_eq!(
                occ.trice_fmt(),
                TriceFmt::new(check.fmt.0, check.fmt.1),
                "{}",
                check.text
            );
        }
    }

    #[test]
    fn test_non_decimal_wrapper_is_not_recognized() {
        assert!(parse_occurrence(r#"TRICE0(Id(0x5), "tt" )"#).is_none());
        assert!(parse_occurrence(r#"TRICE0(id(0x5 ), "tt" )"#).is_none());
        assert!(parse_occurrence(r#"trice8_1( Id(0x0), "Hi %d", 5);"#).is_none());
        assert!(parse_occurrence(r#"trice8_1( Id(-0), "hi %d", 5);"#).is_none());
        assert!(parse_occurrence(r#"trice8_1( Id(), "hi %d", 5);"#).is_none());
        assert!(find_occurrences(r#"x; trice8_1( Id(0x0), "Hi %d", 5); y"#).is_empty());
    }

    #[test]
    fn test_wrapper_spelling_is_case_sensitive() {
        assert!(parse_occurrence(r#"TRICE0(ID(5), "tt")"#).is_none());
        assert!(parse_occurrence(r#"TRICE0(iD(5), "tt")"#).is_none());
    }

    #[test]
    fn test_bare_occurrence() {
        let text = r#"Trice8 ( "hi %03u", 5)"#;
        let occ = parse_occurrence(text).unwrap();
        assert_eq!(occ.id_site, IdSite::Absent);
        assert_eq!(occ.embedded_id(), None);
        assert_eq!(occ.format, "hi %03u");
        assert_eq!(&text[occ.format_span.range()], r#""hi %03u""#);
        assert_eq!(&text[occ.name_span.range()], "Trice8");
        assert_eq!(occ.value_args, 1);
    }

    #[test]
    fn test_zero_id_is_not_embedded() {
        let occ = parse_occurrence(r#"TRICE8_1( Id(       0   ), "Hi %d", 5)"#).unwrap();
        assert!(matches!(occ.id_site, IdSite::Wrapped { id: TriceId(0), .. }));
        assert_eq!(occ.embedded_id(), None);
    }

    #[test]
    fn test_value_args_skip_nested_parens_and_literals() {
        let occ = parse_occurrence(r#"TRICE32_3(Id(7), "%d %c %s", f(a, b), ',', ")")"#).unwrap();
        assert_eq!(occ.value_args, 3);
        let occ = parse_occurrence(r#"trice0(id(1), "no \"args\" here")"#).unwrap();
        assert_eq!(occ.value_args, 0);
        assert_eq!(occ.format, r#"no \"args\" here"#);
    }

    #[test]
    fn test_unterminated_invocations() {
        assert!(parse_occurrence(r#"TRICE8(Id(1), "hi %d", 5;"#).is_none());
        assert!(parse_occurrence(r#"TRICE8(Id(1), "hi %d", 5"#).is_none());
        assert!(parse_occurrence("TRICE8(Id(1), \"hi\n\")").is_none());
        assert!(parse_occurrence("TRICE8(Id(1), name)").is_none());
    }

    #[test]
    fn test_find_occurrences_in_file() {
        let content = "void f(void) {\n\
            \tTRICE16_3( Id(12345), \"hi %2d, %13u, %64b\\n\",1,2,3 );\n\
            \tmytrice8(\"not a trice\");\n\
            \tTrice16_1i( \"ho %64b\\n\", 1 ); // TRICE0(\"in comment\")\n\
            }\n";
        let occs = find_occurrences(content);
        let names: Vec<&str> = occs.iter().map(|o| o.name.text.as_str()).collect();
        assert_eq!(names, ["TRICE16_3", "Trice16_1i", "TRICE0"]);
        let lines: Vec<usize> = occs.iter().map(|o| o.line).collect();
        assert_eq!(lines, [2, 4, 4]);
        assert_eq!(occs[0].format, r"hi %2d, %13u, %64b\n");
        assert_eq!(occs[0].value_args, 3);
    }

    #[test]
    fn test_format_specifier_count() {
        assert_eq!(format_specifier_count("hi"), 0);
        assert_eq!(format_specifier_count("hi %03u, %5x"), 2);
        assert_eq!(format_specifier_count(r"hi %2d, %13u, %64b\n"), 3);
        assert_eq!(format_specifier_count("100%% sure %d"), 1);
        assert_eq!(format_specifier_count("%-8.3f|%lld|%hhx|%*d"), 4);
        assert_eq!(format_specifier_count("trailing %"), 0);
    }
}
