//! Record extraction from textual SQL dumps.
//!
//! The dump is never executed or loaded into a database. It is split into
//! statements, the `INSERT INTO` statements for the two known tables are
//! located, and their `VALUES` tuple lists are tokenized with a quote-aware
//! scanner, so commas, parentheses and `),` inside string literals never shift
//! field positions.
//!
//! Only the first record is read. The identifier handed to [`extract_record`]
//! is not used for lookup: exports are produced one journal at a time, and the
//! first journals tuple is the record. A differing identifier is logged.

use log::{debug, warn};

use crate::config::DumpLayout;
use crate::error::ExtractionError;
use crate::model::DumpRecord;

/// Pull the journal record and its tracked attributes out of `dump`.
pub fn extract_record(
    dump: &str,
    identifier: &str,
    layout: &DumpLayout,
) -> Result<DumpRecord, ExtractionError> {
    let journals = insert_rows(dump, &layout.journals_table)?;
    let first = &journals[0];
    if first.len() < layout.journals_width() {
        return Err(ExtractionError::FieldCountMismatch {
            table: layout.journals_table.clone(),
            row: 0,
            expected: layout.journals_width(),
            found: first.len(),
        });
    }
    if journals.len() > 1 {
        debug!(
            "`{}` has {} rows; using the first",
            layout.journals_table,
            journals.len()
        );
    }

    let mut record = DumpRecord {
        identifier: first[layout.identifier_position].clone(),
        title: first[layout.title_position].clone(),
        ..Default::default()
    };
    for (name, value) in [("identifier", &record.identifier), ("title", &record.title)] {
        if value.trim().is_empty() {
            return Err(ExtractionError::MalformedRow {
                table: layout.journals_table.clone(),
                reason: format!("{name} is NULL or empty"),
            });
        }
    }

    if !identifier.trim().is_empty() && record.identifier.trim() != identifier.trim() {
        warn!(
            "dump record identifier '{}' differs from requested '{}'",
            record.identifier, identifier
        );
    }

    let attributes = insert_rows(dump, &layout.attributes_table)?;
    for (i, row) in attributes.iter().enumerate() {
        if row.len() < layout.attributes_width() {
            return Err(ExtractionError::FieldCountMismatch {
                table: layout.attributes_table.clone(),
                row: i,
                expected: layout.attributes_width(),
                found: row.len(),
            });
        }
        let key = row[layout.attribute_key_position].trim();
        let value = row[layout.attribute_value_position].clone();
        if record.set_attribute(key, value) {
            debug!("attribute {key} picked up from row {i}");
        }
    }

    Ok(record)
}

/// Tuples of the first `INSERT INTO <table>` statement, quotes stripped.
///
/// `NULL` literals come back as empty strings. Quoted literal bodies are kept
/// verbatim, escape sequences included.
pub fn insert_rows(dump: &str, table: &str) -> Result<Vec<Vec<String>>, ExtractionError> {
    for stmt in split_statements(dump) {
        let Some(rest) = insert_target(stmt, table) else {
            continue;
        };
        let body = values_body(rest).ok_or_else(|| ExtractionError::MarkerNotFound {
            table: table.to_string(),
        })?;
        return parse_tuples(body).map_err(|reason| ExtractionError::MalformedRow {
            table: table.to_string(),
            reason,
        });
    }
    Err(ExtractionError::MarkerNotFound {
        table: table.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Statement splitting
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Quoted(u8),
    LineComment,
    BlockComment,
}

/// Split on `;` outside quotes and comments. An unterminated statement at
/// the end of input is returned as-is.
fn split_statements(src: &str) -> Vec<&str> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut state = Lex::Code;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            Lex::Code => match b {
                b'\'' | b'"' | b'`' => state = Lex::Quoted(b),
                b'-' if bytes.get(i + 1) == Some(&b'-') => state = Lex::LineComment,
                b'#' => state = Lex::LineComment,
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                b';' => {
                    out.push(&src[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
            Lex::Quoted(q) => {
                if b == b'\\' && q != b'`' {
                    i += 1;
                } else if b == q {
                    state = Lex::Code;
                }
            }
            Lex::LineComment => {
                if b == b'\n' {
                    state = Lex::Code;
                }
            }
            Lex::BlockComment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = Lex::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    if !src[start..].trim().is_empty() {
        out.push(&src[start..]);
    }
    out
}

// ---------------------------------------------------------------------------
// Statement header
// ---------------------------------------------------------------------------

/// Skip whitespace and comments.
fn skip_trivia(mut s: &str) -> &str {
    loop {
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix("--").or_else(|| s.strip_prefix('#')) {
            s = rest.find('\n').map_or("", |nl| &rest[nl + 1..]);
        } else if let Some(rest) = s.strip_prefix("/*") {
            s = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            return s;
        }
    }
}

fn read_word(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    (&s[..end], &s[end..])
}

/// Read one identifier segment: `` `name` ``, `"name"` or a bare word.
fn read_ident(s: &str) -> Option<(&str, &str)> {
    match s.as_bytes().first()? {
        q @ (b'`' | b'"') => {
            let close = s[1..].find(*q as char)? + 1;
            Some((&s[1..close], &s[close + 1..]))
        }
        _ => {
            let (word, rest) = read_word(s);
            (!word.is_empty()).then_some((word, rest))
        }
    }
}

/// If `stmt` is an insert into `table`, return the text after the table reference.
fn insert_target<'a>(stmt: &'a str, table: &str) -> Option<&'a str> {
    let s = skip_trivia(stmt);
    let (word, mut rest) = read_word(s);
    if !word.eq_ignore_ascii_case("INSERT") {
        return None;
    }

    // INSERT [LOW_PRIORITY | DELAYED | HIGH_PRIORITY] [IGNORE] INTO
    let mut found_into = false;
    for _ in 0..3 {
        let (word, after) = read_word(rest.trim_start());
        rest = after;
        if word.eq_ignore_ascii_case("INTO") {
            found_into = true;
            break;
        }
    }
    if !found_into {
        return None;
    }

    // schema.table, last segment is the table
    let (mut name, mut after) = read_ident(rest.trim_start())?;
    while let Some(next) = after.strip_prefix('.') {
        let (seg, a) = read_ident(next)?;
        name = seg;
        after = a;
    }

    name.eq_ignore_ascii_case(table).then_some(after)
}

/// Skip an optional column list and return the text after `VALUES`.
fn values_body(rest: &str) -> Option<&str> {
    let mut s = skip_trivia(rest);
    if s.starts_with('(') {
        let close = matching_paren(s)?;
        s = skip_trivia(&s[close + 1..]);
    }
    let (word, after) = read_word(s);
    if word.eq_ignore_ascii_case("VALUES") || word.eq_ignore_ascii_case("VALUE") {
        Some(after)
    } else {
        None
    }
}

fn matching_paren(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' && q != b'`' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Tuple tokenizer
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn describe(&self) -> String {
        match self.src[self.pos..].chars().next() {
            Some(c) => format!("'{c}' at offset {}", self.pos),
            None => "end of input".into(),
        }
    }

    fn quoted(&mut self, quote: u8) -> Result<String, String> {
        let start = self.pos + 1;
        let bytes = self.src.as_bytes();
        let mut i = start;
        while i < bytes.len() {
            let b = bytes[i];
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote {
                // doubled quote is an escaped quote
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                    continue;
                }
                self.pos = i + 1;
                return Ok(self.src[start..i].to_string());
            }
            i += 1;
        }
        Err(format!("unterminated quoted value starting at offset {}", self.pos))
    }

    fn bare(&mut self) -> Result<String, String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b',' || b == b')' {
                break;
            }
            if b == b'(' || b == b'\'' || b == b'"' {
                return Err(format!("unexpected {}", self.describe()));
            }
            self.pos += 1;
        }
        let word = self.src[start..self.pos].trim();
        if word.is_empty() {
            return Err(format!("empty value at offset {start}"));
        }
        if word.eq_ignore_ascii_case("NULL") {
            Ok(String::new())
        } else {
            Ok(word.to_string())
        }
    }

    fn value(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(q @ (b'\'' | b'"')) => self.quoted(q),
            Some(_) => self.bare(),
            None => Err("unexpected end of input inside row".into()),
        }
    }

    fn tuple(&mut self) -> Result<Vec<String>, String> {
        if self.peek() != Some(b'(') {
            return Err(format!("expected '(' but found {}", self.describe()));
        }
        self.pos += 1;

        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            fields.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(fields);
                }
                _ => return Err(format!("expected ',' or ')' but found {}", self.describe())),
            }
        }
    }
}

/// Parse `(a, 'b', ...), (c, ...)` into rows of field strings.
fn parse_tuples(body: &str) -> Result<Vec<Vec<String>>, String> {
    let mut cur = Cursor::new(body);
    let mut rows = Vec::new();

    loop {
        cur.skip_ws();
        if cur.peek().is_none() {
            break;
        }
        rows.push(cur.tuple()?);
        cur.skip_ws();
        match cur.peek() {
            Some(b',') => cur.pos += 1,
            None => break,
            _ => return Err(format!("expected ',' between rows but found {}", cur.describe())),
        }
    }

    if rows.is_empty() {
        return Err("insert statement has no rows".into());
    }
    Ok(rows)
}
