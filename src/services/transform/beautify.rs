//! Pretty-printing for minified HTML, CSS and JS.
//!
//! Output is re-indented only. Tokens, string literals, comments, regex
//! literals and raw-text HTML elements pass through unchanged.

use std::borrow::Cow;

use crate::services::scanner::FileCategory;

const INDENT: &str = "  ";

/// A line longer than this marks a file as minified.
const MINIFIED_LINE_LEN: usize = 250;
/// So does an average non-blank line longer than this.
const MINIFIED_AVG_LINE_LEN: usize = 120;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea"];

/// Keywords after which a `/` starts a regex literal, not a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "void", "yield", "await", "delete",
    "throw", "new",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Html,
    Css,
    Js,
}

impl CodeKind {
    pub fn from_category(category: FileCategory) -> Option<Self> {
        match category {
            FileCategory::Html => Some(Self::Html),
            FileCategory::Css => Some(Self::Css),
            FileCategory::Js => Some(Self::Js),
            _ => None,
        }
    }
}

pub fn normalize_line_endings(content: &str) -> Cow<'_, str> {
    if content.contains('\r') {
        Cow::Owned(content.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

pub fn looks_minified(content: &str) -> bool {
    let mut lines = 0usize;
    let mut total = 0usize;
    let mut longest = 0usize;
    for line in content.lines() {
        let len = line.trim().chars().count();
        if len == 0 {
            continue;
        }
        lines += 1;
        total += len;
        longest = longest.max(len);
    }
    if lines == 0 {
        return false;
    }
    longest > MINIFIED_LINE_LEN || total / lines > MINIFIED_AVG_LINE_LEN
}

/// Reformat `content` if it looks minified; otherwise only normalize line
/// endings.
pub fn beautify(kind: CodeKind, content: &str) -> String {
    let content = normalize_line_endings(content);
    if !looks_minified(&content) {
        return content.into_owned();
    }
    match kind {
        CodeKind::Html => beautify_html(&content),
        CodeKind::Css => beautify_css(&content),
        CodeKind::Js => beautify_js(&content),
    }
}

// ─── Output writer ─────────────────────────────────────────────────

struct Writer {
    out: String,
    depth: usize,
    line_start: bool,
    pending_space: bool,
}

impl Writer {
    fn with_capacity(cap: usize) -> Self {
        Self {
            out: String::with_capacity(cap + cap / 4),
            depth: 0,
            line_start: true,
            pending_space: false,
        }
    }

    fn lead(&mut self) {
        if self.line_start {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.line_start = false;
        } else if self.pending_space {
            self.out.push(' ');
        }
        self.pending_space = false;
    }

    fn push(&mut self, c: char) {
        self.lead();
        self.out.push(c);
    }

    fn push_raw(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.lead();
        self.out.push_str(s);
    }

    fn space(&mut self) {
        if !self.line_start {
            self.pending_space = true;
        }
    }

    fn newline(&mut self) {
        if self.line_start {
            return;
        }
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
        self.out.push('\n');
        self.line_start = true;
        self.pending_space = false;
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(mut self) -> String {
        self.newline();
        self.out
    }
}

// ─── Scanning helpers ──────────────────────────────────────────────

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

/// End (exclusive) of the quoted literal opening at `start`.
fn scan_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            '\n' if quote != '`' => return i,
            _ => i += 1,
        }
    }
    chars.len()
}

fn scan_block_comment(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

fn scan_line_comment(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|c| *c == '\n')
        .map(|p| start + p)
        .unwrap_or(chars.len())
}

/// End of the regex literal opening at `start`, or `None` if the line ends
/// first.
fn scan_regex(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            '\n' => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from..].iter().copied().find(|c| !c.is_whitespace())
}

fn trailing_word(out: &str) -> &str {
    let start = out
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '$')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(out.len());
    &out[start..]
}

fn regex_allowed(prev: Option<char>, out: &str) -> bool {
    match prev {
        None => true,
        Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
        Some(c) if c.is_alphabetic() => REGEX_KEYWORDS.contains(&trailing_word(out)),
        _ => false,
    }
}

// ─── CSS ───────────────────────────────────────────────────────────

pub fn beautify_css(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut w = Writer::with_capacity(src.len());
    let mut parens = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let end = scan_string(&chars, i);
                w.push_raw(&collect(&chars[i..end]));
                i = end;
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = scan_block_comment(&chars, i);
                w.push_raw(&collect(&chars[i..end]));
                w.newline();
                i = end;
                continue;
            }
            '{' => {
                w.space();
                w.push('{');
                w.indent();
                w.newline();
            }
            '}' => {
                w.newline();
                w.dedent();
                w.push('}');
                w.newline();
            }
            ';' => {
                w.push(';');
                if parens == 0 {
                    w.newline();
                }
            }
            '(' => {
                parens += 1;
                w.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                w.push(c);
            }
            c if c.is_whitespace() => w.space(),
            _ => w.push(c),
        }
        i += 1;
    }
    w.finish()
}

// ─── JS ────────────────────────────────────────────────────────────

pub fn beautify_js(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut w = Writer::with_capacity(src.len());
    // Paren depth per open brace; a statement break only happens at depth 0.
    let mut parens: Vec<usize> = vec![0];
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '"' | '\'' | '`' => {
                let end = scan_string(&chars, i);
                w.push_raw(&collect(&chars[i..end]));
                prev = Some(c);
                i = end;
                continue;
            }
            '/' if next == Some('/') => {
                let end = scan_line_comment(&chars, i);
                w.push_raw(&collect(&chars[i..end]));
                w.newline();
                i = end;
                continue;
            }
            '/' if next == Some('*') => {
                let end = scan_block_comment(&chars, i);
                w.push_raw(&collect(&chars[i..end]));
                i = end;
                continue;
            }
            '/' if regex_allowed(prev, &w.out) => {
                if let Some(end) = scan_regex(&chars, i) {
                    w.push_raw(&collect(&chars[i..end]));
                    prev = Some('/');
                    i = end;
                    continue;
                }
                w.push(c);
            }
            '{' => {
                if !matches!(prev, None | Some('(') | Some('[') | Some('{')) {
                    w.space();
                }
                w.push('{');
                w.indent();
                parens.push(0);
                w.newline();
            }
            '}' => {
                w.newline();
                w.dedent();
                if parens.len() > 1 {
                    parens.pop();
                }
                w.push('}');
                if !matches!(
                    next_significant(&chars, i + 1),
                    Some(')') | Some(',') | Some(';') | Some('.') | Some(']')
                ) {
                    w.newline();
                }
            }
            ';' => {
                w.push(';');
                if parens.last().copied().unwrap_or(0) == 0 {
                    w.newline();
                }
            }
            '(' | '[' => {
                if let Some(depth) = parens.last_mut() {
                    *depth += 1;
                }
                w.push(c);
            }
            ')' | ']' => {
                if let Some(depth) = parens.last_mut() {
                    *depth = depth.saturating_sub(1);
                }
                w.push(c);
            }
            // Source line breaks may carry automatic semicolons.
            '\n' => w.newline(),
            c if c.is_whitespace() => w.space(),
            _ => w.push(c),
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
        i += 1;
    }
    w.finish()
}

// ─── HTML ──────────────────────────────────────────────────────────

/// Byte index just past the `>` closing the tag that opens at `start`.
fn tag_end(src: &str, start: usize) -> usize {
    let bytes = src.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
        i += 1;
    }
    bytes.len()
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn emit_text(w: &mut Writer, text: &str) {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return;
    }
    w.newline();
    w.push_raw(&collapsed);
    w.newline();
}

pub fn beautify_html(src: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with `src`.
    let lower = src.to_ascii_lowercase();
    let mut w = Writer::with_capacity(src.len());
    let mut pos = 0;

    while pos < src.len() {
        let Some(rel) = src[pos..].find('<') else {
            emit_text(&mut w, &src[pos..]);
            break;
        };
        let lt = pos + rel;
        emit_text(&mut w, &src[pos..lt]);

        if src[lt..].starts_with("<!--") {
            let end = src[lt..]
                .find("-->")
                .map(|e| lt + e + 3)
                .unwrap_or(src.len());
            w.newline();
            w.push_raw(&src[lt..end]);
            w.newline();
            pos = end;
            continue;
        }

        let end = tag_end(src, lt);
        let tag = &src[lt..end];
        let name = tag_name(tag);
        w.newline();

        if tag.starts_with("</") {
            w.dedent();
            w.push_raw(tag);
            w.newline();
            pos = end;
            continue;
        }

        w.push_raw(tag);
        let standalone = tag.ends_with("/>")
            || tag.starts_with("<!")
            || tag.starts_with("<?")
            || VOID_ELEMENTS.contains(&name.as_str());

        if !standalone && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let close = format!("</{name}");
            let close_at = lower[end..]
                .find(&close)
                .map(|c| end + c)
                .unwrap_or(src.len());
            w.push_raw(&src[end..close_at]);
            pos = if close_at < src.len() {
                let close_end = tag_end(src, close_at);
                w.push_raw(&src[close_at..close_end]);
                close_end
            } else {
                close_at
            };
            w.newline();
            continue;
        }

        if !standalone {
            w.indent();
        }
        w.newline();
        pos = end;
    }
    w.finish()
}

#[cfg(test)]
#[path = "tests/beautify_tests.rs"]
mod tests;
