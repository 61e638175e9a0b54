//! Lexical analysis: strips comments and whitespace from Jack source and
//! produces a fixed, randomly addressable token buffer with a cursor.
//!
//! Cleaning is line oriented. A `//` or `/*` marker that falls strictly
//! inside a quoted span on its line is not a comment. A `/*` (or `/**`)
//! with no closer on its line swallows whole lines until the closing `*/`,
//! keeping the remainder of that line.

use crate::error::{CompileError, CompileResult};

pub const KEYWORDS: [&str; 21] = [
    "class",
    "constructor",
    "function",
    "method",
    "field",
    "static",
    "var",
    "int",
    "char",
    "boolean",
    "void",
    "true",
    "false",
    "null",
    "this",
    "let",
    "do",
    "if",
    "else",
    "while",
    "return",
];

pub const SYMBOLS: &str = "{}()[].,;+-*/&|<>=~^#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    Symbol,
    IntConst,
    StringConst,
    Identifier,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub line: u32,
}

impl Token {
    /// Classification is derived from the raw text on every call, not
    /// stored: keyword set, then symbol set, then digits, then quotes.
    pub fn token_type(&self) -> TokenType {
        if KEYWORDS.contains(&self.text.as_str()) {
            TokenType::Keyword
        } else if self.text.len() == 1 && SYMBOLS.contains(&self.text) {
            TokenType::Symbol
        } else if !self.text.is_empty() && self.text.bytes().all(|b| b.is_ascii_digit()) {
            TokenType::IntConst
        } else if self.text.len() >= 2 && self.text.starts_with('"') && self.text.ends_with('"') {
            TokenType::StringConst
        } else {
            TokenType::Identifier
        }
    }

    /// The text of a string constant without its surrounding quotes.
    pub fn string_value(&self) -> &str {
        &self.text[1..self.text.len() - 1]
    }
}

pub struct Lexer {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Lexer {
    pub fn new(source: &str) -> CompileResult<Self> {
        let mut lines: Vec<String> = source.lines().map(str::to_owned).collect();
        clean(&mut lines)?;

        let mut tokens = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            scan_line(line, (i + 1) as u32, &mut tokens)?;
        }
        Ok(Self { tokens, cursor: 0 })
    }

    pub fn has_more(&self) -> bool {
        self.cursor < self.tokens.len()
    }

    /// No-op once the cursor is past the last token.
    pub fn advance(&mut self) {
        if self.has_more() {
            self.cursor += 1;
        }
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    /// The token after the current one, without moving the cursor.
    pub fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.cursor + 1)
    }
}

/// True when `marker` falls strictly between an opening quote and its
/// matching closing quote on this line.
fn comment_in_string(line: &str, marker: usize) -> bool {
    let mut open: Option<usize> = None;
    for (idx, b) in line.bytes().enumerate() {
        if b != b'"' {
            continue;
        }
        match open {
            None => open = Some(idx),
            Some(start) => {
                if start < marker && marker < idx {
                    return true;
                }
                open = None;
            }
        }
    }
    false
}

fn strip_line_comment(line: &mut String) {
    let mut search = 0;
    while let Some(rel) = line[search..].find("//") {
        let pos = search + rel;
        if comment_in_string(line, pos) {
            search = pos + 1;
        } else {
            line.truncate(pos);
            break;
        }
    }
}

/// Removes block comments that open on line `i`. A comment without a closer
/// on its line blanks the following lines until `*/`; scanning then resumes
/// on the closing line, which may open another comment.
fn strip_block_comments(lines: &mut [String], mut i: usize) -> CompileResult<()> {
    let mut search = 0;
    loop {
        let start = match lines[i][search..].find("/*") {
            Some(rel) => search + rel,
            None => return Ok(()),
        };
        if comment_in_string(&lines[i], start) {
            search = start + 1;
            continue;
        }
        if let Some(rel) = lines[i][start + 1..].find("*/") {
            let end = start + 1 + rel;
            let tail = lines[i][end + 2..].to_string();
            lines[i].truncate(start);
            lines[i].push_str(&tail);
            search = 0;
        } else {
            let opener_line = (i + 1) as u32;
            lines[i].truncate(start);
            let mut j = i + 1;
            loop {
                if j >= lines.len() {
                    return Err(CompileError::UnterminatedComment { line: opener_line });
                }
                if let Some(rel) = lines[j].find("*/") {
                    lines[j] = lines[j][rel + 2..].to_string();
                    break;
                }
                lines[j].clear();
                j += 1;
            }
            i = j;
            search = 0;
        }
    }
}

fn clean(lines: &mut [String]) -> CompileResult<()> {
    for i in 0..lines.len() {
        lines[i] = lines[i].trim().to_string();
        strip_line_comment(&mut lines[i]);
        strip_block_comments(lines, i)?;
        lines[i] = lines[i].trim().to_string();
    }
    Ok(())
}

/// Splits one cleaned line into lexemes. Category priority: quoted span,
/// word run, single symbol. The quoted span runs to the *last* quote on the
/// line, so two string literals on one line mis-tokenize as one spanning
/// literal; this mirrors the original language tooling and downstream
/// consumers depend on it, so it is kept rather than fixed.
fn scan_line(line: &str, line_no: u32, tokens: &mut Vec<Token>) -> CompileResult<()> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c == b'"' {
            match line[i + 1..].rfind('"') {
                Some(rel) => {
                    let end = i + 1 + rel;
                    tokens.push(Token {
                        text: line[i..=end].to_string(),
                        line: line_no,
                    });
                    i = end + 1;
                }
                None => return Err(CompileError::UnterminatedString { line: line_no }),
            }
        } else if c.is_ascii_alphanumeric() || c == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token {
                text: line[start..i].to_string(),
                line: line_no,
            });
        } else if SYMBOLS.contains(c as char) {
            tokens.push(Token {
                text: (c as char).to_string(),
                line: line_no,
            });
            i += 1;
        } else {
            let ch = line[i..].chars().next().unwrap_or('\0');
            return Err(CompileError::StrayCharacter { ch, line: line_no });
        }
    }
    Ok(())
}
