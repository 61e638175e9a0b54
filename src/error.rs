//! Shared error type for the whole pipeline.
//!
//! Lexical and structural problems carry the 1-based source line they were
//! detected on. The compiler has no recovery: the first error aborts the
//! current compilation unit and its output is discarded by the driver.

use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    #[snafu(display("line {line}: unterminated string literal"))]
    UnterminatedString { line: u32 },

    #[snafu(display("line {line}: block comment is never closed"))]
    UnterminatedComment { line: u32 },

    #[snafu(display("line {line}: stray character '{ch}'"))]
    StrayCharacter { ch: char, line: u32 },

    #[snafu(display("line {line}: expected {expected}, found '{found}'"))]
    UnexpectedToken {
        expected: String,
        found: String,
        line: u32,
    },

    #[snafu(display("unexpected end of input"))]
    UnexpectedEof,

    #[snafu(display("line {line}: undeclared variable '{name}'"))]
    UndeclaredVariable { name: String, line: u32 },

    #[snafu(display("line {line}: integer constant '{text}' out of range"))]
    IntOutOfRange { text: String, line: u32 },

    #[snafu(display("failed to write output: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("{}: {source}", path.display()))]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{}: {source}", path.display()))]
    Unit {
        path: PathBuf,
        #[snafu(source(from(CompileError, Box::new)))]
        source: Box<CompileError>,
    },

    #[snafu(display("usage: jackc <file.jack | directory>"))]
    Usage,
}
