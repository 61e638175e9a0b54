//! Formats abstract VM operations into the instruction set's textual
//! syntax, one newline-terminated line per instruction, streamed straight
//! to the output.

use std::io::Write;

use snafu::ResultExt;

use crate::error::{CompileResult, IoSnafu};

/// The eight addressable segments of the target stack machine. The
/// spellings below are the wire contract with the downstream translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

/// Arithmetic and logical mnemonics, including the two shift extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    ShiftLeft,
    ShiftRight,
}

impl Command {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Command::Add => "add",
            Command::Sub => "sub",
            Command::Neg => "neg",
            Command::Eq => "eq",
            Command::Gt => "gt",
            Command::Lt => "lt",
            Command::And => "and",
            Command::Or => "or",
            Command::Not => "not",
            Command::ShiftLeft => "shiftleft",
            Command::ShiftRight => "shiftright",
        }
    }
}

pub struct VmWriter<W: Write> {
    out: W,
}

impl<W: Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn emit_push(&mut self, segment: Segment, index: u16) -> CompileResult<()> {
        writeln!(self.out, "push {} {}", segment.as_str(), index).context(IoSnafu)
    }

    pub fn emit_pop(&mut self, segment: Segment, index: u16) -> CompileResult<()> {
        writeln!(self.out, "pop {} {}", segment.as_str(), index).context(IoSnafu)
    }

    pub fn emit_arithmetic(&mut self, command: Command) -> CompileResult<()> {
        writeln!(self.out, "{}", command.mnemonic()).context(IoSnafu)
    }

    pub fn emit_label(&mut self, label: &str) -> CompileResult<()> {
        writeln!(self.out, "label {label}").context(IoSnafu)
    }

    pub fn emit_goto(&mut self, label: &str) -> CompileResult<()> {
        writeln!(self.out, "goto {label}").context(IoSnafu)
    }

    /// Branch taken when the top of the stack is false: the engine only
    /// ever branches on condition-is-false, so the negation lives here.
    pub fn emit_if_goto(&mut self, label: &str) -> CompileResult<()> {
        self.emit_arithmetic(Command::Not)?;
        writeln!(self.out, "if-goto {label}").context(IoSnafu)
    }

    pub fn emit_call(&mut self, name: &str, n_args: u16) -> CompileResult<()> {
        writeln!(self.out, "call {name} {n_args}").context(IoSnafu)
    }

    pub fn emit_function(&mut self, name: &str, n_locals: u16) -> CompileResult<()> {
        writeln!(self.out, "function {name} {n_locals}").context(IoSnafu)
    }

    pub fn emit_return(&mut self) -> CompileResult<()> {
        writeln!(self.out, "return").context(IoSnafu)
    }
}
