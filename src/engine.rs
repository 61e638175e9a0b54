//! The compilation engine: a recursive-descent parser that emits VM
//! instructions as it goes. One routine per grammar production; each
//! consumes exactly its own tokens and leaves the cursor on the first
//! token of the next production. No syntax tree is built.

use std::io::Write;

use crate::error::{CompileError, CompileResult};
use crate::lexer::{Lexer, Token, TokenType};
use crate::symbol_table::{Kind, SymbolTable};
use crate::vm_writer::{Command, Segment, VmWriter};

const BINARY_OPERATORS: &str = "+-*/&|<>=";
const UNARY_OPERATORS: &str = "-~^#";
const KEYWORD_CONSTANTS: [&str; 4] = ["true", "false", "null", "this"];

/// Hands out `IF_FALSE{n}`/`IF_END{n}` and `WHILE_EXP{n}`/`WHILE_END{n}`
/// label pairs. The driver owns one allocator per run and lends it to each
/// engine, so label numbers keep increasing across every class compiled in
/// that run and are never reused.
#[derive(Default)]
pub struct LabelAllocator {
    if_count: u32,
    while_count: u32,
}

impl LabelAllocator {
    pub fn if_labels(&mut self) -> (String, String) {
        let n = self.if_count;
        self.if_count += 1;
        (format!("IF_FALSE{n}"), format!("IF_END{n}"))
    }

    pub fn while_labels(&mut self) -> (String, String) {
        let n = self.while_count;
        self.while_count += 1;
        (format!("WHILE_EXP{n}"), format!("WHILE_END{n}"))
    }
}

/// Compile one Jack class from `source`, streaming VM instructions to
/// `out`. A failed unit may have written partial output; the caller is
/// expected to discard it.
pub fn compile<W: Write>(
    source: &str,
    labels: &mut LabelAllocator,
    out: W,
) -> CompileResult<()> {
    let lexer = Lexer::new(source)?;
    CompilationEngine::new(lexer, labels, out).compile_class()
}

pub struct CompilationEngine<'a, W: Write> {
    lexer: Lexer,
    table: SymbolTable,
    writer: VmWriter<W>,
    labels: &'a mut LabelAllocator,
}

impl<'a, W: Write> CompilationEngine<'a, W> {
    pub fn new(lexer: Lexer, labels: &'a mut LabelAllocator, out: W) -> Self {
        Self {
            lexer,
            table: SymbolTable::new(),
            writer: VmWriter::new(out),
            labels,
        }
    }

    pub fn compile_class(&mut self) -> CompileResult<()> {
        self.expect("class")?;
        let name = self.take_identifier()?;
        self.table.begin_class(&name.text);
        self.expect("{")?;
        while self.keyword_is("static") || self.keyword_is("field") {
            self.compile_var_dec()?;
        }
        while !self.symbol_is("}") {
            self.compile_subroutine()?;
        }
        self.expect("}")
    }

    /// classVarDec and varDec share one shape; the leading keyword decides
    /// the storage kind, and with it the scope the names land in.
    fn compile_var_dec(&mut self) -> CompileResult<()> {
        let kind_tok = self.take()?;
        let kind = match kind_tok.text.as_str() {
            "static" => Kind::Static,
            "field" => Kind::Field,
            "var" => Kind::Var,
            _ => {
                return Err(CompileError::UnexpectedToken {
                    expected: "'static', 'field' or 'var'".to_string(),
                    found: kind_tok.text,
                    line: kind_tok.line,
                })
            }
        };
        let type_name = self.take_type()?;
        let name = self.take_identifier()?;
        self.table.define(&name.text, &type_name, kind);
        while !self.symbol_is(";") {
            self.expect(",")?;
            let name = self.take_identifier()?;
            self.table.define(&name.text, &type_name, kind);
        }
        self.expect(";")
    }

    fn compile_subroutine(&mut self) -> CompileResult<()> {
        self.table.begin_subroutine();
        let class_name = self.table.class_name().to_string();

        let kind_tok = self.take()?;
        match kind_tok.text.as_str() {
            "constructor" | "function" | "method" => {}
            _ => {
                return Err(CompileError::UnexpectedToken {
                    expected: "'constructor', 'function' or 'method'".to_string(),
                    found: kind_tok.text,
                    line: kind_tok.line,
                })
            }
        }
        // The receiver goes in before user parameters, so they start at
        // argument index 1.
        if kind_tok.text == "method" {
            self.table.define("this", &class_name, Kind::Arg);
        }
        let _return_type = self.take_type()?;
        let name = self.take_identifier()?;
        let qualified = format!("{class_name}.{}", name.text);

        self.expect("(")?;
        self.compile_parameter_list()?;
        self.expect(")")?;

        self.expect("{")?;
        while self.keyword_is("var") {
            self.compile_var_dec()?;
        }
        let n_locals = self.table.count(Kind::Var);
        self.writer.emit_function(&qualified, n_locals)?;
        match kind_tok.text.as_str() {
            "constructor" => {
                self.writer
                    .emit_push(Segment::Constant, self.table.count(Kind::Field))?;
                self.writer.emit_call("Memory.alloc", 1)?;
                self.writer.emit_pop(Segment::Pointer, 0)?;
            }
            "method" => {
                self.writer.emit_push(Segment::Argument, 0)?;
                self.writer.emit_pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }
        self.compile_statements()?;
        self.expect("}")
    }

    fn compile_parameter_list(&mut self) -> CompileResult<()> {
        let mut first = true;
        while !self.symbol_is(")") {
            if !first {
                self.expect(",")?;
            }
            let type_name = self.take_type()?;
            let name = self.take_identifier()?;
            self.table.define(&name.text, &type_name, Kind::Arg);
            first = false;
        }
        Ok(())
    }

    fn compile_statements(&mut self) -> CompileResult<()> {
        while !self.symbol_is("}") {
            let leading = self.current()?.text.clone();
            match leading.as_str() {
                "let" => self.compile_let()?,
                "if" => self.compile_if()?,
                "while" => self.compile_while()?,
                "do" => self.compile_do()?,
                "return" => self.compile_return()?,
                _ => return Err(self.unexpected("a statement")),
            }
        }
        Ok(())
    }

    fn compile_let(&mut self) -> CompileResult<()> {
        self.expect("let")?;
        let name = self.take_identifier()?;
        let (segment, index) = self.resolve_variable(&name)?;
        if self.symbol_is("[") {
            // Target address first: an array-reading right-hand side would
            // clobber pointer 1, so the address waits on the stack and the
            // value is staged through temp 0.
            self.expect("[")?;
            self.compile_expression()?;
            self.expect("]")?;
            self.expect("=")?;
            self.writer.emit_push(segment, index)?;
            self.writer.emit_arithmetic(Command::Add)?;
            self.compile_expression()?;
            self.writer.emit_pop(Segment::Temp, 0)?;
            self.writer.emit_pop(Segment::Pointer, 1)?;
            self.writer.emit_push(Segment::Temp, 0)?;
            self.writer.emit_pop(Segment::That, 0)?;
        } else {
            self.expect("=")?;
            self.compile_expression()?;
            self.writer.emit_pop(segment, index)?;
        }
        self.expect(";")
    }

    fn compile_if(&mut self) -> CompileResult<()> {
        let (false_label, end_label) = self.labels.if_labels();
        self.expect("if")?;
        self.expect("(")?;
        self.compile_expression()?;
        self.expect(")")?;
        self.expect("{")?;
        self.writer.emit_if_goto(&false_label)?;
        self.compile_statements()?;
        self.expect("}")?;
        self.writer.emit_goto(&end_label)?;
        self.writer.emit_label(&false_label)?;
        if self.keyword_is("else") {
            self.expect("else")?;
            self.expect("{")?;
            self.compile_statements()?;
            self.expect("}")?;
        }
        self.writer.emit_label(&end_label)
    }

    fn compile_while(&mut self) -> CompileResult<()> {
        let (top_label, end_label) = self.labels.while_labels();
        self.expect("while")?;
        self.expect("(")?;
        self.writer.emit_label(&top_label)?;
        self.compile_expression()?;
        self.expect(")")?;
        self.expect("{")?;
        self.writer.emit_if_goto(&end_label)?;
        self.compile_statements()?;
        self.expect("}")?;
        self.writer.emit_goto(&top_label)?;
        self.writer.emit_label(&end_label)
    }

    fn compile_do(&mut self) -> CompileResult<()> {
        self.expect("do")?;
        self.compile_term()?;
        // The called routine always returns a value; discard it.
        self.writer.emit_pop(Segment::Temp, 0)?;
        self.expect(";")
    }

    fn compile_return(&mut self) -> CompileResult<()> {
        self.expect("return")?;
        if self.symbol_is(";") {
            self.writer.emit_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.writer.emit_return()?;
        self.expect(";")
    }

    /// term (op term)*, applied strictly left to right. There is no
    /// operator precedence in this language; regrouping here would change
    /// program meaning.
    fn compile_expression(&mut self) -> CompileResult<()> {
        self.compile_term()?;
        while self.at_binary_operator() && self.next_starts_term() {
            let op = self.take()?;
            self.compile_term()?;
            self.emit_binary_operator(&op.text)?;
        }
        Ok(())
    }

    fn at_binary_operator(&self) -> bool {
        self.lexer.current().map_or(false, |tok| {
            tok.token_type() == TokenType::Symbol && BINARY_OPERATORS.contains(&tok.text)
        })
    }

    /// One-token lookahead past a candidate operator: only consume it when
    /// a term can actually follow.
    fn next_starts_term(&self) -> bool {
        match self.lexer.peek_next() {
            None => false,
            Some(tok) => match tok.token_type() {
                TokenType::IntConst | TokenType::StringConst | TokenType::Identifier => true,
                TokenType::Keyword => KEYWORD_CONSTANTS.contains(&tok.text.as_str()),
                TokenType::Symbol => tok.text == "(" || UNARY_OPERATORS.contains(&tok.text),
            },
        }
    }

    fn emit_binary_operator(&mut self, op: &str) -> CompileResult<()> {
        match op {
            "+" => self.writer.emit_arithmetic(Command::Add),
            "-" => self.writer.emit_arithmetic(Command::Sub),
            "&" => self.writer.emit_arithmetic(Command::And),
            "|" => self.writer.emit_arithmetic(Command::Or),
            "<" => self.writer.emit_arithmetic(Command::Lt),
            ">" => self.writer.emit_arithmetic(Command::Gt),
            "=" => self.writer.emit_arithmetic(Command::Eq),
            // Not native machine operations; the OS provides them.
            "*" => self.writer.emit_call("Math.multiply", 2),
            "/" => self.writer.emit_call("Math.divide", 2),
            _ => unreachable!("binary operator"),
        }
    }

    fn compile_term(&mut self) -> CompileResult<()> {
        let tok = self.current()?.clone();
        match tok.token_type() {
            TokenType::IntConst => {
                self.advance();
                let value = tok.text.parse::<u16>().map_err(|_| {
                    CompileError::IntOutOfRange {
                        text: tok.text.clone(),
                        line: tok.line,
                    }
                })?;
                self.writer.emit_push(Segment::Constant, value)
            }
            TokenType::StringConst => {
                self.advance();
                self.compile_string_constant(tok.string_value())
            }
            TokenType::Keyword => match tok.text.as_str() {
                "true" => {
                    self.advance();
                    self.writer.emit_push(Segment::Constant, 0)?;
                    self.writer.emit_arithmetic(Command::Not)
                }
                "false" | "null" => {
                    self.advance();
                    self.writer.emit_push(Segment::Constant, 0)
                }
                "this" => {
                    self.advance();
                    self.writer.emit_push(Segment::Pointer, 0)
                }
                _ => Err(self.unexpected("a term")),
            },
            TokenType::Identifier => {
                self.advance();
                self.compile_identifier_term(tok)
            }
            TokenType::Symbol => match tok.text.as_str() {
                "(" => {
                    self.advance();
                    self.compile_expression()?;
                    self.expect(")")
                }
                "-" | "~" | "^" | "#" => {
                    self.advance();
                    self.compile_term()?;
                    let command = match tok.text.as_str() {
                        "-" => Command::Neg,
                        "~" => Command::Not,
                        "^" => Command::ShiftLeft,
                        _ => Command::ShiftRight,
                    };
                    self.writer.emit_arithmetic(command)
                }
                _ => Err(self.unexpected("a term")),
            },
        }
    }

    /// A fresh string object sized to the literal, then one append call per
    /// character in source order.
    fn compile_string_constant(&mut self, value: &str) -> CompileResult<()> {
        self.writer
            .emit_push(Segment::Constant, value.len() as u16)?;
        self.writer.emit_call("String.new", 1)?;
        for ch in value.chars() {
            self.writer.emit_push(Segment::Constant, ch as u16)?;
            self.writer.emit_call("String.appendChar", 2)?;
        }
        Ok(())
    }

    /// One token of lookahead splits an identifier term into a plain
    /// variable, an indexed access, a qualified call, or an unqualified
    /// call on the current receiver.
    fn compile_identifier_term(&mut self, name: Token) -> CompileResult<()> {
        if self.symbol_is("[") {
            let (segment, index) = self.resolve_variable(&name)?;
            self.expect("[")?;
            self.compile_expression()?;
            self.expect("]")?;
            self.writer.emit_push(segment, index)?;
            self.writer.emit_arithmetic(Command::Add)?;
            self.writer.emit_pop(Segment::Pointer, 1)?;
            self.writer.emit_push(Segment::That, 0)
        } else if self.symbol_is(".") {
            self.compile_qualified_call(name)
        } else if self.symbol_is("(") {
            self.compile_receiver_call(name)
        } else {
            let (segment, index) = self.resolve_variable(&name)?;
            self.writer.emit_push(segment, index)
        }
    }

    /// `x.m(...)`: when `x` is a known variable it becomes the implicit
    /// first argument and the target class is its declared type; otherwise
    /// `x` itself is the class and no receiver is pushed.
    fn compile_qualified_call(&mut self, qualifier: Token) -> CompileResult<()> {
        self.expect(".")?;
        let (target_class, mut n_args) = match self.table.type_of(&qualifier.text) {
            Some(type_name) => {
                let type_name = type_name.to_string();
                let (segment, index) = self.resolve_variable(&qualifier)?;
                self.writer.emit_push(segment, index)?;
                (type_name, 1)
            }
            None => (qualifier.text.clone(), 0),
        };
        let subroutine = self.take_identifier()?;
        self.expect("(")?;
        n_args += self.compile_expression_list()?;
        self.expect(")")?;
        self.writer
            .emit_call(&format!("{target_class}.{}", subroutine.text), n_args)
    }

    /// `m(...)`: the current receiver is pushed as argument 0 and the call
    /// resolves under the enclosing class.
    fn compile_receiver_call(&mut self, name: Token) -> CompileResult<()> {
        self.expect("(")?;
        self.writer.emit_push(Segment::Pointer, 0)?;
        let target = format!("{}.{}", self.table.class_name(), name.text);
        let n_args = self.compile_expression_list()? + 1;
        self.expect(")")?;
        self.writer.emit_call(&target, n_args)
    }

    /// Returns the number of expressions compiled, for call arity.
    fn compile_expression_list(&mut self) -> CompileResult<u16> {
        let mut count = 0;
        let mut first = true;
        while !self.symbol_is(")") {
            if !first {
                self.expect(",")?;
            }
            self.compile_expression()?;
            count += 1;
            first = false;
        }
        Ok(count)
    }

    fn resolve_variable(&self, name: &Token) -> CompileResult<(Segment, u16)> {
        match (self.table.kind_of(&name.text), self.table.index_of(&name.text)) {
            (Some(kind), Some(index)) => Ok((kind.segment(), index)),
            _ => Err(CompileError::UndeclaredVariable {
                name: name.text.clone(),
                line: name.line,
            }),
        }
    }

    fn current(&self) -> CompileResult<&Token> {
        self.lexer.current().ok_or(CompileError::UnexpectedEof)
    }

    fn advance(&mut self) {
        self.lexer.advance();
    }

    fn take(&mut self) -> CompileResult<Token> {
        let tok = self.current()?.clone();
        self.advance();
        Ok(tok)
    }

    fn take_identifier(&mut self) -> CompileResult<Token> {
        if self.current()?.token_type() != TokenType::Identifier {
            return Err(self.unexpected("an identifier"));
        }
        self.take()
    }

    /// A type is a keyword (int, char, boolean, void) or a class name.
    fn take_type(&mut self) -> CompileResult<String> {
        match self.current()?.token_type() {
            TokenType::Keyword | TokenType::Identifier => Ok(self.take()?.text),
            _ => Err(self.unexpected("a type name")),
        }
    }

    fn expect(&mut self, text: &str) -> CompileResult<()> {
        if self.current()?.text == text {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{text}'")))
        }
    }

    fn symbol_is(&self, text: &str) -> bool {
        self.lexer
            .current()
            .map_or(false, |tok| tok.token_type() == TokenType::Symbol && tok.text == text)
    }

    fn keyword_is(&self, text: &str) -> bool {
        self.lexer
            .current()
            .map_or(false, |tok| tok.token_type() == TokenType::Keyword && tok.text == text)
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        match self.lexer.current() {
            Some(tok) => CompileError::UnexpectedToken {
                expected: expected.to_string(),
                found: tok.text.clone(),
                line: tok.line,
            },
            None => CompileError::UnexpectedEof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_source(source: &str) -> String {
        let mut labels = LabelAllocator::default();
        let mut out = Vec::new();
        compile(source, &mut labels, &mut out).expect("compilation failed");
        String::from_utf8(out).unwrap()
    }

    fn vm(lines: &[&str]) -> String {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    #[test]
    fn expressions_evaluate_left_to_right_without_precedence() {
        let out = compile_source(
            "class Main { function int calc() { return 2 + 3 * 4; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Main.calc 0",
                "push constant 2",
                "push constant 3",
                "add",
                "push constant 4",
                "call Math.multiply 2",
                "return",
            ])
        );
    }

    #[test]
    fn division_is_a_library_call() {
        let out = compile_source("class Main { function int half(int n) { return n / 2; } }");
        assert_eq!(
            out,
            vm(&[
                "function Main.half 0",
                "push argument 0",
                "push constant 2",
                "call Math.divide 2",
                "return",
            ])
        );
    }

    #[test]
    fn method_threads_receiver_before_user_parameters() {
        let out = compile_source(
            "class Point { field int x; method int shifted(int dx, int dy) { return x + dx + dy; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Point.shifted 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "push argument 1",
                "add",
                "push argument 2",
                "add",
                "return",
            ])
        );
    }

    #[test]
    fn constructor_allocates_one_unit_per_field() {
        let out = compile_source(
            "class Pair { field int a, b; static int hits; constructor Pair new() { return this; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Pair.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push pointer 0",
                "return",
            ])
        );
    }

    #[test]
    fn plain_function_binds_no_receiver() {
        let out = compile_source("class Main { function void main() { return; } }");
        assert_eq!(
            out,
            vm(&["function Main.main 0", "push constant 0", "return"])
        );
    }

    #[test]
    fn indexed_let_stages_value_through_temp() {
        let out = compile_source(
            "class Arrays { function void move(Array a, Array b, int i, int j) { let a[i] = b[j]; return; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Arrays.move 0",
                "push argument 2",
                "push argument 0",
                "add",
                "push argument 3",
                "push argument 1",
                "add",
                "pop pointer 1",
                "push that 0",
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 0",
                "return",
            ])
        );
    }

    #[test]
    fn if_else_uses_one_numbered_label_pair() {
        let out = compile_source(
            "class Flow { function int max(int a, int b) { if (a > b) { return a; } else { return b; } } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Flow.max 0",
                "push argument 0",
                "push argument 1",
                "gt",
                "not",
                "if-goto IF_FALSE0",
                "push argument 0",
                "return",
                "goto IF_END0",
                "label IF_FALSE0",
                "push argument 1",
                "return",
                "label IF_END0",
            ])
        );
    }

    #[test]
    fn nested_ifs_get_distinct_increasing_labels() {
        let out = compile_source(
            "class Flow { function void f(int a) { if (a) { if (a) { return; } } if (a) { return; } return; } }",
        );
        // Outer if is numbered first, the nested one next, the sibling last.
        assert!(out.contains("if-goto IF_FALSE0"));
        assert!(out.contains("if-goto IF_FALSE1"));
        assert!(out.contains("if-goto IF_FALSE2"));
        let first_end = out.find("label IF_END1").unwrap();
        let outer_end = out.find("label IF_END0").unwrap();
        assert!(first_end < outer_end, "nested if closes before outer");
    }

    #[test]
    fn while_loops_use_their_own_counter() {
        let out = compile_source(
            "class Flow { function void spin(int n) { while (n) { if (n) { let n = n - 1; } } while (n) { return; } return; } }",
        );
        assert!(out.contains("label WHILE_EXP0"));
        assert!(out.contains("label WHILE_END0"));
        assert!(out.contains("label WHILE_EXP1"));
        // The if inside the first loop still numbers from the if counter.
        assert!(out.contains("if-goto IF_FALSE0"));
    }

    #[test]
    fn label_numbers_keep_increasing_across_classes_in_one_run() {
        let mut labels = LabelAllocator::default();
        let source_a = "class A { function void f(int n) { if (n) { return; } while (n) { return; } return; } }";
        let source_b = "class B { function void g(int n) { if (n) { return; } while (n) { return; } return; } }";
        let mut first = Vec::new();
        compile(source_a, &mut labels, &mut first).unwrap();
        let mut second = Vec::new();
        compile(source_b, &mut labels, &mut second).unwrap();
        let second = String::from_utf8(second).unwrap();
        assert!(second.contains("if-goto IF_FALSE1"));
        assert!(second.contains("label WHILE_EXP1"));
        assert!(!second.contains("IF_FALSE0"));
    }

    #[test]
    fn do_discards_the_return_value() {
        let out = compile_source(
            "class Main { function void main() { do Output.printInt(7); return; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Main.main 0",
                "push constant 7",
                "call Output.printInt 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ])
        );
    }

    #[test]
    fn string_constants_build_then_append_in_source_order() {
        let out = compile_source(
            "class Main { function void main() { do Output.printString(\"Hi\"); return; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Main.main 0",
                "push constant 2",
                "call String.new 1",
                "push constant 72",
                "call String.appendChar 2",
                "push constant 105",
                "call String.appendChar 2",
                "call Output.printString 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ])
        );
    }

    #[test]
    fn keyword_constants() {
        let out = compile_source(
            "class Main { method void set(boolean b, Main o) { let b = true; let b = false; let o = null; let o = this; return; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Main.set 0",
                "push argument 0",
                "pop pointer 0",
                "push constant 0",
                "not",
                "pop argument 1",
                "push constant 0",
                "pop argument 1",
                "push constant 0",
                "pop argument 2",
                "push pointer 0",
                "pop argument 2",
                "push constant 0",
                "return",
            ])
        );
    }

    #[test]
    fn unary_operators_follow_their_operand() {
        let out = compile_source(
            "class Main { function int f(int x) { return -x + ~x + ^x + #x; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Main.f 0",
                "push argument 0",
                "neg",
                "push argument 0",
                "not",
                "add",
                "push argument 0",
                "shiftleft",
                "add",
                "push argument 0",
                "shiftright",
                "add",
                "return",
            ])
        );
    }

    #[test]
    fn trailing_unary_shaped_symbol_is_not_a_binary_operator() {
        // `-` before `)` has no following term, so the expression ends and
        // the parser reports the structural problem instead of consuming it.
        let err = {
            let mut labels = LabelAllocator::default();
            let mut out = Vec::new();
            compile(
                "class Main { function int f(int x) { return (x -); } }",
                &mut labels,
                &mut out,
            )
            .unwrap_err()
        };
        assert!(matches!(err, CompileError::UnexpectedToken { .. }));
    }

    #[test]
    fn qualified_call_on_variable_pushes_receiver_and_uses_its_type() {
        let out = compile_source(
            "class Game { field Square square; method void step() { do square.draw(1, 2); return; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Game.step 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "push constant 1",
                "push constant 2",
                "call Square.draw 3",
                "pop temp 0",
                "push constant 0",
                "return",
            ])
        );
    }

    #[test]
    fn qualified_call_on_unknown_name_is_a_class_call() {
        let out = compile_source(
            "class Main { function void main() { do Screen.clearScreen(); return; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Main.main 0",
                "call Screen.clearScreen 0",
                "pop temp 0",
                "push constant 0",
                "return",
            ])
        );
    }

    #[test]
    fn unqualified_call_targets_the_current_class_with_receiver() {
        let out = compile_source(
            "class Square { method void draw() { return; } method void redraw() { do draw(); return; } }",
        );
        assert!(out.contains("push pointer 0\ncall Square.draw 1\n"));
    }

    #[test]
    fn indexed_read_dereferences_through_that() {
        let out = compile_source(
            "class Main { function int get(Array a, int i) { return a[i]; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Main.get 0",
                "push argument 1",
                "push argument 0",
                "add",
                "pop pointer 1",
                "push that 0",
                "return",
            ])
        );
    }

    #[test]
    fn static_and_local_variables_use_their_segments() {
        let out = compile_source(
            "class Counter { static int total; function void bump() { var int t; let t = total; let total = t + 1; return; } }",
        );
        assert_eq!(
            out,
            vm(&[
                "function Counter.bump 1",
                "push static 0",
                "pop local 0",
                "push local 0",
                "push constant 1",
                "add",
                "pop static 0",
                "push constant 0",
                "return",
            ])
        );
    }

    #[test]
    fn undeclared_variable_is_rejected_with_position() {
        let mut labels = LabelAllocator::default();
        let mut out = Vec::new();
        let err = compile(
            "class Main {\n  function void main() {\n    let ghost = 1;\n    return;\n  }\n}",
            &mut labels,
            &mut out,
        )
        .unwrap_err();
        match err {
            CompileError::UndeclaredVariable { name, line } => {
                assert_eq!(name, "ghost");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_closing_token_fails_fast() {
        let mut labels = LabelAllocator::default();
        let mut out = Vec::new();
        let err = compile(
            "class Main { function void main() { return; }",
            &mut labels,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedEof));
    }
}
