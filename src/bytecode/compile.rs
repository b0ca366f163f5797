use tracing::debug;

use crate::{
    bytecode::{
        Chunk, OpCode,
        compile_error::{
            CompileError, CompileErrors, EXPECT_CLOSING_PAREN, EXPECT_END_OF_INPUT,
            EXPECT_EXPRESSION, INVALID_NUMBER, NESTED_TOO_DEEPLY, TOO_MANY_CONSTANTS,
        },
    },
    frontend::{
        scanner::Scanner,
        token::{Token, TokenKind},
    },
    lang::value::Value,
};

/// Deepest chain of nested prefix operands and groupings accepted.
pub const MAX_DEPTH: usize = 256;

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// One level tighter; `Primary` saturates.
    pub fn next(self) -> Self {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call | Primary => Primary,
        }
    }
}

pub type ParseFn = for<'src> fn(&mut Compiler<'src>);

/// Row of the rule table: how a token parses in prefix and infix position.
#[derive(Clone, Copy)]
pub struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl ParseRule {
    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn has_infix(&self) -> bool {
        self.infix.is_some()
    }
}

const RESERVED: ParseRule = ParseRule {
    prefix: None,
    infix: None,
    precedence: Precedence::None,
};

const fn prefix(f: ParseFn) -> ParseRule {
    ParseRule {
        prefix: Some(f),
        infix: None,
        precedence: Precedence::None,
    }
}

const fn infix(f: ParseFn, precedence: Precedence) -> ParseRule {
    ParseRule {
        prefix: None,
        infix: Some(f),
        precedence,
    }
}

const fn prefix_infix(p: ParseFn, i: ParseFn, precedence: Precedence) -> ParseRule {
    ParseRule {
        prefix: Some(p),
        infix: Some(i),
        precedence,
    }
}

/// Indexed by `TokenKind as usize`; rows follow the enum declaration order.
static RULES: [ParseRule; TokenKind::COUNT] = [
    prefix(grouping),                              // LeftParen
    RESERVED,                                      // RightParen
    RESERVED,                                      // LeftBrace
    RESERVED,                                      // RightBrace
    RESERVED,                                      // Comma
    RESERVED,                                      // Dot
    prefix_infix(unary, binary, Precedence::Term), // Minus
    infix(binary, Precedence::Term),               // Plus
    RESERVED,                                      // Semicolon
    infix(binary, Precedence::Factor),             // Slash
    infix(binary, Precedence::Factor),             // Star
    RESERVED,                                      // Bang
    RESERVED,                                      // BangEqual
    RESERVED,                                      // Equal
    RESERVED,                                      // EqualEqual
    RESERVED,                                      // Greater
    RESERVED,                                      // GreaterEqual
    RESERVED,                                      // Less
    RESERVED,                                      // LessEqual
    RESERVED,                                      // Identifier
    RESERVED,                                      // String
    prefix(number),                                // Number
    RESERVED,                                      // And
    RESERVED,                                      // Class
    RESERVED,                                      // Else
    RESERVED,                                      // False
    RESERVED,                                      // For
    RESERVED,                                      // Fun
    RESERVED,                                      // If
    RESERVED,                                      // Nil
    RESERVED,                                      // Or
    RESERVED,                                      // Print
    RESERVED,                                      // Return
    RESERVED,                                      // Super
    RESERVED,                                      // This
    RESERVED,                                      // True
    RESERVED,                                      // Var
    RESERVED,                                      // While
    RESERVED,                                      // Error
    RESERVED,                                      // EndOfInput
];

pub fn rule(kind: TokenKind) -> &'static ParseRule {
    &RULES[kind as usize]
}

/// Compile `source` into `chunk`.
///
/// On failure `chunk` keeps whatever was emitted before compilation finished
/// and the first reported diagnostic is returned.
pub fn compile(source: &str, chunk: &mut Chunk) -> Result<(), CompileErrors> {
    let mut compiler = Compiler::with_chunk(source, std::mem::take(chunk));
    compiler.expression_unit();
    let (built, outcome) = compiler.finish();
    *chunk = built;
    outcome
}

/// Single-pass Pratt parser that emits bytecode as it goes.
pub struct Compiler<'src> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,

    /// The chunk under construction
    chunk: Chunk,

    /// Active `parse_precedence` frames
    depth: usize,

    had_error: bool,
    panic_mode: bool,
    errors: Vec<CompileError>,
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_chunk(source, Chunk::new())
    }

    pub fn with_chunk(source: &'src str, chunk: Chunk) -> Self {
        Self {
            scanner: Scanner::new(source),
            previous: Token::empty(),
            current: Token::empty(),
            chunk,
            depth: 0,
            had_error: false,
            panic_mode: false,
            errors: Vec::new(),
        }
    }

    /// Compile one expression followed by end of input.
    pub fn expression_unit(&mut self) {
        self.advance();
        self.expression();
        self.emit_op(OpCode::Return, self.previous.line);
        self.consume(TokenKind::EndOfInput, EXPECT_END_OF_INPUT);

        // No synchronization point exists, so the rest of the input is
        // scanned with every further report suppressed.
        while self.current.kind != TokenKind::EndOfInput {
            self.advance();
        }
    }

    pub fn finish(self) -> (Chunk, Result<(), CompileErrors>) {
        if self.had_error {
            debug!(
                errors = self.errors.len(),
                bytes = self.chunk.len(),
                "compile failed"
            );
            let errors = CompileErrors {
                diagnostics: self.errors,
            };
            (self.chunk, Err(errors))
        } else {
            debug!(
                bytes = self.chunk.len(),
                constants = self.chunk.constants().len(),
                "compiled chunk"
            );
            (self.chunk, Ok(()))
        }
    }

    // Token stream

    fn advance(&mut self) {
        self.previous = self.current;

        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // Parsing

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, min: Precedence) {
        if self.depth >= MAX_DEPTH {
            self.error_at_current(NESTED_TOO_DEEPLY);
            return;
        }
        self.depth += 1;
        self.advance();

        match rule(self.previous.kind).prefix {
            Some(prefix_rule) => {
                prefix_rule(self);

                while min <= rule(self.current.kind).precedence {
                    self.advance();
                    if let Some(infix_rule) = rule(self.previous.kind).infix {
                        infix_rule(self);
                    }
                }
            }
            None => self.error(EXPECT_EXPRESSION),
        }

        self.depth -= 1;
    }

    // Emission

    fn emit_byte(&mut self, byte: u8, line: usize) {
        self.chunk.write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode, line: usize) {
        self.chunk.write_op(op, line);
    }

    fn emit_constant(&mut self, value: Value, line: usize) {
        let index = self.make_constant(value);
        self.emit_op(OpCode::Constant, line);
        self.emit_byte(index, line);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk.add_const(value) {
            Ok(index) => index,
            Err(_) => {
                self.error(TOO_MANY_CONSTANTS);
                0
            }
        }
    }

    // Diagnostics

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;

        let err = CompileError::at(&token, message);
        debug!(line = err.line, "{}", err);
        self.errors.push(err);
    }
}

// Rule handlers

fn grouping(c: &mut Compiler<'_>) {
    c.expression();
    c.consume(TokenKind::RightParen, EXPECT_CLOSING_PAREN);
}

fn number(c: &mut Compiler<'_>) {
    let token = c.previous;
    match token.lexeme.parse::<f64>() {
        Ok(n) => c.emit_constant(Value::Number(n), token.line),
        // the scanner only yields digit runs with an optional fraction
        Err(_) => c.error(INVALID_NUMBER),
    }
}

fn unary(c: &mut Compiler<'_>) {
    let operator = c.previous;

    c.parse_precedence(Precedence::Unary);

    if operator.kind == TokenKind::Minus {
        c.emit_op(OpCode::Negate, operator.line);
    }
}

fn binary(c: &mut Compiler<'_>) {
    let operator = c.previous;

    // right operand binds one level tighter: left associativity
    c.parse_precedence(rule(operator.kind).precedence.next());

    let op = match operator.kind {
        TokenKind::Plus => OpCode::Add,
        TokenKind::Minus => OpCode::Subtract,
        TokenKind::Star => OpCode::Multiply,
        TokenKind::Slash => OpCode::Divide,
        _ => return,
    };
    c.emit_op(op, operator.line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::chunk::MAX_CONSTANTS;

    const C: u8 = OpCode::Constant as u8;
    const ADD: u8 = OpCode::Add as u8;
    const SUB: u8 = OpCode::Subtract as u8;
    const MUL: u8 = OpCode::Multiply as u8;
    const DIV: u8 = OpCode::Divide as u8;
    const NEG: u8 = OpCode::Negate as u8;
    const RET: u8 = OpCode::Return as u8;

    fn compile_ok(source: &str) -> Chunk {
        let mut chunk = Chunk::new();
        compile(source, &mut chunk).expect("compilation should succeed");
        chunk
    }

    fn compile_err(source: &str) -> CompileErrors {
        let mut chunk = Chunk::new();
        match compile(source, &mut chunk) {
            Ok(()) => panic!("expected a compile error for {:?}, got {:?}", source, chunk),
            Err(e) => e,
        }
    }

    fn assert_code(source: &str, expected: &[u8]) {
        let chunk = compile_ok(source);
        assert_eq!(chunk.code(), expected, "code mismatch for {:?}", source);
    }

    fn assert_first_error(source: &str, expected: &str) {
        let errors = compile_err(source);
        assert_eq!(
            errors.diagnostics.len(),
            1,
            "panic mode should keep one diagnostic"
        );
        assert_eq!(errors.diagnostics[0].to_string(), expected);
    }

    fn numbers(chunk: &Chunk) -> Vec<f64> {
        chunk
            .constants()
            .iter()
            .map(|v| v.as_number().expect("compiler only emits numbers"))
            .collect()
    }

    #[test]
    fn test_sum_of_two_literals() {
        let chunk = compile_ok("1.2 + 3.7");
        assert_eq!(numbers(&chunk), vec![1.2, 3.7]);
        assert_eq!(chunk.code(), &[C, 0, C, 1, ADD, RET]);
    }

    #[test]
    fn test_single_literal() {
        assert_code("42", &[C, 0, RET]);
    }

    #[test]
    fn test_factor_binds_tighter_than_term() {
        assert_code("1 + 2 * 3", &[C, 0, C, 1, C, 2, MUL, ADD, RET]);
        assert_code("1 * 2 + 3", &[C, 0, C, 1, MUL, C, 2, ADD, RET]);
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        assert_code("(1 + 2) * 3", &[C, 0, C, 1, ADD, C, 2, MUL, RET]);
        assert_code("((7))", &[C, 0, RET]);
    }

    #[test]
    fn test_binary_operators_are_left_associative() {
        assert_code("1 - 2 - 3", &[C, 0, C, 1, SUB, C, 2, SUB, RET]);
        assert_code("8 / 4 / 2", &[C, 0, C, 1, DIV, C, 2, DIV, RET]);
    }

    #[test]
    fn test_unary_minus() {
        assert_code("-1", &[C, 0, NEG, RET]);
        assert_code("--1", &[C, 0, NEG, NEG, RET]);
        assert_code("-(1 + 2)", &[C, 0, C, 1, ADD, NEG, RET]);
    }

    #[test]
    fn test_unary_binds_tighter_than_factor() {
        assert_code("-1 * 2", &[C, 0, NEG, C, 1, MUL, RET]);
        assert_code("2 * -1", &[C, 0, C, 1, NEG, MUL, RET]);
    }

    #[test]
    fn test_no_constant_folding_or_sharing() {
        let chunk = compile_ok("1 + 1");
        assert_eq!(numbers(&chunk), vec![1.0, 1.0]);
        assert_eq!(chunk.code(), &[C, 0, C, 1, ADD, RET]);
    }

    #[test]
    fn test_lines_follow_source() {
        let chunk = compile_ok("1 +\n2");
        assert_eq!(chunk.code(), &[C, 0, C, 1, ADD, RET]);
        assert_eq!(chunk.lines(), &[1, 1, 2, 2, 1, 2]);
    }

    #[test]
    fn test_comments_and_whitespace_are_ignored() {
        assert_code("  1 // one\n +\t2 // two", &[C, 0, C, 1, ADD, RET]);
    }

    #[test]
    fn test_missing_prefix() {
        assert_first_error(")", "[line 1] Error at ')': Expect expression.");
    }

    #[test]
    fn test_empty_source() {
        assert_first_error("", "[line 1] Error at end: Expect expression.");
    }

    #[test]
    fn test_dangling_operator() {
        assert_first_error("1 +", "[line 1] Error at end: Expect expression.");
    }

    #[test]
    fn test_unbalanced_grouping() {
        assert_first_error(
            "(1 + 2",
            "[line 1] Error at end: Expect ')' after expression.",
        );
    }

    #[test]
    fn test_trailing_tokens() {
        assert_first_error("1 2", "[line 1] Error at '2': Expected EoF token!");
        assert_first_error("1 + 2)", "[line 1] Error at ')': Expected EoF token!");
    }

    #[test]
    fn test_reserved_operators_have_no_handlers() {
        assert_first_error("1 == 2", "[line 1] Error at '==': Expected EoF token!");
        assert_first_error("1 < 2", "[line 1] Error at '<': Expected EoF token!");
        assert_first_error("nil", "[line 1] Error at 'nil': Expect expression.");
        assert_first_error("!1", "[line 1] Error at '!': Expect expression.");
    }

    #[test]
    fn test_scan_error_is_reported_without_location() {
        assert_first_error("1 @ 2", "[line 1] Error: Unexpected character!");
        assert_first_error("\"abc", "[line 1] Error: Unterminated string.");
    }

    #[test]
    fn test_panic_mode_keeps_only_first_error() {
        let errors = compile_err(") ) @ (");
        assert_eq!(errors.diagnostics.len(), 1);
        assert_eq!(errors.diagnostics[0].message, EXPECT_EXPRESSION);
    }

    #[test]
    fn test_error_line_is_reported() {
        assert_first_error("1 +\n\n)", "[line 3] Error at ')': Expect expression.");
    }

    #[test]
    fn test_failed_compile_leaves_partial_chunk() {
        let mut chunk = Chunk::new();
        assert!(compile(")", &mut chunk).is_err());
        assert_eq!(chunk.code(), &[RET]);

        let mut chunk = Chunk::new();
        assert!(compile("1 + ", &mut chunk).is_err());
        assert_eq!(chunk.code(), &[C, 0, ADD, RET]);
    }

    fn sum_of_literals(count: usize) -> String {
        (0..count)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }

    #[test]
    fn test_constant_pool_at_capacity_compiles() {
        let chunk = compile_ok(&sum_of_literals(MAX_CONSTANTS));
        assert_eq!(chunk.constants().len(), MAX_CONSTANTS);
    }

    #[test]
    fn test_constant_pool_overflow() {
        let mut chunk = Chunk::new();
        let errors = compile(&sum_of_literals(MAX_CONSTANTS + 1), &mut chunk).unwrap_err();

        assert_eq!(errors.diagnostics.len(), 1);
        assert_eq!(errors.diagnostics[0].message, TOO_MANY_CONSTANTS);
        assert_eq!(chunk.constants().len(), MAX_CONSTANTS);

        // the overflowing literal falls back to index 0
        let code = chunk.code();
        assert_eq!(&code[code.len() - 4..], &[C, 0, ADD, RET]);
    }

    #[test]
    fn test_constant_pool_far_overflow() {
        let errors = compile_err(&sum_of_literals(600));
        assert_eq!(errors.diagnostics.len(), 1);
        assert_eq!(errors.diagnostics[0].message, TOO_MANY_CONSTANTS);
    }

    #[test]
    fn test_rule_table_rows() {
        let minus = rule(TokenKind::Minus);
        assert!(minus.has_prefix() && minus.has_infix());
        assert_eq!(minus.precedence(), Precedence::Term);

        let plus = rule(TokenKind::Plus);
        assert!(!plus.has_prefix() && plus.has_infix());
        assert_eq!(plus.precedence(), Precedence::Term);

        for kind in [TokenKind::Star, TokenKind::Slash] {
            assert!(rule(kind).has_infix());
            assert_eq!(rule(kind).precedence(), Precedence::Factor);
        }

        assert!(rule(TokenKind::LeftParen).has_prefix());
        assert!(rule(TokenKind::Number).has_prefix());
        assert!(!rule(TokenKind::EqualEqual).has_infix());
        assert_eq!(rule(TokenKind::EndOfInput).precedence(), Precedence::None);
    }

    #[test]
    fn test_only_arithmetic_rows_have_handlers() {
        let with_handlers = RULES
            .iter()
            .filter(|r| r.has_prefix() || r.has_infix())
            .count();
        assert_eq!(with_handlers, 6);
    }

    #[test]
    fn test_precedence_ladder() {
        assert!(Precedence::None < Precedence::Assignment);
        assert!(Precedence::Term < Precedence::Factor);
        assert!(Precedence::Factor < Precedence::Unary);
        assert_eq!(Precedence::Term.next(), Precedence::Factor);
        assert_eq!(Precedence::Primary.next(), Precedence::Primary);
    }

    fn nested(depth: usize) -> String {
        format!("{}1{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_nesting_up_to_limit_compiles() {
        assert_code(&nested(MAX_DEPTH - 1), &[C, 0, RET]);

        let mut negations = "-".repeat(MAX_DEPTH - 1);
        negations.push('1');
        let chunk = compile_ok(&negations);
        assert_eq!(chunk.len(), 3 + (MAX_DEPTH - 1));
    }

    #[test]
    fn test_balanced_nesting_past_limit() {
        assert_first_error(
            &nested(MAX_DEPTH),
            "[line 1] Error at '1': Expression nested too deeply.",
        );
        assert_first_error(
            &nested(200_000),
            "[line 1] Error at '(': Expression nested too deeply.",
        );
    }

    #[test]
    fn test_unclosed_nesting_past_limit() {
        assert_first_error(
            &"(".repeat(200_000),
            "[line 1] Error at '(': Expression nested too deeply.",
        );

        let mut negations = "-".repeat(200_000);
        negations.push('1');
        assert_first_error(
            &negations,
            "[line 1] Error at '-': Expression nested too deeply.",
        );
    }

    #[test]
    fn test_depth_unwinds_between_operands() {
        // right operands start one frame below the binary operator
        let wide = vec![nested(MAX_DEPTH - 2); 4].join(" + ");
        assert_code(&wide, &[C, 0, C, 1, ADD, C, 2, ADD, C, 3, ADD, RET]);
    }

    #[test]
    fn test_unparsable_number_lexeme() {
        let mut compiler = Compiler::new("");
        compiler.previous = Token::new(TokenKind::Number, "1e", 3);
        number(&mut compiler);

        let (chunk, outcome) = compiler.finish();
        let errors = outcome.unwrap_err();
        assert_eq!(errors.diagnostics[0].message, INVALID_NUMBER);
        assert_eq!(
            errors.diagnostics[0].to_string(),
            "[line 3] Error at '1e': Invalid number literal."
        );
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_compiler_can_be_driven_directly() {
        let mut compiler = Compiler::new("2 * 3");
        compiler.expression_unit();
        let (chunk, outcome) = compiler.finish();
        assert!(outcome.is_ok());
        assert_eq!(chunk.code(), &[C, 0, C, 1, MUL, RET]);
    }
}
