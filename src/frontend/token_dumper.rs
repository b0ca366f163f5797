use crate::frontend::token::{Token, TokenKind};

/// Renders a token stream for `--tokens`, one token per line.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints only the lexeme
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const RED: &'static str = "\x1b[31m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump<'src>(&self, tokens: impl IntoIterator<Item = Token<'src>>) {
        for token in tokens {
            println!("{}", self.render(&token));
        }
    }

    pub fn render(&self, token: &Token<'_>) -> String {
        let group = Self::group(token.kind);
        let colr = if self.color { Self::color(token.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            format!(
                "[{:04}] {}{:<8} {:?} '{}'{}",
                token.line, colr, group, token.kind, token.lexeme, reset
            )
        } else {
            format!("[{:04}] {}{:<8} {}{}", token.line, colr, group, token, reset)
        }
    }

    fn group(kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            EndOfInput => "EOF",
            Error => "ERROR",

            Number => "NUMBER",
            String => "STRING",
            Identifier => "IDENT",

            LeftParen | RightParen | LeftBrace | RightBrace => "GROUP",
            Comma | Dot | Semicolon => "PUNCT",

            Plus | Minus | Star | Slash | Bang => "OP",
            BangEqual | Equal | EqualEqual | Greater | GreaterEqual | Less | LessEqual => "CMP",

            _ => "KEYWORD",
        }
    }

    fn color(kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            EndOfInput => Self::DIM,
            Error => Self::RED,
            String => Self::GRN,
            Number => Self::CYN,
            Identifier => Self::YEL,
            Plus | Minus | Star | Slash | Bang => Self::MAG,
            BangEqual | Equal | EqualEqual | Greater | GreaterEqual | Less | LessEqual => Self::MAG,
            _ => Self::RESET,
        }
    }
}
