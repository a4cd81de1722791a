//! Lexer (tokenizer) for the model language.

use crate::error::{FrontendError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Whether whitespace separated this token from the previous one
    pub spaced: bool,
}

/// Token types in the model language.
///
/// Keywords are lexed as identifiers; the parser decides from context
/// whether a word acts as a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A name (`V_m`, `I_shape$ex`, `neuron`)
    Identifier,
    /// An integer literal
    Integer,
    /// A real literal (`3.14`, `1e-3`)
    Real,
    /// A double-quoted string literal, text without quotes
    String,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    /// `[[` opening an invariant
    OpenInvariant,
    /// `]]` closing an invariant
    CloseInvariant,
    Comma,
    Colon,
    Question,
    /// `'` marking a derivative
    Prime,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Tilde,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    EqEq,
    /// `!=` or `<>`
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    /// `<-` in input port declarations
    LeftArrow,
    /// `...` in for loops
    Ellipsis,
    Newline,
    Eof,
}

/// Words the parser treats as keywords wherever a name is expected.
pub const RESERVED_WORDS: &[&str] = &[
    "neuron",
    "synapse",
    "end",
    "function",
    "recordable",
    "shape",
    "if",
    "elif",
    "else",
    "while",
    "for",
    "in",
    "step",
    "return",
    "and",
    "or",
    "not",
    "true",
    "false",
    "inf",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Lexer for tokenizing model source text.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
    /// Open parentheses and brackets; newlines inside them are insignificant
    nesting: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
            nesting: 0,
        }
    }

    /// Tokenize the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        let spaced = self.skip_whitespace_and_comments()?;

        let start_line = self.line;
        let start_column = self.column;
        let make = |kind: TokenKind, text: &str| Token {
            kind,
            text: text.to_string(),
            line: start_line,
            column: start_column,
            spaced,
        };

        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(make(TokenKind::Eof, "")),
        };

        let token = match ch {
            '\n' => {
                self.advance();
                make(TokenKind::Newline, "\n")
            }
            '0'..='9' => {
                let (kind, text) = self.read_number()?;
                make(kind, &text)
            }
            '.' => {
                self.advance();
                if self.peek() == Some('.') {
                    self.advance();
                    if self.peek() != Some('.') {
                        return Err(FrontendError::lexer(
                            start_line,
                            start_column,
                            "expected '...'",
                        ));
                    }
                    self.advance();
                    make(TokenKind::Ellipsis, "...")
                } else {
                    return Err(FrontendError::lexer(
                        start_line,
                        start_column,
                        "unexpected character '.'",
                    ));
                }
            }
            '"' => {
                self.advance();
                let text = self.read_string(start_line, start_column)?;
                make(TokenKind::String, &text)
            }
            _ if ch.is_alphabetic() || ch == '_' || ch == '$' => {
                let text = self.read_identifier();
                make(TokenKind::Identifier, &text)
            }
            _ => {
                self.advance();
                let next = self.peek();
                let (kind, text) = match (ch, next) {
                    ('(', _) => {
                        self.nesting += 1;
                        (TokenKind::OpenParen, "(")
                    }
                    (')', _) => {
                        self.nesting = self.nesting.saturating_sub(1);
                        (TokenKind::CloseParen, ")")
                    }
                    ('[', Some('[')) => {
                        self.advance();
                        self.nesting += 1;
                        (TokenKind::OpenInvariant, "[[")
                    }
                    ('[', _) => {
                        self.nesting += 1;
                        (TokenKind::OpenBracket, "[")
                    }
                    (']', Some(']')) => {
                        self.advance();
                        self.nesting = self.nesting.saturating_sub(1);
                        (TokenKind::CloseInvariant, "]]")
                    }
                    (']', _) => {
                        self.nesting = self.nesting.saturating_sub(1);
                        (TokenKind::CloseBracket, "]")
                    }
                    (',', _) => (TokenKind::Comma, ","),
                    (':', _) => (TokenKind::Colon, ":"),
                    ('?', _) => (TokenKind::Question, "?"),
                    ('\'', _) => (TokenKind::Prime, "'"),
                    ('~', _) => (TokenKind::Tilde, "~"),
                    ('%', _) => (TokenKind::Percent, "%"),
                    ('*', Some('*')) => {
                        self.advance();
                        (TokenKind::StarStar, "**")
                    }
                    ('*', Some('=')) => {
                        self.advance();
                        (TokenKind::StarAssign, "*=")
                    }
                    ('*', _) => (TokenKind::Star, "*"),
                    ('/', Some('=')) => {
                        self.advance();
                        (TokenKind::SlashAssign, "/=")
                    }
                    ('/', _) => (TokenKind::Slash, "/"),
                    ('+', Some('=')) => {
                        self.advance();
                        (TokenKind::PlusAssign, "+=")
                    }
                    ('+', _) => (TokenKind::Plus, "+"),
                    ('-', Some('=')) => {
                        self.advance();
                        (TokenKind::MinusAssign, "-=")
                    }
                    ('-', _) => (TokenKind::Minus, "-"),
                    ('=', Some('=')) => {
                        self.advance();
                        (TokenKind::EqEq, "==")
                    }
                    ('=', _) => (TokenKind::Assign, "="),
                    ('!', Some('=')) => {
                        self.advance();
                        (TokenKind::NotEq, "!=")
                    }
                    ('<', Some('>')) => {
                        self.advance();
                        (TokenKind::NotEq, "<>")
                    }
                    ('<', Some('=')) => {
                        self.advance();
                        (TokenKind::Le, "<=")
                    }
                    ('<', Some('-')) => {
                        self.advance();
                        (TokenKind::LeftArrow, "<-")
                    }
                    ('<', _) => (TokenKind::Lt, "<"),
                    ('>', Some('=')) => {
                        self.advance();
                        (TokenKind::Ge, ">=")
                    }
                    ('>', _) => (TokenKind::Gt, ">"),
                    _ => {
                        return Err(FrontendError::lexer(
                            start_line,
                            start_column,
                            format!("unexpected character '{}'", ch),
                        ));
                    }
                };
                make(kind, text)
            }
        };

        Ok(token)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, ch)| ch)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Skip blanks, comments, line continuations and newlines inside
    /// parentheses. Returns whether anything was skipped.
    fn skip_whitespace_and_comments(&mut self) -> Result<bool> {
        let mut skipped = false;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' if self.nesting > 0 => {
                    self.advance();
                }
                '\\' if matches!(self.peek_second(), Some('\n') | Some('\r')) => {
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    }
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '/' if self.peek_second() == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.advance() {
                        if c == '*' && self.peek() == Some('/') {
                            self.advance();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(FrontendError::lexer(line, column, "unterminated comment"));
                    }
                }
                _ => break,
            }
            skipped = true;
        }
        Ok(skipped)
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<(TokenKind, String)> {
        let mut text = String::new();
        let mut kind = TokenKind::Integer;

        self.read_digits(&mut text);

        // Fractional part; `1...5` is an integer followed by an ellipsis
        if self.peek() == Some('.') && self.peek_second() != Some('.') {
            kind = TokenKind::Real;
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        // Exponent, only when digits follow so `10ms` stays a unit literal
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut ahead = self.chars.clone();
            ahead.next();
            let after_e = ahead.next().map(|(_, c)| c);
            let after_sign = ahead.next().map(|(_, c)| c);
            let is_exponent = match after_e {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => after_sign.is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if is_exponent {
                kind = TokenKind::Real;
                if let Some(e) = self.advance() {
                    text.push(e);
                }
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.advance();
                }
                self.read_digits(&mut text);
            }
        }

        Ok((kind, text))
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(text),
                Some('\\') => match self.advance() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => break,
                },
                Some('\n') | None => break,
                Some(c) => text.push(c),
            }
        }
        Err(FrontendError::lexer(line, column, "unterminated string literal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_declaration_tokens() {
        assert_eq!(
            kinds("tau_m ms = 10 ms [[tau_m > 0 ms]]"),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Integer,
                TokenKind::Identifier,
                TokenKind::OpenInvariant,
                TokenKind::Identifier,
                TokenKind::Gt,
                TokenKind::Integer,
                TokenKind::Identifier,
                TokenKind::CloseInvariant,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("3.14...1e-3 10mV 2.").tokenize().unwrap();
        let texts: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(
            texts,
            vec![
                (TokenKind::Real, "3.14"),
                (TokenKind::Ellipsis, "..."),
                (TokenKind::Real, "1e-3"),
                (TokenKind::Integer, "10"),
                (TokenKind::Identifier, "mV"),
                (TokenKind::Real, "2."),
                (TokenKind::Eof, ""),
            ]
        );
        assert!(!tokens[4].spaced);
        assert!(tokens[3].spaced);
    }

    #[test]
    fn test_derivative_and_dollar_names() {
        let tokens = Lexer::new("g_in$'' = -g_in$ / tau").tokenize().unwrap();
        assert_eq!(tokens[0].text, "g_in$");
        assert_eq!(tokens[1].kind, TokenKind::Prime);
        assert_eq!(tokens[2].kind, TokenKind::Prime);
        assert_eq!(tokens[3].kind, TokenKind::Assign);
    }

    #[test]
    fn test_comments_and_newlines_in_parens() {
        assert_eq!(
            kinds("/* block\ncomment */ f(a,\n b) # trailing\nx"),
            vec![
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::CloseParen,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("<- <> != ** += <="),
            vec![
                TokenKind::LeftArrow,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::StarStar,
                TokenKind::PlusAssign,
                TokenKind::Le,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_error_position() {
        let err = Lexer::new("a = 1\nb = @").tokenize().unwrap_err();
        match err {
            FrontendError::LexerError { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
