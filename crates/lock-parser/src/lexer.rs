use unicode_xid::UnicodeXID;

use crate::error::SyntaxError;
use crate::span::{Span, Spanned};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    /// A double-quoted string with escapes decoded. `template` is set when the
    /// string contains `${...}` or `%{...}`; the interpolation is kept verbatim.
    Str { value: String, template: bool },
    Number(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Assign,
    Comma,
    Colon,
    Question,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

impl Token {
    /// Human-readable name used in "expected X, found Y" messages.
    pub(crate) fn describe(&self) -> String {
        let punct = match self {
            Token::Ident(name) => return format!("identifier `{name}`"),
            Token::Str { template: false, .. } => return "string literal".to_string(),
            Token::Str { template: true, .. } => return "string template".to_string(),
            Token::Number(n) => return format!("number `{n}`"),
            Token::Eof => return "end of input".to_string(),
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Assign => "=",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Question => "?",
            Token::Dot => ".",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
        };
        format!("`{punct}`")
    }
}

pub(crate) struct Lexer<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self { source, pos: 0 }
    }

    pub(crate) fn tokenize(mut self) -> Result<Vec<Spanned<Token>>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.node == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn error_from(&self, start: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(Span::new(start, self.pos), message)
    }

    fn next_token(&mut self) -> Result<Spanned<Token>, SyntaxError> {
        self.skip_trivia()?;

        let start = self.pos;
        let Some(ch) = self.bump() else {
            return Ok(Spanned::new(Token::Eof, Span::new(start, start)));
        };

        let token = match ch {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '?' => Token::Question,
            '.' => {
                if self.peek() == Some('.') {
                    return Err(self.error_from(start, "`...` expansion is not supported"));
                }
                Token::Dot
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' if self.eat('=') => Token::EqEq,
            '=' if self.eat('>') => {
                return Err(self.error_from(start, "`=>` is only valid in for expressions, which are not supported"));
            }
            '=' => Token::Assign,
            '!' if self.eat('=') => Token::NotEq,
            '!' => Token::Bang,
            '<' if self.peek() == Some('<') => {
                return Err(self.error_from(start, "heredoc strings are not supported"));
            }
            '<' if self.eat('=') => Token::Le,
            '<' => Token::Lt,
            '>' if self.eat('=') => Token::Ge,
            '>' => Token::Gt,
            '&' if self.eat('&') => Token::AndAnd,
            '|' if self.eat('|') => Token::OrOr,
            '"' => self.scan_string(start)?,
            '\'' => {
                return Err(self.error_from(
                    start,
                    "single-quoted strings are not valid; use double quotes",
                ));
            }
            c if c.is_ascii_digit() => self.scan_number(start),
            c if is_ident_start(c) => self.scan_ident(start),
            c => {
                return Err(self.error_from(start, format!("unexpected character `{}`", c.escape_default())));
            }
        };

        Ok(Spanned::new(token, Span::new(start, self.pos)))
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }

            match (self.peek(), self.peek_second()) {
                (Some('#'), _) | (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    match self.source[self.pos..].find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => {
                            self.pos = self.source.len();
                            return Err(self.error_from(start, "unterminated block comment"));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_ident(&mut self, start: usize) -> Token {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Token::Ident(self.source[start..self.pos].to_string())
    }

    fn scan_number(&mut self, start: usize) -> Token {
        self.skip_digits();
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.skip_digits();
            } else {
                // not an exponent after all; leave the `e` for the next token
                self.pos = mark;
            }
        }
        Token::Number(self.source[start..self.pos].to_string())
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn scan_string(&mut self, start: usize) -> Result<Token, SyntaxError> {
        let mut value = String::new();
        let mut template = false;

        loop {
            let Some(ch) = self.bump() else {
                return Err(self.error_from(start, "unterminated string"));
            };
            match ch {
                '"' => break,
                '\n' => return Err(self.error_from(start, "newline in string literal")),
                '\\' => value.push(self.scan_escape()?),
                '$' | '%' if self.peek() == Some(ch) && self.peek_second() == Some('{') => {
                    // `$${` and `%%{` stand for a literal `${` / `%{`
                    self.bump();
                    self.bump();
                    value.push(ch);
                    value.push('{');
                }
                '$' | '%' if self.peek() == Some('{') => {
                    let open = self.pos - 1;
                    self.bump();
                    template = true;
                    value.push(ch);
                    value.push('{');
                    self.scan_interpolation(open, &mut value)?;
                }
                c => value.push(c),
            }
        }

        Ok(Token::Str { value, template })
    }

    fn scan_escape(&mut self) -> Result<char, SyntaxError> {
        let start = self.pos - 1;
        let Some(ch) = self.bump() else {
            return Err(self.error_from(start, "unterminated string"));
        };
        match ch {
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            '"' => Ok('"'),
            '\\' => Ok('\\'),
            'u' => self.scan_unicode_escape(start, 4),
            'U' => self.scan_unicode_escape(start, 8),
            c => Err(self.error_from(start, format!("invalid escape sequence `\\{}`", c.escape_default()))),
        }
    }

    fn scan_unicode_escape(&mut self, start: usize, digits: usize) -> Result<char, SyntaxError> {
        let hex_start = self.pos;
        for _ in 0..digits {
            if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                return Err(self.error_from(start, "invalid unicode escape"));
            }
            self.bump();
        }
        u32::from_str_radix(&self.source[hex_start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error_from(start, "invalid unicode escape"))
    }

    /// Copies an interpolation body up to its closing brace. Only brace
    /// balance and nested quoted strings are tracked; the contents are not
    /// parsed.
    fn scan_interpolation(&mut self, open: usize, out: &mut String) -> Result<(), SyntaxError> {
        let mut depth = 1usize;
        let mut in_string = false;

        while let Some(ch) = self.bump() {
            out.push(ch);
            if in_string {
                match ch {
                    '\\' => {
                        if let Some(next) = self.bump() {
                            out.push(next);
                        }
                    }
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }

        Err(self.error_from(open, "unterminated template interpolation"))
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || UnicodeXID::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    c == '-' || UnicodeXID::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.node)
            .collect()
    }

    fn literal(value: &str) -> Token {
        Token::Str {
            value: value.to_string(),
            template: false,
        }
    }

    #[test]
    fn test_attribute_tokens() {
        assert_eq!(
            kinds(r#"version = "1.2.3""#),
            vec![
                Token::Ident("version".to_string()),
                Token::Assign,
                literal("1.2.3"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "# header\n// line\n/* block\n comment */ a";
        assert_eq!(kinds(source), vec![Token::Ident("a".to_string()), Token::Eof]);
    }

    #[test]
    fn test_only_comments_yields_eof() {
        assert_eq!(kinds("# nothing here\n"), vec![Token::Eof]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = Lexer::new("a /* never closed").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated block comment"));
        assert_eq!(err.span.start, 2);
    }

    #[test]
    fn test_ident_allows_dashes() {
        assert_eq!(
            kinds("for-each"),
            vec![Token::Ident("for-each".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\\c\né""#),
            vec![literal("a\"b\\c\né"), Token::Eof]
        );
    }

    #[test]
    fn test_escaped_interpolation_is_literal() {
        assert_eq!(kinds(r#""$${x}""#), vec![literal("${x}"), Token::Eof]);
    }

    #[test]
    fn test_template_string() {
        assert_eq!(
            kinds(r#""v${var.x}-${"y"}""#),
            vec![
                Token::Str {
                    value: r#"v${var.x}-${"y"}"#.to_string(),
                    template: true,
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_single_quote_rejected() {
        let err = Lexer::new("provider 'x' {}").tokenize().unwrap_err();
        assert!(err.message.contains("single-quoted"));
        assert_eq!(err.span.start, 9);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new(r#"a = "abc"#).tokenize().unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_newline_in_string() {
        let err = Lexer::new("a = \"ab\ncd\"").tokenize().unwrap_err();
        assert!(err.message.contains("newline"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 3e10 4E-2"),
            vec![
                Token::Number("1".to_string()),
                Token::Number("2.5".to_string()),
                Token::Number("3e10".to_string()),
                Token::Number("4E-2".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != <= >= && || ! < >"),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::Le,
                Token::Ge,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
                Token::Lt,
                Token::Gt,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_heredoc_rejected() {
        let err = Lexer::new("a = <<EOT\nx\nEOT\n").tokenize().unwrap_err();
        assert!(err.message.contains("heredoc"));
    }

    #[test]
    fn test_lone_ampersand_rejected() {
        assert!(Lexer::new("a & b").tokenize().is_err());
    }
}
