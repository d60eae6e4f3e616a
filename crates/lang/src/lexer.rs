//! Tokenizer for the manifest language

use crate::ast::StrSeg;
use crate::error::ParseError;

/// A lexical token.
///
/// Keywords (`class`, `define`, `include`, `if`, `case`, `default`,
/// `inherits`, `true`, `false`) arrive as `Word` and are distinguished in
/// the parser. Double-quoted strings are split into interpolation segments
/// here so the parser never re-scans string contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: identifiers, keywords, type names
    Word(String),
    /// `$name`
    Variable(String),
    /// Double-quoted string, escapes resolved, interpolation points kept
    DString(Vec<StrSeg>),
    /// Single-quoted string, taken literally
    SString(String),
    /// Numeric literal, kept as written
    Number(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Semi,
    Comma,
    /// `=>`
    FatArrow,
    /// `?`
    Question,
    /// `=`
    Assign,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    Eof,
}

impl Token {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("'{w}'"),
            Token::Variable(v) => format!("'${v}'"),
            Token::DString(_) | Token::SString(_) => "string".to_string(),
            Token::Number(n) => format!("'{n}'"),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Semi => "';'".to_string(),
            Token::Comma => "','".to_string(),
            Token::FatArrow => "'=>'".to_string(),
            Token::Question => "'?'".to_string(),
            Token::Assign => "'='".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// A token together with its source position.
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    source_name: &'a str,
}

/// Tokenize manifest text.
pub fn lex(src: &str, source_name: &str) -> Result<Vec<Spanned>, ParseError> {
    Lexer {
        chars: src.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        source_name,
    }
    .run()
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn err(&self, line: u32, column: u32, message: impl Into<String>) -> ParseError {
        ParseError::new(self.source_name, line, column, message)
    }

    fn run(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            // Line comment
            if c == '#' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
                continue;
            }

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            let (line, column) = (self.line, self.column);
            let token = match c {
                '"' => self.double_string()?,
                '\'' => self.single_string()?,
                '$' => self.variable()?,
                '{' => self.punct(Token::LBrace),
                '}' => self.punct(Token::RBrace),
                '[' => self.punct(Token::LBracket),
                ']' => self.punct(Token::RBracket),
                '(' => self.punct(Token::LParen),
                ')' => self.punct(Token::RParen),
                ':' => self.punct(Token::Colon),
                ';' => self.punct(Token::Semi),
                ',' => self.punct(Token::Comma),
                '?' => self.punct(Token::Question),
                '=' => {
                    self.bump();
                    match self.peek() {
                        Some('>') => {
                            self.bump();
                            Token::FatArrow
                        }
                        Some('=') => {
                            self.bump();
                            Token::EqEq
                        }
                        _ => Token::Assign,
                    }
                }
                '!' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        Token::NotEq
                    } else {
                        return Err(self.err(line, column, "unexpected character '!'"));
                    }
                }
                _ if c.is_ascii_digit() => self.number(),
                _ if is_word_start(c) => self.word(),
                _ => {
                    return Err(self.err(line, column, format!("unexpected character '{c}'")));
                }
            };
            tokens.push(Spanned {
                token,
                line,
                column,
            });
        }

        tokens.push(Spanned {
            token: Token::Eof,
            line: self.line,
            column: self.column,
        });
        Ok(tokens)
    }

    fn punct(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn number(&mut self) -> Token {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            text.push(self.bump().unwrap_or_default());
        }
        Token::Number(text)
    }

    fn word(&mut self) -> Token {
        let mut text = String::new();
        while self.peek().is_some_and(is_word_char) {
            text.push(self.bump().unwrap_or_default());
        }
        Token::Word(text)
    }

    /// `$name` outside of a string.
    fn variable(&mut self) -> Result<Token, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut name = String::new();
        while self.peek().is_some_and(is_word_char) {
            name.push(self.bump().unwrap_or_default());
        }
        if name.is_empty() {
            return Err(self.err(line, column, "expected variable name after '$'"));
        }
        Ok(Token::Variable(name))
    }

    /// Single-quoted string: literal text, only `\'` and `\\` escape.
    fn single_string(&mut self) -> Result<Token, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut text = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.err(line, column, "unterminated single-quoted string"));
            };
            match c {
                '\'' => break,
                '\\' => match self.peek() {
                    Some('\'') => {
                        self.bump();
                        text.push('\'');
                    }
                    Some('\\') => {
                        self.bump();
                        text.push('\\');
                    }
                    // Any other backslash is literal text
                    _ => text.push('\\'),
                },
                _ => text.push(c),
            }
        }
        Ok(Token::SString(text))
    }

    /// Double-quoted string: escapes resolved, `$var`/`${var}` split out
    /// into interpolation segments.
    fn double_string(&mut self) -> Result<Token, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut segs = Vec::new();
        let mut lit = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.err(line, column, "unterminated double-quoted string"));
            };
            match c {
                '"' => {
                    self.bump();
                    break;
                }
                '\\' => {
                    self.bump();
                    let Some(esc) = self.bump() else {
                        return Err(self.err(line, column, "unterminated escape in string"));
                    };
                    match esc {
                        '"' => lit.push('"'),
                        '\\' => lit.push('\\'),
                        'n' => lit.push('\n'),
                        't' => lit.push('\t'),
                        '$' => lit.push('$'),
                        other => {
                            lit.push('\\');
                            lit.push(other);
                        }
                    }
                }
                '$' => {
                    self.bump();
                    let name = if self.peek() == Some('{') {
                        self.bump();
                        let mut name = String::new();
                        loop {
                            match self.bump() {
                                Some('}') => break,
                                Some(c) if is_word_char(c) => name.push(c),
                                _ => {
                                    return Err(self.err(
                                        line,
                                        column,
                                        "unterminated '${' interpolation",
                                    ));
                                }
                            }
                        }
                        name
                    } else {
                        let mut name = String::new();
                        while self.peek().is_some_and(is_word_char) {
                            name.push(self.bump().unwrap_or_default());
                        }
                        name
                    };
                    if name.is_empty() {
                        // A lone '$' is literal text
                        lit.push('$');
                    } else {
                        if !lit.is_empty() {
                            segs.push(StrSeg::Lit(std::mem::take(&mut lit)));
                        }
                        segs.push(StrSeg::Var(name));
                    }
                }
                _ => {
                    lit.push(c);
                    self.bump();
                }
            }
        }
        if !lit.is_empty() || segs.is_empty() {
            segs.push(StrSeg::Lit(lit));
        }
        Ok(Token::DString(segs))
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        lex(src, "test")
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_lex_resource_shape() {
        let toks = tokens("file { \"/tmp/x\": mode => 755 }");
        assert_eq!(
            toks,
            vec![
                Token::Word("file".into()),
                Token::LBrace,
                Token::DString(vec![StrSeg::Lit("/tmp/x".into())]),
                Token::Colon,
                Token::Word("mode".into()),
                Token::FatArrow,
                Token::Number("755".into()),
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_interpolation() {
        let toks = tokens(r#""a $name b ${other}c""#);
        assert_eq!(
            toks[0],
            Token::DString(vec![
                StrSeg::Lit("a ".into()),
                StrSeg::Var("name".into()),
                StrSeg::Lit(" b ".into()),
                StrSeg::Var("other".into()),
                StrSeg::Lit("c".into()),
            ])
        );
    }

    #[test]
    fn test_lex_single_quote_is_literal() {
        let toks = tokens(r"'a $name \' \\ \y'");
        assert_eq!(toks[0], Token::SString(r"a $name ' \ \y".into()));
    }

    #[test]
    fn test_lex_double_quote_escapes() {
        let toks = tokens(r#""a\tb\n\"q\" \$x""#);
        assert_eq!(
            toks[0],
            Token::DString(vec![StrSeg::Lit("a\tb\n\"q\" $x".into())])
        );
    }

    #[test]
    fn test_lex_operators_and_positions() {
        let spanned = lex("a =>\n  == != = ?", "test").unwrap();
        let toks: Vec<_> = spanned.iter().map(|s| s.token.clone()).collect();
        assert_eq!(
            toks,
            vec![
                Token::Word("a".into()),
                Token::FatArrow,
                Token::EqEq,
                Token::NotEq,
                Token::Assign,
                Token::Question,
                Token::Eof,
            ]
        );
        assert_eq!((spanned[2].line, spanned[2].column), (2, 3));
    }

    #[test]
    fn test_lex_comments_skipped() {
        let toks = tokens("# a comment\ninclude base # trailing");
        assert_eq!(
            toks,
            vec![
                Token::Word("include".into()),
                Token::Word("base".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_unterminated_string() {
        let err = lex("\"abc", "test").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_lex_variable_token() {
        let toks = tokens("$operatingsystem");
        assert_eq!(toks[0], Token::Variable("operatingsystem".into()));
    }

    #[test]
    fn test_lex_empty_dstring_has_one_empty_segment() {
        let toks = tokens(r#""""#);
        assert_eq!(toks[0], Token::DString(vec![StrSeg::Lit(String::new())]));
    }
}
