//! SQL lexer for tokenizing DDL statements.

use std::iter::Peekable;
use std::str::Chars;

/// Reserved words the DDL grammar cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Create,
    Alter,
    Drop,
    Add,
    Modify,
    Table,
    Column,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    Constraint,
    Index,
    If,
    Exists,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        let kw = match word.to_uppercase().as_str() {
            "CREATE" => Self::Create,
            "ALTER" => Self::Alter,
            "DROP" => Self::Drop,
            "ADD" => Self::Add,
            "MODIFY" => Self::Modify,
            "TABLE" => Self::Table,
            "COLUMN" => Self::Column,
            "ONLY" => Self::Only,
            "PRIMARY" => Self::Primary,
            "KEY" => Self::Key,
            "FOREIGN" => Self::Foreign,
            "REFERENCES" => Self::References,
            "NOT" => Self::Not,
            "NULL" => Self::Null,
            "UNIQUE" => Self::Unique,
            "DEFAULT" => Self::Default,
            "CONSTRAINT" => Self::Constraint,
            "INDEX" => Self::Index,
            "IF" => Self::If,
            "EXISTS" => Self::Exists,
            _ => return None,
        };
        Some(kw)
    }
}

/// SQL token types.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A keyword together with its spelling in the source, so that a
    /// column called `key` or `index` keeps its name.
    Keyword(Keyword, String),

    // Identifiers and literals
    Ident(String),
    Str(String),
    Num(String),

    // Symbols
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,

    // End of input
    Eof,
}

impl Token {
    pub fn is(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(kw, _) if *kw == keyword)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Token::Keyword(kw, _) => Some(*kw),
            _ => None,
        }
    }

    /// Word-like spelling of an identifier or keyword, as written.
    pub fn word(&self) -> Option<String> {
        match self {
            Token::Ident(s) | Token::Keyword(_, s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Source-like rendering, used to rebuild type and default literals.
    pub fn text(&self) -> String {
        match self {
            Token::Ident(s) | Token::Keyword(_, s) | Token::Num(s) => s.clone(),
            Token::Str(s) => format!("'{}'", s.replace('\'', "''")),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Dot => ".".to_string(),
            Token::Eof => String::new(),
        }
    }
}

/// SQL lexer.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self { chars, current_char }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            if c == '\n' {
                self.advance();
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // skip *
        while let Some(c) = self.current_char {
            if c == '*' {
                self.advance();
                if self.current_char == Some('/') {
                    self.advance();
                    break;
                }
            } else {
                self.advance();
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    fn read_quoted(&mut self, close: char) -> String {
        self.advance(); // skip opening quote
        let mut text = String::new();
        while let Some(c) = self.current_char {
            if c == close {
                // Doubled closing quote is an escaped quote
                if self.peek() == Some(&close) {
                    text.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    break;
                }
            } else {
                text.push(c);
                self.advance();
            }
        }
        text
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        let mut has_dot = false;

        if self.current_char == Some('-') {
            num.push('-');
            self.advance();
        }

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    fn keyword_or_ident(&self, s: String) -> Token {
        match Keyword::from_word(&s) {
            Some(kw) => Token::Keyword(kw, s),
            None => Token::Ident(s),
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            match self.current_char {
                None => return Token::Eof,

                Some('-') => {
                    if self.peek() == Some(&'-') {
                        self.skip_line_comment();
                        continue;
                    } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        return Token::Num(self.read_number());
                    } else {
                        self.advance();
                        continue;
                    }
                }

                Some('/') => {
                    self.advance();
                    if self.current_char == Some('*') {
                        self.skip_block_comment();
                    }
                    continue;
                }

                Some('#') => {
                    self.skip_line_comment();
                    continue;
                }

                Some('(') => {
                    self.advance();
                    return Token::LParen;
                }
                Some(')') => {
                    self.advance();
                    return Token::RParen;
                }
                Some(',') => {
                    self.advance();
                    return Token::Comma;
                }
                Some(';') => {
                    self.advance();
                    return Token::Semicolon;
                }
                Some('.') => {
                    self.advance();
                    return Token::Dot;
                }

                Some('"') => return Token::Ident(self.read_quoted('"')),
                Some('`') => return Token::Ident(self.read_quoted('`')),
                Some('[') => return Token::Ident(self.read_quoted(']')),
                Some('\'') => return Token::Str(self.read_quoted('\'')),

                Some(c) if c.is_ascii_digit() => {
                    return Token::Num(self.read_number());
                }

                Some(c) if c.is_alphabetic() || c == '_' => {
                    let ident = self.read_identifier();
                    return self.keyword_or_ident(ident);
                }

                Some(_) => {
                    // Operators and other punctuation carry no meaning here
                    self.advance();
                    continue;
                }
            }
        }
    }

    /// Collect all tokens, ending with `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        tokens
    }
}
