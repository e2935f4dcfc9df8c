// src/lexer.rs
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Result, StoneError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Operator,
    Delimiter,
    Keyword,
    Literal,
    Identifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubType {
    None,
    // Operators
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    More,
    Assign,
    Not,
    // Keywords
    If,
    Else,
    While,
    // Delimiters
    BeginArgs,
    EndArgs,
    BeginBody,
    EndBody,
    EndStatement,
    // Literals and type keywords
    Integer,
    Float,
    String,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: u32,
    pub row: u32,
    pub column: u32,
    pub text: String,
    pub kind: TokenType,
    pub sub: SubType,
}

impl Token {
    pub fn is(&self, kind: TokenType, sub: SubType) -> bool {
        self.kind == kind && self.sub == sub
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:<6}{:<6}{:<8}{:<20}{:<12}{:?}",
            self.id,
            self.row,
            self.column,
            self.text,
            format!("{:?}", self.kind),
            self.sub
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IdentKey {
    text: String,
    kind: TokenType,
    sub: SubType,
}

/// A deduplicated user identifier and the token where it first appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub id: u32,
    pub text: String,
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub identifiers: Vec<Identifier>,
}

const KEYWORDS: &[&str] = &[
    "if", "else", "while", "do", "break", "continue", "int", "double", "float", "return", "char",
    "case", "sizeof", "long", "short", "typedef", "switch", "unsigned", "void", "static",
    "struct", "goto", "string",
];

fn is_boundary(ch: u8) -> bool {
    matches!(
        ch,
        b' ' | b'\t'
            | b'\n'
            | b'\r'
            | b'+'
            | b'-'
            | b'*'
            | b'/'
            | b','
            | b';'
            | b'>'
            | b'<'
            | b'='
            | b'('
            | b')'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b'!'
    )
}

fn operator(ch: u8) -> Option<SubType> {
    Some(match ch {
        b'+' => SubType::Add,
        b'-' => SubType::Subtract,
        b'*' => SubType::Multiply,
        b'/' => SubType::Divide,
        b'>' => SubType::More,
        b'<' => SubType::Less,
        b'=' => SubType::Assign,
        b'!' => SubType::Not,
        _ => return None,
    })
}

fn delimiter(ch: u8) -> Option<SubType> {
    Some(match ch {
        b'(' => SubType::BeginArgs,
        b')' => SubType::EndArgs,
        b'{' => SubType::BeginBody,
        b'}' => SubType::EndBody,
        b';' => SubType::EndStatement,
        _ => return None,
    })
}

fn keyword_sub(word: &str) -> SubType {
    match word {
        "int" => SubType::Integer,
        "float" | "double" => SubType::Float,
        "string" => SubType::String,
        "if" => SubType::If,
        "else" => SubType::Else,
        "while" => SubType::While,
        _ => SubType::None,
    }
}

fn is_integer(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(word: &str) -> bool {
    let mut dots = 0;
    for b in word.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => {}
            _ => return false,
        }
    }
    dots == 1 && word.len() > 1
}

fn is_identifier(word: &str) -> bool {
    let mut bytes = word.bytes();
    matches!(bytes.next(), Some(b'a'..=b'z' | b'A'..=b'Z' | b'_'))
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    row: u32,
    line_start: usize,
    last_id: u32,
    identifiers: IndexMap<IdentKey, Identifier>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            input: source.as_bytes(),
            pos: 0,
            row: 1,
            line_start: 0,
            last_id: 0,
            identifiers: IndexMap::new(),
            tokens: Vec::with_capacity(source.len() / 4),
        }
    }

    fn cur(&self) -> u8 {
        self.input.get(self.pos).copied().unwrap_or(0)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn column(&self, pos: usize) -> u32 {
        (pos - self.line_start + 1) as u32
    }

    // Consumes one byte, keeping row/column in step with line breaks.
    fn advance(&mut self) {
        if self.cur() == b'\n' {
            self.row += 1;
            self.line_start = self.pos + 1;
        }
        self.pos += 1;
    }

    fn next_id(&mut self) -> u32 {
        let id = self.last_id;
        self.last_id += 1;
        id
    }

    fn push(&mut self, row: u32, column: u32, text: String, kind: TokenType, sub: SubType) {
        let id = self.next_id();
        self.tokens.push(Token { id, row, column, text, kind, sub });
    }

    pub fn lex(mut self) -> Result<Lexed> {
        while !self.at_end() {
            let ch = self.cur();
            if let Some(sub) = operator(ch) {
                let column = self.column(self.pos);
                self.push(self.row, column, (ch as char).to_string(), TokenType::Operator, sub);
                self.advance();
            } else if let Some(sub) = delimiter(ch) {
                let column = self.column(self.pos);
                self.push(self.row, column, (ch as char).to_string(), TokenType::Delimiter, sub);
                self.advance();
            } else if is_boundary(ch) {
                self.advance();
            } else {
                self.word()?;
            }
        }

        debug!(
            tokens = self.tokens.len(),
            identifiers = self.identifiers.len(),
            "lexed source"
        );
        Ok(Lexed {
            tokens: self.tokens,
            identifiers: self.identifiers.into_values().collect(),
        })
    }

    // Scans a maximal span up to the next boundary outside string quotes.
    fn word(&mut self) -> Result<()> {
        let row = self.row;
        let column = self.column(self.pos);
        let mut text = Vec::new();
        let mut in_string = false;

        while !self.at_end() {
            let ch = self.cur();
            if ch == b'"' {
                in_string = !in_string;
            } else if !in_string && is_boundary(ch) {
                break;
            }
            text.push(match ch {
                b'\t' | b'\n' | b'\r' => b' ',
                other => other,
            });
            self.advance();
        }

        if in_string {
            return Err(StoneError::Lex {
                row,
                column,
                message: "unterminated string literal".to_string(),
            });
        }

        let word = String::from_utf8_lossy(&text).into_owned();
        self.classify(row, column, word)
    }

    fn classify(&mut self, row: u32, column: u32, word: String) -> Result<()> {
        if KEYWORDS.contains(&word.as_str()) {
            let sub = keyword_sub(&word);
            self.push(row, column, word, TokenType::Keyword, sub);
        } else if is_integer(&word) {
            self.push(row, column, word, TokenType::Literal, SubType::Integer);
        } else if is_float(&word) {
            self.push(row, column, word, TokenType::Literal, SubType::Float);
        } else if word.len() >= 2 && word.starts_with('"') && word.ends_with('"') {
            let inner = word[1..word.len() - 1].to_string();
            self.push(row, column, inner, TokenType::Literal, SubType::String);
        } else if is_identifier(&word) {
            self.identifier(row, column, word);
        } else {
            return Err(StoneError::Lex {
                row,
                column,
                message: format!("{} is not a valid identifier", word),
            });
        }
        Ok(())
    }

    fn identifier(&mut self, row: u32, column: u32, text: String) {
        let key = IdentKey {
            text: text.clone(),
            kind: TokenType::Identifier,
            sub: SubType::User,
        };
        let id = match self.identifiers.get(&key) {
            Some(known) => known.id,
            None => {
                let id = self.next_id();
                self.identifiers.insert(
                    key,
                    Identifier {
                        id,
                        text: text.clone(),
                        row,
                        column,
                    },
                );
                id
            }
        };
        self.tokens.push(Token {
            id,
            row,
            column,
            text,
            kind: TokenType::Identifier,
            sub: SubType::User,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Lexed {
        Lexer::new(src).lex().unwrap()
    }

    fn shape(lexed: &Lexed) -> Vec<(TokenType, SubType, &str)> {
        lexed
            .tokens
            .iter()
            .map(|t| (t.kind, t.sub, t.text.as_str()))
            .collect()
    }

    #[test]
    fn declaration_and_assignment() {
        let lexed = lex("int x; x = 42;");
        assert_eq!(
            shape(&lexed),
            vec![
                (TokenType::Keyword, SubType::Integer, "int"),
                (TokenType::Identifier, SubType::User, "x"),
                (TokenType::Delimiter, SubType::EndStatement, ";"),
                (TokenType::Identifier, SubType::User, "x"),
                (TokenType::Operator, SubType::Assign, "="),
                (TokenType::Literal, SubType::Integer, "42"),
                (TokenType::Delimiter, SubType::EndStatement, ";"),
            ]
        );
    }

    #[test]
    fn two_character_comparisons_are_two_tokens() {
        let lexed = lex("a>=b!=c==d");
        let subs: Vec<SubType> = lexed.tokens.iter().map(|t| t.sub).collect();
        assert_eq!(
            subs,
            vec![
                SubType::User,
                SubType::More,
                SubType::Assign,
                SubType::User,
                SubType::Not,
                SubType::Assign,
                SubType::User,
                SubType::Assign,
                SubType::Assign,
                SubType::User,
            ]
        );
    }

    #[test]
    fn string_literal_keeps_inner_delimiters() {
        let lexed = lex("print(\"a, b; {c}\");");
        let lit = &lexed.tokens[2];
        assert_eq!(lit.kind, TokenType::Literal);
        assert_eq!(lit.sub, SubType::String);
        assert_eq!(lit.text, "a, b; {c}");
        assert_eq!(lexed.tokens.len(), 5);
    }

    #[test]
    fn commas_and_brackets_only_separate() {
        let lexed = lex("f(a, b)[c]");
        let texts: Vec<&str> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["f", "(", "a", "b", ")", "c"]);
    }

    #[test]
    fn identifiers_share_ids() {
        let lexed = lex("int count; count = count + 1;");
        let ids: Vec<u32> = lexed
            .tokens
            .iter()
            .filter(|t| t.text == "count")
            .map(|t| t.id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(lexed.identifiers.len(), 1);
        assert_eq!(lexed.identifiers[0].text, "count");
    }

    #[test]
    fn distinct_tokens_get_distinct_ids() {
        let lexed = lex("a = b; b = a;");
        let a = lexed.tokens[0].id;
        let b = lexed.tokens[2].id;
        assert_ne!(a, b);
        let mut non_ident: Vec<u32> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind != TokenType::Identifier)
            .map(|t| t.id)
            .collect();
        let before = non_ident.len();
        non_ident.sort_unstable();
        non_ident.dedup();
        assert_eq!(non_ident.len(), before);
        assert!(!non_ident.contains(&a) && !non_ident.contains(&b));
    }

    #[test]
    fn rows_and_columns_follow_line_breaks() {
        let lexed = lex("void main()\n{\n\tint  abc;\n}");
        let abc = lexed.tokens.iter().find(|t| t.text == "abc").unwrap();
        assert_eq!((abc.row, abc.column), (3, 7));
        let close = lexed.tokens.last().unwrap();
        assert_eq!((close.row, close.column), (4, 1));
    }

    #[test]
    fn keyword_literal_classification() {
        let lexed = lex("double 3.14 while string \"s\" else");
        assert_eq!(
            shape(&lexed),
            vec![
                (TokenType::Keyword, SubType::Float, "double"),
                (TokenType::Literal, SubType::Float, "3.14"),
                (TokenType::Keyword, SubType::While, "while"),
                (TokenType::Keyword, SubType::String, "string"),
                (TokenType::Literal, SubType::String, "s"),
                (TokenType::Keyword, SubType::Else, "else"),
            ]
        );
    }

    #[test]
    fn invalid_identifier_is_positioned() {
        let err = Lexer::new("int x;\n  9lives = 1;").lex().unwrap_err();
        assert_eq!(err.position(), Some((2, 3)));
        assert!(err.to_string().contains("9lives is not a valid identifier"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("print(\"oops);").lex().unwrap_err();
        assert!(matches!(err, StoneError::Lex { .. }));
        assert_eq!(err.position(), Some((1, 7)));
    }

    #[test]
    fn float_with_two_dots_is_rejected() {
        assert!(Lexer::new("1.2.3").lex().is_err());
    }
}
