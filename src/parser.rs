// src/parser.rs
//! Statement recognition. Every construct has a pure recognizer over a
//! copyable [`Cursor`]: on success it returns the record and the advanced
//! cursor, on failure the caller's cursor is untouched. Statements are tried
//! in the fixed order of [`STATEMENT_RECOGNIZERS`]; the first match wins.

use tracing::trace;

use crate::ast::*;
use crate::error::{Result, StoneError};
use crate::lexer::{SubType, Token, TokenType};
use crate::value::ValueKind;

#[derive(Debug, Clone, Copy)]
pub struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    end: usize,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token], span: Span) -> Self {
        debug_assert!(span.end <= tokens.len());
        Self {
            tokens,
            pos: span.start,
            end: span.end,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    pub fn peek(&self) -> Option<&'t Token> {
        if self.is_empty() {
            None
        } else {
            self.tokens.get(self.pos)
        }
    }

    fn check(&self, kind: TokenType, sub: SubType) -> bool {
        self.peek().is_some_and(|t| t.is(kind, sub))
    }

    fn expect(&mut self, kind: TokenType, sub: SubType) -> Option<TokenIdx> {
        if self.check(kind, sub) {
            self.pos += 1;
            Some(self.pos - 1)
        } else {
            None
        }
    }

    fn expect_kind(&mut self, kind: TokenType) -> Option<TokenIdx> {
        match self.peek() {
            Some(t) if t.kind == kind => {
                self.pos += 1;
                Some(self.pos - 1)
            }
            _ => None,
        }
    }

    fn identifier(&mut self) -> Option<TokenIdx> {
        self.expect(TokenType::Identifier, SubType::User)
    }

    /// An identifier or any literal.
    fn operand(&mut self) -> Option<TokenIdx> {
        self.identifier()
            .or_else(|| self.expect_kind(TokenType::Literal))
    }

    fn operator(&mut self, sub: SubType) -> Option<TokenIdx> {
        self.expect(TokenType::Operator, sub)
    }

    fn end_statement(&mut self) -> Option<TokenIdx> {
        self.expect(TokenType::Delimiter, SubType::EndStatement)
    }

    /// Skips from an opening delimiter to its matching closing delimiter,
    /// counting nested pairs of the same kind, and returns the inner span.
    fn balanced(&mut self, open: SubType, close: SubType) -> Option<Span> {
        self.expect(TokenType::Delimiter, open)?;
        let start = self.pos;
        let mut depth = 1usize;
        let mut idx = start;
        while idx < self.end {
            let tok = &self.tokens[idx];
            if tok.is(TokenType::Delimiter, open) {
                depth += 1;
            } else if tok.is(TokenType::Delimiter, close) {
                depth -= 1;
                if depth == 0 {
                    self.pos = idx + 1;
                    return Some(Span::new(start, idx));
                }
            }
            idx += 1;
        }
        None
    }

    fn args(&mut self) -> Option<Span> {
        self.balanced(SubType::BeginArgs, SubType::EndArgs)
    }

    fn body(&mut self) -> Option<Span> {
        self.balanced(SubType::BeginBody, SubType::EndBody)
    }
}

pub type Recognizer = for<'t> fn(Cursor<'t>) -> Option<(Stmt, Cursor<'t>)>;

/// Statement recognizers in priority order.
pub const STATEMENT_RECOGNIZERS: [(&str, Recognizer); 6] = [
    ("call", recognize_call),
    ("declaration", recognize_declaration),
    ("assignment", recognize_assignment),
    ("arithmetic", recognize_arithmetic),
    ("if", recognize_if),
    ("while", recognize_while),
];

pub fn recognize_statement(cursor: Cursor<'_>) -> Option<(Stmt, Cursor<'_>)> {
    STATEMENT_RECOGNIZERS.iter().find_map(|(name, recognize)| {
        let found = recognize(cursor);
        if found.is_some() {
            trace!(construct = *name, at = cursor.pos(), "recognized statement");
        }
        found
    })
}

/// `name ( operand ... ) ;`
pub fn recognize_call(mut c: Cursor<'_>) -> Option<(Stmt, Cursor<'_>)> {
    let callee = c.identifier()?;
    let args = c.args()?;
    c.end_statement()?;
    Some((Stmt::Call(Call { callee, args }), c))
}

/// `int name ;` or `string name ;`
pub fn recognize_declaration(mut c: Cursor<'_>) -> Option<(Stmt, Cursor<'_>)> {
    let kind_tok = c.expect_kind(TokenType::Keyword)?;
    let kind = declared_kind(c.tokens[kind_tok].sub)?;
    let name = c.identifier()?;
    c.end_statement()?;
    Some((Stmt::Declare(VarDecl { name, kind }), c))
}

/// `name = operand ;`
pub fn recognize_assignment(mut c: Cursor<'_>) -> Option<(Stmt, Cursor<'_>)> {
    let target = c.identifier()?;
    c.operator(SubType::Assign)?;
    let value = c.operand()?;
    c.end_statement()?;
    Some((Stmt::Assign(Assign { target, value }), c))
}

/// `name = operand op operand ;`
pub fn recognize_arithmetic(mut c: Cursor<'_>) -> Option<(Stmt, Cursor<'_>)> {
    let target = c.identifier()?;
    c.operator(SubType::Assign)?;
    let left = c.operand()?;
    let op = match c.peek()? {
        t if t.is(TokenType::Operator, SubType::Add) => ArithOp::Add,
        t if t.is(TokenType::Operator, SubType::Subtract) => ArithOp::Subtract,
        t if t.is(TokenType::Operator, SubType::Multiply) => ArithOp::Multiply,
        t if t.is(TokenType::Operator, SubType::Divide) => ArithOp::Divide,
        _ => return None,
    };
    c.pos += 1;
    let right = c.operand()?;
    c.end_statement()?;
    Some((
        Stmt::Arithmetic(Arithmetic {
            target,
            left,
            op,
            right,
        }),
        c,
    ))
}

/// `if ( conditions ) { body }` with an optional `else { body }`.
pub fn recognize_if(mut c: Cursor<'_>) -> Option<(Stmt, Cursor<'_>)> {
    c.expect(TokenType::Keyword, SubType::If)?;
    let condition = c.args()?;
    let body = c.body()?;

    let mut otherwise = None;
    let mut rest = c;
    if rest.expect(TokenType::Keyword, SubType::Else).is_some() {
        otherwise = Some(rest.body()?);
        c = rest;
    }

    Some((
        Stmt::If(If {
            condition,
            body,
            otherwise,
        }),
        c,
    ))
}

/// `while ( conditions ) { body }`
pub fn recognize_while(mut c: Cursor<'_>) -> Option<(Stmt, Cursor<'_>)> {
    c.expect(TokenType::Keyword, SubType::While)?;
    let condition = c.args()?;
    let body = c.body()?;
    Some((Stmt::While(While { condition, body }), c))
}

// Two-character comparison operators are adjacent single-character tokens.
const COMPARISONS: [(CompareOp, &[SubType]); 6] = [
    (CompareOp::Equal, &[SubType::Assign, SubType::Assign]),
    (CompareOp::NotEqual, &[SubType::Not, SubType::Assign]),
    (CompareOp::More, &[SubType::More]),
    (CompareOp::MoreOrEqual, &[SubType::More, SubType::Assign]),
    (CompareOp::Less, &[SubType::Less]),
    (CompareOp::LessOrEqual, &[SubType::Less, SubType::Assign]),
];

/// `operand <cmp> operand`, only valid inside a condition list.
pub fn recognize_comparison(cursor: Cursor<'_>) -> Option<(Compare, Cursor<'_>)> {
    COMPARISONS.iter().find_map(|(op, symbol)| {
        let mut c = cursor;
        let left = c.operand()?;
        for sub in symbol.iter() {
            c.operator(*sub)?;
        }
        let right = c.operand()?;
        Some((Compare { left, op: *op, right }, c))
    })
}

/// `<keyword> name ( params ) { body }`, top level only.
pub fn recognize_function(mut c: Cursor<'_>) -> Option<(FunctionDecl, Cursor<'_>)> {
    c.expect_kind(TokenType::Keyword)?;
    let name = c.identifier()?;
    let args = c.args()?;
    let body = c.body()?;
    Some((
        FunctionDecl {
            name,
            params: Vec::new(),
            args,
            body,
        },
        c,
    ))
}

/// Kind named by a declaration keyword. `bool` has no keyword.
pub fn declared_kind(sub: SubType) -> Option<ValueKind> {
    match sub {
        SubType::Integer => Some(ValueKind::Int),
        SubType::String => Some(ValueKind::Str),
        _ => None,
    }
}

/// Builds a positioned semantic error at token `idx`, falling back to the
/// last token when `idx` is past the end of the stream.
pub(crate) fn error_at(tokens: &[Token], idx: usize, message: impl Into<String>) -> StoneError {
    let (row, column) = tokens
        .get(idx)
        .or_else(|| tokens.last())
        .map_or((1, 1), |t| (t.row, t.column));
    StoneError::Semantic {
        row,
        column,
        message: message.into(),
    }
}

pub struct Parser<'t> {
    tokens: &'t [Token],
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens }
    }

    /// Splits the token stream into function declarations.
    pub fn parse(&self) -> Result<Vec<FunctionDecl>> {
        let mut cursor = Cursor::new(self.tokens, Span::new(0, self.tokens.len()));
        let mut functions = Vec::new();
        while !cursor.is_empty() {
            let Some((mut decl, next)) = recognize_function(cursor) else {
                return Err(error_at(
                    self.tokens,
                    cursor.pos(),
                    format!(
                        "expected a function declaration, found `{}`",
                        self.tokens[cursor.pos()].text
                    ),
                ));
            };
            decl.params = self.params(decl.args)?;
            functions.push(decl);
            cursor = next;
        }
        Ok(functions)
    }

    fn params(&self, span: Span) -> Result<Vec<Param>> {
        let mut c = Cursor::new(self.tokens, span);
        let mut params = Vec::new();
        while !c.is_empty() {
            let at = c.pos();
            let kind = c
                .expect_kind(TokenType::Keyword)
                .and_then(|k| declared_kind(self.tokens[k].sub));
            let name = kind.and_then(|_| c.identifier());
            match (kind, name) {
                (Some(kind), Some(name)) => params.push(Param { name, kind }),
                _ => {
                    return Err(error_at(
                        self.tokens,
                        at,
                        "expected a parameter declaration `int name` or `string name`",
                    ))
                }
            }
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn tokens(src: &str) -> Vec<Token> {
        Lexer::new(src).lex().unwrap().tokens
    }

    fn first_stmt(toks: &[Token]) -> Option<(Stmt, usize)> {
        recognize_statement(Cursor::new(toks, Span::new(0, toks.len())))
            .map(|(stmt, c)| (stmt, c.pos()))
    }

    #[test]
    fn call_wins_over_everything() {
        let toks = tokens("print(a, 1);");
        let (stmt, consumed) = first_stmt(&toks).unwrap();
        assert_eq!(consumed, toks.len());
        let Stmt::Call(call) = stmt else { panic!("expected call, got {stmt:?}") };
        assert_eq!(call.callee, 0);
        assert_eq!(call.args, Span::new(2, 4));
    }

    #[test]
    fn declaration_needs_a_value_kind() {
        let toks = tokens("int n;");
        assert!(matches!(
            first_stmt(&toks),
            Some((Stmt::Declare(VarDecl { kind: ValueKind::Int, name: 1 }), 3))
        ));
        assert!(first_stmt(&tokens("float f;")).is_none());
        assert!(first_stmt(&tokens("void v;")).is_none());
    }

    #[test]
    fn plain_and_arithmetic_assignment() {
        let toks = tokens("x = y;");
        assert!(matches!(
            first_stmt(&toks),
            Some((Stmt::Assign(Assign { target: 0, value: 2 }), 4))
        ));

        let toks = tokens("x = y * 3;");
        let (stmt, _) = first_stmt(&toks).unwrap();
        assert_eq!(
            stmt,
            Stmt::Arithmetic(Arithmetic {
                target: 0,
                left: 2,
                op: ArithOp::Multiply,
                right: 4
            })
        );
    }

    #[test]
    fn failed_match_leaves_cursor_untouched() {
        let toks = tokens("x = ;");
        let cursor = Cursor::new(&toks, Span::new(0, toks.len()));
        assert!(recognize_assignment(cursor).is_none());
        assert!(recognize_statement(cursor).is_none());
        assert_eq!(cursor.pos(), 0);
    }

    #[test]
    fn if_with_nested_bodies_and_else() {
        let toks = tokens("if (a == b) { while (a < b) { a = a + 1; } } else { a = 0; } x = 1;");
        let (stmt, consumed) = first_stmt(&toks).unwrap();
        let Stmt::If(node) = stmt else { panic!("expected if, got {stmt:?}") };
        assert_eq!(node.condition, Span::new(2, 6));
        let body_open = 7;
        assert_eq!(node.body.start, body_open + 1);
        assert_eq!(toks[node.body.end].text, "}");
        let otherwise = node.otherwise.unwrap();
        assert_eq!(toks[otherwise.start].text, "a");
        assert_eq!(toks[otherwise.end].text, "}");
        assert_eq!(toks[consumed].text, "x");
    }

    #[test]
    fn if_without_else_stops_after_body() {
        let toks = tokens("if (a < 1) { a = 1; } b = 2;");
        let (stmt, consumed) = first_stmt(&toks).unwrap();
        assert!(matches!(stmt, Stmt::If(If { otherwise: None, .. })));
        assert_eq!(toks[consumed].text, "b");
    }

    #[test]
    fn dangling_else_fails_the_if() {
        let toks = tokens("if (a < 1) { a = 1; } else a = 2;");
        assert!(first_stmt(&toks).is_none());
    }

    #[test]
    fn while_loop() {
        let toks = tokens("while (i < 3) { i = i + 1; }");
        let (stmt, consumed) = first_stmt(&toks).unwrap();
        assert!(matches!(stmt, Stmt::While(_)));
        assert_eq!(consumed, toks.len());
    }

    #[test]
    fn comparison_operators() {
        let cases = [
            ("a == b", CompareOp::Equal),
            ("a != b", CompareOp::NotEqual),
            ("a > b", CompareOp::More),
            ("a >= b", CompareOp::MoreOrEqual),
            ("a < 3", CompareOp::Less),
            ("1 <= b", CompareOp::LessOrEqual),
        ];
        for (src, expected) in cases {
            let toks = tokens(src);
            let (cmp, c) = recognize_comparison(Cursor::new(&toks, Span::new(0, toks.len())))
                .unwrap_or_else(|| panic!("no comparison in {src}"));
            assert_eq!(cmp.op, expected, "{src}");
            assert!(c.is_empty());
        }
    }

    #[test]
    fn functions_and_params() {
        let toks = tokens("void add(int a, string b) { print(a); } void main() { }");
        let functions = Parser::new(&toks).parse().unwrap();
        assert_eq!(functions.len(), 2);
        assert_eq!(toks[functions[0].name].text, "add");
        assert_eq!(functions[0].params.len(), 2);
        assert_eq!(functions[0].params[1].kind, ValueKind::Str);
        assert_eq!(toks[functions[1].name].text, "main");
        assert!(functions[1].body.is_empty());
    }

    #[test]
    fn stray_top_level_tokens_are_rejected() {
        let toks = tokens("void main() { } x = 1;");
        let err = Parser::new(&toks).parse().unwrap_err();
        assert_eq!(err.position(), Some((1, 17)));
    }

    #[test]
    fn bad_parameter_is_positioned() {
        let toks = tokens("void f(int) { }");
        let err = Parser::new(&toks).parse().unwrap_err();
        assert!(err.to_string().contains("parameter"));
    }
}
