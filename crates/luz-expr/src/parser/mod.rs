//! Token-body lexer and parser.
//!
//! The grammar is small enough that a hand-written lexer plus a binding-power (Pratt) parser
//! covers it:
//!
//! ```text
//! statement  := NAME '=' expression | expression
//! expression := expression ('+' | '-') expression
//!             | expression ('*' | '/') expression
//!             | '-' expression
//!             | ('UP' | 'DOWN') '(' expression ')'
//!             | '(' expression ')'
//!             | NUMBER | TIME | NAME
//! ```

use crate::ast::{
    BinaryExpr, BinaryOp, Expr, ParseError, RoundExpr, Rounding, Span, Statement, UnaryExpr,
    UnaryOp,
};
use crate::value::TimeOfDay;

/// Token bodies come from a single document paragraph; anything this long is not a template
/// expression and would only risk deep recursion.
const MAX_EXPRESSION_CHARS: usize = 4_096;
const MAX_NESTING: usize = 64;

const UNARY_BP: u8 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Number(i64),
    Time(TimeOfDay),
    Ident(String),
    Up,
    Down,
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eof,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number `{n}`"),
            TokenKind::Time(t) => format!("time `{t}`"),
            TokenKind::Ident(name) => format!("name `{name}`"),
            TokenKind::Up => "`UP`".to_string(),
            TokenKind::Down => "`DOWN`".to_string(),
            TokenKind::Eq => "`=`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Slash => "`/`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::Eof => "end of expression".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Parse one token body (the text between `{{` and `}}`).
pub fn parse_statement(src: &str) -> Result<Statement, ParseError> {
    let char_len = src.chars().count();
    if char_len > MAX_EXPRESSION_CHARS {
        return Err(ParseError::new(
            format!(
                "expression exceeds the {MAX_EXPRESSION_CHARS}-character limit (got {char_len})"
            ),
            Span::new(0, src.len()),
        ));
    }

    let tokens = lex(src)?;
    let mut parser = Parser::new(src, tokens);
    let stmt = parser.parse_statement()?;
    parser.expect(TokenKind::Eof)?;
    Ok(stmt)
}

/// Split a token body into tokens. The returned vector always ends with [`TokenKind::Eof`].
pub fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src).lex()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    idx: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars(),
            idx: 0,
            tokens: Vec::new(),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(ch) = self.peek_char() {
            let start = self.idx;
            match ch {
                c if c.is_whitespace() || is_bidi_control(c) => {
                    self.bump();
                }
                '=' => self.single(TokenKind::Eq),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                c if c.is_ascii_digit() => {
                    let kind = self.lex_number_or_time()?;
                    self.push(kind, start, self.idx);
                }
                c if c == '_' || unicode_ident::is_xid_start(c) => {
                    let ident = self.take_while(unicode_ident::is_xid_continue);
                    let kind = match Rounding::from_keyword(&ident) {
                        Some(Rounding::Up) => TokenKind::Up,
                        Some(Rounding::Down) => TokenKind::Down,
                        None => TokenKind::Ident(ident),
                    };
                    self.push(kind, start, self.idx);
                }
                other => {
                    return Err(ParseError::new(
                        format!("unexpected character `{other}`"),
                        Span::new(start, start + other.len_utf8()),
                    ));
                }
            }
        }

        let end = self.src.len();
        self.push(TokenKind::Eof, end, end);
        Ok(self.tokens)
    }

    fn lex_number_or_time(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.idx;
        let digits = self.take_while(|c| c.is_ascii_digit());

        if self.peek_char() == Some(':') {
            self.bump();
            let minutes = self.take_while(|c| c.is_ascii_digit());
            let raw = &self.src[start..self.idx];
            return TimeOfDay::parse_hhmm(raw)
                .map(TokenKind::Time)
                .ok_or_else(|| {
                    ParseError::new(
                        format!("invalid time `{digits}:{minutes}` (expected HH:MM between 00:00 and 23:59)"),
                        Span::new(start, self.idx),
                    )
                });
        }

        digits.parse::<i64>().map(TokenKind::Number).map_err(|_| {
            ParseError::new(
                format!("number `{digits}` is out of range"),
                Span::new(start, self.idx),
            )
        })
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.idx;
        self.bump();
        self.push(kind, start, self.idx);
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.idx += ch.len_utf8();
        Some(ch)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn take_while<F>(&mut self, mut pred: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut out = String::new();
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.bump();
            out.push(ch);
        }
        out
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let target = match (self.peek_kind(), self.peek_kind_at(1)) {
            (TokenKind::Ident(name), Some(TokenKind::Eq)) => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = target {
            self.next(); // name
            self.next(); // `=`
            let value = self.parse_expression(0)?;
            return Ok(Statement::Assign { name, value });
        }
        Ok(Statement::Expr(self.parse_expression(0)?))
    }

    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.next(); // consume operator
            let rhs = self.parse_expression(r_bp)?;
            lhs = Expr::Binary(BinaryExpr {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            });
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.next();
                Ok(Expr::Number(n))
            }
            TokenKind::Time(t) => {
                self.next();
                Ok(Expr::Time(t))
            }
            TokenKind::Ident(name) => {
                self.next();
                Ok(Expr::Name(name))
            }
            TokenKind::Minus => {
                self.next();
                let expr = self.nested(|p| p.parse_expression(UNARY_BP))?;
                Ok(Expr::Unary(UnaryExpr {
                    op: UnaryOp::Minus,
                    expr: Box::new(expr),
                }))
            }
            TokenKind::LParen => {
                self.next();
                let expr = self.nested(|p| p.parse_expression(0))?;
                self.expect_closing_paren(span)?;
                Ok(expr)
            }
            kind @ (TokenKind::Up | TokenKind::Down) => {
                let func = if kind == TokenKind::Up {
                    Rounding::Up
                } else {
                    Rounding::Down
                };
                self.next();
                let open = self.current_span();
                if !matches!(self.peek_kind(), TokenKind::LParen) {
                    return Err(ParseError::new(
                        format!("expected `(` after `{}`", func.keyword()),
                        open,
                    ));
                }
                self.next();
                let arg = self.nested(|p| p.parse_expression(0))?;
                self.expect_closing_paren(open)?;
                Ok(Expr::Round(RoundExpr {
                    func,
                    arg: Box::new(arg),
                }))
            }
            other => Err(ParseError::new(
                format!("unexpected {}", other.describe()),
                span,
            )),
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                format!("expression nesting exceeds the {MAX_NESTING}-level limit"),
                self.current_span(),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth = self.depth.saturating_sub(1);
        result
    }

    fn expect_closing_paren(&mut self, open: Span) -> Result<(), ParseError> {
        if matches!(self.peek_kind(), TokenKind::RParen) {
            self.next();
            return Ok(());
        }
        Err(ParseError::new(
            format!(
                "unmatched `(` opened at {}; found {}",
                open.start,
                self.peek_kind().describe()
            ),
            self.current_span(),
        ))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(&kind) {
            self.next();
            Ok(())
        } else {
            Err(ParseError::new(
                format!(
                    "expected {}, found {}",
                    kind.describe(),
                    self.peek_kind().describe()
                ),
                self.current_span(),
            ))
        }
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn next(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        // Stay parked on `Eof`.
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| Span::new(self.src.len(), self.src.len()))
    }
}

/// Directional marks that right-to-left editors sprinkle around Hebrew text. They carry no
/// meaning inside an expression.
fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{200E}' | '\u{200F}' | '\u{061C}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Mul | BinaryOp::Div => (40, 41),
        BinaryOp::Add | BinaryOp::Sub => (30, 31),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn time(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn lexes_times_numbers_and_names() {
        let kinds: Vec<TokenKind> = lex("enter_time+10 * 19:05")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident("enter_time".to_string()),
                TokenKind::Plus,
                TokenKind::Number(10),
                TokenKind::Star,
                TokenKind::Time(time(19, 5)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_hebrew_identifiers() {
        let tokens = lex("צאת_שבת - 5").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("צאת_שבת".to_string()));
        assert_eq!(tokens[0].span, Span::new(0, "צאת_שבת".len()));
    }

    #[test]
    fn skips_directional_marks() {
        let tokens = lex("\u{200F}exit_time\u{200F} + 5").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("exit_time".to_string()));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let stmt = parse_statement("a + b * 2").unwrap();
        assert_eq!(
            stmt,
            Statement::Expr(Expr::Binary(BinaryExpr {
                op: BinaryOp::Add,
                left: name("a"),
                right: Box::new(Expr::Binary(BinaryExpr {
                    op: BinaryOp::Mul,
                    left: name("b"),
                    right: Box::new(Expr::Number(2)),
                })),
            }))
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let stmt = parse_statement("10 - 3 - 2").unwrap();
        assert_eq!(stmt.to_string(), "((10 - 3) - 2)");
    }

    #[test]
    fn unary_minus_binds_tightest() {
        assert_eq!(parse_statement("-a * 2").unwrap().to_string(), "(-a * 2)");
        assert_eq!(parse_statement("--3").unwrap().to_string(), "--3");
    }

    #[test]
    fn parses_assignment_of_time_and_expression() {
        assert_eq!(
            parse_statement("enter_time = 21:00").unwrap(),
            Statement::Assign {
                name: "enter_time".to_string(),
                value: Expr::Time(time(21, 0)),
            }
        );
        assert_eq!(
            parse_statement("y=10+x+60*(3+5)").unwrap().to_string(),
            "y = ((10 + x) + (60 * (3 + 5)))"
        );
    }

    #[test]
    fn parses_rounding_functions() {
        assert_eq!(
            parse_statement("UP(exit_time + 3)").unwrap().to_string(),
            "UP((exit_time + 3))"
        );
        assert_eq!(
            parse_statement("DOWN( UP(x) )").unwrap().to_string(),
            "DOWN(UP(x))"
        );
    }

    #[test]
    fn rejects_unmatched_parenthesis() {
        let err = parse_statement("(a + 1").unwrap_err();
        assert!(err.message.contains("unmatched `(`"), "{err}");
        let err = parse_statement("a + 1)").unwrap_err();
        assert!(err.message.contains("expected end of expression"), "{err}");
    }

    #[test]
    fn rejects_reserved_keyword_used_as_name() {
        let err = parse_statement("UP + 1").unwrap_err();
        assert!(err.message.contains("expected `(` after `UP`"), "{err}");
        assert!(parse_statement("UP = 3").is_err());
    }

    #[test]
    fn rejects_bad_times_and_characters() {
        let err = parse_statement("24:00").unwrap_err();
        assert!(err.message.contains("invalid time"), "{err}");
        assert_eq!(err.span, Span::new(0, 5));

        let err = parse_statement("a % 2").unwrap_err();
        assert_eq!(err.span, Span::new(2, 3));
    }

    #[test]
    fn rejects_empty_body_and_dangling_operator() {
        assert!(parse_statement("").is_err());
        assert!(parse_statement("   ").is_err());
        assert!(parse_statement("a +").is_err());
        assert!(parse_statement("= 3").is_err());
    }

    #[test]
    fn rejects_number_overflow() {
        let err = parse_statement("99999999999999999999").unwrap_err();
        assert!(err.message.contains("out of range"), "{err}");
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        let err = parse_statement(&deep).unwrap_err();
        assert!(err.message.contains("nesting"), "{err}");
    }
}
