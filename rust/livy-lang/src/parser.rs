//! Recursive-descent parser with APL's right-to-left evaluation order.
//!
//! There is no precedence among operators: the single expression routine
//! accumulates atoms left to right, and the first operator it meets consumes
//! everything to its right as the operand. Zero accumulated atoms make a
//! monadic application, one makes a dyadic application, and two or more form
//! a vector literal on the left of a dyadic application.

use std::rc::Rc;

use thiserror::Error;

use crate::ast::{AssignTarget, DefNode, Expr, OpSpec};
use crate::tokens::{Keyword, Token, TokenKind};
use livy_core::Error as CoreError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found} at byte {pos}")]
    Unexpected {
        expected: String,
        found: String,
        pos: usize,
    },
    #[error("cannot assign to {found} at byte {pos}")]
    CannotAssign { found: String, pos: usize },
}

impl ParseError {
    pub fn pos(&self) -> usize {
        match self {
            ParseError::Unexpected { pos, .. } | ParseError::CannotAssign { pos, .. } => *pos,
        }
    }
}

impl From<ParseError> for CoreError {
    fn from(e: ParseError) -> CoreError {
        match e {
            ParseError::Unexpected {
                expected,
                found,
                pos,
            } => CoreError::Parse {
                expected,
                found,
                pos,
            },
            ParseError::CannotAssign { found, pos } => CoreError::Parse {
                expected: "assignable variable or subscript".into(),
                found,
                pos,
            },
        }
    }
}

/// Parse one source line (a sequence of statements) into a `Seq` node.
/// The token stream must end with the `End` marker `tokenize` appends.
pub fn parse_line(tokens: &[Token]) -> Result<Expr, ParseError> {
    let p = Parser { tokens };
    let (seq, i) = p.parse_seq(0)?;
    match p.kind(i) {
        TokenKind::End => Ok(seq),
        other => Err(p.unexpected(i, "end of input", other)),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
}

impl<'t> Parser<'t> {
    fn kind(&self, i: usize) -> &TokenKind {
        self.tokens
            .get(i)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::End)
    }

    fn pos(&self, i: usize) -> usize {
        self.tokens.get(i).map(|t| t.pos).unwrap_or(0)
    }

    fn unexpected(&self, i: usize, expected: &str, found: &TokenKind) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: found.to_string(),
            pos: self.pos(i),
        }
    }

    /// True for tokens that end a statement sequence.
    fn ends_seq(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::End
                | TokenKind::CloseBrace
                | TokenKind::Keyword(
                    Keyword::Then
                        | Keyword::Elif
                        | Keyword::Else
                        | Keyword::Fi
                        | Keyword::Do
                        | Keyword::Done
                )
        )
    }

    fn parse_seq(&self, mut i: usize) -> Result<(Expr, usize), ParseError> {
        let mut vec = Vec::new();
        loop {
            if Self::ends_seq(self.kind(i)) {
                return Ok((Expr::Seq(vec), i));
            }
            if *self.kind(i) == TokenKind::Semi {
                i += 1;
                continue;
            }
            let (expr, j) = self.parse_expr(i)?;
            vec.push(expr);
            i = j;
            match self.kind(i) {
                TokenKind::Semi => i += 1,
                kind if Self::ends_seq(kind) => return Ok((Expr::Seq(vec), i)),
                other => return Err(self.unexpected(i, "';' or end of statement", other)),
            }
        }
    }

    fn parse_expr(&self, mut i: usize) -> Result<(Expr, usize), ParseError> {
        let mut vec: Vec<Expr> = Vec::new();
        loop {
            match self.kind(i) {
                TokenKind::Keyword(kw) => match kw {
                    Keyword::Break => {
                        vec.push(Expr::Break);
                        i += 1;
                    }
                    Keyword::Continue => {
                        vec.push(Expr::Continue);
                        i += 1;
                    }
                    Keyword::Def => {
                        let (def, j) = self.parse_def(i + 1)?;
                        vec.push(def);
                        i = j;
                    }
                    Keyword::If => {
                        let (cond, j) = self.parse_if(i + 1)?;
                        vec.push(cond);
                        i = j;
                    }
                    Keyword::While => {
                        let (whl, j) = self.parse_while(i + 1)?;
                        vec.push(whl);
                        i = j;
                    }
                    Keyword::Then
                    | Keyword::Elif
                    | Keyword::Else
                    | Keyword::Fi
                    | Keyword::Do
                    | Keyword::Done => break,
                },
                TokenKind::End
                | TokenKind::Close
                | TokenKind::CloseBracket
                | TokenKind::Semi
                | TokenKind::CloseBrace => break,
                TokenKind::OpenBracket | TokenKind::OpenBrace => {
                    return Err(self.unexpected(i, "an expression", self.kind(i)));
                }
                TokenKind::Operator(_)
                | TokenKind::Reduce(_)
                | TokenKind::Scan(_)
                | TokenKind::Each(_)
                | TokenKind::Inner(_, _)
                | TokenKind::Outer(_) => {
                    return self.parse_application(vec, i);
                }
                TokenKind::Number(x) => {
                    vec.push(Expr::number(*x));
                    i += 1;
                }
                TokenKind::Complex(re, im) => {
                    vec.push(Expr::Number(num_complex::Complex64::new(*re, *im)));
                    i += 1;
                }
                TokenKind::Str(s) => {
                    vec.push(Expr::Str(s.clone()));
                    i += 1;
                }
                TokenKind::Variable(name) => {
                    let var = Expr::Variable(name.clone());
                    i += 1;
                    if *self.kind(i) == TokenKind::OpenBracket {
                        let (subs, j) = self.parse_bracket(i)?;
                        vec.push(Expr::Subscript {
                            array: Box::new(var),
                            subs,
                        });
                        i = j;
                    } else {
                        vec.push(var);
                    }
                }
                TokenKind::Open => {
                    let (expr, j) = self.parse_expr(i + 1)?;
                    if *self.kind(j) != TokenKind::Close {
                        return Err(self.unexpected(j, "')'", self.kind(j)));
                    }
                    i = j + 1;
                    // Brackets may follow a parenthesised expression, as in
                    // (iota1 10)[2 4 6].
                    if *self.kind(i) == TokenKind::OpenBracket {
                        let (subs, k) = self.parse_bracket(i)?;
                        vec.push(Expr::Subscript {
                            array: Box::new(expr),
                            subs,
                        });
                        i = k;
                    } else {
                        vec.push(expr);
                    }
                }
            }
        }
        match vec.len() {
            0 => Err(self.unexpected(i, "an expression", self.kind(i))),
            1 => Ok((vec.pop().expect("len checked"), i)),
            _ => Ok((Expr::List(vec), i)),
        }
    }

    /// An operator token ends atom accumulation: parse the optional axis and
    /// the greedy right-hand side, then shape the application.
    fn parse_application(
        &self,
        mut vec: Vec<Expr>,
        i: usize,
    ) -> Result<(Expr, usize), ParseError> {
        let pos = self.pos(i);
        let op = match self.kind(i) {
            TokenKind::Operator(s) => OpSpec::Plain(s.clone()),
            TokenKind::Reduce(s) => OpSpec::Reduce(s.clone()),
            TokenKind::Scan(s) => OpSpec::Scan(s.clone()),
            TokenKind::Each(s) => OpSpec::Each(s.clone()),
            TokenKind::Inner(a, b) => OpSpec::Inner(a.clone(), b.clone()),
            TokenKind::Outer(s) => OpSpec::Outer(s.clone()),
            other => return Err(self.unexpected(i, "an operator", other)),
        };

        let mut after_op = i;
        let mut axis = None;
        if *self.kind(i + 1) == TokenKind::OpenBracket {
            let (ax, j) = self.parse_expr(i + 2)?;
            if *self.kind(j) != TokenKind::CloseBracket {
                return Err(self.unexpected(j, "']' after axis", self.kind(j)));
            }
            axis = Some(Box::new(ax));
            after_op = j;
        }

        let (b, j) = self.parse_expr(after_op + 1)?;

        if op == OpSpec::Plain("=".to_string()) {
            if axis.is_some() {
                return Err(ParseError::Unexpected {
                    expected: "assignment without an axis".into(),
                    found: "'['".into(),
                    pos,
                });
            }
            let target = match vec.pop() {
                Some(Expr::Variable(name)) if vec.is_empty() => AssignTarget::Variable(name),
                Some(Expr::Subscript { array, subs }) if vec.is_empty() => match *array {
                    Expr::Variable(name) => AssignTarget::Subscript { name, subs },
                    other => {
                        return Err(ParseError::CannotAssign {
                            found: format!("{other:?}"),
                            pos,
                        });
                    }
                },
                other => {
                    return Err(ParseError::CannotAssign {
                        found: other.map_or("nothing".to_string(), |e| format!("{e:?}")),
                        pos,
                    });
                }
            };
            return Ok((
                Expr::Assign {
                    target,
                    value: Box::new(b),
                },
                j,
            ));
        }

        let expr = match vec.len() {
            0 => Expr::Monad {
                op,
                axis,
                b: Box::new(b),
                pos,
            },
            1 => Expr::Dyad {
                a: Box::new(vec.pop().expect("len checked")),
                op,
                axis,
                b: Box::new(b),
                pos,
            },
            _ => Expr::Dyad {
                a: Box::new(Expr::List(vec)),
                op,
                axis,
                b: Box::new(b),
                pos,
            },
        };
        Ok((expr, j))
    }

    /// `[ e ; e ; … ]` — one subscript expression per axis, with empty slots
    /// meaning "all of this axis". `i` points at the opening bracket.
    fn parse_bracket(&self, mut i: usize) -> Result<(Vec<Option<Expr>>, usize), ParseError> {
        i += 1;
        let mut subs = Vec::new();
        let mut cur: Option<Expr> = None;
        loop {
            match self.kind(i) {
                TokenKind::CloseBracket => {
                    subs.push(cur.take());
                    return Ok((subs, i + 1));
                }
                TokenKind::Semi => {
                    subs.push(cur.take());
                    i += 1;
                }
                _ => {
                    let (expr, j) = self.parse_expr(i)?;
                    cur = Some(expr);
                    i = j;
                }
            }
        }
    }

    /// `IF seq THEN seq [ELIF …|ELSE seq] FI`. `i` points after `IF`/`ELIF`.
    fn parse_if(&self, i: usize) -> Result<(Expr, usize), ParseError> {
        let (cond, i) = self.parse_seq(i)?;
        let i = self.expect_keyword(i, Keyword::Then)?;
        let (then_seq, i) = self.parse_seq(i)?;
        match self.kind(i) {
            TokenKind::Keyword(Keyword::Else) => {
                let (else_seq, i) = self.parse_seq(i + 1)?;
                let i = self.expect_keyword(i, Keyword::Fi)?;
                Ok((
                    Expr::If {
                        cond: Box::new(cond),
                        then_seq: Box::new(then_seq),
                        else_seq: Some(Box::new(else_seq)),
                    },
                    i,
                ))
            }
            TokenKind::Keyword(Keyword::Elif) => {
                // The chain shares the single closing FI.
                let (nested, i) = self.parse_if(i + 1)?;
                Ok((
                    Expr::If {
                        cond: Box::new(cond),
                        then_seq: Box::new(then_seq),
                        else_seq: Some(Box::new(nested)),
                    },
                    i,
                ))
            }
            TokenKind::Keyword(Keyword::Fi) => Ok((
                Expr::If {
                    cond: Box::new(cond),
                    then_seq: Box::new(then_seq),
                    else_seq: None,
                },
                i + 1,
            )),
            other => Err(self.unexpected(i, "ELSE, ELIF, or FI", other)),
        }
    }

    /// `WHILE seq DO seq DONE`. `i` points after `WHILE`.
    fn parse_while(&self, i: usize) -> Result<(Expr, usize), ParseError> {
        let (guard, i) = self.parse_seq(i)?;
        let i = self.expect_keyword(i, Keyword::Do)?;
        let (body, i) = self.parse_seq(i)?;
        let i = self.expect_keyword(i, Keyword::Done)?;
        Ok((
            Expr::While {
                guard: Box::new(guard),
                body: Box::new(body),
            },
            i,
        ))
    }

    /// `DEF [Lhs] name [[Axis]] Rhs [; Local]* { seq }`. `i` points after
    /// `DEF`.
    fn parse_def(&self, mut i: usize) -> Result<(Expr, usize), ParseError> {
        let mut locals = Vec::new();

        let lhs = if let TokenKind::Variable(v) = self.kind(i) {
            let v = v.clone();
            locals.push(v.clone());
            i += 1;
            Some(v)
        } else {
            None
        };

        let name = match self.kind(i) {
            TokenKind::Operator(op) => op.clone(),
            other => return Err(self.unexpected(i, "an operator name after DEF", other)),
        };
        i += 1;

        let mut axis = None;
        if *self.kind(i) == TokenKind::OpenBracket {
            i += 1;
            match self.kind(i) {
                TokenKind::Variable(v) => {
                    axis = Some(v.clone());
                    locals.push(v.clone());
                    i += 1;
                }
                other => return Err(self.unexpected(i, "an axis variable", other)),
            }
            if *self.kind(i) != TokenKind::CloseBracket {
                return Err(self.unexpected(i, "']' after axis variable", self.kind(i)));
            }
            i += 1;
        }

        let rhs = match self.kind(i) {
            TokenKind::Variable(v) => v.clone(),
            other => return Err(self.unexpected(i, "a right-argument variable", other)),
        };
        locals.push(rhs.clone());
        i += 1;

        while *self.kind(i) == TokenKind::Semi {
            i += 1;
            // A trailing semicolon before the body is allowed.
            if *self.kind(i) == TokenKind::OpenBrace {
                break;
            }
            match self.kind(i) {
                TokenKind::Variable(v) => {
                    locals.push(v.clone());
                    i += 1;
                }
                other => return Err(self.unexpected(i, "a local variable name", other)),
            }
        }

        if *self.kind(i) != TokenKind::OpenBrace {
            return Err(self.unexpected(i, "'{' to open the operator body", self.kind(i)));
        }
        let (body, j) = self.parse_seq(i + 1)?;
        if *self.kind(j) != TokenKind::CloseBrace {
            return Err(self.unexpected(j, "'}' to close the operator body", self.kind(j)));
        }

        let def = DefNode {
            name,
            lhs,
            axis,
            rhs,
            locals,
            body,
        };
        Ok((Expr::Def(Rc::new(def)), j + 1))
    }

    fn expect_keyword(&self, i: usize, kw: Keyword) -> Result<usize, ParseError> {
        match self.kind(i) {
            TokenKind::Keyword(k) if *k == kw => Ok(i + 1),
            other => Err(self.unexpected(i, &format!("keyword {kw}"), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> Expr {
        parse_line(&tokenize(src).unwrap()).unwrap()
    }

    fn single(src: &str) -> Expr {
        match parse(src) {
            Expr::Seq(mut v) => {
                assert_eq!(v.len(), 1, "expected one statement");
                v.pop().unwrap()
            }
            other => panic!("expected Seq, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_atoms_form_a_vector() {
        match single("1 2 3") {
            Expr::List(v) => assert_eq!(v.len(), 3),
            other => panic!("expected List, got {other:?}"),
        }
    }

    #[test]
    fn dyadic_binds_right_to_left() {
        // 2 * 3 + 4 parses as 2 * (3 + 4).
        match single("2 * 3 + 4") {
            Expr::Dyad { op, b, .. } => {
                assert_eq!(op, OpSpec::Plain("*".into()));
                assert!(matches!(*b, Expr::Dyad { .. }));
            }
            other => panic!("expected Dyad, got {other:?}"),
        }
    }

    #[test]
    fn vector_on_the_left_of_a_dyad() {
        match single("3 3 rho 7") {
            Expr::Dyad { a, op, .. } => {
                assert_eq!(op, OpSpec::Plain("rho".into()));
                assert!(matches!(*a, Expr::List(_)));
            }
            other => panic!("expected Dyad, got {other:?}"),
        }
    }

    #[test]
    fn monadic_application() {
        match single("iota 5") {
            Expr::Monad { op, .. } => assert_eq!(op, OpSpec::Plain("iota".into())),
            other => panic!("expected Monad, got {other:?}"),
        }
    }

    #[test]
    fn axis_binds_to_the_operator() {
        match single("+/[0] 1 2 3") {
            Expr::Monad { op, axis, .. } => {
                assert_eq!(op, OpSpec::Reduce("+".into()));
                assert!(axis.is_some());
            }
            other => panic!("expected Monad, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        match single("X = Y = 5") {
            Expr::Assign { target, value } => {
                assert_eq!(target, AssignTarget::Variable("X".into()));
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn subscript_assignment_target() {
        match single("A[1;2] = 9") {
            Expr::Assign {
                target: AssignTarget::Subscript { name, subs },
                ..
            } => {
                assert_eq!(name, "A");
                assert_eq!(subs.len(), 2);
            }
            other => panic!("expected subscript Assign, got {other:?}"),
        }
    }

    #[test]
    fn empty_subscript_slot_selects_whole_axis() {
        match single("A[;2]") {
            Expr::Subscript { subs, .. } => {
                assert_eq!(subs.len(), 2);
                assert!(subs[0].is_none());
                assert!(subs[1].is_some());
            }
            other => panic!("expected Subscript, got {other:?}"),
        }
    }

    #[test]
    fn subscript_after_parens() {
        match single("(iota 10)[2 4 6]") {
            Expr::Subscript { array, subs } => {
                assert!(matches!(*array, Expr::Monad { .. }));
                assert_eq!(subs.len(), 1);
            }
            other => panic!("expected Subscript, got {other:?}"),
        }
    }

    #[test]
    fn def_header_variants() {
        match single("def sum[Axis] B { +/[Axis] B }") {
            Expr::Def(def) => {
                assert_eq!(def.name, "sum");
                assert_eq!(def.lhs, None);
                assert_eq!(def.axis, Some("Axis".into()));
                assert_eq!(def.rhs, "B");
                assert_eq!(def.locals, vec!["Axis".to_string(), "B".to_string()]);
            }
            other => panic!("expected Def, got {other:?}"),
        }
        match single("def A plus B; T { A + B }") {
            Expr::Def(def) => {
                assert_eq!(def.lhs, Some("A".into()));
                assert_eq!(def.locals, vec!["A".to_string(), "B".to_string(), "T".to_string()]);
            }
            other => panic!("expected Def, got {other:?}"),
        }
    }

    #[test]
    fn if_with_elif_desugars_to_nested_conditionals() {
        match single("if 1 then 2 elif 0 then 3 else 4 fi") {
            Expr::If { else_seq, .. } => {
                let nested = else_seq.expect("elif branch");
                assert!(matches!(*nested, Expr::If { .. }));
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn while_loop_parses() {
        match single("while N < 5 do N = N + 1 done") {
            Expr::While { .. } => {}
            other => panic!("expected While, got {other:?}"),
        }
    }

    #[test]
    fn statements_split_on_semicolons() {
        match parse("N=20; N + 1") {
            Expr::Seq(v) => assert_eq!(v.len(), 2),
            other => panic!("expected Seq, got {other:?}"),
        }
    }

    #[test]
    fn missing_close_paren_is_an_error() {
        let tokens = tokenize("(1 + 2").unwrap();
        assert!(matches!(
            parse_line(&tokens),
            Err(ParseError::Unexpected { .. })
        ));
    }

    #[test]
    fn assignment_to_expression_is_rejected() {
        let tokens = tokenize("(1 2) = 3").unwrap();
        assert!(matches!(
            parse_line(&tokens),
            Err(ParseError::CannotAssign { .. })
        ));
    }
}
