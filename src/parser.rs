use crate::ast::{ArithOp, Ast, CompareOp, Def, Pattern};
use crate::error::ParseError;
use crate::token::{Kind, Token};

type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over RPAL's grammar:
///
/// - `E`   -> `let D in E` | `fn Vb+ . E` | `Ew`
/// - `Ew`  -> `Ew where Dr` | `T` (left-associative: each `where` extends the
///            scope the previous one built, so `Db`'s own `= E` value parses
///            with `where` disabled and leaves a trailing `where` for the
///            enclosing chain)
/// - `T`   -> `Ta (',' Ta)+` | `Ta`
/// - `Ta`  -> `Ta aug Tc` | `Tc`
/// - `Tc`  -> `B -> Tc | Tc` | `B`
/// - `B`   -> `B or Bt` | `Bt`
/// - `Bt`  -> `Bt & Bs` | `Bs`
/// - `Bs`  -> `not Bp` | `Bp`
/// - `Bp`  -> `A (gr|ge|ls|le|eq|ne) A` | `A`
/// - `A`   -> `A + At` | `A - At` | `+ At` | `- At` | `At`
/// - `At`  -> `At * Af` | `At / Af` | `Af`
/// - `Af`  -> `Ap ** Af` | `Ap`
/// - `Ap`  -> `Ap @ IDENTIFIER R` | `R`
/// - `R`   -> `R Rn` | `Rn`
/// - `Rn`  -> IDENTIFIER | INTEGER | STRING | true | false | nil | dummy | '(' E ')'
/// - `D`   -> `Da within D` | `Da`
/// - `Da`  -> `Dr (and Dr)+` | `Dr`
/// - `Dr`  -> `rec Db` | `Db`
/// - `Db`  -> `Vl = E` | `IDENTIFIER Vb+ = E` | `'(' D ')'`
/// - `Vb`  -> IDENTIFIER | `'(' Vl ')'` | `'(' ')'`
/// - `Vl`  -> IDENTIFIER (',' IDENTIFIER)*
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parses the whole program: a single expression followed by end-of-file.
    pub fn parse(&mut self) -> ParseResult<Ast> {
        let ast = self.e()?;
        self.consume_kind(Kind::EndOfFile, "expect end of input after expression")?;
        Ok(ast)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == Kind::EndOfFile
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check_kind(&self, kind: Kind) -> bool {
        self.peek().kind == kind
    }

    fn check(&self, kind: Kind, lexeme: &str) -> bool {
        self.peek().kind == kind && self.peek().lexeme == lexeme
    }

    fn check_op(&self, lexeme: &str) -> bool {
        self.check(Kind::Operator, lexeme)
    }

    fn check_kw(&self, lexeme: &str) -> bool {
        self.check(Kind::Keyword, lexeme)
    }

    fn check_punct(&self, lexeme: &str) -> bool {
        self.check(Kind::Punctuation, lexeme)
    }

    fn matches(&mut self, kind: Kind, lexeme: &str) -> bool {
        if self.check(kind, lexeme) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_op(&mut self, lexeme: &str) -> bool {
        self.matches(Kind::Operator, lexeme)
    }

    fn match_kw(&mut self, lexeme: &str) -> bool {
        self.matches(Kind::Keyword, lexeme)
    }

    fn match_punct(&mut self, lexeme: &str) -> bool {
        self.matches(Kind::Punctuation, lexeme)
    }

    fn consume_kind(&mut self, kind: Kind, message: &str) -> ParseResult<&Token> {
        if self.check_kind(kind) {
            return Ok(self.advance());
        }
        Err(ParseError { token: self.peek().clone(), message: message.to_string() })
    }

    fn consume(&mut self, kind: Kind, lexeme: &str, message: &str) -> ParseResult<&Token> {
        if self.check(kind, lexeme) {
            return Ok(self.advance());
        }
        Err(ParseError { token: self.peek().clone(), message: message.to_string() })
    }

    fn consume_identifier(&mut self) -> ParseResult<String> {
        let token = self.consume_kind(Kind::Identifier, "expect identifier")?;
        Ok(token.lexeme.clone())
    }

    // ---- expressions ----

    fn e(&mut self) -> ParseResult<Ast> {
        self.e_inner(true)
    }

    /// The value half of a `Db` binding (`name = <here>`) parses with `where`
    /// disabled: a bare `where` after a definition's value belongs to the
    /// enclosing `Ew` chain, not to this definition, so `x = 3 where y = 4`
    /// inside a longer `... where x = 3 where y = 4` leaves the second
    /// `where` for `ew`'s own loop to pick up rather than nesting it inside
    /// `x`'s value.
    fn db_value(&mut self) -> ParseResult<Ast> {
        self.e_inner(false)
    }

    fn e_inner(&mut self, allow_where: bool) -> ParseResult<Ast> {
        if self.match_kw("let") {
            let def = self.d()?;
            self.consume(Kind::Keyword, "in", "expect 'in' after let definitions")?;
            let body = self.e()?;
            return Ok(Ast::Let(Box::new(def), Box::new(body)));
        }

        if self.match_kw("fn") {
            let mut params = vec![self.vb()?];
            while !self.check_op(".") {
                params.push(self.vb()?);
            }
            self.consume(Kind::Operator, ".", "expect '.' after lambda parameters")?;
            let body = self.e()?;
            return Ok(Ast::Lambda(params, Box::new(body)));
        }

        if allow_where {
            self.ew()
        } else {
            self.t()
        }
    }

    /// Left-associative: `T where Dr1 where Dr2` is `(T where Dr1) where Dr2`,
    /// each clause extending the scope the previous one built rather than
    /// nesting inside it.
    fn ew(&mut self) -> ParseResult<Ast> {
        let mut result = self.t()?;
        while self.match_kw("where") {
            let def = self.dr()?;
            result = Ast::Where(Box::new(result), Box::new(def));
        }
        Ok(result)
    }

    fn t(&mut self) -> ParseResult<Ast> {
        let mut items = vec![self.ta()?];
        while self.match_punct(",") {
            items.push(self.ta()?);
        }
        Ok(if items.len() == 1 { items.pop().unwrap() } else { Ast::Tuple(items) })
    }

    fn ta(&mut self) -> ParseResult<Ast> {
        let mut expr = self.tc()?;
        while self.match_kw("aug") {
            let rhs = self.tc()?;
            expr = Ast::Aug(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn tc(&mut self) -> ParseResult<Ast> {
        let cond = self.b()?;
        if self.match_op("->") {
            let then_branch = self.tc()?;
            self.consume(Kind::Operator, "|", "expect '|' in conditional expression")?;
            let else_branch = self.tc()?;
            return Ok(Ast::Conditional(Box::new(cond), Box::new(then_branch), Box::new(else_branch)));
        }
        Ok(cond)
    }

    fn b(&mut self) -> ParseResult<Ast> {
        let mut expr = self.bt()?;
        while self.match_kw("or") {
            let rhs = self.bt()?;
            expr = Ast::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn bt(&mut self) -> ParseResult<Ast> {
        let mut expr = self.bs()?;
        while self.match_op("&") {
            let rhs = self.bs()?;
            expr = Ast::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn bs(&mut self) -> ParseResult<Ast> {
        if self.match_kw("not") {
            return Ok(Ast::Not(Box::new(self.bp()?)));
        }
        self.bp()
    }

    fn bp(&mut self) -> ParseResult<Ast> {
        let lhs = self.a()?;

        let op = if self.match_kw("gr") || self.match_op(">") {
            Some(CompareOp::Gr)
        } else if self.match_kw("ge") || self.match_op(">=") {
            Some(CompareOp::Ge)
        } else if self.match_kw("ls") || self.match_op("<") {
            Some(CompareOp::Ls)
        } else if self.match_kw("le") || self.match_op("<=") {
            Some(CompareOp::Le)
        } else if self.match_kw("eq") {
            Some(CompareOp::Eq)
        } else if self.match_kw("ne") {
            Some(CompareOp::Ne)
        } else {
            None
        };

        match op {
            Some(op) => {
                let rhs = self.a()?;
                Ok(Ast::Compare(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn a(&mut self) -> ParseResult<Ast> {
        let mut expr = if self.match_op("+") {
            self.at_()?
        } else if self.match_op("-") {
            Ast::Neg(Box::new(self.at_()?))
        } else {
            self.at_()?
        };

        loop {
            if self.match_op("+") {
                let rhs = self.at_()?;
                expr = Ast::Arith(ArithOp::Add, Box::new(expr), Box::new(rhs));
            } else if self.match_op("-") {
                let rhs = self.at_()?;
                expr = Ast::Arith(ArithOp::Sub, Box::new(expr), Box::new(rhs));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn at_(&mut self) -> ParseResult<Ast> {
        let mut expr = self.af()?;

        loop {
            if self.match_op("*") {
                let rhs = self.af()?;
                expr = Ast::Arith(ArithOp::Mul, Box::new(expr), Box::new(rhs));
            } else if self.match_op("/") {
                let rhs = self.af()?;
                expr = Ast::Arith(ArithOp::Div, Box::new(expr), Box::new(rhs));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn af(&mut self) -> ParseResult<Ast> {
        let base = self.ap()?;
        if self.match_op("**") {
            let rhs = self.af()?;
            return Ok(Ast::Pow(Box::new(base), Box::new(rhs)));
        }
        Ok(base)
    }

    fn ap(&mut self) -> ParseResult<Ast> {
        let mut expr = self.r()?;
        while self.match_op("@") {
            let name = self.consume_identifier()?;
            let rhs = self.r()?;
            expr = Ast::At(Box::new(expr), name, Box::new(rhs));
        }
        Ok(expr)
    }

    fn r(&mut self) -> ParseResult<Ast> {
        let mut expr = self.rn()?;
        while self.can_start_rn() {
            let rhs = self.rn()?;
            expr = Ast::Gamma(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn can_start_rn(&self) -> bool {
        match self.peek().kind {
            Kind::Identifier | Kind::Integer | Kind::Str => true,
            Kind::Keyword => matches!(self.peek().lexeme.as_str(), "true" | "false" | "nil" | "dummy"),
            Kind::Punctuation => self.peek().lexeme == "(",
            _ => false,
        }
    }

    fn rn(&mut self) -> ParseResult<Ast> {
        if self.check_kind(Kind::Identifier) {
            return Ok(Ast::Identifier(self.advance().lexeme.clone()));
        }

        if self.check_kind(Kind::Integer) {
            let lexeme = self.advance().lexeme.clone();
            let value: i64 = lexeme.parse().map_err(|_| ParseError {
                token: self.previous().clone(),
                message: format!("integer literal '{lexeme}' out of range"),
            })?;
            return Ok(Ast::Integer(value));
        }

        if self.check_kind(Kind::Str) {
            return Ok(Ast::Str(self.advance().lexeme.clone()));
        }

        if self.match_kw("true") {
            return Ok(Ast::True);
        }
        if self.match_kw("false") {
            return Ok(Ast::False);
        }
        if self.match_kw("nil") {
            return Ok(Ast::Nil);
        }
        if self.match_kw("dummy") {
            return Ok(Ast::Dummy);
        }

        if self.match_punct("(") {
            let expr = self.e()?;
            self.consume(Kind::Punctuation, ")", "expect ')' after expression")?;
            return Ok(expr);
        }

        Err(ParseError { token: self.peek().clone(), message: "expect an expression".to_string() })
    }

    // ---- definitions ----

    fn d(&mut self) -> ParseResult<Def> {
        let def = self.da()?;
        if self.match_kw("within") {
            let rhs = self.d()?;
            return Ok(Def::Within(Box::new(def), Box::new(rhs)));
        }
        Ok(def)
    }

    fn da(&mut self) -> ParseResult<Def> {
        let mut defs = vec![self.dr()?];
        while self.match_kw("and") {
            defs.push(self.dr()?);
        }
        Ok(if defs.len() == 1 { defs.pop().unwrap() } else { Def::And(defs) })
    }

    fn dr(&mut self) -> ParseResult<Def> {
        if self.match_kw("rec") {
            return Ok(Def::Rec(Box::new(self.db()?)));
        }
        self.db()
    }

    fn db(&mut self) -> ParseResult<Def> {
        if self.match_punct("(") {
            let def = self.d()?;
            self.consume(Kind::Punctuation, ")", "expect ')' after definition")?;
            return Ok(def);
        }

        let name = self.consume_identifier()?;

        if self.check_punct(",") {
            let mut names = vec![name];
            while self.match_punct(",") {
                names.push(self.consume_identifier()?);
            }
            self.consume(Kind::Operator, "=", "expect '=' after tuple pattern")?;
            let value = self.db_value()?;
            let pattern = Pattern::Tuple(names.into_iter().map(Pattern::Id).collect());
            return Ok(Def::Simple(pattern, Box::new(value)));
        }

        if self.check_op("=") {
            self.advance();
            let value = self.db_value()?;
            return Ok(Def::Simple(Pattern::Id(name), Box::new(value)));
        }

        let mut params = vec![];
        while !self.check_op("=") {
            params.push(self.vb()?);
        }
        self.consume(Kind::Operator, "=", "expect '=' after function parameters")?;
        let value = self.db_value()?;
        Ok(Def::FunctionForm(name, params, Box::new(value)))
    }

    fn vb(&mut self) -> ParseResult<Pattern> {
        if self.match_punct("(") {
            if self.match_punct(")") {
                return Ok(Pattern::Tuple(vec![]));
            }
            let names = self.vl()?;
            self.consume(Kind::Punctuation, ")", "expect ')' after parameter list")?;
            return Ok(Pattern::Tuple(names));
        }

        let name = self.consume_identifier()?;
        Ok(Pattern::Id(name))
    }

    fn vl(&mut self) -> ParseResult<Vec<Pattern>> {
        let mut names = vec![Pattern::Id(self.consume_identifier()?)];
        while self.match_punct(",") {
            names.push(Pattern::Id(self.consume_identifier()?));
        }
        Ok(names)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scanner::Scanner;

    fn parse(src: &str) -> ParseResult<Ast> {
        let tokens = Scanner::new(src).scan_tokens();
        Parser::new(tokens).parse()
    }

    #[test]
    fn parses_let_in() {
        let ast = parse("let x = 1 in x").unwrap();
        assert!(matches!(ast, Ast::Let(_, _)));
    }

    #[test]
    fn parses_lambda_with_multiple_params() {
        let ast = parse("fn x y . x + y").unwrap();
        match ast {
            Ast::Lambda(params, _) => assert_eq!(params.len(), 2),
            _ => panic!("expected lambda"),
        }
    }

    #[test]
    fn parses_left_assoc_application() {
        let ast = parse("f x y").unwrap();
        match ast {
            Ast::Gamma(fun, arg) => {
                assert!(matches!(*arg, Ast::Identifier(ref s) if s == "y"));
                assert!(matches!(*fun, Ast::Gamma(_, _)));
            }
            _ => panic!("expected gamma"),
        }
    }

    #[test]
    fn parses_conditional() {
        let ast = parse("x gr 0 -> 1 | 0").unwrap();
        assert!(matches!(ast, Ast::Conditional(_, _, _)));
    }

    #[test]
    fn parses_function_form_definition() {
        let ast = parse("let f x = x + 1 in f 2").unwrap();
        match ast {
            Ast::Let(def, _) => match *def {
                Def::FunctionForm(name, params, _) => {
                    assert_eq!(name, "f");
                    assert_eq!(params.len(), 1);
                }
                _ => panic!("expected function_form def"),
            },
            _ => panic!("expected let"),
        }
    }

    #[test]
    fn parses_tuple_pattern_definition() {
        let ast = parse("let a, b = 1, 2 in a").unwrap();
        match ast {
            Ast::Let(def, _) => assert!(matches!(*def, Def::Simple(Pattern::Tuple(_), _))),
            _ => panic!("expected let"),
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("1 2 )").is_err());
    }

    #[test]
    fn chained_where_is_left_associative() {
        // `(sqr_sum where x = 3) where y = 4`, not `sqr_sum where (x = 3 where y = 4)`.
        let ast = parse("sqr_sum where x = 3 where y = 4").unwrap();
        match ast {
            Ast::Where(outer_body, outer_def) => {
                assert!(matches!(*outer_def, Def::Simple(Pattern::Id(ref n), _) if n == "y"));
                match *outer_body {
                    Ast::Where(inner_body, inner_def) => {
                        assert!(matches!(*inner_def, Def::Simple(Pattern::Id(ref n), _) if n == "x"));
                        assert!(matches!(*inner_body, Ast::Identifier(ref n) if n == "sqr_sum"));
                    }
                    _ => panic!("expected inner where"),
                }
            }
            _ => panic!("expected outer where"),
        }
    }
}
