use std::rc::Rc;

use crate::ast::{Ast, Def, Pattern};
use crate::error::StandardizeError;
use crate::st::St;

type StResult<T> = Result<T, StandardizeError>;

/// Rewrites an AST into a Standardized Tree whose only binder is `Lambda`.
///
/// `let`/`where` both standardize to `gamma(lambda(pattern, body), value)`;
/// a definition's "pattern, value" shape is computed uniformly by
/// [`Standardizer::def`], which handles `within`/`and`/`rec` by recursing into
/// their sub-definitions and combining the resulting pairs, rather than
/// special-casing each rule against the AST directly.
pub fn standardize(ast: &Ast) -> StResult<St> {
    let mut standardizer = Standardizer { next_index: 0 };
    standardizer.expr(ast)
}

struct Standardizer {
    next_index: usize,
}

impl Standardizer {
    fn lambda(&mut self, pattern: Pattern, body: St) -> St {
        let index = self.next_index;
        self.next_index += 1;
        St::Lambda(index, pattern, Rc::new(body))
    }

    /// Standardizes a definition down to the `(binder pattern, value)` pair
    /// that every standardized `let`/`where` wraps in `gamma(lambda(P,_),_)`.
    fn def(&mut self, def: &Def) -> StResult<(Pattern, St)> {
        match def {
            Def::Simple(pattern, value) => Ok((pattern.clone(), self.expr(value)?)),

            // function_form(f, V1..Vn, E)  =>  =(f, lambda(V1, lambda(V2, ... lambda(Vn, E))))
            Def::FunctionForm(name, params, value) => {
                let mut body = self.expr(value)?;
                for param in params.iter().rev() {
                    body = self.lambda(param.clone(), body);
                }
                Ok((Pattern::Id(name.clone()), body))
            }

            // rec Db  =>  pattern stays Db's, value becomes gamma(Y*, lambda(pattern, value))
            Def::Rec(inner) => {
                let (pattern, value) = self.def(inner)?;
                let fixpoint_body = self.lambda(pattern.clone(), value);
                Ok((pattern, St::Gamma(Rc::new(St::Ystar), Rc::new(fixpoint_body))))
            }

            // Dr and Dr ...  =>  pattern becomes the tuple of patterns, value the tuple of values
            Def::And(defs) => {
                let mut patterns = Vec::with_capacity(defs.len());
                let mut values = Vec::with_capacity(defs.len());
                for d in defs {
                    let (p, v) = self.def(d)?;
                    patterns.push(p);
                    values.push(v);
                }
                Ok((Pattern::Tuple(patterns), St::Tuple(values.into_iter().map(Rc::new).collect())))
            }

            // Da within D  =>  D's pattern, value = gamma(lambda(Da's pattern, D's value), Da's value)
            Def::Within(outer, inner) => {
                let (outer_pattern, outer_value) = self.def(outer)?;
                let (inner_pattern, inner_value) = self.def(inner)?;
                let wrapped = self.lambda(outer_pattern, inner_value);
                Ok((inner_pattern, St::Gamma(Rc::new(wrapped), Rc::new(outer_value))))
            }
        }
    }

    fn expr(&mut self, ast: &Ast) -> StResult<St> {
        Ok(match ast {
            Ast::Let(def, body) => {
                let (pattern, value) = self.def(def)?;
                let body = self.expr(body)?;
                let bound = self.lambda(pattern, body);
                St::Gamma(Rc::new(bound), Rc::new(value))
            }

            Ast::Where(body, def) => {
                let (pattern, value) = self.def(def)?;
                let body = self.expr(body)?;
                let bound = self.lambda(pattern, body);
                St::Gamma(Rc::new(bound), Rc::new(value))
            }

            Ast::Lambda(params, body) => {
                let mut body = self.expr(body)?;
                for param in params.iter().rev() {
                    body = self.lambda(param.clone(), body);
                }
                body
            }

            Ast::Tuple(items) => St::Tuple(
                items.iter().map(|i| self.expr(i).map(Rc::new)).collect::<StResult<_>>()?,
            ),

            Ast::Aug(a, b) => St::Aug(Rc::new(self.expr(a)?), Rc::new(self.expr(b)?)),

            Ast::Conditional(c, t, e) => {
                St::Conditional(Rc::new(self.expr(c)?), Rc::new(self.expr(t)?), Rc::new(self.expr(e)?))
            }

            Ast::Or(a, b) => St::Or(Rc::new(self.expr(a)?), Rc::new(self.expr(b)?)),
            Ast::And(a, b) => St::And(Rc::new(self.expr(a)?), Rc::new(self.expr(b)?)),
            Ast::Not(a) => St::Not(Rc::new(self.expr(a)?)),
            Ast::Compare(op, a, b) => St::Compare(*op, Rc::new(self.expr(a)?), Rc::new(self.expr(b)?)),
            Ast::Arith(op, a, b) => St::Arith(*op, Rc::new(self.expr(a)?), Rc::new(self.expr(b)?)),
            Ast::Neg(a) => St::Neg(Rc::new(self.expr(a)?)),
            Ast::Pow(a, b) => St::Pow(Rc::new(self.expr(a)?), Rc::new(self.expr(b)?)),

            // `Ap @ N R`  standardizes to `gamma(gamma(N, Ap), R)`: N applied to Ap, then to R.
            Ast::At(a, name, b) => St::Gamma(
                Rc::new(St::Gamma(Rc::new(St::Identifier(name.clone())), Rc::new(self.expr(a)?))),
                Rc::new(self.expr(b)?),
            ),

            Ast::Gamma(fun, arg) => St::Gamma(Rc::new(self.expr(fun)?), Rc::new(self.expr(arg)?)),

            Ast::Identifier(name) => St::Identifier(name.clone()),
            Ast::Integer(n) => St::Integer(*n),
            Ast::Str(s) => St::Str(s.clone()),
            Ast::True => St::True,
            Ast::False => St::False,
            Ast::Nil => St::Nil,
            Ast::Dummy => St::Dummy,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn standardize_src(src: &str) -> St {
        let tokens = Scanner::new(src).scan_tokens();
        let ast = Parser::new(tokens).parse().unwrap();
        standardize(&ast).unwrap()
    }

    #[test]
    fn let_becomes_gamma_lambda() {
        let st = standardize_src("let x = 1 in x");
        assert!(matches!(st, St::Gamma(_, _)));
    }

    #[test]
    fn where_becomes_gamma_lambda() {
        let st = standardize_src("x where x = 1");
        assert!(matches!(st, St::Gamma(_, _)));
    }

    #[test]
    fn rec_introduces_ystar() {
        let st = standardize_src("let rec f x = f x in f");
        match st {
            St::Gamma(lambda, value) => {
                assert!(matches!(lambda.as_ref(), St::Lambda(_, _, _)));
                assert!(matches!(value.as_ref(), St::Gamma(y, _) if matches!(y.as_ref(), St::Ystar)));
            }
            _ => panic!("expected gamma"),
        }
    }

    #[test]
    fn and_becomes_tuple_pattern_and_tuple_value() {
        let st = standardize_src("let a = 1 and b = 2 in a");
        match st {
            St::Gamma(lambda, value) => {
                match lambda.as_ref() {
                    St::Lambda(_, Pattern::Tuple(patterns), _) => assert_eq!(patterns.len(), 2),
                    _ => panic!("expected tuple pattern lambda"),
                }
                assert!(matches!(value.as_ref(), St::Tuple(items) if items.len() == 2));
            }
            _ => panic!("expected gamma"),
        }
    }

    #[test]
    fn multi_param_lambda_curries() {
        let st = standardize_src("fn x y . x");
        match st {
            St::Lambda(_, Pattern::Id(x), body) => {
                assert_eq!(x, "x");
                assert!(matches!(body.as_ref(), St::Lambda(_, _, _)));
            }
            _ => panic!("expected curried lambda"),
        }
    }
}
