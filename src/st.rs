use std::rc::Rc;

use crate::ast::{ArithOp, CompareOp, Pattern};

/// A standardized-tree node. Unlike the AST, the only binder left after
/// standardization is `Lambda` — `let`, `where`, `within`, `and` and `rec`
/// have all been rewritten into combinations of `Gamma`/`Lambda`/`Ystar`.
///
/// Children are kept behind `Rc` rather than `Box`: a closure value captures
/// its lambda's body by cloning the `Rc`, not the subtree, which matters
/// because a recursive function creates one closure per application.
///
/// Each `Lambda` carries a unique index, assigned during standardization, used
/// purely to label closures for diagnostics (e.g. a stack trace naming which
/// lambda is being applied); the CSE machine does not use it for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum St {
    Gamma(Rc<St>, Rc<St>),
    Lambda(usize, Pattern, Rc<St>),
    /// The fixed-point combinator, introduced by standardizing `rec`.
    Ystar,
    Tuple(Vec<Rc<St>>),
    Aug(Rc<St>, Rc<St>),
    Conditional(Rc<St>, Rc<St>, Rc<St>),
    Or(Rc<St>, Rc<St>),
    And(Rc<St>, Rc<St>),
    Not(Rc<St>),
    Compare(CompareOp, Rc<St>, Rc<St>),
    Arith(ArithOp, Rc<St>, Rc<St>),
    Neg(Rc<St>),
    Pow(Rc<St>, Rc<St>),
    Identifier(String),
    Integer(i64),
    Str(String),
    True,
    False,
    Nil,
    Dummy,
}

impl St {
    /// Renders the tree in the same pre-order, dot-indented-by-depth format
    /// as `Ast::print_tree`, for the `-st` flag.
    pub fn print_tree(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = ".".repeat(depth);
        match self {
            St::Gamma(fun, arg) => {
                out.push_str(&format!("{indent}gamma\n"));
                fun.write(out, depth + 1);
                arg.write(out, depth + 1);
            }
            St::Lambda(index, pattern, body) => {
                out.push_str(&format!("{indent}lambda({index})\n"));
                write_pattern(pattern, out, depth + 1);
                body.write(out, depth + 1);
            }
            St::Ystar => out.push_str(&format!("{indent}<Y*>\n")),
            St::Tuple(items) => {
                out.push_str(&format!("{indent}tau\n"));
                for item in items {
                    item.write(out, depth + 1);
                }
            }
            St::Aug(a, b) => {
                out.push_str(&format!("{indent}aug\n"));
                a.write(out, depth + 1);
                b.write(out, depth + 1);
            }
            St::Conditional(cond, t, e) => {
                out.push_str(&format!("{indent}->\n"));
                cond.write(out, depth + 1);
                t.write(out, depth + 1);
                e.write(out, depth + 1);
            }
            St::Or(a, b) => {
                out.push_str(&format!("{indent}or\n"));
                a.write(out, depth + 1);
                b.write(out, depth + 1);
            }
            St::And(a, b) => {
                out.push_str(&format!("{indent}&\n"));
                a.write(out, depth + 1);
                b.write(out, depth + 1);
            }
            St::Not(a) => {
                out.push_str(&format!("{indent}not\n"));
                a.write(out, depth + 1);
            }
            St::Compare(op, a, b) => {
                out.push_str(&format!("{indent}{}\n", compare_label(*op)));
                a.write(out, depth + 1);
                b.write(out, depth + 1);
            }
            St::Arith(op, a, b) => {
                out.push_str(&format!("{indent}{}\n", arith_label(*op)));
                a.write(out, depth + 1);
                b.write(out, depth + 1);
            }
            St::Neg(a) => {
                out.push_str(&format!("{indent}neg\n"));
                a.write(out, depth + 1);
            }
            St::Pow(a, b) => {
                out.push_str(&format!("{indent}**\n"));
                a.write(out, depth + 1);
                b.write(out, depth + 1);
            }
            St::Identifier(name) => out.push_str(&format!("{indent}<ID:{name}>\n")),
            St::Integer(n) => out.push_str(&format!("{indent}<INT:{n}>\n")),
            St::Str(s) => out.push_str(&format!("{indent}<STR:'{s}'>\n")),
            St::True => out.push_str(&format!("{indent}<true>\n")),
            St::False => out.push_str(&format!("{indent}<false>\n")),
            St::Nil => out.push_str(&format!("{indent}<nil>\n")),
            St::Dummy => out.push_str(&format!("{indent}<dummy>\n")),
        }
    }
}

fn write_pattern(pattern: &Pattern, out: &mut String, depth: usize) {
    let indent = ".".repeat(depth);
    match pattern {
        Pattern::Id(name) => out.push_str(&format!("{indent}<ID:{name}>\n")),
        Pattern::Tuple(items) => {
            out.push_str(&format!("{indent},\n"));
            for item in items {
                write_pattern(item, out, depth + 1);
            }
        }
    }
}

fn compare_label(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Gr => "gr",
        CompareOp::Ge => "ge",
        CompareOp::Ls => "ls",
        CompareOp::Le => "le",
        CompareOp::Eq => "eq",
        CompareOp::Ne => "ne",
    }
}

fn arith_label(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
    }
}
