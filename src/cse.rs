use std::io::Write;
use std::rc::Rc;

use crate::ast::{ArithOp, CompareOp, Pattern};
use crate::builtins;
use crate::environment::{EnvId, Environments};
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::st::St;
use crate::value::{Closure, Value};

/// An item on the Control stack. Most are unevaluated ST subtrees, expanded
/// on demand as they reach the top — this is the "lazy expansion" shape
/// mentioned in the design notes, as opposed to flattening the whole tree
/// into a linear instruction array up front.
enum ControlItem {
    Node(Rc<St>),
    /// Pops fn then arg off the Stack and applies one to the other.
    GammaApply,
    /// Restores `current_env` once the item below it is reached — pushed
    /// right before a lambda's body so the caller's environment comes back
    /// after the body has reduced to a single value.
    EnvRestore(EnvId),
    /// Replays a value straight onto the Stack. Used to thread an
    /// already-known value (e.g. an η-closure's own argument) through a
    /// later apply, once some other control item has produced the value it
    /// needs to be combined with.
    Value(Value),
    /// Pops a boolean off the Stack and pushes the matching branch.
    Conditional(Rc<St>, Rc<St>),
    /// Pops `n` values off the Stack (most-recent last) and pushes them back
    /// as a single tuple, in source order.
    TupleBuild(usize),
    BinOp(BinOpKind),
    UnOp(UnOpKind),
}

#[derive(Clone, Copy)]
enum BinOpKind {
    Arith(ArithOp),
    Pow,
    Compare(CompareOp),
    Or,
    And,
    Aug,
}

#[derive(Clone, Copy)]
enum UnOpKind {
    Not,
    Neg,
}

/// The Control/Stack/Environment abstract machine that reduces a
/// standardized tree to a value.
pub struct Machine<'w> {
    control: Vec<ControlItem>,
    stack: Vec<Value>,
    envs: Environments,
    current_env: EnvId,
    writer: &'w mut dyn Write,
}

impl<'w> Machine<'w> {
    pub fn new(writer: &'w mut dyn Write) -> Self {
        let mut envs = Environments::new();
        for &(name, arity) in builtins::BUILTIN_NAMES {
            envs.define(Environments::ROOT, name, Value::Builtin { name, arity, accumulated: vec![] });
        }
        envs.define(Environments::ROOT, "Y*", Value::Builtin { name: "Y*", arity: 1, accumulated: vec![] });

        Machine { control: vec![], stack: vec![], envs, current_env: Environments::ROOT, writer }
    }

    /// Reduces `program` to its final value.
    pub fn run(&mut self, program: &Rc<St>) -> Result<Value, RuntimeError> {
        self.control.push(ControlItem::Node(program.clone()));

        while let Some(item) = self.control.pop() {
            self.step(item)?;
        }

        self.stack.pop().ok_or_else(|| {
            RuntimeError::new(RuntimeErrorKind::TypeError, "program produced no value")
        })
    }

    fn step(&mut self, item: ControlItem) -> Result<(), RuntimeError> {
        match item {
            ControlItem::Value(value) => {
                self.stack.push(value);
                Ok(())
            }
            ControlItem::EnvRestore(env) => {
                self.current_env = env;
                Ok(())
            }
            ControlItem::GammaApply => {
                let arg = self.pop_stack()?;
                let fun = self.pop_stack()?;
                self.apply(fun, arg)
            }
            ControlItem::Conditional(then_branch, else_branch) => {
                match self.pop_stack()? {
                    Value::Bool(true) => self.control.push(ControlItem::Node(then_branch)),
                    Value::Bool(false) => self.control.push(ControlItem::Node(else_branch)),
                    other => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::TypeError,
                            format!("conditional guard must be a boolean, found {}", other.type_name()),
                        ))
                    }
                }
                Ok(())
            }
            ControlItem::TupleBuild(n) => {
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.pop_stack()?);
                }
                self.stack.push(Value::Tuple(items));
                Ok(())
            }
            ControlItem::BinOp(kind) => self.eval_binop(kind),
            ControlItem::UnOp(kind) => self.eval_unop(kind),
            ControlItem::Node(node) => self.eval_node(&node),
        }
    }

    fn pop_stack(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::TypeError, "stack underflow"))
    }

    fn eval_node(&mut self, node: &Rc<St>) -> Result<(), RuntimeError> {
        match node.as_ref() {
            St::Integer(n) => self.stack.push(Value::Int(*n)),
            St::Str(s) => self.stack.push(Value::Str(s.clone())),
            St::True => self.stack.push(Value::Bool(true)),
            St::False => self.stack.push(Value::Bool(false)),
            St::Nil => self.stack.push(Value::Nil),
            St::Dummy => self.stack.push(Value::Dummy),
            St::Ystar => self.stack.push(Value::Builtin { name: "Y*", arity: 1, accumulated: vec![] }),

            St::Identifier(name) => {
                let value = self.envs.get(self.current_env, name).cloned().ok_or_else(|| {
                    RuntimeError::new(
                        RuntimeErrorKind::UnboundIdentifier,
                        format!("'{name}' is not bound"),
                    )
                })?;
                self.stack.push(value);
            }

            St::Lambda(index, pattern, body) => {
                self.stack.push(Value::Closure(Rc::new(Closure {
                    index: *index,
                    pattern: pattern.clone(),
                    body: body.clone(),
                    env: self.current_env,
                })));
            }

            St::Gamma(fun, arg) => {
                self.control.push(ControlItem::GammaApply);
                self.control.push(ControlItem::Node(arg.clone()));
                self.control.push(ControlItem::Node(fun.clone()));
            }

            St::Tuple(items) => {
                self.control.push(ControlItem::TupleBuild(items.len()));
                for item in items {
                    self.control.push(ControlItem::Node(item.clone()));
                }
            }

            St::Conditional(cond, then_branch, else_branch) => {
                self.control.push(ControlItem::Conditional(then_branch.clone(), else_branch.clone()));
                self.control.push(ControlItem::Node(cond.clone()));
            }

            St::Aug(a, b) => self.push_binop(BinOpKind::Aug, a, b),
            St::Or(a, b) => self.push_binop(BinOpKind::Or, a, b),
            St::And(a, b) => self.push_binop(BinOpKind::And, a, b),
            St::Compare(op, a, b) => self.push_binop(BinOpKind::Compare(*op), a, b),
            St::Arith(op, a, b) => self.push_binop(BinOpKind::Arith(*op), a, b),
            St::Pow(a, b) => self.push_binop(BinOpKind::Pow, a, b),

            St::Not(a) => self.push_unop(UnOpKind::Not, a),
            St::Neg(a) => self.push_unop(UnOpKind::Neg, a),
        }

        Ok(())
    }

    fn push_binop(&mut self, kind: BinOpKind, lhs: &Rc<St>, rhs: &Rc<St>) {
        self.control.push(ControlItem::BinOp(kind));
        self.control.push(ControlItem::Node(rhs.clone()));
        self.control.push(ControlItem::Node(lhs.clone()));
    }

    fn push_unop(&mut self, kind: UnOpKind, operand: &Rc<St>) {
        self.control.push(ControlItem::UnOp(kind));
        self.control.push(ControlItem::Node(operand.clone()));
    }

    fn eval_unop(&mut self, kind: UnOpKind) -> Result<(), RuntimeError> {
        let operand = self.pop_stack()?;
        let result = match (kind, &operand) {
            (UnOpKind::Not, Value::Bool(b)) => Value::Bool(!b),
            (UnOpKind::Neg, Value::Int(n)) => Value::Int(-n),
            (UnOpKind::Not, other) => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::TypeError,
                    format!("'not' expects a boolean, found {}", other.type_name()),
                ))
            }
            (UnOpKind::Neg, other) => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::TypeError,
                    format!("unary '-' expects an integer, found {}", other.type_name()),
                ))
            }
        };
        self.stack.push(result);
        Ok(())
    }

    fn eval_binop(&mut self, kind: BinOpKind) -> Result<(), RuntimeError> {
        let rhs = self.pop_stack()?;
        let lhs = self.pop_stack()?;

        let result = match kind {
            BinOpKind::Arith(op) => {
                let (a, b) = (expect_int(&lhs)?, expect_int(&rhs)?);
                Value::Int(match op {
                    ArithOp::Add => a.wrapping_add(b),
                    ArithOp::Sub => a.wrapping_sub(b),
                    ArithOp::Mul => a.wrapping_mul(b),
                    ArithOp::Div => {
                        if b == 0 {
                            return Err(RuntimeError::new(RuntimeErrorKind::DivByZero, "division by zero"));
                        }
                        a / b
                    }
                })
            }
            BinOpKind::Pow => {
                let (a, b) = (expect_int(&lhs)?, expect_int(&rhs)?);
                if b < 0 {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::TypeError,
                        "'**' does not support a negative exponent",
                    ));
                }
                Value::Int(a.pow(b as u32))
            }
            // `eq`/`ne` compare any matching tagged kinds; the ordering
            // comparisons only accept Int or Str (lexicographic) operands.
            BinOpKind::Compare(CompareOp::Eq) => Value::Bool(lhs.struct_eq(&rhs)),
            BinOpKind::Compare(CompareOp::Ne) => Value::Bool(!lhs.struct_eq(&rhs)),
            BinOpKind::Compare(op) => Value::Bool(match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => match op {
                    CompareOp::Gr => a > b,
                    CompareOp::Ge => a >= b,
                    CompareOp::Ls => a < b,
                    CompareOp::Le => a <= b,
                    CompareOp::Eq | CompareOp::Ne => unreachable!(),
                },
                (Value::Str(a), Value::Str(b)) => match op {
                    CompareOp::Gr => a > b,
                    CompareOp::Ge => a >= b,
                    CompareOp::Ls => a < b,
                    CompareOp::Le => a <= b,
                    CompareOp::Eq | CompareOp::Ne => unreachable!(),
                },
                _ => {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::TypeError,
                        format!(
                            "cannot compare {} and {}",
                            lhs.type_name(),
                            rhs.type_name()
                        ),
                    ))
                }
            }),
            BinOpKind::Or => Value::Bool(expect_bool(&lhs)? || expect_bool(&rhs)?),
            BinOpKind::And => Value::Bool(expect_bool(&lhs)? && expect_bool(&rhs)?),
            BinOpKind::Aug => match lhs {
                Value::Tuple(mut items) => {
                    items.push(rhs);
                    Value::Tuple(items)
                }
                Value::Nil => Value::Tuple(vec![rhs]),
                other => {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::TypeError,
                        format!("'aug' expects a tuple on its left, found {}", other.type_name()),
                    ))
                }
            },
        };

        self.stack.push(result);
        Ok(())
    }

    /// Applies `fun` to `arg`, the single entry point every `gamma` reduces
    /// through (R3-R13 of the CSE machine).
    fn apply(&mut self, fun: Value, arg: Value) -> Result<(), RuntimeError> {
        match fun {
            Value::Closure(closure) => {
                let new_env = self.envs.child(closure.env);
                bind_pattern(&closure.pattern, arg, new_env, &mut self.envs)?;
                self.control.push(ControlItem::EnvRestore(self.current_env));
                self.control.push(ControlItem::Node(closure.body.clone()));
                self.current_env = new_env;
                Ok(())
            }

            // R13: unrolling an η-closure re-binds the recursive name to
            // itself, then re-applies the freshly produced closure to `arg`.
            Value::Eta(closure) => {
                self.control.push(ControlItem::GammaApply);
                self.control.push(ControlItem::Value(arg));
                self.apply(Value::Closure(closure.clone()), Value::Eta(closure))
            }

            Value::Builtin { name, arity, accumulated } => {
                if name == "Y*" {
                    return match arg {
                        Value::Closure(closure) => {
                            self.stack.push(Value::Eta(closure));
                            Ok(())
                        }
                        other => Err(RuntimeError::new(
                            RuntimeErrorKind::TypeError,
                            format!("Y* expects a function, found {}", other.type_name()),
                        )),
                    };
                }

                let mut next = accumulated;
                next.push(arg);

                if next.len() == arity {
                    let result = builtins::call(name, &next, self.writer).map_err(|e| {
                        e.with_trace(vec![name.to_string()])
                    })?;
                    self.stack.push(result);
                } else {
                    self.stack.push(Value::Builtin { name, arity, accumulated: next });
                }
                Ok(())
            }

            Value::Tuple(items) => match arg {
                Value::Int(i) if i >= 1 && (i as usize) <= items.len() => {
                    self.stack.push(items[(i - 1) as usize].clone());
                    Ok(())
                }
                Value::Int(i) => Err(RuntimeError::new(
                    RuntimeErrorKind::IndexError,
                    format!("tuple index {i} out of range for a tuple of length {}", items.len()),
                )),
                other => Err(RuntimeError::new(
                    RuntimeErrorKind::TypeError,
                    format!("tuple selection expects an integer index, found {}", other.type_name()),
                )),
            },

            other => Err(RuntimeError::new(
                RuntimeErrorKind::TypeError,
                format!("{} is not applicable", other.type_name()),
            )),
        }
    }
}

/// Binds `value` to `pattern` in `env`, recursively destructuring tuple
/// patterns against tuple arguments.
fn bind_pattern(
    pattern: &Pattern,
    value: Value,
    env: EnvId,
    envs: &mut Environments,
) -> Result<(), RuntimeError> {
    match pattern {
        Pattern::Id(name) => {
            envs.define(env, name, value);
            Ok(())
        }
        Pattern::Tuple(sub_patterns) => match value {
            Value::Tuple(items) if items.len() == sub_patterns.len() => {
                for (p, v) in sub_patterns.iter().zip(items) {
                    bind_pattern(p, v, env, envs)?;
                }
                Ok(())
            }
            other => Err(RuntimeError::new(
                RuntimeErrorKind::ArityError,
                format!(
                    "expected a tuple of {} elements to bind, found {}",
                    sub_patterns.len(),
                    other.type_name()
                ),
            )),
        },
    }
}

fn expect_int(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeError::new(
            RuntimeErrorKind::TypeError,
            format!("expected an integer, found {}", other.type_name()),
        )),
    }
}

fn expect_bool(value: &Value) -> Result<bool, RuntimeError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(RuntimeError::new(
            RuntimeErrorKind::TypeError,
            format!("expected a boolean, found {}", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::standardize::standardize;

    fn eval(src: &str) -> Result<Value, RuntimeError> {
        let tokens = Scanner::new(src).scan_tokens();
        let ast = Parser::new(tokens).parse().unwrap();
        let st = standardize(&ast).unwrap();
        let mut sink = Vec::new();
        let mut machine = Machine::new(&mut sink);
        machine.run(&Rc::new(st))
    }

    fn eval_with_output(src: &str) -> (Value, String) {
        let tokens = Scanner::new(src).scan_tokens();
        let ast = Parser::new(tokens).parse().unwrap();
        let st = standardize(&ast).unwrap();
        let mut sink = Vec::new();
        let value = {
            let mut machine = Machine::new(&mut sink);
            machine.run(&Rc::new(st)).unwrap()
        };
        (value, String::from_utf8(sink).unwrap())
    }

    #[test]
    fn evaluates_arithmetic() {
        let value = eval("2 + 3 * 4").unwrap();
        assert!(matches!(value, Value::Int(14)));
    }

    #[test]
    fn evaluates_let() {
        let value = eval("let x = 5 in x + 1").unwrap();
        assert!(matches!(value, Value::Int(6)));
    }

    #[test]
    fn evaluates_conditional() {
        let value = eval("3 gr 2 -> 1 | 0").unwrap();
        assert!(matches!(value, Value::Int(1)));
    }

    #[test]
    fn evaluates_recursive_factorial() {
        let value = eval("let rec fact n = n eq 0 -> 1 | n * fact (n - 1) in fact 5").unwrap();
        assert!(matches!(value, Value::Int(120)));
    }

    #[test]
    fn curries_builtin_conc() {
        let value = eval("Conc \"a\" \"b\"").unwrap();
        match value {
            Value::Str(s) => assert_eq!(s, "ab"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn tuple_selection_is_one_indexed() {
        let value = eval("(1, 2, 3) 2").unwrap();
        assert!(matches!(value, Value::Int(2)));
    }

    #[test]
    fn tuple_literal_preserves_source_order() {
        // index 2 of (1,2,3) is 2 either way round, so this checks element 1 and 3.
        let value = eval("(1, 2, 3) 1").unwrap();
        assert!(matches!(value, Value::Int(1)));
        let value = eval("(1, 2, 3) 3").unwrap();
        assert!(matches!(value, Value::Int(3)));
    }

    #[test]
    fn division_by_zero_is_runtime_error() {
        let err = eval("1 / 0").unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::DivByZero);
    }

    #[test]
    fn unbound_identifier_is_runtime_error() {
        let err = eval("y").unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UnboundIdentifier);
    }

    #[test]
    fn print_writes_to_sink() {
        let (_, out) = eval_with_output("Print 42");
        assert_eq!(out, "42\n");
    }

    #[test]
    fn string_comparison_is_lexicographic() {
        let value = eval("'abc' ls 'abd'").unwrap();
        assert!(matches!(value, Value::Bool(true)));
    }

    #[test]
    fn eq_compares_matching_kinds_structurally() {
        let value = eval("(1, 2) eq (1, 2)").unwrap();
        assert!(matches!(value, Value::Bool(true)));
    }

    #[test]
    fn tuple_pattern_destructures_simultaneous_definitions() {
        let value = eval("let a = 1 and b = 2 in a + b").unwrap();
        assert!(matches!(value, Value::Int(3)));
    }

    #[test]
    fn chained_where_clauses_all_reach_the_same_scope() {
        let value = eval("sqr_sum where sqr_sum = x ** 2 + y ** 2 where x = 3 where y = 4").unwrap();
        assert!(matches!(value, Value::Int(25)));
    }
}
