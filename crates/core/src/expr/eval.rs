//! Evaluation of expression trees.
//!
//! The same [`Evaluator`] serves two purposes: materialising closed
//! sub-trees (see [`evaluate_closed`]), and evaluating per-row expressions
//! inside a provider, where lambda variables and slot bindings are in scope.

use std::borrow::Cow;

use anyhow::{Result, bail, ensure};

use crate::cnf::MEMBERSHIP_OPERATION;
use crate::dbs::Bindings;
use crate::err::Error;
use crate::expr::{BinaryOperator, Expr, ExprArena, NodeId, PrefixOperator};
use crate::val::{Number, Value};

/// Check that the tree below `root` only depends on itself.
///
/// Parameters, tables, slots and variables which are not bound by a lambda
/// inside the same tree all refer to an outer context, and are rejected.
pub fn check_closed(arena: &ExprArena, root: NodeId) -> Result<()> {
	let mut bound = Vec::new();
	check_node(arena, root, &mut bound)
}

fn check_node<'a>(arena: &'a ExprArena, id: NodeId, bound: &mut Vec<&'a str>) -> Result<()> {
	let expr = arena.node(id)?;
	match expr {
		Expr::Param(name) | Expr::Table(name) | Expr::Slot(name) => bail!(Error::NotClosed {
			kind: expr.kind(),
			name: name.clone(),
		}),
		Expr::Var(name) if !bound.contains(&name.as_str()) => bail!(Error::NotClosed {
			kind: expr.kind(),
			name: name.clone(),
		}),
		Expr::Lambda {
			params,
			body,
		} => {
			let depth = bound.len();
			bound.extend(params.iter().map(String::as_str));
			let res = check_node(arena, *body, bound);
			bound.truncate(depth);
			res
		}
		_ => {
			for child in expr.children() {
				check_node(arena, child, bound)?;
			}
			Ok(())
		}
	}
}

/// Check and evaluate a closed expression
pub fn evaluate_closed(arena: &ExprArena, id: NodeId) -> Result<Value> {
	check_closed(arena, id)?;
	Evaluator::new(arena).evaluate(id, &Scope::default())
}

/// The lambda variables visible to an expression.
#[derive(Clone, Debug, Default)]
pub struct Scope {
	vars: Vec<(String, Value)>,
}

impl Scope {
	pub fn new() -> Self {
		Self::default()
	}

	/// A new scope where `names` are bound to `values`, shadowing outer variables
	pub fn with(&self, names: &[String], values: Vec<Value>) -> Scope {
		let mut vars = self.vars.clone();
		vars.extend(names.iter().cloned().zip(values));
		Scope {
			vars,
		}
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.vars.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
	}
}

pub struct Evaluator<'a> {
	arena: &'a ExprArena,
	bindings: Bindings<'a>,
	max_set_size: Option<usize>,
	membership: Option<&'a str>,
}

impl<'a> Evaluator<'a> {
	pub fn new(arena: &'a ExprArena) -> Self {
		Self {
			arena,
			bindings: Bindings::new(),
			max_set_size: None,
			membership: None,
		}
	}

	/// Resolve slots with the given bindings
	pub fn with_bindings(mut self, bindings: Bindings<'a>) -> Self {
		self.bindings = bindings;
		self
	}

	/// Reject membership tests against sets larger than `max`
	pub fn with_max_set_size(mut self, max: Option<usize>) -> Self {
		self.max_set_size = max;
		self
	}

	/// Also treat calls named `name` as membership tests
	pub fn with_membership(mut self, name: Option<&'a str>) -> Self {
		self.membership = name;
		self
	}

	fn is_membership(&self, name: &str) -> bool {
		is_membership(name) || self.membership == Some(name)
	}

	pub fn evaluate(&self, id: NodeId, scope: &Scope) -> Result<Value> {
		let expr = self.arena.node(id)?;
		match expr {
			Expr::Literal(v) => Ok(v.clone()),
			Expr::Array(items) => {
				let values = items.iter().map(|x| self.evaluate(*x, scope)).collect::<Result<_>>()?;
				Ok(Value::Array(values))
			}
			Expr::Object(entries) => {
				let mut object = crate::val::Object::new();
				for (k, v) in entries {
					object.insert(k.clone(), self.evaluate(*v, scope)?);
				}
				Ok(Value::Object(object))
			}
			Expr::Param(name) | Expr::Table(name) => bail!(Error::NotClosed {
				kind: expr.kind(),
				name: name.clone(),
			}),
			Expr::Var(name) => {
				scope.get(name).cloned().ok_or_else(|| Error::UnboundVariable(name.clone()).into())
			}
			Expr::Slot(name) => Ok(Value::Array(self.slot(name)?.to_vec())),
			Expr::Member {
				object,
				field,
			} => Ok(self.evaluate(*object, scope)?.pick(field)),
			Expr::Prefix {
				op,
				expr,
			} => self.prefix(*op, self.evaluate(*expr, scope)?),
			Expr::Binary {
				left,
				op,
				right,
			} => self.binary(*left, *op, *right, scope),
			Expr::Call {
				name,
				receiver,
				args,
			} => {
				// A method call passes its receiver as the first operand
				let operands: Vec<NodeId> = receiver.iter().chain(args).copied().collect();
				self.call(name, &operands, scope)
			}
			Expr::Lambda {
				..
			} => bail!(Error::Unevaluable),
		}
	}

	/// Apply a lambda node to a list of arguments
	pub fn apply(&self, lambda: NodeId, args: Vec<Value>, scope: &Scope) -> Result<Value> {
		match self.arena.node(lambda)? {
			Expr::Lambda {
				params,
				body,
			} => {
				ensure!(
					params.len() == args.len(),
					Error::InvalidOperands {
						op: "lambda".to_owned(),
						message: format!(
							"expected {} arguments, but found {}",
							params.len(),
							args.len()
						),
					}
				);
				self.evaluate(*body, &scope.with(params, args))
			}
			other => bail!(Error::InvalidOperands {
				op: "apply".to_owned(),
				message: format!("expected a lambda, but found a {}", other.kind()),
			}),
		}
	}

	fn slot(&self, name: &str) -> Result<&'a [Value]> {
		self.bindings.get(name).ok_or_else(|| Error::UnboundSlot(name.to_owned()).into())
	}

	/// Evaluate the set operand of a membership test, borrowing slot bindings
	fn set(&self, id: NodeId, scope: &Scope) -> Result<Cow<'a, [Value]>> {
		let set = match self.arena.node(id)? {
			Expr::Slot(name) => Cow::Borrowed(self.slot(name)?),
			_ => match self.evaluate(id, scope)? {
				Value::Array(values) => Cow::Owned(values),
				other => bail!(Error::NotASet {
					found: other.kind_of().to_owned(),
				}),
			},
		};
		if let Some(max) = self.max_set_size {
			ensure!(
				set.len() <= max,
				Error::SetTooLarge {
					size: set.len(),
					max,
				}
			);
		}
		Ok(set)
	}

	fn prefix(&self, op: PrefixOperator, value: Value) -> Result<Value> {
		match op {
			PrefixOperator::Not => Ok(Value::Bool(!value.is_truthy())),
			PrefixOperator::Negate => match value {
				Value::Number(n) => n.try_neg().map(Value::Number).ok_or_else(|| {
					Error::InvalidOperands {
						op: op.to_string(),
						message: "arithmetic overflow".to_owned(),
					}
					.into()
				}),
				other => bail!(Error::InvalidOperands {
					op: op.to_string(),
					message: format!("cannot negate a value of type {}", other.kind_of()),
				}),
			},
		}
	}

	fn binary(
		&self,
		left: NodeId,
		op: BinaryOperator,
		right: NodeId,
		scope: &Scope,
	) -> Result<Value> {
		let l = self.evaluate(left, scope)?;
		// Logical operators short-circuit
		match op {
			BinaryOperator::And if !l.is_truthy() => return Ok(Value::Bool(false)),
			BinaryOperator::Or if l.is_truthy() => return Ok(Value::Bool(true)),
			BinaryOperator::And | BinaryOperator::Or => {
				return Ok(Value::Bool(self.evaluate(right, scope)?.is_truthy()));
			}
			_ => {}
		}
		let r = self.evaluate(right, scope)?;
		match op {
			BinaryOperator::Add => match (l, r) {
				(Value::Strand(a), Value::Strand(b)) => Ok(Value::Strand(a + &b)),
				(Value::Array(mut a), Value::Array(b)) => {
					a.extend(b);
					Ok(Value::Array(a))
				}
				(l, r) => arithmetic(op, l, r, Number::try_add),
			},
			BinaryOperator::Subtract => arithmetic(op, l, r, Number::try_sub),
			BinaryOperator::Multiply => arithmetic(op, l, r, Number::try_mul),
			BinaryOperator::Divide => arithmetic(op, l, r, Number::try_div),
			BinaryOperator::Equal => Ok(Value::Bool(l.equal(&r))),
			BinaryOperator::NotEqual => Ok(Value::Bool(!l.equal(&r))),
			// Values of different kinds never compare as ordered
			BinaryOperator::LessThan => Ok(Value::Bool(l.compare(&r).is_some_and(|o| o.is_lt()))),
			BinaryOperator::LessThanEqual => {
				Ok(Value::Bool(l.compare(&r).is_some_and(|o| o.is_le())))
			}
			BinaryOperator::MoreThan => Ok(Value::Bool(l.compare(&r).is_some_and(|o| o.is_gt()))),
			BinaryOperator::MoreThanEqual => {
				Ok(Value::Bool(l.compare(&r).is_some_and(|o| o.is_ge())))
			}
			BinaryOperator::And | BinaryOperator::Or => {
				Err(Error::unreachable("logical operators are handled above").into())
			}
		}
	}

	fn call(&self, name: &str, operands: &[NodeId], scope: &Scope) -> Result<Value> {
		if self.is_membership(name) {
			return self.contains(name, operands, scope);
		}
		match name {
			"len" => {
				let [value] = self.operands::<1>(name, operands, scope)?;
				let len = match value {
					Value::Array(v) => v.len(),
					Value::Object(v) => v.len(),
					Value::Strand(v) => v.chars().count(),
					other => bail!(Error::InvalidOperands {
						op: name.to_owned(),
						message: format!("cannot measure a value of type {}", other.kind_of()),
					}),
				};
				Ok(Value::from(len as i64))
			}
			"range" => match self.operands::<2>(name, operands, scope)? {
				[Value::Number(Number::Int(from)), Value::Number(Number::Int(to))] => {
					Ok(Value::Array((from..to).map(Value::from).collect()))
				}
				[from, to] => bail!(Error::InvalidOperands {
					op: name.to_owned(),
					message: format!(
						"expected two integers, but found {} and {}",
						from.kind_of(),
						to.kind_of()
					),
				}),
			},
			"lower" | "upper" => match self.operands::<1>(name, operands, scope)? {
				[Value::Strand(s)] if name == "lower" => Ok(Value::Strand(s.to_lowercase())),
				[Value::Strand(s)] => Ok(Value::Strand(s.to_uppercase())),
				[other] => bail!(Error::InvalidOperands {
					op: name.to_owned(),
					message: format!("expected a string, but found {}", other.kind_of()),
				}),
			},
			_ => bail!(Error::UnknownFunction(name.to_owned())),
		}
	}

	/// `set.contains(value)`, `contains(set, value)`, optionally followed by a
	/// comparer lambda which receives an element of the set and the value
	fn contains(&self, name: &str, operands: &[NodeId], scope: &Scope) -> Result<Value> {
		let [set, value, rest @ ..] = operands else {
			bail!(Error::InvalidOperands {
				op: name.to_owned(),
				message: "expected a set and a value".to_owned(),
			});
		};
		ensure!(
			rest.len() <= 1,
			Error::InvalidOperands {
				op: name.to_owned(),
				message: format!("expected at most 3 operands, but found {}", operands.len()),
			}
		);
		let set = self.set(*set, scope)?;
		let value = self.evaluate(*value, scope)?;
		let Some(comparer) = rest.first() else {
			return Ok(Value::Bool(set.iter().any(|x| x.equal(&value))));
		};
		for x in set.iter() {
			if self.apply(*comparer, vec![x.clone(), value.clone()], scope)?.is_truthy() {
				return Ok(Value::Bool(true));
			}
		}
		Ok(Value::Bool(false))
	}

	/// Evaluate exactly `N` operands
	fn operands<const N: usize>(
		&self,
		name: &str,
		operands: &[NodeId],
		scope: &Scope,
	) -> Result<[Value; N]> {
		ensure!(
			operands.len() == N,
			Error::InvalidOperands {
				op: name.to_owned(),
				message: format!("expected {N} operands, but found {}", operands.len()),
			}
		);
		let values: Vec<Value> =
			operands.iter().map(|x| self.evaluate(*x, scope)).collect::<Result<_>>()?;
		values.try_into().map_err(|_| Error::unreachable("operand count was checked").into())
	}
}

/// Check if the named call is a membership test
pub fn is_membership(name: &str) -> bool {
	name == "contains" || name == MEMBERSHIP_OPERATION.as_str()
}

fn arithmetic(
	op: BinaryOperator,
	l: Value,
	r: Value,
	f: fn(Number, Number) -> Option<Number>,
) -> Result<Value> {
	match (l, r) {
		(Value::Number(a), Value::Number(b)) => f(a, b).map(Value::Number).ok_or_else(|| {
			Error::InvalidOperands {
				op: op.to_string(),
				message: "arithmetic overflow or division by zero".to_owned(),
			}
			.into()
		}),
		(l, r) => bail!(Error::InvalidOperands {
			op: op.to_string(),
			message: format!("cannot apply to {} and {}", l.kind_of(), r.kind_of()),
		}),
	}
}
