//! A reference [`QueryProvider`] which executes query pipelines over
//! in-memory tables.
//!
//! A pipeline is a chain of method calls on a table:
//!
//! ```text
//! person.filter(|p| p.age >= 18).map(|p| p.name).skip(10).take(5)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail, ensure};

use crate::cnf::MEMORY_MAX_SET_SIZE;
use crate::dbs::{Bindings, QueryProvider};
use crate::err::Error;
use crate::expr::display::Render;
use crate::expr::eval::{Evaluator, Scope, evaluate_closed};
use crate::expr::{Expr, NodeId, Query};
use crate::val::{Number, Value};

const TARGET: &str = "chunkq::mem";

/// A single step of a pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	/// Keep the rows for which the lambda is truthy
	Filter(NodeId),
	/// Replace each row with the result of the lambda
	Map(NodeId),
	Take(usize),
	Skip(usize),
}

/// A validated pipeline, ready to be executed
#[derive(Clone, Debug)]
pub struct MemoryPlan {
	query: Query,
	source: String,
	stages: Vec<Stage>,
}

impl MemoryPlan {
	/// The table the pipeline reads from
	pub fn source(&self) -> &str {
		&self.source
	}

	/// The stages of the pipeline, in execution order
	pub fn stages(&self) -> &[Stage] {
		&self.stages
	}
}

/// Named tables of rows, queried through [`QueryProvider`].
#[derive(Debug)]
pub struct MemoryProvider {
	tables: HashMap<String, Vec<Value>>,
	max_set_size: Option<usize>,
	membership: Option<String>,
	executions: AtomicUsize,
}

impl Default for MemoryProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryProvider {
	/// An empty provider, limiting membership sets to `CHUNKQ_MEMORY_MAX_SET_SIZE`
	pub fn new() -> Self {
		Self {
			tables: HashMap::new(),
			max_set_size: match *MEMORY_MAX_SET_SIZE {
				0 => None,
				max => Some(max),
			},
			membership: None,
			executions: AtomicUsize::new(0),
		}
	}

	pub fn with_table<V: Into<Value>>(
		mut self,
		name: impl Into<String>,
		rows: impl IntoIterator<Item = V>,
	) -> Self {
		self.insert(name, rows);
		self
	}

	/// Append rows to a table, creating it if needed
	pub fn insert<V: Into<Value>>(&mut self, name: impl Into<String>, rows: impl IntoIterator<Item = V>) {
		self.tables.entry(name.into()).or_default().extend(rows.into_iter().map(Into::into));
	}

	/// Reject membership tests against sets larger than `max`
	pub fn with_max_set_size(mut self, max: Option<usize>) -> Self {
		self.max_set_size = max;
		self
	}

	/// Evaluate calls named `name` as membership tests, in addition to
	/// `contains` and `CHUNKQ_MEMBERSHIP_OPERATION`
	pub fn with_membership(mut self, name: impl Into<String>) -> Self {
		self.membership = Some(name.into());
		self
	}

	pub fn max_set_size(&self) -> Option<usize> {
		self.max_set_size
	}

	pub fn table(&self, name: &str) -> Option<&[Value]> {
		self.tables.get(name).map(Vec::as_slice)
	}

	/// The number of executions so far
	pub fn executions(&self) -> usize {
		self.executions.load(Ordering::Relaxed)
	}

	fn rows(&self, name: &str) -> Result<&[Value]> {
		self.table(name).ok_or_else(|| Error::TableNotFound(name.to_owned()).into())
	}

	/// Parse the stage of a pipeline call
	fn stage(query: &Query, name: &str, args: &[NodeId]) -> Result<Stage> {
		let arg = match args {
			[arg] => *arg,
			_ => bail!(Error::InvalidPipeline(format!(
				"{name} expects a single argument, but found {}",
				args.len()
			))),
		};
		match name {
			"filter" => Self::lambda(query, name, arg).map(Stage::Filter),
			"map" => Self::lambda(query, name, arg).map(Stage::Map),
			"take" => Self::count(query, name, arg).map(Stage::Take),
			"skip" => Self::count(query, name, arg).map(Stage::Skip),
			_ => bail!(Error::UnsupportedOperation(name.to_owned())),
		}
	}

	fn lambda(query: &Query, name: &str, arg: NodeId) -> Result<NodeId> {
		match query.node(arg)? {
			Expr::Lambda {
				params,
				..
			} if params.len() == 1 => Ok(arg),
			_ => bail!(Error::InvalidPipeline(format!(
				"{name} expects a lambda of one parameter, but found `{}`",
				Render::new(query.arena(), arg)
			))),
		}
	}

	fn count(query: &Query, name: &str, arg: NodeId) -> Result<usize> {
		match evaluate_closed(query.arena(), arg)? {
			Value::Number(Number::Int(n)) if n >= 0 => Ok(n as usize),
			other => bail!(Error::InvalidPipeline(format!(
				"{name} expects a non-negative integer, but found {other}"
			))),
		}
	}
}

impl QueryProvider for MemoryProvider {
	type Row = Value;
	type Plan = MemoryPlan;

	fn prepare(&self, query: &Query) -> Result<MemoryPlan> {
		let mut stages = Vec::new();
		let mut id = query.root();
		// Walk the method chain down to its source table
		let source = loop {
			match query.node(id)? {
				Expr::Table(name) => break name.clone(),
				Expr::Call {
					name,
					receiver: Some(receiver),
					args,
				} => {
					stages.push(Self::stage(query, name, args)?);
					id = *receiver;
				}
				other => bail!(Error::InvalidPipeline(format!(
					"expected a table or a method call, but found a {}",
					other.kind()
				))),
			}
		};
		ensure!(self.tables.contains_key(&source), Error::TableNotFound(source));
		stages.reverse();
		trace!(target: TARGET, query = %query, stages = stages.len(), "Prepared pipeline");
		Ok(MemoryPlan {
			query: query.clone(),
			source,
			stages,
		})
	}

	fn execute(&self, plan: &MemoryPlan, bindings: &Bindings<'_>) -> Result<Vec<Value>> {
		self.executions.fetch_add(1, Ordering::Relaxed);
		let evaluator = Evaluator::new(plan.query.arena())
			.with_bindings(bindings.clone())
			.with_max_set_size(self.max_set_size)
			.with_membership(self.membership.as_deref());
		let scope = Scope::new();
		let mut rows = self.rows(&plan.source)?.to_vec();
		for stage in &plan.stages {
			rows = match *stage {
				Stage::Filter(lambda) => {
					let mut kept = Vec::with_capacity(rows.len());
					for row in rows {
						if evaluator.apply(lambda, vec![row.clone()], &scope)?.is_truthy() {
							kept.push(row);
						}
					}
					kept
				}
				Stage::Map(lambda) => rows
					.into_iter()
					.map(|row| evaluator.apply(lambda, vec![row], &scope))
					.collect::<Result<_>>()?,
				Stage::Take(n) => {
					rows.truncate(n);
					rows
				}
				Stage::Skip(n) => rows.into_iter().skip(n).collect(),
			};
		}
		debug!(target: TARGET, table = %plan.source, slots = bindings.len(), rows = rows.len(), "Executed pipeline");
		Ok(rows)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use test_log::test;

	use super::*;
	use crate::expr::{BinaryOperator, QueryBuilder};

	fn people() -> MemoryProvider {
		MemoryProvider::new().with_table(
			"person",
			[
				json!({ "id": 1, "name": "Tobie", "age": 35 }),
				json!({ "id": 2, "name": "Jaime", "age": 17 }),
				json!({ "id": 3, "name": "Emmanuel", "age": 42 }),
				json!({ "id": 4, "name": "Micha", "age": 12 }),
			],
		)
	}

	/// `person.filter(|p| p.age >= 18).map(|p| p.name)`
	fn adults() -> Query {
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let p = b.var("p");
		let age = b.member(p, "age");
		let eighteen = b.literal(18);
		let adult = b.binary(age, BinaryOperator::MoreThanEqual, eighteen);
		let is_adult = b.lambda(["p"], adult);
		let filter = b.method(person, "filter", [is_adult]);
		let p = b.var("p");
		let name = b.member(p, "name");
		let to_name = b.lambda(["p"], name);
		let root = b.method(filter, "map", [to_name]);
		b.build(root)
	}

	#[test]
	fn filter_and_map() {
		let provider = people();
		let rows = provider.bind(adults()).to_vec().unwrap();
		assert_eq!(rows, vec![Value::from("Tobie"), Value::from("Emmanuel")]);
		assert_eq!(provider.executions(), 1);
	}

	#[test]
	fn prepare_orders_stages_from_the_source() {
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let one = b.literal(1);
		let skip = b.method(person, "skip", [one]);
		let two = b.literal(2);
		let take = b.method(skip, "take", [two]);
		let query = b.build(take);
		let provider = people();
		let plan = provider.prepare(&query).unwrap();
		assert_eq!(plan.source(), "person");
		assert_eq!(plan.stages(), &[Stage::Skip(1), Stage::Take(2)]);
		let rows = provider.execute(&plan, &Bindings::new()).unwrap();
		let ids: Vec<Value> = rows.iter().map(|r| r.pick("id")).collect();
		assert_eq!(ids, vec![Value::from(2), Value::from(3)]);
	}

	#[test]
	fn unknown_table() {
		let mut b = QueryBuilder::new();
		let root = b.table("animal");
		let err = people().prepare(&b.build(root)).unwrap_err();
		assert!(matches!(err.downcast_ref(), Some(Error::TableNotFound(name)) if name == "animal"));
	}

	#[test]
	fn unsupported_operation() {
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let field = b.literal("age");
		let root = b.method(person, "sort", [field]);
		let err = people().prepare(&b.build(root)).unwrap_err();
		assert!(matches!(err.downcast_ref(), Some(Error::UnsupportedOperation(op)) if op == "sort"));
	}

	#[test]
	fn invalid_pipelines() {
		let provider = people();
		// A literal is not a pipeline
		let mut b = QueryBuilder::new();
		let root = b.literal(1);
		let err = provider.prepare(&b.build(root)).unwrap_err();
		assert!(matches!(err.downcast_ref(), Some(Error::InvalidPipeline(_))));
		// A filter needs a lambda
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let yes = b.literal(true);
		let root = b.method(person, "filter", [yes]);
		let err = provider.prepare(&b.build(root)).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Invalid query pipeline: filter expects a lambda of one parameter, but found `true`"
		);
		// A negative count
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let neg = b.literal(-1);
		let root = b.method(person, "take", [neg]);
		let err = provider.prepare(&b.build(root)).unwrap_err();
		assert!(matches!(err.downcast_ref(), Some(Error::InvalidPipeline(_))));
	}

	/// `person.filter(|p| contains(:ids, p.id))`
	fn by_slot() -> Query {
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let ids = b.slot("ids");
		let p = b.var("p");
		let id = b.member(p, "id");
		let contains = b.function("contains", [ids, id]);
		let filter = b.lambda(["p"], contains);
		let root = b.method(person, "filter", [filter]);
		b.build(root)
	}

	#[test]
	fn slots_are_read_from_the_bindings() {
		let provider = people();
		let plan = provider.prepare(&by_slot()).unwrap();
		let ids = [Value::from(3), Value::from(1)];
		let rows = provider.execute(&plan, &Bindings::new().with("ids", &ids)).unwrap();
		let names: Vec<Value> = rows.iter().map(|r| r.pick("name")).collect();
		assert_eq!(names, vec![Value::from("Tobie"), Value::from("Emmanuel")]);
		// Executing again without a binding fails
		let err = provider.execute(&plan, &Bindings::new()).unwrap_err();
		assert!(matches!(err.downcast_ref(), Some(Error::UnboundSlot(name)) if name == "ids"));
		assert_eq!(provider.executions(), 2);
	}

	#[test]
	fn set_size_limit() {
		let provider = people().with_max_set_size(Some(2));
		let plan = provider.prepare(&by_slot()).unwrap();
		let ids = [Value::from(1), Value::from(2)];
		assert_eq!(provider.execute(&plan, &Bindings::new().with("ids", &ids)).unwrap().len(), 2);
		let ids = [Value::from(1), Value::from(2), Value::from(3)];
		let err = provider.execute(&plan, &Bindings::new().with("ids", &ids)).unwrap_err();
		assert!(matches!(
			err.downcast_ref(),
			Some(Error::SetTooLarge {
				size: 3,
				max: 2
			})
		));
	}

	#[test]
	fn tables_can_grow() {
		let mut provider = people();
		provider.insert("person", [json!({ "id": 5, "name": "Rushmore", "age": 90 })]);
		assert_eq!(provider.table("person").map(<[Value]>::len), Some(5));
		let rows = provider.bind(adults()).to_vec().unwrap();
		assert_eq!(rows.len(), 3);
	}
}
