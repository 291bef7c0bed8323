//! Chunked execution of queries with an oversized membership predicate.
//!
//! Backends often limit the number of values a membership predicate may
//! embed, such as the literals of a SQL `IN (...)` clause. The
//! [`ChunkedExecutor`] finds the membership predicate of a query, evaluates
//! its set once, and replaces the predicate with one that reads its set from
//! a slot. The rewritten query is prepared once and executed once per chunk
//! of the set, with the slot bound to that chunk, and the rows of all
//! executions are concatenated in chunk order.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, bail, ensure};

use crate::cnf::{CHUNK_SLOT, DEFAULT_CHUNK_SIZE, MEMBERSHIP_OPERATION};
use crate::dbs::{Bindings, QueryProvider};
use crate::err::Error;
use crate::expr::eval::evaluate_closed;
use crate::expr::rewrite::Replacer;
use crate::expr::visit::find_calls;
use crate::expr::{Expr, ExprArena, NodeId, Query};
use crate::val::Value;

const TARGET: &str = "chunkq::exec";

/// The operands of a membership predicate. In method form the receiver is
/// the set, in function form the first argument is.
#[derive(Debug, Clone, Copy)]
struct Membership {
	node: NodeId,
	set: NodeId,
	value: NodeId,
	comparer: Option<NodeId>,
}

impl Membership {
	fn parse(query: &Query, node: NodeId, name: &str) -> Result<Self> {
		let malformed = || Error::MalformedPredicate {
			node,
			name: name.to_owned(),
		};
		let Expr::Call {
			receiver,
			args,
			..
		} = query.node(node)?
		else {
			bail!(malformed());
		};
		let operands: Vec<NodeId> = receiver.iter().chain(args).copied().collect();
		match operands[..] {
			[set, value] => Ok(Self {
				node,
				set,
				value,
				comparer: None,
			}),
			[set, value, comparer] => Ok(Self {
				node,
				set,
				value,
				comparer: Some(comparer),
			}),
			_ => bail!(malformed()),
		}
	}
}

/// A query rewritten for chunked execution, together with the
/// materialised membership set.
#[derive(Debug, Clone)]
pub struct ChunkedQuery {
	query: Query,
	candidates: Vec<Value>,
	slot: String,
	chunk_size: usize,
}

impl ChunkedQuery {
	/// The rewritten query, whose membership predicate reads from the slot
	pub fn query(&self) -> &Query {
		&self.query
	}

	/// All the values of the original membership set, in order
	pub fn candidates(&self) -> &[Value] {
		&self.candidates
	}

	/// The name of the slot bound to each chunk
	pub fn slot(&self) -> &str {
		&self.slot
	}

	pub fn chunk_count(&self) -> usize {
		self.candidates.len().div_ceil(self.chunk_size)
	}

	/// The successive chunks of the membership set
	pub fn chunks(&self) -> std::slice::Chunks<'_, Value> {
		self.candidates.chunks(self.chunk_size)
	}
}

/// Executes a query once per chunk of its membership set.
///
/// Chunks are executed sequentially, in order. Any error stops the
/// execution and is returned as is, dropping the rows of previous chunks.
pub struct ChunkedExecutor<'p, P> {
	provider: &'p P,
	chunk_size: usize,
	operation: String,
	slot: String,
	target: Option<NodeId>,
}

impl<'p, P: QueryProvider> ChunkedExecutor<'p, P> {
	pub fn new(provider: &'p P) -> Self {
		Self {
			provider,
			chunk_size: *DEFAULT_CHUNK_SIZE,
			operation: MEMBERSHIP_OPERATION.clone(),
			slot: CHUNK_SLOT.clone(),
			target: None,
		}
	}

	/// The maximum number of set values embedded in a single execution
	pub fn chunk_size(mut self, chunk_size: usize) -> Self {
		self.chunk_size = chunk_size;
		self
	}

	/// The name of the membership call to chunk
	pub fn operation(mut self, name: impl Into<String>) -> Self {
		self.operation = name.into();
		self
	}

	/// The name of the slot the chunks are bound to
	pub fn slot(mut self, name: impl Into<String>) -> Self {
		self.slot = name.into();
		self
	}

	/// Chunk this predicate when the query contains several of them
	pub fn target(mut self, node: NodeId) -> Self {
		self.target = Some(node);
		self
	}

	/// Rewrite a query for chunked execution, without executing it.
	///
	/// The given query is left untouched: the rewritten query lives in a
	/// fork of its arena and shares every node not on the path to the
	/// membership predicate.
	pub fn plan(&self, query: &Query) -> Result<ChunkedQuery> {
		ensure!(self.chunk_size > 0, Error::InvalidChunkSize);
		let predicate = self.locate(query)?;
		let candidates = match evaluate_closed(query.arena(), predicate.set)? {
			Value::Array(values) => values,
			other => bail!(Error::NotASet {
				found: other.kind_of().to_owned(),
			}),
		};
		Ok(ChunkedQuery {
			query: self.rewrite(query, &predicate)?,
			candidates,
			slot: self.slot.clone(),
			chunk_size: self.chunk_size,
		})
	}

	/// Execute a query once per chunk and concatenate the rows
	pub fn execute(&self, query: &Query) -> Result<Vec<P::Row>> {
		self.execute_planned(&self.plan(query)?)
	}

	/// Execute a query rewritten by [`plan`](Self::plan), once per chunk.
	///
	/// The chunks are those of the planned query, whatever the chunk size
	/// of this executor. A planned query can be executed any number of times.
	pub fn execute_planned(&self, chunked: &ChunkedQuery) -> Result<Vec<P::Row>> {
		debug!(
			target: TARGET,
			candidates = chunked.candidates().len(),
			chunks = chunked.chunk_count(),
			chunk_size = chunked.chunk_size,
			"Executing query in chunks"
		);
		if chunked.candidates().is_empty() {
			return Ok(Vec::new());
		}
		trace!(target: TARGET, query = %chunked.query(), "Preparing rewritten query");
		let plan = self.provider.prepare(chunked.query())?;
		let mut results = Vec::new();
		for (i, chunk) in chunked.chunks().enumerate() {
			let bindings = Bindings::new().with(chunked.slot(), chunk);
			let rows = self.provider.execute(&plan, &bindings)?;
			trace!(target: TARGET, chunk = i, values = chunk.len(), rows = rows.len(), "Executed chunk");
			results.extend(rows);
		}
		Ok(results)
	}

	/// Find the single membership predicate to chunk
	fn locate(&self, query: &Query) -> Result<Membership> {
		let mut found = find_calls(query.arena(), query.root(), &self.operation);
		// A shared node is a single predicate, however often it is referenced
		let mut seen = HashSet::new();
		found.retain(|id| seen.insert(*id));
		let node = match (self.target, found.as_slice()) {
			(_, []) => bail!(Error::MissingTargetPredicate {
				name: self.operation.clone(),
			}),
			(Some(target), found) => {
				ensure!(
					found.contains(&target),
					Error::TargetNotFound {
						node: target,
						name: self.operation.clone(),
					}
				);
				target
			}
			(None, [node]) => *node,
			(None, found) => bail!(Error::AmbiguousTargetPredicate {
				name: self.operation.clone(),
				count: found.len(),
			}),
		};
		Membership::parse(query, node, &self.operation)
	}

	/// Replace the predicate with a function-form call reading from the slot
	fn rewrite(&self, query: &Query, predicate: &Membership) -> Result<Query> {
		let mut arena = ExprArena::fork(query.arena());
		let slot = arena.push(Expr::Slot(self.slot.clone()));
		let args = [slot, predicate.value].into_iter().chain(predicate.comparer).collect();
		let call = arena.push(Expr::Call {
			name: self.operation.clone(),
			receiver: None,
			args,
		});
		let root = Replacer::new(predicate.node, call).rewrite(&mut arena, query.root())?;
		Ok(Query::new(Arc::new(arena), root))
	}
}
