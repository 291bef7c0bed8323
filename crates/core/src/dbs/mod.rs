//! The interface between queries and the backends which execute them.

use anyhow::Result;

use crate::exec::ChunkedExecutor;
use crate::expr::Query;

mod bindings;

pub use self::bindings::Bindings;

/// A backend which turns query trees into rows.
///
/// Execution is split in two steps. A query is prepared once, and the
/// prepared plan may then be executed any number of times, each time with
/// different values bound to the slots of the query. The shape of the tree
/// never changes between executions of the same plan.
pub trait QueryProvider {
	/// The type of the rows returned by an execution
	type Row;
	/// A query prepared for repeated execution
	type Plan;

	/// Validate and compile a query tree.
	///
	/// The tree may live in a forked arena, sharing nodes with other trees.
	fn prepare(&self, query: &Query) -> Result<Self::Plan>;

	/// Execute a prepared plan, returning rows in provider order
	fn execute(&self, plan: &Self::Plan, bindings: &Bindings<'_>) -> Result<Vec<Self::Row>>;

	/// Bind a query to this provider
	fn bind(&self, query: Query) -> Queryable<'_, Self>
	where
		Self: Sized,
	{
		Queryable::new(self, query)
	}
}

/// A query bound to the provider which executes it.
pub struct Queryable<'p, P: QueryProvider> {
	provider: &'p P,
	query: Query,
}

impl<'p, P: QueryProvider> Queryable<'p, P> {
	pub fn new(provider: &'p P, query: Query) -> Self {
		Self {
			provider,
			query,
		}
	}

	pub fn provider(&self) -> &'p P {
		self.provider
	}

	pub fn query(&self) -> &Query {
		&self.query
	}

	/// Execute the query once, as it is
	pub fn to_vec(&self) -> Result<Vec<P::Row>> {
		let plan = self.provider.prepare(&self.query)?;
		self.provider.execute(&plan, &Bindings::new())
	}

	/// Execute the query once per chunk of its membership set, see [`ChunkedExecutor`]
	pub fn execute_chunked(&self, chunk_size: usize) -> Result<Vec<P::Row>> {
		ChunkedExecutor::new(self.provider).chunk_size(chunk_size).execute(&self.query)
	}
}
