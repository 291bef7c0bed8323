//! # Chunkq Core
//!
//! Executes queries whose membership predicate holds more values than a
//! backend accepts in a single statement.
//!
//! A query is a tree of [expressions](expr::Expr) stored in an
//! [arena](expr::ExprArena). The [`ChunkedExecutor`](exec::ChunkedExecutor)
//! finds the one `contains` predicate of the query, rewrites it so that its
//! set is read from a slot, and executes the rewritten query once per chunk
//! of the set through a [`QueryProvider`](dbs::QueryProvider).
//!
//! ```
//! use chunkq_core::dbs::QueryProvider;
//! use chunkq_core::expr::QueryBuilder;
//! use chunkq_core::mem::MemoryProvider;
//! use serde_json::json;
//!
//! let provider = MemoryProvider::new().with_table(
//! 	"person",
//! 	[json!({ "id": 1 }), json!({ "id": 2 }), json!({ "id": 3 })],
//! );
//! let mut b = QueryBuilder::new();
//! let person = b.table("person");
//! let ids = b.values([3, 1, 4]);
//! let p = b.var("p");
//! let id = b.member(p, "id");
//! let contains = b.method(ids, "contains", [id]);
//! let filter = b.lambda(["p"], contains);
//! let root = b.method(person, "filter", [filter]);
//!
//! let rows = provider.bind(b.build(root)).execute_chunked(2).unwrap();
//! assert_eq!(rows.len(), 2);
//! assert_eq!(provider.executions(), 2);
//! ```

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod dbs;
pub mod err;
pub mod exec;
pub mod expr;
pub mod mem;
pub mod val;

pub use self::dbs::{Bindings, QueryProvider, Queryable};
pub use self::err::Error;
pub use self::exec::{ChunkedExecutor, ChunkedQuery};
pub use self::expr::{Expr, NodeId, Query, QueryBuilder};
pub use self::val::Value;
