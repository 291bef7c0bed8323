#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::Result;
use chunkq_core::dbs::{Bindings, QueryProvider};
use chunkq_core::expr::{BinaryOperator, Query, QueryBuilder};
use chunkq_core::mem::MemoryProvider;
use chunkq_core::val::Value;
use serde_json::json;

/// Wraps a provider, recording every prepared query and every bound chunk
pub struct Recording<P> {
	inner: P,
	prepared: Mutex<Vec<String>>,
	chunks: Mutex<Vec<Vec<Value>>>,
}

impl<P> Recording<P> {
	pub fn new(inner: P) -> Self {
		Self {
			inner,
			prepared: Mutex::new(Vec::new()),
			chunks: Mutex::new(Vec::new()),
		}
	}

	pub fn inner(&self) -> &P {
		&self.inner
	}

	/// The rendered queries passed to `prepare`
	pub fn prepared(&self) -> Vec<String> {
		self.prepared.lock().unwrap().clone()
	}

	/// The values bound to the slots of each execution
	pub fn chunks(&self) -> Vec<Vec<Value>> {
		self.chunks.lock().unwrap().clone()
	}
}

impl<P: QueryProvider> QueryProvider for Recording<P> {
	type Row = P::Row;
	type Plan = P::Plan;

	fn prepare(&self, query: &Query) -> Result<P::Plan> {
		self.prepared.lock().unwrap().push(query.to_string());
		self.inner.prepare(query)
	}

	fn execute(&self, plan: &P::Plan, bindings: &Bindings<'_>) -> Result<Vec<P::Row>> {
		let bound = bindings.iter().flat_map(|(_, values)| values.iter().cloned()).collect();
		self.chunks.lock().unwrap().push(bound);
		self.inner.execute(plan, bindings)
	}
}

/// A `person` table with ids from 1 to `count`, where every third person is an admin
pub fn people(count: i64) -> MemoryProvider {
	MemoryProvider::new().with_table(
		"person",
		(1..=count).map(|id| {
			json!({
				"id": id,
				"name": format!("person{id}"),
				"admin": id % 3 == 0,
			})
		}),
	)
}

/// `person.filter(|p| <set>.contains(p.id)).map(|p| p.id)`
pub fn ids_in(set: impl FnOnce(&mut QueryBuilder) -> chunkq_core::NodeId) -> Query {
	let mut b = QueryBuilder::new();
	let person = b.table("person");
	let set = set(&mut b);
	let p = b.var("p");
	let id = b.member(p, "id");
	let contains = b.method(set, "contains", [id]);
	let filter = b.lambda(["p"], contains);
	let filtered = b.method(person, "filter", [filter]);
	let p = b.var("p");
	let id = b.member(p, "id");
	let to_id = b.lambda(["p"], id);
	let root = b.method(filtered, "map", [to_id]);
	b.build(root)
}

/// `person.filter(|p| p.admin && <set>.contains(p.id)).map(|p| p.id)`
pub fn admins_in(set: impl FnOnce(&mut QueryBuilder) -> chunkq_core::NodeId) -> Query {
	let mut b = QueryBuilder::new();
	let person = b.table("person");
	let p = b.var("p");
	let admin = b.member(p, "admin");
	let set = set(&mut b);
	let id = b.member(p, "id");
	let contains = b.method(set, "contains", [id]);
	let both = b.binary(admin, BinaryOperator::And, contains);
	let filter = b.lambda(["p"], both);
	let filtered = b.method(person, "filter", [filter]);
	let p = b.var("p");
	let id = b.member(p, "id");
	let to_id = b.lambda(["p"], id);
	let root = b.method(filtered, "map", [to_id]);
	b.build(root)
}

pub fn ints(values: impl IntoIterator<Item = i64>) -> Vec<Value> {
	values.into_iter().map(Value::from).collect()
}
