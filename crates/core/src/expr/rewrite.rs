use std::collections::HashMap;

use anyhow::Result;

use crate::err::Error;
use crate::expr::{ExprArena, NodeId};

/// Replaces every occurrence of one node handle with another.
///
/// Nodes are never modified. Each ancestor of a replaced node is pushed
/// again with its updated children, and every other node keeps its handle,
/// so the rewritten tree shares all unaffected subtrees with the original.
/// The rewrite is meant to run on a [forked](ExprArena::fork) arena.
pub struct Replacer {
	source: NodeId,
	target: NodeId,
}

impl Replacer {
	pub fn new(source: NodeId, target: NodeId) -> Self {
		Self {
			source,
			target,
		}
	}

	/// Rewrite the tree below `root`, returning the root of the rewritten tree.
	///
	/// If the source node is not reachable from `root`, nothing is pushed
	/// and `root` itself is returned. The traversal uses an explicit stack,
	/// so the depth of the tree is not limited by the call stack.
	pub fn rewrite(&self, arena: &mut ExprArena, root: NodeId) -> Result<NodeId> {
		// Rewritten handle of every finished node, a node may have several parents
		let mut done = HashMap::from([(self.source, self.target)]);
		// A node is expanded first, and rebuilt once all its children are done
		let mut stack = vec![(root, false)];
		while let Some((id, expanded)) = stack.pop() {
			if done.contains_key(&id) {
				continue;
			}
			let children = arena.node(id)?.children();
			if !expanded {
				stack.push((id, true));
				stack.extend(
					children.iter().rev().filter(|c| !done.contains_key(*c)).map(|c| (*c, false)),
				);
				continue;
			}
			let rewritten = children
				.iter()
				.map(|c| {
					done.get(c).copied().ok_or_else(|| Error::unreachable("child rewritten after its parent"))
				})
				.collect::<Result<Vec<_>, _>>()?;
			let out = if rewritten == children {
				id
			} else {
				let expr = arena.node(id)?.with_children(&rewritten)?;
				arena.push(expr)
			};
			done.insert(id, out);
		}
		done.get(&root).copied().ok_or_else(|| Error::unreachable("root was not rewritten").into())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use test_log::test;

	use super::*;
	use crate::expr::visit::{collect, find_calls};
	use crate::expr::{BinaryOperator, Expr, Query, QueryBuilder};

	fn fixture() -> (Query, NodeId, NodeId) {
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let ids = b.values([1, 2, 3]);
		let p = b.var("p");
		let id = b.member(p, "id");
		let contains = b.method(ids, "contains", [id]);
		let filter = b.lambda(["p"], contains);
		let root = b.method(person, "filter", [filter]);
		(b.build(root), contains, person)
	}

	#[test]
	fn replaces_node_and_shares_the_rest() {
		let (query, contains, person) = fixture();
		let original = query.to_string();
		let mut arena = ExprArena::fork(query.arena());
		let replacement = arena.push(Expr::Literal(true.into()));
		let root = Replacer::new(contains, replacement).rewrite(&mut arena, query.root()).unwrap();
		// Replacement, lambda and root call are new, everything else is shared
		assert_eq!(arena.layer_len(), 3);
		assert_ne!(root, query.root());
		let Some(Expr::Call {
			receiver,
			..
		}) = arena.get(root)
		else {
			panic!("expected a call");
		};
		assert_eq!(*receiver, Some(person));
		let rewritten = Query::new(Arc::new(arena), root);
		assert_eq!(rewritten.to_string(), "person.filter(|p| true)");
		// The original tree is untouched
		assert_eq!(query.to_string(), original);
		assert!(query.node(contains).unwrap().is_call("contains"));
	}

	#[test]
	fn missing_source_returns_original_root() {
		let (query, _, _) = fixture();
		let mut arena = ExprArena::fork(query.arena());
		let replacement = arena.push(Expr::Literal(true.into()));
		let unrelated = NodeId(10_000);
		let root = Replacer::new(unrelated, replacement).rewrite(&mut arena, query.root()).unwrap();
		assert_eq!(root, query.root());
		assert_eq!(arena.layer_len(), 1);
	}

	#[test]
	fn replaces_every_occurrence_once() {
		let mut b = QueryBuilder::new();
		let x = b.var("x");
		let pair = b.array([x, x]);
		let query = b.build(pair);
		let mut arena = ExprArena::fork(query.arena());
		let y = arena.push(Expr::Var("y".to_owned()));
		let root = Replacer::new(x, y).rewrite(&mut arena, query.root()).unwrap();
		assert_eq!(arena.get(root), Some(&Expr::Array(vec![y, y])));
		assert_eq!(arena.layer_len(), 2);
	}

	#[test]
	fn replacing_the_root() {
		let (query, _, _) = fixture();
		let mut arena = ExprArena::fork(query.arena());
		let replacement = arena.push(Expr::Table("other".to_owned()));
		let root = Replacer::new(query.root(), replacement).rewrite(&mut arena, query.root()).unwrap();
		assert_eq!(root, replacement);
	}

	#[test]
	fn deeply_nested_trees() {
		// false || (false || (... || [1].contains(x)))
		const DEPTH: usize = 20_000;
		let mut b = QueryBuilder::new();
		let set = b.values([1]);
		let x = b.var("x");
		let contains = b.method(set, "contains", [x]);
		let mut root = contains;
		for _ in 0..DEPTH {
			let no = b.literal(false);
			root = b.binary(no, BinaryOperator::Or, root);
		}
		let query = b.build(root);
		assert_eq!(find_calls(query.arena(), query.root(), "contains"), vec![contains]);
		let mut arena = ExprArena::fork(query.arena());
		let replacement = arena.push(Expr::Literal(true.into()));
		let root = Replacer::new(contains, replacement).rewrite(&mut arena, query.root()).unwrap();
		// Every ancestor of the predicate is pushed again, once
		assert_eq!(arena.layer_len(), DEPTH + 1);
		assert!(find_calls(&arena, root, "contains").is_empty());
		assert_eq!(collect(&arena, root, |id, _| id == replacement), vec![replacement]);
		assert_eq!(query.node(query.root()).unwrap().kind(), "binary");
	}
}
