use core::fmt;

use thiserror::Error;

use crate::expr::NodeId;

/// An error originating from rewriting, evaluating or executing a query.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The library encountered unreachable logic
	#[error("Encountered unreachable logic: {0}")]
	Unreachable(String),

	/// A chunk must hold at least one value
	#[error("The chunk size must be greater than zero")]
	InvalidChunkSize,

	/// The query does not contain the membership predicate
	#[error("A `{name}` predicate is required but none was found in the query")]
	MissingTargetPredicate {
		name: String,
	},

	/// The query contains more than one membership predicate
	#[error(
		"Found {count} `{name}` predicates in the query but only one can be chunked. Select the target predicate explicitly"
	)]
	AmbiguousTargetPredicate {
		name: String,
		count: usize,
	},

	/// The selected node is not one of the membership predicates in the query
	#[error("The node {node} is not a `{name}` predicate of the query")]
	TargetNotFound {
		node: NodeId,
		name: String,
	},

	/// The membership predicate does not have both a set and a value operand
	#[error("The `{name}` predicate at node {node} must have a set operand and a value operand")]
	MalformedPredicate {
		node: NodeId,
		name: String,
	},

	/// An expression which must be closed references its surrounding context
	#[error("Expected a closed expression, but found a reference to the {kind} `{name}`")]
	NotClosed {
		kind: &'static str,
		name: String,
	},

	/// The membership set did not evaluate to an array
	#[error("Expected the membership set to evaluate to an array, but found {found}")]
	NotASet {
		found: String,
	},

	/// A lambda was evaluated without being applied to arguments
	#[error("A lambda can only be evaluated by applying it to arguments")]
	Unevaluable,

	/// The called function is not known
	#[error("The function `{0}` does not exist")]
	UnknownFunction(String),

	/// The operands of an operator or function call were not valid
	#[error("Invalid operands for `{op}`: {message}")]
	InvalidOperands {
		op: String,
		message: String,
	},

	/// The node handle does not exist in the expression arena
	#[error("The node {0} does not exist in the expression arena")]
	InvalidNode(NodeId),

	/// A lambda variable was referenced outside of its lambda
	#[error("The variable `{0}` is not bound")]
	UnboundVariable(String),

	/// A slot was not bound for the current execution
	#[error("The slot `{0}` is not bound for this execution")]
	UnboundSlot(String),

	/// The table does not exist in the provider
	#[error("The table `{0}` does not exist")]
	TableNotFound(String),

	/// The provider does not know how to execute the query operation
	#[error("The operation `{0}` is not supported by this provider")]
	UnsupportedOperation(String),

	/// The query is not shaped as a pipeline the provider can execute
	#[error("Invalid query pipeline: {0}")]
	InvalidPipeline(String),

	/// The membership set exceeds the cardinality limit of the provider
	#[error("The membership set contains {size} values, exceeding the limit of {max}")]
	SetTooLarge {
		size: usize,
		max: usize,
	},
}

impl Error {
	#[track_caller]
	pub fn unreachable<T: fmt::Display>(message: T) -> Error {
		let location = std::panic::Location::caller();
		let message = format!("{}:{}: {}", location.file(), location.line(), message);
		Error::Unreachable(message)
	}

	/// Check if this error was raised before any execution could take place,
	/// because the query does not have the shape required for chunking
	pub fn is_structural(&self) -> bool {
		matches!(
			self,
			Error::InvalidChunkSize
				| Error::MissingTargetPredicate { .. }
				| Error::AmbiguousTargetPredicate { .. }
				| Error::TargetNotFound { .. }
				| Error::MalformedPredicate { .. }
		)
	}
}

impl From<Error> for String {
	fn from(e: Error) -> String {
		e.to_string()
	}
}
