use std::collections::BTreeMap;

use crate::val::Value;

/// Values bound to the slots of a query for a single execution.
///
/// Bindings borrow their values, so binding a chunk of a larger list of
/// candidates does not copy it.
#[derive(Clone, Debug, Default, PartialEq)]
#[repr(transparent)]
pub struct Bindings<'a>(BTreeMap<&'a str, &'a [Value]>);

impl<'a> Bindings<'a> {
	/// Create a new empty bindings map.
	#[inline]
	pub fn new() -> Self {
		Self(BTreeMap::new())
	}

	/// Bind a slot, replacing any previous binding of the same slot.
	#[inline]
	pub fn bind(&mut self, slot: &'a str, values: &'a [Value]) {
		self.0.insert(slot, values);
	}

	/// Bind a slot, returning the updated bindings.
	#[inline]
	pub fn with(mut self, slot: &'a str, values: &'a [Value]) -> Self {
		self.bind(slot, values);
		self
	}

	/// Get the values bound to a slot.
	#[inline]
	pub fn get(&self, slot: &str) -> Option<&'a [Value]> {
		self.0.get(slot).copied()
	}

	/// Check if the bindings map is empty.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Get the number of bound slots.
	#[inline]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Get an iterator over the bound slots.
	#[inline]
	pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a [Value])> + '_ {
		self.0.iter().map(|(k, v)| (*k, *v))
	}
}

impl<'a> FromIterator<(&'a str, &'a [Value])> for Bindings<'a> {
	fn from_iter<T: IntoIterator<Item = (&'a str, &'a [Value])>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rebinding_replaces() {
		let first = [Value::from(1)];
		let second = [Value::from(2), Value::from(3)];
		let mut bindings = Bindings::new();
		bindings.bind("chunk", &first);
		bindings.bind("chunk", &second);
		assert_eq!(bindings.len(), 1);
		assert_eq!(bindings.get("chunk"), Some(&second[..]));
		assert_eq!(bindings.get("other"), None);
	}

	#[test]
	fn collect_and_iterate() {
		let a = [Value::from("a")];
		let b: [Value; 0] = [];
		let bindings: Bindings = [("b", &b[..]), ("a", &a[..])].into_iter().collect();
		let slots: Vec<&str> = bindings.iter().map(|(k, _)| k).collect();
		assert_eq!(slots, vec!["a", "b"]);
		assert!(!bindings.is_empty());
	}
}
