use smallvec::SmallVec;
use std::ops::{Deref, DerefMut};

use super::seq::Seq;
use super::value::Value;

/// Number of arguments stored inline before spilling to the heap.
pub const INLINE_PARAMS: usize = 8;

/// Argument list handed to built-ins, special forms and closures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(SmallVec<[Value; INLINE_PARAMS]>);

impl Params {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(SmallVec::with_capacity(capacity))
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// `head` followed by every element of `rest`.
    pub fn prefixed(head: Value, rest: &[Value]) -> Self {
        let mut params = Self::with_capacity(rest.len() + 1);
        params.push(head);
        params.extend(rest.iter().cloned());
        params
    }

    /// True while every argument still lives in the inline slots.
    pub fn is_inline(&self) -> bool {
        !self.0.spilled()
    }

    /// The arguments as a list value.
    pub fn into_list(self) -> Value {
        Value::Seq(Seq::list(self.0))
    }
}

impl Deref for Params {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl DerefMut for Params {
    fn deref_mut(&mut self) -> &mut [Value] {
        &mut self.0
    }
}

impl Extend<Value> for Params {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<Value> for Params {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Params {
    type Item = Value;
    type IntoIter = smallvec::IntoIter<[Value; INLINE_PARAMS]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        values.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_eight_arguments_stay_inline() {
        let mut params: Params = (0..8).map(Value::Int).collect();
        assert!(params.is_inline());
        params.push(Value::Int(8));
        assert!(!params.is_inline());
        assert_eq!(params.len(), 9);
        assert_eq!(params[8], Value::Int(8));
    }

    #[test]
    fn prefixed_keeps_order() {
        let params = Params::prefixed(Value::Int(0), &[Value::Int(1), Value::Int(2)]);
        let values: Vec<Value> = params.into_iter().collect();
        assert_eq!(values, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }
}
