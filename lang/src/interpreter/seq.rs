//! The sequence capability shared by lists, lazy sequences and the
//! read-only views over vectors, strings and maps.

use im_rc::{HashMap, Vector};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::{Context, Runtime};
use super::error::EvalError;
use super::params::Params;
use super::value::Value;

/// Anything that can be walked with `first`/`rest`.
///
/// `first` returns `None` only for an empty sequence; a sequence whose head
/// is `nil` returns `Some(Value::Nil)`.
pub trait Sequence: fmt::Debug {
    fn first(&self) -> Result<Option<Value>, EvalError>;
    fn rest(&self) -> Result<Seq, EvalError>;
    fn is_empty(&self) -> Result<bool, EvalError>;
}

/// Shared handle to a sequence implementation.
#[derive(Clone, Debug)]
pub struct Seq(Rc<dyn Sequence>);

impl Seq {
    pub fn new(sequence: impl Sequence + 'static) -> Self {
        Seq(Rc::new(sequence))
    }

    pub fn empty() -> Self {
        Seq::new(EmptySeq)
    }

    pub fn cons(head: Value, tail: Seq) -> Self {
        Seq::new(Cons { head, tail })
    }

    /// Build a cons list holding `values` in order.
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        let values: Vec<Value> = values.into_iter().collect();
        values
            .into_iter()
            .rev()
            .fold(Seq::empty(), |tail, head| Seq::cons(head, tail))
    }

    pub fn vector_view(items: Vector<Value>) -> Self {
        Seq::new(VectorSeq { items, index: 0 })
    }

    pub fn string_view(text: Rc<String>) -> Self {
        Seq::new(StringSeq { text, offset: 0 })
    }

    pub fn map_view(entries: &HashMap<Value, Value>) -> Self {
        let entries: Vec<(Value, Value)> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Seq::new(MapSeq {
            entries: Rc::new(entries),
            index: 0,
        })
    }

    pub fn lazy(thunk: Value, runtime: Weak<Runtime>) -> Self {
        Seq::new(LazySeq {
            state: RefCell::new(LazyState::Pending(thunk)),
            runtime,
        })
    }

    pub fn concat(parts: Vec<Seq>) -> Self {
        Seq::new(ConcatSeq {
            parts: Rc::new(parts),
            index: 0,
            current: Seq::empty(),
        })
    }

    /// The sequence view of a seqable value. `nil` is the empty sequence;
    /// values that are not seqable yield `None`.
    pub fn from_value(value: &Value) -> Option<Seq> {
        match value {
            Value::Nil => Some(Seq::empty()),
            Value::Seq(seq) => Some(seq.clone()),
            Value::Vector(items) => Some(Seq::vector_view(items.clone())),
            Value::String(text) => Some(Seq::string_view(text.clone())),
            Value::Map(entries) => Some(Seq::map_view(entries)),
            _ => None,
        }
    }

    pub fn first(&self) -> Result<Option<Value>, EvalError> {
        self.0.first()
    }

    pub fn rest(&self) -> Result<Seq, EvalError> {
        self.0.rest()
    }

    pub fn is_empty(&self) -> Result<bool, EvalError> {
        self.0.is_empty()
    }

    pub fn iter(&self) -> SeqIter {
        SeqIter {
            current: Some(self.clone()),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Value>, EvalError> {
        self.iter().collect()
    }

    pub fn ptr_eq(&self, other: &Seq) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

pub struct SeqIter {
    current: Option<Seq>,
}

impl Iterator for SeqIter {
    type Item = Result<Value, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = self.current.take()?;
        match seq.first() {
            Err(err) => Some(Err(err)),
            Ok(None) => None,
            Ok(Some(head)) => match seq.rest() {
                Ok(rest) => {
                    self.current = Some(rest);
                    Some(Ok(head))
                }
                Err(err) => Some(Err(err)),
            },
        }
    }
}

#[derive(Debug)]
struct EmptySeq;

impl Sequence for EmptySeq {
    fn first(&self) -> Result<Option<Value>, EvalError> {
        Ok(None)
    }

    fn rest(&self) -> Result<Seq, EvalError> {
        Ok(Seq::empty())
    }

    fn is_empty(&self) -> Result<bool, EvalError> {
        Ok(true)
    }
}

#[derive(Debug)]
struct Cons {
    head: Value,
    tail: Seq,
}

impl Sequence for Cons {
    fn first(&self) -> Result<Option<Value>, EvalError> {
        Ok(Some(self.head.clone()))
    }

    fn rest(&self) -> Result<Seq, EvalError> {
        Ok(self.tail.clone())
    }

    fn is_empty(&self) -> Result<bool, EvalError> {
        Ok(false)
    }
}

#[derive(Debug)]
struct VectorSeq {
    items: Vector<Value>,
    index: usize,
}

impl Sequence for VectorSeq {
    fn first(&self) -> Result<Option<Value>, EvalError> {
        Ok(self.items.get(self.index).cloned())
    }

    fn rest(&self) -> Result<Seq, EvalError> {
        if self.index + 1 >= self.items.len() {
            return Ok(Seq::empty());
        }
        Ok(Seq::new(VectorSeq {
            items: self.items.clone(),
            index: self.index + 1,
        }))
    }

    fn is_empty(&self) -> Result<bool, EvalError> {
        Ok(self.index >= self.items.len())
    }
}

#[derive(Debug)]
struct StringSeq {
    text: Rc<String>,
    /// Byte offset of the current character.
    offset: usize,
}

impl Sequence for StringSeq {
    fn first(&self) -> Result<Option<Value>, EvalError> {
        Ok(self.text[self.offset..].chars().next().map(Value::Char))
    }

    fn rest(&self) -> Result<Seq, EvalError> {
        match self.text[self.offset..].chars().next() {
            Some(c) if self.offset + c.len_utf8() < self.text.len() => Ok(Seq::new(StringSeq {
                text: self.text.clone(),
                offset: self.offset + c.len_utf8(),
            })),
            _ => Ok(Seq::empty()),
        }
    }

    fn is_empty(&self) -> Result<bool, EvalError> {
        Ok(self.offset >= self.text.len())
    }
}

/// Map entries presented as `[key value]` vectors.
#[derive(Debug)]
struct MapSeq {
    entries: Rc<Vec<(Value, Value)>>,
    index: usize,
}

impl Sequence for MapSeq {
    fn first(&self) -> Result<Option<Value>, EvalError> {
        Ok(self
            .entries
            .get(self.index)
            .map(|(k, v)| Value::vector([k.clone(), v.clone()])))
    }

    fn rest(&self) -> Result<Seq, EvalError> {
        if self.index + 1 >= self.entries.len() {
            return Ok(Seq::empty());
        }
        Ok(Seq::new(MapSeq {
            entries: self.entries.clone(),
            index: self.index + 1,
        }))
    }

    fn is_empty(&self) -> Result<bool, EvalError> {
        Ok(self.index >= self.entries.len())
    }
}

#[derive(Debug)]
enum LazyState {
    Pending(Value),
    Realizing,
    Realized(Seq),
    Failed(EvalError),
}

/// A sequence produced on first use by calling a zero-argument function.
/// The thunk runs at most once; its outcome, success or failure, is kept.
struct LazySeq {
    state: RefCell<LazyState>,
    runtime: Weak<Runtime>,
}

impl fmt::Debug for LazySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            LazyState::Pending(_) => "pending",
            LazyState::Realizing => "realizing",
            LazyState::Realized(_) => "realized",
            LazyState::Failed(_) => "failed",
        };
        write!(f, "LazySeq({state})")
    }
}

impl LazySeq {
    fn realize(&self) -> Result<Seq, EvalError> {
        match &*self.state.borrow() {
            LazyState::Realized(seq) => return Ok(seq.clone()),
            LazyState::Failed(err) => return Err(err.clone()),
            LazyState::Realizing => {
                return Err(EvalError::InvalidArgument {
                    function: "lazy-seq".to_string(),
                    message: "lazy sequence depends on its own realization".to_string(),
                });
            }
            LazyState::Pending(_) => {}
        }

        let thunk = match std::mem::replace(&mut *self.state.borrow_mut(), LazyState::Realizing) {
            LazyState::Pending(thunk) => thunk,
            _ => unreachable!("state checked above"),
        };

        let outcome = self.force(&thunk);
        *self.state.borrow_mut() = match &outcome {
            Ok(seq) => LazyState::Realized(seq.clone()),
            Err(err) => LazyState::Failed(err.clone()),
        };
        outcome
    }

    fn force(&self, thunk: &Value) -> Result<Seq, EvalError> {
        let runtime = self.runtime.upgrade().ok_or(EvalError::DetachedLazySeq)?;
        let context = Context::root(runtime);
        let value = context.apply(thunk, Params::new())?.into_value()?;
        Seq::from_value(&value).ok_or_else(|| EvalError::InvalidArgument {
            function: "lazy-seq".to_string(),
            message: format!("body must produce a seqable value, got {}", value.type_name()),
        })
    }
}

impl Sequence for LazySeq {
    fn first(&self) -> Result<Option<Value>, EvalError> {
        self.realize()?.first()
    }

    fn rest(&self) -> Result<Seq, EvalError> {
        self.realize()?.rest()
    }

    fn is_empty(&self) -> Result<bool, EvalError> {
        self.realize()?.is_empty()
    }
}

/// Lazy concatenation of already-seqable parts.
#[derive(Debug)]
struct ConcatSeq {
    parts: Rc<Vec<Seq>>,
    /// Index of the next part to move to once `current` is exhausted.
    index: usize,
    current: Seq,
}

impl ConcatSeq {
    /// Locate the first non-empty part at or after the current position.
    fn settle(&self) -> Result<Option<(Seq, usize)>, EvalError> {
        let mut current = self.current.clone();
        let mut index = self.index;
        loop {
            if !current.is_empty()? {
                return Ok(Some((current, index)));
            }
            match self.parts.get(index) {
                Some(next) => {
                    current = next.clone();
                    index += 1;
                }
                None => return Ok(None),
            }
        }
    }
}

impl Sequence for ConcatSeq {
    fn first(&self) -> Result<Option<Value>, EvalError> {
        match self.settle()? {
            Some((current, _)) => current.first(),
            None => Ok(None),
        }
    }

    fn rest(&self) -> Result<Seq, EvalError> {
        match self.settle()? {
            Some((current, index)) => Ok(Seq::new(ConcatSeq {
                parts: self.parts.clone(),
                index,
                current: current.rest()?,
            })),
            None => Ok(Seq::empty()),
        }
    }

    fn is_empty(&self) -> Result<bool, EvalError> {
        Ok(self.settle()?.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(seq: &Seq) -> Vec<i64> {
        seq.iter()
            .map(|v| match v {
                Ok(Value::Int(n)) => n,
                other => panic!("expected integer, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn list_preserves_order() {
        let seq = Seq::list([Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(ints(&seq), vec![1, 2, 3]);
        assert_eq!(seq.first().unwrap(), Some(Value::Int(1)));
        assert_eq!(ints(&seq.rest().unwrap()), vec![2, 3]);
    }

    #[test]
    fn empty_sequence_has_no_first() {
        let seq = Seq::empty();
        assert!(seq.is_empty().unwrap());
        assert_eq!(seq.first().unwrap(), None);
        assert!(seq.rest().unwrap().is_empty().unwrap());
    }

    #[test]
    fn nil_head_is_not_empty() {
        let seq = Seq::list([Value::Nil]);
        assert!(!seq.is_empty().unwrap());
        assert_eq!(seq.first().unwrap(), Some(Value::Nil));
    }

    #[test]
    fn string_view_walks_characters() {
        let seq = Seq::string_view(Rc::new("héllo".to_string()));
        let chars: Vec<Value> = seq.to_vec().unwrap();
        assert_eq!(
            chars,
            vec![
                Value::Char('h'),
                Value::Char('é'),
                Value::Char('l'),
                Value::Char('l'),
                Value::Char('o')
            ]
        );
    }

    #[test]
    fn vector_view_shares_storage() {
        let items: Vector<Value> = (1..=4).map(Value::Int).collect();
        let seq = Seq::vector_view(items);
        assert_eq!(ints(&seq.rest().unwrap().rest().unwrap()), vec![3, 4]);
    }

    #[test]
    fn map_view_yields_pairs() {
        let mut map = HashMap::new();
        map.insert(Value::Int(1), Value::Int(2));
        let seq = Seq::map_view(&map);
        assert_eq!(
            seq.first().unwrap(),
            Some(Value::vector([Value::Int(1), Value::Int(2)]))
        );
        assert!(seq.rest().unwrap().is_empty().unwrap());
    }

    #[test]
    fn concat_skips_empty_parts() {
        let seq = Seq::concat(vec![
            Seq::empty(),
            Seq::list([Value::Int(1)]),
            Seq::empty(),
            Seq::vector_view((2..=3).map(Value::Int).collect()),
        ]);
        assert_eq!(ints(&seq), vec![1, 2, 3]);
        assert!(Seq::concat(vec![Seq::empty(), Seq::empty()]).is_empty().unwrap());
    }

    #[test]
    fn detached_lazy_sequence_reports_error() {
        let seq = Seq::lazy(Value::Nil, Weak::new());
        assert_eq!(seq.first(), Err(EvalError::DetachedLazySeq));
        // The failure is memoized rather than retried.
        assert_eq!(seq.is_empty(), Err(EvalError::DetachedLazySeq));
    }
}
