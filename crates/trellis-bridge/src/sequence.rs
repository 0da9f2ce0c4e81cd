//! Lazy, read-only views over foreign collections.
//!
//! A [`LazySequence`] never copies the foreign collection. Its length is
//! asked of the foreign side on every call, iteration walks a fresh foreign
//! iterator, and elements are converted one at a time as they are visited.
//! Random access keeps a single forward cursor so ascending reads stay
//! linear overall; reading backwards restarts the walk from the beginning.
//!
//! [`ListIter`] adds backwards movement. It caches exactly the elements it
//! has visited, so moving back and forth over them issues no foreign call.

use std::cell::Cell;
use std::fmt;

use trellis_core::TypeDesc;

use crate::converter::Converter;
use crate::environment::Environment;
use crate::error::{BridgeError, Result};
use crate::runtime::{Advance, ForeignHandle};
use crate::value::Value;

#[derive(Clone)]
struct Source {
    collection: ForeignHandle,
    converter: Converter,
}

struct Cursor {
    iterator: ForeignHandle,
    next_index: usize,
}

/// A lazy, order-preserving view over a foreign iterable.
pub struct LazySequence {
    env: Environment,
    element: TypeDesc,
    source: Option<Source>,
    cursor: Cell<Option<Cursor>>,
}

impl LazySequence {
    /// View over `collection`, converting elements to `element`.
    ///
    /// The element converter is resolved here, so an unconvertible element
    /// type fails before any element is read.
    pub fn new(env: Environment, element: &TypeDesc, collection: ForeignHandle) -> Result<Self> {
        let converter = env.resolve(element)?;
        Ok(Self {
            env,
            element: element.clone(),
            source: Some(Source {
                collection,
                converter,
            }),
            cursor: Cell::new(None),
        })
    }

    /// The empty view.
    pub fn empty(env: Environment, element: TypeDesc) -> Self {
        Self {
            env,
            element,
            source: None,
            cursor: Cell::new(None),
        }
    }

    /// The element type.
    pub fn element_type(&self) -> &TypeDesc {
        &self.element
    }

    /// The foreign collection, unless this is the empty view.
    pub fn collection(&self) -> Option<&ForeignHandle> {
        self.source.as_ref().map(|s| &s.collection)
    }

    /// Foreign `len` of the collection, asked on every call.
    pub fn len(&self) -> Result<usize> {
        match &self.source {
            Some(source) => Ok(self.env.runtime().length(&source.collection)?),
            None => Ok(0),
        }
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Forward iterator over a fresh foreign iterator.
    pub fn iter(&self) -> Result<SequenceIter> {
        let (iterator, converter) = match &self.source {
            Some(source) => (
                Some(self.env.runtime().iterate(&source.collection)?),
                Some(source.converter.clone()),
            ),
            None => (None, None),
        };
        Ok(SequenceIter {
            env: self.env.clone(),
            converter,
            iterator,
            pending: None,
            exhausted: false,
        })
    }

    /// Element at `index`.
    ///
    /// Continues from the previous `get` when `index` is not behind it,
    /// otherwise restarts from the first element. Skipped elements are not
    /// converted.
    pub fn get(&self, index: usize) -> Result<Value> {
        let Some(source) = &self.source else {
            return Err(BridgeError::IndexOutOfBounds { index });
        };
        let runtime = self.env.runtime();
        let mut cursor = match self.cursor.take() {
            Some(cursor) if cursor.next_index <= index => cursor,
            _ => Cursor {
                iterator: runtime.iterate(&source.collection)?,
                next_index: 0,
            },
        };
        loop {
            let item = match runtime.advance(&cursor.iterator)? {
                Advance::Done => return Err(BridgeError::IndexOutOfBounds { index }),
                Advance::Item(item) => item,
            };
            cursor.next_index += 1;
            if cursor.next_index > index {
                self.cursor.set(Some(cursor));
                return source.converter.apply(&self.env, item.as_ref());
            }
        }
    }

    /// Bidirectional iterator starting at the first element.
    pub fn list_iter(&self) -> Result<ListIter> {
        let capacity = self.len()?;
        Ok(ListIter {
            forward: self.iter()?,
            cache: Vec::with_capacity(capacity),
            next_index: 0,
        })
    }

    /// Bidirectional iterator positioned before the element at `index`.
    ///
    /// The elements before `index` are read (and cached) on the way.
    pub fn list_iter_at(&self, index: usize) -> Result<ListIter> {
        let mut iter = self.list_iter()?;
        for _ in 0..index {
            match iter.next() {
                Err(BridgeError::NoSuchElement) => {
                    return Err(BridgeError::IndexOutOfBounds { index })
                }
                other => {
                    other?;
                }
            }
        }
        Ok(iter)
    }

    /// Convert every element, in order.
    pub fn to_vec(&self) -> Result<Vec<Value>> {
        self.iter()?.collect()
    }

    /// Always fails: sequences are read-only.
    pub fn set(&self, _index: usize, _value: Value) -> Result<Value> {
        Err(BridgeError::UnsupportedOperation { operation: "set" })
    }

    /// Always fails: sequences are read-only.
    pub fn add(&self, _value: Value) -> Result<bool> {
        Err(BridgeError::UnsupportedOperation { operation: "add" })
    }

    /// Always fails: sequences are read-only.
    pub fn remove(&self, _index: usize) -> Result<Value> {
        Err(BridgeError::UnsupportedOperation { operation: "remove" })
    }
}

impl Clone for LazySequence {
    /// Clones share the collection but not the random-access cursor.
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            element: self.element.clone(),
            source: self.source.clone(),
            cursor: Cell::new(None),
        }
    }
}

impl fmt::Debug for LazySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySequence")
            .field("element", &self.element)
            .field("collection", &self.collection())
            .finish()
    }
}

/// Forward iterator over a [`LazySequence`].
///
/// Yields `Result`s: a foreign error or conversion failure ends iteration
/// after being reported. Exhaustion of the foreign iterator simply ends it.
pub struct SequenceIter {
    env: Environment,
    converter: Option<Converter>,
    iterator: Option<ForeignHandle>,
    pending: Option<Option<ForeignHandle>>,
    exhausted: bool,
}

impl SequenceIter {
    fn fetch(&mut self) -> Result<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }
        let Some(iterator) = &self.iterator else {
            return Ok(false);
        };
        if self.exhausted {
            return Ok(false);
        }
        match self.env.runtime().advance(iterator) {
            Ok(Advance::Item(item)) => {
                self.pending = Some(item);
                Ok(true)
            }
            Ok(Advance::Done) => {
                self.exhausted = true;
                Ok(false)
            }
            Err(e) => {
                self.exhausted = true;
                Err(e.into())
            }
        }
    }

    /// Whether another element follows. Reads ahead one foreign element.
    pub fn has_next(&mut self) -> Result<bool> {
        self.fetch()
    }

    /// Move past the next element without converting it.
    ///
    /// Returns `false` when there was no element to skip.
    pub fn skip_one(&mut self) -> Result<bool> {
        let present = self.fetch()?;
        self.pending = None;
        Ok(present)
    }
}

impl Iterator for SequenceIter {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.fetch() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => return Some(Err(e)),
        }
        let item = self.pending.take()?;
        let converter = self.converter.as_ref()?;
        let converted = converter.apply(&self.env, item.as_ref());
        if converted.is_err() {
            self.exhausted = true;
        }
        Some(converted)
    }
}

/// Bidirectional iterator over a [`LazySequence`].
///
/// Moving forward past the furthest visited element reads the foreign
/// iterator; every other move is served from the cache of visited elements.
pub struct ListIter {
    forward: SequenceIter,
    cache: Vec<Value>,
    next_index: usize,
}

impl ListIter {
    /// Whether a following element exists.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.next_index < self.cache.len() {
            return Ok(true);
        }
        self.forward.has_next()
    }

    /// The following element. Fails with [`BridgeError::NoSuchElement`] at the end.
    pub fn next(&mut self) -> Result<Value> {
        if let Some(cached) = self.cache.get(self.next_index) {
            self.next_index += 1;
            return Ok(cached.clone());
        }
        let value = self.forward.next().ok_or(BridgeError::NoSuchElement)??;
        self.cache.push(value.clone());
        self.next_index = self.cache.len();
        Ok(value)
    }

    /// Whether a preceding element exists.
    pub fn has_previous(&self) -> bool {
        self.next_index != 0
    }

    /// The preceding element, from the cache. Never calls the foreign side.
    pub fn previous(&mut self) -> Result<Value> {
        let index = self.next_index.checked_sub(1).ok_or(BridgeError::NoSuchElement)?;
        let value = self.cache.get(index).cloned().ok_or(BridgeError::NoSuchElement)?;
        self.next_index = index;
        Ok(value)
    }

    /// Index of the element [`next`](Self::next) would return.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Index of the element [`previous`](Self::previous) would return.
    pub fn previous_index(&self) -> Option<usize> {
        self.next_index.checked_sub(1)
    }

    /// Number of elements read from the foreign side so far.
    pub fn visited(&self) -> usize {
        self.cache.len()
    }

    /// Always fails: sequences are read-only.
    pub fn set(&mut self, _value: Value) -> Result<()> {
        Err(BridgeError::UnsupportedOperation { operation: "set" })
    }

    /// Always fails: sequences are read-only.
    pub fn add(&mut self, _value: Value) -> Result<()> {
        Err(BridgeError::UnsupportedOperation { operation: "add" })
    }

    /// Always fails: sequences are read-only.
    pub fn remove(&mut self) -> Result<()> {
        Err(BridgeError::UnsupportedOperation { operation: "remove" })
    }
}
