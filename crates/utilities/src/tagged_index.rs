use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ops::Index;
use std::ops::IndexMut;

/// A `usize` index that can only be compared with indices carrying the same
/// tag, so that state indices, block indices and value indices cannot be mixed
/// up. Constructing one is not a proof that it is in bounds.
///
/// The underlying number is available through `value()` or `Deref`, and the
/// index can be used directly to index vectors and slices.
pub struct TagIndex<Tag> {
    index: usize,

    /// Ensures that the Tag is used by the struct, without requiring any bounds on it.
    marker: PhantomData<fn() -> Tag>,
}

impl<Tag> TagIndex<Tag> {
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            marker: PhantomData,
        }
    }

    /// Returns the underlying number.
    pub const fn value(&self) -> usize {
        self.index
    }

    /// Returns an iterator over the indices `0..end`.
    pub fn range(end: usize) -> impl DoubleEndedIterator<Item = Self> + ExactSizeIterator {
        (0..end).map(Self::new)
    }
}

// The traits are implemented by hand since deriving them would put bounds on `Tag`.
impl<Tag> Clone for TagIndex<Tag> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tag> Copy for TagIndex<Tag> {}

impl<Tag> Default for TagIndex<Tag> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<Tag> PartialEq for TagIndex<Tag> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<Tag> Eq for TagIndex<Tag> {}

impl<Tag> PartialEq<usize> for TagIndex<Tag> {
    fn eq(&self, other: &usize) -> bool {
        self.index == *other
    }
}

impl<Tag> PartialOrd for TagIndex<Tag> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Tag> Ord for TagIndex<Tag> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<Tag> PartialOrd<usize> for TagIndex<Tag> {
    fn partial_cmp(&self, other: &usize) -> Option<Ordering> {
        self.index.partial_cmp(other)
    }
}

impl<Tag> Hash for TagIndex<Tag> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<Tag> fmt::Debug for TagIndex<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.index.fmt(f)
    }
}

impl<Tag> fmt::Display for TagIndex<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.index.fmt(f)
    }
}

impl<Tag> Deref for TagIndex<Tag> {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.index
    }
}

impl<U, Tag> Index<TagIndex<Tag>> for [U] {
    type Output = U;

    fn index(&self, index: TagIndex<Tag>) -> &Self::Output {
        &self[index.index]
    }
}

impl<U, Tag> IndexMut<TagIndex<Tag>> for [U] {
    fn index_mut(&mut self, index: TagIndex<Tag>) -> &mut Self::Output {
        &mut self[index.index]
    }
}

impl<U, Tag> Index<TagIndex<Tag>> for Vec<U> {
    type Output = U;

    fn index(&self, index: TagIndex<Tag>) -> &Self::Output {
        &self[index.index]
    }
}

impl<U, Tag> IndexMut<TagIndex<Tag>> for Vec<U> {
    fn index_mut(&mut self, index: TagIndex<Tag>) -> &mut Self::Output {
        &mut self[index.index]
    }
}
