use rustc_hash::FxHashMap;

use pmc_utilities::TagIndex;

use crate::Value;

pub struct ValueTag;

/// The index of a value in a [ValueCache].
pub type ValueIndex = TagIndex<ValueTag>;

/// Assigns a unique index to every distinct value, such that two values
/// obtain the same index iff they are equal. Signatures store these indices
/// instead of the values themselves.
pub struct ValueCache<V: Value> {
    indices: FxHashMap<V::Key, ValueIndex>,
    values: Vec<V>,
}

impl<V: Value> ValueCache<V> {
    pub fn new() -> ValueCache<V> {
        ValueCache {
            indices: FxHashMap::default(),
            values: Vec::new(),
        }
    }

    /// Returns the index of the given value, inserting it when it is new.
    pub fn insert(&mut self, value: &V) -> ValueIndex {
        let key = value.key();
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }

        let index = ValueIndex::new(self.values.len());
        self.values.push(value.clone());
        self.indices.insert(key, index);
        index
    }

    /// Returns the index of the given value, if it has been inserted before.
    pub fn get_index(&self, value: &V) -> Option<ValueIndex> {
        self.indices.get(&value.key()).copied()
    }

    pub fn value(&self, index: ValueIndex) -> &V {
        &self.values[index]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V: Value> Default for ValueCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
