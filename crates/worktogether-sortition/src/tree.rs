use crate::seed::reduce_seed;
use crate::{Result, SortitionError};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Weighted-selection index over `(key, weight)` entries.
///
/// Node `1` is the root, node `i` has children `2i` and `2i + 1`, and leaf
/// slot `s` lives at node `capacity + s`. `capacity` is a power of two and
/// doubles when every slot is taken. Removed keys free their slot for reuse.
#[derive(Debug, Clone)]
pub struct SortitionTree<K> {
    capacity: usize,
    nodes: Vec<u64>,
    leaves: Vec<Option<K>>,
    positions: HashMap<K, usize>,
    free_slots: Vec<usize>,
    next_slot: usize,
}

impl<K> Default for SortitionTree<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> SortitionTree<K>
where
    K: Clone + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    pub fn with_capacity(slots: usize) -> Self {
        let capacity = slots.max(1).next_power_of_two();
        Self {
            capacity,
            nodes: vec![0; capacity * 2],
            leaves: vec![None; capacity],
            positions: HashMap::new(),
            free_slots: Vec::new(),
            next_slot: 0,
        }
    }

    /// Sum of all weights.
    pub fn total(&self) -> u64 {
        self.nodes[1]
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub fn weight_of(&self, key: &K) -> Option<u64> {
        self.positions
            .get(key)
            .map(|slot| self.nodes[self.capacity + slot])
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> + '_ {
        self.leaves
            .iter()
            .enumerate()
            .filter_map(move |(slot, key)| key.as_ref().map(|k| (k, self.nodes[self.capacity + slot])))
    }

    /// Add a new entry. Zero weight is allowed: the key is present but can
    /// never be drawn.
    pub fn insert(&mut self, key: K, weight: u64) -> Result<()> {
        if self.positions.contains_key(&key) {
            return Err(SortitionError::DuplicateKey(format!("{:?}", key)));
        }
        self.total()
            .checked_add(weight)
            .ok_or(SortitionError::WeightOverflow)?;

        let slot = self.allocate_slot();
        self.leaves[slot] = Some(key.clone());
        self.positions.insert(key, slot);
        self.write_leaf(slot, weight);
        Ok(())
    }

    /// Replace the weight of an existing entry.
    pub fn set_weight(&mut self, key: &K, weight: u64) -> Result<()> {
        let slot = *self
            .positions
            .get(key)
            .ok_or_else(|| SortitionError::UnknownKey(format!("{:?}", key)))?;

        let old = self.nodes[self.capacity + slot];
        self.total()
            .saturating_sub(old)
            .checked_add(weight)
            .ok_or(SortitionError::WeightOverflow)?;

        self.write_leaf(slot, weight);
        Ok(())
    }

    /// Increase `key`'s weight by `delta`, inserting the key if absent.
    /// Returns the key's new weight.
    pub fn add_weight(&mut self, key: K, delta: u64) -> Result<u64> {
        match self.weight_of(&key) {
            Some(current) => {
                let updated = current
                    .checked_add(delta)
                    .ok_or(SortitionError::WeightOverflow)?;
                self.set_weight(&key, updated)?;
                Ok(updated)
            }
            None => {
                self.insert(key, delta)?;
                Ok(delta)
            }
        }
    }

    /// Remove an entry and release its slot. Returns the removed weight.
    pub fn remove(&mut self, key: &K) -> Result<u64> {
        let slot = self
            .positions
            .remove(key)
            .ok_or_else(|| SortitionError::UnknownKey(format!("{:?}", key)))?;

        let old = self.nodes[self.capacity + slot];
        self.write_leaf(slot, 0);
        self.leaves[slot] = None;
        self.free_slots.push(slot);
        Ok(old)
    }

    /// Key whose cumulative weight interval contains `value`.
    ///
    /// Requires `0 <= value < total()`. Identical tree state and value always
    /// select the same key.
    pub fn draw(&self, value: u64) -> Result<&K> {
        let total = self.total();
        if total == 0 {
            return Err(SortitionError::EmptyTree);
        }
        if value >= total {
            return Err(SortitionError::DrawOutOfRange { value, total });
        }

        let mut remaining = value;
        let mut node = 1;
        while node < self.capacity {
            let left = node * 2;
            if remaining < self.nodes[left] {
                node = left;
            } else {
                remaining -= self.nodes[left];
                node = left + 1;
            }
        }

        // The descent only enters subtrees whose weight exceeds `remaining`,
        // so the leaf reached carries positive weight and is occupied.
        self.leaves[node - self.capacity]
            .as_ref()
            .ok_or(SortitionError::EmptyTree)
    }

    /// Draw using a 256-bit seed reduced modulo the total weight.
    pub fn draw_with_seed(&self, seed: &[u8; 32]) -> Result<&K> {
        let total = self.total();
        if total == 0 {
            return Err(SortitionError::EmptyTree);
        }
        self.draw(reduce_seed(seed, total))
    }

    fn allocate_slot(&mut self) -> usize {
        if let Some(slot) = self.free_slots.pop() {
            return slot;
        }
        if self.next_slot == self.capacity {
            self.grow();
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    fn grow(&mut self) {
        let new_capacity = self.capacity * 2;
        let mut nodes = vec![0u64; new_capacity * 2];
        nodes[new_capacity..new_capacity + self.capacity]
            .copy_from_slice(&self.nodes[self.capacity..self.capacity * 2]);
        for node in (1..new_capacity).rev() {
            nodes[node] = nodes[node * 2] + nodes[node * 2 + 1];
        }

        self.nodes = nodes;
        self.leaves.resize(new_capacity, None);
        self.capacity = new_capacity;
    }

    /// Set a leaf and push the delta to every ancestor. Callers have already
    /// checked that the root cannot overflow.
    fn write_leaf(&mut self, slot: usize, weight: u64) {
        let mut node = self.capacity + slot;
        let old = self.nodes[node];
        self.nodes[node] = weight;
        node /= 2;
        while node >= 1 {
            self.nodes[node] = self.nodes[node] - old + weight;
            node /= 2;
        }
    }
}
