//! Period state arena.
//!
//! The pipeline is a first-order process: generating period `t` needs
//! only the state written during period `t - 1`. Storage therefore
//! keeps exactly two generations, `current` and `previous`, and
//! `advance_period` swaps them instead of cloning.
//!
//! The per-product state is the deseasonalized sales level for every
//! geography node plus the shelf price carried into the next week.
//! Seasonal, elasticity, and scenario multipliers are applied on the
//! way out and never stored, so the smoothing clamps act on the
//! underlying level rather than on event peaks.

use indexmap::IndexMap;

use emporium_dimensions::ProductKey;

/// Evolving state for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductState {
    /// Deseasonalized value-sales level per geography node, indexed by
    /// the geography dimension's node order.
    pub base: Vec<f64>,
    /// Shelf price at the end of the period.
    pub price: f64,
}

impl ProductState {
    pub fn new(node_count: usize, price: f64) -> Self {
        ProductState {
            base: vec![0.0; node_count],
            price,
        }
    }
}

/// Two-generation arena of product states.
#[derive(Debug, Default)]
pub struct PeriodStorage {
    current: IndexMap<ProductKey, ProductState>,
    previous: IndexMap<ProductKey, ProductState>,
}

impl PeriodStorage {
    pub fn with_capacity(products: usize) -> Self {
        PeriodStorage {
            current: IndexMap::with_capacity(products),
            previous: IndexMap::with_capacity(products),
        }
    }

    pub fn insert(&mut self, key: ProductKey, state: ProductState) {
        self.current.insert(key, state);
    }

    pub fn get(&self, key: ProductKey) -> Option<&ProductState> {
        self.current.get(&key)
    }

    pub fn get_mut(&mut self, key: ProductKey) -> Option<&mut ProductState> {
        self.current.get_mut(&key)
    }

    pub fn get_previous(&self, key: ProductKey) -> Option<&ProductState> {
        self.previous.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProductKey, &ProductState)> {
        self.current.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ProductKey, &mut ProductState)> {
        self.current.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Roll the arena forward: current becomes previous, and the new
    /// current starts empty. Capacity is retained on both sides.
    pub fn advance_period(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u64) -> ProductKey {
        ProductKey(n)
    }

    #[test]
    fn test_insert_and_get() {
        let mut storage = PeriodStorage::with_capacity(4);
        storage.insert(key(1), ProductState::new(3, 2.5));
        assert_eq!(storage.get(key(1)).map(|s| s.price), Some(2.5));
        assert_eq!(storage.get(key(1)).map(|s| s.base.len()), Some(3));
        assert!(storage.get(key(2)).is_none());
    }

    #[test]
    fn test_advance_moves_current_to_previous() {
        let mut storage = PeriodStorage::with_capacity(4);
        let mut state = ProductState::new(2, 1.0);
        state.base[0] = 10.0;
        storage.insert(key(1), state);

        storage.advance_period();

        assert!(storage.get(key(1)).is_none());
        assert_eq!(
            storage.get_previous(key(1)).map(|s| s.base[0]),
            Some(10.0)
        );
        assert!(storage.is_empty());
    }

    #[test]
    fn test_advance_drops_stale_generation() {
        let mut storage = PeriodStorage::with_capacity(4);
        storage.insert(key(1), ProductState::new(1, 1.0));
        storage.advance_period();
        storage.insert(key(2), ProductState::new(1, 2.0));
        storage.advance_period();

        assert!(storage.get_previous(key(1)).is_none());
        assert!(storage.get_previous(key(2)).is_some());
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let mut storage = PeriodStorage::with_capacity(4);
        for n in [5, 3, 9] {
            storage.insert(key(n), ProductState::new(1, n as f64));
        }
        let keys: Vec<u64> = storage.iter().map(|(k, _)| k.0).collect();
        assert_eq!(keys, vec![5, 3, 9]);
    }
}
