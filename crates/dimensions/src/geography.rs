//! Geography dimension: the fixed UK retail tree.
//!
//! Three levels: the total-market aggregate, 21 retailers, and 12
//! channel/format children. Keys and descriptions are stable catalog
//! facts; the store classification on each node is what the allocation
//! and scenario machinery consume.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DimensionError, Result};
use crate::types::{GeographyKey, StoreClass};

/// One node of the geography tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographyNode {
    pub key: GeographyKey,
    pub description: String,
    pub parent_key: Option<GeographyKey>,
    pub parent_description: Option<String>,
    /// 0 = total market, 1 = retailer, 2 = channel/format.
    pub level: u8,
    pub store_class: StoreClass,
}

impl GeographyNode {
    pub fn is_online(&self) -> bool {
        self.store_class == StoreClass::Online
    }
}

/// Built geography dimension with index lookups.
///
/// Node order is fixed: the root first, retailers in alphabetical order,
/// then channel children. Indices into that order are what the engine
/// carries around; keys only matter at the serialization boundary.
#[derive(Debug, Clone)]
pub struct GeographyDim {
    nodes: Vec<GeographyNode>,
    by_key: IndexMap<GeographyKey, usize>,
    retailer_indices: Vec<usize>,
    channel_indices: Vec<(usize, usize)>,
    children: Vec<Vec<usize>>,
}

/// (key, description, parent key, level, class)
type NodeSpec = (u32, &'static str, Option<u32>, u8, StoreClass);

const ROOT_KEY: u32 = 27_000_001;

#[rustfmt::skip]
const NODE_TABLE: &[NodeSpec] = &[
    (ROOT_KEY,   "IRI All Outlets", None,           0, StoreClass::TotalMarket),
    // Level 1: retailers, alphabetical.
    (27_700_001, "Aldi",            Some(ROOT_KEY), 1, StoreClass::Discount),
    (27_300_001, "Asda",            Some(ROOT_KEY), 1, StoreClass::Major),
    (27_990_002, "B&M",             Some(ROOT_KEY), 1, StoreClass::Discount),
    (27_950_002, "Booker",          Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_900_001, "Boots",           Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_600_001, "Co-op",           Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_800_001, "Convenience",     Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_950_001, "Costco",          Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_800_004, "Costcutter",      Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_990_003, "Home Bargains",   Some(ROOT_KEY), 1, StoreClass::Discount),
    (27_700_002, "Lidl",            Some(ROOT_KEY), 1, StoreClass::Discount),
    (27_800_003, "Londis",          Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_400_001, "Morrisons",       Some(ROOT_KEY), 1, StoreClass::Major),
    (27_800_006, "Nisa",            Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_990_001, "Poundland",       Some(ROOT_KEY), 1, StoreClass::Discount),
    (27_800_005, "Premier",         Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_200_001, "Sainsburys",      Some(ROOT_KEY), 1, StoreClass::Major),
    (27_800_002, "Spar",            Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_900_003, "Superdrug",       Some(ROOT_KEY), 1, StoreClass::Convenience),
    (27_100_001, "Tesco",           Some(ROOT_KEY), 1, StoreClass::Major),
    (27_500_001, "Waitrose",        Some(ROOT_KEY), 1, StoreClass::Premium),
    // Level 2: online and store-format children.
    (27_300_002, "Asda Online",       Some(27_300_001), 2, StoreClass::Online),
    (27_900_002, "Boots Online",      Some(27_900_001), 2, StoreClass::Online),
    (27_600_002, "Co-op Online",      Some(27_600_001), 2, StoreClass::Online),
    (27_400_002, "Morrisons Online",  Some(27_400_001), 2, StoreClass::Online),
    (27_200_002, "Sainsburys Online", Some(27_200_001), 2, StoreClass::Online),
    (27_200_003, "Sainsburys Local",  Some(27_200_001), 2, StoreClass::Convenience),
    (27_900_004, "Superdrug Online",  Some(27_900_003), 2, StoreClass::Online),
    (27_100_002, "Tesco Online",      Some(27_100_001), 2, StoreClass::Online),
    (27_100_003, "Tesco Express",     Some(27_100_001), 2, StoreClass::Convenience),
    (27_100_004, "Tesco Metro",       Some(27_100_001), 2, StoreClass::Convenience),
    (27_100_005, "Tesco Extra",       Some(27_100_001), 2, StoreClass::Major),
    (27_500_002, "Waitrose Online",   Some(27_500_001), 2, StoreClass::Online),
];

impl GeographyDim {
    /// Build the fixed tree.
    pub fn build() -> Self {
        let mut by_key = IndexMap::with_capacity(NODE_TABLE.len());
        let mut nodes = Vec::with_capacity(NODE_TABLE.len());

        for (key, desc, parent, level, class) in NODE_TABLE {
            let parent_key = parent.map(GeographyKey);
            let parent_description = parent.map(|p| {
                NODE_TABLE
                    .iter()
                    .find(|(k, ..)| k == &p)
                    .map(|(_, d, ..)| d.to_string())
                    .unwrap_or_default()
            });
            by_key.insert(GeographyKey(*key), nodes.len());
            nodes.push(GeographyNode {
                key: GeographyKey(*key),
                description: desc.to_string(),
                parent_key,
                parent_description,
                level: *level,
                store_class: *class,
            });
        }

        let retailer_indices: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.level == 1)
            .map(|(i, _)| i)
            .collect();

        let mut channel_indices = Vec::new();
        let mut children = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            if let Some(pk) = node.parent_key {
                let parent_idx = by_key[&pk];
                children[parent_idx].push(i);
                if node.level == 2 {
                    channel_indices.push((i, parent_idx));
                }
            }
        }

        GeographyDim {
            nodes,
            by_key,
            retailer_indices,
            channel_indices,
            children,
        }
    }

    pub fn nodes(&self) -> &[GeographyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the level-0 total-market node.
    pub fn root(&self) -> usize {
        0
    }

    /// Indices of the level-1 retailer nodes, in node order.
    pub fn retailers(&self) -> &[usize] {
        &self.retailer_indices
    }

    /// (child index, parent index) pairs for every level-2 node.
    pub fn channels(&self) -> &[(usize, usize)] {
        &self.channel_indices
    }

    /// Child indices of a node (empty for leaves).
    pub fn children_of(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    pub fn node(&self, idx: usize) -> &GeographyNode {
        &self.nodes[idx]
    }

    pub fn index_of(&self, key: GeographyKey) -> Result<usize> {
        self.by_key
            .get(&key)
            .copied()
            .ok_or_else(|| DimensionError::UnknownKey {
                key: key.to_string(),
            })
    }
}
