use serde::{Deserialize, Serialize};

use super::{Cart, CatalogItem, LineKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    #[serde(flatten)]
    pub key: LineKey,
    pub name: String,
    pub unit_price: f64,
}

/// Saved-for-later items. Same shape as [`Cart`] without quantities or checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wishlist {
    entries: Vec<WishlistEntry>,
}

impl Wishlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the same item and variant is already saved.
    pub fn add(&mut self, item: &CatalogItem, size: Option<&str>, color: Option<&str>) -> bool {
        let key = LineKey::new(item.id.clone(), size, color);
        if self.entries.iter().any(|entry| entry.key == key) {
            return false;
        }
        self.entries.push(WishlistEntry {
            key,
            name: item.name.clone(),
            unit_price: item.price,
        });
        true
    }

    /// Removes every variant of the item.
    pub fn remove(&mut self, catalog_item_id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.key.catalog_item_id != catalog_item_id);
        self.entries.len() != before
    }

    pub fn contains(&self, catalog_item_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.key.catalog_item_id == catalog_item_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves one saved variant into the cart with the given quantity.
    pub fn move_to_cart(&mut self, key: &LineKey, cart: &mut Cart, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        let Some(index) = self.entries.iter().position(|entry| &entry.key == key) else {
            return false;
        };
        let entry = self.entries.remove(index);
        cart.add_entry(entry.key, &entry.name, entry.unit_price, quantity);
        true
    }
}
