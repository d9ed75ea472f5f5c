use serde::{Deserialize, Serialize};

use super::{CatalogItem, Selection};

/// Identity of a cart or wishlist entry: the item plus its chosen variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub catalog_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_color: Option<String>,
}

impl LineKey {
    pub fn new(catalog_item_id: impl Into<String>, size: Option<&str>, color: Option<&str>) -> Self {
        Self {
            catalog_item_id: catalog_item_id.into(),
            variant_size: size.map(str::to_string),
            variant_color: color.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    #[serde(flatten)]
    pub key: LineKey,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

/// Client-local accumulation of selections prior to checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds to an existing entry with the same item and variant, or appends one.
    pub fn add(&mut self, item: &CatalogItem, quantity: u32, size: Option<&str>, color: Option<&str>) {
        let key = LineKey::new(item.id.clone(), size, color);
        self.add_entry(key, &item.name, item.price, quantity);
    }

    pub(crate) fn add_entry(&mut self, key: LineKey, name: &str, unit_price: f64, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
            None => self.entries.push(CartEntry {
                key,
                name: name.to_string(),
                unit_price,
                quantity,
            }),
        }
    }

    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.key != key);
        self.entries.len() != before
    }

    /// Sets the quantity of an entry; zero removes it.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(key);
        }
        match self.entries.iter_mut().find(|entry| &entry.key == key) {
            Some(entry) => {
                entry.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries
            .iter()
            .map(|entry| entry.unit_price * f64::from(entry.quantity))
            .sum()
    }

    pub fn item_count(&self) -> u32 {
        self.entries
            .iter()
            .map(|entry| entry.quantity)
            .fold(0u32, u32::saturating_add)
    }

    pub fn selections(&self) -> Vec<Selection> {
        self.entries.iter().map(to_selection).collect()
    }

    /// Selections whose catalog item currently has stock. Unknown items are skipped.
    pub fn selections_in_stock(&self, catalog: &[CatalogItem]) -> Vec<Selection> {
        self.entries
            .iter()
            .filter(|entry| {
                catalog
                    .iter()
                    .any(|item| item.id == entry.key.catalog_item_id && item.is_in_stock())
            })
            .map(to_selection)
            .collect()
    }
}

fn to_selection(entry: &CartEntry) -> Selection {
    Selection {
        catalog_item_id: entry.key.catalog_item_id.clone(),
        quantity: entry.quantity,
        variant_size: entry.key.variant_size.clone(),
        variant_color: entry.key.variant_color.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee() -> CatalogItem {
        CatalogItem::new("tee", "Black T-shirt", 120.0, 87).with_sizes(["Small", "Large"])
    }

    #[test]
    fn test_add_merges_same_variant() {
        let mut cart = Cart::new();
        cart.add(&tee(), 1, Some("Small"), None);
        cart.add(&tee(), 2, Some("Small"), None);
        cart.add(&tee(), 1, Some("Large"), None);

        assert_eq!(cart.entries().len(), 2);
        assert_eq!(cart.entries()[0].quantity, 3);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.total(), 480.0);
    }

    #[test]
    fn test_quantities_saturate() {
        let mut cart = Cart::new();
        cart.add(&tee(), u32::MAX, Some("Small"), None);
        cart.add(&tee(), 1, Some("Small"), None);
        assert_eq!(cart.entries()[0].quantity, u32::MAX);

        cart.add(&tee(), 5, Some("Large"), None);
        assert_eq!(cart.item_count(), u32::MAX);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(&tee(), 1, Some("Small"), None);
        let key = LineKey::new("tee", Some("Small"), None);

        assert!(cart.update_quantity(&key, 5));
        assert_eq!(cart.item_count(), 5);
        assert!(cart.update_quantity(&key, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_selections_keep_insertion_order() {
        let mut cart = Cart::new();
        let mug = CatalogItem::new("mug", "Mug", 80.0, 0);
        cart.add(&tee(), 1, None, Some("Black"));
        cart.add(&mug, 2, None, None);

        let selections = cart.selections();
        assert_eq!(selections[0], Selection::new("tee", 1).with_color("Black"));
        assert_eq!(selections[1], Selection::new("mug", 2));

        let available = cart.selections_in_stock(&[tee(), mug]);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].catalog_item_id, "tee");
    }

    #[test]
    fn test_cart_persists_as_json() {
        let mut cart = Cart::new();
        cart.add(&tee(), 2, Some("Large"), None);
        let json = serde_json::to_string(&cart).unwrap();
        assert!(json.contains("\"catalogItemId\":\"tee\""));
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
