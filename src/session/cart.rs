//! Cart held in the local `cartItems` field

use crate::cache::store::EntityStore;
use crate::cache::value::FieldValue;
use crate::operations::fields::CART_ITEMS;

/// Launch ids in the cart, in insertion order
pub fn items(store: &EntityStore) -> Vec<String> {
    store
        .read_local(CART_ITEMS)
        .map(FieldValue::to_string_list)
        .unwrap_or_default()
}

/// Add `id` unless it is already present. Returns whether the cart changed.
pub fn add(store: &mut EntityStore, id: &str) -> bool {
    let mut cart = items(store);
    if cart.iter().any(|item| item == id) {
        return false;
    }
    cart.push(id.to_string());
    store.write_local(CART_ITEMS, FieldValue::string_list(cart));
    true
}

/// Remove `id`. Returns whether the cart changed.
pub fn remove(store: &mut EntityStore, id: &str) -> bool {
    let mut cart = items(store);
    let before = cart.len();
    cart.retain(|item| item != id);
    if cart.len() == before {
        return false;
    }
    store.write_local(CART_ITEMS, FieldValue::string_list(cart));
    true
}

pub fn clear(store: &mut EntityStore) {
    store.write_local(CART_ITEMS, FieldValue::List(vec![]));
}
