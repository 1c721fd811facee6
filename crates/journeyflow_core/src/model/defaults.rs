//! Starter checklist seeded for new accounts.

use super::packing::{Category, Item};

const PRIMARY: &str = "#FF6200EE";
const SECONDARY: &str = "#FF03DAC5";

/// Default categories in creation order, with their colors.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Toiletries", PRIMARY),
    ("Clothing", SECONDARY),
    ("Travel Essentials", PRIMARY),
    ("Electronics", SECONDARY),
    ("Documents", PRIMARY),
];

/// Starter items keyed by default category name.
pub const DEFAULT_ITEMS: &[(&str, &[&str])] = &[
    (
        "Toiletries",
        &["Toothbrush", "Toothpaste", "Shampoo", "Soap", "Deodorant"],
    ),
    (
        "Clothing",
        &["Underwear", "Socks", "T-shirts", "Pants/Jeans", "Pajamas"],
    ),
    (
        "Travel Essentials",
        &[
            "Passport/ID",
            "Tickets/Boarding Pass",
            "Wallet",
            "Phone Charger",
            "Headphones",
        ],
    ),
    (
        "Electronics",
        &["Phone", "Laptop/Tablet", "Camera", "Power Bank"],
    ),
    (
        "Documents",
        &["Travel Insurance", "Hotel Reservations", "Emergency Contacts"],
    ),
];

/// Builds the unsaved default category set.
pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, color)| Category::new(*name, *color).as_default())
        .collect()
}

/// Builds starter items for whichever default categories exist in
/// `categories`, matched by name. Categories without an id are skipped.
pub fn default_items_for(categories: &[Category]) -> Vec<Item> {
    DEFAULT_ITEMS
        .iter()
        .filter_map(|(category_name, names)| {
            categories
                .iter()
                .find(|category| category.name == *category_name && !category.id.is_empty())
                .map(|category| (category, *names))
        })
        .flat_map(|(category, names)| names.iter().map(move |name| Item::new(*name, category)))
        .collect()
}
