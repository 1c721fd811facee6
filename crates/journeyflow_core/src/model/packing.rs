//! Packing checklist records.
//!
//! # Invariants
//! - `Item::category_id` should reference an existing `Category`, but the
//!   store does not enforce it; category deletion cascades explicitly.
//! - `Item::category_name` is a denormalized copy kept in sync by callers.

use super::{Record, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Color assigned to categories created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#FF6200EE";

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").expect("valid hex color regex")
});

/// Checklist category. Names are not required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    /// Store-assigned identifier; empty until persisted.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    /// Hex color string, `#RRGGBB` or `#AARRGGBB`.
    pub color: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Older documents stored this flag as `default`.
    #[serde(alias = "default")]
    pub is_default: bool,
}

impl Default for Category {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            owner_id: String::new(),
            created_at: 0,
            is_default: false,
        }
    }
}

impl Category {
    /// Creates an unsaved category.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            ..Self::default()
        }
    }

    /// Marks this category as part of the seeded default set.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

impl Record for Category {
    const COLLECTION: &'static str = "packing_categories";
    const KIND: &'static str = "category";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn set_owner_id(&mut self, owner_id: String) {
        self.owner_id = owner_id;
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn set_created_at(&mut self, epoch_ms: i64) {
        self.created_at = epoch_ms;
    }

    fn display_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName { kind: Self::KIND });
        }
        if !HEX_COLOR_RE.is_match(&self.color) {
            return Err(ValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }
}

/// One thing to pack, filed under a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub is_checked: bool,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub created_at: i64,
}

impl Item {
    /// Creates an unsaved, unchecked item under `category`.
    pub fn new(name: impl Into<String>, category: &Category) -> Self {
        Self {
            name: name.into(),
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            ..Self::default()
        }
    }

    /// Returns a copy with the checked flag set to `checked`.
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.is_checked = checked;
        self
    }
}

impl Record for Item {
    const COLLECTION: &'static str = "packing_items";
    const KIND: &'static str = "item";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn set_owner_id(&mut self, owner_id: String) {
        self.owner_id = owner_id;
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn set_created_at(&mut self, epoch_ms: i64) {
        self.created_at = epoch_ms;
    }

    fn display_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName { kind: Self::KIND });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Item, DEFAULT_CATEGORY_COLOR};
    use crate::model::{Record, ValidationError};
    use serde_json::json;

    #[test]
    fn category_defaults_match_wire_shape() {
        let category = Category::new("Clothing", "#FF03DAC5");
        let json = serde_json::to_value(&category).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["name"], "Clothing");
        assert_eq!(json["userId"], "");
        assert_eq!(json["isDefault"], false);
        assert_eq!(json["createdAt"], 0);
    }

    #[test]
    fn partial_documents_decode_with_defaults() {
        let category: Category = serde_json::from_value(json!({"name": "Docs"})).unwrap();
        assert_eq!(category.color, DEFAULT_CATEGORY_COLOR);
        assert!(!category.is_default);

        let legacy: Category =
            serde_json::from_value(json!({"name": "Docs", "default": true})).unwrap();
        assert!(legacy.is_default);

        let item: Item = serde_json::from_value(json!({"name": "Socks"})).unwrap();
        assert!(!item.is_checked);
        assert!(item.category_id.is_empty());
    }

    #[test]
    fn category_validation_checks_name_and_color() {
        assert!(Category::new("Clothing", "#FF03DAC5").validate().is_ok());
        assert!(Category::new("Clothing", "#03DAC5").validate().is_ok());
        assert_eq!(
            Category::new("  ", "#03DAC5").validate(),
            Err(ValidationError::BlankName { kind: "category" })
        );
        assert_eq!(
            Category::new("Clothing", "teal").validate(),
            Err(ValidationError::InvalidColor("teal".to_string()))
        );
    }

    #[test]
    fn item_new_copies_category_reference() {
        let mut category = Category::new("Clothing", "#FF03DAC5");
        category.id = "cat-1".to_string();
        let item = Item::new("Socks", &category);
        assert_eq!(item.category_id, "cat-1");
        assert_eq!(item.category_name, "Clothing");
        assert!(!item.is_checked);
        assert!(Item::new("", &category).validate().is_err());
    }
}
