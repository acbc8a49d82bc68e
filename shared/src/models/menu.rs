//! Menu Catalog Model
//!
//! 菜单目录（只读）。条目在启动时从内嵌 JSON 装载，运行期不变。

use serde::{Deserialize, Serialize};

/// Menu item entity (菜单项)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image: String,
    pub popular: bool,
    pub is_drink: bool,
}

/// Read-only menu catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuCatalog(pub Vec<MenuItem>);

impl MenuCatalog {
    /// Load the catalog bundled into the binary.
    ///
    /// Panics only if the embedded JSON is malformed, which a unit test
    /// guards against.
    pub fn embedded() -> Self {
        serde_json::from_str(include_str!("menu.json")).expect("embedded menu.json is valid")
    }

    /// Look up an item by product ID.
    pub fn get(&self, product_id: i64) -> Option<&MenuItem> {
        self.0.iter().find(|item| item.id == product_id)
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.0
    }
}
