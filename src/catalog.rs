//! Recipe catalog data model.
//!
//! The catalog arrives pre-merged from local and remote sources; this
//! module only deserializes it and answers lookups. Catalog order is
//! significant — the resolver preserves it — so recipes live in a plain
//! ordered list, not a map.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One required ingredient of a recipe.
///
/// `qty` is a dispense quantity in shot units; the pour volume for a slot
/// binding is `shot_size × qty`. Garnishes carry `qty == 0` and are never
/// dispensed. The legacy field name `qty_oz` is accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "item")]
    pub name: String,
    #[serde(alias = "qty_oz")]
    pub qty: f64,
    /// The measure text as originally written, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// A drink recipe: identifier, display name, ordered requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub ingredients: Vec<Requirement>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Ordered recipe collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
}

impl RecipeCatalog {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// Parse the persisted JSON form (an array of recipe records).
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    /// Look a recipe up by identifier, falling back to a case-insensitive
    /// display-name match.
    pub fn find(&self, id_or_name: &str) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.id == id_or_name)
            .or_else(|| {
                self.recipes
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(id_or_name))
            })
    }
}

impl<'a> IntoIterator for &'a RecipeCatalog {
    type Item = &'a Recipe;
    type IntoIter = std::slice::Iter<'a, Recipe>;

    fn into_iter(self) -> Self::IntoIter {
        self.recipes.iter()
    }
}
