//! Availability resolver.
//!
//! Pure function of configuration + catalog: which recipes are currently
//! makeable, and from where each required ingredient comes. No shared
//! state, no clock, no randomness — two calls with identical inputs
//! produce identical outputs, which is the property the whole module is
//! tested against.
//!
//! Resolution order per required ingredient, in recipe-declared order:
//!
//! 1. normalize the name (case-fold, trim)
//! 2. direct slot lookup — pourable binding, lowest slot index wins
//! 3. substitution by the *required* name, then slot lookup of the
//!    target (single hop, never chained)
//! 4. pantry lookup (required name first, then the substitution target) —
//!    a "have" binding, not turret-dispensable
//! 5. otherwise unsatisfied: the recipe is not makeable and resolution
//!    for it stops at the first failure
//!
//! Slot bindings always take precedence over pantry bindings.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::catalog::{Recipe, RecipeCatalog};
use crate::config::{normalize_name, BarConfig};

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// Where a required ingredient comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientSource {
    /// Pourable: the turret dispenses from this slot index.
    Slot(usize),
    /// On hand but not loaded — added manually by the operator.
    Pantry,
}

/// One required ingredient bound to a concrete source.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Normalized required name, as written in the recipe.
    pub requirement: String,
    /// Dispense quantity in shot units.
    pub qty: f64,
    pub source: IngredientSource,
    /// The stand-in that satisfied the requirement, when a substitution
    /// was applied.
    pub substituted_with: Option<String>,
}

/// A recipe together with its resolved bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecipe {
    pub id: String,
    pub name: String,
    pub makeable: bool,
    /// Bindings in recipe-declared order, up to the first failure point.
    pub bindings: Vec<Binding>,
    /// First unsatisfied requirement, when not makeable.
    pub missing: Option<String>,
}

/// A malformed recipe that was skipped rather than resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecipe {
    pub id: String,
    pub reason: &'static str,
}

/// The full resolver output: one entry per well-formed recipe, in
/// catalog order, plus diagnostics for the skipped ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOutcome {
    pub recipes: Vec<ResolvedRecipe>,
    pub skipped: Vec<SkippedRecipe>,
}

impl ResolveOutcome {
    /// The makeable subset, catalog order preserved.
    pub fn makeable(&self) -> impl Iterator<Item = &ResolvedRecipe> {
        self.recipes.iter().filter(|r| r.makeable)
    }
}

/// A near-miss recipe for the suggestion queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    /// Every unsatisfied requirement, deduplicated, recipe order.
    pub missing: Vec<String>,
}

// ---------------------------------------------------------------------------
// Availability index
// ---------------------------------------------------------------------------

/// Lookup tables derived from one configuration snapshot. Built once per
/// resolve call; keeps per-ingredient resolution O(1).
struct AvailabilityIndex<'a> {
    /// Ingredient → lowest slot index holding it.
    slot_of: HashMap<&'a str, usize>,
    pantry: HashSet<&'a str>,
    substitutions: &'a std::collections::BTreeMap<String, String>,
}

impl<'a> AvailabilityIndex<'a> {
    fn build(config: &'a BarConfig) -> Self {
        let mut slot_of = HashMap::new();
        for (index, slot) in config.slots.iter().enumerate() {
            if let Some(name) = slot.as_deref() {
                // Lowest index wins when the same ingredient is loaded twice.
                slot_of.entry(name).or_insert(index);
            }
        }
        Self {
            slot_of,
            pantry: config.pantry.iter().map(String::as_str).collect(),
            substitutions: &config.substitutions,
        }
    }

    /// Resolve one normalized requirement. Returns the source and the
    /// substitution target that satisfied it, if any.
    fn resolve(&self, name: &str) -> Option<(IngredientSource, Option<&'a str>)> {
        if let Some(&index) = self.slot_of.get(name) {
            return Some((IngredientSource::Slot(index), None));
        }

        // Single hop: the target name is looked up literally, never
        // re-substituted.
        let target = self.substitutions.get(name).map(String::as_str);
        if let Some(t) = target {
            if let Some(&index) = self.slot_of.get(t) {
                return Some((IngredientSource::Slot(index), Some(t)));
            }
        }

        if self.pantry.contains(name) {
            return Some((IngredientSource::Pantry, None));
        }
        if let Some(t) = target {
            if self.pantry.contains(t) {
                return Some((IngredientSource::Pantry, Some(t)));
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the whole catalog against one configuration snapshot.
pub fn resolve(config: &BarConfig, catalog: &RecipeCatalog) -> ResolveOutcome {
    let index = AvailabilityIndex::build(config);
    let mut outcome = ResolveOutcome::default();

    for recipe in catalog {
        if recipe.ingredients.is_empty() {
            warn!("skipping recipe '{}' ({}): no requirements", recipe.name, recipe.id);
            outcome.skipped.push(SkippedRecipe {
                id: recipe.id.clone(),
                reason: "no requirements",
            });
            continue;
        }
        outcome.recipes.push(resolve_recipe(&index, recipe));
    }
    outcome
}

/// Resolve a single recipe against one configuration snapshot.
pub fn resolve_one(config: &BarConfig, recipe: &Recipe) -> ResolvedRecipe {
    resolve_recipe(&AvailabilityIndex::build(config), recipe)
}

fn resolve_recipe(index: &AvailabilityIndex<'_>, recipe: &Recipe) -> ResolvedRecipe {
    let mut bindings = Vec::with_capacity(recipe.ingredients.len());

    for req in &recipe.ingredients {
        let Some(name) = normalize_name(&req.name) else {
            continue;
        };
        match index.resolve(&name) {
            Some((source, substituted_with)) => bindings.push(Binding {
                requirement: name,
                qty: req.qty,
                source,
                substituted_with: substituted_with.map(str::to_owned),
            }),
            None => {
                // Short-circuit: cost stays proportional to the first failure.
                return ResolvedRecipe {
                    id: recipe.id.clone(),
                    name: recipe.name.clone(),
                    makeable: false,
                    bindings,
                    missing: Some(name),
                };
            }
        }
    }

    ResolvedRecipe {
        id: recipe.id.clone(),
        name: recipe.name.clone(),
        makeable: true,
        bindings,
        missing: None,
    }
}

// ---------------------------------------------------------------------------
// Suggestion queries
// ---------------------------------------------------------------------------

/// Every unsatisfied requirement of a recipe — full scan, no
/// short-circuit. Used by the suggestion queries only.
pub fn missing_ingredients(config: &BarConfig, recipe: &Recipe) -> Vec<String> {
    let index = AvailabilityIndex::build(config);
    let mut missing = Vec::new();
    for req in &recipe.ingredients {
        let Some(name) = normalize_name(&req.name) else {
            continue;
        };
        if index.resolve(&name).is_none() && !missing.contains(&name) {
            missing.push(name);
        }
    }
    missing
}

/// Recipes missing exactly one ingredient — the "buy one bottle" list.
pub fn one_missing(config: &BarConfig, catalog: &RecipeCatalog) -> Vec<Suggestion> {
    near_misses(config, catalog, |missing| missing.len() == 1)
}

/// Recipes missing at least one ingredient, with the full missing list.
pub fn any_missing(config: &BarConfig, catalog: &RecipeCatalog) -> Vec<Suggestion> {
    near_misses(config, catalog, |missing| !missing.is_empty())
}

fn near_misses(
    config: &BarConfig,
    catalog: &RecipeCatalog,
    keep: impl Fn(&[String]) -> bool,
) -> Vec<Suggestion> {
    catalog
        .iter()
        .filter(|r| !r.ingredients.is_empty())
        .filter_map(|recipe| {
            let missing = missing_ingredients(config, recipe);
            keep(&missing).then(|| Suggestion {
                id: recipe.id.clone(),
                name: recipe.name.clone(),
                missing,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Requirement;

    fn req(name: &str, qty: f64) -> Requirement {
        Requirement {
            name: name.into(),
            qty,
            raw: None,
        }
    }

    fn recipe(id: &str, name: &str, reqs: Vec<Requirement>) -> Recipe {
        Recipe {
            id: id.into(),
            name: name.into(),
            instructions: None,
            image: None,
            ingredients: reqs,
        }
    }

    /// slots = [gin, _, vodka, tonic, ...], pantry = [lime],
    /// substitutions = {soda water -> tonic}
    fn fixture_config() -> BarConfig {
        let mut c = BarConfig::default();
        c.slots[0] = Some("gin".into());
        c.slots[2] = Some("vodka".into());
        c.slots[3] = Some("tonic".into());
        c.pantry = vec!["lime".into()];
        c.substitutions.insert("soda water".into(), "tonic".into());
        c
    }

    #[test]
    fn worked_example_binds_slot_substitution_and_pantry() {
        let config = fixture_config();
        let r = recipe(
            "1",
            "Gin Rickey",
            vec![req("Gin", 1.0), req("Soda Water", 2.0), req("Lime", 0.0)],
        );
        let resolved = resolve_one(&config, &r);

        assert!(resolved.makeable);
        assert_eq!(resolved.missing, None);
        assert_eq!(resolved.bindings.len(), 3);
        assert_eq!(resolved.bindings[0].source, IngredientSource::Slot(0));
        assert_eq!(resolved.bindings[0].substituted_with, None);
        assert_eq!(resolved.bindings[1].source, IngredientSource::Slot(3));
        assert_eq!(
            resolved.bindings[1].substituted_with.as_deref(),
            Some("tonic")
        );
        assert_eq!(resolved.bindings[2].source, IngredientSource::Pantry);
    }

    #[test]
    fn unmatched_ingredient_short_circuits() {
        let config = fixture_config();
        let r = recipe(
            "2",
            "Negroni-ish",
            vec![req("gin", 1.0), req("campari", 1.0), req("vodka", 1.0)],
        );
        let resolved = resolve_one(&config, &r);

        assert!(!resolved.makeable);
        assert_eq!(resolved.missing.as_deref(), Some("campari"));
        // Nothing beyond the first failure point.
        assert_eq!(resolved.bindings.len(), 1);
        assert_eq!(resolved.bindings[0].requirement, "gin");
    }

    #[test]
    fn slot_takes_precedence_over_pantry() {
        let mut config = fixture_config();
        config.pantry.push("gin".into());
        let resolved = resolve_one(&config, &recipe("3", "Gin Shot", vec![req("gin", 1.0)]));
        assert_eq!(resolved.bindings[0].source, IngredientSource::Slot(0));
    }

    #[test]
    fn substitution_only_applies_when_literal_is_absent() {
        let mut config = fixture_config();
        // A pathological map: gin -> vodka. Gin is loaded, so the
        // substitution must never fire.
        config.substitutions.insert("gin".into(), "vodka".into());
        let resolved = resolve_one(&config, &recipe("4", "Martini", vec![req("gin", 1.0)]));
        assert_eq!(resolved.bindings[0].source, IngredientSource::Slot(0));
        assert_eq!(resolved.bindings[0].substituted_with, None);
    }

    #[test]
    fn substitutions_never_chain() {
        let mut config = BarConfig::default();
        config.slots[5] = Some("cola".into());
        config.substitutions.insert("rum".into(), "whiskey".into());
        config.substitutions.insert("whiskey".into(), "cola".into());

        // rum -> whiskey: whiskey is neither in a slot nor the pantry, and
        // the chain to cola must not be followed.
        let resolved = resolve_one(&config, &recipe("5", "Rum Drink", vec![req("rum", 1.0)]));
        assert!(!resolved.makeable);
        assert_eq!(resolved.missing.as_deref(), Some("rum"));
    }

    #[test]
    fn substitution_target_in_pantry_counts_as_have() {
        let mut config = BarConfig::default();
        config.pantry = vec!["tonic".into()];
        config.substitutions.insert("soda water".into(), "tonic".into());
        let resolved = resolve_one(
            &config,
            &recipe("6", "Fizz", vec![req("soda water", 1.0)]),
        );
        assert!(resolved.makeable);
        assert_eq!(resolved.bindings[0].source, IngredientSource::Pantry);
        assert_eq!(
            resolved.bindings[0].substituted_with.as_deref(),
            Some("tonic")
        );
    }

    #[test]
    fn duplicate_slot_resolves_to_lowest_index() {
        let mut config = BarConfig::default();
        config.slots[9] = Some("vodka".into());
        config.slots[4] = Some("vodka".into());
        let resolved = resolve_one(&config, &recipe("7", "Vodka", vec![req("vodka", 1.0)]));
        assert_eq!(resolved.bindings[0].source, IngredientSource::Slot(4));
    }

    #[test]
    fn catalog_order_is_preserved_and_empty_recipes_are_skipped() {
        let config = fixture_config();
        let catalog = RecipeCatalog::new(vec![
            recipe("a", "First", vec![req("gin", 1.0)]),
            recipe("b", "Broken", vec![]),
            recipe("c", "Third", vec![req("campari", 1.0)]),
        ]);
        let outcome = resolve(&config, &catalog);

        let ids: Vec<_> = outcome.recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(
            outcome.skipped,
            vec![SkippedRecipe {
                id: "b".into(),
                reason: "no requirements",
            }]
        );
        assert!(outcome.recipes[0].makeable);
        assert!(!outcome.recipes[1].makeable);
    }

    #[test]
    fn resolve_is_repeatable() {
        let config = fixture_config();
        let catalog = RecipeCatalog::new(vec![
            recipe("a", "One", vec![req("gin", 1.5), req("lime", 0.0)]),
            recipe("b", "Two", vec![req("soda water", 1.0)]),
            recipe("c", "Three", vec![req("absinthe", 1.0)]),
        ]);
        assert_eq!(resolve(&config, &catalog), resolve(&config, &catalog));
    }

    #[test]
    fn suggestions_split_by_missing_count() {
        let config = fixture_config();
        let catalog = RecipeCatalog::new(vec![
            recipe("a", "Makeable", vec![req("gin", 1.0)]),
            recipe("b", "One Short", vec![req("gin", 1.0), req("campari", 1.0)]),
            recipe(
                "c",
                "Two Short",
                vec![req("campari", 1.0), req("sweet vermouth", 1.0)],
            ),
        ]);

        let one = one_missing(&config, &catalog);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id, "b");
        assert_eq!(one[0].missing, vec!["campari".to_string()]);

        let any = any_missing(&config, &catalog);
        let ids: Vec<_> = any.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(
            any[1].missing,
            vec!["campari".to_string(), "sweet vermouth".to_string()]
        );
    }

    #[test]
    fn missing_list_is_deduplicated() {
        let config = BarConfig::default();
        let r = recipe(
            "8",
            "Double Trouble",
            vec![req("Campari", 1.0), req("campari ", 1.0)],
        );
        assert_eq!(missing_ingredients(&config, &r), vec!["campari".to_string()]);
    }
}
