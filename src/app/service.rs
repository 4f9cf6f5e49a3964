//! Application service — the orchestrator.
//!
//! [`BarService`] owns the configuration, the catalog, and the handle to
//! the dispense controller. It turns a "make drink X" request into the
//! resolver's bindings and a sequence of rotate/pour calls:
//!
//! ```text
//!  BarCommand ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │        BarService         │
//!  ConfigStore ◀──│  resolver · SharedTurret  │
//!                 └──────────────────────────┘
//! ```
//!
//! The service takes one configuration snapshot per request; edits that
//! land mid-run apply to the next request, never the current one. It
//! never retries a physical fault — recovery requires an explicit reset.

use log::{info, warn};

use crate::catalog::RecipeCatalog;
use crate::config::BarConfig;
use crate::drivers::TurretDriver;
use crate::error::{CatalogError, DispenseError, Error, Result};
use crate::resolver::{self, IngredientSource, ResolveOutcome, ResolvedRecipe, Suggestion};
use crate::turret::{DispenseJob, MotionParams, MotionSnapshot, SharedTurret, Status};

use super::commands::BarCommand;
use super::events::BarEvent;
use super::ports::{ConfigStore, EventSink};

// ───────────────────────────────────────────────────────────────
// Outcomes
// ───────────────────────────────────────────────────────────────

/// Result of a drink request. `NotMakeable` is a normal negative
/// outcome; only hardware and validation failures surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MakeOutcome {
    Served {
        recipe: String,
        dispensed: u32,
        manual: u32,
    },
    NotMakeable {
        recipe: String,
        missing: String,
    },
}

// ───────────────────────────────────────────────────────────────
// BarService
// ───────────────────────────────────────────────────────────────

/// The application service.
pub struct BarService<D: TurretDriver> {
    config: BarConfig,
    params: MotionParams,
    catalog: RecipeCatalog,
    turret: SharedTurret<D>,
}

impl<D: TurretDriver> BarService<D> {
    pub fn new(config: BarConfig, catalog: RecipeCatalog, turret: SharedTurret<D>) -> Self {
        Self::with_params(config, catalog, turret, MotionParams::default())
    }

    pub fn with_params(
        config: BarConfig,
        catalog: RecipeCatalog,
        turret: SharedTurret<D>,
        params: MotionParams,
    ) -> Self {
        Self {
            config,
            params,
            catalog,
            turret,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &BarConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    /// Controller status, non-blocking.
    pub fn status(&self) -> Status {
        self.turret.status()
    }

    /// Resolve the whole catalog against the current configuration.
    pub fn resolve(&self) -> ResolveOutcome {
        resolver::resolve(&self.config, &self.catalog)
    }

    /// The makeable recipes, catalog order.
    pub fn menu(&self) -> Vec<ResolvedRecipe> {
        self.resolve().makeable().cloned().collect()
    }

    /// Recipes one bottle short.
    pub fn one_missing(&self) -> Vec<Suggestion> {
        resolver::one_missing(&self.config, &self.catalog)
    }

    /// Every near-miss with its full missing list.
    pub fn any_missing(&self) -> Vec<Suggestion> {
        resolver::any_missing(&self.config, &self.catalog)
    }

    /// One configuration snapshot, fixed for the duration of a request.
    pub fn snapshot(&self) -> MotionSnapshot {
        MotionSnapshot::of(&self.config, self.params)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(
        &mut self,
        cmd: BarCommand,
        store: &impl ConfigStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            BarCommand::MakeDrink { recipe } => {
                self.make_drink(&recipe, sink).map(|_| ())
            }
            BarCommand::RotateTo { slot } => {
                self.motion(sink, self.turret.rotate_to(&self.snapshot(), slot))
            }
            BarCommand::Pour { slot, volume_oz } => self.motion(
                sink,
                self.turret
                    .dispense(&self.snapshot(), DispenseJob::new(slot, volume_oz)),
            ),
            BarCommand::Home => self.motion(sink, self.turret.home(&self.snapshot())),
            BarCommand::Reset => self.motion(sink, self.turret.reset(&self.snapshot())),
            BarCommand::SetSafeMode(enabled) => {
                let mut updated = self.config.clone();
                updated.safe_mode = enabled;
                self.apply_config(updated, store, sink)
            }
            BarCommand::UpdateConfig(config) => self.apply_config(config, store, sink),
        }
    }

    /// Make a full drink. Pours slot bindings in recipe-declared order,
    /// prompts for pantry bindings, and stops at the first hardware
    /// failure without retrying.
    pub fn make_drink(&self, id_or_name: &str, sink: &mut impl EventSink) -> Result<MakeOutcome> {
        let recipe = self
            .catalog
            .find(id_or_name)
            .ok_or_else(|| CatalogError::UnknownRecipe(id_or_name.to_string()))?;

        // One snapshot for the whole run.
        let snap = self.snapshot();
        let resolved = resolver::resolve_one(&self.config, recipe);

        if !resolved.makeable {
            let missing = resolved.missing.clone().unwrap_or_default();
            info!("'{}' not makeable: missing {missing}", resolved.name);
            sink.emit(&BarEvent::DrinkRejected {
                recipe: resolved.name.clone(),
                missing: missing.clone(),
            });
            return Ok(MakeOutcome::NotMakeable {
                recipe: resolved.name,
                missing,
            });
        }

        sink.emit(&BarEvent::DrinkStarted {
            recipe: resolved.name.clone(),
        });

        let mut dispensed = 0u32;
        let mut manual = 0u32;
        for binding in &resolved.bindings {
            match binding.source {
                IngredientSource::Slot(index) => {
                    let slot = index as u8;
                    let volume_oz = self.config.shot_size * binding.qty;
                    if volume_oz <= 0.0 {
                        // Garnish quantity riding in a slot — nothing to pour.
                        warn!("skipping zero-volume pour of '{}'", binding.requirement);
                        continue;
                    }
                    self.motion(sink, self.turret.rotate_to(&snap, slot))?;
                    self.motion(
                        sink,
                        self.turret.dispense(&snap, DispenseJob::new(slot, volume_oz)),
                    )?;
                    sink.emit(&BarEvent::Poured {
                        ingredient: binding.requirement.clone(),
                        slot,
                        volume_oz,
                        substituted_with: binding.substituted_with.clone(),
                    });
                    dispensed += 1;
                }
                IngredientSource::Pantry => {
                    sink.emit(&BarEvent::PantryAdd {
                        ingredient: binding.requirement.clone(),
                        qty: binding.qty,
                    });
                    manual += 1;
                }
            }
        }

        info!(
            "'{}' ready: {dispensed} poured, {manual} manual",
            resolved.name
        );
        sink.emit(&BarEvent::DrinkReady {
            recipe: resolved.name.clone(),
            dispensed,
            manual,
        });
        Ok(MakeOutcome::Served {
            recipe: resolved.name,
            dispensed,
            manual,
        })
    }

    // ── Internal ──────────────────────────────────────────────

    /// Validate, adopt, and persist a configuration update.
    fn apply_config(
        &mut self,
        mut config: BarConfig,
        store: &impl ConfigStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        config.normalize();
        for warning in config.validate()? {
            warn!("config: {warning}");
        }
        store.save(&config)?;
        sink.emit(&BarEvent::ConfigSaved {
            safe_mode: config.safe_mode,
        });
        self.config = config;
        Ok(())
    }

    /// Surface a controller fault as an event before propagating it.
    fn motion(
        &self,
        sink: &mut impl EventSink,
        result: core::result::Result<(), DispenseError>,
    ) -> Result<()> {
        if let Err(DispenseError::Fault(reason)) = result {
            sink.emit(&BarEvent::Fault { reason });
        }
        result.map_err(Error::from)
    }
}
