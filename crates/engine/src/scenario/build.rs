use std::collections::HashMap;
use std::fmt::Display;

use tracing::info;

use crate::app::{Scene, SceneCommand, SceneWorld};
use crate::sim::{Bounds, EntityId, Transform, Vec3};

use super::types::{ScenarioDef, ScenarioError, SCENARIO_FORMAT_VERSION};

fn validation_err(path: &str, message: impl Into<String>) -> ScenarioError {
    ScenarioError::Validation {
        path: path.to_string(),
        message: message.into(),
    }
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> ScenarioError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn require_finite(path: &str, value: Vec3) -> Result<(), ScenarioError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(expected_actual(path, "finite vector", format!("{value:?}")))
    }
}

fn require_ordered(path: &str, mins: Vec3, maxs: Vec3) -> Result<(), ScenarioError> {
    if mins.all_le(maxs) {
        Ok(())
    } else {
        Err(validation_err(
            path,
            format!("mins {mins:?} exceed maxs {maxs:?}"),
        ))
    }
}

impl ScenarioDef {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.format_version != SCENARIO_FORMAT_VERSION {
            return Err(expected_actual(
                "format_version",
                SCENARIO_FORMAT_VERSION,
                self.format_version,
            ));
        }
        if self.name.trim().is_empty() {
            return Err(validation_err("name", "scenario name must not be empty"));
        }

        for (index, solid) in self.solids.iter().enumerate() {
            require_finite(&format!("solids[{index}].mins"), solid.mins)?;
            require_finite(&format!("solids[{index}].maxs"), solid.maxs)?;
            require_ordered(&format!("solids[{index}]"), solid.mins, solid.maxs)?;
        }

        let mut known_names = HashMap::with_capacity(self.entities.len());
        for (index, entity) in self.entities.iter().enumerate() {
            let name_path = format!("entities[{index}].name");
            if entity.name.trim().is_empty() {
                return Err(validation_err(&name_path, "entity name must not be empty"));
            }
            if let Some(first_index) = known_names.insert(entity.name.as_str(), index) {
                return Err(validation_err(
                    &name_path,
                    format!(
                        "duplicate name '{}' (first seen at entities[{first_index}].name)",
                        entity.name
                    ),
                ));
            }
            require_finite(&format!("entities[{index}].origin"), entity.origin)?;
            require_finite(&format!("entities[{index}].angles"), entity.angles)?;
            require_finite(&format!("entities[{index}].mins"), entity.mins)?;
            require_finite(&format!("entities[{index}].maxs"), entity.maxs)?;
            require_ordered(&format!("entities[{index}]"), entity.mins, entity.maxs)?;
        }

        for (index, entity) in self.entities.iter().enumerate() {
            let links = [
                ("ground", entity.ground.as_deref()),
                ("attached_to", entity.attached_to.as_deref()),
            ];
            for (field, target) in links {
                let Some(target) = target else {
                    continue;
                };
                let path = format!("entities[{index}].{field}");
                if target == entity.name {
                    return Err(validation_err(&path, "entity cannot support itself"));
                }
                if !known_names.contains_key(target) {
                    return Err(validation_err(&path, format!("unknown entity '{target}'")));
                }
            }
        }

        let mut movers = HashMap::with_capacity(self.motions.len());
        for (index, motion) in self.motions.iter().enumerate() {
            let mover_path = format!("motions[{index}].mover");
            if !known_names.contains_key(motion.mover.as_str()) {
                return Err(validation_err(
                    &mover_path,
                    format!("unknown entity '{}'", motion.mover),
                ));
            }
            if let Some(first_index) = movers.insert(motion.mover.as_str(), index) {
                return Err(validation_err(
                    &mover_path,
                    format!(
                        "mover '{}' already has a motion at motions[{first_index}]",
                        motion.mover
                    ),
                ));
            }
            require_finite(
                &format!("motions[{index}].linear_velocity"),
                motion.linear_velocity,
            )?;
            require_finite(
                &format!("motions[{index}].angular_velocity"),
                motion.angular_velocity,
            )?;
            if motion.travel_ticks == Some(0) {
                return Err(expected_actual(
                    &format!("motions[{index}].travel_ticks"),
                    "positive tick count",
                    0,
                ));
            }
        }

        Ok(())
    }

    /// Validates the definition and populates `world` with it.
    pub fn build_into(&self, world: &mut SceneWorld) -> Result<(), ScenarioError> {
        self.validate()?;

        for solid in &self.solids {
            world.add_solid(solid.clone());
        }

        let mut ids = HashMap::<&str, EntityId>::with_capacity(self.entities.len());
        for entity in &self.entities {
            let transform = Transform::at(entity.origin).with_angles(entity.angles);
            let bounds = Bounds::new(entity.mins, entity.maxs);
            let id = if entity.crushable {
                world.spawn_crushable(entity.name.as_str(), transform, bounds)
            } else {
                world.spawn(entity.name.as_str(), transform, bounds)
            };
            ids.insert(entity.name.as_str(), id);
        }
        world.apply_pending();

        for entity in &self.entities {
            let id = ids[entity.name.as_str()];
            let ground = entity.ground.as_deref().map(|name| ids[name]);
            let attached_to = entity.attached_to.as_deref().map(|name| ids[name]);
            if let Some(spawned) = world.entities_mut().find_entity_mut(id) {
                spawned.solid = entity.solid;
                spawned.ground_entity = ground;
                spawned.attached_to = attached_to;
            }
        }

        for motion in &self.motions {
            world.set_motion(ids[motion.mover.as_str()], motion.to_motion());
        }
        world.set_despawn_crushed(self.despawn_crushed);

        info!(
            scenario = self.name.as_str(),
            entities = self.entities.len(),
            solids = self.solids.len(),
            movers = self.motions.len(),
            "scenario_built"
        );
        Ok(())
    }
}

/// Runs a [`ScenarioDef`]: every tick advances the scripted movers.
#[derive(Debug, Clone)]
pub struct ScenarioScene {
    def: ScenarioDef,
}

impl ScenarioScene {
    pub fn new(def: ScenarioDef) -> Self {
        Self { def }
    }

    pub fn def(&self) -> &ScenarioDef {
        &self.def
    }
}

impl Scene for ScenarioScene {
    fn load(&mut self, world: &mut SceneWorld) -> Result<(), ScenarioError> {
        self.def.build_into(world)
    }

    fn update(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
        world.advance_movers(fixed_dt_seconds);
        match self.def.ticks {
            Some(ticks) if world.tick() >= ticks => SceneCommand::Stop,
            _ => SceneCommand::None,
        }
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        world.clear();
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some(self.def.name.clone())
    }
}
