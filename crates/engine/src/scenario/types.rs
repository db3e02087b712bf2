use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::MoverMotion;
use crate::sim::{StaticSolid, Vec3};

pub const SCENARIO_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
    #[error("failed to encode {what} as json: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A self-contained world description: static geometry, entities with their
/// support links, and scripted movers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDef {
    pub format_version: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Stop the run once the world reaches this tick.
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub despawn_crushed: bool,
    #[serde(default)]
    pub solids: Vec<StaticSolid>,
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub motions: Vec<MotionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub origin: Vec3,
    #[serde(default)]
    pub angles: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    #[serde(default = "default_solid")]
    pub solid: bool,
    #[serde(default)]
    pub crushable: bool,
    /// Name of the entity this one rests on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,
}

fn default_solid() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionDef {
    pub mover: String,
    #[serde(default)]
    pub linear_velocity: Vec3,
    #[serde(default)]
    pub angular_velocity: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_ticks: Option<u32>,
    #[serde(default)]
    pub crush_on_block: bool,
    #[serde(default)]
    pub reverse_on_block: bool,
}

impl MotionDef {
    pub fn to_motion(&self) -> MoverMotion {
        MoverMotion {
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            travel_ticks: self.travel_ticks,
            crush_on_block: self.crush_on_block,
            reverse_on_block: self.reverse_on_block,
        }
    }
}
