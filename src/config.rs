//! Engine configuration: immutable after construction.
//!
//! Split into a `serde`-deserialized raw shape and a validated runtime
//! shape: [`RawConfig`] is what comes off the wire or out of a TOML file,
//! [`Config`] is what [`crate::Engine`] actually holds once defaults have
//! been resolved and bounds have been checked.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which side(s) of the car open at a given floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorSide {
    Front,
    Rear,
    Both,
}

impl Default for DoorSide {
    fn default() -> Self {
        DoorSide::Front
    }
}

/// Per-floor overrides. Missing entries default to `accessible = true,
/// open_door_side = Front`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FloorConfig {
    #[serde(default = "default_accessible")]
    pub accessible: bool,
    #[serde(default, rename = "openDoorSide")]
    pub open_door_side: DoorSide,
}

fn default_accessible() -> bool {
    true
}

impl Default for FloorConfig {
    fn default() -> Self {
        FloorConfig {
            accessible: true,
            open_door_side: DoorSide::Front,
        }
    }
}

/// Wire/file shape: durations are fractional seconds, `door_reopen_time` may
/// be omitted, in which case it defaults to `door_open_time`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub id: Option<String>,
    #[serde(rename = "minFloor")]
    pub min_floor: i64,
    #[serde(rename = "maxFloor")]
    pub max_floor: i64,
    #[serde(rename = "initialFloor")]
    pub initial_floor: i64,
    #[serde(rename = "travelTime")]
    pub travel_time: f64,
    #[serde(rename = "travelTimeEdge")]
    pub travel_time_edge: Option<f64>,
    #[serde(rename = "doorSpeed")]
    pub door_speed: f64,
    #[serde(rename = "doorOpenTime")]
    pub door_open_time: f64,
    #[serde(rename = "doorReopenTime")]
    pub door_reopen_time: Option<f64>,
    #[serde(default, rename = "maxWeight")]
    pub max_weight: i64,
    #[serde(default, rename = "floorConfigs")]
    pub floor_configs: HashMap<i64, FloorConfig>,
}

/// Validated, immutable engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub id: Option<String>,
    pub min_floor: i64,
    pub max_floor: i64,
    pub initial_floor: i64,
    pub travel_time: Duration,
    pub travel_time_edge: Duration,
    pub door_speed: Duration,
    pub door_open_time: Duration,
    pub door_reopen_time: Duration,
    pub max_weight: i64,
    pub floor_configs: HashMap<i64, FloorConfig>,
}

impl Config {
    /// Validate and normalize a [`RawConfig`] into a [`Config`], rejecting
    /// an inverted floor range or an out-of-range initial floor up front so
    /// the engine never has to handle an invalid configuration later.
    pub fn from_raw(raw: RawConfig) -> Result<Config, ConfigError> {
        if raw.min_floor > raw.max_floor {
            return Err(ConfigError::InvertedFloorRange {
                min_floor: raw.min_floor,
                max_floor: raw.max_floor,
            });
        }
        if raw.initial_floor < raw.min_floor || raw.initial_floor > raw.max_floor {
            return Err(ConfigError::InitialFloorOutOfRange {
                initial_floor: raw.initial_floor,
                min_floor: raw.min_floor,
                max_floor: raw.max_floor,
            });
        }

        let travel_time = secs(raw.travel_time);
        let travel_time_edge = raw.travel_time_edge.map(secs).unwrap_or(travel_time);
        let door_open_time = secs(raw.door_open_time);
        let door_reopen_time = raw.door_reopen_time.map(secs).unwrap_or(door_open_time);

        Ok(Config {
            id: raw.id,
            min_floor: raw.min_floor,
            max_floor: raw.max_floor,
            initial_floor: raw.initial_floor,
            travel_time,
            travel_time_edge,
            door_speed: secs(raw.door_speed),
            door_open_time,
            door_reopen_time,
            max_weight: raw.max_weight,
            floor_configs: raw.floor_configs,
        })
    }

    pub fn floor_config(&self, floor: i64) -> FloorConfig {
        self.floor_configs.get(&floor).copied().unwrap_or_default()
    }

    pub fn in_bounds(&self, floor: i64) -> bool {
        floor >= self.min_floor && floor <= self.max_floor
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

/// Load a [`Config`] from a TOML file.
pub fn load_config_file(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let raw_str = std::fs::read_to_string(path)?;
    let raw: RawConfig = toml::from_str(&raw_str)?;
    Ok(Config::from_raw(raw)?)
}
