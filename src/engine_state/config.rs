//! # Engine Configuration
//!
//! All tunables of the world, the physics engine and the player, loaded from
//! JSON. Every field has a default, so a config file only needs to name what
//! it changes.

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

/// How new chunks are filled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    Perlin,
    Flat,
    Empty,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: i64,
    /// Key of this world in the persistence store.
    pub world_id: i64,
    pub generation: GenerationMethod,
    /// Slab height used by the flat generator.
    pub flat_height: i32,
    /// Chunks whose center is farther than this are not collected for drawing.
    pub visible_radius: f32,
    /// Chunks whose center is farther than this are evicted.
    pub destroy_radius: f32,
    /// Half-size, in chunks, of the square queued around the player.
    pub spawn_radius: i32,
    /// Queued chunks spawned per step.
    pub spawns_per_tick: usize,
    /// Side, in chunks, of the square spawned by `World::init`.
    pub initial_chunks: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            seed: 0,
            world_id: 1,
            generation: GenerationMethod::Perlin,
            flat_height: 64,
            visible_radius: 120.0,
            destroy_radius: 1000.0,
            spawn_radius: 5,
            spawns_per_tick: 3,
            initial_chunks: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub jump_speed: f32,
    /// Vertical speed of a flying body holding the fly control.
    pub fly_speed: f32,
    pub dynamic_restitution: f32,
    pub ground_restitution: f32,
    pub ground_friction: f32,
    pub wall_restitution: f32,
    pub flying_multiplier: f32,
    /// Per-tick displacement at or above which movement is ray-checked.
    pub tunneling_threshold: f32,
    /// Distance kept from the face hit by the tunneling check.
    pub tunneling_backoff: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gravity: 27.5,
            jump_speed: 9.0,
            fly_speed: 5.0,
            dynamic_restitution: 0.5,
            ground_restitution: 0.4,
            ground_friction: 1.0,
            wall_restitution: 0.3,
            flying_multiplier: 4.0,
            tunneling_threshold: 0.7,
            tunneling_backoff: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Horizontal spawn column; the player is dropped onto the ground there.
    pub spawn: [f32; 2],
    pub speed: f32,
    pub mass: f32,
    pub width: f32,
    pub height: f32,
    /// Chunks closer than this are always drawn, whatever the view direction.
    pub radius: f32,
    /// Length of the targeting ray.
    pub reach: f32,
    pub near_plane: f32,
    /// Radians of rotation per unit of look input.
    pub look_sensitivity: f32,
    pub pearl_lifetime_secs: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            spawn: [0.5, 0.5],
            speed: 6.5,
            mass: 80.0,
            width: 0.5,
            height: 1.5,
            radius: 20.0,
            reach: 100.0,
            near_plane: 0.1,
            look_sensitivity: 0.002,
            pearl_lifetime_secs: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub player: PlayerConfig,
    /// Fixed simulation steps per second.
    pub tick_rate: u32,
    /// Longest wall-clock gap the clock will try to catch up on.
    pub max_frame_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            world: WorldConfig::default(),
            physics: PhysicsConfig::default(),
            player: PlayerConfig::default(),
            tick_rate: 60,
            max_frame_secs: 0.25,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "world": { "generation": "flat", "seed": 42 }, "physics": { "gravity": 9.81 } }"#,
        )
        .unwrap();
        assert_eq!(config.world.generation, GenerationMethod::Flat);
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.world.spawns_per_tick, 3);
        assert_eq!(config.physics.gravity, 9.81);
        assert_eq!(config.physics.jump_speed, 9.0);
        assert_eq!(config.player.reach, 100.0);
        assert_eq!(config.tick_rate, 60);
    }

    #[test]
    fn empty_object_is_the_default_config() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
        let json = EngineConfig::default().to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), EngineConfig::default());
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "world": { "generation": "voronoi" } }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
