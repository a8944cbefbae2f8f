//! gittasks
//!
//! In-memory data layer for git-style personal task tracking:
//! - Projects, commits, branches, tasks, issues and pull requests
//! - An async entity store with typed filters and pagination
//! - A graph assembler deriving commit ancestry and project statistics
//! - Fixture generation for seeding and tests
//! - CRUD change notifications over a broadcast event bus

pub mod events;
pub mod fixtures;
pub mod graph;
pub mod models;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use fixtures::{FixtureConfig, SeedConfig};
pub use store::{EntityStore, StoreError};

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub seed: SeedConfig,
    pub events: EventsYamlConfig,
}

/// Event bus configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsYamlConfig {
    pub capacity: usize,
}

impl Default for EventsYamlConfig {
    fn default() -> Self {
        Self {
            capacity: events::DEFAULT_CAPACITY,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Sample data loaded at startup and restored by `reset`
    pub seed: SeedConfig,
    /// Capacity of the CrudEvent broadcast channel
    pub event_capacity: usize,
}

impl Config {
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "gittasks.yaml" in CWD.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let mut seed = yaml.seed;
        if let Some(projects) = env_number("GITTASKS_SEED_PROJECTS") {
            seed.projects = projects;
        }
        if let Some(commits) = env_number("GITTASKS_SEED_COMMITS") {
            seed.project.commits = commits;
        }

        Ok(Self {
            seed,
            event_capacity: env_number("GITTASKS_EVENT_CAPACITY").unwrap_or(yaml.events.capacity),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("gittasks.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn env_number(var: &str) -> Option<usize> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EntityStore>,
    pub events: events::EventBus,
    pub config: Arc<Config>,
}

impl AppState {
    /// Seeded store wired to a fresh event bus
    pub fn new(config: Config) -> Self {
        let events = events::EventBus::new(config.event_capacity);
        let store = EntityStore::seeded(config.seed.clone())
            .with_event_emitter(Arc::new(events.clone()));
        Self {
            store: Arc::new(store),
            events,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
seed:
  projects: 5
  owner: carol
  tasks: 12
  commits: 9
  issues: 1
  pull_requests: 0

events:
  capacity: 64
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.seed.projects, 5);
        assert_eq!(config.seed.project.owner, "carol");
        assert_eq!(config.seed.project.tasks, 12);
        assert_eq!(config.seed.project.commits, 9);
        assert_eq!(config.seed.project.pull_requests, 0);
        assert_eq!(config.events.capacity, 64);
    }

    #[test]
    fn test_yaml_partial_section_keeps_defaults() {
        let yaml = r#"
seed:
  projects: 1
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.seed.projects, 1);
        assert_eq!(config.seed.project.owner, "demo-user");
        assert_eq!(config.events.capacity, events::DEFAULT_CAPACITY);
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.seed.projects, 3);
        assert_eq!(config.seed.project.tasks, 8);
        assert_eq!(config.events.capacity, 1024);
    }

    /// Combined test for YAML file loading and env var overrides.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "GITTASKS_SEED_PROJECTS",
                "GITTASKS_SEED_COMMITS",
                "GITTASKS_EVENT_CAPACITY",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
seed:
  projects: 4
  commits: 10
events:
  capacity: 16
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("gittasks.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.seed.projects, 4);
        assert_eq!(config.seed.project.commits, 10);
        assert_eq!(config.event_capacity, 16);

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("GITTASKS_SEED_PROJECTS", "7");
        std::env::set_var("GITTASKS_EVENT_CAPACITY", "not-a-number");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.seed.projects, 7);
        // Unparseable override falls back to YAML
        assert_eq!(config.event_capacity, 16);
        assert_eq!(config.seed.project.commits, 10);

        clear_env();

        // --- Phase 3: Malformed YAML → defaults ---
        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "seed: [not, a, map").unwrap();
        let config = Config::from_yaml_and_env(Some(&broken)).unwrap();
        assert_eq!(config.seed.projects, 3);

        // --- Phase 4: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-gittasks-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.event_capacity, events::DEFAULT_CAPACITY);
    }

    #[tokio::test]
    async fn test_app_state_seeds_store() {
        let state = AppState::new(Config {
            seed: SeedConfig {
                projects: 2,
                ..Default::default()
            },
            event_capacity: 8,
        });
        assert_eq!(state.store.store_stats().await.projects, 2);
        assert_eq!(state.events.subscriber_count(), 0);
    }
}
