pub mod behavior;
pub mod build_planner;
pub mod command;
pub mod config;
pub mod delegated_building_execution;
pub mod delegation_registry;
pub mod engine;
pub mod error;
pub mod execution;
pub mod game;
pub mod geometry;
pub mod gold;
pub mod nation_execution;
pub mod nuke_targeting;
pub mod port_execution;
pub mod rng;
pub mod store;
pub mod testing;
pub mod types;
