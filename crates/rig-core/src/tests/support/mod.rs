//! Test harness utilities for the lifecycle behavioural suite.

mod world;

pub use world::{LifecycleWorld, world};
