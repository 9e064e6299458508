//! Declaration types for a multi-container deployment.
//!
//! Everything here is static data: what a unit is, how it depends on other units and how the stack around it is laid out.
//! Validation and ordering live in `berth-core`.

mod error;
pub use error::ModelError;

mod unit_id;
pub use unit_id::UnitId;

mod unit_env;
pub use unit_env::UnitEnv;

mod unit_state;
pub use unit_state::UnitState;

mod condition;
pub use condition::DependencyCondition;

mod health;
pub use health::HealthCheck;

mod image;
pub use image::ImageSource;

mod unit;
pub use unit::{Dependency, LogSettings, MountPoint, PortMapping, Protocol, Unit};

mod stack;
pub use stack::{
    NetworkSpec, Parameter, RemovalPolicy, ScalingSpec, ServiceSpec, StackDeclaration, StackMeta,
    StorageSpec, TaskSpec, Volume,
};

/// Cpu units as understood by the container platform (1024 = one vCPU).
pub type CpuUnits = u32;

/// Memory limit in MiB.
pub type MemoryMib = u32;
