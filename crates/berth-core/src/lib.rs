//! Validation, dependency ordering and plan assembly for stack declarations.
//!
//! The flow is linear: a [`StackDeclaration`](berth_model::StackDeclaration) is checked by [`validate`],
//! its units are ordered by the [`DependencyGraph`], the result is assembled into a [`DeploymentPlan`]
//! and handed to a [`Provisioner`].
//! Nothing here talks to a cloud API; reconciliation is the platform's job.

pub mod error;
pub use error::{CoreError, DeclarationError, ParamError, ResolveError};

pub mod params;
pub use params::{ParameterValues, apply_parameters};

pub mod graph;
pub use graph::{DependencyGraph, Edge, StartOrder, resolve};

pub mod validate;
pub use validate::{ValidationReport, ValidationWarning, validate, validate_with_raw};

pub mod plan;
pub use plan::{DeploymentPlan, PlannedUnit, build_plan, build_plan_with_raw};

pub mod provision;
pub use provision::{DryRunProvisioner, JsonProvisioner, Provisioner, ProvisionerRouter};

pub mod template;
pub use template::{RegistryVariant, StackTemplate, StorageVariant};
