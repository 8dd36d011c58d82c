//! Shared domain types for the Apex deployment orchestrator.
//!
//! Everything in this crate is pure data plus pure functions over it:
//! - `registry`: components, ports and credential references for one run
//! - `manifest`: the skills manifest document
//! - `topology`: the typed topology descriptor and its assembler

pub mod manifest;
pub mod registry;
pub mod topology;

pub use manifest::SkillsManifest;
pub use registry::{
    ComponentDescriptor, CredentialRef, LayerProfile, PortRegistry, Registry, Secret, VersionCheck,
};
pub use topology::{TopologyAssembler, TopologyDescriptor, endpoint_url};
