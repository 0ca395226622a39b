//! Rendering core of the OLM fleet addon.
//!
//! For each managed cluster the [`agent::OlmAgent`] decides whether OLM should
//! be deployed, picks the manifest bundle matching the cluster's kubernetes
//! version, renders its templates and applies the per-cluster overrides.

pub mod agent;
pub mod assets;
pub mod cluster;
pub mod config;
pub mod error;
pub mod inject;
pub mod resource;
pub mod template;
pub mod values;
pub mod version;

pub use error::{Error, Result};
