//! snowprov-lib: dependency provisioning for the Snowstorm native build
//!
//! This crate provides the pieces of the provisioning pipeline:
//! - `manifest`: the ordered set of native packages the application needs
//! - `backend`: the vcpkg and Conan package backends behind one trait
//! - `bootstrap`: one-time acquisition of the package-manager executable
//! - `generate`: the CMake configure invocation
//! - `stage`: copying shared libraries and binding sources into the tree
//! - `provision`: the pipeline that ties them together

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod consts;
pub mod filesystem;
pub mod generate;
pub mod manifest;
pub mod platform;
pub mod process;
pub mod provision;
pub mod stage;
pub mod triplet;
pub mod util;
