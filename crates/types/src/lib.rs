#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the apkforge package emitter
//!
//! This crate provides the parsed package specification handed to the
//! emitter: package metadata, dependency sets, scriptlets, build accounts
//! and the target architecture.

pub mod accounts;
pub mod arch;
pub mod dependencies;
pub mod package;
pub mod scriptlets;

// Re-export commonly used types
pub use accounts::{Accounts, Environment, Group, User};
pub use arch::Arch;
pub use dependencies::{Dependencies, DiscoveredDependencies, PackageOptions};
pub use package::{Configuration, Copyright, Package, Subpackage};
pub use scriptlets::{Scriptlets, Trigger};
