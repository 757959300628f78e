//! Lectern Application Library
//!
//! This library provides the catalog modules and supporting layers for
//! the Lectern local-library service.

pub mod catalog;
pub mod forms;
pub mod modules;
pub mod seed;
