//! Utility functions shared by the pipeline stages.

pub mod file_system;
