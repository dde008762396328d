//! A3S Pin CLI - pin Dockerfile images to immutable digests.

pub mod commands;
