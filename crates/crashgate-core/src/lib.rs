//! crashgate Core - Domain model for the diagnostic-event gateway
//!
//! This crate contains:
//! - **Domain entities** - `Severity`, `Category`, `Event`, `BuildChannel`, `InstallId`
//! - **Channel classification** - `ChannelClassifier` over static `AppMetadata`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//! - **Port definitions** - Traits for adapters: `SharedStorage`, `Transport`, `EnvironmentProbe`
//!
//! # Architecture
//!
//! The domain module is pure data and decision logic with no I/O.
//! Ports define trait interfaces that the telemetry crate implements and
//! that host applications may implement themselves.

pub mod config;
pub mod domain;
pub mod ports;
