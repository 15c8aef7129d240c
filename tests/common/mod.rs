//! Common test utilities and mock infrastructure
//!
//! This module provides shared functionality for integration tests including:
//! - A scripted command runner standing in for the host
//! - lsblk, smartctl and iostat fixtures
//! - Session helpers for running `sh` scripts in place of wipe tools

#![allow(dead_code)]

pub mod mock_commands;
pub mod test_helpers;
