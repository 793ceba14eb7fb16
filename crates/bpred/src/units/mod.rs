//! Prediction structures.
//!
//! This module contains the storage-bearing units the orchestrator consults: direction
//! predictors, the branch target buffer, the return address stack, and the indirect
//! target predictor.

/// Branch Resolution Unit structures and their collaborator contracts.
pub mod bru;
