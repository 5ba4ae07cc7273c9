// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Why a page or detail fetch did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request was superseded or torn down. Never shown to the user.
    #[error("fetch cancelled")]
    Cancelled,
    #[error("fetch failed: {0}")]
    Failed(String),
}

impl FetchError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("view name must not be empty")]
    EmptyName,
    #[error("no view selected")]
    NoSelection,
    #[error("view {0:?} not found")]
    NotFound(String),
}
