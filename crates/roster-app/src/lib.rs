// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod cancel;
pub mod dataset;
pub mod detail;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filters;
pub mod grid;
pub mod ids;
pub mod model;
pub mod overrides;
pub mod query;
pub mod selection;
pub mod state;
#[cfg(test)]
pub(crate) mod test_support;
pub mod views;
pub mod window;

pub use cancel::*;
pub use dataset::*;
pub use detail::*;
pub use error::*;
pub use export::*;
pub use fetch::*;
pub use filters::*;
pub use grid::*;
pub use ids::*;
pub use model::*;
pub use overrides::*;
pub use query::*;
pub use selection::*;
pub use state::*;
pub use views::*;
pub use window::*;
