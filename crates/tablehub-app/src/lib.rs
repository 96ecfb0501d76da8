// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod history;
pub mod ids;
pub mod keymap;
pub mod model;
pub mod navigation;
pub mod operations;
pub mod persistence;
pub mod search;
pub mod selection;
pub mod session;
pub mod state;

pub use history::*;
pub use ids::*;
pub use keymap::*;
pub use model::*;
pub use navigation::nearest_visible_column;
pub use operations::{
    FilterCriterion, OperationError, OperationRequest, OperationResponse, PreconditionError,
    SortDirection,
};
pub use persistence::*;
pub use search::*;
pub use selection::*;
pub use session::*;
pub use state::*;
