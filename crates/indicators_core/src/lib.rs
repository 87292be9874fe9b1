pub mod api;
pub mod error;
pub mod grouping;
pub mod model;
pub mod scope;

pub use api::*;
pub use error::{IndicatorsError, IndicatorsResult};
pub use grouping::group_detailed_rows;
pub use model::*;
pub use scope::{ResolvedScope, ScopeKey, ScopeRequest, resolve_scope};
