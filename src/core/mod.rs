pub mod activity;
pub mod errors;
pub mod relation;

pub use activity::{Activity, ActivityState};
pub use errors::{GraphError, Result};
pub use relation::{Relation, RelationType};
