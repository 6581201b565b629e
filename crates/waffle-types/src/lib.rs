pub mod geom_ref;
pub mod geometry;
pub mod ids;
pub mod roles;
pub mod topo;

pub use geom_ref::*;
pub use geometry::*;
pub use ids::*;
pub use roles::*;
pub use topo::*;
