//! Source graph discovery for sitepack.
//!
//! The [`Planner`] reads entry points through a [`Runtime`](runtime::Runtime),
//! extracts references (script imports, stylesheet imports, `url()`
//! references, HTML includes and attributes), resolves them, and returns a
//! [`SourceGraph`] that has passed the cycle policy in [`cycles`].

pub mod cycles;
pub mod error;
pub mod graph;
pub mod node;
pub mod planner;
pub mod reference;
pub mod resolve;
pub mod runtime;

pub use cycles::{check_cycles, find_illegal_cycle};
pub use error::{PlanError, Result, format_cycle};
pub use graph::{Entry, SourceGraph};
pub use node::{Dependency, NodeId, SourceKind, SourceNode};
pub use planner::Planner;
pub use reference::{RawReference, ReferenceKind, ReferenceSyntax, extract};
pub use resolve::Resolver;
