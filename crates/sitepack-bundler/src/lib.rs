//! Transform dispatch, asset emission and incremental build sessions for
//! sitepack.
//!
//! A build plans the [`SourceGraph`](sitepack_graph::SourceGraph), runs each
//! node's transform chain through the [`Dispatcher`], and hands the results
//! to the [`Emitter`], which names, hashes and rewrites the outputs. A
//! [`BuildSession`] keeps enough state between runs to redo only what
//! changed.

pub mod cache;
pub mod content;
pub mod dispatcher;
pub mod emit;
pub mod error;
pub mod hot;
pub mod pipeline;
pub mod session;
pub mod transform;

pub use cache::{ChangeSet, TransformCache, TransformKey, detect_changes};
pub use content::{Content, ContentKind, SourceMap};
pub use dispatcher::{Dispatched, Dispatcher};
pub use emit::{EmitOutcome, EmitScope, EmitState, EmittedAsset, Emitter, OutputWriter};
pub use error::{BuildError, EmitError, Result, TransformError};
pub use hot::HotUpdate;
pub use pipeline::{CancelToken, Lifecycle, PipelineState};
pub use session::{AssetSummary, BuildReport, BuildSession, OutputTarget, Pipeline};
pub use transform::{Transform, TransformContext, TransformRegistry};
