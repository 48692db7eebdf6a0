/*!
 * Layout reflow: glyph metrics, line breaking and scale search.
 */

pub mod metrics;
pub mod reflow;
pub mod wrap;

pub use self::metrics::{GlyphMetrics, HeuristicMetrics};
pub use self::reflow::{LayoutConfig, ReflowEngine, ReflowedBlock, default_scale_ladder};
pub use self::wrap::{BreakStrategy, WrappedLine, wrap};
