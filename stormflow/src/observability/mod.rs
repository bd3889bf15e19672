//! Tracing setup and timing helpers.

mod tracing;

pub use self::tracing::{init_tracing, pipeline_span, stage_span, LogFormat, SpanTimer};
