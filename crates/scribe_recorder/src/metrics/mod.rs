//! Typing-speed metrics.

mod rolling;
mod sampler;

pub use rolling::{MetricsConfig, RollingWpm};
pub use sampler::{MetricSampler, MetricsUpdate, SamplerHandle, SharedText, TypedCounter};
