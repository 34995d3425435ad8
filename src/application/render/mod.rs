mod invoker;
mod pipeline;

pub use invoker::{
    DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_RENDER_TIMEOUT, ImageRenderer,
    METRIC_RENDER_INVOCATIONS_TOTAL, METRIC_RENDER_MS, RenderInvokeError, RenderInvoker,
    RenderInvokerConfig, STDERR_CAPTURE_LIMIT,
};
pub use pipeline::{RenderPipeline, RenderPipelineError};
