mod loop_runner;
mod metrics;
mod scene;

pub use loop_runner::{run_headless, LoopConfig, RunSummary, StopReason};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{
    Entity, EntityId, EntityIdAllocator, RenderableDesc, RenderableKind, Scene, SceneCommand,
    SceneWorld, Transform, Vec2,
};
