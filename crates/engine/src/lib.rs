pub mod app;

pub use app::{
    run_headless, Entity, EntityId, EntityIdAllocator, LoopConfig, LoopMetricsSnapshot,
    MetricsHandle, RenderableDesc, RenderableKind, RunSummary, Scene, SceneCommand, SceneWorld,
    StopReason, Transform, Vec2,
};
