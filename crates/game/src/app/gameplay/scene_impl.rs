use engine::{Scene, SceneCommand, SceneWorld};
use tracing::info;

use super::scene_state::GameplayScene;
use super::GAMEPLAY_SYSTEM_ORDER_TEXT;

impl Scene for GameplayScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.clear_runtime();
        self.populate_world(world);
        world.apply_pending();
        info!("sys: {}", GAMEPLAY_SYSTEM_ORDER_TEXT);
    }

    fn update(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
        self.run_tick(fixed_dt_seconds, world);
        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        info!(ticks = self.tick_count(), "scene_unloaded");
        self.clear_runtime();
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some(format!(
            "Whisperfield | workers: {} | fields: {} | tick: {}",
            self.workers.len(),
            self.wheat_fields.len(),
            self.tick_count()
        ))
    }
}
