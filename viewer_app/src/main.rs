//! Model viewer application
//!
//! Opens a window, loads the configured model and texture, and renders
//! the model spinning under a fixed light until the window closes or
//! Escape is pressed.

use glfw::{Action, Key, WindowEvent};
use viewer_engine::assets::SceneAssets;
use viewer_engine::config::ViewerConfig;
use viewer_engine::render::renderer::has_drawable_extent;
use viewer_engine::render::{Renderer, Window};

const DEFAULT_CONFIG_PATH: &str = "viewer.toml";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = ViewerConfig::load_or_default(&config_path)?;
    log::info!("Configuration loaded from {}", config_path);

    let mut window = Window::new(
        &config.window.title,
        config.window.width,
        config.window.height,
    )?;

    let assets = SceneAssets::load(&config)?;
    let mut renderer = Renderer::new(&mut window, &config, &assets)?;

    log::info!("Entering main loop");
    while !window.should_close() {
        window.poll_events();

        let mut close_requested = false;
        for (_, event) in window.flush_events() {
            if let WindowEvent::Key(Key::Escape, _, Action::Press, _) = event {
                close_requested = true;
            }
        }
        if close_requested {
            window.set_should_close(true);
        }

        // Minimized: block until an event restores the window instead of
        // spinning on skipped frames.
        let (width, height) = window.framebuffer_size();
        if !has_drawable_extent(width, height) {
            window.wait_events();
            continue;
        }

        renderer.draw_frame(&window)?;
    }

    // Let in-flight frames drain before the renderer tears down.
    renderer.wait_idle();
    log::info!("Shutting down");
    Ok(())
}
