//! Events emitted by the sample host.

use logline::TypedLog;
use serde::Serialize;

/// A tap on some UI element.
#[derive(Debug, Clone, Serialize)]
pub struct ClickLog {
    pub target: String,
    pub x: i32,
    pub y: i32,
}

impl TypedLog for ClickLog {
    const LOG_TYPE: &'static str = "click";
}

/// A screen becoming visible.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenLog {
    pub name: String,
}

impl TypedLog for ScreenLog {
    const LOG_TYPE: &'static str = "screen";
}

const SCREENS: [&str; 3] = ["home", "search", "settings"];

/// Emits `count` events through `emit`, one screen view for every three
/// clicks.
pub fn generate(count: usize, mut emit: impl FnMut(&dyn logline::LogEvent)) {
    for i in 0..count {
        if i % 4 == 3 {
            emit(&ScreenLog {
                name: SCREENS[(i / 4) % SCREENS.len()].to_string(),
            });
        } else {
            emit(&ClickLog {
                target: format!("button-{}", i % 4),
                x: (i as i32 * 37) % 400,
                y: (i as i32 * 91) % 800,
            });
        }
    }
}
