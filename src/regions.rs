//! Screen region manager.
//!
//! Partitions the framebuffer into three logical regions and enforces the
//! discipline that keeps tasks out of each other's cells:
//!
//! - the *text area* (rows 0..24 minus the cells below), driven by the
//!   display cursor;
//! - two *overlay bands* on the right edge, one row per live heartbeat
//!   instance, written only through `overlay_row` / `overlay_clear_row`;
//! - the *HUD*, a 26x6 task summary anchored bottom-right, redrawn lazily
//!   whenever the task table changed.

use crate::apps::heartbeat;
use crate::drivers::screen::{self, VGA_HEIGHT, VGA_WIDTH};
use crate::scheduler::{self, TaskState};
use core::sync::atomic::{AtomicBool, Ordering};

/// First column of the overlay bands; they extend to the right edge.
pub const OVERLAY_COL: usize = 60;

/// Row bases of the two overlay bands
pub const HB0_ROW_BASE: usize = 0;
pub const HB1_ROW_BASE: usize = 4;

/// Rows per overlay band
pub const OVERLAY_MAX_LINES: usize = 4;

/// HUD rectangle, anchored at the bottom-right corner
const HUD_WIDTH: usize = 26;
const HUD_HEIGHT: usize = 6;

/// Set whenever the task table changed; the HUD redraws on the next
/// schedule tick (or explicit draw) and clears the flag.
static HUD_DIRTY: AtomicBool = AtomicBool::new(true);

pub fn hud_mark_dirty() {
    HUD_DIRTY.store(true, Ordering::Relaxed);
}

/// Overlay row owned by instance `idx` of `owner`, if `owner` is an
/// overlay-owning task name and the index fits its band.
pub fn overlay_row(owner: &str, idx: usize) -> Option<usize> {
    let base = match owner {
        heartbeat::HB0_NAME => HB0_ROW_BASE,
        heartbeat::HB1_NAME => HB1_ROW_BASE,
        _ => return None,
    };
    if idx < OVERLAY_MAX_LINES {
        Some(base + idx)
    } else {
        None
    }
}

/// Blank one overlay row from `OVERLAY_COL` to the right edge.
pub fn overlay_clear_row(row: usize) {
    screen::with_screen(|s| {
        for col in OVERLAY_COL..VGA_WIDTH {
            s.put_char_at(row, col, b' ');
        }
    });
}

/// Clear both overlay bands and force a HUD redraw.
///
/// Used by the shell's `clear` command after wiping the text area; live
/// heartbeats repaint their rows on their next tick.
pub fn overlays_redraw() {
    for row in 0..(HB1_ROW_BASE + OVERLAY_MAX_LINES) {
        overlay_clear_row(row);
    }
    hud_mark_dirty();
    hud_draw_if_dirty();
}

/// Redraw the HUD when the dirty flag is set.
///
/// Clears the rectangle, writes the `Tasks` title, then one line per live
/// slot (up to five): `#<id> <state-char> <name>`. Unnamed tasks show `?`.
pub fn hud_draw_if_dirty() {
    if !HUD_DIRTY.swap(false, Ordering::Relaxed) {
        return;
    }

    let snapshot = scheduler::tasks_snapshot();

    screen::with_screen(|s| {
        let start_col = VGA_WIDTH - HUD_WIDTH;
        let start_row = VGA_HEIGHT - HUD_HEIGHT;

        for row in 0..HUD_HEIGHT {
            for col in 0..HUD_WIDTH {
                s.put_char_at(start_row + row, start_col + col, b' ');
            }
        }

        s.write_at(start_row, start_col, "Tasks");

        let mut line = 1;
        for (id, task) in snapshot.iter().enumerate() {
            if line >= HUD_HEIGHT {
                break;
            }
            if task.state == TaskState::Dead {
                continue;
            }

            s.put_char_at(start_row + line, start_col, b'#');
            s.put_char_at(start_row + line, start_col + 1, b'0' + (id % 10) as u8);
            s.put_char_at(start_row + line, start_col + 3, task.state.display_char());
            s.write_at(start_row + line, start_col + 5, task.name.unwrap_or("?"));

            line += 1;
        }
    });
}
