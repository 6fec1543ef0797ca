//! Interactive shell task.
//!
//! Reads one line at a time through the line editor and dispatches on
//! literal command match. Every iteration ends in a yield so the heartbeat
//! tasks get time even while someone is typing.

use crate::apps::heartbeat;
use crate::arch::power;
use crate::debugln;
use crate::drivers::screen::with_screen;
use crate::editor;
use crate::regions;
use crate::scheduler::{self, SpawnError, TaskEntry, TaskState};

const INPUT_MAX: usize = 128;

const HELP_LINE: &str = "Unknown command. Try: clear, ps, spawn hb0, spawn hb1, kill <id>\n";

/// Shell task entry point.
pub fn shell_task() {
    let mut buf = [0u8; INPUT_MAX];

    loop {
        with_screen(|s| s.print_str("> "));
        let len = editor::read_line(&mut buf);

        // The editor only stores printable ASCII, so this never fails.
        if let Ok(line) = core::str::from_utf8(&buf[..len]) {
            dispatch(line);
        }

        // Yield each loop so other tasks get time.
        scheduler::yield_now();
    }
}

fn dispatch(line: &str) {
    match line {
        "thanks" => {
            with_screen(|s| s.print_str("You're welcome!\n"));
        }
        "exit" => {
            with_screen(|s| s.print_str("Shutting down...\n"));
            debugln!("shell: shutdown requested");
            power::shutdown();
        }
        "clear" => {
            with_screen(|s| s.clear_text_area());
            regions::overlays_redraw();
        }
        "ps" => {
            print_task_listing();
        }
        "spawn hb0" => {
            spawn_heartbeat(heartbeat::heartbeat0_task, heartbeat::HB0_NAME, "Spawned hb0.\n");
        }
        "spawn hb1" => {
            spawn_heartbeat(heartbeat::heartbeat1_task, heartbeat::HB1_NAME, "Spawned hb1.\n");
        }
        "yield" => {
            with_screen(|s| s.print_str("(yield)\n"));
            scheduler::yield_now();
        }
        _ => {
            if let Some(arg) = line.strip_prefix("kill ") {
                kill_command(arg);
            } else {
                with_screen(|s| s.print_str(HELP_LINE));
            }
        }
    }
}

/// `ps`: one line per live slot, in slot order.
fn print_task_listing() {
    let snapshot = scheduler::tasks_snapshot();

    with_screen(|s| {
        s.print_str("ID STATE NAME\n");
        for (id, task) in snapshot.iter().enumerate() {
            if task.state == TaskState::Dead {
                continue;
            }
            s.print_char(b'0' + (id % 10) as u8);
            s.print_str("  ");
            s.print_char(task.state.display_char());
            s.print_str("     ");
            s.print_str(task.name.unwrap_or("?"));
            s.print_char(b'\n');
        }
    });
}

fn spawn_heartbeat(entry: TaskEntry, name: &'static str, spawned_msg: &str) {
    match scheduler::task_create(entry, name) {
        Ok(_) => with_screen(|s| s.print_str(spawned_msg)),
        Err(SpawnError::CapacityExceeded) => {
            with_screen(|s| s.print_str("No free task slots.\n"));
        }
    }
}

fn kill_command(arg: &str) {
    let killed = parse_u32(arg).is_some_and(|id| scheduler::task_kill(id as usize).is_ok());

    if killed {
        with_screen(|s| s.print_str("Killed task.\n"));
    } else {
        with_screen(|s| s.print_str("Usage: kill <id>\n"));
    }
}

/// Decimal parse, digits only, at least one digit. Overflow wraps; the
/// task-table range check rejects any wrapped id anyway.
fn parse_u32(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    let mut value: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.wrapping_mul(10).wrapping_add((b - b'0') as u32);
    }
    Some(value)
}
