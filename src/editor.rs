//! Cursor-editable line reader.
//!
//! Runs inside a task: collects one line of keyboard input with
//! insertion-point editing (arrow keys, backspace, delete) and yields to
//! the scheduler whenever no key is pending, so polling never starves the
//! other tasks. The edited line is echoed in place after every keystroke
//! and the hardware cursor tracks the insertion point.

use crate::drivers::keyboard::{self, KeyEvent};
use crate::drivers::screen::{self, VGA_WIDTH};
use crate::scheduler;

/// Read one line into `buf`, terminated by ENTER.
///
/// The editable area starts at the current screen cursor. Returns the line
/// length; the buffer is NUL-terminated at that index, so at most
/// `buf.len() - 1` characters are accepted and further insertions are
/// ignored. On ENTER the screen cursor moves past the line and a newline
/// is emitted (scrolling if the input row was the last text-area row).
pub fn read_line(buf: &mut [u8]) -> usize {
    let cap = buf.len();
    let mut len = 0usize;
    // Insertion point, always within [0, len].
    let mut cur = 0usize;

    let (input_row, input_col) = screen::with_screen(|s| {
        let pos = s.cursor_position();
        s.hw_cursor_set(pos.0, pos.1);
        pos
    });

    buf[0] = 0;

    loop {
        let Some(event) = keyboard::try_get_key() else {
            // The only suspension point of the editor.
            scheduler::yield_now();
            continue;
        };

        match event {
            KeyEvent::Enter => {
                buf[len] = 0;
                screen::with_screen(|s| {
                    s.set_cursor(input_row, input_col + len);
                    s.print_char(b'\n');
                });
                return len;
            }
            KeyEvent::Left => {
                if cur > 0 {
                    cur -= 1;
                }
            }
            KeyEvent::Right => {
                if cur < len {
                    cur += 1;
                }
            }
            KeyEvent::Backspace => {
                if cur > 0 {
                    buf.copy_within(cur..len, cur - 1);
                    cur -= 1;
                    len -= 1;
                    buf[len] = 0;
                }
            }
            KeyEvent::Delete => {
                if cur < len {
                    buf.copy_within(cur + 1..len, cur);
                    len -= 1;
                    buf[len] = 0;
                }
            }
            KeyEvent::Char(c) => {
                if len + 1 < cap {
                    buf.copy_within(cur..len, cur + 1);
                    buf[cur] = c;
                    cur += 1;
                    len += 1;
                    buf[len] = 0;
                }
            }
        }

        // Echo the whole line in place, blank any leftover cells from a
        // previously longer line, then park the cursor on the insertion
        // point.
        screen::with_screen(|s| {
            for i in 0..len {
                s.put_char_at(input_row, input_col + i, buf[i]);
            }
            let mut i = len;
            while i < cap - 1 && input_col + i < VGA_WIDTH {
                s.put_char_at(input_row, input_col + i, b' ');
                i += 1;
            }
            s.hw_cursor_set(input_row, input_col + cur);
        });
    }
}
