//! PS/2 keyboard poller
//!
//! Non-blocking single-event extraction from the keyboard controller. Each
//! `try_get_key` call consumes at most one byte of the scancode-set-1
//! stream and classifies it: modifier updates and releases produce no
//! event, `0xE0` arms the extended-key prefix for the following byte, and
//! printable presses are translated through the base/shift layout tables.
//!
//! Scancodes normally come straight from the controller's data port. A
//! small injection queue is consulted first so test kernels can feed the
//! decoder an exact byte stream without hardware input.

use crate::arch::port::PortByte;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Keyboard controller ports
const STATUS_PORT: u16 = 0x64;
const DATA_PORT: u16 = 0x60;

/// Status bit 0: a byte is waiting on the data port
const STATUS_OUT_BUF_FULL: u8 = 0x01;

/// Extended-key prefix byte
const EXTENDED_PREFIX: u8 = 0xE0;

/// Shift keycodes (left / right)
const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;

/// Extended keycodes carried behind the 0xE0 prefix
const EXT_LEFT: u8 = 0x4B;
const EXT_RIGHT: u8 = 0x4D;
const EXT_DELETE: u8 = 0x53;

/// Injection queue capacity (must be > 1)
const INJECT_QUEUE_CAPACITY: usize = 64;

/// One decoded key event. `try_get_key` returns `None` for bytes that do
/// not produce an event (releases, modifiers, unmapped codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(u8),
    Enter,
    Backspace,
    Left,
    Right,
    Delete,
}

/// Base US-layout translation table, indexed by keycode.
/// 0 == no mapping; control characters are filtered by the printable check.
const SCANCODE_BASE: [u8; 128] = [
    0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's',
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v',
    b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Shifted US-layout translation table, indexed by keycode.
const SCANCODE_SHIFT: [u8; 128] = [
    0, 27, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0, b'A', b'S',
    b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V',
    b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

#[derive(Debug, Clone, Copy)]
struct ModifierState {
    shift_down: bool,
    extended_pending: bool,
}

/// Lock-free ring buffer for injected scancodes (single producer, single
/// consumer).
struct ScancodeQueue {
    buf: UnsafeCell<[u8; INJECT_QUEUE_CAPACITY]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl ScancodeQueue {
    const fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0; INJECT_QUEUE_CAPACITY]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    fn clear(&self) {
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
    }

    fn push(&self, value: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % INJECT_QUEUE_CAPACITY;
        let tail = self.tail.load(Ordering::Acquire);

        if next == tail {
            return false;
        }

        // SAFETY:
        // - `head` is owned by the single producer; the slot is not yet
        //   visible to the consumer until the head store below.
        unsafe {
            (*self.buf.get())[head] = value;
        }

        self.head.store(next, Ordering::Release);
        true
    }

    fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        // SAFETY:
        // - The slot at `tail` was published by a matching head store.
        let value = unsafe { (*self.buf.get())[tail] };
        self.tail.store((tail + 1) % INJECT_QUEUE_CAPACITY, Ordering::Release);
        Some(value)
    }
}

// SAFETY:
// - Single-core kernel; producer and consumer never run concurrently.
unsafe impl Sync for ScancodeQueue {}

struct Keyboard {
    injected: ScancodeQueue,
    state: UnsafeCell<ModifierState>,
}

impl Keyboard {
    const fn new() -> Self {
        Self {
            injected: ScancodeQueue::new(),
            state: UnsafeCell::new(ModifierState {
                shift_down: false,
                extended_pending: false,
            }),
        }
    }

    #[allow(clippy::mut_from_ref)]
    fn state_mut(&self) -> &mut ModifierState {
        // SAFETY:
        // - Modifier state is only touched from within `try_get_key`, which
        //   is never re-entered (no interrupts, no yield inside).
        unsafe { &mut *self.state.get() }
    }
}

// SAFETY:
// - Single thread of control; see `state_mut`.
unsafe impl Sync for Keyboard {}

static KEYBOARD: Keyboard = Keyboard::new();

/// Reset modifier state and drop any injected scancodes.
pub fn init() {
    KEYBOARD.injected.clear();
    let state = KEYBOARD.state_mut();
    state.shift_down = false;
    state.extended_pending = false;
}

/// Queue a raw scancode ahead of the hardware port.
///
/// Returns `false` when the queue is full. Primarily intended for
/// integration tests driving the decoder without a keyboard.
pub fn enqueue_scancode(code: u8) -> bool {
    KEYBOARD.injected.push(code)
}

/// Poll for one key event.
///
/// Consumes at most one scancode (injected bytes first, then the data port
/// if the status port reports one pending). Returns `None` without side
/// effect when nothing is pending, and `None` after consuming a byte that
/// produces no event.
pub fn try_get_key() -> Option<KeyEvent> {
    let code = match KEYBOARD.injected.pop() {
        Some(code) => code,
        None => {
            // SAFETY:
            // - Status/data port reads are the architected way to drain the
            //   keyboard controller; reading data only when bit 0 is set.
            unsafe {
                let status = PortByte::new(STATUS_PORT).read();
                if (status & STATUS_OUT_BUF_FULL) == 0 {
                    return None;
                }
                PortByte::new(DATA_PORT).read()
            }
        }
    };

    decode_scancode(code)
}

/// Classify one scancode against the current modifier state.
fn decode_scancode(code: u8) -> Option<KeyEvent> {
    let state = KEYBOARD.state_mut();

    if code == EXTENDED_PREFIX {
        state.extended_pending = true;
        return None;
    }

    let released = (code & 0x80) != 0;
    let code = code & 0x7F;

    // Shift tracking comes first and leaves the extended prefix alone:
    // an 0xE0-prefixed shift byte is the controller's fake-shift padding.
    if !state.extended_pending && (code == LEFT_SHIFT || code == RIGHT_SHIFT) {
        state.shift_down = !released;
        return None;
    }

    if released {
        state.extended_pending = false;
        return None;
    }

    if state.extended_pending {
        state.extended_pending = false;
        return match code {
            EXT_LEFT => Some(KeyEvent::Left),
            EXT_RIGHT => Some(KeyEvent::Right),
            EXT_DELETE => Some(KeyEvent::Delete),
            _ => None,
        };
    }

    let table = if state.shift_down {
        &SCANCODE_SHIFT
    } else {
        &SCANCODE_BASE
    };

    match table[code as usize] {
        0 => None,
        b'\n' => Some(KeyEvent::Enter),
        0x08 => Some(KeyEvent::Backspace),
        ch if (32..=126).contains(&ch) => Some(KeyEvent::Char(ch)),
        _ => None,
    }
}
