//! Cooperative in-kernel task system.
//!
//! A fixed table of eight task slots, each owning a 4 KiB statically
//! allocated stack, multiplexed by a non-preemptive round-robin scheduler.
//! Context switches happen only at explicit `yield_now` calls (or the
//! one-way boot switch); no interrupt can re-enter the scheduler, so all
//! task-table access is race-free by construction.
//!
//! A fresh task's stack carries a synthesized register image that makes its
//! first switch-in indistinguishable from a switch-out: `ctx_switch` pops
//! eight general registers and EFLAGS and then "returns" into the
//! trampoline, which calls the task's entry function and parks the task in
//! `task_exit` should the entry ever return.

use core::cell::UnsafeCell;
use core::ptr;

use crate::arch::switch::ctx_switch;
use crate::debugln;
use crate::regions;

/// Task table capacity. Slot indices double as user-visible task ids.
pub const MAX_TASKS: usize = 8;

/// Per-task stack size in bytes
pub const TASK_STACK_SIZE: usize = 4096;

/// EFLAGS image for a fresh task: reserved bit 1 set, IF clear.
const INITIAL_EFLAGS: u32 = 0x0000_0002;

/// Entry point type for schedulable kernel tasks.
///
/// Entries take nothing and return nothing; a returning entry lands in
/// `task_exit` via the trampoline.
pub type TaskEntry = fn();

/// Task lifecycle states.
///
/// `Blocked` is reserved: the core never transitions into it, but the value
/// is accepted and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Dead,
    Ready,
    Running,
    Blocked,
}

impl TaskState {
    /// Single-character rendering used by the HUD and the `ps` listing.
    pub fn display_char(self) -> u8 {
        match self {
            TaskState::Ready => b'R',
            TaskState::Running => b'*',
            TaskState::Blocked => b'B',
            TaskState::Dead => b'D',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// Static task table is full.
    CapacityExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillError {
    /// Id is outside the task table.
    BadId,
    /// Target slot holds no live task.
    NotAlive,
    /// A task may not kill itself.
    Current,
}

/// One slot in the static task table.
#[derive(Clone, Copy)]
struct Task {
    state: TaskState,
    /// Stack pointer to resume from; meaningful only when the task is not
    /// the one currently running.
    saved_sp: u32,
    name: Option<&'static str>,
    entry: Option<TaskEntry>,
}

impl Task {
    const fn vacant() -> Self {
        Self {
            state: TaskState::Dead,
            saved_sp: 0,
            name: None,
            entry: None,
        }
    }
}

/// Copy of one slot's user-visible fields, for the HUD and `ps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
    pub state: TaskState,
    pub name: Option<&'static str>,
}

struct SchedulerState {
    tasks: [Task; MAX_TASKS],
    /// Index of the RUNNING task, `None` before the first switch.
    current: Option<usize>,
}

impl SchedulerState {
    const fn new() -> Self {
        Self {
            tasks: [Task::vacant(); MAX_TASKS],
            current: None,
        }
    }
}

/// All task stacks, one fixed region per slot.
///
/// 4096 is a multiple of 16, so aligning the pool aligns every region.
#[repr(align(16))]
struct StackPool([[u8; TASK_STACK_SIZE]; MAX_TASKS]);

struct SchedulerGlobal {
    state: UnsafeCell<SchedulerState>,
    stacks: UnsafeCell<StackPool>,
}

// SAFETY:
// - Kernel is single-core and never enables interrupts.
// - Access is serialized because exactly one task runs at a time and
//   `with_state` closures contain no yield point.
unsafe impl Sync for SchedulerGlobal {}

static SCHED: SchedulerGlobal = SchedulerGlobal {
    state: UnsafeCell::new(SchedulerState::new()),
    stacks: UnsafeCell::new(StackPool([[0; TASK_STACK_SIZE]; MAX_TASKS])),
};

/// Executes `f` with mutable scheduler state.
///
/// The closure must not reach a yield point: the borrow is handed out on
/// the assumption that no other code runs until it returns.
#[inline]
fn with_state<R>(f: impl FnOnce(&mut SchedulerState) -> R) -> R {
    // SAFETY:
    // - Single thread of control, no interrupts, no nested schedule calls.
    unsafe { f(&mut *SCHED.state.get()) }
}

/// Reset the task table to all-DEAD with no current task.
pub fn init() {
    with_state(|state| {
        *state = SchedulerState::new();
    });
    regions::hud_mark_dirty();
}

/// Builds the initial register image on the stack of `slot` and returns the
/// stack pointer `ctx_switch` will resume from (it addresses the EDI cell).
fn build_initial_frame(slot: usize) -> u32 {
    // SAFETY:
    // - `slot` is in-bounds and DEAD, so no live task references its stack.
    // - Single thread of control; nothing else touches the pool.
    unsafe {
        let pool = &mut *SCHED.stacks.get();
        let stack = &mut pool.0[slot];
        let top = stack.as_mut_ptr().add(TASK_STACK_SIZE) as *mut u32;

        let trampoline: extern "C" fn() -> ! = task_trampoline;

        let mut sp = top;
        sp = sp.sub(1);
        ptr::write(sp, trampoline as usize as u32); // RET target
        sp = sp.sub(1);
        ptr::write(sp, INITIAL_EFLAGS); // POPFD
        // POPAD image, all zero; EDI ends up at the lowest address.
        for _ in 0..8 {
            sp = sp.sub(1);
            ptr::write(sp, 0);
        }

        sp as u32
    }
}

/// First instruction of every task.
///
/// The scheduler stores `current` before switching onto this stack, so the
/// slot's entry can be looked up here. A returning entry parks in
/// `task_exit`; the slot is reclaimed only by an explicit kill.
extern "C" fn task_trampoline() -> ! {
    let entry = with_state(|state| state.current.and_then(|id| state.tasks[id].entry));
    if let Some(entry) = entry {
        entry();
    }
    task_exit();
}

/// Park the calling task forever.
///
/// The slot intentionally stays non-DEAD: "alive but doing nothing" is the
/// contract for an entry that returns, and `kill` remains the only way to
/// free the slot.
pub fn task_exit() -> ! {
    if let Some(id) = current_task_id() {
        debugln!("task {}: entry returned, parking", id);
    }
    loop {
        yield_now();
    }
}

/// Reserve the lowest DEAD slot for a new task and mark it READY.
///
/// Returns the slot index, which is the task's id for `kill` and listings.
pub fn task_create(entry: TaskEntry, name: &'static str) -> Result<usize, SpawnError> {
    let id = with_state(|state| {
        let id = state
            .tasks
            .iter()
            .position(|task| task.state == TaskState::Dead)
            .ok_or(SpawnError::CapacityExceeded)?;

        let saved_sp = build_initial_frame(id);
        state.tasks[id] = Task {
            state: TaskState::Ready,
            saved_sp,
            name: Some(name),
            entry: Some(entry),
        };
        Ok(id)
    })?;

    regions::hud_mark_dirty();
    debugln!("task {}: created '{}'", id, name);
    Ok(id)
}

/// Kill a task by id.
///
/// Fails for ids outside the table, DEAD slots, and the calling task. When
/// the victim owns an overlay row, that row is cleared using the victim's
/// pre-kill instance index.
pub fn task_kill(id: usize) -> Result<(), KillError> {
    let overlay_row = with_state(|state| {
        if id >= MAX_TASKS {
            return Err(KillError::BadId);
        }
        let task = state.tasks[id];
        if task.state == TaskState::Dead {
            return Err(KillError::NotAlive);
        }
        if state.current == Some(id) {
            return Err(KillError::Current);
        }

        // Instance index must be computed while the slot still counts.
        let overlay_row = task.name.and_then(|name| {
            instance_index_in(state, name, id).and_then(|idx| regions::overlay_row(name, idx))
        });

        state.tasks[id] = Task::vacant();
        Ok(overlay_row)
    })?;

    if let Some(row) = overlay_row {
        regions::overlay_clear_row(row);
    }
    regions::hud_mark_dirty();
    debugln!("task {}: killed", id);
    Ok(())
}

/// What `schedule` decided to do once the table was updated.
enum SwitchPlan {
    /// Keep running on the current stack.
    Stay,
    /// One-way boot switch; the outgoing stack pointer is discarded.
    First { new_sp: u32 },
    /// Regular swap between two task stacks.
    Swap { save_sp: *mut u32, new_sp: u32 },
}

/// Cooperative round-robin scheduler.
///
/// Demotes the running task to READY, picks the first READY slot after it
/// in strict rotation, redraws the HUD if dirty, and swaps stacks. With no
/// other READY task the caller keeps running; with nothing runnable at all
/// (only possible before the first switch) this simply returns.
pub fn schedule() {
    let plan = with_state(|state| {
        let prev = state.current;

        if let Some(prev) = prev {
            if state.tasks[prev].state == TaskState::Running {
                state.tasks[prev].state = TaskState::Ready;
            }
        }

        // Strict rotation: first READY slot after prev, wrapping.
        let start = prev.map_or(0, |prev| prev + 1);
        let mut next = None;
        for step in 0..MAX_TASKS {
            let idx = (start + step) % MAX_TASKS;
            if state.tasks[idx].state == TaskState::Ready {
                next = Some(idx);
                break;
            }
        }

        let Some(next) = next else {
            if let Some(prev) = prev {
                if state.tasks[prev].state != TaskState::Dead {
                    state.tasks[prev].state = TaskState::Running;
                }
            }
            return SwitchPlan::Stay;
        };

        state.current = Some(next);
        state.tasks[next].state = TaskState::Running;

        match prev {
            None => SwitchPlan::First {
                new_sp: state.tasks[next].saved_sp,
            },
            Some(prev) if prev != next => SwitchPlan::Swap {
                save_sp: &mut state.tasks[prev].saved_sp as *mut u32,
                new_sp: state.tasks[next].saved_sp,
            },
            Some(_) => SwitchPlan::Stay,
        }
    });

    regions::hud_draw_if_dirty();

    match plan {
        SwitchPlan::Stay => {}
        SwitchPlan::First { new_sp } => {
            let mut discard: u32 = 0;
            // SAFETY:
            // - `new_sp` is a synthesized or previously saved image on a
            //   live task stack.
            // - The boot stack is abandoned; nothing ever resumes from
            //   `discard`.
            unsafe {
                ctx_switch(&mut discard, new_sp);
            }
        }
        SwitchPlan::Swap { save_sp, new_sp } => {
            // SAFETY:
            // - `save_sp` points into the static task table; the closure
            //   borrow ended before the switch.
            // - `new_sp` is a valid image on the incoming task's stack.
            unsafe {
                ctx_switch(save_sp, new_sp);
            }
        }
    }
}

/// Voluntary yield point: hand the CPU to the next READY task.
pub fn yield_now() {
    schedule();
}

/// Id of the RUNNING task, `None` before the first switch.
pub fn current_task_id() -> Option<usize> {
    with_state(|state| state.current)
}

/// State of slot `id`, or `None` for ids outside the table.
pub fn task_state(id: usize) -> Option<TaskState> {
    with_state(|state| state.tasks.get(id).map(|task| task.state))
}

/// Copy of every slot's user-visible fields, DEAD slots included.
pub fn tasks_snapshot() -> [TaskSummary; MAX_TASKS] {
    with_state(|state| {
        let mut summary = [TaskSummary {
            state: TaskState::Dead,
            name: None,
        }; MAX_TASKS];
        for (slot, task) in state.tasks.iter().enumerate() {
            summary[slot] = TaskSummary {
                state: task.state,
                name: task.name,
            };
        }
        summary
    })
}

/// Saved stack pointer of slot `id` when it holds a live task.
///
/// Primarily intended for integration tests and diagnostics.
pub fn saved_stack_pointer(id: usize) -> Option<u32> {
    with_state(|state| {
        state
            .tasks
            .get(id)
            .filter(|task| task.state != TaskState::Dead)
            .map(|task| task.saved_sp)
    })
}

/// Position of task `me` among live tasks named `name`, in slot order.
///
/// `None` when slot `me` is DEAD, unnamed, or named differently. Heartbeat
/// tasks use this to claim an overlay row that is stable under kills of
/// their siblings.
pub fn instance_index(name: &str, me: usize) -> Option<usize> {
    with_state(|state| instance_index_in(state, name, me))
}

fn instance_index_in(state: &SchedulerState, name: &str, me: usize) -> Option<usize> {
    let mut idx = 0;
    for (slot, task) in state.tasks.iter().enumerate() {
        if task.state == TaskState::Dead {
            continue;
        }
        let Some(task_name) = task.name else {
            continue;
        };
        if task_name != name {
            continue;
        }
        if slot == me {
            return Some(idx);
        }
        idx += 1;
    }
    None
}
