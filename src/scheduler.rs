/// Maximum number of task slots
pub const MAX_TASKS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
struct TaskSlot {
    period_us: u32,
    enabled: bool,
    last_fire_us: u32,
    ready: bool,
}

/// Microsecond cooperative task pacer.
///
/// Holds up to [MAX_TASKS] periodic slots. [`update`](Scheduler::update)
/// raises the ready flag of every enabled slot whose period has elapsed;
/// [`task_ready`](Scheduler::task_ready) consumes a flag, returning true
/// exactly once per firing. The scheduler only paces; the work happens
/// in the main loop that polls it.
pub struct Scheduler {
    running: bool,
    tasks: [TaskSlot; MAX_TASKS],
    num_tasks: usize,
}

impl Scheduler {
    /// Create a scheduler with one slot per period given, up to
    /// [MAX_TASKS]; extra periods are ignored.
    pub fn new(periods_us: &[u32]) -> Self {
        let mut tasks = [TaskSlot::default(); MAX_TASKS];
        let num_tasks = periods_us.len().min(MAX_TASKS);
        for (slot, &period) in tasks.iter_mut().zip(periods_us) {
            slot.period_us = period;
        }
        Scheduler {
            running: false,
            tasks,
            num_tasks,
        }
    }

    /// Stamp every slot with `now_us` and start firing.
    ///
    /// Stamping first means no task fires spuriously at t=0.
    pub fn start(&mut self, now_us: u32) {
        for slot in &mut self.tasks[..self.num_tasks] {
            slot.last_fire_us = now_us;
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Raise ready flags for enabled slots whose period has elapsed
    pub fn update(&mut self, now_us: u32) {
        if !self.running {
            return;
        }
        for slot in &mut self.tasks[..self.num_tasks] {
            if slot.enabled && now_us.wrapping_sub(slot.last_fire_us) >= slot.period_us {
                slot.last_fire_us = now_us;
                slot.ready = true;
            }
        }
    }

    /// One-shot consume of a slot's ready flag.
    ///
    /// Returns true exactly once per firing. Unknown ids return false.
    pub fn task_ready(&mut self, id: usize) -> bool {
        match self.tasks[..self.num_tasks].get_mut(id) {
            Some(slot) if slot.ready => {
                slot.ready = false;
                true
            }
            _ => false,
        }
    }

    /// Enable a slot, restarting its phase from `now_us`
    pub fn enable_task(&mut self, id: usize, now_us: u32) {
        if let Some(slot) = self.tasks[..self.num_tasks].get_mut(id) {
            slot.enabled = true;
            slot.last_fire_us = now_us;
        }
    }

    pub fn disable_task(&mut self, id: usize) {
        if let Some(slot) = self.tasks[..self.num_tasks].get_mut(id) {
            slot.enabled = false;
        }
    }

    /// Reprogram a slot's period without disturbing its phase.
    ///
    /// Ignored for unknown ids and zero periods.
    pub fn edit_time(&mut self, id: usize, period_us: u32) {
        if period_us == 0 {
            return;
        }
        if let Some(slot) = self.tasks[..self.num_tasks].get_mut(id) {
            slot.period_us = period_us;
        }
    }
}
