//! Cooperative scheduler driving every [`Clockable`] of one clock domain.
//!
//! A clock domain (the clock, its CPU and its devices) lives on a single
//! thread. Other threads talk to it only through a [`ClockHandle`], which
//! wraps a few atomics: stop, suspend and the suspend acknowledgement used by
//! [`ClockHandle::pause_wait`].
//!
//! Real-time pacing is done by [`Pacer`]: every synchronisation window the
//! host time spent is compared with the emulated time and the difference is
//! slept away. Host oversleep is converted back into cycles and charged to
//! the next window, clamped to one window's budget.
use super::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Length of a synchronisation window in microseconds.
pub const SYNC_US: u64 = 20_000;
/// Poll interval while suspended.
pub const SUSPEND_POLL: Duration = Duration::from_millis(200);
/// The delay multiplier is kept in thousandths.
const DELAY_ONE: u64 = 1000;

/// Result of one clockable tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// cycles consumed by this tick, including the current one
    Cycles(usize),
    /// stop the whole clock domain
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// What a clockable gets to see of its clock.
#[derive(Debug, Clone, Copy)]
pub struct ClockInfo {
    pub freq: u64,
    /// scheduling cycles elapsed since the clock was created
    pub cycle: u64,
}

pub trait Clockable {
    fn tick(&mut self, clk: &ClockInfo) -> Tick;
}

pub type ClockablePtr = Rc<RefCell<dyn Clockable>>;

fn same(a: &ClockablePtr, b: &ClockablePtr) -> bool { std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)) }

#[derive(Default)]
struct Control {
    stop: AtomicBool,
    suspend: AtomicBool,
    suspended: AtomicBool,
    reset: AtomicBool,
}

/// Thread-safe remote control for a running clock.
#[derive(Clone)]
pub struct ClockHandle {
    ctl: Arc<Control>,
}

impl ClockHandle {
    /// Ask the run loop to return at the next tick.
    pub fn stop(&self) { self.ctl.stop.store(true, Ordering::SeqCst) }
    pub fn is_stopped(&self) -> bool { self.ctl.stop.load(Ordering::SeqCst) }

    /// Request suspend/resume without waiting for it.
    pub fn pause(&self, suspend: bool) { self.ctl.suspend.store(suspend, Ordering::SeqCst) }

    /// True once the run loop has acknowledged a suspend request.
    pub fn paused(&self) -> bool { self.ctl.suspended.load(Ordering::SeqCst) }

    /// Request suspend/resume and yield until the run loop has honoured it
    /// (or has stopped).
    pub fn pause_wait(&self, suspend: bool) {
        self.pause(suspend);
        while self.paused() != suspend && !self.is_stopped() {
            thread::yield_now();
        }
    }

    /// Zero every clockable counter. Only honoured while suspended; returns
    /// false when the request was refused.
    pub fn reset(&self) -> bool {
        if !self.paused() {
            return false;
        }
        self.ctl.reset.store(true, Ordering::SeqCst);
        true
    }
}

/// Host time source used for pacing.
pub trait HostTimer {
    fn now_us(&mut self) -> u64;
    fn sleep_us(&mut self, us: u64);
}

/// Monotonic wall clock with `thread::sleep`.
pub struct SystemTimer {
    origin: Instant,
}

impl Default for SystemTimer {
    fn default() -> Self { SystemTimer { origin: Instant::now() } }
}

impl HostTimer for SystemTimer {
    fn now_us(&mut self) -> u64 { self.origin.elapsed().as_micros() as u64 }
    fn sleep_us(&mut self, us: u64) { thread::sleep(Duration::from_micros(us)) }
}

/// Window based speed regulation, integer only.
pub struct Pacer {
    freq: u64,
    sync_us: u64,
    sync_cycles: i64,
    delay: u64,
    sched: i64,
    start: u64,
    // cycle debt remainder, in cycles * 1e6
    carry: i64,
    /// windows in which the host could not keep up
    pub late_windows: u64,
}

impl Pacer {
    /// `delay` is the speed multiplier in thousandths (1000 = real time,
    /// 2000 = half speed).
    pub fn new(freq: u64, delay: u64, sync_us: u64) -> Pacer {
        let sync_cycles = (freq * sync_us / 1_000_000).max(1) as i64;
        Pacer {
            freq,
            sync_us,
            sync_cycles,
            delay: delay.max(1),
            sched: 0,
            start: 0,
            carry: 0,
            late_windows: 0,
        }
    }

    pub fn sync_cycles(&self) -> i64 { self.sync_cycles }
    pub fn set_delay(&mut self, delay: u64) { self.delay = delay.max(1) }

    /// Start a new window at `now` and forget any carried debt.
    pub fn restart(&mut self, now: u64) {
        self.start = now;
        self.sched = 0;
        self.carry = 0;
    }

    /// Account for one scheduling cycle; sleeps when a window closes.
    /// Returns the cycle budget adjustment applied to the next window.
    pub fn cycle(&mut self, timer: &mut dyn HostTimer) -> Option<i64> {
        self.sched += 1;
        if self.sched < self.sync_cycles {
            return None;
        }
        let end = timer.now_us();
        let elapsed = end.saturating_sub(self.start);
        if elapsed >= self.sync_us {
            // slow host: start over without trying to catch up
            self.late_windows += 1;
            self.restart(timer.now_us());
            return Some(0);
        }
        let wait = self.sync_us - elapsed;
        timer.sleep_us(wait * self.delay / DELAY_ONE);
        self.start = timer.now_us();
        // host time slept, expressed in emulated microseconds
        let slept = (self.start.saturating_sub(end) * DELAY_ONE / self.delay) as i64;
        let debt = (slept - wait as i64) * self.freq as i64 + self.carry;
        let extra = (debt / 1_000_000).clamp(-self.sync_cycles, self.sync_cycles);
        self.carry = if extra.abs() == self.sync_cycles { 0 } else { debt % 1_000_000 };
        self.sched = -extra;
        Some(extra)
    }
}

pub struct Clock {
    name: String,
    info: ClockInfo,
    delay: u64,
    clockables: Vec<(ClockablePtr, usize)>,
    ctl: Arc<Control>,
    pacer: Pacer,
    timer: Box<dyn HostTimer>,
    log: logger::Logger,
}

impl Clock {
    /// `delay` is a speed multiplier: 1.0 is real time, 2.0 half speed.
    pub fn new(name: &str, freq: u64, delay: f32, log: logger::Logger) -> Result<Clock, Error> {
        if freq == 0 {
            return Err(config_err!("{}: clock frequency must be non-zero", name));
        }
        if delay.is_nan() || delay <= 0.0 {
            return Err(config_err!("{}: invalid delay factor {}", name, delay));
        }
        let delay = ((delay * DELAY_ONE as f32).round() as u64).max(1);
        Ok(Clock {
            name: name.to_string(),
            info: ClockInfo { freq, cycle: 0 },
            delay,
            clockables: Vec::new(),
            ctl: Arc::new(Control::default()),
            pacer: Pacer::new(freq, delay, SYNC_US),
            timer: Box::<SystemTimer>::default(),
            log,
        })
    }

    /// Replace the host timer (simulated time in tests).
    pub fn with_timer(mut self, timer: Box<dyn HostTimer>) -> Clock {
        self.timer = timer;
        self
    }

    pub fn handle(&self) -> ClockHandle { ClockHandle { ctl: self.ctl.clone() } }
    pub fn freq(&self) -> u64 { self.info.freq }
    pub fn info(&self) -> &ClockInfo { &self.info }
    pub fn pacer(&self) -> &Pacer { &self.pacer }

    pub fn set_delay(&mut self, delay: f32) {
        if delay > 0.0 {
            self.delay = ((delay * DELAY_ONE as f32).round() as u64).max(1);
            self.pacer.set_delay(self.delay);
        }
    }

    /// Register a clockable. Adding the same instance twice is a no-op.
    pub fn add(&mut self, clkb: ClockablePtr) {
        if !self.clockables.iter().any(|(c, _)| same(c, &clkb)) {
            self.clockables.push((clkb, 0));
        }
    }

    /// Unregister a clockable. Unknown instances are ignored.
    pub fn remove(&mut self, clkb: &ClockablePtr) { self.clockables.retain(|(c, _)| !same(c, clkb)) }

    pub fn len(&self) -> usize { self.clockables.len() }
    pub fn is_empty(&self) -> bool { self.clockables.is_empty() }

    /// One scheduling cycle: every clockable whose counter ran out is ticked,
    /// in registration order.
    pub fn tick(&mut self) -> Status {
        let info = self.info;
        for (clkb, cycles) in self.clockables.iter_mut() {
            if *cycles == 0 {
                match clkb.borrow_mut().tick(&info) {
                    Tick::Halt => return Status::Halted,
                    Tick::Cycles(n) => *cycles = n.max(1),
                }
            }
            *cycles -= 1;
        }
        self.info.cycle += 1;
        Status::Running
    }

    /// Zero every clockable counter. Only effective while suspended.
    pub fn reset(&mut self) -> bool {
        if !self.ctl.suspend.load(Ordering::SeqCst) {
            return false;
        }
        self.zero_counters();
        true
    }

    fn zero_counters(&mut self) {
        for (_, cycles) in self.clockables.iter_mut() {
            *cycles = 0;
        }
    }

    /// Set the suspend flag and wait for the run loop to acknowledge it. From
    /// the clock's own thread (loop not running) this returns immediately.
    pub fn pause_wait(&self, suspend: bool) {
        if self.ctl.stop.load(Ordering::SeqCst) || !RUNNING.with(|r| r.get()) {
            self.ctl.suspend.store(suspend, Ordering::SeqCst);
            self.ctl.suspended.store(suspend, Ordering::SeqCst);
            return;
        }
        self.handle().pause_wait(suspend)
    }

    /// Run until a clockable requests halt or the clock is stopped.
    pub fn run(&mut self) -> Status {
        info!(self.log, "{}: running", self);
        RUNNING.with(|r| r.set(true));
        let start = self.timer.now_us();
        self.pacer.restart(start);
        let status = loop {
            if self.ctl.stop.load(Ordering::SeqCst) {
                break Status::Running;
            }
            if self.ctl.suspend.load(Ordering::SeqCst) {
                self.ctl.suspended.store(true, Ordering::SeqCst);
                while self.ctl.suspend.load(Ordering::SeqCst) && !self.ctl.stop.load(Ordering::SeqCst) {
                    if self.ctl.reset.swap(false, Ordering::SeqCst) {
                        self.zero_counters();
                    }
                    thread::sleep(SUSPEND_POLL);
                }
                if self.ctl.reset.swap(false, Ordering::SeqCst) {
                    self.zero_counters();
                }
                self.ctl.suspended.store(false, Ordering::SeqCst);
                let now = self.timer.now_us();
                self.pacer.restart(now);
                continue;
            }
            if self.tick() == Status::Halted {
                break Status::Halted;
            }
            if let Some(extra) = self.pacer.cycle(self.timer.as_mut()) {
                if extra == self.pacer.sync_cycles() {
                    debug!(self.log, "{}: oversleep clamped to one window", self.name);
                }
            }
        };
        RUNNING.with(|r| r.set(false));
        if self.pacer.late_windows > 0 {
            debug!(self.log, "{}: host fell behind in {} windows", self.name, self.pacer.late_windows);
        }
        info!(self.log, "{}: stopped after {} cycles ({:?})", self.name, self.info.cycle, status);
        status
    }
}

thread_local! {
    static RUNNING: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

impl std::fmt::Display for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} freq {}Hz, delay {}.{:03}",
            self.name,
            self.info.freq,
            self.delay / DELAY_ONE,
            self.delay % DELAY_ONE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        cost: usize,
        calls: usize,
        order: Rc<RefCell<Vec<(u64, usize)>>>,
        id: usize,
        halt_after: Option<usize>,
    }
    impl Clockable for Counter {
        fn tick(&mut self, clk: &ClockInfo) -> Tick {
            self.calls += 1;
            self.order.borrow_mut().push((clk.cycle, self.id));
            match self.halt_after {
                Some(n) if self.calls > n => Tick::Halt,
                _ => Tick::Cycles(self.cost),
            }
        }
    }

    fn counter(id: usize, cost: usize, order: &Rc<RefCell<Vec<(u64, usize)>>>) -> Rc<RefCell<Counter>> {
        Rc::new(RefCell::new(Counter {
            cost,
            calls: 0,
            order: order.clone(),
            id,
            halt_after: None,
        }))
    }

    fn clock() -> Clock { Clock::new("test", 1_000_000, 1.0, logger::Logger::silent()).unwrap() }

    #[test]
    fn fairness_and_order() {
        let order = Rc::new(RefCell::new(vec![]));
        let costs = [1usize, 3, 4, 7];
        let counters: Vec<_> = costs.iter().enumerate().map(|(i, &c)| counter(i, c, &order)).collect();
        let mut clk = clock();
        for c in counters.iter() {
            clk.add(c.clone());
        }
        let total = 1000u64;
        for _ in 0..total {
            assert_eq!(clk.tick(), Status::Running);
        }
        for (c, &cost) in counters.iter().zip(costs.iter()) {
            let expected = total as usize / cost;
            let calls = c.borrow().calls;
            assert!(calls + 1 >= expected && calls <= expected + 1, "cost {}: {} calls", cost, calls);
        }
        // within one scheduling cycle ids always come out in registration order
        let order = order.borrow();
        for w in order.windows(2) {
            if w[0].0 == w[1].0 {
                assert!(w[0].1 < w[1].1);
            }
        }
    }

    #[test]
    fn add_remove_by_identity() {
        let order = Rc::new(RefCell::new(vec![]));
        let a = counter(0, 1, &order);
        let b = counter(1, 1, &order);
        let pa: ClockablePtr = a.clone();
        let pb: ClockablePtr = b.clone();
        let mut clk = clock();
        clk.add(pa.clone());
        clk.add(pa.clone());
        assert_eq!(clk.len(), 1);
        clk.remove(&pb);
        assert_eq!(clk.len(), 1);
        clk.add(pb.clone());
        clk.remove(&pa);
        assert_eq!(clk.len(), 1);
        clk.tick();
        assert_eq!(a.borrow().calls, 0);
        assert_eq!(b.borrow().calls, 1);
    }

    #[test]
    fn halt_stops_the_pass() {
        let order = Rc::new(RefCell::new(vec![]));
        let a = counter(0, 1, &order);
        a.borrow_mut().halt_after = Some(2);
        let b = counter(1, 1, &order);
        let mut clk = clock();
        clk.add(a.clone());
        clk.add(b.clone());
        assert_eq!(clk.tick(), Status::Running);
        assert_eq!(clk.tick(), Status::Running);
        assert_eq!(clk.tick(), Status::Halted);
        assert_eq!(b.borrow().calls, 2);
        // run() returns the halt as well
        assert_eq!(clk.run(), Status::Halted);
    }

    #[test]
    fn reset_only_while_suspended() {
        let order = Rc::new(RefCell::new(vec![]));
        let a = counter(0, 10, &order);
        let mut clk = clock();
        clk.add(a.clone());
        clk.tick();
        assert!(!clk.reset());
        clk.tick();
        assert_eq!(a.borrow().calls, 1);
        clk.pause_wait(true);
        assert!(clk.handle().paused());
        assert!(clk.reset());
        clk.tick();
        assert_eq!(a.borrow().calls, 2);
        clk.pause_wait(false);
        assert!(!clk.handle().paused());
    }

    #[test]
    fn stop_from_another_thread() {
        let order = Rc::new(RefCell::new(vec![]));
        let a = counter(0, 1, &order);
        let mut clk = Clock::new("fast", 1_000_000_000, 1.0, logger::Logger::silent()).unwrap();
        clk.add(a.clone());
        let handle = clk.handle();
        let t = thread::spawn(move || {
            handle.pause_wait(true);
            assert!(handle.paused());
            assert!(handle.reset());
            handle.pause_wait(false);
            handle.stop();
        });
        assert_eq!(clk.run(), Status::Running);
        t.join().unwrap();
        assert!(a.borrow().calls > 0);
    }

    /// Simulated host: time only moves when sleeping, and every sleep
    /// overshoots by a fixed amount.
    struct FakeTimer {
        now: u64,
        oversleep: u64,
        per_window_cost: u64,
    }
    impl HostTimer for FakeTimer {
        fn now_us(&mut self) -> u64 { self.now }
        fn sleep_us(&mut self, us: u64) { self.now += us + self.oversleep }
    }

    fn simulate(freq: u64, oversleep: u64, windows: usize) -> (u64, u64, Vec<i64>) {
        let mut timer = FakeTimer {
            now: 0,
            oversleep,
            per_window_cost: 0,
        };
        let mut pacer = Pacer::new(freq, DELAY_ONE, SYNC_US);
        pacer.restart(0);
        let mut cycles = 0u64;
        let mut extras = vec![];
        while extras.len() < windows {
            cycles += 1;
            if let Some(extra) = pacer.cycle(&mut timer) {
                extras.push(extra);
                timer.now += timer.per_window_cost;
            }
        }
        (cycles, timer.now, extras)
    }

    #[test]
    fn pacing_converges_with_oversleep() {
        let freq = 1_000_000;
        let (cycles, host_us, extras) = simulate(freq, 3_000, 200);
        let rate = cycles as f64 * 1e6 / host_us as f64;
        assert!((rate - freq as f64).abs() / (freq as f64) < 0.01, "rate {}", rate);
        let budget = freq as i64 * SYNC_US as i64 / 1_000_000;
        assert!(extras.iter().all(|e| e.abs() <= budget));
    }

    #[test]
    fn oversleep_debt_is_clamped() {
        // sleeping three windows too long is charged as one window only
        let (_, _, extras) = simulate(1_000_000, 3 * SYNC_US, 5);
        assert!(extras.iter().all(|&e| e == 20_000));
    }

    #[test]
    fn slow_host_restarts_window() {
        let mut timer = FakeTimer {
            now: 0,
            oversleep: 0,
            per_window_cost: 0,
        };
        let mut pacer = Pacer::new(1_000_000, DELAY_ONE, SYNC_US);
        pacer.restart(0);
        for _ in 0..pacer.sync_cycles() - 1 {
            assert_eq!(pacer.cycle(&mut timer), None);
        }
        timer.now = SYNC_US * 2;
        assert_eq!(pacer.cycle(&mut timer), Some(0));
        assert_eq!(pacer.late_windows, 1);
        assert_eq!(timer.now, SYNC_US * 2);
    }

    #[test]
    fn half_speed_doubles_host_time() {
        let mut timer = FakeTimer {
            now: 0,
            oversleep: 0,
            per_window_cost: 0,
        };
        let mut pacer = Pacer::new(1_000_000, 2 * DELAY_ONE, SYNC_US);
        pacer.restart(0);
        for _ in 0..10 * pacer.sync_cycles() {
            pacer.cycle(&mut timer);
        }
        assert_eq!(timer.now, 10 * 2 * SYNC_US);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(Clock::new("x", 0, 1.0, logger::Logger::silent()).is_err());
        assert!(Clock::new("x", 1000, 0.0, logger::Logger::silent()).is_err());
        let clk = clock();
        assert_eq!(clk.to_string(), "test freq 1000000Hz, delay 1.000");
    }
}
