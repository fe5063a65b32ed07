#![forbid(unsafe_code)]

//! Affinity contexts: the single logical thread that delivers notifications.
//!
//! A [`PropertyStore`](crate::PropertyStore) may be written from any thread,
//! but observers only ever run on its affinity context. The store asks the
//! context whether the caller is already on it ([`AffinityContext::is_current`])
//! and otherwise hands the delivery over with [`AffinityContext::submit`].
//!
//! Three contexts are provided:
//!
//! - [`ImmediateContext`]: every thread counts as current, so delivery is
//!   always synchronous. Use it when there is no event loop at all.
//! - [`AffinityThread`]: a dedicated, named thread fed through a channel.
//! - [`PumpedContext`]: a queue bound to the creating thread and drained
//!   explicitly with [`PumpedContext::run_pending`], for embedding into an
//!   existing event loop.
//!
//! # Ordering
//!
//! Queued tasks run highest [`DispatchPriority`] first. Within one priority
//! they run in submission order, so tasks submitted from the same thread are
//! delivered FIFO. No ordering is promised between different submitting
//! threads.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Task panics | Panic is caught and logged; the context keeps running |
//! | Submit after shutdown | Task is dropped with a `debug!` event |
//! | Context never serviced | Tasks stay queued forever (caller's problem) |

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, error};

/// A unit of work scheduled onto an affinity context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling priority for queued tasks. Later variants run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DispatchPriority {
    Background,
    Input,
    Loaded,
    Render,
    /// Priority used for property-change delivery.
    #[default]
    DataBind,
    Normal,
    Send,
}

impl DispatchPriority {
    /// Parse a case-insensitive priority name (`"databind"`, `"data-bind"`, ...).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "background" => Some(Self::Background),
            "input" => Some(Self::Input),
            "loaded" => Some(Self::Loaded),
            "render" => Some(Self::Render),
            "databind" => Some(Self::DataBind),
            "normal" => Some(Self::Normal),
            "send" => Some(Self::Send),
            _ => None,
        }
    }
}

/// The execution context responsible for delivering notifications.
pub trait AffinityContext: Send + Sync {
    /// Whether the calling thread is the affinity thread.
    fn is_current(&self) -> bool;

    /// Schedule `task` on the affinity thread. Never blocks on delivery.
    fn submit(&self, task: Task, priority: DispatchPriority);
}

/// Run a task, logging instead of unwinding through the dispatcher.
fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        error!(panic = %msg, "affinity task panicked");
    }
}

// ---------------------------------------------------------------------------
// Priority queue entry
// ---------------------------------------------------------------------------

struct Queued {
    priority: DispatchPriority,
    seq: u64,
    task: Task,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Max-heap: higher priority first, then lower sequence number first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ---------------------------------------------------------------------------
// ImmediateContext
// ---------------------------------------------------------------------------

/// A context with no thread affinity: everything runs inline on the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateContext;

impl AffinityContext for ImmediateContext {
    fn is_current(&self) -> bool {
        true
    }

    fn submit(&self, task: Task, _priority: DispatchPriority) {
        run_task(task);
    }
}

// ---------------------------------------------------------------------------
// AffinityThread
// ---------------------------------------------------------------------------

enum Msg {
    Run(Queued),
    Shutdown,
}

struct ThreadShared {
    sender: Mutex<mpsc::Sender<Msg>>,
    thread_id: ThreadId,
    next_seq: AtomicU64,
}

impl AffinityContext for ThreadShared {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn submit(&self, task: Task, priority: DispatchPriority) {
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let msg = Msg::Run(Queued {
            priority,
            seq,
            task,
        });
        if self.sender.lock().send(msg).is_err() {
            debug!(seq, "affinity thread gone; task dropped");
        }
    }
}

/// A dedicated thread that owns notification delivery.
///
/// The thread blocks on its channel, drains everything already queued into a
/// priority heap, and runs the heap one task at a time, re-draining the
/// channel between tasks so late high-priority work can overtake queued
/// low-priority work.
pub struct AffinityThread {
    shared: Arc<ThreadShared>,
    handle: Option<JoinHandle<()>>,
}

impl AffinityThread {
    /// Spawn the affinity thread with the default name.
    pub fn start() -> std::io::Result<Self> {
        Self::start_named("bindstore-affinity")
    }

    /// Spawn the affinity thread with a custom name.
    pub fn start_named(name: &str) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Msg>();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || dispatch_loop(rx))?;
        debug!(thread = name, "affinity thread started");

        Ok(Self {
            shared: Arc::new(ThreadShared {
                sender: Mutex::new(tx),
                thread_id: handle.thread().id(),
                next_seq: AtomicU64::new(0),
            }),
            handle: Some(handle),
        })
    }

    /// A shareable context handle to inject into stores.
    #[must_use]
    pub fn handle(&self) -> Arc<dyn AffinityContext> {
        Arc::clone(&self.shared) as Arc<dyn AffinityContext>
    }

    /// Id of the affinity thread.
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.shared.thread_id
    }

    /// Run everything already queued, then stop the thread and join it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shared.sender.lock().send(Msg::Shutdown);
        if let Some(handle) = self.handle.take() {
            if thread::current().id() == self.shared.thread_id {
                // Dropped from one of our own tasks; the loop exits on its own.
                return;
            }
            let _ = handle.join();
            debug!("affinity thread joined");
        }
    }
}

impl AffinityContext for AffinityThread {
    fn is_current(&self) -> bool {
        self.shared.is_current()
    }

    fn submit(&self, task: Task, priority: DispatchPriority) {
        self.shared.submit(task, priority);
    }
}

impl Drop for AffinityThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for AffinityThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffinityThread")
            .field("thread_id", &self.shared.thread_id)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

/// Pull every pending message into the heap. Returns `true` on shutdown.
fn drain(rx: &mpsc::Receiver<Msg>, heap: &mut BinaryHeap<Queued>) -> bool {
    while let Ok(msg) = rx.try_recv() {
        match msg {
            Msg::Run(queued) => heap.push(queued),
            Msg::Shutdown => return true,
        }
    }
    false
}

fn dispatch_loop(rx: mpsc::Receiver<Msg>) {
    let mut heap = BinaryHeap::new();
    loop {
        let mut shutdown = match rx.recv() {
            Ok(Msg::Run(queued)) => {
                heap.push(queued);
                false
            }
            Ok(Msg::Shutdown) | Err(_) => true,
        };

        if !shutdown {
            shutdown = drain(&rx, &mut heap);
        }

        while let Some(queued) = heap.pop() {
            run_task(queued.task);
            if !shutdown {
                shutdown = drain(&rx, &mut heap);
            }
        }

        if shutdown {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// PumpedContext
// ---------------------------------------------------------------------------

struct PumpedShared {
    queue: Mutex<BinaryHeap<Queued>>,
    thread_id: ThreadId,
    next_seq: AtomicU64,
}

/// A task queue owned by the thread that created it and drained on demand.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct PumpedContext {
    shared: Arc<PumpedShared>,
}

impl PumpedContext {
    /// Bind a new queue to the calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(PumpedShared {
                queue: Mutex::new(BinaryHeap::new()),
                thread_id: thread::current().id(),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Run queued tasks until the queue is empty, including tasks queued by
    /// the tasks themselves. Returns how many ran.
    ///
    /// Only the owning thread pumps; other threads get `0` and run nothing.
    pub fn run_pending(&self) -> usize {
        if !self.is_current() {
            debug!("run_pending called off the affinity thread; ignored");
            return 0;
        }
        let mut ran = 0;
        loop {
            // Pop under the lock, run outside it so tasks may submit more work.
            let next = self.shared.queue.lock().pop();
            match next {
                Some(queued) => {
                    run_task(queued.task);
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Default for PumpedContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AffinityContext for PumpedContext {
    fn is_current(&self) -> bool {
        thread::current().id() == self.shared.thread_id
    }

    fn submit(&self, task: Task, priority: DispatchPriority) {
        let seq = self.shared.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.shared.queue.lock().push(Queued {
            priority,
            seq,
            task,
        });
    }
}

impl fmt::Debug for PumpedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PumpedContext")
            .field("thread_id", &self.shared.thread_id)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn priority_order_is_total() {
        assert!(DispatchPriority::Send > DispatchPriority::Normal);
        assert!(DispatchPriority::Normal > DispatchPriority::DataBind);
        assert!(DispatchPriority::DataBind > DispatchPriority::Render);
        assert!(DispatchPriority::Input > DispatchPriority::Background);
        assert_eq!(DispatchPriority::default(), DispatchPriority::DataBind);
    }

    #[test]
    fn parse_priority_names() {
        assert_eq!(
            DispatchPriority::parse("data-bind"),
            Some(DispatchPriority::DataBind)
        );
        assert_eq!(
            DispatchPriority::parse(" Normal "),
            Some(DispatchPriority::Normal)
        );
        assert_eq!(DispatchPriority::parse("urgent"), None);
    }

    #[test]
    fn immediate_runs_inline() {
        let ctx = ImmediateContext;
        assert!(ctx.is_current());
        let (tx, rx) = channel();
        ctx.submit(
            Box::new(move || tx.send(thread::current().id()).unwrap()),
            DispatchPriority::DataBind,
        );
        assert_eq!(rx.try_recv().unwrap(), thread::current().id());
    }

    #[test]
    fn pumped_runs_by_priority_then_fifo() {
        let ctx = PumpedContext::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (label, prio) in [
            ("bind-1", DispatchPriority::DataBind),
            ("bg", DispatchPriority::Background),
            ("bind-2", DispatchPriority::DataBind),
            ("send", DispatchPriority::Send),
        ] {
            let log = Arc::clone(&log);
            ctx.submit(Box::new(move || log.lock().push(label)), prio);
        }
        assert_eq!(ctx.pending(), 4);
        assert_eq!(ctx.run_pending(), 4);
        assert_eq!(*log.lock(), vec!["send", "bind-1", "bind-2", "bg"]);
    }

    #[test]
    fn pumped_ignores_foreign_pump() {
        let ctx = PumpedContext::new();
        ctx.submit(Box::new(|| {}), DispatchPriority::Normal);
        let remote = ctx.clone();
        let ran = thread::spawn(move || (remote.is_current(), remote.run_pending()))
            .join()
            .unwrap();
        assert_eq!(ran, (false, 0));
        assert_eq!(ctx.run_pending(), 1);
    }

    #[test]
    fn pumped_task_can_submit_more_work() {
        let ctx = PumpedContext::new();
        let inner = ctx.clone();
        let hits = Arc::new(AtomicU64::new(0));
        let hits_outer = Arc::clone(&hits);
        ctx.submit(
            Box::new(move || {
                hits_outer.fetch_add(1, AtomicOrdering::SeqCst);
                let hits = Arc::clone(&hits_outer);
                inner.submit(
                    Box::new(move || {
                        hits.fetch_add(1, AtomicOrdering::SeqCst);
                    }),
                    DispatchPriority::DataBind,
                );
            }),
            DispatchPriority::DataBind,
        );
        assert_eq!(ctx.run_pending(), 2);
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn thread_runs_tasks_off_caller() {
        let affinity = AffinityThread::start().unwrap();
        assert!(!affinity.is_current());
        let (tx, rx) = channel();
        affinity.submit(
            Box::new(move || tx.send(thread::current().id()).unwrap()),
            DispatchPriority::DataBind,
        );
        let ran_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ran_on, affinity.thread_id());
        affinity.shutdown();
    }

    #[test]
    fn thread_preserves_fifo_from_one_sender() {
        let affinity = AffinityThread::start().unwrap();
        let ctx = affinity.handle();
        let (tx, rx) = channel();
        for i in 0..200u32 {
            let tx = tx.clone();
            ctx.submit(
                Box::new(move || tx.send(i).unwrap()),
                DispatchPriority::DataBind,
            );
        }
        drop(tx);
        affinity.shutdown();
        let seen: Vec<u32> = rx.iter().collect();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn thread_survives_panicking_task() {
        let affinity = AffinityThread::start().unwrap();
        affinity.submit(Box::new(|| panic!("boom")), DispatchPriority::Normal);
        let (tx, rx) = channel();
        affinity.submit(
            Box::new(move || tx.send(()).unwrap()),
            DispatchPriority::Normal,
        );
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn submit_after_shutdown_is_dropped() {
        let affinity = AffinityThread::start().unwrap();
        let ctx = affinity.handle();
        affinity.shutdown();
        let (tx, rx) = channel::<()>();
        ctx.submit(Box::new(move || tx.send(()).unwrap()), DispatchPriority::Send);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
