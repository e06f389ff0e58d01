//! Profile capture.
//!
//! [`Profiler`] is the seam between the middleware and whatever measures the
//! request. [`ScopeProfiler`] is the built-in implementation: application
//! code marks functions with [`profile_scope!`](crate::profile_scope) or
//! [`profile_function!`](crate::profile_function), and every scope closed on
//! the capturing thread is accounted into the request's [`ProfileData`].

use super::schema::{CallStats, FunctionKey, ProfileData};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Runs a callable and returns its result together with the captured profile
pub trait Profiler: Send + Sync {
    fn run_and_capture<R, F>(&self, f: F) -> (R, ProfileData)
    where
        F: FnOnce() -> R;
}

struct Frame {
    id: u64,
    key: FunctionKey,
    started: Instant,
    child_time: Duration,
}

struct Collector {
    generation: u64,
    next_frame: u64,
    data: ProfileData,
    stack: Vec<Frame>,
}

/// Where a guard's frame sits on its collector's stack
#[derive(Clone, Copy)]
struct FrameSlot {
    generation: u64,
    depth: usize,
    id: u64,
}

impl Collector {
    fn enter(&mut self, key: FunctionKey) -> FrameSlot {
        let id = self.next_frame;
        self.next_frame += 1;
        let slot = FrameSlot {
            generation: self.generation,
            depth: self.stack.len(),
            id,
        };
        self.stack.push(Frame {
            id,
            key,
            started: Instant::now(),
            child_time: Duration::ZERO,
        });
        slot
    }

    /// Close the frame in `slot` together with every frame opened above it
    ///
    /// A slot whose frame is already closed is ignored.
    fn exit(&mut self, slot: FrameSlot) {
        if slot.generation != self.generation {
            return;
        }
        if self.stack.get(slot.depth).map(|frame| frame.id) != Some(slot.id) {
            return;
        }
        while self.stack.len() > slot.depth {
            self.pop();
        }
    }

    fn pop(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let elapsed = frame.started.elapsed();
        let internal = elapsed.saturating_sub(frame.child_time);

        if let Some(parent) = self.stack.last_mut() {
            parent.child_time += elapsed;
        }

        // Cumulative time only counts for the outermost activation of a
        // recursive function.
        let recursive = self.stack.iter().any(|f| f.key == frame.key);
        let stats = CallStats {
            primitive_calls: if recursive { 0 } else { 1 },
            total_calls: 1,
            total_time: internal.as_secs_f64(),
            cumulative_time: if recursive { 0.0 } else { elapsed.as_secs_f64() },
        };

        let caller = self.stack.last().map(|f| f.key.clone());
        self.data.record_call(frame.key, caller.as_ref(), stats);
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Collector>> = const { RefCell::new(None) };
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// RAII guard for one profiled scope. Records the call when dropped.
#[must_use = "dropping the guard immediately records an empty call; bind it with `let _scope = ...`"]
pub struct ScopeGuard {
    slot: Option<FrameSlot>,
    // Scopes are tied to the thread-local collector they were opened on.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let Some(frame) = self.slot else {
            return;
        };
        ACTIVE.with(|slot| {
            if let Some(collector) = slot.borrow_mut().as_mut() {
                collector.exit(frame);
            }
        });
    }
}

/// Open a profiled scope for `key` on the current thread
///
/// Outside of a capture the guard is inert.
pub fn scope(key: FunctionKey) -> ScopeGuard {
    let slot = ACTIVE.with(|slot| slot.borrow_mut().as_mut().map(|collector| collector.enter(key)));
    ScopeGuard {
        slot,
        _not_send: PhantomData,
    }
}

/// Whether a capture is running on the current thread
pub fn is_capturing() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

/// Installs a fresh collector and puts the previous one back on drop, so
/// nested captures on one thread do not clobber each other.
struct Installed {
    previous: Option<Option<Collector>>,
}

impl Installed {
    fn install() -> Self {
        let collector = Collector {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            next_frame: 0,
            data: ProfileData::new(),
            stack: Vec::new(),
        };
        let previous = ACTIVE.with(|slot| slot.replace(Some(collector)));
        Self {
            previous: Some(previous),
        }
    }

    fn finish(mut self) -> ProfileData {
        let previous = self.previous.take().unwrap_or_default();
        let current = ACTIVE.with(|slot| slot.replace(previous));
        current.map(|collector| collector.data).unwrap_or_default()
    }
}

impl Drop for Installed {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            ACTIVE.with(|slot| slot.replace(previous));
        }
    }
}

/// Instrumenting profiler driven by scope guards
///
/// Each capture records a synthetic root function (by default
/// `{request}`) so the whole handler's wall time shows up as the root's
/// cumulative time.
#[derive(Debug, Clone)]
pub struct ScopeProfiler {
    root: FunctionKey,
}

impl Default for ScopeProfiler {
    fn default() -> Self {
        Self {
            root: FunctionKey::builtin("<request>"),
        }
    }
}

impl ScopeProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different key for the synthetic root function
    pub fn with_root(mut self, root: FunctionKey) -> Self {
        self.root = root;
        self
    }

    pub fn root(&self) -> &FunctionKey {
        &self.root
    }
}

impl Profiler for ScopeProfiler {
    fn run_and_capture<R, F>(&self, f: F) -> (R, ProfileData)
    where
        F: FnOnce() -> R,
    {
        let installed = Installed::install();
        let result = {
            let _root = scope(self.root.clone());
            f()
        };
        (result, installed.finish())
    }
}

/// Open a profiled scope named `$name` at the current source location
///
/// ```ignore
/// fn load_user(id: u64) -> User {
///     request_profiler::profile_scope!("load_user");
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_scope = $crate::profile::capture::scope($crate::profile::FunctionKey::new(
            file!(),
            line!(),
            $name,
        ));
    };
}

/// Open a profiled scope named after the enclosing function
#[macro_export]
macro_rules! profile_function {
    () => {
        let _profile_scope = $crate::profile::capture::scope($crate::profile::FunctionKey::new(
            file!(),
            line!(),
            {
                fn f() {}
                fn type_name_of<T>(_: T) -> &'static str {
                    ::std::any::type_name::<T>()
                }
                let name = type_name_of(f);
                let name = name.strip_suffix("::f").unwrap_or(name);
                name.rsplit("::").next().unwrap_or(name)
            },
        ));
    };
}
