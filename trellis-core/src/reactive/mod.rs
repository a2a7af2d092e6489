//! Reactive Dependency Tracking
//!
//! This module implements the dependency-tracking half of the runtime:
//! observable cells, the active-computation stack, and auto-tracked
//! computations.
//!
//! # Concepts
//!
//! ## Observable cells
//!
//! An [`ObservableCell`] is the minimal observable unit. It holds no value
//! of its own; it only tracks which computations currently depend on it.
//! State containers built on top of this crate embed a cell next to each
//! piece of observed state, call [`ObservableCell::register_read`] on every
//! read, and [`ObservableCell::notify`] on every write.
//!
//! ## Computations
//!
//! A [`Computation`] is a unit of derived work: a render, a computed value,
//! or a user-registered watch. Running its getter under the tracking stack
//! re-discovers which cells it read, so dependencies never have to be
//! declared manually and conditional reads are pruned automatically across
//! re-evaluations.
//!
//! ## The tracking stack
//!
//! A thread-local stack records which computation (if any) is currently
//! evaluating. Nested evaluation (a computed value read during a render)
//! pushes and pops entries so the correct computation is always current,
//! even when an inner evaluation fails.
//!
//! # Implementation Notes
//!
//! The core is single-threaded by design; graph state lives behind
//! `Rc`/`RefCell` and the tracking stack is thread-local. Reads are
//! recorded implicitly while a getter runs, so callers never declare
//! dependencies by hand.

mod cell;
mod computation;
mod context;
mod scheduler;
mod subscriber;
mod traverse;

pub use cell::{CellId, ObservableCell};
pub use computation::{ChangeCallback, Computation, Getter, WatchOptions};
pub use context::{is_tracking, untracked};
pub use scheduler::{BatchScheduler, Scheduler, Task};
pub use subscriber::ComputationId;
pub use traverse::Traverse;
