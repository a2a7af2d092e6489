//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI framework.
//! It implements:
//!
//! - Reactive dependency tracking (observable cells and computations)
//! - Virtual node trees and the reconciliation engine
//! - Hydration of pre-rendered host trees
//!
//! The crate does not define a templating language, a styling system, or a
//! component-authoring API. It is the layer those sit on top of: it decides
//! *when* derived state must be recomputed and *how* a new tree description
//! is reconciled against whatever was previously rendered to a host tree.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: observable cells, the active-computation stack, and
//!   auto-tracked computations
//! - `vdom`: virtual nodes, the patch engine, keyed-children diffing, and
//!   hydration, generic over a host-tree backend
//! - `config`: process-wide runtime configuration
//! - `error`: the error taxonomy and the user-error reporting hook
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::reactive::{ObservableCell, Computation, WatchOptions};
//!
//! let cell = ObservableCell::new();
//!
//! // A computation re-runs whenever a cell it read is notified.
//! let cell2 = cell.clone();
//! let watch = Computation::new(
//!     move || {
//!         cell2.register_read();
//!         Ok(compute_something())
//!     },
//!     None,
//!     WatchOptions::default(),
//! )?;
//!
//! cell.notify(); // re-evaluates the computation
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod vdom;

pub use error::Error;
