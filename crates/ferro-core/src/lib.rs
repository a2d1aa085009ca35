//! `ferro-core`: NaN-boxed value representation and tracing garbage
//! collector for the Ferro interpreter.
//!
//! This crate has no notion of environments, evaluation order, or
//! built-ins -- those live in `ferro-rt`, which depends on this crate for
//! the shared [`Value`] type, the heap object layout, and the
//! [`gc::Gc`] collector. The [`interp::Interp`] trait is the seam: built-in
//! combiners (constructed in `ferro-rt`) are plain function pointers typed
//! against it, so they can allocate and recurse into evaluation without
//! this crate depending back on the evaluator.

pub mod error;
pub mod gc;
pub mod interp;
pub mod numeric;
pub mod object;
pub mod value;

pub use error::ErrorCode;
pub use gc::{Gc, GcStats, RootProvider};
pub use interp::{EvalOutcome, Interp};
pub use object::{CallableBody, CallableKind, CallableObj, EnvObj, GcObject, ObjPayload, ObjType};
pub use value::{Value, ValueKind};
