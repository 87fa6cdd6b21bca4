//! Layered result memoization for the Prism reflection engine
//!
//! Dependency queries repeat the same expensive lookups (tracer runs,
//! manifest reads, whole-catalog aggregation) many times per session, so
//! every expensive call sits behind one of three cache flavors:
//!
//! - [`PermanentCache`] — facts that cannot change for the lifetime of
//!   the process (e.g. host platform detection). No invalidation hook.
//! - [`ScopedCache`] — results keyed by a package scope plus a residual
//!   key. One package can be invalidated without touching the others.
//! - [`FullCache`] — aggregate results with no natural per-package key;
//!   the whole map is dropped and rebuilt when any input could have
//!   changed.
//!
//! A [`CacheRegistry`] ties the scoped and full caches together so a
//! single `clear` call fans out to every cache the engine created.

pub mod full;
pub mod permanent;
pub mod registry;
pub mod scoped;

pub use full::{FullCache, FullInvalidate};
pub use permanent::PermanentCache;
pub use registry::CacheRegistry;
pub use scoped::{ScopeInvalidate, ScopedCache};
