#![allow(unused)]
/*!

Types/type aliases that abstract over the implementing backing type.

# Background and Motivation

A motivating example is the `IString` type, an interned string type. A number of external crates could provide this
functionality. This module redirects to whatever chosen implementation we want. To use the
[`string_cache` crate](https://crates.io/crates/string_cache), we just define `IString` as an alias for
`string_cache::DefaultAtom`:

```ignore
pub use string_cache::DefaultAtom as IString;
```

For types or infrastructure with very different backing implementations, we define an abstraction layer over the
implementation. For example, the `log` module could use any of a number of logging frameworks or even a bespoke
solution for its implementation. However, its (crate) public interface consists only of
`set_global_logging_threshold()`/`get_global_logging_threshold()` and the macros `critical!`, `error!`, `warning!`,
`info!`, `debug!`, and `trace!`. The (private) backing implementation is encapsulated in the `log` module.

*/

mod heap;
mod nat_set;
mod string_util;
mod unsafe_ptr;

pub mod log;

// region Hashing data structures
pub use std::collections::HashMap;
pub use std::collections::HashSet;

// For vectors that are expected to have few or zero elements.
pub use smallvec::{smallvec, SmallVec};

/// A `Set<T>` is a hash set. Useful when you need to test membership but never need to enumerate in a
/// particular order.
pub type Set<T> = HashSet<T>;
// endregion

// Logging
pub use tracing;

pub use unsafe_ptr::UnsafePtr;

// Interned string. Backed by a global cache that can be used across threads.
pub use string_cache::DefaultAtom as IString;

// Heap construction. See `heap` module docs for why this exists and how it's used.
pub use heap::heap_construct;

// A set of (small) natural numbers.
pub use nat_set::NatSet;

// Join sequences with a separator.
pub use string_util::{int_to_subscript, join_iter, join_string};
