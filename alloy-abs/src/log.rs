/*!

Leveled logging, encapsulating whatever logging framework actually backs it (currently `tracing`)
behind a small, stable interface: `set_global_logging_threshold`/`get_global_logging_threshold` and
the macros `critical!`, `error!`, `warning!`, `info!`, `debug!`, and `trace!`.

Each macro takes a verbosity level followed by format arguments, e.g. `warning!(1, "{} is shadowed by {}", new, old)`.
A call site's message is only emitted if its level is less than or equal to the current global
threshold; level 0 (used by `critical!`) is always emitted. This is a level-gated filter layered on
top of `tracing`'s own target/level machinery, not a replacement for it: every call still goes
through `tracing::event!` so the usual subscriber-side filtering and structured fields still apply.

This is diagnostic/operator-facing logging, distinct from `alloy-core`'s `Diagnostics` accumulator,
which reports source-level errors and warnings back to the caller of the analyzer.

*/

use std::sync::atomic::{AtomicU8, Ordering};

static LOGGING_THRESHOLD: AtomicU8 = AtomicU8::new(0);

/// Sets the global verbosity threshold. Calls at a level greater than this threshold are
/// suppressed before formatting their arguments.
pub fn set_global_logging_threshold(level: u8) {
  LOGGING_THRESHOLD.store(level, Ordering::Relaxed);
}

pub fn get_global_logging_threshold() -> u8 {
  LOGGING_THRESHOLD.load(Ordering::Relaxed)
}

#[doc(hidden)]
#[inline(always)]
pub fn level_enabled(level: u8) -> bool {
  level <= get_global_logging_threshold()
}

/// Always emitted regardless of the verbosity threshold; reserved for conditions the caller
/// cannot recover from (e.g. a frozen `Module` invariant violated).
#[macro_export]
macro_rules! critical {
  ($($arg:tt)*) => {
    $crate::tracing::error!($($arg)*);
  };
}

/// `error!(level, fmt, args...)`
#[macro_export]
macro_rules! error {
  ($level:expr, $($arg:tt)*) => {
    if $crate::log::level_enabled($level) {
      $crate::tracing::error!($($arg)*);
    }
  };
}

/// `warning!(level, fmt, args...)`
#[macro_export]
macro_rules! warning {
  ($level:expr, $($arg:tt)*) => {
    if $crate::log::level_enabled($level) {
      $crate::tracing::warn!($($arg)*);
    }
  };
}

/// `info!(level, fmt, args...)`
#[macro_export]
macro_rules! info {
  ($level:expr, $($arg:tt)*) => {
    if $crate::log::level_enabled($level) {
      $crate::tracing::info!($($arg)*);
    }
  };
}

/// `debug!(level, fmt, args...)`
#[macro_export]
macro_rules! debug {
  ($level:expr, $($arg:tt)*) => {
    if $crate::log::level_enabled($level) {
      $crate::tracing::debug!($($arg)*);
    }
  };
}

/// `trace!(level, fmt, args...)`
#[macro_export]
macro_rules! trace {
  ($level:expr, $($arg:tt)*) => {
    if $crate::log::level_enabled($level) {
      $crate::tracing::trace!($($arg)*);
    }
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_gates_levels() {
    set_global_logging_threshold(2);
    assert!(level_enabled(0));
    assert!(level_enabled(2));
    assert!(!level_enabled(3));
    set_global_logging_threshold(0);
  }
}
