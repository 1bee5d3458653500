/*!

Cooperative cancellation, checked between `closure()` fixed-point iterations (§5). This is not
preemptive: a long-running `closure` call polls `CancellationToken::is_cancelled` once per widening
step and, if set, abandons the computation by returning `ErrorKind::Cancelled` without having
mutated any caller-visible state (every algebraic operator is pure, so "abandon" is just "stop
accumulating and return early").

*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
  flag: Arc<AtomicBool>,
}

impl CancellationToken {
  pub fn new() -> Self {
    CancellationToken::default()
  }

  pub fn cancel(&self) {
    self.flag.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cancel_is_observed_through_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
  }
}
