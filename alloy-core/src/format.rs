/*!

A unified text-formatting API used across sigs, types, and typed expressions, mirroring the
standard library's `Display`/`Debug` split but parameterized by a `FormatStyle` so the same value
can render differently for error messages, debugging, and (eventually) round-trippable input.

`Display` can't be extended with formatting for foreign types by downstream code, so instead types
implement `Formattable` and get `Display`/`Debug` for free via `impl_display_debug_for_formattable!`:

```rust
# use alloy_core::format::{Formattable, FormatStyle};
# use alloy_core::impl_display_debug_for_formattable;
struct Example;
impl Formattable for Example {
  fn repr(&self, out: &mut dyn std::fmt::Write, style: FormatStyle) -> std::fmt::Result {
    write!(out, "Example<{:?}>", style)
  }
}
impl_display_debug_for_formattable!(Example);
```

*/

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum FormatStyle {
  #[default]
  Default,
  /// A cosmetic, folded rendering (see `ty::Type::fold_for_display`).
  Folded,
  /// Format with extra internal detail (sig identifiers, raw arity bitmask).
  Debug,
}

pub trait Formattable {
  /// Writes a text representation of `self` according to `style`. Use `format!` and friends on
  /// top of this to produce an owned `String`.
  fn repr(&self, out: &mut dyn std::fmt::Write, style: FormatStyle) -> std::fmt::Result;
}

#[macro_export]
macro_rules! impl_display_debug_for_formattable {
  ($t:ty) => {
    impl std::fmt::Display for $t {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <$t as $crate::format::Formattable>::repr(self, f, $crate::format::FormatStyle::Default)
      }
    }

    impl std::fmt::Debug for $t {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <$t as $crate::format::Formattable>::repr(self, f, $crate::format::FormatStyle::Debug)
      }
    }
  };
}
pub use impl_display_debug_for_formattable;
