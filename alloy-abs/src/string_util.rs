/*!

Small string-joining helpers used by nearly every `Display`/`Formattable` impl in `alloy-core`.

*/

use std::fmt::Display;

/// Interspaces the items of `iter` with a separator produced by `sep(item)` (the separator may be
/// computed from the just-yielded item, though in practice call sites almost always ignore it and
/// return a constant). The result is an iterator of `String`s suitable for `.collect::<String>()`.
pub fn join_iter<I, F, S>(iter: I, mut sep: F) -> impl Iterator<Item = String>
where
  I: Iterator,
  I::Item: Display,
  F: FnMut(&I::Item) -> S,
  S: Display,
{
  let mut first = true;
  iter.flat_map(move |item| {
    let mut parts = Vec::with_capacity(2);
    if !first {
      parts.push(sep(&item).to_string());
    }
    first = false;
    parts.push(item.to_string());
    parts
  })
}

/// Joins `iter`'s items with the constant separator `sep`, returning the joined `String` directly.
pub fn join_string<I>(iter: I, sep: &str) -> String
where
  I: Iterator,
  I::Item: Display,
{
  let mut out = String::new();
  for (i, item) in iter.enumerate() {
    if i > 0 {
      out.push_str(sep);
    }
    out.push_str(&item.to_string());
  }
  out
}

const SUBSCRIPT_DIGITS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];

/// Renders a nonnegative integer using Unicode subscript digits, e.g. `int_to_subscript(12) == "₁₂"`.
/// Used to annotate a symbol/function's display name with its arity.
pub fn int_to_subscript(mut value: u32) -> String {
  if value == 0 {
    return SUBSCRIPT_DIGITS[0].to_string();
  }
  let mut digits = Vec::new();
  while value > 0 {
    digits.push(SUBSCRIPT_DIGITS[(value % 10) as usize]);
    value /= 10;
  }
  digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn join_string_basic() {
    assert_eq!(join_string(["a", "b", "c"].iter(), ", "), "a, b, c");
    assert_eq!(join_string(std::iter::empty::<&str>(), ", "), "");
    assert_eq!(join_string(["solo"].iter(), ", "), "solo");
  }

  #[test]
  fn join_iter_basic() {
    let joined: String = join_iter(["a", "b", "c"].into_iter(), |_| ", ").collect();
    assert_eq!(joined, "a, b, c");
  }

  #[test]
  fn subscript_digits() {
    assert_eq!(int_to_subscript(0), "₀");
    assert_eq!(int_to_subscript(2), "₂");
    assert_eq!(int_to_subscript(12), "₁₂");
  }
}
