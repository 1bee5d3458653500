/*!

The two expression trees that cross the parser/analyzer boundary (§6): [`untyped`] is the parser's
output, [`typed`] is the Elaborator's.

*/

pub mod typed;
pub mod untyped;
