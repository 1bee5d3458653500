/*!

The signature hierarchy (§4.B): primitive sigs forming a tree rooted at `UNIV`, subset sigs whose
extent is the union of their parents, and the `SigGraph` that owns both and resolves the textual
parent references captured at parse time.

*/

mod graph;
mod prim_sig;
mod subset_sig;

pub use graph::{Builtins, SigGraph, SigRef};
pub use prim_sig::{PrimSig, PrimSigPtr, SigIndex};
pub use subset_sig::{SubsetParent, SubsetSig, SubsetSigPtr};
