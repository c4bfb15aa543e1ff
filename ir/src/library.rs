//! External library-call naming.
//!
//! A structured op lowered to an external call gets a name derived from its
//! kind and the types of its shaped operands, so distinct specializations
//! map to distinct symbols.

use std::fmt::Write;

use crate::op::Operation;
use crate::shape::{Extent, ShapedType};

fn mangle_shaped(out: &mut String, ty: &ShapedType) {
    out.push_str("view");
    for extent in ty.shape() {
        match extent {
            // The write target is an in-memory String; formatting cannot fail.
            Extent::Static(n) => {
                let _ = write!(out, "{n}x");
            }
            Extent::Dynamic => out.push_str("sx"),
        }
    }
    out.push_str(ty.elem().mangled());
}

/// Symbol name for an external implementation of `op`.
///
/// The name is the op's kind followed by one `view` segment per shaped
/// operand: each extent renders as `{n}x` (or `sx` when dynamic), then the
/// element type. Dots in the kind name become underscores so the result is
/// a valid C identifier.
pub fn library_call_name(op: &Operation) -> String {
    let mut name = op.kind.as_ref().replace('.', "_");
    for operand in op.operands() {
        if let Some(ty) = operand.shaped() {
            name.push('_');
            mangle_shaped(&mut name, ty);
        }
    }
    name
}
