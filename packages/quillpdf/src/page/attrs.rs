//! Inherited page attributes
//!
//! `/MediaBox`, `/Resources`, `/Rotate` and `/CropBox` may live on any
//! ancestor node instead of the page leaf. Resolution walks `/Parent`
//! links until a value is found; the walk is bounded so malformed parent
//! loops terminate.

use crate::pdf::context::Context;
use crate::pdf::object::{DictExt, Object, ObjRef};

const MAX_PARENT_DEPTH: usize = 64;

/// Attributes a page leaf inherits from its ancestors.
pub const INHERITABLE: [&str; 4] = ["MediaBox", "Resources", "Rotate", "CropBox"];

/// Resolve an attribute for a leaf, walking up the parent chain.
pub fn resolve(ctx: &Context, leaf: ObjRef, key: &str) -> Option<Object> {
    let mut current = Some(leaf);
    for _ in 0..MAX_PARENT_DEPTH {
        let r = current?;
        let dict = ctx.dict_at(r)?;
        if let Some(value) = dict.get_key(key) {
            return Some(ctx.lookup(value).clone());
        }
        current = dict.get_ref("Parent");
    }
    log::warn!("parent chain deeper than {} while resolving /{}", MAX_PARENT_DEPTH, key);
    None
}

/// A leaf's media box as `[x0, y0, x1, y1]`.
pub fn media_box(ctx: &Context, leaf: ObjRef) -> Option<[f64; 4]> {
    rect(resolve(ctx, leaf, "MediaBox")?)
}

pub fn crop_box(ctx: &Context, leaf: ObjRef) -> Option<[f64; 4]> {
    rect(resolve(ctx, leaf, "CropBox")?)
}

pub fn rotation(ctx: &Context, leaf: ObjRef) -> i64 {
    resolve(ctx, leaf, "Rotate")
        .and_then(|v| v.as_int())
        .unwrap_or(0)
}

fn rect(value: Object) -> Option<[f64; 4]> {
    let arr = value.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    Some([
        arr[0].as_real()?,
        arr[1].as_real()?,
        arr[2].as_real()?,
        arr[3].as_real()?,
    ])
}
