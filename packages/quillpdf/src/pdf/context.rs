//! Indirect-object arena
//!
//! A `Context` owns every indirect object of one document, keyed by
//! `(object number, generation)`, together with the trailer record. All
//! allocation of object numbers goes through here; refs from one context
//! never resolve in another.

use crate::pdf::object::{Dict, Name, Object, ObjRef, PdfString};
use indexmap::IndexMap;
use std::collections::HashSet;

/// The trailer record carried from parse to serialization.
#[derive(Debug, Clone, Default)]
pub struct Trailer {
    pub root: Option<ObjRef>,
    pub info: Option<ObjRef>,
    pub encrypt: Option<ObjRef>,
    pub id: Option<(PdfString, PdfString)>,
}

static NULL_OBJECT: Object = Object::Null;

/// Per-document arena of indirect objects.
#[derive(Debug, Default)]
pub struct Context {
    objects: IndexMap<ObjRef, Object>,
    /// Largest object number ever handed out or seen.
    largest: u32,
    /// Released numbers available for reuse, with their next generation.
    free: Vec<ObjRef>,
    trailer: Trailer,
    /// Refs that appeared in parsed values but never resolved. Tolerated;
    /// lookups on them yield Null.
    dangling: HashSet<ObjRef>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an object number without assigning a value.
    ///
    /// Embedders use this to hand out a ref before the object subgraph
    /// exists; `assign` fills it in later.
    pub fn next_ref(&mut self) -> ObjRef {
        if let Some(r) = self.free.pop() {
            return r;
        }
        self.largest += 1;
        ObjRef::new(self.largest, 0)
    }

    /// Allocate a fresh number and insert the value in one step.
    pub fn register(&mut self, value: Object) -> ObjRef {
        let r = self.next_ref();
        self.objects.insert(r, value);
        r
    }

    /// Insert or overwrite the value at a previously seen number.
    ///
    /// Assigning to a number that was never reserved is a logic error:
    /// debug builds assert, release builds log and proceed best-effort.
    pub fn assign(&mut self, r: ObjRef, value: Object) {
        debug_assert!(
            r.num <= self.largest,
            "assign to unreserved object number {}",
            r.num
        );
        if r.num > self.largest {
            log::warn!("assign to unreserved object number {}; adopting it", r.num);
            self.largest = r.num;
        }
        self.objects.insert(r, value);
    }

    /// Insert an object parsed from a file, adopting its number.
    pub(crate) fn insert_parsed(&mut self, r: ObjRef, value: Object) {
        if r.num > self.largest {
            self.largest = r.num;
        }
        self.objects.insert(r, value);
    }

    /// Drop an object without recycling its number; used for file
    /// plumbing (object-stream hosts) that never belonged to the graph.
    pub(crate) fn discard(&mut self, r: ObjRef) {
        self.objects.swap_remove(&r);
    }

    /// Release a number back to the free list, bumping its generation.
    pub fn delete(&mut self, r: ObjRef) -> Option<Object> {
        let removed = self.objects.swap_remove(&r);
        if removed.is_some() && r.gen < u16::MAX {
            self.free.push(ObjRef::new(r.num, r.gen + 1));
        }
        removed
    }

    /// Follow a value one hop: refs resolve to their object, everything
    /// else passes through. Dangling refs resolve to Null; never fails.
    pub fn lookup<'a>(&'a self, value: &'a Object) -> &'a Object {
        match value {
            Object::Ref(r) => self.resolve(*r),
            other => other,
        }
    }

    /// Resolve a ref directly; Null when absent.
    pub fn resolve(&self, r: ObjRef) -> &Object {
        self.objects.get(&r).unwrap_or(&NULL_OBJECT)
    }

    pub fn get(&self, r: ObjRef) -> Option<&Object> {
        self.objects.get(&r)
    }

    pub fn get_mut(&mut self, r: ObjRef) -> Option<&mut Object> {
        self.objects.get_mut(&r)
    }

    /// Resolve a ref expecting a dictionary (plain or stream).
    pub fn dict_at(&self, r: ObjRef) -> Option<&Dict> {
        self.get(r).and_then(Object::as_dict)
    }

    pub fn dict_at_mut(&mut self, r: ObjRef) -> Option<&mut Dict> {
        self.get_mut(r).and_then(Object::as_dict_mut)
    }

    pub fn contains(&self, r: ObjRef) -> bool {
        self.objects.contains_key(&r)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn largest_number(&self) -> u32 {
        self.largest
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Trailer {
        &mut self.trailer
    }

    /// All live refs in ascending object-number order; the serialization
    /// order of both writer modes.
    pub fn refs_sorted(&self) -> Vec<ObjRef> {
        let mut refs: Vec<ObjRef> = self.objects.keys().copied().collect();
        refs.sort_unstable();
        refs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjRef, &Object)> {
        self.objects.iter()
    }

    pub(crate) fn note_dangling(&mut self, r: ObjRef) {
        self.dangling.insert(r);
    }

    pub fn dangling_refs(&self) -> impl Iterator<Item = &ObjRef> {
        self.dangling.iter()
    }

    /// Every ref transitively reachable from the given roots, the roots
    /// included. Dangling refs are reported too; they simply have no
    /// value to recurse into.
    pub fn reachable_from(&self, roots: &[ObjRef]) -> HashSet<ObjRef> {
        let mut seen: HashSet<ObjRef> = HashSet::new();
        let mut agenda: Vec<ObjRef> = roots.to_vec();
        while let Some(r) = agenda.pop() {
            if !seen.insert(r) {
                continue;
            }
            if let Some(value) = self.get(r) {
                let mut refs = Vec::new();
                Self::refs_in(value, &mut refs);
                agenda.extend(refs);
            }
        }
        seen
    }

    /// Walk a value and collect every ref it mentions, in encounter order.
    pub fn refs_in(value: &Object, out: &mut Vec<ObjRef>) {
        match value {
            Object::Ref(r) => out.push(*r),
            Object::Array(items) => {
                for item in items {
                    Self::refs_in(item, out);
                }
            }
            Object::Dict(dict) | Object::Stream { dict, .. } => {
                for (_, item) in dict {
                    Self::refs_in(item, out);
                }
            }
            _ => {}
        }
    }
}

/// Keys every trailer consumer cares about.
impl Trailer {
    pub(crate) fn read_from(dict: &Dict) -> Self {
        use crate::pdf::object::DictExt;
        let id = dict.get_key("ID").and_then(Object::as_array).and_then(|a| {
            match (a.first(), a.get(1)) {
                (Some(Object::String(a)), Some(Object::String(b))) => {
                    Some((a.clone(), b.clone()))
                }
                _ => None,
            }
        });
        Self {
            root: dict.get_ref("Root"),
            info: dict.get_ref("Info"),
            encrypt: dict.get_ref("Encrypt"),
            id,
        }
    }

    /// Merge an older update section's trailer in: later sections win.
    pub(crate) fn merge_older(&mut self, older: Trailer) {
        if self.root.is_none() {
            self.root = older.root;
        }
        if self.info.is_none() {
            self.info = older.info;
        }
        if self.encrypt.is_none() {
            self.encrypt = older.encrypt;
        }
        if self.id.is_none() {
            self.id = older.id;
        }
    }

    pub(crate) fn to_dict(&self, size: i64) -> Dict {
        use crate::pdf::object::DictExt;
        let mut d = Dict::new();
        d.set("Size", size);
        if let Some(root) = self.root {
            d.set("Root", root);
        }
        if let Some(info) = self.info {
            d.set("Info", info);
        }
        if let Some(encrypt) = self.encrypt {
            d.set("Encrypt", encrypt);
        }
        if let Some((a, b)) = &self.id {
            d.insert(
                Name::new("ID"),
                Object::Array(vec![
                    Object::String(a.clone()),
                    Object::String(b.clone()),
                ]),
            );
        }
        d
    }
}
