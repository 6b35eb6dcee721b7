//! Cross-context object copying
//!
//! Deep-copies a subgraph from one [`Context`] into another, renumbering
//! every reference through a translation map. The map is seeded with a
//! freshly reserved destination ref *before* the referenced value is
//! visited, which is what keeps cycles (a page pointing at its parent
//! pointing back) from recursing forever, and what keeps shared subgraphs
//! shared after the copy.

use crate::pdf::context::Context;
use crate::pdf::object::{Dict, Object, ObjRef};
use std::collections::HashMap;

/// One copy session; the translation map lives as long as the copier.
pub struct Copier<'a> {
    source: &'a Context,
    map: HashMap<ObjRef, ObjRef>,
    agenda: Vec<ObjRef>,
}

impl<'a> Copier<'a> {
    pub fn new(source: &'a Context) -> Self {
        Self {
            source,
            map: HashMap::new(),
            agenda: Vec::new(),
        }
    }

    /// Copy a root value into `dest`, returning the translated value.
    ///
    /// Every reference reachable from the root is copied exactly once per
    /// copier; calling this repeatedly on overlapping subgraphs reuses the
    /// earlier translations.
    pub fn copy_value(&mut self, dest: &mut Context, value: &Object) -> Object {
        let translated = self.translate(dest, value);
        // Work the agenda iteratively so deep graphs cannot blow the stack
        while let Some(foreign) = self.agenda.pop() {
            let resolved = self.source.resolve(foreign).clone();
            let local_value = self.translate(dest, &resolved);
            let local_ref = self.map[&foreign];
            dest.assign(local_ref, local_value);
        }
        translated
    }

    /// The destination ref a foreign ref was translated to, if visited.
    pub fn translated(&self, foreign: ObjRef) -> Option<ObjRef> {
        self.map.get(&foreign).copied()
    }

    fn translate(&mut self, dest: &mut Context, value: &Object) -> Object {
        match value {
            Object::Ref(foreign) => Object::Ref(self.local_ref_for(dest, *foreign)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.translate(dest, item))
                    .collect(),
            ),
            Object::Dict(dict) => Object::Dict(self.translate_dict(dest, dict)),
            Object::Stream { dict, data } => Object::Stream {
                dict: self.translate_dict(dest, dict),
                data: data.clone(),
            },
            other => other.clone(),
        }
    }

    fn translate_dict(&mut self, dest: &mut Context, dict: &Dict) -> Dict {
        dict.iter()
            .map(|(key, item)| (key.clone(), self.translate(dest, item)))
            .collect()
    }

    fn local_ref_for(&mut self, dest: &mut Context, foreign: ObjRef) -> ObjRef {
        if let Some(&local) = self.map.get(&foreign) {
            return local;
        }
        let local = dest.next_ref();
        self.map.insert(foreign, local);
        self.agenda.push(foreign);
        local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::pdf::object::DictExt;

    #[test]
    fn test_copy_scalar_is_plain_clone() {
        let src = Context::new();
        let mut dst = Context::new();
        let mut copier = Copier::new(&src);
        assert_eq!(copier.copy_value(&mut dst, &Object::Int(5)), Object::Int(5));
        assert!(dst.is_empty());
    }

    #[test]
    fn test_copy_translates_references() {
        let mut src = Context::new();
        let inner = src.register(Object::Int(42));
        let root = Object::Dict(dict! { "Value" => inner });

        let mut dst = Context::new();
        dst.register(Object::Null); // occupy number 1 so renumbering shows
        let mut copier = Copier::new(&src);
        let copied = copier.copy_value(&mut dst, &root);

        let new_ref = copied.as_dict().unwrap().get_ref("Value").unwrap();
        assert_ne!(new_ref, inner);
        assert_eq!(dst.resolve(new_ref).as_int(), Some(42));
    }

    #[test]
    fn test_copy_breaks_cycles() {
        // parent <-> child reference cycle
        let mut src = Context::new();
        let parent = src.next_ref();
        let child = src.register(Object::Dict(dict! { "Parent" => parent }));
        src.assign(parent, Object::Dict(dict! { "Kid" => child }));

        let mut dst = Context::new();
        let mut copier = Copier::new(&src);
        let copied = copier.copy_value(&mut dst, &Object::Ref(parent));

        let new_parent = copied.as_ref_obj().unwrap();
        let new_child = dst
            .dict_at(new_parent)
            .unwrap()
            .get_ref("Kid")
            .unwrap();
        let back = dst
            .dict_at(new_child)
            .unwrap()
            .get_ref("Parent")
            .unwrap();
        assert_eq!(back, new_parent);
    }

    #[test]
    fn test_shared_subgraphs_stay_shared() {
        let mut src = Context::new();
        let shared = src.register(Object::Int(7));
        let a = src.register(Object::Dict(dict! { "S" => shared }));
        let b = src.register(Object::Dict(dict! { "S" => shared }));
        let root = Object::Array(vec![Object::Ref(a), Object::Ref(b)]);

        let mut dst = Context::new();
        let mut copier = Copier::new(&src);
        let copied = copier.copy_value(&mut dst, &root);

        let arr = copied.as_array().unwrap();
        let sa = dst
            .dict_at(arr[0].as_ref_obj().unwrap())
            .unwrap()
            .get_ref("S")
            .unwrap();
        let sb = dst
            .dict_at(arr[1].as_ref_obj().unwrap())
            .unwrap()
            .get_ref("S")
            .unwrap();
        assert_eq!(sa, sb);
        // Exactly one copy of the shared object was made
        assert_eq!(dst.len(), 3);
    }

    #[test]
    fn test_copy_is_isolated_from_source() {
        let mut src = Context::new();
        let inner = src.register(Object::Dict(dict! { "N" => 1 }));
        let root = Object::Ref(inner);

        let mut dst = Context::new();
        let mut copier = Copier::new(&src);
        let copied = copier.copy_value(&mut dst, &root);
        let local = copied.as_ref_obj().unwrap();

        // Mutate the copy; the source must not see it
        dst.dict_at_mut(local).unwrap().set("N", 2);
        assert_eq!(src.dict_at(inner).unwrap().get_int("N"), Some(1));
    }

    #[test]
    fn test_copy_stream_duplicates_bytes() {
        let mut src = Context::new();
        let stream = src.register(Object::Stream {
            dict: dict! { "Length" => 3 },
            data: vec![1, 2, 3],
        });
        let mut dst = Context::new();
        let mut copier = Copier::new(&src);
        let copied = copier.copy_value(&mut dst, &Object::Ref(stream));
        let (_, data) = dst.resolve(copied.as_ref_obj().unwrap()).as_stream().unwrap();
        assert_eq!(data, &[1, 2, 3]);
    }

    #[test]
    fn test_dangling_foreign_ref_becomes_null_object() {
        let src = Context::new();
        let mut dst = Context::new();
        let mut copier = Copier::new(&src);
        let copied = copier.copy_value(&mut dst, &Object::Ref(ObjRef::new(9, 0)));
        let local = copied.as_ref_obj().unwrap();
        assert!(dst.resolve(local).is_null());
    }
}
