//! PDF object types
//!
//! The algebraic value model for the indirect-object graph. Dictionaries are
//! insertion-ordered so a document serializes the same way every time.

use indexmap::IndexMap;
use std::fmt;

/// A PDF name, stored with `#xx` escapes already decoded.
///
/// Names compare by byte equality of the decoded form. Bytes outside the
/// ASCII range are kept as single chars in the 0..=255 range and re-escaped
/// on output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

/// How a string literal appeared in the source file.
///
/// The hint is carried through parse and re-emitted the same way, so a
/// hex-written string stays hex on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Literal,
    Hex,
}

/// A PDF string: raw bytes plus the original-encoding hint.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfString {
    data: Vec<u8>,
    kind: StringKind,
}

impl PdfString {
    pub fn new(data: Vec<u8>, kind: StringKind) -> Self {
        Self { data, kind }
    }

    /// A string that serializes in `( )` form.
    pub fn literal(data: impl Into<Vec<u8>>) -> Self {
        Self::new(data.into(), StringKind::Literal)
    }

    /// A string that serializes in `< >` form.
    pub fn hex(data: impl Into<Vec<u8>>) -> Self {
        Self::new(data.into(), StringKind::Hex)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn kind(&self) -> StringKind {
        self.kind
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// An indirect-object address: `(object number, generation)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    pub num: u32,
    pub gen: u16,
}

impl ObjRef {
    pub fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.gen)
    }
}

pub type Array = Vec<Object>;
pub type Dict = IndexMap<Name, Object>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Object {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    String(PdfString),
    Name(Name),
    Array(Array),
    Dict(Dict),
    Stream {
        dict: Dict,
        data: Vec<u8>,
    },
    Ref(ObjRef),
}

impl Object {
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Object::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let Object::Int(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Numeric accessor: integers widen to reals.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            Object::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        if let Object::Name(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        if let Object::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        if let Object::Array(a) = self {
            Some(a)
        } else {
            None
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        if let Object::Array(a) = self {
            Some(a)
        } else {
            None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dict(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Object::Dict(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    pub fn as_ref_obj(&self) -> Option<ObjRef> {
        if let Object::Ref(r) = self {
            Some(*r)
        } else {
            None
        }
    }

    pub fn as_stream(&self) -> Option<(&Dict, &[u8])> {
        if let Object::Stream { dict, data } = self {
            Some((dict, data))
        } else {
            None
        }
    }

    /// Build `[a b c d]` rectangles and similar numeric arrays.
    pub fn real_array(values: &[f64]) -> Object {
        Object::Array(values.iter().map(|&v| Object::Real(v)).collect())
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Bool(b)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Int(i)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Object::Int(i as i64)
    }
}

impl From<u32> for Object {
    fn from(i: u32) -> Self {
        Object::Int(i as i64)
    }
}

impl From<usize> for Object {
    fn from(i: usize) -> Self {
        Object::Int(i as i64)
    }
}

impl From<f64> for Object {
    fn from(r: f64) -> Self {
        Object::Real(r)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::Name(Name::new(s))
    }
}

impl From<Name> for Object {
    fn from(n: Name) -> Self {
        Object::Name(n)
    }
}

impl From<PdfString> for Object {
    fn from(s: PdfString) -> Self {
        Object::String(s)
    }
}

impl From<ObjRef> for Object {
    fn from(r: ObjRef) -> Self {
        Object::Ref(r)
    }
}

impl From<Array> for Object {
    fn from(a: Array) -> Self {
        Object::Array(a)
    }
}

impl From<Dict> for Object {
    fn from(d: Dict) -> Self {
        Object::Dict(d)
    }
}

/// Convenience lookups on dictionaries keyed by `&str`.
pub trait DictExt {
    fn get_key(&self, key: &str) -> Option<&Object>;
    fn set(&mut self, key: &str, value: impl Into<Object>);
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_name(&self, key: &str) -> Option<&Name>;
    fn get_ref(&self, key: &str) -> Option<ObjRef>;
    /// True when `/Type` equals the given name.
    fn is_type(&self, type_name: &str) -> bool;
}

impl DictExt for Dict {
    fn get_key(&self, key: &str) -> Option<&Object> {
        self.get(&Name::new(key))
    }

    fn set(&mut self, key: &str, value: impl Into<Object>) {
        self.insert(Name::new(key), value.into());
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get_key(key).and_then(Object::as_int)
    }

    fn get_name(&self, key: &str) -> Option<&Name> {
        self.get_key(key).and_then(Object::as_name)
    }

    fn get_ref(&self, key: &str) -> Option<ObjRef> {
        self.get_key(key).and_then(Object::as_ref_obj)
    }

    fn is_type(&self, type_name: &str) -> bool {
        self.get_name("Type").map(Name::as_str) == Some(type_name)
    }
}

/// Build a [`Dict`] literal with insertion order preserved.
///
/// ```
/// use quillpdf::dict;
/// use quillpdf::pdf::object::ObjRef;
/// let d = dict! {
///     "Type" => "Page",
///     "Parent" => ObjRef::new(2, 0),
///     "Rotate" => 90,
/// };
/// assert_eq!(d.len(), 3);
/// ```
#[macro_export]
macro_rules! dict {
    () => { $crate::pdf::object::Dict::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut d = $crate::pdf::object::Dict::new();
        $(
            d.insert(
                $crate::pdf::object::Name::new($key),
                ::core::convert::Into::<$crate::pdf::object::Object>::into($value),
            );
        )+
        d
    }};
}
