//! Indirect object resolution
//!
//! The parser never follows references on its own. Where a value may be
//! indirect (filter names, decode parameters) it asks an [`XRefResolver`].

use super::objects::{ObjectRef, PdfObject};
use super::ParseResult;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Looks up indirect objects by reference.
pub trait XRefResolver {
    /// The object for `reference`, or `None` when it does not exist.
    fn fetch(&self, reference: ObjectRef) -> ParseResult<Option<PdfObject>>;

    /// Resolve `obj` if it is a reference; other values are returned as is.
    /// A dangling reference resolves to `Null`, as ISO 32000-1 Section 7.3.10
    /// prescribes.
    fn fetch_if_ref(&self, obj: &PdfObject) -> ParseResult<PdfObject> {
        match obj {
            PdfObject::Reference(reference) => match self.fetch(*reference)? {
                Some(resolved) => Ok(resolved),
                None => {
                    tracing::warn!("Unresolved reference {}, using null", reference);
                    Ok(PdfObject::Null)
                }
            },
            other => Ok(other.clone()),
        }
    }
}

/// Resolver for contexts without a cross-reference table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl XRefResolver for NoResolver {
    fn fetch(&self, _reference: ObjectRef) -> ParseResult<Option<PdfObject>> {
        Ok(None)
    }
}

/// In-memory table of indirect objects, ordered by reference.
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: BTreeMap<ObjectRef, PdfObject>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous object stored under the same reference.
    pub fn insert(&mut self, reference: ObjectRef, object: PdfObject) -> Option<PdfObject> {
        self.objects.insert(reference, object)
    }

    pub fn get(&self, reference: ObjectRef) -> Option<&PdfObject> {
        self.objects.get(&reference)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectRef, &PdfObject)> {
        self.objects.iter()
    }
}

impl XRefResolver for ObjectTable {
    fn fetch(&self, reference: ObjectRef) -> ParseResult<Option<PdfObject>> {
        Ok(self.objects.get(&reference).cloned())
    }
}

/// A table that is still being filled, e.g. during a sequential scan.
impl XRefResolver for RefCell<ObjectTable> {
    fn fetch(&self, reference: ObjectRef) -> ParseResult<Option<PdfObject>> {
        Ok(self.borrow().get(reference).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::objects::PdfName;

    #[test]
    fn test_no_resolver() {
        let resolved = NoResolver
            .fetch_if_ref(&PdfObject::Reference(ObjectRef::new(4, 0)))
            .unwrap();
        assert_eq!(resolved, PdfObject::Null);
        assert_eq!(
            NoResolver.fetch_if_ref(&PdfObject::Integer(4)).unwrap(),
            PdfObject::Integer(4)
        );
    }

    #[test]
    fn test_object_table() {
        let mut table = ObjectTable::new();
        let name = PdfObject::Name(PdfName::new("FlateDecode"));
        assert!(table.insert(ObjectRef::new(7, 0), name.clone()).is_none());
        table.insert(ObjectRef::new(2, 0), PdfObject::Integer(1));

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.fetch_if_ref(&PdfObject::Reference(ObjectRef::new(7, 0))).unwrap(),
            name
        );
        assert_eq!(table.get(ObjectRef::new(7, 1)), None);

        let order: Vec<u32> = table.iter().map(|(r, _)| r.num).collect();
        assert_eq!(order, vec![2, 7]);
    }

    #[test]
    fn test_shared_table() {
        let shared = RefCell::new(ObjectTable::new());
        let reference = PdfObject::Reference(ObjectRef::new(1, 0));
        assert_eq!(shared.fetch_if_ref(&reference).unwrap(), PdfObject::Null);

        shared.borrow_mut().insert(ObjectRef::new(1, 0), PdfObject::Boolean(true));
        assert_eq!(shared.fetch_if_ref(&reference).unwrap(), PdfObject::Boolean(true));
    }
}
