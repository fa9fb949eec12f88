//! Engine-neutral object type classification.
//!
//! Each backend translates the native type description of an object into a
//! [`TypeShape`] (walking subtypes and element types as its interface
//! requires) and hands the shape to [`classify`]. Engine-specific deviations
//! are not branches in this algorithm: they live in per-backend
//! [`EngineQuirk`] tables consulted by [`classify_with_quirks`] first.

use crate::handle::ObjectType;

/// The discrete kind at the bottom of a type walk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ScalarKind {
    /// A single 4-state (or 2-state) logic bit.
    Logic,
    /// An integer.
    Integer,
    /// A floating-point value.
    Real,
    /// A non-logic enumeration.
    Enum,
    /// A single character (arrays of these are strings).
    Char,
    /// A native string.
    String,
}

/// Structural description of an object's type, as far as classification cares.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeShape {
    /// A design unit instance or named scope.
    Scope,
    /// A generate-loop array.
    GenerateArray,
    /// A record or struct.
    Record,
    /// A scalar value.
    Scalar(ScalarKind),
    /// An array of the given element shape.
    Array(Box<TypeShape>),
    /// A subtype or alias to be walked to its base.
    Derived(Box<TypeShape>),
    /// A parameter fixed at elaboration.
    Parameter,
    /// A shape the backend could not describe.
    Opaque,
}

impl TypeShape {
    /// Shorthand for an array of `element`.
    pub fn array_of(element: TypeShape) -> Self {
        TypeShape::Array(Box::new(element))
    }

    /// Strips `Derived` wrappers down to the base shape.
    pub fn base(&self) -> &TypeShape {
        let mut shape = self;
        while let TypeShape::Derived(inner) = shape {
            shape = inner;
        }
        shape
    }
}

/// Assigns an [`ObjectType`] to a shape.
///
/// Subtypes are walked to their base. A one-dimensional array whose base
/// element is a logic bit is a `LogicArray`; an array of characters is a
/// `String`; any other array (including arrays of logic vectors) is an
/// `Array`.
pub fn classify(shape: &TypeShape) -> ObjectType {
    match shape.base() {
        TypeShape::Scope => ObjectType::Module,
        TypeShape::GenerateArray => ObjectType::GenArray,
        TypeShape::Record => ObjectType::Structure,
        TypeShape::Parameter => ObjectType::Parameter,
        TypeShape::Opaque => ObjectType::Unknown,
        TypeShape::Scalar(kind) => match kind {
            ScalarKind::Logic => ObjectType::Logic,
            ScalarKind::Integer => ObjectType::Integer,
            ScalarKind::Real => ObjectType::Real,
            ScalarKind::Enum => ObjectType::Enum,
            ScalarKind::Char | ScalarKind::String => ObjectType::String,
        },
        TypeShape::Array(element) => match element.base() {
            TypeShape::Scalar(ScalarKind::Logic) => ObjectType::LogicArray,
            TypeShape::Scalar(ScalarKind::Char) => ObjectType::String,
            _ => ObjectType::Array,
        },
        // `base()` never returns a `Derived`.
        TypeShape::Derived(_) => ObjectType::Unknown,
    }
}

/// One engine-specific classification override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineQuirk<K: 'static> {
    /// Case-insensitive prefix of the engine's product name.
    pub product: &'static str,
    /// The backend-native kind the override applies to.
    pub native: K,
    /// The type to report instead of the algorithmic result.
    pub object_type: ObjectType,
}

/// Finds the override for `native` on `product`, if the table has one.
pub fn lookup_quirk<K: PartialEq<Q>, Q: ?Sized>(
    table: &[EngineQuirk<K>],
    product: &str,
    native: &Q,
) -> Option<ObjectType> {
    let product = product.to_ascii_lowercase();
    table
        .iter()
        .find(|q| q.native.eq(native) && product.starts_with(&q.product.to_ascii_lowercase()))
        .map(|q| q.object_type)
}

/// Classifies `shape`, letting a matching quirk take precedence.
pub fn classify_with_quirks<K: PartialEq<Q>, Q: ?Sized>(
    table: &[EngineQuirk<K>],
    product: &str,
    native: &Q,
    shape: &TypeShape,
) -> ObjectType {
    lookup_quirk(table, product, native).unwrap_or_else(|| classify(shape))
}
