//! The elaborated design database the engine runs.
//!
//! A [`Design`] is a tree of [`DesignObject`]s stored in an append-only
//! arena: instances of either language, generate scopes, signals (with one
//! child per array element, record field and vector bit), processes and
//! continuous assignments. It is built once through [`DesignBuilder`] and
//! never changes shape afterwards; only signal values move.

use std::collections::HashMap;
use std::fmt;

use gpi::arena::{Arena, ArenaId};
use gpi_common::TimePrecision;
use serde::Deserialize;

use crate::error::SimError;
use crate::value::SimValue;

/// Opaque ID of an object in a [`Design`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ArenaId for ObjectId {
    fn from_raw(index: u32) -> Self {
        ObjectId(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// Source language of an object, which decides the interface that sees it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Visible through VPI.
    Verilog,
    /// Visible through VHPI.
    Vhdl,
}

impl Language {
    /// Formats the name of element `index` of `base` in this language.
    pub fn index_name(self, base: &str, index: i64) -> String {
        match self {
            Language::Verilog => format!("{base}[{index}]"),
            Language::Vhdl => format!("{base}({index})"),
        }
    }
}

/// The data type of a signal.
#[derive(Clone, PartialEq, Debug)]
pub enum DataType {
    /// One 4-state bit (`logic` / `std_logic`).
    Logic,
    /// A packed logic vector.
    LogicVector {
        /// Left bound.
        left: i64,
        /// Right bound.
        right: i64,
    },
    /// A 32-bit integer.
    Integer,
    /// A floating-point value.
    Real,
    /// A character string.
    Str,
    /// An enumeration.
    Enum {
        /// Type name.
        name: String,
        /// Literal names, in position order.
        literals: Vec<String>,
    },
    /// An unpacked array.
    Array {
        /// Left bound.
        left: i64,
        /// Right bound.
        right: i64,
        /// Element type.
        element: Box<DataType>,
    },
    /// A record or struct.
    Record {
        /// Type name.
        name: String,
        /// Field names and types, in declaration order.
        fields: Vec<(String, DataType)>,
    },
}

impl DataType {
    /// Shorthand for a logic vector.
    pub fn vector(left: i64, right: i64) -> Self {
        DataType::LogicVector { left, right }
    }

    /// Shorthand for an unpacked array.
    pub fn array(left: i64, right: i64, element: DataType) -> Self {
        DataType::Array {
            left,
            right,
            element: Box::new(element),
        }
    }

    /// The VHDL `BOOLEAN` enumeration.
    pub fn boolean() -> Self {
        DataType::Enum {
            name: "BOOLEAN".to_string(),
            literals: vec!["FALSE".to_string(), "TRUE".to_string()],
        }
    }

    /// Left and right bounds of a vector or array.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            DataType::LogicVector { left, right } | DataType::Array { left, right, .. } => {
                Some((*left, *right))
            }
            _ => None,
        }
    }

    /// Number of bits in a logic-valued type.
    pub fn logic_width(&self) -> Option<u32> {
        match self {
            DataType::Logic => Some(1),
            DataType::LogicVector { left, right } => Some(span(*left, *right)),
            _ => None,
        }
    }

    /// Returns `true` for types whose objects carry a value of their own.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, DataType::Array { .. } | DataType::Record { .. })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Logic => f.write_str("logic"),
            DataType::LogicVector { left, right } => write!(f, "logic[{left}:{right}]"),
            DataType::Integer => f.write_str("integer"),
            DataType::Real => f.write_str("real"),
            DataType::Str => f.write_str("string"),
            DataType::Enum { name, .. } => write!(f, "enum {name}"),
            DataType::Array { left, right, element } => write!(f, "{element}[{left}:{right}]"),
            DataType::Record { name, .. } => write!(f, "record {name}"),
        }
    }
}

/// Number of positions between two inclusive bounds.
pub(crate) fn span(left: i64, right: i64) -> u32 {
    (left.abs_diff(right) + 1) as u32
}

/// Iterates inclusive bounds from left to right.
pub(crate) fn positions(left: i64, right: i64) -> Box<dyn Iterator<Item = i64>> {
    if left <= right {
        Box::new(left..=right)
    } else {
        Box::new((right..=left).rev())
    }
}

/// How a signal is declared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// A Verilog net or VHDL signal.
    Net,
    /// A variable (`reg`, VHDL shared variable).
    Var,
    /// A port.
    Port,
    /// A Verilog parameter or VHDL constant.
    Const,
    /// A VHDL generic.
    Generic,
}

impl Storage {
    /// Returns `true` when writes are refused.
    pub fn is_const(self) -> bool {
        matches!(self, Storage::Const | Storage::Generic)
    }
}

/// What an object is.
#[derive(Clone, PartialEq, Debug)]
pub enum ObjectKind {
    /// A module or entity instance.
    Instance {
        /// Module or entity name.
        definition: String,
        /// Source file of the definition.
        file: String,
    },
    /// One iteration of a generate loop.
    GenScope {
        /// The loop label, without the index.
        label: String,
    },
    /// A value-carrying declaration, array element or record field.
    Signal {
        /// Its type.
        ty: DataType,
        /// Its declaration class (inherited by elements and fields).
        storage: Storage,
    },
    /// One bit of a logic vector. The value lives on the parent.
    BitSelect {
        /// Position in the parent's value, 0 being the least significant bit.
        offset: u32,
    },
    /// A process statement.
    Process,
    /// A continuous assignment `target = source`.
    ContAssign {
        /// The driven signal.
        target: ObjectId,
        /// The driving signal.
        source: ObjectId,
    },
}

/// One node of the design tree.
#[derive(Clone, Debug)]
pub struct DesignObject {
    name: String,
    full_name: String,
    parent: Option<ObjectId>,
    language: Language,
    kind: ObjectKind,
    index: Option<i64>,
    children: Vec<ObjectId>,
    pub(crate) value: Option<SimValue>,
}

impl DesignObject {
    /// Local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dot-separated hierarchical name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The enclosing object, `None` for the root.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Source language.
    pub fn language(&self) -> Language {
        self.language
    }

    /// What the object is.
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Position in the parent array, vector or generate loop.
    pub fn index(&self) -> Option<i64> {
        self.index
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// The signal type, for `Signal` objects.
    pub fn data_type(&self) -> Option<&DataType> {
        match &self.kind {
            ObjectKind::Signal { ty, .. } => Some(ty),
            _ => None,
        }
    }
}

/// An elaborated, immutable-shape design.
#[derive(Clone, Debug)]
pub struct Design {
    objects: Arena<ObjectId, DesignObject>,
    by_name: HashMap<String, ObjectId>,
    /// Lower-cased names of VHDL objects, which are case-insensitive.
    by_folded_name: HashMap<String, ObjectId>,
    root: ObjectId,
    precision: TimePrecision,
    product: String,
    version: String,
}

impl Design {
    /// The top-level instance.
    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Returns an object.
    pub fn object(&self, id: ObjectId) -> Option<&DesignObject> {
        self.objects.get(id)
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Option<&mut DesignObject> {
        self.objects.get_mut(id)
    }

    /// Finds an object by exact hierarchical name, falling back to a
    /// case-insensitive match for VHDL objects.
    pub fn lookup(&self, full_name: &str) -> Option<ObjectId> {
        self.by_name
            .get(full_name)
            .or_else(|| self.by_folded_name.get(&full_name.to_ascii_lowercase()))
            .copied()
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` for a design with no objects (never the case once built).
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates objects in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &DesignObject)> {
        self.objects.iter()
    }

    /// Time unit of one engine tick.
    pub fn precision(&self) -> TimePrecision {
        self.precision
    }

    /// Product name reported to the interfaces.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Version string reported to the interfaces.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the nearest `Signal` ancestor-or-self of a bit-select, with
    /// the bit offset, or the object itself with no offset.
    pub(crate) fn value_holder(&self, id: ObjectId) -> Option<(ObjectId, Option<u32>)> {
        let object = self.object(id)?;
        match object.kind {
            ObjectKind::BitSelect { offset } => Some((object.parent?, Some(offset))),
            _ => Some((id, None)),
        }
    }
}

/// Incremental construction of a [`Design`].
pub struct DesignBuilder {
    design: Design,
}

impl DesignBuilder {
    /// Starts a design whose top instance is `name`, an instance of the
    /// module or entity of the same name.
    pub fn new(language: Language, name: &str) -> Self {
        let mut objects = Arena::new();
        let root = objects.alloc(DesignObject {
            name: name.to_string(),
            full_name: name.to_string(),
            parent: None,
            language,
            kind: ObjectKind::Instance {
                definition: name.to_string(),
                file: String::new(),
            },
            index: None,
            children: Vec::new(),
            value: None,
        });
        let mut design = Design {
            objects,
            by_name: HashMap::new(),
            by_folded_name: HashMap::new(),
            root,
            precision: TimePrecision::default(),
            product: "gpi_sim".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        index_name(&mut design, name, language, root);
        Self { design }
    }

    /// The top-level instance.
    pub fn root(&self) -> ObjectId {
        self.design.root
    }

    /// Sets the tick unit.
    pub fn precision(&mut self, precision: TimePrecision) -> &mut Self {
        self.design.precision = precision;
        self
    }

    /// Sets the product and version the engine reports.
    pub fn product(&mut self, product: &str, version: &str) -> &mut Self {
        self.design.product = product.to_string();
        self.design.version = version.to_string();
        self
    }

    /// Sets the root instance's definition and file.
    pub fn root_definition(&mut self, definition: &str, file: &str) -> &mut Self {
        let root = self.design.root;
        if let Some(object) = self.design.object_mut(root) {
            object.kind = ObjectKind::Instance {
                definition: definition.to_string(),
                file: file.to_string(),
            };
        }
        self
    }

    /// Adds an instance of `definition` under `parent`.
    pub fn instance(
        &mut self,
        parent: ObjectId,
        language: Language,
        name: &str,
        definition: &str,
        file: &str,
    ) -> Result<ObjectId, SimError> {
        let kind = ObjectKind::Instance {
            definition: definition.to_string(),
            file: file.to_string(),
        };
        self.add(parent, Some(language), name.to_string(), kind, None, None)
    }

    /// Adds a signal under `parent`, with children for each array element,
    /// record field and vector bit.
    pub fn signal(
        &mut self,
        parent: ObjectId,
        name: &str,
        ty: DataType,
        storage: Storage,
    ) -> Result<ObjectId, SimError> {
        self.add_signal(parent, name.to_string(), ty, storage, None)
    }

    /// Adds the scopes `label[i]` (`label(i)` in VHDL) for every `i` from
    /// `left` to `right` and returns them in that order.
    pub fn generate(
        &mut self,
        parent: ObjectId,
        label: &str,
        left: i64,
        right: i64,
    ) -> Result<Vec<ObjectId>, SimError> {
        let language = self.language_of(parent)?;
        positions(left, right)
            .map(|i| {
                let kind = ObjectKind::GenScope {
                    label: label.to_string(),
                };
                self.add(parent, None, language.index_name(label, i), kind, Some(i), None)
            })
            .collect()
    }

    /// Adds a process statement.
    pub fn process(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId, SimError> {
        self.add(parent, None, name.to_string(), ObjectKind::Process, None, None)
    }

    /// Adds a continuous assignment `target = source` under `parent`.
    pub fn assign(&mut self, parent: ObjectId, target: ObjectId, source: ObjectId) -> Result<ObjectId, SimError> {
        for id in [target, source] {
            let ok = self
                .design
                .object(id)
                .is_some_and(|o| matches!(o.kind, ObjectKind::Signal { .. } | ObjectKind::BitSelect { .. }));
            if !ok {
                return Err(SimError::UnknownObject(format!("signal #{}", id.as_raw())));
            }
        }
        let name = format!("assign_{}", self.design.len());
        self.add(parent, None, name, ObjectKind::ContAssign { target, source }, None, None)
    }

    /// Sets the starting value of a signal from its textual form.
    pub fn initial(&mut self, object: ObjectId, text: &str) -> Result<&mut Self, SimError> {
        let target = self
            .design
            .object_mut(object)
            .ok_or_else(|| SimError::UnknownObject(format!("#{}", object.as_raw())))?;
        let bad = || SimError::BadValue {
            name: target.full_name.clone(),
            value: text.to_string(),
        };
        let ty = match &target.kind {
            ObjectKind::Signal { ty, .. } if ty.is_scalar() => ty,
            _ => return Err(bad()),
        };
        let value = SimValue::parse(ty, text).ok_or_else(bad)?;
        target.value = Some(value);
        Ok(self)
    }

    /// Finds an object added so far.
    pub fn lookup(&self, full_name: &str) -> Option<ObjectId> {
        self.design.lookup(full_name)
    }

    /// Finishes the design.
    pub fn build(self) -> Design {
        self.design
    }

    pub(crate) fn language_of(&self, id: ObjectId) -> Result<Language, SimError> {
        self.design
            .object(id)
            .map(DesignObject::language)
            .ok_or_else(|| SimError::UnknownObject(format!("#{}", id.as_raw())))
    }

    fn add_signal(
        &mut self,
        parent: ObjectId,
        name: String,
        ty: DataType,
        storage: Storage,
        index: Option<i64>,
    ) -> Result<ObjectId, SimError> {
        let language = self.language_of(parent)?;
        let value = SimValue::initial(&ty, language, storage);
        let kind = ObjectKind::Signal {
            ty: ty.clone(),
            storage,
        };
        let id = self.add(parent, None, name.clone(), kind, index, value)?;
        match ty {
            DataType::Array { left, right, element } => {
                for i in positions(left, right) {
                    self.add_signal(id, language.index_name(&name, i), (*element).clone(), storage, Some(i))?;
                }
            }
            DataType::Record { fields, .. } => {
                for (field, field_ty) in fields {
                    self.add_signal(id, field, field_ty, storage, None)?;
                }
            }
            DataType::LogicVector { left, right } => {
                for i in positions(left, right) {
                    let offset = if left >= right { i - right } else { right - i };
                    let kind = ObjectKind::BitSelect { offset: offset as u32 };
                    self.add(id, None, language.index_name(&name, i), kind, Some(i), None)?;
                }
            }
            _ => {}
        }
        Ok(id)
    }

    fn add(
        &mut self,
        parent: ObjectId,
        language: Option<Language>,
        name: String,
        kind: ObjectKind,
        index: Option<i64>,
        value: Option<SimValue>,
    ) -> Result<ObjectId, SimError> {
        let parent_object = self
            .design
            .object(parent)
            .ok_or_else(|| SimError::UnknownObject(format!("#{}", parent.as_raw())))?;
        let language = language.unwrap_or(parent_object.language);
        // Element and bit names already carry the parent's name.
        let full_name = match (&kind, index) {
            (ObjectKind::BitSelect { .. }, _) | (ObjectKind::Signal { .. }, Some(_)) => {
                let scope = parent_object.full_name.rsplit_once('.').map_or("", |(scope, _)| scope);
                if scope.is_empty() {
                    name.clone()
                } else {
                    format!("{scope}.{name}")
                }
            }
            _ => format!("{}.{name}", parent_object.full_name),
        };
        if self.design.lookup(&full_name).is_some() {
            return Err(SimError::DuplicateObject(full_name));
        }
        let id = self.design.objects.alloc(DesignObject {
            name,
            full_name: full_name.clone(),
            parent: Some(parent),
            language,
            kind,
            index,
            children: Vec::new(),
            value,
        });
        if let Some(parent_object) = self.design.object_mut(parent) {
            parent_object.children.push(id);
        }
        index_name(&mut self.design, &full_name, language, id);
        Ok(id)
    }
}

fn index_name(design: &mut Design, full_name: &str, language: Language, id: ObjectId) {
    design.by_name.insert(full_name.to_string(), id);
    if language == Language::Vhdl {
        design.by_folded_name.insert(full_name.to_ascii_lowercase(), id);
    }
}
