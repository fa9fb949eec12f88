//! TOML design descriptions.
//!
//! A description names the top instance and lists the rest of the design
//! as flat tables, each entry pointing at its enclosing scope by full name:
//!
//! ```toml
//! [design]
//! top = "top"
//! language = "verilog"
//! precision = -12
//!
//! [[instances]]
//! scope = "top"
//! name = "u_filter"
//! language = "vhdl"
//! definition = "filter"
//!
//! [[signals]]
//! scope = "top"
//! name = "bus"
//! type = { kind = "vector", left = 7, right = 0 }
//! storage = "var"
//! init = "00000000"
//!
//! [[stimulus]]
//! time = 10
//! signal = "top.bus"
//! value = "10100101"
//! ```

use std::path::Path;

use gpi_common::TimePrecision;
use serde::Deserialize;

use crate::design::{DataType, Design, DesignBuilder, Language, Storage};
use crate::engine::SimEngine;
use crate::error::SimError;

/// Top-level description of a design and its scripted stimulus.
#[derive(Debug, Deserialize)]
pub struct DesignDescription {
    /// The top instance and tool identity.
    pub design: TopSection,
    /// Instances below the top.
    #[serde(default)]
    pub instances: Vec<InstanceSpec>,
    /// Generate loops.
    #[serde(default)]
    pub generates: Vec<GenerateSpec>,
    /// Signals, variables, ports and constants.
    #[serde(default)]
    pub signals: Vec<SignalSpec>,
    /// Process statements.
    #[serde(default)]
    pub processes: Vec<ProcessSpec>,
    /// Continuous assignments.
    #[serde(default)]
    pub assigns: Vec<AssignSpec>,
    /// Value changes scheduled before the run.
    #[serde(default)]
    pub stimulus: Vec<StimulusSpec>,
}

/// The `[design]` table.
#[derive(Debug, Deserialize)]
pub struct TopSection {
    /// Name of the top instance.
    pub top: String,
    /// Language of the top instance.
    pub language: Language,
    /// Module or entity of the top instance; defaults to its name.
    pub definition: Option<String>,
    /// Source file of the top definition.
    #[serde(default)]
    pub file: String,
    /// Tick unit as a power of ten of seconds.
    pub precision: Option<i32>,
    /// Product name to report.
    pub product: Option<String>,
    /// Version string to report.
    pub version: Option<String>,
}

/// One `[[instances]]` entry.
#[derive(Debug, Deserialize)]
pub struct InstanceSpec {
    /// Full name of the enclosing scope.
    pub scope: String,
    /// Instance name.
    pub name: String,
    /// Defaults to the enclosing scope's language.
    pub language: Option<Language>,
    /// Module or entity; defaults to the instance name.
    pub definition: Option<String>,
    /// Source file of the definition.
    #[serde(default)]
    pub file: String,
}

/// One `[[generates]]` entry: scopes `label[left]` .. `label[right]`.
#[derive(Debug, Deserialize)]
pub struct GenerateSpec {
    /// Full name of the enclosing scope.
    pub scope: String,
    /// Loop label.
    pub label: String,
    /// First index.
    pub left: i64,
    /// Last index.
    pub right: i64,
}

/// One `[[signals]]` entry.
#[derive(Debug, Deserialize)]
pub struct SignalSpec {
    /// Full name of the enclosing scope.
    pub scope: String,
    /// Signal name.
    pub name: String,
    /// Data type; a single logic bit when omitted.
    #[serde(rename = "type", default)]
    pub ty: TypeSpec,
    /// Declaration class; a net when omitted.
    #[serde(default = "default_storage")]
    pub storage: Storage,
    /// Starting value in the signal's textual form.
    pub init: Option<String>,
}

fn default_storage() -> Storage {
    Storage::Net
}

/// A data type as written in a description.
#[derive(Debug, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeSpec {
    /// One logic bit.
    #[default]
    Logic,
    /// A logic vector.
    Vector {
        /// Left bound.
        left: i64,
        /// Right bound.
        right: i64,
    },
    /// An integer.
    Integer,
    /// A real.
    Real,
    /// A string.
    String,
    /// An enumeration.
    Enum {
        /// Type name.
        name: String,
        /// Literals in position order.
        literals: Vec<String>,
    },
    /// An unpacked array.
    Array {
        /// Left bound.
        left: i64,
        /// Right bound.
        right: i64,
        /// Element type.
        element: Box<TypeSpec>,
    },
    /// A record.
    Record {
        /// Type name.
        name: String,
        /// Fields in declaration order.
        fields: Vec<FieldSpec>,
    },
}

/// One record field.
#[derive(Debug, Deserialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub ty: TypeSpec,
}

impl TypeSpec {
    fn to_data_type(&self) -> DataType {
        match self {
            TypeSpec::Logic => DataType::Logic,
            TypeSpec::Vector { left, right } => DataType::vector(*left, *right),
            TypeSpec::Integer => DataType::Integer,
            TypeSpec::Real => DataType::Real,
            TypeSpec::String => DataType::Str,
            TypeSpec::Enum { name, literals } => DataType::Enum {
                name: name.clone(),
                literals: literals.clone(),
            },
            TypeSpec::Array { left, right, element } => DataType::array(*left, *right, element.to_data_type()),
            TypeSpec::Record { name, fields } => DataType::Record {
                name: name.clone(),
                fields: fields.iter().map(|f| (f.name.clone(), f.ty.to_data_type())).collect(),
            },
        }
    }
}

/// One `[[processes]]` entry.
#[derive(Debug, Deserialize)]
pub struct ProcessSpec {
    /// Full name of the enclosing scope.
    pub scope: String,
    /// Process label.
    pub name: String,
}

/// One `[[assigns]]` entry: `target = source`.
#[derive(Debug, Deserialize)]
pub struct AssignSpec {
    /// Full name of the enclosing scope.
    pub scope: String,
    /// Full name of the driven signal.
    pub target: String,
    /// Full name of the driving signal.
    pub source: String,
}

/// One `[[stimulus]]` entry.
#[derive(Debug, Deserialize)]
pub struct StimulusSpec {
    /// Tick at which the value lands.
    pub time: u64,
    /// Full name of the signal.
    pub signal: String,
    /// The value in the signal's textual form.
    pub value: String,
}

/// A scope-creating entry waiting for its enclosing scope.
enum ScopeEntry<'a> {
    Instance(&'a InstanceSpec),
    Generate(&'a GenerateSpec),
}

impl ScopeEntry<'_> {
    fn scope(&self) -> &str {
        match self {
            ScopeEntry::Instance(spec) => &spec.scope,
            ScopeEntry::Generate(spec) => &spec.scope,
        }
    }
}

/// Loads a description from a TOML file.
pub fn load(path: &Path) -> Result<DesignDescription, SimError> {
    let content = std::fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_str(&content)
}

/// Parses a description from TOML text.
pub fn from_str(content: &str) -> Result<DesignDescription, SimError> {
    Ok(toml::from_str(content)?)
}

impl DesignDescription {
    /// Elaborates the described design.
    pub fn build(&self) -> Result<Design, SimError> {
        let top = &self.design;
        let mut builder = DesignBuilder::new(top.language, &top.top);
        builder.root_definition(top.definition.as_deref().unwrap_or(&top.top), &top.file);
        if let Some(exponent) = top.precision {
            let precision = TimePrecision::from_exponent(exponent).ok_or_else(|| {
                SimError::InvalidDescription(format!("unsupported precision exponent {exponent}"))
            })?;
            builder.precision(precision);
        }
        if let Some(product) = &top.product {
            builder.product(product, top.version.as_deref().unwrap_or("unknown"));
        }
        self.place_scopes(&mut builder)?;

        let scope_of = |builder: &DesignBuilder, name: &str| {
            builder
                .lookup(name)
                .ok_or_else(|| SimError::UnknownObject(name.to_string()))
        };
        for signal in &self.signals {
            let scope = scope_of(&builder, &signal.scope)?;
            let id = builder.signal(scope, &signal.name, signal.ty.to_data_type(), signal.storage)?;
            if let Some(init) = &signal.init {
                builder.initial(id, init)?;
            }
        }
        for process in &self.processes {
            let scope = scope_of(&builder, &process.scope)?;
            builder.process(scope, &process.name)?;
        }
        for assign in &self.assigns {
            let scope = scope_of(&builder, &assign.scope)?;
            let target = scope_of(&builder, &assign.target)?;
            let source = scope_of(&builder, &assign.source)?;
            builder.assign(scope, target, source)?;
        }
        let design = builder.build();
        log::debug!(target: "gpi_sim", "elaborated '{}' with {} objects", top.top, design.len());
        Ok(design)
    }

    /// Elaborates the design and schedules its stimulus on a new engine.
    pub fn into_engine(self) -> Result<SimEngine, SimError> {
        let engine = SimEngine::new(self.build()?);
        for stimulus in &self.stimulus {
            engine.schedule_stimulus(stimulus.time, &stimulus.signal, &stimulus.value)?;
        }
        Ok(engine)
    }

    /// Places instances and generate scopes, in as many passes as nesting
    /// requires.
    fn place_scopes(&self, builder: &mut DesignBuilder) -> Result<(), SimError> {
        let mut waiting: Vec<ScopeEntry<'_>> = self
            .instances
            .iter()
            .map(ScopeEntry::Instance)
            .chain(self.generates.iter().map(ScopeEntry::Generate))
            .collect();
        while !waiting.is_empty() {
            let before = waiting.len();
            let mut deferred = Vec::new();
            for entry in waiting {
                let Some(scope) = builder.lookup(entry.scope()) else {
                    deferred.push(entry);
                    continue;
                };
                match entry {
                    ScopeEntry::Instance(spec) => {
                        let language = match spec.language {
                            Some(language) => language,
                            None => builder.language_of(scope)?,
                        };
                        let definition = spec.definition.as_deref().unwrap_or(&spec.name);
                        builder.instance(scope, language, &spec.name, definition, &spec.file)?;
                    }
                    ScopeEntry::Generate(spec) => {
                        builder.generate(scope, &spec.label, spec.left, spec.right)?;
                    }
                }
            }
            if deferred.len() == before {
                return Err(SimError::UnknownObject(deferred[0].scope().to_string()));
            }
            waiting = deferred;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MIXED: &str = r#"
        [design]
        top = "top"
        language = "verilog"
        precision = -9
        product = "bench"
        version = "2.1"

        [[instances]]
        scope = "top.g[1]"
        name = "u_leaf"
        language = "vhdl"
        definition = "leaf"
        file = "leaf.vhd"

        [[generates]]
        scope = "top"
        label = "g"
        left = 0
        right = 1

        [[signals]]
        scope = "top"
        name = "clk"
        init = "0"

        [[signals]]
        scope = "top"
        name = "mem"
        storage = "var"
        type = { kind = "array", left = 0, right = 3, element = { kind = "vector", left = 7, right = 0 } }

        [[signals]]
        scope = "top.g[1].u_leaf"
        name = "state"
        type = { kind = "enum", name = "state_t", literals = ["IDLE", "RUN"] }

        [[assigns]]
        scope = "top"
        target = "top.mem[0]"
        source = "top.mem[1]"

        [[stimulus]]
        time = 5
        signal = "top.clk"
        value = "1"
    "#;

    #[test]
    fn nested_scopes_resolve_in_any_order() {
        let description = from_str(MIXED).unwrap();
        let design = description.build().unwrap();
        assert_eq!(design.product(), "bench");
        assert_eq!(design.precision(), TimePrecision::NS);
        let leaf = design.lookup("top.g[1].u_leaf").unwrap();
        assert_eq!(design.object(leaf).unwrap().language(), Language::Vhdl);
        assert!(design.lookup("top.g[1].U_LEAF.STATE").is_some());
        assert!(design.lookup("top.mem[3][7]").is_some());
    }

    #[test]
    fn stimulus_is_scheduled() {
        let engine = from_str(MIXED).unwrap().into_engine().unwrap();
        assert_eq!(engine.value("top.clk").as_deref(), Some("0"));
        assert_eq!(engine.value("top.g[1].u_leaf.state").as_deref(), Some("IDLE"));
    }

    #[test]
    fn missing_scope_is_reported() {
        let text = r#"
            [design]
            top = "top"
            language = "vhdl"

            [[signals]]
            scope = "top.nowhere"
            name = "x"
        "#;
        let err = from_str(text).unwrap().build().unwrap_err();
        assert!(matches!(err, SimError::UnknownObject(name) if name == "top.nowhere"));
    }

    #[test]
    fn bad_precision_and_values() {
        let text = "[design]\ntop = \"t\"\nlanguage = \"verilog\"\nprecision = -20\n";
        assert!(matches!(from_str(text).unwrap().build(), Err(SimError::InvalidDescription(_))));
        let text = "[design]\ntop = \"t\"\nlanguage = \"verilog\"\n\n[[signals]]\nscope = \"t\"\nname = \"n\"\ntype = { kind = \"integer\" }\ninit = \"abc\"\n";
        assert!(matches!(from_str(text).unwrap().build(), Err(SimError::BadValue { .. })));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MIXED.as_bytes()).unwrap();
        let description = load(file.path()).unwrap();
        assert_eq!(description.signals.len(), 3);
        assert!(matches!(
            load(Path::new("/nonexistent/design.toml")),
            Err(SimError::Io { .. })
        ));
        assert!(matches!(from_str("[design"), Err(SimError::Toml(_))));
    }
}
