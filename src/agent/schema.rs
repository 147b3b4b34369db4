//! Tool declarations and the descriptors derived from them.
//!
//! A tool is declared with a [`ToolSpec`]: a name, its documentation and an
//! ordered list of typed parameters. [`describe`] turns the declaration into
//! the [`ToolDescriptor`] sent to the model, rejecting any parameter whose
//! type falls outside the function-calling vocabulary.

use crate::agent::table::Table;
use crate::error::{F1Error, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Declared type of a tool parameter, as written in a tool declaration.
///
/// This is deliberately wider than what the model understands so that a
/// declaration naming an unsupported type can still be expressed and rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    Str,
    Int,
    Float,
    Bool,
    List(Box<TypeHint>),
    Map(Box<TypeHint>),
    Table,
    Any,
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Str => write!(f, "str"),
            TypeHint::Int => write!(f, "int"),
            TypeHint::Float => write!(f, "float"),
            TypeHint::Bool => write!(f, "bool"),
            TypeHint::List(inner) => write!(f, "list[{}]", inner),
            TypeHint::Map(inner) => write!(f, "dict[str, {}]", inner),
            TypeHint::Table => write!(f, "Table"),
            TypeHint::Any => write!(f, "Any"),
        }
    }
}

/// Rust types that can appear as tool parameters in a declaration.
pub trait Annotated {
    fn type_hint() -> TypeHint;
}

macro_rules! annotate {
    ($hint:expr => $($ty:ty),+) => {
        $(impl Annotated for $ty {
            fn type_hint() -> TypeHint {
                $hint
            }
        })+
    };
}

annotate!(TypeHint::Str => String, &str);
annotate!(TypeHint::Int => i32, i64, u32, u64, usize);
annotate!(TypeHint::Float => f32, f64);
annotate!(TypeHint::Bool => bool);
annotate!(TypeHint::Any => Value);
annotate!(TypeHint::Table => Table);

impl<T: Annotated> Annotated for Vec<T> {
    fn type_hint() -> TypeHint {
        TypeHint::List(Box::new(T::type_hint()))
    }
}

impl<V: Annotated> Annotated for HashMap<String, V> {
    fn type_hint() -> TypeHint {
        TypeHint::Map(Box::new(V::type_hint()))
    }
}

impl<V: Annotated> Annotated for BTreeMap<String, V> {
    fn type_hint() -> TypeHint {
        TypeHint::Map(Box::new(V::type_hint()))
    }
}

/// Scalar member of the function-calling type vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ScalarType {
    fn from_hint(hint: &TypeHint) -> Option<Self> {
        match hint {
            TypeHint::Str => Some(ScalarType::String),
            TypeHint::Int => Some(ScalarType::Integer),
            TypeHint::Float => Some(ScalarType::Number),
            TypeHint::Bool => Some(ScalarType::Boolean),
            _ => None,
        }
    }
}

/// A parameter type the model can be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Scalar(ScalarType),
    Array(ScalarType),
}

impl ParamType {
    /// Map a declared hint onto the vocabulary, if it fits.
    pub fn from_hint(hint: &TypeHint) -> Option<Self> {
        match hint {
            TypeHint::List(inner) => ScalarType::from_hint(inner).map(ParamType::Array),
            other => ScalarType::from_hint(other).map(ParamType::Scalar),
        }
    }

    /// JSON-schema fragment for this type.
    pub fn to_schema(self) -> Value {
        match self {
            ParamType::Scalar(ty) => json!({ "type": ty }),
            ParamType::Array(ty) => json!({ "type": "array", "items": { "type": ty } }),
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub hint: TypeHint,
    pub description: Option<String>,
    /// Value used when the model omits the argument. `None` means required.
    pub default: Option<Value>,
}

/// Declarative registration of a tool: pairs with a handler in the registry.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub doc: Option<String>,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    /// Start a declaration for the named tool.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: None,
            params: Vec::new(),
        }
    }

    /// Attach documentation, used as the descriptor description.
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// Declare a required parameter of type `T`.
    pub fn param<T: Annotated>(self, name: &str, description: &str) -> Self {
        self.push(name, T::type_hint(), description, None)
    }

    /// Declare an optional parameter of type `T` with its default.
    pub fn optional<T: Annotated + Serialize>(
        self,
        name: &str,
        description: &str,
        default: T,
    ) -> Self {
        let default = serde_json::to_value(default).unwrap_or(Value::Null);
        self.push(name, T::type_hint(), description, Some(default))
    }

    /// Declare a parameter from an explicit hint.
    pub fn param_hint(self, name: &str, hint: TypeHint, default: Option<Value>) -> Self {
        self.push(name, hint, "", default)
    }

    fn push(
        mut self,
        name: &str,
        hint: TypeHint,
        description: &str,
        default: Option<Value>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            hint,
            description: (!description.is_empty()).then(|| description.to_string()),
            default,
        });
        self
    }

    /// Fill omitted arguments with their declared defaults and check that
    /// every required argument is present.
    pub fn complete_arguments(&self, args: &mut Map<String, Value>) -> Result<()> {
        for param in &self.params {
            if args.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    args.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(F1Error::InvalidArguments {
                        tool: self.name.clone(),
                        message: format!("missing required argument '{}'", param.name),
                    })
                }
            }
        }
        Ok(())
    }
}

/// A described parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub description: Option<String>,
}

/// Schema of a tool as presented to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamDescriptor>,
}

impl ToolDescriptor {
    /// Names of required parameters, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParamDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The descriptor as a JSON value (`name`, `description`, `parameters`).
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Derive the descriptor for a declaration.
pub fn describe(spec: &ToolSpec) -> Result<ToolDescriptor> {
    let mut parameters = Vec::with_capacity(spec.params.len());

    for param in &spec.params {
        let ty = ParamType::from_hint(&param.hint).ok_or_else(|| F1Error::UnsupportedType {
            tool: spec.name.clone(),
            param: param.name.clone(),
            hint: param.hint.to_string(),
        })?;

        parameters.push(ParamDescriptor {
            name: param.name.clone(),
            ty,
            required: param.default.is_none(),
            description: param.description.clone(),
        });
    }

    let description = match spec.doc.as_deref().map(str::trim) {
        Some(doc) if !doc.is_empty() => doc.to_string(),
        _ => spec.name.clone(),
    };

    Ok(ToolDescriptor {
        name: spec.name.clone(),
        description,
        parameters,
    })
}

impl Serialize for ToolDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("description", &self.description)?;
        map.serialize_entry("parameters", &ParametersSchema(&self.parameters))?;
        map.end()
    }
}

/// Object schema with properties kept in declaration order.
struct ParametersSchema<'a>(&'a [ParamDescriptor]);

impl Serialize for ParametersSchema<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &Properties(self.0))?;
        map.serialize_entry("required", &Required(self.0))?;
        map.end()
    }
}

struct Properties<'a>(&'a [ParamDescriptor]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for param in self.0 {
            let mut schema = param.ty.to_schema();
            if let (Some(desc), Some(obj)) = (&param.description, schema.as_object_mut()) {
                obj.insert("description".to_string(), Value::String(desc.clone()));
            }
            map.serialize_entry(&param.name, &schema)?;
        }
        map.end()
    }
}

struct Required<'a>(&'a [ParamDescriptor]);

impl Serialize for Required<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let required: Vec<&str> = self
            .0
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        let mut seq = serializer.serialize_seq(Some(required.len()))?;
        for name in required {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race_spec() -> ToolSpec {
        ToolSpec::new("get_race_result")
            .doc("Get the results of a specific race.")
            .param::<i64>("season", "the year")
            .optional("round", "the round", 0_i64)
    }

    #[test]
    fn test_scalar_and_array_mapping() {
        let spec = ToolSpec::new("everything")
            .param::<String>("s", "")
            .param::<i64>("i", "")
            .param::<f64>("n", "")
            .param::<bool>("b", "")
            .param::<Vec<String>>("ls", "")
            .param::<Vec<i32>>("li", "")
            .param::<Vec<f32>>("ln", "")
            .param::<Vec<bool>>("lb", "");
        let descriptor = describe(&spec).unwrap();

        let types: Vec<ParamType> = descriptor.parameters.iter().map(|p| p.ty).collect();
        assert_eq!(
            types,
            vec![
                ParamType::Scalar(ScalarType::String),
                ParamType::Scalar(ScalarType::Integer),
                ParamType::Scalar(ScalarType::Number),
                ParamType::Scalar(ScalarType::Boolean),
                ParamType::Array(ScalarType::String),
                ParamType::Array(ScalarType::Integer),
                ParamType::Array(ScalarType::Number),
                ParamType::Array(ScalarType::Boolean),
            ]
        );

        assert_eq!(
            ParamType::Array(ScalarType::Integer).to_schema(),
            json!({"type": "array", "items": {"type": "integer"}})
        );
    }

    #[test]
    fn test_unsupported_types_rejected() {
        let cases = vec![
            TypeHint::Any,
            TypeHint::Table,
            TypeHint::Map(Box::new(TypeHint::Int)),
            TypeHint::List(Box::new(TypeHint::List(Box::new(TypeHint::Int)))),
            TypeHint::List(Box::new(TypeHint::Any)),
        ];

        for hint in cases {
            let spec = ToolSpec::new("bad")
                .param::<i64>("ok", "")
                .param_hint("broken", hint.clone(), None);
            match describe(&spec) {
                Err(F1Error::UnsupportedType { tool, param, hint: shown }) => {
                    assert_eq!(tool, "bad");
                    assert_eq!(param, "broken");
                    assert_eq!(shown, hint.to_string());
                }
                other => panic!("Expected UnsupportedType for {}, got {:?}", hint, other),
            }
        }

        let spec = ToolSpec::new("map").param::<HashMap<String, i64>>("m", "");
        let err = describe(&spec).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_required_follows_defaults() {
        let spec = ToolSpec::new("get_driver_information")
            .param::<Vec<String>>("cols", "")
            .optional("season", "", 0_i64)
            .param::<String>("driver", "")
            .optional("round", "", 0_i64);
        let descriptor = describe(&spec).unwrap();

        assert_eq!(descriptor.required(), vec!["cols", "driver"]);
        assert!(!descriptor.parameter("season").unwrap().required);
        assert!(descriptor.parameter("cols").unwrap().required);
    }

    #[test]
    fn test_description_falls_back_to_name() {
        let descriptor = describe(&ToolSpec::new("undocumented")).unwrap();
        assert_eq!(descriptor.description, "undocumented");

        let descriptor = describe(&ToolSpec::new("blank").doc("   ")).unwrap();
        assert_eq!(descriptor.description, "blank");

        let descriptor = describe(&race_spec()).unwrap();
        assert_eq!(descriptor.description, "Get the results of a specific race.");
    }

    #[test]
    fn test_descriptor_json_keeps_declaration_order() {
        let descriptor = describe(&race_spec()).unwrap();
        let text = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(serde_json::to_string(&descriptor.to_json()).unwrap(), text);

        assert_eq!(
            text,
            concat!(
                r#"{"name":"get_race_result","description":"Get the results of a specific race.","#,
                r#""parameters":{"type":"object","properties":{"#,
                r#""season":{"type":"integer","description":"the year"},"#,
                r#""round":{"type":"integer","description":"the round"}},"#,
                r#""required":["season"]}}"#,
            )
        );
    }

    #[test]
    fn test_complete_arguments() {
        let spec = race_spec();

        let mut args = Map::new();
        args.insert("season".to_string(), json!(2022));
        spec.complete_arguments(&mut args).unwrap();
        assert_eq!(args["round"], json!(0));

        let mut missing = Map::new();
        missing.insert("round".to_string(), json!(3));
        let err = spec.complete_arguments(&mut missing).unwrap_err();
        assert!(matches!(err, F1Error::InvalidArguments { .. }));
    }
}
