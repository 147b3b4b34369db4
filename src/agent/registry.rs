//! Tool registry: names to handlers and descriptors.

use super::schema::{describe, ToolDescriptor, ToolSpec};
use super::table::{Table, ToolOutput};
use crate::error::{F1Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A tool that fetches data on its own.
#[async_trait]
pub trait DataTool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn fetch(&self, args: Map<String, Value>) -> Result<ToolOutput>;
}

/// What an analysis tool gets to work with.
pub struct AnalysisContext<'a> {
    /// The most recently fetched dataset.
    pub data: &'a Table,
    /// Where chart artifacts for this question go, if charts are enabled.
    pub chart_dir: Option<&'a Path>,
}

/// A tool that operates on the conversation's current dataset.
#[async_trait]
pub trait AnalysisTool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn analyze(
        &self,
        args: Map<String, Value>,
        ctx: AnalysisContext<'_>,
    ) -> Result<ToolOutput>;
}

/// The closed set of handler kinds a tool name can resolve to.
#[derive(Clone)]
pub enum Handler {
    Fetch(Arc<dyn DataTool>),
    Analysis(Arc<dyn AnalysisTool>),
}

impl Handler {
    pub fn spec(&self) -> ToolSpec {
        match self {
            Handler::Fetch(tool) => tool.spec(),
            Handler::Analysis(tool) => tool.spec(),
        }
    }

    pub fn is_analysis(&self) -> bool {
        matches!(self, Handler::Analysis(_))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Fetch(_) => write!(f, "Fetch({})", self.spec().name),
            Handler::Analysis(_) => write!(f, "Analysis({})", self.spec().name),
        }
    }
}

/// A tool call resolved against the registry, arguments decoded and
/// completed with defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

struct Entry {
    handler: Handler,
    spec: ToolSpec,
    descriptor: ToolDescriptor,
}

/// Immutable mapping from tool name to handler and descriptor.
pub struct ToolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build the registry, deriving every descriptor up front.
    ///
    /// Fails on the first unsupported parameter type or duplicate name.
    pub fn new(handlers: Vec<Handler>) -> Result<Self> {
        let mut entries = Vec::with_capacity(handlers.len());
        let mut index = HashMap::new();

        for handler in handlers {
            let spec = handler.spec();
            let descriptor = describe(&spec)?;
            if index.insert(spec.name.clone(), entries.len()).is_some() {
                return Err(F1Error::DuplicateTool(spec.name));
            }
            entries.push(Entry {
                handler,
                spec,
                descriptor,
            });
        }

        Ok(Self { entries, index })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.entry(name).map(|e| &e.descriptor)
    }

    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.entry(name).map(|e| &e.handler)
    }

    /// Names of tools that operate on the current dataset.
    pub fn analysis_tools(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.handler.is_analysis())
            .map(|e| e.spec.name.as_str())
            .collect()
    }

    /// Resolve a requested call: the name must be registered and the
    /// arguments must decode to a JSON object.
    pub fn resolve(&self, name: &str, arguments: &str) -> Result<PendingToolCall> {
        let entry = self
            .entry(name)
            .ok_or_else(|| F1Error::UnknownTool(name.to_string()))?;

        let mut args = decode_arguments(name, arguments)?;
        entry.spec.complete_arguments(&mut args)?;

        Ok(PendingToolCall {
            name: name.to_string(),
            arguments: args,
        })
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }
}

/// Decode the argument text of a tool call. Blank text means no arguments.
pub fn decode_arguments(tool: &str, arguments: &str) -> Result<Map<String, Value>> {
    if arguments.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: Value = serde_json::from_str(arguments).map_err(|e| F1Error::InvalidArguments {
        tool: tool.to_string(),
        message: format!("arguments are not valid JSON: {}", e),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(F1Error::InvalidArguments {
            tool: tool.to_string(),
            message: format!("expected a JSON object, got {}", other),
        }),
    }
}

/// Deserialize completed arguments into a tool's typed argument struct.
pub fn typed_arguments<T: DeserializeOwned>(tool: &str, args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args)).map_err(|e| F1Error::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::schema::TypeHint;
    use serde_json::json;

    struct Named(&'static str);

    #[async_trait]
    impl DataTool for Named {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new(self.0).param::<i64>("season", "").optional("round", "", 0_i64)
        }

        async fn fetch(&self, _args: Map<String, Value>) -> Result<ToolOutput> {
            Ok(ToolOutput::Text(self.0.to_string()))
        }
    }

    struct Broken;

    #[async_trait]
    impl DataTool for Broken {
        fn spec(&self) -> ToolSpec {
            let hint = TypeHint::Map(Box::new(TypeHint::Str));
            ToolSpec::new("broken").param_hint("filters", hint, None)
        }

        async fn fetch(&self, _args: Map<String, Value>) -> Result<ToolOutput> {
            Ok(ToolOutput::Text(String::new()))
        }
    }

    #[test]
    fn test_registry_rejects_unsupported_type() {
        let result = ToolRegistry::new(vec![
            Handler::Fetch(Arc::new(Named("a"))),
            Handler::Fetch(Arc::new(Broken)),
        ]);
        match result {
            Err(err) => assert!(err.is_configuration()),
            Ok(_) => panic!("Expected configuration error"),
        }
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = ToolRegistry::new(vec![
            Handler::Fetch(Arc::new(Named("a"))),
            Handler::Fetch(Arc::new(Named("a"))),
        ]);
        assert!(matches!(result, Err(F1Error::DuplicateTool(name)) if name == "a"));
    }

    #[test]
    fn test_resolve() {
        let registry = ToolRegistry::new(vec![
            Handler::Fetch(Arc::new(Named("first"))),
            Handler::Fetch(Arc::new(Named("second"))),
        ])
        .unwrap();

        let names: Vec<String> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["first", "second"]);

        let call = registry.resolve("second", r#"{"season": 2022}"#).unwrap();
        assert_eq!(call.arguments["season"], json!(2022));
        assert_eq!(call.arguments["round"], json!(0));

        assert!(matches!(
            registry.resolve("third", "{}"),
            Err(F1Error::UnknownTool(name)) if name == "third"
        ));
        assert!(matches!(
            registry.resolve("first", "[1, 2]"),
            Err(F1Error::InvalidArguments { .. })
        ));
        assert!(matches!(
            registry.resolve("first", "not json"),
            Err(F1Error::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_decode_blank_arguments() {
        assert!(decode_arguments("t", "").unwrap().is_empty());
        assert!(decode_arguments("t", "null").unwrap().is_empty());
    }
}
