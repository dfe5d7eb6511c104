use std::collections::HashMap;
use std::sync::Arc;

use solstice_model::ToolDefinition;

use crate::tool::{Tool, ToolObject, ToolObjectImpl};

/// An explicitly constructed lookup table of tools, owned by the caller
/// and injected into the loop at run start.
///
/// The registry is read-only once built, so it is safe to share between
/// concurrent loop runs behind an [`Arc`].
#[derive(Default)]
pub struct Registry {
    tools: HashMap<String, Arc<dyn ToolObject>>,
}

impl Registry {
    /// Registers a tool under its own name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        self.tools.insert(name, Arc::new(ToolObjectImpl(tool)));
    }

    /// Returns the definitions of all registered tools.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<_> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect();
        // Stable ordering keeps the instruction prompt deterministic.
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Returns whether the registry has no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn ToolObject>> {
        self.tools.get(name).map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{Outcome, ToolResult};

    static EMPTY_SCHEMA: &Value = &Value::Null;

    struct TestTool;

    impl Tool for TestTool {
        type Input = serde_json::Value;

        fn name(&self) -> &str {
            "test_tool"
        }

        fn description(&self) -> &str {
            "A test tool"
        }

        fn parameter_schema(&self) -> &Value {
            EMPTY_SCHEMA
        }

        fn execute(
            &self,
            _input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(Outcome::new("success")))
        }
    }

    #[tokio::test]
    async fn test_lookup_and_execute() {
        let mut registry = Registry::default();
        registry.add_tool(TestTool);

        let tool = registry.get("test_tool").unwrap();
        let outcome = tool.execute(json!({})).await.unwrap();
        assert_eq!(outcome.for_model, "success");

        assert!(registry.get("read_tool").is_none());
    }

    #[test]
    fn test_definitions_are_sorted() {
        struct Named(&'static str);

        impl Tool for Named {
            type Input = serde_json::Value;

            fn name(&self) -> &str {
                self.0
            }

            fn description(&self) -> &str {
                ""
            }

            fn parameter_schema(&self) -> &Value {
                EMPTY_SCHEMA
            }

            fn execute(
                &self,
                _input: Self::Input,
            ) -> impl Future<Output = ToolResult> + Send + 'static {
                ready(Ok(Outcome::default()))
            }
        }

        let mut registry = Registry::default();
        registry.add_tool(Named("zeta"));
        registry.add_tool(Named("alpha"));

        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }
}
