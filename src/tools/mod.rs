//! Tool trait, argument access, and the tool registry.

pub mod arguments;
pub mod registry;
pub mod tool;

pub use arguments::ToolArguments;
pub use registry::ToolRegistry;
pub use tool::{FunctionTool, Tool, ToolExecutionContext};
