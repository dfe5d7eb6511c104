//! A set of built-in tools that models can use.

mod markdown_file;
mod research;

pub use markdown_file::MarkdownFileTool;
pub use research::{
    ArxivSearchTool, CrossrefSearchTool, DdgInstantAnswerTool,
};
