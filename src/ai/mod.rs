pub mod commit_message;
pub mod invoker;
pub mod normalize;
pub mod prompt;
pub mod reply;
pub mod schema;

pub use invoker::{ModelInvoker, OpenAiInvoker, tool_definition};
pub use prompt::{CommitPrompt, RenderedPrompt};
pub use schema::SchemaContract;
