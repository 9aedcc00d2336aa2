pub mod command;
pub mod normalize;
pub mod openai;
pub mod prompt;
pub mod provider;
pub mod relay;
pub mod store;

pub use normalize::format_keywords;
pub use relay::{ChatRelay, InboundHandler};
pub use store::ChatStore;
