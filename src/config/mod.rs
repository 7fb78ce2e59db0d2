pub mod schema;

pub use schema::{BrowserConfig, Config, ExecutionConfig, GatewayConfig, ModelRole};
