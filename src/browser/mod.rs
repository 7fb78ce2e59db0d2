//! Browser collaborator: a WebDriver seam plus the tab-owning context.

pub mod context;
pub mod driver;

pub use context::{BrowserContext, PageState};
pub use driver::{FantocciniDriver, WebDriver};
