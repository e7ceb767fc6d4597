pub mod automation;
pub mod catalog;
pub mod devtools;
pub mod error;
pub mod manager;
pub mod sentinel;

pub use automation::{AutomationClient, AutomationConfig};
pub use catalog::{BrowserInfo, DetectedBrowser, detect_browsers, resolve_browser};
pub use error::{Error, Result};
pub use manager::BrowserManager;
pub use sentinel::{PageMessage, PageReceiver, PageSender};
