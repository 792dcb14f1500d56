pub mod identity;
pub mod launcher;
pub mod session;

pub use identity::{BrowserIdentity, Region};
pub use launcher::{connect_browser, launch_browser, LaunchOptions};
pub use session::{BrowserMode, Session, SessionHint, SessionManager};
