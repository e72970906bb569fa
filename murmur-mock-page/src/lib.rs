//! Stand-ins for the observed service and its pages, for tests and offline replays

mod dom;
pub use dom::{DomEvent, MockDom};

mod page;
pub use page::MockPage;

mod scripted;
pub use scripted::{BeginScript, ScriptedPage};

mod selector;

mod site;
pub use site::{MockSite, SiteComment};
