mod agent;
pub use agent::PageAgent;

pub mod capture;
pub use capture::{CaptureShim, Fetch, FetchRequest, FetchResponse, PageContext};

mod dom;
pub use dom::{Dom, NodeId};

mod driver;
pub use driver::{Driver, DriverConfig, LoopState, Step, CLICKED_MARKER};

mod events;
pub use events::EventBus;

mod locate;
pub use locate::{Locator, Locators, Strategy};

pub mod api {
    pub use murmur_api::*;
}
