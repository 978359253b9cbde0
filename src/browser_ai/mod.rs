mod cdp_client;
mod locator;
mod page;
pub mod scripts;
mod selectors;

pub use cdp_client::{resolve_ws_url, CdpClient, CdpPage};
pub use locator::{Locator, Pick};
pub use page::{find_page, find_page_by_url, ChatPage, ElementState, PageSource};
pub use selectors::{builtin_sets, known_versions, resolve, SelectorSet, DEFAULT_SELECTOR_VERSION};
