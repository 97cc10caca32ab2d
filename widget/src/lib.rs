//! Storefront concierge widget core.
//!
//! Everything the chat widget does apart from drawing pixels: page scraping
//! through [`page::PageContentProvider`], the visitor profile, prompt
//! assembly, reply parsing, product cards, speech and camera sequencing, and
//! the [`controller::ChatController`] tying them to a [`view::ChatView`] and a
//! [`transport::ChatTransport`].

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod page;
pub mod products;
pub mod profile;
pub mod prompt;
pub mod reply;
pub mod reservation;
pub mod session;
pub mod speech;
pub mod storage;
pub mod theme;
pub mod transport;
pub mod view;

pub use config::{BusinessHours, WidgetSettings};
pub use controller::{ChatController, QuickAction};
pub use error::{Result, WidgetError};
pub use page::{PageContentProvider, PageContext, StaticPage};
pub use products::{ProductCardData, ProductRegistry};
pub use profile::{ProfileDelta, ProfileStore, UserProfile};
pub use reply::{parse_reply, ParsedReply};
pub use session::SessionState;
pub use transport::{ChatTransport, HttpTransport};
pub use view::{ChatMessage, ChatView, MessageRole};
