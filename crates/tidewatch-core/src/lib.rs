//! Console logic between `tidewatch-api` and the CLI.
//!
//! - **[`Console`]**: facade owning both service clients, the shared
//!   [`SessionStore`], and the [`DeviceCatalog`]. Handles login, the single
//!   token refresh, profile loading, and catalog reloads after mutations.
//!
//! - **Pagination** ([`pagination`]): [`AnchorPager`] walks a
//!   reverse-chronological feed with a timestamp cursor and discards stale
//!   responses; [`OffsetPager`] walks page/size/total listings.
//!
//! - **Live data** ([`live`]): [`LiveSubscription`] keeps one device model
//!   subscribed on the event hub across reconnects.
//!
//! - **Routes** ([`routes`]): server menu tree to route tree, role
//!   filtering, and the built-in route sets.
//!
//! - **Dialogs** ([`dialog`]): per-invocation dialog futures with
//!   exactly-once teardown, and the date-range selector.

pub mod config;
pub mod console;
pub mod decode;
pub mod dialog;
pub mod error;
pub mod live;
pub mod pagination;
pub mod routes;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConsoleConfig, Credentials, TlsVerification};
pub use console::Console;
pub use error::CoreError;
pub use live::{LinkStatus, LiveSubscription};
pub use pagination::{AnchorPager, Notice, Notifier, OffsetPager};
pub use session::{Profile, SessionFile, SessionStore};
pub use store::DeviceCatalog;
