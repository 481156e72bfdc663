//! # tagmirror-renderer
//!
//! Tera-based renderer for the HTML directory listings served by the
//! tagmirror daemon.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tagmirror_renderer::{ListingContext, Renderer};
//!
//! fn render_root() -> Result<String, tagmirror_renderer::RenderError> {
//!     let renderer = Renderer::new()?;
//!     let ctx = ListingContext::new("/", Vec::new(), 1, &[]);
//!     renderer.render_listing(&ctx)
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{entry_href, parent_path, ListingContext, ListingEntry, RepositorySummary};
pub use engine::Renderer;
pub use error::RenderError;
