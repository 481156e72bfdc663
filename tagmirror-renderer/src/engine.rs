//! Tera rendering engine for listing pages.

use tera::Tera;

use crate::context::ListingContext;
use crate::error::RenderError;

/// Registered under an `.html` name so tera autoescapes it.
const LISTING_TEMPLATE: &str = "listing.html";

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[(
    LISTING_TEMPLATE,
    include_str!("templates/listing.html.tera"),
)];

fn build_tera() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TPLS.iter().copied())?;
    Ok(tera)
}

/// Renders directory listings from embedded templates.
///
/// Construct once with [`Renderer::new`] and share; rendering takes `&self`.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { tera: build_tera()? })
    }

    /// Render the HTML page for one directory.
    pub fn render_listing(&self, ctx: &ListingContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self.tera.render(LISTING_TEMPLATE, &tera_ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
