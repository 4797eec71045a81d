//! # Proposal Rendering
//!
//! Fills an HTML quotation template from a proposal row and hands it to an
//! external renderer for PDF output.
//!
//! ```text
//! ┌──────────────┐   fill_template()   ┌──────────┐   ProposalRenderer   ┌─────┐
//! │ proposal row │ ──────────────────▶ │   HTML   │ ───────────────────▶ │ PDF │
//! │ {towhom: ..} │   {{towhom}} → ..   │          │   (external)         │     │
//! └──────────────┘                     └──────────┘                      └─────┘
//! ```
//!
//! Rendering happens after the proposal row is stored. A renderer failure
//! is reported as [`StoreError::Render`] and leaves the row in place.

use async_trait::async_trait;

use helio_core::ProposalFields;

use crate::error::{StoreError, StoreResult};

/// Converts filled HTML into document bytes.
#[async_trait]
pub trait ProposalRenderer: Send + Sync {
    async fn render(&self, html: &str) -> StoreResult<Vec<u8>>;
}

/// Replaces every `{{key}}` with the proposal field of that key.
///
/// Keys are matched after trimming and lowercasing, so `{{ To Whom }}` and
/// `{{towhom}}` both resolve. Unknown keys become empty; an unterminated
/// `{{` is copied through.
pub fn fill_template(template: &str, fields: &ProposalFields) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = helio_core::proposals::header_key(&after[..end]);
                if let Some(value) = fields.get(&key) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Fills `template` and renders it, mapping any renderer error to
/// [`StoreError::Render`].
pub async fn render_proposal(
    renderer: &dyn ProposalRenderer,
    template: &str,
    fields: &ProposalFields,
) -> StoreResult<Vec<u8>> {
    let html = fill_template(template, fields);
    renderer.render(&html).await.map_err(|e| match e {
        StoreError::Render(_) => e,
        other => StoreError::Render(other.to_string()),
    })
}
