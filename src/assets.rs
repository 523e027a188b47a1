/*!
 * Global document assets.
 *
 * The only nodes the engine ever creates: one stylesheet carrying the
 * typeface and list-marker rules, and one link to the font stylesheet. Both
 * are found by id before being created, so installing twice never
 * duplicates them.
 */

use log::{debug, trace};

use crate::app_config::AnnotationConfig;
use crate::dom::{Document, ElementData, NodeId};
use crate::errors::DomError;
use crate::settings::Appearance;

/// Outcome of an installation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Installed,
    /// The document has no `<head>` yet; retry on a later pass
    HostNotReady,
}

#[derive(Debug, Clone)]
pub struct AssetInstaller {
    stylesheet_id: String,
    font_link_id: String,
    typeface_class: String,
    list_attribute: String,
}

impl AssetInstaller {
    pub fn new(config: &AnnotationConfig) -> Self {
        Self {
            stylesheet_id: config.stylesheet_id.clone(),
            font_link_id: config.font_link_id.clone(),
            typeface_class: config.typeface_class.clone(),
            list_attribute: config.list_attribute.clone(),
        }
    }

    /// Stylesheet text for the given appearance; empty when disabled
    pub fn stylesheet(&self, appearance: &Appearance) -> String {
        if !appearance.enabled {
            return String::new();
        }
        format!(
            ".{class} {{ font-family: {family} !important; font-size: {size}px; }}\n\
             [{list}] > li::marker {{ unicode-bidi: isolate; direction: ltr; }}\n",
            class = self.typeface_class,
            family = appearance.font_family(),
            size = appearance.font_size_px,
            list = self.list_attribute,
        )
    }

    pub fn find_stylesheet(&self, doc: &Document) -> Option<NodeId> {
        find_by_id(doc, &self.stylesheet_id)
    }

    pub fn find_font_link(&self, doc: &Document) -> Option<NodeId> {
        find_by_id(doc, &self.font_link_id)
    }

    /// Install or refresh both assets
    pub fn install(&self, doc: &mut Document, appearance: &Appearance) -> Result<AssetStatus, DomError> {
        let Some(head) = doc.head() else {
            debug!("Document has no head yet, deferring asset installation");
            return Ok(AssetStatus::HostNotReady);
        };

        let css = self.stylesheet(appearance);
        match self.find_stylesheet(doc) {
            Some(style) => {
                if doc.text_content(style) != css {
                    doc.set_text_content(style, &css)?;
                    trace!("Refreshed stylesheet #{}", self.stylesheet_id);
                }
            }
            None => {
                let style = doc.append_element(
                    head,
                    ElementData::with_attrs("style", [("id", self.stylesheet_id.as_str())]),
                )?;
                doc.append_text(style, &css)?;
                debug!("Installed stylesheet #{}", self.stylesheet_id);
            }
        }

        if let Some(url) = &appearance.stylesheet_url {
            match self.find_font_link(doc) {
                Some(link) => {
                    doc.set_attr(link, "href", url.as_str())?;
                }
                None => {
                    doc.append_element(
                        head,
                        ElementData::with_attrs(
                            "link",
                            [
                                ("id", self.font_link_id.as_str()),
                                ("rel", "stylesheet"),
                                ("href", url.as_str()),
                            ],
                        ),
                    )?;
                    debug!("Installed font link {}", url);
                }
            }
        } else if let Some(link) = self.find_font_link(doc) {
            // a local or custom typeface needs no web font
            if doc.remove_attr(link, "href")? {
                debug!("Cleared font link #{}", self.font_link_id);
            }
        }

        Ok(AssetStatus::Installed)
    }
}

fn find_by_id(doc: &Document, id: &str) -> Option<NodeId> {
    doc.find(doc.root(), |element| element.attr("id") == Some(id))
}
