//! Choosing what to display for a stored website record, degrading
//! gracefully when images fail to load.

use crate::NormalizedTarget;

/// Where a stored record's icon came from.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IconSource {
    /// An image uploaded by the user.
    Custom,
    /// An icon picked from the built-in library.
    Library,
    /// An icon found by the [`crate::Resolver`] and saved with the record.
    AutoFetched,
    /// Ask a favicon service whenever the record is displayed.
    Favicon,
    /// Always show the placeholder glyph.
    Default,
}

impl IconSource {
    /// Does this source keep its icon in the record's stored path?
    pub fn uses_stored_path(self) -> bool {
        match self {
            IconSource::Custom | IconSource::Library | IconSource::AutoFetched => {
                true
            },
            IconSource::Favicon | IconSource::Default => false,
        }
    }
}

/// Something which can be displayed as an icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSource {
    /// The path stored on the record.
    Stored(String),
    /// The primary favicon service.
    FaviconService(String),
    /// The favicon service tried when the primary one fails to load.
    SecondaryFaviconService(String),
    /// The built-in placeholder glyph. This can't fail to load.
    Placeholder,
}

impl RenderSource {
    /// The image URL to load, if this isn't the [`RenderSource::Placeholder`].
    pub fn url(&self) -> Option<&str> {
        match self {
            RenderSource::Stored(url)
            | RenderSource::FaviconService(url)
            | RenderSource::SecondaryFaviconService(url) => Some(url),
            RenderSource::Placeholder => None,
        }
    }
}

/// Options used when constructing an [`IconRenderer`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// The size, in pixels, the icon will be displayed at.
    pub size: u32,
}

impl Default for RenderOptions {
    fn default() -> Self { RenderOptions { size: 32 } }
}

/// Picks the best [`RenderSource`] for a record and falls back to the next
/// best whenever an image fails to load.
///
/// The order is the record's stored icon (for [`IconSource::Custom`],
/// [`IconSource::Library`], and [`IconSource::AutoFetched`]), then the primary
/// favicon service, then a secondary favicon service, then the placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct IconRenderer {
    candidates: Vec<RenderSource>,
    position: usize,
}

impl IconRenderer {
    /// Work out the candidates for a record.
    ///
    /// `source` and `icon_path` are the two fields read from the stored
    /// record. A record without a tag is treated as [`IconSource::Favicon`].
    pub fn new(
        site_url: &str,
        source: Option<IconSource>,
        icon_path: Option<&str>,
        options: &RenderOptions,
    ) -> Self {
        let source = source.unwrap_or(IconSource::Favicon);
        let mut candidates = Vec::new();

        if source.uses_stored_path() {
            if let Some(path) = icon_path.map(str::trim).filter(|p| !p.is_empty())
            {
                candidates.push(RenderSource::Stored(path.to_string()));
            }
        }

        if source != IconSource::Default {
            if let Some(host) = hostname(site_url) {
                candidates.push(RenderSource::FaviconService(format!(
                    "https://www.google.com/s2/favicons?domain={}&sz={}",
                    host, options.size
                )));
                candidates.push(RenderSource::SecondaryFaviconService(format!(
                    "https://icon.horse/icon/{}",
                    host
                )));
            }
        }

        candidates.push(RenderSource::Placeholder);

        IconRenderer {
            candidates,
            position: 0,
        }
    }

    /// What should be displayed right now.
    pub fn current(&self) -> &RenderSource { &self.candidates[self.position] }

    /// The image for [`IconRenderer::current()`] failed to load, so move on
    /// to the next candidate.
    pub fn on_load_error(&mut self) -> &RenderSource {
        if self.position + 1 < self.candidates.len() {
            log::debug!("Unable to load {:?}, falling back", self.current());
            self.position += 1;
        }

        self.current()
    }

    /// Every candidate, best first.
    pub fn candidates(&self) -> &[RenderSource] { &self.candidates }

    /// Have we run out of images to try?
    pub fn is_placeholder(&self) -> bool {
        self.current() == &RenderSource::Placeholder
    }
}

fn hostname(site_url: &str) -> Option<String> {
    let target = NormalizedTarget::from_raw(site_url);
    let url = target.url().ok()?;

    url.host_str().map(String::from)
}
