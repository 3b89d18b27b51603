//! Composition modes offered by the editor.

use std::fmt;

/// How text is combined with the photo's subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeMode {
    /// Layered text drawn between background and subject cutout.
    #[default]
    Behind,
    /// One outlined string over the whole image; only the outline
    /// crosses the subject.
    Upon,
    /// Characters placed along the subject's silhouette.
    Border,
}

impl CompositeMode {
    /// All modes in display order.
    pub const ALL: [Self; 3] = [Self::Behind, Self::Upon, Self::Border];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Behind => "Text Behind",
            Self::Upon => "Text Upon",
            Self::Border => "Text Border",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Behind => "Layers of text sit behind the subject.",
            Self::Upon => "Bold outlined text over the image.",
            Self::Border => "Text follows the subject's outline.",
        }
    }

    /// Whether the mode edits the layer list (and so has undo/redo).
    #[must_use]
    pub const fn uses_layers(self) -> bool {
        matches!(self, Self::Behind)
    }
}

impl fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_behind_mode_has_layers() {
        let with_layers: Vec<_> = CompositeMode::ALL
            .into_iter()
            .filter(|m| m.uses_layers())
            .collect();
        assert_eq!(with_layers, vec![CompositeMode::Behind]);
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(CompositeMode::Border.to_string(), "Text Border");
    }
}
