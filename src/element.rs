//! Sounds, boundaries, and the sequences built from them.
//!
//! A [`Sound`] is a phonological segment: a grapheme plus the feature set
//! that describes it. `partial` distinguishes a concrete segment (features
//! must match exactly) from a sound-class pattern (features must only be a
//! subset of — "subsumed by" — the candidate's features). A [`Boundary`] is
//! a pseudo-segment marking a word or morpheme edge. An [`Element`] is
//! either of the two; a sequence is just an ordered `Vec<Element>`.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A phonological segment.
///
/// Two sounds are equal iff both their grapheme and feature set match —
/// `partial` is not itself part of the equality (a partial and a concrete
/// sound with the same grapheme and features are the same value; what
/// differs is how the matcher treats them).
#[derive(Debug, Clone)]
pub struct Sound {
    /// textual representation, e.g. `"p"` or `"t͡ʃ"`
    pub grapheme: String,
    /// the feature-value labels describing this sound
    pub features: HashSet<String>,
    /// `true` for a sound-class pattern (features must be subsumed by a
    /// match target); `false` for a concrete segment (features must match
    /// exactly)
    pub partial: bool,
}

impl PartialEq for Sound {
    fn eq(&self, other: &Sound) -> bool {
        self.grapheme == other.grapheme && self.features == other.features
    }
}

impl Eq for Sound {}

impl Hash for Sound {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.grapheme.hash(state);
        let mut sorted: Vec<&String> = self.features.iter().collect();
        sorted.sort();
        sorted.hash(state);
    }
}

impl Sound {
    /// A concrete segment with the given grapheme and feature set.
    pub fn concrete(grapheme: impl Into<String>, features: HashSet<String>) -> Sound {
        Sound {
            grapheme: grapheme.into(),
            features,
            partial: false,
        }
    }

    /// A class-partial segment (a sound-class pattern) with the given
    /// grapheme (typically the class letter) and required feature set.
    pub fn partial(grapheme: impl Into<String>, features: HashSet<String>) -> Sound {
        Sound {
            grapheme: grapheme.into(),
            features,
            partial: true,
        }
    }

    /// An unknown grapheme: empty feature set, concrete. Produced by the
    /// parser when a grapheme isn't in the active feature system's
    /// inventory — it can never satisfy a class-partial pattern, but it can
    /// still match itself.
    pub fn unknown(grapheme: impl Into<String>) -> Sound {
        Sound::concrete(grapheme, HashSet::new())
    }
}

/// A pseudo-segment marking a word or morpheme edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary {
    /// canonically `"#"`
    pub marker: String,
}

impl Boundary {
    /// The canonical word/morpheme boundary.
    pub fn word() -> Boundary {
        Boundary {
            marker: "#".to_string(),
        }
    }
}

impl Default for Boundary {
    fn default() -> Boundary {
        Boundary::word()
    }
}

/// A segment or a boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    /// a phonological segment
    Sound(Sound),
    /// a word/morpheme edge
    Boundary(Boundary),
}

impl Element {
    /// The textual representation of this element (the sound's grapheme,
    /// or the boundary's marker).
    pub fn symbol(&self) -> &str {
        match self {
            Element::Sound(s) => &s.grapheme,
            Element::Boundary(b) => &b.marker,
        }
    }

    /// `true` if this element is a [`Boundary`].
    pub fn is_boundary(&self) -> bool {
        matches!(self, Element::Boundary(_))
    }

    /// `true` if this element is a [`Sound`].
    pub fn is_sound(&self) -> bool {
        matches!(self, Element::Sound(_))
    }
}

/// Render a sequence of elements back to whitespace-separated text.
pub fn render(sequence: &[Element]) -> String {
    sequence
        .iter()
        .map(Element::symbol)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_equality_ignores_partial_flag() {
        let mut fs = HashSet::new();
        fs.insert("voiced".to_string());
        let concrete = Sound::concrete("b", fs.clone());
        let partial = Sound::partial("b", fs);
        assert_eq!(concrete, partial);
    }

    #[test]
    fn test_unknown_grapheme_has_empty_features() {
        let s = Sound::unknown("ǂ");
        assert!(s.features.is_empty());
        assert!(!s.partial);
    }

    #[test]
    fn test_render_roundtrip() {
        let seq = vec![
            Element::Boundary(Boundary::word()),
            Element::Sound(Sound::unknown("a")),
            Element::Boundary(Boundary::word()),
        ];
        assert_eq!(render(&seq), "# a #");
    }
}
