//! The pattern AST: [`Token`], the ten-variant closed sum type rule patterns
//! are built from, plus [`Rule`] and [`MatchResult`].
//!
//! Dispatch over `Token` is always exhaustive `match` — no dynamic type
//! tests, no downcasting.

use crate::element::{Element, Sound};

/// `+` (one-or-more, greedy) or `?` (zero-or-one, skip-first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    OneOrMore,
    ZeroOrOne,
}

/// A syllable role a [`Token::SyllableCondTok`] can gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyllablePosition {
    Onset,
    Nucleus,
    Coda,
}

/// One element of a rule pattern (ante, post, or context).
///
/// Structural invariants (enforced by the parser, not by this type):
/// `FocusTok` appears only in context, at most once; `BackRefTok::index`
/// refers only to an `ante` position; the contents of `ChoiceTok`/`SetTok`
/// are themselves primitive (no nested choice, set, quantifier, or focus);
/// `SetTok`s paired between ante and post have equal length;
/// `QuantifiedTok::inner` is primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A concrete or class-partial segment.
    SegmentTok(Sound),
    /// The boundary marker, canonically `#`.
    BoundaryTok { marker: String },
    /// The focus position `_` inside context.
    FocusTok,
    /// The deletion/insertion placeholder `:null:`.
    EmptyTok,
    /// A back-reference to the `index`-th bound element of the current
    /// ante match, with an optional verbatim modifier string.
    BackRefTok {
        index: usize,
        modifier: Option<String>,
    },
    /// A disjunctive match; the first matching alternative wins.
    ChoiceTok(Vec<Token>),
    /// A correspondence set; like `ChoiceTok` for matching, but the index
    /// of the matched alternative is recorded for the paired `SetTok`.
    SetTok(Vec<Token>),
    /// `inner` repeated per `quantifier`.
    QuantifiedTok {
        inner: Box<Token>,
        quantifier: Quantifier,
    },
    /// Matches one element that `inner` does not match.
    NegationTok(Box<Token>),
    /// Gates the focus position on a syllable role; consumes nothing.
    SyllableCondTok(SyllablePosition),
}

impl Token {
    /// `true` for tokens legal inside a `ChoiceTok`/`SetTok` alternative or
    /// as `QuantifiedTok::inner`: no nested choice, set, quantifier, or
    /// focus.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Token::SegmentTok(_)
                | Token::BoundaryTok { .. }
                | Token::EmptyTok
                | Token::BackRefTok { .. }
                | Token::NegationTok(_)
        )
    }

    /// The canonical boundary token.
    pub fn boundary() -> Token {
        Token::BoundaryTok {
            marker: "#".to_string(),
        }
    }
}

/// A parsed sound-change rule: `ante > post [ / context ]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// the original rule text, for diagnostics and for `invert`
    pub source: String,
    pub ante: Vec<Token>,
    pub post: Vec<Token>,
    pub context: Option<Vec<Token>>,
}

impl Rule {
    /// The index of `context`'s `FocusTok`, splitting it into left and
    /// right environment patterns. `None` if there is no context or no
    /// focus token in it (malformed input should have been rejected at
    /// parse time, so this is a defensive fallback, not a validity check).
    pub fn context_split(&self) -> Option<(&[Token], &[Token])> {
        let context = self.context.as_ref()?;
        let focus_at = context.iter().position(|t| matches!(t, Token::FocusTok))?;
        Some((&context[..focus_at], &context[focus_at + 1..]))
    }

    /// A naive structural inversion: swap ante and post, keep context
    /// unchanged. This is the lightweight `invert(rule)` the data model
    /// names for diagnostics — a `Rule`-to-`Rule` transformation, distinct
    /// from [`crate::applier::backward`]'s full enumeration of reconstructed
    /// sequences. Only meaningful when `post` contains nothing illegal in
    /// ante position (no back-reference, no focus) — callers inverting a
    /// rule whose post carries a back-reference get a `Rule` value back,
    /// but one that could not itself be re-parsed from text.
    pub fn naive_invert(&self) -> Rule {
        Rule {
            source: format!("(inverted) {}", self.source),
            ante: self.post.clone(),
            post: self.ante.clone(),
            context: self.context.clone(),
        }
    }
}

/// The result of matching a pattern against a sequence at a given offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    /// `bindings[i]` is the element captured by the i-th pattern token,
    /// or `None` for tokens that bind nothing (boundaries and focus tokens
    /// bind `None` per-spec rather than being absent).
    pub bindings: Vec<Option<Element>>,
    /// number of input elements consumed
    pub span: usize,
    /// `set_indices[i]` is `Some(alt)` when the i-th pattern token is a
    /// `SetTok` and alternative `alt` matched; `None` otherwise.
    pub set_indices: Vec<Option<usize>>,
}

impl MatchResult {
    pub fn success(
        bindings: Vec<Option<Element>>,
        span: usize,
        set_indices: Vec<Option<usize>>,
    ) -> MatchResult {
        MatchResult {
            matched: true,
            bindings,
            span,
            set_indices,
        }
    }

    pub fn failure() -> MatchResult {
        MatchResult {
            matched: false,
            bindings: Vec::new(),
            span: 0,
            set_indices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_is_primitive() {
        assert!(Token::SegmentTok(Sound::unknown("p")).is_primitive());
        assert!(Token::EmptyTok.is_primitive());
        assert!(!Token::FocusTok.is_primitive());
        assert!(!Token::ChoiceTok(vec![]).is_primitive());
        assert!(!Token::QuantifiedTok {
            inner: Box::new(Token::EmptyTok),
            quantifier: Quantifier::OneOrMore
        }
        .is_primitive());
    }

    #[test]
    fn test_context_split() {
        let rule = Rule {
            source: "p > b / V _ V".to_string(),
            ante: vec![Token::SegmentTok(Sound::unknown("p"))],
            post: vec![Token::SegmentTok(Sound::unknown("b"))],
            context: Some(vec![
                Token::SegmentTok(Sound::partial("V", HashSet::new())),
                Token::FocusTok,
                Token::SegmentTok(Sound::partial("V", HashSet::new())),
            ]),
        };
        let (left, right) = rule.context_split().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(right.len(), 1);
    }

    #[test]
    fn test_context_split_none_without_context() {
        let rule = Rule {
            source: "p > b".to_string(),
            ante: vec![Token::SegmentTok(Sound::unknown("p"))],
            post: vec![Token::SegmentTok(Sound::unknown("b"))],
            context: None,
        };
        assert!(rule.context_split().is_none());
    }

    #[test]
    fn test_match_result_failure() {
        let result = MatchResult::failure();
        assert!(!result.matched);
        assert_eq!(result.span, 0);
        assert!(result.bindings.is_empty());
    }
}
