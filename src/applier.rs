//! Bidirectional rule application: [`forward`] simulates a sound change
//! once across a sequence; [`backward`] enumerates the proto-forms that
//! could have produced a sequence under one application of a rule;
//! [`apply_gradient`] is a thin stochastic wrapper over `forward`.
//!
//! Both directions share the same context-verification machinery: the
//! matcher is always handed the *already bound* ante elements
//! ([`BackrefMode::Bound`]) when checking a rule's left/right context, so a
//! back-reference inside context resolves against the real match instead of
//! an empty one. Left context is checked by reversing both the token list
//! and the relevant slice of the sequence and matching forward into that
//! mirror image — [`SyllableMap::reversed_from`] keeps a `SyllableCondTok`
//! anchored to the right original-sequence position throughout.

use crate::element::{Boundary, Element, Sound};
use crate::feature_system::{parse_modifiers, FeatureSystem};
use crate::matcher::{match_pattern_with_backrefs, BackrefMode};
use crate::syllable::{SyllableMap, Syllabifier};
use crate::token::{MatchResult, Quantifier, Rule, Token};

/// Apply `rule` to `sequence` once: a single left-to-right,
/// non-overlapping pass. Returns `sequence` unchanged if the rule never
/// matches.
pub fn forward(sequence: &[Element], rule: &Rule, system: &FeatureSystem) -> Vec<Element> {
    forward_gated(sequence, rule, system, &mut |_site| true)
}

/// Gradient (stochastic) application: enumerate `rule`'s forward match
/// sites and, at each one independently, apply the rewrite with
/// probability `clamp01(strength)`, decided by a seeded deterministic RNG
/// so a given `(seed, strength)` always reproduces the same outcome.
/// `strength >= 1.0` always fires (same result as [`forward`]);
/// `strength <= 0.0` never does (the identity).
pub fn apply_gradient(sequence: &[Element], rule: &Rule, strength: f64, seed: u64, system: &FeatureSystem) -> Vec<Element> {
    let strength = clamp01(strength);
    let mut rng = Lcg::new(seed);
    forward_gated(sequence, rule, system, &mut |_site| rng.next_unit() < strength)
}

/// Enumerate every sequence that could have produced `sequence` under one
/// application of `rule`. Always includes `sequence` itself. Deduplicated
/// by value equality; order beyond the first (always-present) entry is the
/// left-to-right order in which candidate sites were found.
pub fn backward(sequence: &[Element], rule: &Rule, system: &FeatureSystem) -> Vec<Vec<Element>> {
    let mut results = vec![sequence.to_vec()];

    let mut p = 0;
    while p <= sequence.len() {
        let post_result = match_pattern_with_backrefs(sequence, &rule.post, system, None, p, BackrefMode::Capture);
        if post_result.matched {
            if let Some(candidate) = reconstruct_candidate(sequence, rule, &post_result, p, system) {
                push_unique(&mut results, candidate);
            }
        }
        p += 1;
    }
    results
}

/// The shared forward scan, parameterized by a `gate` called once per
/// match site (in scan order) to decide whether that site actually fires.
/// `forward` gates every site true; `apply_gradient` gates with a coin
/// flip.
fn forward_gated(
    sequence: &[Element],
    rule: &Rule,
    system: &FeatureSystem,
    gate: &mut dyn FnMut(usize) -> bool,
) -> Vec<Element> {
    let syllable_map = if rule_needs_syllable_map(rule) {
        Some(Syllabifier::default().syllabify(sequence))
    } else {
        None
    };

    let mut output = Vec::with_capacity(sequence.len());
    let mut site = 0;
    let mut p = 0;
    while p <= sequence.len() {
        let ante_result =
            match_pattern_with_backrefs(sequence, &rule.ante, system, syllable_map.as_ref(), p, BackrefMode::None);
        let applies =
            ante_result.matched && context_holds(sequence, rule, &ante_result, system, syllable_map.as_ref(), p);

        if applies {
            let fires = gate(site);
            site += 1;
            if fires {
                output.extend(build_replacement(&rule.post, &rule.ante, &ante_result, system));
                if ante_result.span == 0 {
                    if p < sequence.len() {
                        output.push(sequence[p].clone());
                    }
                    p += 1;
                } else {
                    p += ante_result.span;
                }
                continue;
            }
        }

        if p < sequence.len() {
            output.push(sequence[p].clone());
        }
        p += 1;
    }
    output
}

/// Verify a rule's context (if any) against an ante match anchored at `p`.
/// `ante_result.bindings` resolve any back-reference inside context. No
/// context at all trivially holds.
fn context_holds(
    sequence: &[Element],
    rule: &Rule,
    ante_result: &MatchResult,
    system: &FeatureSystem,
    syllable_map: Option<&SyllableMap>,
    p: usize,
) -> bool {
    let (left, right) = match rule.context_split() {
        Some(split) => split,
        None => return true,
    };

    if !left.is_empty() {
        let reversed_tokens: Vec<Token> = left.iter().rev().cloned().collect();
        let reversed_seq: Vec<Element> = sequence[..p].iter().rev().cloned().collect();
        let reversed_map = syllable_map.map(|m| m.reversed_from(p));
        let left_result = match_pattern_with_backrefs(
            &reversed_seq,
            &reversed_tokens,
            system,
            reversed_map.as_ref(),
            0,
            BackrefMode::Bound(&ante_result.bindings),
        );
        if !left_result.matched {
            return false;
        }
    }

    if !right.is_empty() {
        let right_result = match_pattern_with_backrefs(
            sequence,
            right,
            system,
            syllable_map,
            p + ante_result.span,
            BackrefMode::Bound(&ante_result.bindings),
        );
        if !right_result.matched {
            return false;
        }
    }

    true
}

/// `true` if `rule`'s context contains a `SyllableCondTok`, in which case a
/// syllable map must be computed before context can be checked.
fn rule_needs_syllable_map(rule: &Rule) -> bool {
    rule.context
        .as_ref()
        .map(|ctx| ctx.iter().any(|t| matches!(t, Token::SyllableCondTok(_))))
        .unwrap_or(false)
}

/// The matched-alternative index of each `SetTok` among `tokens`, in the
/// order those `SetTok`s occur — used to pair an ante `SetTok` occurrence
/// with the corresponding `SetTok` occurrence in post (or vice versa for
/// backward), by position among same-kind occurrences rather than by raw
/// token index.
fn set_choices_in_order(tokens: &[Token], set_indices: &[Option<usize>]) -> Vec<usize> {
    tokens
        .iter()
        .zip(set_indices.iter())
        .filter_map(|(t, idx)| match (t, idx) {
            (Token::SetTok(_), Some(i)) => Some(*i),
            _ => None,
        })
        .collect()
}

/// Build the forward replacement for one ante match from `rule.post`.
fn build_replacement(post: &[Token], ante: &[Token], ante_result: &MatchResult, system: &FeatureSystem) -> Vec<Element> {
    let ante_set_choices = set_choices_in_order(ante, &ante_result.set_indices);
    let mut cursor = 0;
    let mut out = Vec::new();
    for token in post {
        emit_post_token(token, &ante_result.bindings, &ante_set_choices, &mut cursor, system, &mut out);
    }
    out
}

/// Emit the elements one post token contributes to a forward replacement.
fn emit_post_token(
    token: &Token,
    ante_bindings: &[Option<Element>],
    ante_set_choices: &[usize],
    set_cursor: &mut usize,
    system: &FeatureSystem,
    out: &mut Vec<Element>,
) {
    match token {
        Token::SegmentTok(sound) => out.push(Element::Sound(sound.clone())),
        Token::BoundaryTok { marker } => out.push(Element::Boundary(Boundary { marker: marker.clone() })),
        Token::EmptyTok => {}
        Token::BackRefTok { index, modifier } => {
            if let Some(Some(Element::Sound(bound))) = ante_bindings.get(*index) {
                let features = match modifier {
                    Some(m) => system.add_features(&bound.features, &parse_modifiers(m)),
                    None => bound.features.clone(),
                };
                let grapheme = system.features_to_grapheme(&features).unwrap_or_else(|| bound.grapheme.clone());
                out.push(Element::Sound(Sound::concrete(grapheme, features)));
            }
        }
        // the parser doesn't reject a bare choice in post; if one survives,
        // the first alternative wins.
        Token::ChoiceTok(alts) => {
            if let Some(first) = alts.first() {
                emit_post_token(first, ante_bindings, ante_set_choices, set_cursor, system, out);
            }
        }
        Token::SetTok(alts) => {
            let alt_idx = ante_set_choices.get(*set_cursor).copied().unwrap_or(0);
            *set_cursor += 1;
            if let Some(alt) = alts.get(alt_idx) {
                emit_post_token(alt, ante_bindings, ante_set_choices, set_cursor, system, out);
            }
        }
        Token::QuantifiedTok { inner, .. } => {
            emit_post_token(inner, ante_bindings, ante_set_choices, set_cursor, system, out);
        }
        Token::NegationTok(_) | Token::FocusTok | Token::SyllableCondTok(_) => {}
    }
}

/// Reconstruct one backward candidate: replace the post-span matched at
/// `p` with a reconstruction of ante, then (if the rule has context)
/// re-check that context against the reconstructed sequence, re-matching
/// ante there to get real bindings for any back-reference inside context.
/// Returns `None` if context fails to hold, discarding the candidate.
fn reconstruct_candidate(
    sequence: &[Element],
    rule: &Rule,
    post_result: &MatchResult,
    p: usize,
    system: &FeatureSystem,
) -> Option<Vec<Element>> {
    let post_set_choices = set_choices_in_order(&rule.post, &post_result.set_indices);
    let mut cursor = 0;
    let mut reconstructed = Vec::new();
    for token in &rule.ante {
        emit_ante_token(token, &post_set_choices, &mut cursor, system, &mut reconstructed);
    }

    let mut candidate = Vec::with_capacity(sequence.len());
    candidate.extend_from_slice(&sequence[..p]);
    candidate.extend(reconstructed);
    candidate.extend_from_slice(&sequence[p + post_result.span..]);

    if rule.context.is_some() {
        let syllable_map =
            if rule_needs_syllable_map(rule) { Some(Syllabifier::default().syllabify(&candidate)) } else { None };
        let ante_check =
            match_pattern_with_backrefs(&candidate, &rule.ante, system, syllable_map.as_ref(), p, BackrefMode::None);
        if !ante_check.matched {
            return None;
        }
        if !context_holds(&candidate, rule, &ante_check, system, syllable_map.as_ref(), p) {
            return None;
        }
    }

    Some(candidate)
}

/// Reconstruct the elements one ante token contributes to a backward
/// candidate. `BackRefTok` never appears in ante (the parser rejects it),
/// so unlike `emit_post_token` this needs no access to post's bindings.
fn emit_ante_token(token: &Token, post_set_choices: &[usize], set_cursor: &mut usize, system: &FeatureSystem, out: &mut Vec<Element>) {
    match token {
        Token::SegmentTok(sound) => {
            if sound.partial {
                let grapheme = system.features_to_grapheme(&sound.features).unwrap_or_else(|| sound.grapheme.clone());
                out.push(Element::Sound(Sound::concrete(grapheme, sound.features.clone())));
            } else {
                out.push(Element::Sound(sound.clone()));
            }
        }
        Token::BoundaryTok { marker } => out.push(Element::Boundary(Boundary { marker: marker.clone() })),
        Token::EmptyTok => {}
        Token::ChoiceTok(alts) => {
            if let Some(first) = alts.first() {
                emit_ante_token(first, post_set_choices, set_cursor, system, out);
            }
        }
        Token::SetTok(alts) => {
            let alt_idx = post_set_choices.get(*set_cursor).copied().unwrap_or(0);
            *set_cursor += 1;
            if let Some(alt) = alts.get(alt_idx) {
                emit_ante_token(alt, post_set_choices, set_cursor, system, out);
            }
        }
        // the quantity lost to the quantifier can't be recovered; '+'
        // reconstructs the minimal one match, '?' the minimal zero.
        Token::QuantifiedTok { inner, quantifier } => {
            let reps = match quantifier {
                Quantifier::OneOrMore => 1,
                Quantifier::ZeroOrOne => 0,
            };
            for _ in 0..reps {
                emit_ante_token(inner, post_set_choices, set_cursor, system, out);
            }
        }
        // what a negation excluded isn't recoverable either; it contributes
        // nothing to the reconstruction.
        Token::NegationTok(_) => {}
        Token::BackRefTok { .. } | Token::FocusTok | Token::SyllableCondTok(_) => {}
    }
}

fn push_unique(results: &mut Vec<Vec<Element>>, candidate: Vec<Element>) {
    if !results.contains(&candidate) {
        results.push(candidate);
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// A small deterministic linear-congruential generator: the only
/// randomness `apply_gradient` needs, for a single per-site coin flip.
/// Nothing else in this crate needs an RNG, so this is hand-rolled rather
/// than pulling in `rand` for one call site.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Lcg {
        Lcg(seed ^ 0x9E37_79B9_7F4A_7C15)
    }

    /// Next value, uniform in `[0.0, 1.0)`.
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 11) as f64) / ((1u64 << 53) as f64)
    }
}
