//! Pattern matching: evaluates a token pattern against a segment sequence.
//!
//! The matcher is mutual recursion with backtracking over choice, set, and
//! quantifier alternatives, operating on borrowed slices only — no
//! allocation beyond the returned [`MatchResult`] and its own scratch
//! bindings vector. [`Token`] dispatch is always an exhaustive `match` over
//! the closed variant set, never a runtime type test.

use crate::element::Element;
use crate::feature_system::{parse_modifiers, FeatureSystem};
use crate::syllable::{SyllableMap, SyllableRole};
use crate::token::{MatchResult, Quantifier, SyllablePosition, Token};

/// How a `BackRefTok` should behave while matching, since the same token
/// kind plays two different roles depending on where it sits in a rule:
#[derive(Clone, Copy)]
pub enum BackrefMode<'a> {
    /// No prior bindings exist; any `BackRefTok` fails to match. The
    /// default for matching `ante` itself.
    None,
    /// Check feature equality (with optional modifier) against a
    /// previously bound ante element. Used for context verification.
    Bound(&'a [Option<Element>]),
    /// Match any `Sound` unconditionally and bind it. Used when matching a
    /// rule's `post` pattern during backward application, where the ante
    /// bindings have not been reconstructed yet — the back-reference's job
    /// there is to capture whatever is present so it can be inverted.
    Capture,
}

/// Match `pattern` against `sequence` starting at `offset`.
///
/// `syllable_map` is required for any pattern containing a
/// `SyllableCondTok` (absent, it always fails such a condition).
pub fn match_pattern(
    sequence: &[Element],
    pattern: &[Token],
    system: &FeatureSystem,
    syllable_map: Option<&SyllableMap>,
    offset: usize,
) -> MatchResult {
    match_pattern_with_backrefs(sequence, pattern, system, syllable_map, offset, BackrefMode::None)
}

/// As [`match_pattern`], but resolves `BackRefTok` per `mode`.
pub fn match_pattern_with_backrefs(
    sequence: &[Element],
    pattern: &[Token],
    system: &FeatureSystem,
    syllable_map: Option<&SyllableMap>,
    offset: usize,
    mode: BackrefMode,
) -> MatchResult {
    let mut bindings = vec![None; pattern.len()];
    let mut set_indices = vec![None; pattern.len()];
    match try_match(
        pattern,
        0,
        sequence,
        offset,
        system,
        syllable_map,
        mode,
        &mut bindings,
        &mut set_indices,
    ) {
        Some(end_pos) => MatchResult::success(bindings, end_pos - offset, set_indices),
        None => MatchResult::failure(),
    }
}

#[allow(clippy::too_many_arguments)]
fn try_match(
    tokens: &[Token],
    start_tok: usize,
    sequence: &[Element],
    pos: usize,
    system: &FeatureSystem,
    syllable_map: Option<&SyllableMap>,
    mode: BackrefMode,
    bindings: &mut Vec<Option<Element>>,
    set_indices: &mut Vec<Option<usize>>,
) -> Option<usize> {
    if start_tok == tokens.len() {
        return Some(pos);
    }

    match &tokens[start_tok] {
        Token::FocusTok => {
            bindings[start_tok] = None;
            try_match(
                tokens,
                start_tok + 1,
                sequence,
                pos,
                system,
                syllable_map,
                mode,
                bindings,
                set_indices,
            )
        }
        Token::SyllableCondTok(required) => {
            let ok = syllable_map
                .and_then(|m| m.role_at(pos))
                .map(|role| syllable_role_matches(role, *required))
                .unwrap_or(false);
            if !ok {
                return None;
            }
            bindings[start_tok] = None;
            try_match(
                tokens,
                start_tok + 1,
                sequence,
                pos,
                system,
                syllable_map,
                mode,
                bindings,
                set_indices,
            )
        }
        Token::ChoiceTok(alts) => {
            for alt in alts {
                if let Some((new_pos, binding)) = match_primitive_once(alt, sequence, pos, system, mode) {
                    let mut local_bindings = bindings.clone();
                    let mut local_set = set_indices.clone();
                    local_bindings[start_tok] = binding;
                    if let Some(end) = try_match(
                        tokens,
                        start_tok + 1,
                        sequence,
                        new_pos,
                        system,
                        syllable_map,
                        mode,
                        &mut local_bindings,
                        &mut local_set,
                    ) {
                        *bindings = local_bindings;
                        *set_indices = local_set;
                        return Some(end);
                    }
                }
            }
            None
        }
        Token::SetTok(alts) => {
            for (i, alt) in alts.iter().enumerate() {
                if let Some((new_pos, binding)) = match_primitive_once(alt, sequence, pos, system, mode) {
                    let mut local_bindings = bindings.clone();
                    let mut local_set = set_indices.clone();
                    local_bindings[start_tok] = binding;
                    local_set[start_tok] = Some(i);
                    if let Some(end) = try_match(
                        tokens,
                        start_tok + 1,
                        sequence,
                        new_pos,
                        system,
                        syllable_map,
                        mode,
                        &mut local_bindings,
                        &mut local_set,
                    ) {
                        *bindings = local_bindings;
                        *set_indices = local_set;
                        return Some(end);
                    }
                }
            }
            None
        }
        Token::QuantifiedTok { inner, quantifier } => match quantifier {
            Quantifier::OneOrMore => {
                let mut matches = Vec::new();
                let mut cur = pos;
                loop {
                    match match_primitive_once(inner, sequence, cur, system, mode) {
                        Some((new_pos, binding)) => {
                            matches.push((new_pos, binding));
                            cur = new_pos;
                        }
                        None => break,
                    }
                }
                for k in (1..=matches.len()).rev() {
                    let (end_pos, _) = &matches[k - 1];
                    let first_binding = matches[0].1.clone();
                    let mut local_bindings = bindings.clone();
                    let mut local_set = set_indices.clone();
                    local_bindings[start_tok] = first_binding;
                    if let Some(end) = try_match(
                        tokens,
                        start_tok + 1,
                        sequence,
                        *end_pos,
                        system,
                        syllable_map,
                        mode,
                        &mut local_bindings,
                        &mut local_set,
                    ) {
                        *bindings = local_bindings;
                        *set_indices = local_set;
                        return Some(end);
                    }
                }
                None
            }
            Quantifier::ZeroOrOne => {
                {
                    let mut local_bindings = bindings.clone();
                    let mut local_set = set_indices.clone();
                    local_bindings[start_tok] = None;
                    if let Some(end) = try_match(
                        tokens,
                        start_tok + 1,
                        sequence,
                        pos,
                        system,
                        syllable_map,
                        mode,
                        &mut local_bindings,
                        &mut local_set,
                    ) {
                        *bindings = local_bindings;
                        *set_indices = local_set;
                        return Some(end);
                    }
                }
                if let Some((new_pos, binding)) = match_primitive_once(inner, sequence, pos, system, mode) {
                    let mut local_bindings = bindings.clone();
                    let mut local_set = set_indices.clone();
                    local_bindings[start_tok] = binding;
                    if let Some(end) = try_match(
                        tokens,
                        start_tok + 1,
                        sequence,
                        new_pos,
                        system,
                        syllable_map,
                        mode,
                        &mut local_bindings,
                        &mut local_set,
                    ) {
                        *bindings = local_bindings;
                        *set_indices = local_set;
                        return Some(end);
                    }
                }
                None
            }
        },
        primitive => match match_primitive_once(primitive, sequence, pos, system, mode) {
            Some((new_pos, binding)) => {
                bindings[start_tok] = binding;
                try_match(
                    tokens,
                    start_tok + 1,
                    sequence,
                    new_pos,
                    system,
                    syllable_map,
                    mode,
                    bindings,
                    set_indices,
                )
            }
            None => None,
        },
    }
}

/// Match one primitive token (segment, boundary, empty, back-reference, or
/// negation) at exactly `pos`, returning the position after consumption and
/// the captured binding. Used directly for a bare primitive token, and as
/// the alternative-matcher for choices, sets, quantifier bodies, and
/// negation's inner probe.
fn match_primitive_once(
    token: &Token,
    sequence: &[Element],
    pos: usize,
    system: &FeatureSystem,
    mode: BackrefMode,
) -> Option<(usize, Option<Element>)> {
    match token {
        Token::SegmentTok(sound) => {
            let elem = sequence.get(pos)?;
            match elem {
                Element::Sound(s) => {
                    let ok = if sound.partial {
                        system.partial_match(&sound.features, &s.features)
                    } else {
                        sound.grapheme == s.grapheme && sound.features == s.features
                    };
                    if ok {
                        Some((pos + 1, Some(elem.clone())))
                    } else {
                        None
                    }
                }
                Element::Boundary(_) => None,
            }
        }
        Token::BoundaryTok { marker } => {
            let elem = sequence.get(pos)?;
            match elem {
                Element::Boundary(b) if &b.marker == marker => Some((pos + 1, Some(elem.clone()))),
                _ => None,
            }
        }
        Token::EmptyTok => Some((pos, None)),
        Token::BackRefTok { index, modifier } => match mode {
            BackrefMode::None => None,
            BackrefMode::Bound(bindings) => {
                let bound = bindings.get(*index)?.clone()?;
                let bound_sound = match bound {
                    Element::Sound(s) => s,
                    Element::Boundary(_) => return None,
                };
                let target_features = match modifier {
                    Some(m) => system.add_features(&bound_sound.features, &parse_modifiers(m)),
                    None => bound_sound.features.clone(),
                };
                let elem = sequence.get(pos)?;
                match elem {
                    Element::Sound(s) if s.features == target_features => Some((pos + 1, Some(elem.clone()))),
                    _ => None,
                }
            }
            BackrefMode::Capture => {
                let elem = sequence.get(pos)?;
                match elem {
                    Element::Sound(_) => Some((pos + 1, Some(elem.clone()))),
                    Element::Boundary(_) => None,
                }
            }
        },
        Token::NegationTok(inner) => {
            let _ = sequence.get(pos)?;
            let window = &sequence[pos..pos + 1];
            match match_primitive_once(inner, window, 0, system, mode) {
                Some(_) => None,
                None => Some((pos + 1, None)),
            }
        }
        _ => None,
    }
}

fn syllable_role_matches(role: SyllableRole, required: SyllablePosition) -> bool {
    matches!(
        (role, required),
        (SyllableRole::Onset, SyllablePosition::Onset)
            | (SyllableRole::Nucleus, SyllablePosition::Nucleus)
            | (SyllableRole::Coda, SyllablePosition::Coda)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_system::FeatureSystem;
    use crate::parser::{parse_rule, parse_sequence};
    use crate::syllable::Syllabifier;

    #[test]
    fn test_match_concrete_segment() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# p a #", &system);
        let rule = parse_rule("p > b", &system).unwrap();
        let result = match_pattern(&seq, &rule.ante, &system, None, 1);
        assert!(result.matched);
        assert_eq!(result.span, 1);
    }

    #[test]
    fn test_match_class_partial() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# p a #", &system);
        let rule = parse_rule("C > t", &system).unwrap();
        let result = match_pattern(&seq, &rule.ante, &system, None, 1);
        assert!(result.matched);
        let non_match = match_pattern(&seq, &rule.ante, &system, None, 2);
        assert!(!non_match.matched);
    }

    #[test]
    fn test_quantifier_one_or_more_minimality() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# a s t #", &system);
        let rule = parse_rule("C+ > :null: / _ #", &system).unwrap();
        let result = match_pattern(&seq, &rule.ante, &system, None, 2);
        assert!(result.matched);
        assert_eq!(result.span, 2);
    }

    #[test]
    fn test_quantifier_zero_or_one() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# a #", &system);
        let rule = parse_rule("V? > t", &system).unwrap();
        let at_boundary = match_pattern(&seq, &rule.ante, &system, None, 0);
        assert!(at_boundary.matched);
        assert_eq!(at_boundary.span, 0);
        let at_vowel = match_pattern(&seq, &rule.ante, &system, None, 1);
        assert!(at_vowel.matched);
        assert_eq!(at_vowel.span, 1);
    }

    #[test]
    fn test_negation_consumes_single_element() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# a #", &system);
        let rule = parse_rule("!p > t", &system).unwrap();
        let result = match_pattern(&seq, &rule.ante, &system, None, 1);
        assert!(result.matched);
        assert_eq!(result.span, 1);
        let fails_on_p = parse_sequence("# p #", &system);
        let result = match_pattern(&fails_on_p, &rule.ante, &system, None, 1);
        assert!(!result.matched);
    }

    #[test]
    fn test_negated_choice_binds_tighter_than_pipe() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("!p|b > t", &system).unwrap();
        let blocks_p = parse_sequence("# p #", &system);
        let blocks_b = parse_sequence("# b #", &system);
        let allows_t = parse_sequence("# t #", &system);
        assert!(!match_pattern(&blocks_p, &rule.ante, &system, None, 1).matched);
        assert!(!match_pattern(&blocks_b, &rule.ante, &system, None, 1).matched);
        assert!(match_pattern(&allows_t, &rule.ante, &system, None, 1).matched);
    }

    #[test]
    fn test_set_records_matched_alternative_index() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("{p|b} > {f|v}", &system).unwrap();
        let seq = parse_sequence("# b #", &system);
        let result = match_pattern(&seq, &rule.ante, &system, None, 1);
        assert!(result.matched);
        assert_eq!(result.set_indices[0], Some(1));
    }

    #[test]
    fn test_syllable_cond_tok_gates_on_onset() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# p a #", &system);
        let map = Syllabifier::default().syllabify(&seq);
        let rule = parse_rule("C > t / _.onset", &system).unwrap();
        let context = rule.context.unwrap();
        let result = match_pattern(&seq, &context, &system, Some(&map), 1);
        assert!(result.matched);
    }

    #[test]
    fn test_backref_resolves_against_ante_bindings() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# a t a #", &system);
        let rule = parse_rule("C > @1[+voiced] / V _ V", &system).unwrap();
        let ante_result = match_pattern(&seq, &rule.ante, &system, None, 2);
        assert!(ante_result.matched);
        let (left, right) = rule.context_split().unwrap();
        let reversed: Vec<Token> = left.iter().rev().cloned().collect();
        let left_ok = match_pattern_with_backrefs(&seq[..2], &reversed, &system, None, 1, BackrefMode::None);
        assert!(left_ok.matched);
        let right_ok = match_pattern_with_backrefs(
            &seq,
            right,
            &system,
            None,
            3,
            BackrefMode::Bound(&ante_result.bindings),
        );
        assert!(right_ok.matched);
    }

    #[test]
    fn test_backref_capture_mode_matches_any_sound() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# b #", &system);
        let pattern = vec![Token::BackRefTok {
            index: 0,
            modifier: None,
        }];
        let result = match_pattern_with_backrefs(&seq, &pattern, &system, None, 1, BackrefMode::Capture);
        assert!(result.matched);
        assert!(result.bindings[0].is_some());
    }

    use quickcheck::quickcheck;

    quickcheck! {
        // invariant 9: `C+` requires at least one match and matches greedily.
        fn prop_quantifier_one_or_more_requires_at_least_one(count: u8) -> bool {
            let system = FeatureSystem::default_system();
            let k = (count % 5) as usize;
            let mut toks = vec!["#".to_string()];
            for _ in 0..k {
                toks.push("p".to_string());
            }
            toks.push("#".to_string());
            let seq = parse_sequence(&toks.join(" "), &system);
            let rule = parse_rule("C+ > t / _ #", &system).unwrap();
            let result = match_pattern(&seq, &rule.ante, &system, None, 1);
            if k == 0 {
                !result.matched
            } else {
                result.matched && result.span == k
            }
        }
    }

    quickcheck! {
        // invariant 9: `V?` accepts zero or one match, never more.
        fn prop_quantifier_zero_or_one_accepts_at_most_one(count: u8) -> bool {
            let system = FeatureSystem::default_system();
            let k = (count % 4) as usize;
            let mut toks = vec!["#".to_string()];
            for _ in 0..k {
                toks.push("a".to_string());
            }
            toks.push("#".to_string());
            let seq = parse_sequence(&toks.join(" "), &system);
            let rule = parse_rule("V? > t / _ #", &system).unwrap();
            let result = match_pattern(&seq, &rule.ante, &system, None, 1);
            if k <= 1 {
                result.matched && result.span == k
            } else {
                // the remainder (boundary) can't follow a second vowel, so
                // the whole pattern fails rather than matching partially.
                !result.matched
            }
        }
    }
}
