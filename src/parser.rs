//! Turns rule text into an immutable [`Rule`], and segment-sequence text
//! into an immutable [`Element`] sequence.
//!
//! A small hand-written recursive-descent tokenizer: no parser-combinator
//! or grammar-description-language dependency.

use crate::element::{Boundary, Element, Sound};
use crate::error::ParseError;
use crate::feature_system::{parse_modifiers, FeatureSystem};
use crate::token::{Quantifier, Rule, SyllablePosition, Token};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Ante,
    Post,
    Context,
}

/// Parse whitespace-separated segment-sequence text into an element
/// sequence against `system`. Never fails: a grapheme outside `system`'s
/// inventory becomes a [`Sound::unknown`].
///
/// Input is brought to Unicode NFC first, so that a combining-diacritic
/// grapheme (e.g. a precomposed vowel entered as base + combining accent)
/// matches the same inventory entry as its precomposed form.
pub fn parse_sequence(text: &str, system: &FeatureSystem) -> Vec<Element> {
    let normalized: String = text.nfc().collect();
    normalized
        .split_whitespace()
        .map(|tok| {
            if tok == "#" {
                Element::Boundary(Boundary::word())
            } else {
                match system.grapheme_to_features(tok) {
                    Some(features) => Element::Sound(Sound::concrete(tok, features)),
                    None => Element::Sound(Sound::unknown(tok)),
                }
            }
        })
        .collect()
}

/// Parse `ANTE ( '>' | '→' | '->' ) POST [ '/' CONTEXT ]` into a [`Rule`]
/// against `system`.
pub fn parse_rule(text: &str, system: &FeatureSystem) -> Result<Rule, ParseError> {
    let nfc_text: String = text.nfc().collect();
    let raw_tokens: Vec<&str> = nfc_text.split_whitespace().collect();
    let normalized_source = raw_tokens.join(" ");

    let arrow_idx = raw_tokens
        .iter()
        .position(|t| matches!(*t, ">" | "→" | "->"))
        .ok_or_else(|| {
            ParseError::new("rule must contain '>', '→', or '->' between ante and post")
        })?;

    let ante_raw = &raw_tokens[..arrow_idx];
    let after_arrow = &raw_tokens[arrow_idx + 1..];
    let slash_idx = after_arrow.iter().position(|t| *t == "/");
    let (post_raw, context_raw) = match slash_idx {
        Some(i) => (&after_arrow[..i], Some(&after_arrow[i + 1..])),
        None => (&after_arrow[..], None),
    };

    if ante_raw.is_empty() {
        return Err(ParseError::at(0, "ante must not be empty"));
    }

    let post_offset = arrow_idx + 1;
    let context_offset = slash_idx.map(|i| post_offset + i + 1);

    let ante = parse_token_sequence(ante_raw, 0, Position::Ante, system)?;
    let post = parse_token_sequence(post_raw, post_offset, Position::Post, system)?;
    let context = match (context_raw, context_offset) {
        (Some(raw), Some(offset)) => {
            Some(parse_token_sequence(raw, offset, Position::Context, system)?)
        }
        _ => None,
    };

    validate_rule(&ante, &post, &context)?;

    Ok(Rule {
        source: normalized_source,
        ante,
        post,
        context,
    })
}

fn parse_token_sequence(
    tokens: &[&str],
    base_index: usize,
    position: Position,
    system: &FeatureSystem,
) -> Result<Vec<Token>, ParseError> {
    let mut result = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        result.extend(parse_one_token(tok, base_index + i, position, system)?);
    }
    Ok(result)
}

fn parse_one_token(
    tok: &str,
    index: usize,
    position: Position,
    system: &FeatureSystem,
) -> Result<Vec<Token>, ParseError> {
    if let Some(pos) = syllable_position_suffix(tok) {
        if position != Position::Context {
            return Err(ParseError::at(
                index,
                "syllable-position focus is only legal in context",
            ));
        }
        return Ok(vec![Token::SyllableCondTok(pos), Token::FocusTok]);
    }
    if tok == "_" {
        if position != Position::Context {
            return Err(ParseError::at(
                index,
                "focus token '_' is only legal in context",
            ));
        }
        return Ok(vec![Token::FocusTok]);
    }
    Ok(vec![parse_generic_token(tok, index, position, system)?])
}

fn syllable_position_suffix(tok: &str) -> Option<SyllablePosition> {
    match tok {
        "_.onset" => Some(SyllablePosition::Onset),
        "_.nucleus" => Some(SyllablePosition::Nucleus),
        "_.coda" => Some(SyllablePosition::Coda),
        _ => None,
    }
}

/// Parse a single pattern token: strips a trailing quantifier, then
/// resolves a set, a negated (possibly pipe-chained) choice, a bare
/// choice, or an atomic token, in that precedence order. `!` is resolved
/// before `|`-splitting: `!p|b` negates the whole choice `p|b`.
fn parse_generic_token(
    tok: &str,
    index: usize,
    position: Position,
    system: &FeatureSystem,
) -> Result<Token, ParseError> {
    let (body, quantifier) = strip_quantifier(tok);

    let base_token = if body.starts_with('{') && body.ends_with('}') && body.len() >= 2 {
        let inner = &body[1..body.len() - 1];
        let alts = inner
            .split('|')
            .map(|alt| parse_atomic(alt, index, position, system))
            .collect::<Result<Vec<_>, _>>()?;
        Token::SetTok(alts)
    } else if let Some(rest) = body.strip_prefix('!') {
        let inner = if rest.contains('|') {
            let alts = rest
                .split('|')
                .map(|alt| parse_atomic(alt, index, position, system))
                .collect::<Result<Vec<_>, _>>()?;
            Token::ChoiceTok(alts)
        } else {
            parse_atomic(rest, index, position, system)?
        };
        Token::NegationTok(Box::new(inner))
    } else if body.contains('|') {
        let alts = body
            .split('|')
            .map(|alt| parse_atomic(alt, index, position, system))
            .collect::<Result<Vec<_>, _>>()?;
        Token::ChoiceTok(alts)
    } else {
        parse_atomic(body, index, position, system)?
    };

    match quantifier {
        Some(q) => {
            if !base_token.is_primitive() {
                return Err(ParseError::at(
                    index,
                    "quantifier may only apply to a primitive token",
                ));
            }
            Ok(Token::QuantifiedTok {
                inner: Box::new(base_token),
                quantifier: q,
            })
        }
        None => Ok(base_token),
    }
}

fn strip_quantifier(tok: &str) -> (&str, Option<Quantifier>) {
    if let Some(stripped) = tok.strip_suffix('+') {
        (stripped, Some(Quantifier::OneOrMore))
    } else if let Some(stripped) = tok.strip_suffix('?') {
        (stripped, Some(Quantifier::ZeroOrOne))
    } else {
        (tok, None)
    }
}

fn parse_atomic(
    text: &str,
    index: usize,
    position: Position,
    system: &FeatureSystem,
) -> Result<Token, ParseError> {
    if text.is_empty() {
        return Err(ParseError::at(index, "empty token"));
    }
    if text == "#" {
        return Ok(Token::boundary());
    }
    if text == ":null:" {
        return Ok(Token::EmptyTok);
    }
    if text == "_" {
        return Err(ParseError::at(index, "focus token is not allowed here"));
    }
    if let Some(rest) = text.strip_prefix('@') {
        return parse_backref(rest, index, position);
    }

    if let Some(bracket_at) = text.find('[') {
        if !text.ends_with(']') {
            return Err(ParseError::at(index, "unbalanced modifier brackets"));
        }
        let letter = &text[..bracket_at];
        let mods_text = &text[bracket_at + 1..text.len() - 1];
        if is_class_letter(letter) && system.is_class(letter) {
            let base = system.class_features(letter).unwrap();
            let mods = parse_modifiers(mods_text);
            let features = system.add_features(&base, &mods);
            return Ok(Token::SegmentTok(Sound::partial(letter, features)));
        }
        return Err(ParseError::at(
            index,
            format!("unknown sound class {:?}", letter),
        ));
    }

    if is_class_letter(text) && system.is_class(text) {
        let features = system.class_features(text).unwrap();
        return Ok(Token::SegmentTok(Sound::partial(text, features)));
    }

    match system.grapheme_to_features(text) {
        Some(features) => Ok(Token::SegmentTok(Sound::concrete(text, features))),
        None => Ok(Token::SegmentTok(Sound::concrete(text, HashSet::new()))),
    }
}

fn is_class_letter(text: &str) -> bool {
    text.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

fn parse_backref(rest: &str, index: usize, position: Position) -> Result<Token, ParseError> {
    if position == Position::Ante {
        return Err(ParseError::at(index, "back-reference is not legal in ante"));
    }
    let (num_str, modifier) = if let Some(bracket_at) = rest.find('[') {
        if !rest.ends_with(']') {
            return Err(ParseError::at(
                index,
                "unbalanced back-reference modifier brackets",
            ));
        }
        (
            &rest[..bracket_at],
            Some(rest[bracket_at + 1..rest.len() - 1].to_string()),
        )
    } else {
        (rest, None)
    };
    let n: usize = num_str.parse().map_err(|_| {
        ParseError::at(index, "back-reference index must be a positive integer")
    })?;
    if n == 0 {
        return Err(ParseError::at(
            index,
            "back-reference index is 1-based and must be >= 1",
        ));
    }
    Ok(Token::BackRefTok {
        index: n - 1,
        modifier,
    })
}

fn validate_rule(
    ante: &[Token],
    post: &[Token],
    context: &Option<Vec<Token>>,
) -> Result<(), ParseError> {
    if let Some(ctx) = context {
        let focus_count = ctx.iter().filter(|t| matches!(t, Token::FocusTok)).count();
        if focus_count > 1 {
            return Err(ParseError::new(
                "context may contain at most one focus token",
            ));
        }
    }

    let ante_sets: Vec<usize> = ante
        .iter()
        .filter_map(|t| match t {
            Token::SetTok(v) => Some(v.len()),
            _ => None,
        })
        .collect();
    let post_sets: Vec<usize> = post
        .iter()
        .filter_map(|t| match t {
            Token::SetTok(v) => Some(v.len()),
            _ => None,
        })
        .collect();
    if ante_sets != post_sets {
        return Err(ParseError::new(
            "correspondence sets in ante and post must be parallel in length",
        ));
    }

    let mut backrefs = Vec::new();
    for t in post.iter().chain(context.iter().flatten()) {
        collect_backref_indices(t, &mut backrefs);
    }
    for idx in backrefs {
        if idx >= ante.len() {
            return Err(ParseError::new(format!(
                "back-reference @{} has no matching ante position",
                idx + 1
            )));
        }
    }

    Ok(())
}

fn collect_backref_indices(token: &Token, out: &mut Vec<usize>) {
    match token {
        Token::BackRefTok { index, .. } => out.push(*index),
        Token::ChoiceTok(alts) | Token::SetTok(alts) => {
            for alt in alts {
                collect_backref_indices(alt, out);
            }
        }
        Token::QuantifiedTok { inner, .. } | Token::NegationTok(inner) => {
            collect_backref_indices(inner, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use crate::feature_system::FeatureSystem;

    #[test]
    fn test_parse_sequence_basic() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("# a p a #", &system);
        assert_eq!(seq.len(), 5);
        assert!(seq[0].is_boundary());
        assert!(seq[1].is_sound());
    }

    #[test]
    fn test_parse_sequence_unknown_grapheme() {
        let system = FeatureSystem::default_system();
        let seq = parse_sequence("ǂ", &system);
        match &seq[0] {
            Element::Sound(s) => assert!(s.features.is_empty()),
            _ => panic!("expected sound"),
        }
    }

    #[test]
    fn test_parse_rule_intervocalic_voicing() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("p > b / V _ V", &system).unwrap();
        assert_eq!(rule.ante.len(), 1);
        assert_eq!(rule.post.len(), 1);
        let context = rule.context.unwrap();
        assert_eq!(context.len(), 3);
        assert!(matches!(context[1], Token::FocusTok));
    }

    #[test]
    fn test_parse_rule_backreference_voicing() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("C > @1[+voiced] / V _ V", &system).unwrap();
        match &rule.post[0] {
            Token::BackRefTok { index, modifier } => {
                assert_eq!(*index, 0);
                assert_eq!(modifier.as_deref(), Some("+voiced"));
            }
            other => panic!("expected BackRefTok, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rule_correspondence_set() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("{p|b} > {f|v}", &system).unwrap();
        match (&rule.ante[0], &rule.post[0]) {
            (Token::SetTok(a), Token::SetTok(b)) => {
                assert_eq!(a.len(), 2);
                assert_eq!(b.len(), 2);
            }
            other => panic!("expected parallel SetTok, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rule_quantified_cluster_deletion() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("C+ > :null: / _ #", &system).unwrap();
        assert!(matches!(
            rule.ante[0],
            Token::QuantifiedTok {
                quantifier: Quantifier::OneOrMore,
                ..
            }
        ));
        assert!(matches!(rule.post[0], Token::EmptyTok));
    }

    #[test]
    fn test_parse_rule_syllable_condition() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("C > @1[+voiced] / _.onset", &system).unwrap();
        let context = rule.context.unwrap();
        assert!(matches!(
            context[0],
            Token::SyllableCondTok(SyllablePosition::Onset)
        ));
        assert!(matches!(context[1], Token::FocusTok));
    }

    #[test]
    fn test_parse_rule_negated_choice_binds_tighter() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("!p|b > t", &system).unwrap();
        match &rule.ante[0] {
            Token::NegationTok(inner) => {
                assert!(matches!(**inner, Token::ChoiceTok(_)));
            }
            other => panic!("expected NegationTok wrapping a choice, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rule_empty_ante_is_illegal() {
        let system = FeatureSystem::default_system();
        assert!(parse_rule("> b / V _ V", &system).is_err());
    }

    #[test]
    fn test_parse_rule_focus_outside_context_is_illegal() {
        let system = FeatureSystem::default_system();
        assert!(parse_rule("_ > b", &system).is_err());
    }

    #[test]
    fn test_parse_rule_mismatched_set_arity_is_illegal() {
        let system = FeatureSystem::default_system();
        assert!(parse_rule("{p|b|t} > {f|v}", &system).is_err());
    }

    #[test]
    fn test_parse_rule_backref_into_ante_is_illegal() {
        let system = FeatureSystem::default_system();
        assert!(parse_rule("@1 > b", &system).is_err());
    }

    #[test]
    fn test_parse_rule_quantifier_on_choice_is_illegal() {
        let system = FeatureSystem::default_system();
        assert!(parse_rule("p|b+ > t", &system).is_err());
    }

    #[test]
    fn test_parse_rule_unicode_arrow() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("p → b", &system).unwrap();
        assert_eq!(rule.ante.len(), 1);
        assert_eq!(rule.post.len(), 1);
    }

    #[test]
    fn test_parse_rule_round_trip_source() {
        let system = FeatureSystem::default_system();
        let rule = parse_rule("p  >   b   /  V _ V", &system).unwrap();
        assert_eq!(rule.source, "p > b / V _ V");
    }

    const ALPHABET: &[&str] = &["a", "i", "p", "t", "s", "n"];

    fn grapheme_from(byte: u8) -> &'static str {
        ALPHABET[(byte as usize) % ALPHABET.len()]
    }

    fn sequence_text_from(bytes: &[u8]) -> String {
        let mut toks = vec!["#".to_string()];
        for &b in bytes.iter().take(8) {
            toks.push(grapheme_from(b).to_string());
        }
        toks.push("#".to_string());
        toks.join(" ")
    }

    quickcheck! {
        // invariant 2: sequence round-trip.
        fn prop_sequence_round_trip(bytes: Vec<u8>) -> bool {
            let system = FeatureSystem::default_system();
            let text = sequence_text_from(&bytes);
            let seq = parse_sequence(&text, &system);
            crate::element::render(&seq) == text
        }
    }

    quickcheck! {
        // invariant 1: parse round-trip, for the subset of rule texts this
        // generator can produce (a single-grapheme ante and post, connected
        // by '>', whitespace-normalized).
        fn prop_rule_round_trip(a: u8, b: u8) -> bool {
            let system = FeatureSystem::default_system();
            let text = format!("{} > {}", grapheme_from(a), grapheme_from(b));
            match parse_rule(&text, &system) {
                Ok(rule) => rule.source == text,
                Err(_) => false,
            }
        }
    }
}
