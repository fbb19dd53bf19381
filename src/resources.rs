//! Resource loading: the three read-only tables a feature system is built
//! from (sounds, features, classes).
//!
//! Tables are plain tab-separated text with a header row, parsed once per
//! call into logically immutable maps: load once, hand back a read-only
//! lookup. The table text comes from the caller, or from the embedded
//! default set below, rather than being written out as Rust literals one
//! grapheme at a time.
//!
//! A sounds-table row's NAME column is the feature-value list for that
//! grapheme (comma-separated), e.g. `p	voiceless,consonantal,non-sonorant`
//! rather than a free-text description — "descriptive name" in the sense
//! that the values themselves describe the sound.

use crate::error::ResourceError;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// grapheme -> feature-value labels (parsed from the NAME column)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoundsTable {
    entries: HashMap<String, HashSet<String>>,
}

impl SoundsTable {
    /// Parse a `GRAPHEME\tNAME` table, where NAME is a comma-separated list
    /// of feature-value labels. Fails if a grapheme repeats.
    pub fn parse(text: &str) -> Result<SoundsTable, ResourceError> {
        let mut entries = HashMap::new();
        for (i, row) in data_rows(text, "sounds", 2)?.into_iter().enumerate() {
            let grapheme = row[0].to_string();
            let features: HashSet<String> =
                row[1].split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
            if entries.insert(grapheme.clone(), features).is_some() {
                return Err(ResourceError::new(format!(
                    "duplicate grapheme {:?} at sounds row {}",
                    grapheme, i
                )));
            }
        }
        Ok(SoundsTable { entries })
    }

    /// All graphemes known to this table.
    pub fn graphemes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The feature-value labels for `grapheme`, if known.
    pub fn features(&self, grapheme: &str) -> Option<&HashSet<String>> {
        self.entries.get(grapheme)
    }

    /// All (grapheme, feature set) pairs in the table.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.entries.iter().map(|(g, f)| (g.as_str(), f))
    }
}

/// value -> feature alias table: resolves a descriptive value word (e.g.
/// `"voiced"`) to the underlying feature dimension it belongs to (e.g.
/// `"voice"`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeaturesTable {
    values: HashMap<String, String>,
}

impl FeaturesTable {
    /// Parse a `VALUE\tFEATURE` table. Fails if a `(VALUE, FEATURE)` pair
    /// repeats verbatim, or if the same VALUE is bound to two different
    /// FEATUREs.
    pub fn parse(text: &str) -> Result<FeaturesTable, ResourceError> {
        let mut values = HashMap::new();
        for (i, row) in data_rows(text, "features", 2)?.into_iter().enumerate() {
            let value = row[0].to_string();
            let feature = row[1].to_string();
            if let Some(existing) = values.get(&value) {
                if existing == &feature {
                    return Err(ResourceError::new(format!(
                        "duplicate value {:?} for feature {:?} at features row {}",
                        value, feature, i
                    )));
                }
                return Err(ResourceError::new(format!(
                    "value {:?} bound to both {:?} and {:?}",
                    value, existing, feature
                )));
            }
            values.insert(value, feature);
        }
        Ok(FeaturesTable { values })
    }

    /// The feature dimension `value` belongs to, if known.
    pub fn feature_of(&self, value: &str) -> Option<&str> {
        self.values.get(value).map(String::as_str)
    }

    /// Invert the table into feature -> set of values.
    pub fn feature_values(&self) -> HashMap<String, HashSet<String>> {
        let mut out: HashMap<String, HashSet<String>> = HashMap::new();
        for (value, feature) in &self.values {
            out.entry(feature.clone()).or_default().insert(value.clone());
        }
        out
    }
}

/// A single sound class's definition: a human-readable description, the
/// features every member must carry, and (optionally) an explicit list of
/// member graphemes for cases the feature predicate alone can't capture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassDef {
    /// human-readable description, e.g. `"vowel"`
    pub description: String,
    /// the feature-value labels every member of the class must carry
    pub features: HashSet<String>,
    /// explicit member graphemes, supplementing (or in place of) `features`
    pub graphemes: HashSet<String>,
}

/// class-letter -> definition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassesTable {
    classes: HashMap<String, ClassDef>,
}

impl ClassesTable {
    /// Parse a `SOUND_CLASS\tDESCRIPTION\tFEATURES\tGRAPHEMES` table, where
    /// FEATURES and GRAPHEMES are comma-separated (either may be empty).
    /// Fails if SOUND_CLASS is not uppercase or repeats.
    pub fn parse(text: &str) -> Result<ClassesTable, ResourceError> {
        let mut classes = HashMap::new();
        for (i, row) in data_rows(text, "classes", 4)?.into_iter().enumerate() {
            let letter = row[0].to_string();
            if letter.is_empty() || !letter.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(ResourceError::new(format!(
                    "sound class {:?} at row {} is not ASCII uppercase",
                    letter, i
                )));
            }
            let def = ClassDef {
                description: row[1].to_string(),
                features: split_list(row[2]),
                graphemes: split_list(row[3]),
            };
            if classes.insert(letter.clone(), def).is_some() {
                return Err(ResourceError::new(format!(
                    "duplicate sound class {:?} at row {}",
                    letter, i
                )));
            }
        }
        Ok(ClassesTable { classes })
    }

    /// Whether `letter` names a known class.
    pub fn is_class(&self, letter: &str) -> bool {
        self.classes.contains_key(letter)
    }

    /// The required features for `letter`, if it names a known class.
    pub fn class_features(&self, letter: &str) -> Option<&HashSet<String>> {
        self.classes.get(letter).map(|d| &d.features)
    }

    /// The explicit member graphemes for `letter`, if it names a known
    /// class.
    pub fn class_graphemes(&self, letter: &str) -> Option<&HashSet<String>> {
        self.classes.get(letter).map(|d| &d.graphemes)
    }

    /// class -> required-features map over every known class.
    pub fn all_class_features(&self) -> HashMap<String, HashSet<String>> {
        self.classes
            .iter()
            .map(|(k, v)| (k.clone(), v.features.clone()))
            .collect()
    }

    /// class -> explicit-member-grapheme map over every known class.
    pub fn all_class_graphemes(&self) -> HashMap<String, HashSet<String>> {
        self.classes
            .iter()
            .map(|(k, v)| (k.clone(), v.graphemes.clone()))
            .collect()
    }
}

fn split_list(cell: &str) -> HashSet<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `text` into header + data rows, dropping the header, verifying
/// every data row has exactly `columns` tab-separated fields.
fn data_rows<'a>(
    text: &'a str,
    table_name: &str,
    columns: usize,
) -> Result<Vec<Vec<&'a str>>, ResourceError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    if lines.next().is_none() {
        return Err(ResourceError::new(format!("{} table is missing a header row", table_name)));
    }
    let mut rows = Vec::new();
    for (i, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != columns {
            return Err(ResourceError::new(format!(
                "{} table row {} has {} fields, expected {}",
                table_name,
                i,
                fields.len(),
                columns
            )));
        }
        rows.push(fields);
    }
    Ok(rows)
}

/// All three tables bundled together, as consumed by a `FeatureSystem`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceTables {
    pub sounds: SoundsTable,
    pub features: FeaturesTable,
    pub classes: ClassesTable,
}

impl ResourceTables {
    /// Parse all three tables from caller-supplied text. This is a pure
    /// parse — no caching — callers that want memoization hold onto the
    /// returned value themselves.
    pub fn parse(
        sounds_text: &str,
        features_text: &str,
        classes_text: &str,
    ) -> Result<ResourceTables, ResourceError> {
        Ok(ResourceTables {
            sounds: SoundsTable::parse(sounds_text)?,
            features: FeaturesTable::parse(features_text)?,
            classes: ClassesTable::parse(classes_text)?,
        })
    }
}

lazy_static! {
    /// The embedded default resource set: a small General-American-style
    /// inventory, loaded once per process.
    static ref DEFAULT_TABLES: ResourceTables =
        ResourceTables::parse(DEFAULT_SOUNDS, DEFAULT_FEATURES, DEFAULT_CLASSES)
            .expect("embedded default resource tables are well-formed");
}

/// The embedded default resource set.
pub fn default_tables() -> &'static ResourceTables {
    &DEFAULT_TABLES
}

const DEFAULT_SOUNDS: &str = "GRAPHEME\tNAME
p\tvoiceless,consonantal,non-sonorant,non-syllabic,non-continuant
b\tvoiced,consonantal,non-sonorant,non-syllabic,non-continuant
t\tvoiceless,consonantal,non-sonorant,non-syllabic,non-continuant,anterior,non-distrib
d\tvoiced,consonantal,non-sonorant,non-syllabic,non-continuant,anterior,non-distrib
k\tvoiceless,consonantal,non-sonorant,non-syllabic,non-continuant,back
g\tvoiced,consonantal,non-sonorant,non-syllabic,non-continuant,back
m\tvoiced,consonantal,sonorant,non-syllabic,non-continuant,nasal
n\tvoiced,consonantal,sonorant,non-syllabic,non-continuant,nasal,anterior,non-distrib
ŋ\tvoiced,consonantal,sonorant,non-syllabic,non-continuant,nasal,back
f\tvoiceless,consonantal,non-sonorant,non-syllabic,continuant,non-strident
v\tvoiced,consonantal,non-sonorant,non-syllabic,continuant,non-strident
θ\tvoiceless,consonantal,non-sonorant,non-syllabic,continuant,non-strident,anterior,distrib
ð\tvoiced,consonantal,non-sonorant,non-syllabic,continuant,non-strident,anterior,distrib
s\tvoiceless,consonantal,non-sonorant,non-syllabic,continuant,strident,anterior,non-distrib
z\tvoiced,consonantal,non-sonorant,non-syllabic,continuant,strident,anterior,non-distrib
ʃ\tvoiceless,consonantal,non-sonorant,non-syllabic,continuant,strident,non-anterior,distrib
ʒ\tvoiced,consonantal,non-sonorant,non-syllabic,continuant,strident,non-anterior,distrib
h\tvoiceless,non-consonantal,non-sonorant,non-syllabic,continuant,spread-glottis
l\tvoiced,consonantal,sonorant,non-syllabic,continuant,lateral,anterior,non-distrib
ɹ\tvoiced,consonantal,sonorant,non-syllabic,continuant,rhotic
j\tvoiced,non-consonantal,sonorant,non-syllabic,continuant,high,non-low,non-back
w\tvoiced,non-consonantal,sonorant,non-syllabic,continuant,high,non-low,back,round
a\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,low,non-back
i\tvoiced,non-consonantal,sonorant,syllabic,continuant,high,non-low,non-back,atr
ɪ\tvoiced,non-consonantal,sonorant,syllabic,continuant,high,non-low,non-back
e\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,non-low,non-back,atr
ɛ\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,non-low,non-back
æ\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,low,non-back
ə\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,non-low,non-back
ʌ\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,non-low,back
ɑ\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,low,back
u\tvoiced,non-consonantal,sonorant,syllabic,continuant,high,non-low,back,round,atr
ʊ\tvoiced,non-consonantal,sonorant,syllabic,continuant,high,non-low,back,round
o\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,non-low,back,round,atr
ɔ\tvoiced,non-consonantal,sonorant,syllabic,continuant,non-high,non-low,back,round
";

const DEFAULT_FEATURES: &str = "VALUE\tFEATURE
voiced\tvoice
voiceless\tvoice
nasal\tnasal
lateral\tlateral
rhotic\trhotic
strident\tstrident
non-strident\tstrident
continuant\tcontinuant
non-continuant\tcontinuant
consonantal\tconsonantal
non-consonantal\tconsonantal
sonorant\tsonorant
non-sonorant\tsonorant
syllabic\tsyllabic
non-syllabic\tsyllabic
anterior\tanterior
non-anterior\tanterior
distrib\tdistrib
non-distrib\tdistrib
high\thigh
non-high\thigh
low\tlow
non-low\tlow
back\tback
non-back\tback
round\tround
atr\tatr
spread-glottis\tspread_glottis
constricted-glottis\tconstricted_glottis
";

const DEFAULT_CLASSES: &str = "SOUND_CLASS\tDESCRIPTION\tFEATURES\tGRAPHEMES
V\tvowel\tsyllabic\t
C\tconsonant\tnon-syllabic\t
N\tnasal consonant\tnasal\t
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sounds_table_parse() {
        let t = SoundsTable::parse("GRAPHEME\tNAME\np\tvoiceless,consonantal\n").unwrap();
        let p = t.features("p").unwrap();
        assert!(p.contains("voiceless"));
        assert!(p.contains("consonantal"));
    }

    #[test]
    fn test_sounds_table_duplicate_grapheme_errors() {
        let err = SoundsTable::parse("GRAPHEME\tNAME\np\tvoiceless\np\tvoiced\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_features_table_feature_values() {
        let t = FeaturesTable::parse("VALUE\tFEATURE\nvoiced\tvoice\nvoiceless\tvoice\n").unwrap();
        let inv = t.feature_values();
        assert_eq!(inv.get("voice").unwrap().len(), 2);
    }

    #[test]
    fn test_classes_table_rejects_lowercase() {
        let err = ClassesTable::parse("SOUND_CLASS\tDESCRIPTION\tFEATURES\tGRAPHEMES\nv\tvowel\tsyllabic\t\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_classes_table_parses_class_features() {
        let t = ClassesTable::parse(
            "SOUND_CLASS\tDESCRIPTION\tFEATURES\tGRAPHEMES\nV\tvowel\tsyllabic\t\n",
        )
        .unwrap();
        assert!(t.is_class("V"));
        assert!(t.class_features("V").unwrap().contains("syllabic"));
    }

    #[test]
    fn test_default_tables_load() {
        let tables = default_tables();
        assert!(tables.sounds.features("p").is_some());
        assert!(tables.classes.is_class("V"));
        assert!(tables.classes.is_class("C"));
    }
}
