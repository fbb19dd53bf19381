//! Feature geometry: a hierarchical organization of phonological feature
//! contrasts (Clements & Hume 1995).
//!
//! Sibling features under the same parent are mutually exclusive — marking
//! a segment `[+high]` should drop any `[+low]` it carried, because `high`
//! and `low` are siblings under `dorsal`. The tree also gives a notion of
//! distance between two feature labels (how many edges separate them) and,
//! from that, a distance between two whole feature sets, used to pick the
//! closest grapheme for a reconstructed sound.
//!
//! The shape of the default tree mirrors the feature dependencies sketched
//! out informally for General American English: root contrasts
//! (consonantal/sonorant/syllabic) sit directly on the segment, place
//! features fan out under a `place` node into labial/coronal/dorsal/
//! pharyngeal, and a handful of non-place autosegmental features (nasal,
//! lateral, rhotic, continuant, strident, laryngeal) hang off the segment
//! alongside place.

use std::collections::HashSet;

/// Tree-edge distance returned for a pair where at least one label is
/// unknown to the geometry.
pub const UNKNOWN_DISTANCE: u32 = 1_000;

/// A node in the feature geometry tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A leaf describing one contrastive (or unary) feature, with its two
    /// polar-opposite labels. Unary features (e.g. `nasal`) still carry a
    /// synthetic `negative` label so that sibling exclusivity can be
    /// expressed uniformly; the synthetic label is never produced by a
    /// feature system and so never needs removing.
    Feature {
        /// name of the underlying dimension, e.g. `"voice"`
        name: String,
        /// the marked label, e.g. `"voiced"`
        positive: String,
        /// the unmarked label, e.g. `"voiceless"`
        negative: String,
    },
    /// An internal node grouping features (or further groups) that share a
    /// place of articulation or other structural dependency.
    Geometry {
        /// name of the group, e.g. `"dorsal"`
        name: String,
        /// child nodes, in no particular order
        children: Vec<Node>,
    },
}

impl Node {
    fn feature(name: &str, positive: &str, negative: &str) -> Node {
        Node::Feature {
            name: name.to_string(),
            positive: positive.to_string(),
            negative: negative.to_string(),
        }
    }

    fn geometry(name: &str, children: Vec<Node>) -> Node {
        Node::Geometry {
            name: name.to_string(),
            children,
        }
    }

    fn labels(&self) -> Vec<&str> {
        match self {
            Node::Feature {
                positive, negative, ..
            } => vec![positive.as_str(), negative.as_str()],
            Node::Geometry { children, .. } => {
                children.iter().flat_map(Node::labels).collect()
            }
        }
    }

    fn children(&self) -> &[Node] {
        match self {
            Node::Feature { .. } => &[],
            Node::Geometry { children, .. } => children,
        }
    }
}

/// A feature geometry tree: a single rooted [`Node::Geometry`] describing
/// every known feature label and its structural dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    root: Node,
}

impl Geometry {
    /// Build a geometry from an explicit root. The root is conventionally a
    /// [`Node::Geometry`], though a single [`Node::Feature`] is accepted
    /// too (a degenerate, flat geometry).
    pub fn new(root: Node) -> Geometry {
        Geometry { root }
    }

    /// The default Clements & Hume style geometry used when no other
    /// geometry is supplied to a feature system: root contrasts on the
    /// segment, a `place` node fanning into labial/coronal/dorsal/
    /// pharyngeal, and the remaining autosegmental features (continuant,
    /// strident, lateral, nasal, rhotic, laryngeal) as direct children of
    /// the segment, alongside place.
    pub fn default_geometry() -> Geometry {
        let labial = Node::geometry("labial", vec![Node::feature("round", "round", "non-round")]);
        let coronal = Node::geometry(
            "coronal",
            vec![
                Node::feature("anterior", "anterior", "non-anterior"),
                Node::feature("distrib", "distrib", "non-distrib"),
            ],
        );
        let dorsal = Node::geometry(
            "dorsal",
            vec![
                Node::feature("high", "high", "non-high"),
                Node::feature("low", "low", "non-low"),
                Node::feature("back", "back", "non-back"),
            ],
        );
        let pharyngeal = Node::geometry(
            "pharyngeal",
            vec![Node::feature("atr", "atr", "non-atr")],
        );
        let place = Node::geometry("place", vec![labial, coronal, dorsal, pharyngeal]);

        let laryngeal = Node::geometry(
            "laryngeal",
            vec![
                Node::feature("spread_glottis", "spread-glottis", "non-spread-glottis"),
                Node::feature(
                    "constricted_glottis",
                    "constricted-glottis",
                    "non-constricted-glottis",
                ),
                Node::feature("voice", "voiced", "voiceless"),
            ],
        );

        let root = Node::geometry(
            "segment",
            vec![
                Node::feature("consonantal", "consonantal", "non-consonantal"),
                Node::feature("sonorant", "sonorant", "non-sonorant"),
                Node::feature("syllabic", "syllabic", "non-syllabic"),
                place,
                Node::feature("continuant", "continuant", "non-continuant"),
                Node::feature("strident", "strident", "non-strident"),
                Node::feature("lateral", "lateral", "non-lateral"),
                Node::feature("nasal", "nasal", "non-nasal"),
                laryngeal,
                Node::feature("rhotic", "rhotic", "non-rhotic"),
            ],
        );

        Geometry::new(root)
    }

    /// Every feature label (positive or negative) known to the tree.
    pub fn all_features(&self) -> HashSet<String> {
        self.root.labels().into_iter().map(str::to_string).collect()
    }

    /// The feature node whose positive or negative label equals `label`.
    pub fn find_feature(&self, label: &str) -> Option<&Node> {
        find_feature_rec(&self.root, label)
    }

    /// The geometry node that directly contains the feature node for
    /// `label` among its children, if one exists.
    pub fn find_parent(&self, label: &str) -> Option<&Node> {
        find_parent_rec(&self.root, label)
    }

    /// Labels of all features under the same parent as `label`, excluding
    /// `label` itself, but including `label`'s own polar opposite. Returns
    /// an empty set if `label` is unknown or is the root.
    pub fn siblings_of(&self, label: &str) -> HashSet<String> {
        match self.find_parent(label) {
            None => HashSet::new(),
            Some(parent) => parent
                .children()
                .iter()
                .flat_map(Node::labels)
                .filter(|l| *l != label)
                .map(str::to_string)
                .collect(),
        }
    }

    /// Tree-edge distance between two labels: `depth(a) + depth(b) -
    /// 2*depth(lca(a,b))`. Returns [`UNKNOWN_DISTANCE`] if either label is
    /// not known to the tree.
    pub fn feature_distance(&self, a: &str, b: &str) -> u32 {
        let path_a = match path_to(&self.root, a) {
            Some(p) => p,
            None => return UNKNOWN_DISTANCE,
        };
        let path_b = match path_to(&self.root, b) {
            Some(p) => p,
            None => return UNKNOWN_DISTANCE,
        };

        let common = path_a
            .iter()
            .zip(path_b.iter())
            .take_while(|(x, y)| x == y)
            .count();

        ((path_a.len() - common) + (path_b.len() - common)) as u32
    }

    /// Depth (in tree edges from the root) of the node carrying `label`, or
    /// `None` if `label` is unknown.
    pub fn depth(&self, label: &str) -> Option<u32> {
        path_to(&self.root, label).map(|p| (p.len() - 1) as u32)
    }

    /// Symmetric-difference distance between two feature sets, weighted so
    /// that deeper (more specific) features contribute less. Identical
    /// sets distance to `0.0`; sets with no labels in common distance to at
    /// most `1.0`.
    pub fn sound_distance(&self, a: &HashSet<String>, b: &HashSet<String>) -> f64 {
        let union: HashSet<&String> = a.union(b).collect();
        if union.is_empty() {
            return 0.0;
        }
        let sym_diff: HashSet<&String> = a.symmetric_difference(b).collect();

        let weight = |label: &str| -> f64 {
            let depth = self.depth(label).unwrap_or(0) as f64;
            1.0 / (1.0 + depth)
        };

        let numerator: f64 = sym_diff.iter().map(|l| weight(l)).sum();
        let denominator: f64 = union.iter().map(|l| weight(l)).sum();

        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

fn find_feature_rec<'a>(node: &'a Node, label: &str) -> Option<&'a Node> {
    match node {
        Node::Feature {
            positive, negative, ..
        } => {
            if positive == label || negative == label {
                Some(node)
            } else {
                None
            }
        }
        Node::Geometry { children, .. } => {
            children.iter().find_map(|c| find_feature_rec(c, label))
        }
    }
}

fn find_parent_rec<'a>(node: &'a Node, label: &str) -> Option<&'a Node> {
    match node {
        Node::Feature { .. } => None,
        Node::Geometry { children, .. } => {
            if children.iter().any(|c| is_feature_for(c, label)) {
                Some(node)
            } else {
                children.iter().find_map(|c| find_parent_rec(c, label))
            }
        }
    }
}

fn is_feature_for(node: &Node, label: &str) -> bool {
    matches!(node, Node::Feature { positive, negative, .. } if positive == label || negative == label)
}

/// Path of node names from the root down to (and including) the node
/// carrying `label`, used to compute tree distance via longest common
/// prefix. Returns `None` if `label` is not found.
fn path_to<'a>(node: &'a Node, label: &str) -> Option<Vec<&'a str>> {
    match node {
        Node::Feature {
            name,
            positive,
            negative,
        } => {
            if positive == label || negative == label {
                Some(vec![name.as_str()])
            } else {
                None
            }
        }
        Node::Geometry { name, children } => {
            for child in children {
                if let Some(mut rest) = path_to(child, label) {
                    let mut path = vec![name.as_str()];
                    path.append(&mut rest);
                    return Some(path);
                }
            }
            None
        }
    }
}
