//! Character decomposition trees.
//!
//! A decomposition string is written in prefix form: an ideographic
//! description character is followed by its two or three operands, and
//! every other character is a leaf component. A leaf may carry a variant
//! annotation such as `[2]`, which is accepted and dropped.
//!
//! ```text
//! ⿰亻⿱木[1]？
//! ```

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DecompositionError;
use crate::median::Median;

/// Written form of an unknown component.
pub const UNKNOWN_COMPONENT: char = '？';

/// Ideographic description characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "char", try_from = "char")]
pub enum Operator {
    LeftToRight,
    TopToBottom,
    Surround,
    SurroundFromAbove,
    SurroundFromBelow,
    SurroundFromLeft,
    SurroundFromUpperLeft,
    SurroundFromUpperRight,
    SurroundFromLowerLeft,
    Overlaid,
    LeftToMiddleToRight,
    TopToMiddleToBottom,
    SurroundFromRight,
    SurroundFromLowerRight,
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::LeftToRight,
        Operator::TopToBottom,
        Operator::Surround,
        Operator::SurroundFromAbove,
        Operator::SurroundFromBelow,
        Operator::SurroundFromLeft,
        Operator::SurroundFromUpperLeft,
        Operator::SurroundFromUpperRight,
        Operator::SurroundFromLowerLeft,
        Operator::Overlaid,
        Operator::LeftToMiddleToRight,
        Operator::TopToMiddleToBottom,
        Operator::SurroundFromRight,
        Operator::SurroundFromLowerRight,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.to_char() == c)
    }

    pub fn to_char(self) -> char {
        match self {
            Operator::LeftToRight => '⿰',
            Operator::TopToBottom => '⿱',
            Operator::Surround => '⿴',
            Operator::SurroundFromAbove => '⿵',
            Operator::SurroundFromBelow => '⿶',
            Operator::SurroundFromLeft => '⿷',
            Operator::SurroundFromUpperLeft => '⿸',
            Operator::SurroundFromUpperRight => '⿹',
            Operator::SurroundFromLowerLeft => '⿺',
            Operator::Overlaid => '⿻',
            Operator::LeftToMiddleToRight => '⿲',
            Operator::TopToMiddleToBottom => '⿳',
            Operator::SurroundFromRight => '⿼',
            Operator::SurroundFromLowerRight => '⿽',
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Operator::LeftToMiddleToRight | Operator::TopToMiddleToBottom => 3,
            _ => 2,
        }
    }

    /// Boxes of the operands within the unit square, y down.
    pub fn layout(self) -> Vec<Rect> {
        const FULL: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let third = 1.0 / 3.0;
        match self {
            Operator::LeftToRight => vec![Rect::new(0.0, 0.0, 0.5, 1.0), Rect::new(0.5, 0.0, 1.0, 1.0)],
            Operator::TopToBottom => vec![Rect::new(0.0, 0.0, 1.0, 0.5), Rect::new(0.0, 0.5, 1.0, 1.0)],
            Operator::LeftToMiddleToRight => vec![
                Rect::new(0.0, 0.0, third, 1.0),
                Rect::new(third, 0.0, 2.0 * third, 1.0),
                Rect::new(2.0 * third, 0.0, 1.0, 1.0),
            ],
            Operator::TopToMiddleToBottom => vec![
                Rect::new(0.0, 0.0, 1.0, third),
                Rect::new(0.0, third, 1.0, 2.0 * third),
                Rect::new(0.0, 2.0 * third, 1.0, 1.0),
            ],
            Operator::Overlaid => vec![FULL, FULL],
            Operator::Surround => vec![FULL, Rect::new(0.25, 0.25, 0.75, 0.75)],
            Operator::SurroundFromAbove => vec![FULL, Rect::new(0.25, 0.5, 0.75, 1.0)],
            Operator::SurroundFromBelow => vec![FULL, Rect::new(0.25, 0.0, 0.75, 0.5)],
            Operator::SurroundFromLeft => vec![FULL, Rect::new(0.5, 0.25, 1.0, 0.75)],
            Operator::SurroundFromUpperLeft => vec![FULL, Rect::new(0.5, 0.5, 1.0, 1.0)],
            Operator::SurroundFromUpperRight => vec![FULL, Rect::new(0.0, 0.5, 0.5, 1.0)],
            Operator::SurroundFromLowerLeft => vec![FULL, Rect::new(0.5, 0.0, 1.0, 0.5)],
            Operator::SurroundFromRight => vec![FULL, Rect::new(0.0, 0.25, 0.5, 0.75)],
            Operator::SurroundFromLowerRight => vec![FULL, Rect::new(0.0, 0.0, 0.5, 0.5)],
        }
    }
}

impl From<Operator> for char {
    fn from(op: Operator) -> char {
        op.to_char()
    }
}

impl TryFrom<char> for Operator {
    type Error = DecompositionError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Operator::from_char(c).ok_or(DecompositionError::UnknownOperator { operator: c })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A leaf component: a known character or a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "char", into = "char")]
pub enum Component {
    Char(char),
    Unknown,
}

impl Component {
    pub fn as_char(self) -> Option<char> {
        match self {
            Component::Char(c) => Some(c),
            Component::Unknown => None,
        }
    }
}

impl From<char> for Component {
    fn from(c: char) -> Self {
        if c == UNKNOWN_COMPONENT || c == '?' {
            Component::Unknown
        } else {
            Component::Char(c)
        }
    }
}

impl From<Component> for char {
    fn from(component: Component) -> char {
        component.as_char().unwrap_or(UNKNOWN_COMPONENT)
    }
}

/// A node of a decomposition tree.
///
/// Compounds always hold exactly as many children as their operator's
/// arity; deserialization rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "RawNode")]
pub enum DecompositionNode {
    Compound {
        operator: Operator,
        children: Vec<DecompositionNode>,
    },
    Leaf {
        component: Component,
        /// The component's own medians, on the full canvas, once resolved.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medians: Option<Vec<Median>>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawNode {
    Compound {
        operator: Operator,
        children: Vec<DecompositionNode>,
    },
    Leaf {
        component: Component,
        #[serde(default)]
        medians: Option<Vec<Median>>,
    },
}

impl TryFrom<RawNode> for DecompositionNode {
    type Error = DecompositionError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        match raw {
            RawNode::Compound { operator, children } => {
                if children.len() != operator.arity() {
                    return Err(DecompositionError::WrongArity {
                        operator: operator.to_char(),
                        expected: operator.arity(),
                        found: children.len(),
                    });
                }
                Ok(DecompositionNode::Compound { operator, children })
            }
            RawNode::Leaf { component, medians } => Ok(DecompositionNode::Leaf { component, medians }),
        }
    }
}

impl Default for DecompositionNode {
    fn default() -> Self {
        Self::unknown()
    }
}

impl DecompositionNode {
    pub fn leaf(component: impl Into<Component>) -> Self {
        DecompositionNode::Leaf {
            component: component.into(),
            medians: None,
        }
    }

    pub fn unknown() -> Self {
        Self::leaf(Component::Unknown)
    }

    /// A compound whose operands are all unknown.
    pub fn compound(operator: Operator) -> Self {
        DecompositionNode::Compound {
            operator,
            children: vec![Self::unknown(); operator.arity()],
        }
    }

    pub fn parse(decomposition: &str) -> Result<Self, DecompositionError> {
        let chars: Vec<char> = decomposition.chars().collect();
        let mut index = 0;
        let tree = parse_subtree(&chars, &mut index, decomposition)?;
        if index != chars.len() {
            return Err(DecompositionError::TrailingCharacters {
                decomposition: decomposition.to_string(),
                rest: chars[index..].iter().collect(),
            });
        }
        Ok(tree)
    }

    /// Prefix form of the tree. Variant annotations are not preserved.
    pub fn to_decomposition_string(&self) -> String {
        let mut out = String::new();
        self.write_prefix(&mut out);
        out
    }

    fn write_prefix(&self, out: &mut String) {
        match self {
            DecompositionNode::Compound { operator, children } => {
                out.push(operator.to_char());
                for child in children {
                    child.write_prefix(out);
                }
            }
            DecompositionNode::Leaf { component, .. } => out.push(char::from(*component)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            DecompositionNode::Compound { .. } => "compound",
            DecompositionNode::Leaf { .. } => "leaf",
        }
    }

    pub fn subtree(&self, path: &[usize]) -> Result<&Self, DecompositionError> {
        let mut node = self;
        for &i in path {
            node = match node {
                DecompositionNode::Compound { children, .. } => children.get(i),
                DecompositionNode::Leaf { .. } => None,
            }
            .ok_or_else(|| DecompositionError::InvalidPath {
                path: path.to_vec(),
            })?;
        }
        Ok(node)
    }

    pub fn subtree_mut(&mut self, path: &[usize]) -> Result<&mut Self, DecompositionError> {
        let mut node = self;
        for &i in path {
            node = match node {
                DecompositionNode::Compound { children, .. } => children.get_mut(i),
                DecompositionNode::Leaf { .. } => None,
            }
            .ok_or_else(|| DecompositionError::InvalidPath {
                path: path.to_vec(),
            })?;
        }
        Ok(node)
    }

    /// Change a compound's operator, truncating or padding its operands
    /// with unknown leaves to the new arity.
    pub fn set_operator(&mut self, path: &[usize], operator: Operator) -> Result<(), DecompositionError> {
        let node = self.subtree_mut(path)?;
        match node {
            DecompositionNode::Compound {
                operator: current,
                children,
            } => {
                *current = operator;
                children.resize(operator.arity(), Self::unknown());
                Ok(())
            }
            DecompositionNode::Leaf { .. } => Err(DecompositionError::WrongNodeKind {
                path: path.to_vec(),
                found: "leaf",
                expected: "compound",
            }),
        }
    }

    /// Change a leaf's component. Its medians no longer apply and are cleared.
    pub fn set_component(
        &mut self,
        path: &[usize],
        component: impl Into<Component>,
    ) -> Result<(), DecompositionError> {
        let component = component.into();
        let node = self.subtree_mut(path)?;
        let found = node.kind();
        match node {
            DecompositionNode::Leaf {
                component: current,
                medians,
            } => {
                if *current != component {
                    *current = component;
                    *medians = None;
                }
                Ok(())
            }
            DecompositionNode::Compound { .. } => Err(DecompositionError::WrongNodeKind {
                path: path.to_vec(),
                found,
                expected: "leaf",
            }),
        }
    }

    /// Turn the node at `path` into an unknown leaf. Leaves are unchanged.
    pub fn make_leaf(&mut self, path: &[usize]) -> Result<(), DecompositionError> {
        let node = self.subtree_mut(path)?;
        if let DecompositionNode::Compound { .. } = node {
            *node = Self::unknown();
        }
        Ok(())
    }

    /// Turn the node at `path` into a compound with unknown operands, or
    /// change its operator if it already is one.
    pub fn make_compound(&mut self, path: &[usize], operator: Operator) -> Result<(), DecompositionError> {
        let node = self.subtree_mut(path)?;
        if let DecompositionNode::Leaf { .. } = node {
            *node = Self::compound(operator);
            return Ok(());
        }
        self.set_operator(path, operator)
    }

    /// Known leaf characters in prefix order.
    pub fn components(&self) -> Vec<char> {
        let mut result = Vec::new();
        self.visit_leaves(&mut |node| {
            if let DecompositionNode::Leaf {
                component: Component::Char(c),
                ..
            } = node
            {
                result.push(*c);
            }
        });
        result
    }

    fn visit_leaves<'a>(&'a self, f: &mut impl FnMut(&'a Self)) {
        match self {
            DecompositionNode::Compound { children, .. } => {
                for child in children {
                    child.visit_leaves(f);
                }
            }
            DecompositionNode::Leaf { .. } => f(self),
        }
    }

    /// Attach medians to every known leaf that `lookup` can resolve.
    /// Returns the number of leaves resolved.
    pub fn resolve_medians(&mut self, lookup: &mut impl FnMut(char) -> Option<Vec<Median>>) -> usize {
        match self {
            DecompositionNode::Compound { children, .. } => {
                children.iter_mut().map(|c| c.resolve_medians(lookup)).sum()
            }
            DecompositionNode::Leaf {
                component: Component::Char(c),
                medians,
            } => match lookup(*c) {
                Some(found) => {
                    *medians = Some(found);
                    1
                }
                None => 0,
            },
            DecompositionNode::Leaf { .. } => 0,
        }
    }
}

/// Place `inner`, given in unit coordinates, inside `outer`.
pub(crate) fn map_rect(outer: Rect, inner: Rect) -> Rect {
    let (w, h) = (outer.width(), outer.height());
    Rect::new(
        outer.x0 + inner.x0 * w,
        outer.y0 + inner.y0 * h,
        outer.x0 + inner.x1 * w,
        outer.y0 + inner.y1 * h,
    )
}

fn parse_subtree(chars: &[char], index: &mut usize, source: &str) -> Result<DecompositionNode, DecompositionError> {
    let current = *chars
        .get(*index)
        .ok_or_else(|| DecompositionError::UnexpectedEnd(source.to_string()))?;
    *index += 1;
    if let Some(operator) = Operator::from_char(current) {
        let children = (0..operator.arity())
            .map(|_| parse_subtree(chars, index, source))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(DecompositionNode::Compound { operator, children });
    }
    if chars.get(*index) == Some(&'[') {
        let digit = chars.get(*index + 1).is_some_and(|c| c.is_ascii_digit());
        if !digit || chars.get(*index + 2) != Some(&']') {
            return Err(DecompositionError::MalformedAnnotation {
                component: current,
                decomposition: source.to_string(),
            });
        }
        *index += 3;
    }
    Ok(DecompositionNode::leaf(current))
}

impl FromStr for DecompositionNode {
    type Err = DecompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DecompositionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decomposition_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn parse_nested_with_annotation() {
        let tree = DecompositionNode::parse("⿰亻⿱木[1]？").unwrap();
        assert_eq!(tree.to_decomposition_string(), "⿰亻⿱木？");
        assert_eq!(tree.components(), vec!['亻', '木']);
        assert_eq!(tree.subtree(&[1, 1]).unwrap(), &DecompositionNode::unknown());
    }

    #[test]
    fn every_operator_round_trips() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_char(op.to_char()), Some(op));
            assert_eq!(op.layout().len(), op.arity());
            let tree = DecompositionNode::compound(op);
            let text = tree.to_decomposition_string();
            assert_eq!(DecompositionNode::parse(&text).unwrap(), tree);
        }
    }

    #[test]
    fn malformed_decompositions() {
        assert!(matches!(
            DecompositionNode::parse("⿰亻"),
            Err(DecompositionError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            DecompositionNode::parse(""),
            Err(DecompositionError::UnexpectedEnd(_))
        ));
        assert_eq!(
            DecompositionNode::parse("⿰亻木口"),
            Err(DecompositionError::TrailingCharacters {
                decomposition: "⿰亻木口".to_string(),
                rest: "口".to_string(),
            })
        );
        assert!(matches!(
            DecompositionNode::parse("⿰亻[x]木"),
            Err(DecompositionError::MalformedAnnotation { component: '亻', .. })
        ));
    }

    #[test]
    fn path_lookup_reports_bad_paths() {
        let mut tree = DecompositionNode::parse("⿰亻木").unwrap();
        assert_eq!(
            tree.subtree(&[2]),
            Err(DecompositionError::InvalidPath { path: vec![2] })
        );
        assert!(tree.subtree_mut(&[0, 0]).is_err());
        assert!(matches!(
            tree.set_operator(&[0], Operator::TopToBottom),
            Err(DecompositionError::WrongNodeKind { found: "leaf", .. })
        ));
    }

    #[test]
    fn arity_follows_operator_edits() {
        let mut tree = DecompositionNode::parse("⿰亻木").unwrap();
        tree.set_operator(&[], Operator::LeftToMiddleToRight).unwrap();
        assert_eq!(tree.to_decomposition_string(), "⿲亻木？");
        tree.set_operator(&[], Operator::TopToBottom).unwrap();
        assert_eq!(tree.to_decomposition_string(), "⿱亻木");

        tree.make_compound(&[1], Operator::Surround).unwrap();
        assert_eq!(tree.to_decomposition_string(), "⿱亻⿴？？");
        tree.set_component(&[1, 0], '囗').unwrap();
        assert_eq!(tree.to_decomposition_string(), "⿱亻⿴囗？");
        tree.make_leaf(&[1]).unwrap();
        assert_eq!(tree.to_decomposition_string(), "⿱亻？");
    }

    fn leaf_medians<'a>(tree: &'a DecompositionNode, path: &[usize]) -> Option<&'a [Median]> {
        match tree.subtree(path).unwrap() {
            DecompositionNode::Leaf { medians, .. } => medians.as_deref(),
            DecompositionNode::Compound { .. } => None,
        }
    }

    #[test]
    fn medians_resolve_and_clear() {
        let mut tree = DecompositionNode::parse("⿰亻木").unwrap();
        let mut lookup = |c: char| (c == '木').then(|| vec![vec![kurbo::Point::ZERO]]);
        assert_eq!(tree.resolve_medians(&mut lookup), 1);
        assert!(leaf_medians(&tree, &[0]).is_none());
        assert!(leaf_medians(&tree, &[1]).is_some());

        tree.set_component(&[1], '口').unwrap();
        assert!(leaf_medians(&tree, &[1]).is_none());
    }

    #[test]
    fn layouts_nest() {
        let canvas = Rect::new(0.0, 0.0, 1024.0, 1024.0);
        let right = map_rect(canvas, Operator::LeftToRight.layout()[1]);
        let rect = map_rect(right, Operator::TopToBottom.layout()[1]);
        assert_abs_diff_eq!(rect.x0, 512.0);
        assert_abs_diff_eq!(rect.y0, 512.0);
        assert_abs_diff_eq!(rect.x1, 1024.0);
        assert_abs_diff_eq!(rect.y1, 1024.0);
    }

    #[test]
    fn deserialized_compounds_must_match_arity() {
        let short = r#"{"type":"compound","operator":"⿰","children":[{"type":"leaf","component":"亻"}]}"#;
        let message = serde_json::from_str::<DecompositionNode>(short)
            .unwrap_err()
            .to_string();
        assert!(message.contains("⿰ takes 2 operands, found 1"), "{message}");

        // Nested compounds are checked too.
        let nested = r#"{"type":"compound","operator":"⿰","children":[
            {"type":"leaf","component":"亻"},
            {"type":"compound","operator":"⿲","children":[
                {"type":"leaf","component":"木"},{"type":"leaf","component":"木"}]}]}"#;
        assert!(serde_json::from_str::<DecompositionNode>(nested).is_err());
    }

    #[test]
    fn json_shape() {
        let tree = DecompositionNode::parse("⿰亻？").unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["type"], "compound");
        assert_eq!(json["operator"], "⿰");
        assert_eq!(json["children"][1]["component"], "？");
        let back: DecompositionNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
