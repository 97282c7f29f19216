//! Binary split-tree describing how panels share a workspace.
//!
//! Every operation here is pure: it borrows a tree and returns a new one (or a
//! value). A [`LayoutNode::Split`] always owns exactly two children, which the
//! `Box<[LayoutNode; 2]>` representation enforces at the type level, and a
//! [`LayoutNode::Leaf`] references exactly one panel by id.
//!
//! Lookups that miss leave the tree unchanged; callers that care whether a
//! target existed check with [`LayoutNode::find`] or compare the result.

use serde::{Deserialize, Serialize};

use crate::id::{NodeId, PanelId};

/// Smallest fraction of space the first child of a split may receive.
pub const MIN_SPLIT_RATIO: f64 = 0.1;

/// Largest fraction of space the first child of a split may receive.
pub const MAX_SPLIT_RATIO: f64 = 0.9;

/// Ratio used by freshly created splits.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.5;

/// Direction in which a split divides its area.
///
/// `Horizontal` places children side by side, `Vertical` stacks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Which side of a new split the incoming leaf occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Existing content stays first; the new leaf goes second.
    #[default]
    ExistingFirst,
    /// The new leaf goes first.
    IncomingFirst,
}

/// Fraction of a split's area given to its first child.
///
/// Always within [`MIN_SPLIT_RATIO`]..=[`MAX_SPLIT_RATIO`]; every constructor,
/// deserialization included, clamps. Non-finite input becomes
/// [`DEFAULT_SPLIT_RATIO`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct SplitRatio(f64);

impl SplitRatio {
    /// An even split.
    pub const HALF: Self = Self(DEFAULT_SPLIT_RATIO);

    /// Clamp `raw` into the allowed range.
    #[must_use]
    pub fn clamped(raw: f64) -> Self {
        if raw.is_finite() {
            Self(raw.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO))
        } else {
            Self::HALF
        }
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::HALF
    }
}

impl From<f64> for SplitRatio {
    fn from(raw: f64) -> Self {
        Self::clamped(raw)
    }
}

impl From<SplitRatio> for f64 {
    fn from(ratio: SplitRatio) -> Self {
        ratio.0
    }
}

/// Partial update for a split node. Leaves carry nothing patchable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodePatch {
    pub orientation: Option<Orientation>,
    pub split_ratio: Option<SplitRatio>,
}

impl NodePatch {
    #[must_use]
    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Set the ratio, clamped.
    #[must_use]
    pub fn split_ratio(mut self, raw: f64) -> Self {
        self.split_ratio = Some(SplitRatio::clamped(raw));
        self
    }
}

/// One node of the layout tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutNode {
    Leaf {
        id: NodeId,
        panel_id: PanelId,
    },
    Split {
        id: NodeId,
        orientation: Orientation,
        split_ratio: SplitRatio,
        children: Box<[LayoutNode; 2]>,
    },
}

impl LayoutNode {
    #[must_use]
    pub fn leaf(id: NodeId, panel_id: PanelId) -> Self {
        Self::Leaf { id, panel_id }
    }

    #[must_use]
    pub fn split(
        id: NodeId,
        orientation: Orientation,
        split_ratio: SplitRatio,
        first: LayoutNode,
        second: LayoutNode,
    ) -> Self {
        Self::Split {
            id,
            orientation,
            split_ratio,
            children: Box::new([first, second]),
        }
    }

    /// This node's id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        match self {
            Self::Leaf { id, .. } | Self::Split { id, .. } => *id,
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Panel referenced by a leaf; `None` for splits.
    #[must_use]
    pub const fn panel_id(&self) -> Option<PanelId> {
        match self {
            Self::Leaf { panel_id, .. } => Some(*panel_id),
            Self::Split { .. } => None,
        }
    }

    /// Stored ratio of a split; `None` for leaves.
    #[must_use]
    pub const fn split_ratio(&self) -> Option<SplitRatio> {
        match self {
            Self::Split { split_ratio, .. } => Some(*split_ratio),
            Self::Leaf { .. } => None,
        }
    }

    /// Children of a split; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[LayoutNode] {
        match self {
            Self::Split { children, .. } => children.as_slice(),
            Self::Leaf { .. } => &[],
        }
    }

    /// Depth-first search by node id.
    #[must_use]
    pub fn find(&self, target: NodeId) -> Option<&LayoutNode> {
        if self.id() == target {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(target))
    }

    /// Leaf node that references `panel_id`.
    #[must_use]
    pub fn leaf_for_panel(&self, panel_id: PanelId) -> Option<&LayoutNode> {
        match self {
            Self::Leaf { panel_id: p, .. } if *p == panel_id => Some(self),
            Self::Leaf { .. } => None,
            Self::Split { children, .. } => children
                .iter()
                .find_map(|child| child.leaf_for_panel(panel_id)),
        }
    }

    /// Panel ids in leaf order (first child before second).
    #[must_use]
    pub fn leaf_panel_ids(&self) -> Vec<PanelId> {
        let mut out = Vec::new();
        self.collect_panel_ids(&mut out);
        out
    }

    fn collect_panel_ids(&self, out: &mut Vec<PanelId>) {
        match self {
            Self::Leaf { panel_id, .. } => out.push(*panel_id),
            Self::Split { children, .. } => {
                for child in children.iter() {
                    child.collect_panel_ids(out);
                }
            }
        }
    }

    /// Every node id in pre-order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(&mut |node| out.push(node.id()));
        out
    }

    /// Panel of the first leaf. A tree always has at least one leaf.
    #[must_use]
    pub fn first_panel_id(&self) -> PanelId {
        match self {
            Self::Leaf { panel_id, .. } => *panel_id,
            Self::Split { children, .. } => children[0].first_panel_id(),
        }
    }

    /// Number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Split { children, .. } => children.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Length of the longest root-to-leaf path, counting the root as 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Split { children, .. } => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }

    /// Visit every node in pre-order.
    pub fn walk(&self, visit: &mut impl FnMut(&LayoutNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Return a copy with `patch` merged into the split `target`.
    ///
    /// Patching a leaf id, or an id that is not in the tree, yields an
    /// identical tree.
    #[must_use]
    pub fn updated(&self, target: NodeId, patch: &NodePatch) -> LayoutNode {
        match self {
            Self::Leaf { .. } => self.clone(),
            Self::Split {
                id,
                orientation,
                split_ratio,
                children,
            } => {
                if *id == target {
                    return Self::Split {
                        id: *id,
                        orientation: patch.orientation.unwrap_or(*orientation),
                        split_ratio: patch.split_ratio.unwrap_or(*split_ratio),
                        children: children.clone(),
                    };
                }
                Self::Split {
                    id: *id,
                    orientation: *orientation,
                    split_ratio: *split_ratio,
                    children: Box::new([
                        children[0].updated(target, patch),
                        children[1].updated(target, patch),
                    ]),
                }
            }
        }
    }

    /// Return a copy with the ratio of split `target` set to `raw`, clamped.
    #[must_use]
    pub fn with_split_ratio(&self, target: NodeId, raw: f64) -> LayoutNode {
        self.updated(target, &NodePatch::default().split_ratio(raw))
    }

    /// Wrap the leaf holding `panel_id` in a new split alongside `incoming`.
    ///
    /// Returns `None` when no leaf references `panel_id`.
    #[must_use]
    pub fn split_leaf(
        &self,
        panel_id: PanelId,
        split_id: NodeId,
        orientation: Orientation,
        placement: Placement,
        incoming: LayoutNode,
    ) -> Option<LayoutNode> {
        self.leaf_for_panel(panel_id)?;
        Some(self.split_leaf_inner(panel_id, split_id, orientation, placement, &incoming))
    }

    fn split_leaf_inner(
        &self,
        panel_id: PanelId,
        split_id: NodeId,
        orientation: Orientation,
        placement: Placement,
        incoming: &LayoutNode,
    ) -> LayoutNode {
        match self {
            Self::Leaf { panel_id: p, .. } if *p == panel_id => {
                let (first, second) = match placement {
                    Placement::ExistingFirst => (self.clone(), incoming.clone()),
                    Placement::IncomingFirst => (incoming.clone(), self.clone()),
                };
                Self::split(split_id, orientation, SplitRatio::HALF, first, second)
            }
            Self::Leaf { .. } => self.clone(),
            Self::Split {
                id,
                orientation: o,
                split_ratio,
                children,
            } => Self::Split {
                id: *id,
                orientation: *o,
                split_ratio: *split_ratio,
                children: Box::new([
                    children[0].split_leaf_inner(panel_id, split_id, orientation, placement, incoming),
                    children[1].split_leaf_inner(panel_id, split_id, orientation, placement, incoming),
                ]),
            },
        }
    }

    /// Remove the leaf holding `panel_id`; its sibling takes the parent's slot.
    ///
    /// Returns `None` when the panel is absent or is the root leaf, since a
    /// tree cannot be empty.
    #[must_use]
    pub fn remove_leaf(&self, panel_id: PanelId) -> Option<LayoutNode> {
        match self {
            Self::Leaf { .. } => None,
            Self::Split {
                id,
                orientation,
                split_ratio,
                children,
            } => {
                for (idx, child) in children.iter().enumerate() {
                    if child.panel_id() == Some(panel_id) {
                        return Some(children[1 - idx].clone());
                    }
                }
                let [first, second] = &**children;
                if let Some(first) = first.remove_leaf(panel_id) {
                    return Some(Self::split(*id, *orientation, *split_ratio, first, second.clone()));
                }
                second.remove_leaf(panel_id).map(|second| {
                    Self::split(*id, *orientation, *split_ratio, first.clone(), second)
                })
            }
        }
    }

    /// Sibling subtree of the leaf holding `panel_id`.
    #[must_use]
    pub fn sibling_of_panel(&self, panel_id: PanelId) -> Option<&LayoutNode> {
        let Self::Split { children, .. } = self else {
            return None;
        };
        for (idx, child) in children.iter().enumerate() {
            if child.panel_id() == Some(panel_id) {
                return Some(&children[1 - idx]);
            }
        }
        children
            .iter()
            .find_map(|child| child.sibling_of_panel(panel_id))
    }
}
