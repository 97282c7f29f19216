//! Named generators for initial layouts.
//!
//! A [`LayoutTemplate`] pairs an abstract [`TemplateShape`] with the panel
//! types that fill its leaves, in leaf order. Applying a template is
//! destructive: the store replaces every panel of the scope with the ones
//! produced here.

use std::collections::BTreeMap;

use crate::error::TemplateError;
use crate::id::{IdAllocator, PanelId};
use crate::panel_type::PanelType;
use crate::registry::{PanelRegistry, PanelState};
use crate::tree::{LayoutNode, Orientation, SplitRatio};

/// Template used for scopes that have never been laid out.
pub const DEFAULT_TEMPLATE_ID: &str = "single";

/// Tree shape without ids.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateShape {
    Leaf,
    Split {
        orientation: Orientation,
        ratio: SplitRatio,
        first: Box<TemplateShape>,
        second: Box<TemplateShape>,
    },
}

impl TemplateShape {
    #[must_use]
    pub fn split(
        orientation: Orientation,
        ratio: f64,
        first: TemplateShape,
        second: TemplateShape,
    ) -> Self {
        Self::Split {
            orientation,
            ratio: SplitRatio::clamped(ratio),
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf => 1,
            Self::Split { first, second, .. } => first.leaf_count() + second.leaf_count(),
        }
    }

    /// Substitute `panel_ids` into the leaves in declaration order.
    ///
    /// Node ids come from `ids`. Fails when the id count differs from the
    /// leaf count, which only a broken template definition can cause.
    pub fn build(
        &self,
        template: &str,
        ids: &mut IdAllocator,
        panel_ids: &[PanelId],
    ) -> Result<LayoutNode, TemplateError> {
        let expected = self.leaf_count();
        if panel_ids.len() != expected {
            return Err(TemplateError::LeafCountMismatch {
                template: template.to_owned(),
                expected,
                found: panel_ids.len(),
            });
        }
        let mut remaining = panel_ids.iter().copied();
        Ok(self.build_with(ids, &mut remaining))
    }

    fn build_with(
        &self,
        ids: &mut IdAllocator,
        panel_ids: &mut impl Iterator<Item = PanelId>,
    ) -> LayoutNode {
        match self {
            Self::Leaf => {
                let node_id = ids.node();
                // Leaf count is checked by `build` and by `LayoutTemplate::new`.
                let panel_id = panel_ids.next().unwrap_or_else(|| ids.panel());
                LayoutNode::leaf(node_id, panel_id)
            }
            Self::Split {
                orientation,
                ratio,
                first,
                second,
            } => {
                let node_id = ids.node();
                let first = first.build_with(ids, panel_ids);
                let second = second.build_with(ids, panel_ids);
                LayoutNode::split(node_id, *orientation, *ratio, first, second)
            }
        }
    }
}

/// One named layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTemplate {
    id: String,
    name: String,
    shape: TemplateShape,
    panel_types: Vec<PanelType>,
}

impl LayoutTemplate {
    /// Define a template, checking that every leaf has a panel type.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        shape: TemplateShape,
        panel_types: Vec<PanelType>,
    ) -> Result<Self, TemplateError> {
        let template = Self {
            id: id.into(),
            name: name.into(),
            shape,
            panel_types,
        };
        template.validate()?;
        Ok(template)
    }

    fn validate(&self) -> Result<(), TemplateError> {
        if self.id.is_empty() {
            return Err(TemplateError::EmptyTemplateId);
        }
        let expected = self.shape.leaf_count();
        if self.panel_types.len() != expected {
            return Err(TemplateError::LeafCountMismatch {
                template: self.id.clone(),
                expected,
                found: self.panel_types.len(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn shape(&self) -> &TemplateShape {
        &self.shape
    }

    /// Initial panel types in leaf order.
    #[must_use]
    pub fn panel_types(&self) -> &[PanelType] {
        &self.panel_types
    }

    /// Allocate panels and build the concrete tree.
    ///
    /// Panels come back in leaf order, so the first one belongs to the first
    /// leaf.
    pub fn instantiate(&self, ids: &mut IdAllocator) -> (LayoutNode, Vec<PanelState>) {
        let panels: Vec<PanelState> = self
            .panel_types
            .iter()
            .map(|ty| PanelRegistry::create_default(ids, *ty))
            .collect();
        let mut panel_ids = panels.iter().map(|p| p.id);
        let layout = self.shape.build_with(ids, &mut panel_ids);
        (layout, panels)
    }

    /// One chat panel filling the workspace.
    #[must_use]
    pub fn single() -> Self {
        stock(
            DEFAULT_TEMPLATE_ID,
            "Single",
            TemplateShape::Leaf,
            vec![PanelType::Chat],
        )
    }
}

/// Read-only set of templates keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, LayoutTemplate>,
}

impl TemplateCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn from_templates(
        templates: impl IntoIterator<Item = LayoutTemplate>,
    ) -> Result<Self, TemplateError> {
        let mut map = BTreeMap::new();
        for template in templates {
            template.validate()?;
            let id = template.id.clone();
            if map.insert(id.clone(), template).is_some() {
                return Err(TemplateError::DuplicateTemplate(id));
            }
        }
        Ok(Self { templates: map })
    }

    /// The stock templates.
    #[must_use]
    pub fn builtin() -> Self {
        use Orientation::{Horizontal, Vertical};
        use PanelType::*;
        use TemplateShape::Leaf;

        let side_by_side = || TemplateShape::split(Horizontal, 0.5, Leaf, Leaf);
        let templates = [
            LayoutTemplate::single(),
            stock("split-h", "Split Horizontal", side_by_side(), vec![Chat, FileViewer]),
            stock(
                "split-v",
                "Split Vertical",
                TemplateShape::split(Vertical, 0.5, Leaf, Leaf),
                vec![Chat, Terminal],
            ),
            stock(
                "grid-2x2",
                "Grid 2x2",
                TemplateShape::split(Vertical, 0.5, side_by_side(), side_by_side()),
                vec![Chat, FileViewer, Terminal, BrowserPreview],
            ),
            stock(
                "sidebar",
                "Sidebar",
                TemplateShape::split(Horizontal, 0.25, Leaf, Leaf),
                vec![FileBrowser, Chat],
            ),
            stock(
                "three-column",
                "Three Columns",
                TemplateShape::split(Horizontal, 0.25, Leaf, side_by_side()),
                vec![FileBrowser, Chat, FileViewer],
            ),
            stock(
                "ide",
                "IDE",
                TemplateShape::split(
                    Horizontal,
                    0.2,
                    Leaf,
                    TemplateShape::split(Vertical, 0.7, side_by_side(), Leaf),
                ),
                vec![FileBrowser, FileViewer, Chat, Terminal],
            ),
        ];
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LayoutTemplate> {
        self.templates.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutTemplate> {
        self.templates.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Stock definition, checked by `builtin_templates_are_consistent`.
fn stock(id: &str, name: &str, shape: TemplateShape, panel_types: Vec<PanelType>) -> LayoutTemplate {
    LayoutTemplate {
        id: id.to_owned(),
        name: name.to_owned(),
        shape,
        panel_types,
    }
}
