use serde::{Deserialize, Serialize};

use super::node::{NodeError, UiNode};

/// One node of a serialized UI tree dump.
///
/// Field names follow the platform's accessibility naming so dumps taken on
/// device can be fed to the CLI unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub class_name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content_description: Option<String>,
    #[serde(default, rename = "viewIdResourceName", alias = "resourceId")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub editable: bool,
    /// Screen bounds. Carried for completeness, never fingerprinted.
    #[serde(default)]
    pub bounds: Option<[i32; 4]>,
    #[serde(default)]
    pub children: Vec<NodeDump>,
}

impl NodeDump {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.content_description = Some(description.into());
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn with_bounds(mut self, bounds: [i32; 4]) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_child(mut self, child: NodeDump) -> Self {
        self.children.push(child);
        self
    }

    /// Borrow this dump as a walkable root.
    pub fn as_node(&self) -> DumpNode<'_> {
        DumpNode { dump: self }
    }
}

/// [`UiNode`] view over a [`NodeDump`]. Dumps own no native resources, so
/// `release` is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct DumpNode<'a> {
    dump: &'a NodeDump,
}

impl<'a> UiNode for DumpNode<'a> {
    fn class_name(&self) -> Result<String, NodeError> {
        if self.dump.class_name.is_empty() {
            return Err(NodeError::FieldUnavailable("className"));
        }
        Ok(self.dump.class_name.clone())
    }

    fn text(&self) -> Result<Option<String>, NodeError> {
        Ok(self.dump.text.clone())
    }

    fn content_description(&self) -> Result<Option<String>, NodeError> {
        Ok(self.dump.content_description.clone())
    }

    fn resource_id(&self) -> Result<Option<String>, NodeError> {
        Ok(self.dump.resource_id.clone())
    }

    fn is_clickable(&self) -> Result<bool, NodeError> {
        Ok(self.dump.clickable)
    }

    fn is_editable(&self) -> Result<bool, NodeError> {
        Ok(self.dump.editable)
    }

    fn child_count(&self) -> Result<usize, NodeError> {
        Ok(self.dump.children.len())
    }

    fn child(&self, index: usize) -> Result<Option<Self>, NodeError> {
        Ok(self.dump.children.get(index).map(|dump| DumpNode { dump }))
    }

    fn release(&mut self) {}
}
