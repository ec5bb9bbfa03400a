use std::collections::HashMap;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMode {
    Open,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    ShadowRoot(ShadowMode),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) attr_order: Vec<String>,
    pub(crate) shadow_root: Option<NodeId>,
}

impl Element {
    fn new(tag_name: String) -> Self {
        Self {
            tag_name,
            attrs: HashMap::new(),
            attr_order: Vec::new(),
            shadow_root: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: Option<NodeId>,
        tag_name: String,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let mut element = Element::new(tag_name);
        for (name, value) in attrs {
            if !element.attrs.contains_key(&name) {
                element.attr_order.push(name.clone());
            }
            element.attrs.insert(name, value);
        }
        let id = self.create_node(parent, NodeType::Element(element));
        if let Some(id_attr) = self
            .element(id)
            .and_then(|element| element.attrs.get("id").cloned())
        {
            self.id_index.insert(id_attr, id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].parent
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn element_children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.nodes[node_id.0]
            .children
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    pub(crate) fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name).cloned())
    }

    pub(crate) fn set_attribute(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("setAttribute target is not an element".into()))?;
        if !element.attrs.contains_key(name) {
            element.attr_order.push(name.to_string());
        }
        element.attrs.insert(name.to_string(), value.to_string());
        if name == "id" {
            self.id_index.insert(value.to_string(), node_id);
        }
        Ok(())
    }

    pub(crate) fn attach_shadow(&mut self, host: NodeId, mode: ShadowMode) -> Result<NodeId> {
        let element = self
            .element(host)
            .ok_or_else(|| Error::Dom("attachShadow target is not an element".into()))?;
        if element.shadow_root.is_some() {
            return Err(Error::Dom("shadow root already attached".into()));
        }
        // Shadow roots hang off the host field, not the child list.
        let shadow = self.create_node(None, NodeType::ShadowRoot(mode));
        self.nodes[shadow.0].parent = Some(host);
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(shadow);
        }
        Ok(shadow)
    }

    pub(crate) fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.element(host).and_then(|element| element.shadow_root)
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) | NodeType::ShadowRoot(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    pub(crate) fn replace_children_from_dom(
        &mut self,
        target: NodeId,
        source: &Dom,
    ) -> Result<()> {
        match &self.nodes[target.0].node_type {
            NodeType::Element(_) | NodeType::ShadowRoot(_) => {}
            _ => {
                return Err(Error::Dom(
                    "markup target is not an element or shadow root".into(),
                ));
            }
        }

        let old_children = std::mem::take(&mut self.nodes[target.0].children);
        for child in old_children {
            self.nodes[child.0].parent = None;
        }

        let children = source.nodes[source.root.0].children.clone();
        for child in children {
            self.clone_subtree_from_dom(source, child, Some(target))?;
        }

        self.rebuild_id_index();
        Ok(())
    }

    fn clone_subtree_from_dom(
        &mut self,
        source: &Dom,
        source_node: NodeId,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let node_type = match &source.nodes[source_node.0].node_type {
            NodeType::Document | NodeType::ShadowRoot(_) => {
                return Err(Error::Dom("cannot clone a root node into markup target".into()));
            }
            NodeType::Element(element) => NodeType::Element(element.clone()),
            NodeType::Text(text) => NodeType::Text(text.clone()),
        };

        let node = self.create_node(parent, node_type);
        for child in &source.nodes[source_node.0].children {
            self.clone_subtree_from_dom(source, *child, Some(node))?;
        }
        Ok(node)
    }

    fn rebuild_id_index(&mut self) {
        self.id_index.clear();
        for index in 0..self.nodes.len() {
            let node_id = NodeId(index);
            if self.is_detached(node_id) {
                continue;
            }
            if let Some(id_attr) = self
                .element(node_id)
                .and_then(|element| element.attrs.get("id").cloned())
            {
                self.id_index.insert(id_attr, node_id);
            }
        }
    }

    fn is_detached(&self, node_id: NodeId) -> bool {
        let mut cursor = node_id;
        loop {
            match &self.nodes[cursor.0].node_type {
                NodeType::Document => return false,
                NodeType::ShadowRoot(_) => {
                    // A shadow tree is attached when its host is.
                    match self.nodes[cursor.0].parent {
                        Some(host) => cursor = host,
                        None => return true,
                    }
                }
                _ => match self.nodes[cursor.0].parent {
                    Some(parent) => cursor = parent,
                    None => return true,
                },
            }
        }
    }

    // Document-order walk of the light tree, shadow trees included after their host.
    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    fn collect_elements(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        if self.element(node_id).is_some() {
            out.push(node_id);
        }
        if let Some(shadow) = self.shadow_root(node_id) {
            self.collect_elements(shadow, out);
        }
        for child in &self.nodes[node_id.0].children {
            self.collect_elements(*child, out);
        }
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::ShadowRoot(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                out
            }
            NodeType::Text(text) => escape_text(text),
            NodeType::Element(element) => {
                let mut out = String::new();
                out.push('<');
                out.push_str(&element.tag_name);
                for name in &element.attr_order {
                    if let Some(value) = element.attrs.get(name) {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(&escape_attr(value));
                        out.push('"');
                    }
                }
                out.push('>');
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
                out
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_element_indexes_its_id() {
        let mut dom = Dom::new();
        let root = dom.root;
        let node = dom.create_element(
            Some(root),
            "div".into(),
            vec![("id".into(), "box".into())],
        );
        assert_eq!(dom.by_id("box"), Some(node));
        assert_eq!(dom.tag_name(node), Some("div"));
    }

    #[test]
    fn attach_shadow_is_single_shot_per_host() -> Result<()> {
        let mut dom = Dom::new();
        let root = dom.root;
        let host = dom.create_element(Some(root), "div".into(), Vec::new());
        let shadow = dom.attach_shadow(host, ShadowMode::Open)?;
        assert_eq!(dom.shadow_root(host), Some(shadow));
        assert_eq!(
            dom.attach_shadow(host, ShadowMode::Open),
            Err(Error::Dom("shadow root already attached".into()))
        );
        Ok(())
    }

    #[test]
    fn shadow_root_children_stay_out_of_the_light_child_list() -> Result<()> {
        let mut dom = Dom::new();
        let root = dom.root;
        let host = dom.create_element(Some(root), "div".into(), Vec::new());
        let shadow = dom.attach_shadow(host, ShadowMode::Open)?;
        dom.create_element(Some(shadow), "span".into(), Vec::new());
        assert!(dom.element_children(host).is_empty());
        assert_eq!(dom.element_children(shadow).len(), 1);
        Ok(())
    }

    #[test]
    fn dump_node_escapes_text_and_attribute_values() {
        let mut dom = Dom::new();
        let root = dom.root;
        let node = dom.create_element(
            Some(root),
            "p".into(),
            vec![("title".into(), "a\"b&c".into())],
        );
        dom.create_text(node, "1 < 2 & 3 > 2".into());
        assert_eq!(
            dom.dump_node(node),
            "<p title=\"a&quot;b&amp;c\">1 &lt; 2 &amp; 3 &gt; 2</p>"
        );
    }
}
