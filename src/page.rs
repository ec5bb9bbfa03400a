use std::collections::HashMap;

use crate::dom::{Dom, NodeId, ShadowMode};
use crate::markup::parse_markup;
use crate::{Error, Result};

// The demo touches its host document only through this surface, so the
// initialization sequence stays testable without a real rendering host.
pub trait Host {
    fn element_by_id(&self, id: &str) -> Option<NodeId>;
    fn element_children(&self, node: NodeId) -> Vec<NodeId>;
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()>;
    fn set_markup(&mut self, node: NodeId, markup: &str) -> Result<()>;
    fn attach_shadow(&mut self, host: NodeId, mode: ShadowMode) -> Result<NodeId>;
    fn append_head_style(&mut self, css: &str) -> Result<()>;
    fn add_log_listener(&mut self, node: NodeId, event: &str, line: &str);
    fn run_autofocus(&mut self) -> Result<()>;
    fn focused_element(&self) -> Option<NodeId>;
    fn log(&mut self, line: &str);
}

#[derive(Debug, Clone)]
struct Listener {
    capture: bool,
    log_line: String,
}

#[derive(Debug, Default, Clone)]
struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    fn add(&mut self, node_id: NodeId, event: String, listener: Listener) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
    }

    fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct Page {
    dom: Dom,
    head: NodeId,
    listeners: ListenerStore,
    active_element: Option<NodeId>,
    console_logs: Vec<String>,
    console_to_stderr: bool,
    nonce_exposed: bool,
    autofocus_enabled: bool,
}

impl Page {
    pub fn from_markup(markup: &str) -> Result<Self> {
        let mut dom = parse_markup(markup)?;
        let head = match dom
            .all_element_nodes()
            .into_iter()
            .find(|node| dom.tag_name(*node) == Some("head"))
        {
            Some(head) => head,
            None => {
                let root = dom.root;
                dom.create_element(Some(root), "head".into(), Vec::new())
            }
        };
        Ok(Self {
            dom,
            head,
            listeners: ListenerStore::default(),
            active_element: None,
            console_logs: Vec::new(),
            console_to_stderr: false,
            nonce_exposed: true,
            autofocus_enabled: true,
        })
    }

    // Host environment caveats under demonstration. Some browsers hide the
    // nonce content attribute from inspection; some hosts never honor
    // focus-on-mount. Both are accepted outcomes, not failures.
    pub fn set_nonce_exposed(&mut self, exposed: bool) {
        self.nonce_exposed = exposed;
    }

    pub fn set_autofocus_enabled(&mut self, enabled: bool) {
        self.autofocus_enabled = enabled;
    }

    pub fn set_console_stderr(&mut self, enabled: bool) {
        self.console_to_stderr = enabled;
    }

    pub fn take_console_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console_logs)
    }

    pub fn console_logs(&self) -> &[String] {
        &self.console_logs
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.focus_node(target)
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, event)
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.read_attribute(target, name))
    }

    pub fn inner_markup(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        let mut out = String::new();
        for child in self.dom.nodes[target.0].children.clone() {
            out.push_str(&self.dom.dump_node(child));
        }
        Ok(out)
    }

    pub fn shadow_markup(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        let shadow = self
            .dom
            .shadow_root(target)
            .ok_or_else(|| Error::Dom(format!("no shadow root on {selector}")))?;
        Ok(self.dom.dump_node(shadow))
    }

    pub fn head_style_texts(&self) -> Vec<String> {
        self.dom
            .element_children(self.head)
            .into_iter()
            .filter(|child| self.dom.tag_name(*child) == Some("style"))
            .map(|child| self.dom.text_content(child))
            .collect()
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector).map(|_| ())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.read_attribute(target, name);
        if actual.as_deref() == Some(expected) {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual: actual.unwrap_or_else(|| "null".into()),
            dom_snippet: self.dom.dump_node(target),
        })
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        if let Some(id) = selector.strip_prefix('#') {
            if id.is_empty() || id.contains(|c: char| c.is_ascii_whitespace()) {
                return Err(Error::UnsupportedSelector(selector.to_string()));
            }
            return self
                .dom
                .by_id(id)
                .ok_or_else(|| Error::SelectorNotFound(selector.to_string()));
        }

        if selector.is_empty()
            || selector.contains(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        {
            return Err(Error::UnsupportedSelector(selector.to_string()));
        }

        self.dom
            .all_element_nodes()
            .into_iter()
            .find(|node| self.dom.tag_name(*node) == Some(selector))
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn read_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        if name == "nonce" && !self.nonce_exposed {
            return None;
        }
        self.dom.get_attribute(node, name)
    }

    fn is_focusable(&self, node: NodeId) -> bool {
        self.dom.get_attribute(node, "tabindex").is_some()
            || self.dom.get_attribute(node, "autofocus").is_some()
    }

    fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if !self.is_focusable(node) {
            return Ok(());
        }

        if self.active_element == Some(node) {
            return Ok(());
        }

        if let Some(current) = self.active_element.take() {
            self.dispatch_event(current, "blur")?;
        }

        self.active_element = Some(node);
        self.dispatch_event(node, "focus")?;
        Ok(())
    }

    fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<()> {
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        // Capture phase.
        if path.len() >= 2 {
            for node in path[..path.len() - 1].to_vec() {
                self.invoke_listeners(node, event_type, true);
            }
        }

        // Target phase: capture listeners first.
        self.invoke_listeners(target, event_type, true);
        self.invoke_listeners(target, event_type, false);

        // Bubble phase.
        if path.len() >= 2 {
            for node in path[..path.len() - 1].iter().rev().copied().collect::<Vec<_>>() {
                self.invoke_listeners(node, event_type, false);
            }
        }

        Ok(())
    }

    fn invoke_listeners(&mut self, node: NodeId, event_type: &str, capture: bool) {
        for listener in self.listeners.get(node, event_type, capture) {
            self.push_console_line(listener.log_line);
        }
    }

    fn push_console_line(&mut self, line: String) {
        if self.console_to_stderr {
            eprintln!("{line}");
        }
        self.console_logs.push(line);
    }
}

impl Host for Page {
    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.by_id(id)
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.dom.element_children(node)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.dom.tag_name(node).map(str::to_string)
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.read_attribute(node, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attribute(node, name, value)
    }

    fn set_markup(&mut self, node: NodeId, markup: &str) -> Result<()> {
        let fragment = parse_markup(markup)?;
        self.dom.replace_children_from_dom(node, &fragment)
    }

    fn attach_shadow(&mut self, host: NodeId, mode: ShadowMode) -> Result<NodeId> {
        self.dom.attach_shadow(host, mode)
    }

    fn append_head_style(&mut self, css: &str) -> Result<()> {
        let head = self.head;
        let style = self.dom.create_element(Some(head), "style".into(), Vec::new());
        self.dom.create_text(style, css.to_string());
        Ok(())
    }

    fn add_log_listener(&mut self, node: NodeId, event: &str, line: &str) {
        self.listeners.add(
            node,
            event.to_string(),
            Listener {
                capture: false,
                log_line: line.to_string(),
            },
        );
    }

    fn run_autofocus(&mut self) -> Result<()> {
        if !self.autofocus_enabled {
            return Ok(());
        }
        let target = self
            .dom
            .all_element_nodes()
            .into_iter()
            .find(|node| self.dom.get_attribute(*node, "autofocus").is_some());
        if let Some(node) = target {
            self.focus_node(node)?;
        }
        Ok(())
    }

    fn focused_element(&self) -> Option<NodeId> {
        self.active_element
    }

    fn log(&mut self, line: &str) {
        self.push_console_line(line.to_string());
    }
}
