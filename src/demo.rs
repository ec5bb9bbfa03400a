use crate::dom::{NodeId, ShadowMode};
use crate::page::Host;
use crate::{Error, Result};

pub const MOUNT_POINT_ID: &str = "app";
pub const SVG_ID: &str = "demo-svg";
pub const NONCE_VALUE: &str = "demo-nonce";
pub const PART_VALUE: &str = "demo-part";
pub const SLOT_VALUE: &str = "demo-slot";
pub const PART_HOST_ID: &str = "part-host";
pub const GRAPHIC_SLOT_NAME: &str = "graphic";

// Rendered into the mount point on attachment. The svg under test declares a
// focus order index, requests focus on mount, and carries the three attributes
// the console readout verifies. The second container projects an svg into the
// named insertion point of its shadow tree.
const DEMO_MARKUP: &str = "\
<svg id='demo-svg' tabindex='0' autofocus nonce='demo-nonce' part='demo-part' \
slot='demo-slot' width='120' height='120' style='border: 2px solid steelblue'></svg>\
<div class='part-demo'></div>\
<div class='slot-demo'>\
<svg slot='graphic' width='80' height='80' style='border: 2px dashed firebrick'></svg>\
</div>";

const PART_SHADOW_MARKUP: &str = "\
<style>svg { background: lavender; }</style>\
<svg part='demo-part' width='64' height='64'></svg>";

const SLOT_SHADOW_MARKUP: &str = "\
<style>::slotted(svg) { outline: 2px dotted seagreen; }</style>\
<slot name='graphic'>no graphic projected</slot>";

const PART_HEAD_RULE: &str = "#part-host::part(demo-part) { outline: 2px solid rebeccapurple; }";

#[derive(Debug, Default)]
pub struct AttributeDemo {
    attached: bool,
}

impl AttributeDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    // One-shot attachment sequence. The only fatal path is a missing mount
    // point; every later step checks its target and skips silently when the
    // host did not produce it.
    pub fn mount<H: Host>(&mut self, host: &mut H) -> Result<()> {
        if self.attached {
            return Ok(());
        }

        let mount_point = host
            .element_by_id(MOUNT_POINT_ID)
            .ok_or_else(|| Error::MountPointMissing(MOUNT_POINT_ID.to_string()))?;

        host.set_markup(mount_point, DEMO_MARKUP)?;

        let svg = host.element_by_id(SVG_ID);
        if let Some(svg) = svg {
            host.add_log_listener(svg, "focus", &format!("focus: {SVG_ID}"));
        }
        host.run_autofocus()?;

        let focus_matches = svg.is_some() && host.focused_element() == svg;
        host.log(&format!("active element is demo svg: {focus_matches}"));

        if let Some(svg) = svg {
            for name in ["nonce", "part", "slot"] {
                let value = host.get_attribute(svg, name);
                host.log(&format!(
                    "{name}: {}",
                    value.as_deref().unwrap_or("null")
                ));
            }
        }

        let containers = container_children(host, mount_point);

        if let Some(part_host) = containers.first().copied() {
            host.set_attribute(part_host, "id", PART_HOST_ID)?;
            let shadow = host.attach_shadow(part_host, ShadowMode::Open)?;
            host.set_markup(shadow, PART_SHADOW_MARKUP)?;
            host.append_head_style(PART_HEAD_RULE)?;
        }

        if let Some(slot_host) = containers.get(1).copied() {
            let shadow = host.attach_shadow(slot_host, ShadowMode::Open)?;
            host.set_markup(shadow, SLOT_SHADOW_MARKUP)?;
        }

        self.attached = true;
        Ok(())
    }
}

fn container_children<H: Host>(host: &H, mount_point: NodeId) -> Vec<NodeId> {
    host.element_children(mount_point)
        .into_iter()
        .filter(|child| host.tag_name(*child).as_deref() == Some("div"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingHost {
        calls: Vec<String>,
        mount_point: Option<NodeId>,
        svg: Option<NodeId>,
        containers: Vec<NodeId>,
        focused: Option<NodeId>,
        honors_autofocus: bool,
        next_shadow: usize,
    }

    impl RecordingHost {
        fn with_full_document() -> Self {
            Self {
                mount_point: Some(NodeId(1)),
                svg: Some(NodeId(2)),
                containers: vec![NodeId(3), NodeId(4)],
                honors_autofocus: true,
                ..Self::default()
            }
        }
    }

    impl Host for RecordingHost {
        fn element_by_id(&self, id: &str) -> Option<NodeId> {
            match id {
                MOUNT_POINT_ID => self.mount_point,
                SVG_ID => self.svg,
                _ => None,
            }
        }

        fn element_children(&self, _node: NodeId) -> Vec<NodeId> {
            self.containers.clone()
        }

        fn tag_name(&self, _node: NodeId) -> Option<String> {
            Some("div".into())
        }

        fn get_attribute(&self, _node: NodeId, name: &str) -> Option<String> {
            match name {
                "nonce" => Some(NONCE_VALUE.into()),
                "part" => Some(PART_VALUE.into()),
                "slot" => Some(SLOT_VALUE.into()),
                _ => None,
            }
        }

        fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
            self.calls.push(format!("set_attribute {} {name}={value}", node.0));
            Ok(())
        }

        fn set_markup(&mut self, node: NodeId, _markup: &str) -> Result<()> {
            self.calls.push(format!("set_markup {}", node.0));
            Ok(())
        }

        fn attach_shadow(&mut self, host: NodeId, _mode: ShadowMode) -> Result<NodeId> {
            self.calls.push(format!("attach_shadow {}", host.0));
            self.next_shadow += 1;
            Ok(NodeId(100 + self.next_shadow))
        }

        fn append_head_style(&mut self, _css: &str) -> Result<()> {
            self.calls.push("append_head_style".into());
            Ok(())
        }

        fn add_log_listener(&mut self, node: NodeId, event: &str, _line: &str) {
            self.calls.push(format!("add_log_listener {} {event}", node.0));
        }

        fn run_autofocus(&mut self) -> Result<()> {
            self.calls.push("run_autofocus".into());
            if self.honors_autofocus {
                self.focused = self.svg;
            }
            Ok(())
        }

        fn focused_element(&self) -> Option<NodeId> {
            self.focused
        }

        fn log(&mut self, line: &str) {
            self.calls.push(format!("log {line}"));
        }
    }

    #[test]
    fn mount_runs_the_fixed_sequence_in_order() -> Result<()> {
        let mut host = RecordingHost::with_full_document();
        let mut demo = AttributeDemo::new();
        demo.mount(&mut host)?;
        assert!(demo.is_attached());
        assert_eq!(
            host.calls,
            vec![
                "set_markup 1",
                "add_log_listener 2 focus",
                "run_autofocus",
                "log active element is demo svg: true",
                "log nonce: demo-nonce",
                "log part: demo-part",
                "log slot: demo-slot",
                "set_attribute 3 id=part-host",
                "attach_shadow 3",
                "set_markup 101",
                "append_head_style",
                "attach_shadow 4",
                "set_markup 102",
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_mount_point_is_fatal_before_any_host_mutation() {
        let mut host = RecordingHost::default();
        let mut demo = AttributeDemo::new();
        assert_eq!(
            demo.mount(&mut host),
            Err(Error::MountPointMissing("app".into()))
        );
        assert!(!demo.is_attached());
        assert!(host.calls.is_empty());
    }

    #[test]
    fn missing_containers_skip_the_shadow_steps_silently() -> Result<()> {
        let mut host = RecordingHost::with_full_document();
        host.containers.clear();
        let mut demo = AttributeDemo::new();
        demo.mount(&mut host)?;
        assert!(!host.calls.iter().any(|call| call.starts_with("attach_shadow")));
        assert!(!host.calls.iter().any(|call| call == "append_head_style"));
        Ok(())
    }

    #[test]
    fn missing_graphics_element_logs_a_false_focus_match() -> Result<()> {
        let mut host = RecordingHost::with_full_document();
        host.svg = None;
        let mut demo = AttributeDemo::new();
        demo.mount(&mut host)?;
        assert!(
            host.calls
                .contains(&"log active element is demo svg: false".to_string())
        );
        assert!(!host.calls.iter().any(|call| call.starts_with("log nonce")));
        Ok(())
    }

    #[test]
    fn host_without_focus_on_mount_logs_a_false_focus_match() -> Result<()> {
        let mut host = RecordingHost::with_full_document();
        host.honors_autofocus = false;
        let mut demo = AttributeDemo::new();
        demo.mount(&mut host)?;
        assert!(
            host.calls
                .contains(&"log active element is demo svg: false".to_string())
        );
        Ok(())
    }

    #[test]
    fn second_mount_call_is_a_silent_no_op() -> Result<()> {
        let mut host = RecordingHost::with_full_document();
        let mut demo = AttributeDemo::new();
        demo.mount(&mut host)?;
        let calls_after_first = host.calls.len();
        demo.mount(&mut host)?;
        assert_eq!(host.calls.len(), calls_after_first);
        Ok(())
    }
}
