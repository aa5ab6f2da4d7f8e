pub mod provider;

use crate::error::Result;

/// Generic labeled tree parsed from the legacy flow export.
///
/// The export has no schema contract beyond element names, so every lookup
/// tolerates missing or unknown elements and returns `None`/empty instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(tag: &str, text: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: Some(text.to_string()),
            children: Vec::new(),
        }
    }

    pub fn push(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Text of the first direct child with the given tag.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).and_then(|c| c.text.as_deref())
    }

    /// All descendants (excluding self) with the given tag, in document order.
    pub fn descendants<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        collect_descendants(self, tag, &mut out);
        out
    }
}

fn collect_descendants<'a>(node: &'a Element, tag: &str, out: &mut Vec<&'a Element>) {
    for child in &node.children {
        if child.tag == tag {
            out.push(child);
        }
        collect_descendants(child, tag, out);
    }
}

/// Parsed flow export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowTree {
    pub root: Element,
}

impl FlowTree {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn parse(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        Ok(Self {
            root: convert(doc.root_element()),
        })
    }

    /// Process group whose `id` child equals `group_id`, found by depth-first scan.
    pub fn process_group(&self, group_id: &str) -> Option<&Element> {
        if self.root.tag == "processGroup" && self.root.child_text("id") == Some(group_id) {
            return Some(&self.root);
        }
        self.root
            .descendants("processGroup")
            .into_iter()
            .find(|g| g.child_text("id") == Some(group_id))
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let children = node
        .children()
        .filter(|c| c.is_element())
        .map(convert)
        .collect();
    Element {
        tag: node.tag_name().name().to_string(),
        text: node.text().map(|t| t.to_string()),
        children,
    }
}

/// Read-only view over a `processor` element.
#[derive(Debug, Clone, Copy)]
pub struct Processor<'a> {
    element: &'a Element,
}

impl<'a> Processor<'a> {
    pub fn new(element: &'a Element) -> Self {
        Self { element }
    }

    pub fn name(&self) -> Option<&'a str> {
        self.element.child_text("name")
    }

    pub fn class(&self) -> Option<&'a str> {
        self.element.child_text("class")
    }

    pub fn max_concurrent_tasks(&self) -> Option<&'a str> {
        self.element.child_text("maxConcurrentTasks")
    }

    /// `(name, value)` pairs of the processor's own properties; a missing value reads as empty.
    pub fn properties(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.element.children_named("property").filter_map(|p| {
            let name = p.child_text("name")?;
            Some((name, p.child_text("value").unwrap_or("")))
        })
    }

    /// Value of the property whose name equals `key`, ignoring case.
    pub fn property_ignore_case(&self, key: &str) -> Option<&'a str> {
        self.element.children_named("property").find_map(|p| {
            let name = p.child_text("name")?;
            if name.eq_ignore_ascii_case(key) {
                p.child_text("value")
            } else {
                None
            }
        })
    }
}

/// All processors below a process group, nested groups included.
pub fn processors(group: &Element) -> Vec<Processor<'_>> {
    group.descendants("processor").into_iter().map(Processor::new).collect()
}
