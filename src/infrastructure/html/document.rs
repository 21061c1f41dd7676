use super::targets::TargetMap;
use crate::utils::{Logger, PackError, Result};
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

/// A node owning its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    /// Local tag name of an element node
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name, .. } => Some(&*name.local),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|attr| attr.name.ns.is_empty() && &*attr.name.local == name)
                .map(|attr| attr.value.as_str()),
            _ => None,
        }
    }

    /// Build the owned tree without recursing, so nesting depth is bounded by
    /// memory rather than by the stack
    fn from_rcdom(root: &Handle) -> Self {
        let mut ancestors: Vec<Frame> = Vec::new();
        let mut current = Frame::new(root);
        loop {
            if let Some(handle) = current.pending.pop() {
                ancestors.push(std::mem::replace(&mut current, Frame::new(&handle)));
                continue;
            }
            let node = current.finish();
            match ancestors.pop() {
                Some(mut parent) => {
                    parent.children.push(node);
                    current = parent;
                }
                None => return node,
            }
        }
    }

    fn walk<F>(&mut self, targets: &TargetMap, handler: &mut F) -> Result<()>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let mut stack: Vec<&mut Node> = vec![self];
        while let Some(Node { kind, children }) = stack.pop() {
            if let NodeKind::Element { name, attrs } = kind {
                if let Some(target) = targets.attribute_for(&name.local) {
                    if let Some(attr) = attrs
                        .iter_mut()
                        .find(|attr| attr.name.ns.is_empty() && attr.name.local == *target)
                    {
                        attr.value = handler(&attr.value)?;
                    }
                }
            }
            stack.extend(children.iter_mut().rev());
        }
        Ok(())
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A node under construction and the source children it still has to convert
struct Frame {
    kind: NodeKind,
    pending: Vec<Handle>,
    children: Vec<Node>,
}

impl Frame {
    fn new(handle: &Handle) -> Self {
        let mut pending: Vec<Handle> = handle.children.borrow().iter().cloned().collect();

        let kind = match &handle.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            } => NodeKind::Doctype {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
            NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
            NodeData::Comment { contents } => NodeKind::Comment(contents.to_string()),
            NodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                // template contents live in a separate fragment in the parse tree
                if let Some(contents) = template_contents.borrow().as_ref() {
                    pending.extend(contents.children.borrow().iter().cloned());
                }
                NodeKind::Element {
                    name: name.clone(),
                    attrs: attrs
                        .borrow()
                        .iter()
                        .map(|attr| Attribute {
                            name: attr.name.clone(),
                            value: attr.value.to_string(),
                        })
                        .collect(),
                }
            }
            NodeData::ProcessingInstruction { target, contents } => NodeKind::ProcessingInstruction {
                target: target.to_string(),
                data: contents.to_string(),
            },
        };

        pending.reverse();
        Self {
            kind,
            children: Vec::with_capacity(pending.len()),
            pending,
        }
    }

    fn finish(self) -> Node {
        Node {
            kind: self.kind,
            children: self.children,
        }
    }
}

enum Step<'a> {
    Open(&'a Node),
    Close(&'a QualName),
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut stack: Vec<Step<'_>> = match traversal_scope {
            TraversalScope::ChildrenOnly(_) => self.children.iter().rev().map(Step::Open).collect(),
            TraversalScope::IncludeNode => vec![Step::Open(self)],
        };

        while let Some(step) = stack.pop() {
            let node = match step {
                Step::Open(node) => node,
                Step::Close(name) => {
                    serializer.end_elem(name.clone())?;
                    continue;
                }
            };
            match &node.kind {
                NodeKind::Document => {}
                // only the name is written: public and system identifiers of
                // legacy doctypes are not reproduced
                NodeKind::Doctype { name, .. } => serializer.write_doctype(name)?,
                NodeKind::Element { name, attrs } => {
                    serializer.start_elem(
                        name.clone(),
                        attrs.iter().map(|attr| (&attr.name, attr.value.as_str())),
                    )?;
                    stack.push(Step::Close(name));
                }
                NodeKind::Text(text) => serializer.write_text(text)?,
                NodeKind::Comment(text) => serializer.write_comment(text)?,
                NodeKind::ProcessingInstruction { target, data } => {
                    serializer.write_processing_instruction(target, data)?
                }
            }
            stack.extend(node.children.iter().rev().map(Step::Open));
        }
        Ok(())
    }
}

/// A parsed HTML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Parse HTML leniently. Markup errors are recovered from and only logged.
    pub fn parse(origin: &Path, bytes: &[u8]) -> Result<Self> {
        let dom = parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut &bytes[..])
            .map_err(|e| PackError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        for error in &dom.errors {
            Logger::debug(&format!("{}: {}", origin.display(), error));
        }

        Ok(Self {
            root: Node::from_rcdom(&dom.document),
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Visit every targeted attribute in document order and replace its value
    /// with what `handler` returns. The first handler error stops the walk.
    pub fn walk<F>(&mut self, targets: &TargetMap, mut handler: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<String>,
    {
        self.root.walk(targets, &mut handler)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        serialize(&mut out, &self.root, SerializeOpts::default())?;
        Ok(out)
    }
}
