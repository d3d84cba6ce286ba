//! Newick reader and writer for binary time trees.
//!
//! ```text
//! tree     = subtree ';'
//! subtree  = '(' subtree ',' subtree ')' label | label
//! label    = name? (':' length)?
//! ```
//!
//! Heights are derived from branch lengths: the tip furthest from the root
//! gets height zero. Missing lengths count as zero.

use msc_core::errors::{ErrorInfo, MscError};
use msc_core::{NodeId, TimeTree};

use crate::tree::{NodeRecord, TreeImpl};

/// Parses a single Newick tree.
pub fn parse(input: &str) -> Result<TreeImpl, MscError> {
    let mut parser = Parser::new(input.as_bytes());
    let root = parser.parse_tree()?;
    parser.skip_whitespace();
    if parser.pos != parser.input.len() {
        return Err(parser.error("trailing-input", "unexpected text after ';'"));
    }
    parser.into_tree(root)
}

/// Parses every `;`-terminated tree in `input`, skipping blank lines.
pub fn parse_many(input: &str) -> Result<Vec<TreeImpl>, MscError> {
    let mut trees: Vec<TreeImpl> = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let end = rest.find(';').ok_or_else(|| {
            MscError::Parse(ErrorInfo::new(
                "missing-terminator",
                "expected ';' at end of Newick tree",
            ))
        })?;
        let index = trees.len();
        trees.push(
            parse(&rest[..=end]).map_err(|err| err.with_context("tree_index", index.to_string()))?,
        );
        rest = rest[end + 1..].trim_start();
    }
    Ok(trees)
}

/// Writes the tree as Newick with branch lengths derived from heights.
pub fn write(tree: &TreeImpl) -> String {
    let mut buf = String::new();
    let mut stack = vec![WriteStep::Enter(tree.root())];
    while let Some(step) = stack.pop() {
        match step {
            WriteStep::Enter(node) => match tree.children(node) {
                Some((left, right)) => {
                    buf.push('(');
                    stack.push(WriteStep::Close(node));
                    stack.push(WriteStep::Enter(right));
                    stack.push(WriteStep::Separator);
                    stack.push(WriteStep::Enter(left));
                }
                None => write_suffix(tree, node, &mut buf),
            },
            WriteStep::Separator => buf.push(','),
            WriteStep::Close(node) => {
                buf.push(')');
                write_suffix(tree, node, &mut buf);
            }
        }
    }
    buf.push(';');
    buf
}

enum WriteStep {
    Enter(NodeId),
    Separator,
    Close(NodeId),
}

/// Label and `:length` written after a node's subtree.
fn write_suffix(tree: &TreeImpl, node: NodeId, buf: &mut String) {
    if let Some(label) = tree.label(node) {
        buf.push_str(label);
    }
    if tree.parent(node).is_some() {
        let s = format!("{:.10}", tree.branch_length(node));
        let s = s.trim_end_matches('0').trim_end_matches('.');
        buf.push(':');
        buf.push_str(s);
    }
}

struct ParsedNode {
    label: Option<String>,
    length: f64,
    children: Vec<usize>,
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    nodes: Vec<ParsedNode>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            nodes: Vec::new(),
        }
    }

    fn error(&self, code: &str, message: &str) -> MscError {
        MscError::Parse(ErrorInfo::new(code, message).with_context("offset", self.pos.to_string()))
    }

    fn parse_tree(&mut self) -> Result<usize, MscError> {
        self.skip_whitespace();
        let root = self.parse_subtree()?;
        self.skip_whitespace();
        if self.peek() != Some(b';') {
            return Err(self.error("missing-terminator", "expected ';' at end of Newick tree"));
        }
        self.pos += 1;
        Ok(root)
    }

    /// Reads one subtree, keeping the chain of unclosed `(` on a stack.
    fn parse_subtree(&mut self) -> Result<usize, MscError> {
        let root = self.nodes.len();
        let mut open: Vec<usize> = Vec::new();
        loop {
            self.skip_whitespace();
            let id = self.push_node();
            if let Some(&parent) = open.last() {
                self.nodes[parent].children.push(id);
            }
            if self.peek() == Some(b'(') {
                self.pos += 1;
                open.push(id);
                continue;
            }
            self.parse_label(id)?;

            // Close every group that ends here, then start the next sibling.
            loop {
                let Some(&parent) = open.last() else {
                    return Ok(root);
                };
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        break;
                    }
                    Some(b')') => {
                        self.pos += 1;
                        open.pop();
                        if self.nodes[parent].children.len() != 2 {
                            return Err(
                                self.error("non-binary", "internal nodes need exactly two children")
                            );
                        }
                        self.parse_label(parent)?;
                    }
                    Some(_) => return Err(self.error("unexpected-char", "expected ',' or ')'")),
                    None => return Err(self.error("unexpected-eof", "unclosed '('")),
                }
            }
        }
    }

    fn push_node(&mut self) -> usize {
        self.nodes.push(ParsedNode {
            label: None,
            length: 0.0,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn parse_label(&mut self, id: usize) -> Result<(), MscError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b':' | b',' | b')' | b'(' | b';') || byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos > start {
            let name = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
            self.nodes[id].label = Some(name);
        }
        self.skip_whitespace();
        if self.peek() == Some(b':') {
            self.pos += 1;
            self.skip_whitespace();
            let start = self.pos;
            while let Some(byte) = self.peek() {
                if byte.is_ascii_digit() || matches!(byte, b'.' | b'-' | b'+' | b'e' | b'E') {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
            let length: f64 = text.parse().map_err(|_| {
                self.error("invalid-length", "branch length is not a number")
            })?;
            if !length.is_finite() || length < 0.0 {
                return Err(self.error("invalid-length", "branch lengths must be non-negative"));
            }
            self.nodes[id].length = length;
        }
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn into_tree(self, root: usize) -> Result<TreeImpl, MscError> {
        let mut depth = vec![0.0; self.nodes.len()];
        let mut stack = vec![root];
        let mut max_depth: f64 = 0.0;
        while let Some(id) = stack.pop() {
            for &child in &self.nodes[id].children {
                depth[child] = depth[id] + self.nodes[child].length;
                stack.push(child);
            }
            if self.nodes[id].children.is_empty() {
                max_depth = max_depth.max(depth[id]);
            }
        }

        let records = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(id, node)| NodeRecord {
                label: node.label,
                height: max_depth - depth[id],
                parent: None,
                children: match node.children.as_slice() {
                    [left, right] => Some((
                        NodeId::from_raw(*left as u64),
                        NodeId::from_raw(*right as u64),
                    )),
                    _ => None,
                },
            })
            .collect();
        TreeImpl::from_records(records)
    }
}
