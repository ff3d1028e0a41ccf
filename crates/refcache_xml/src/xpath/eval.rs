//! Expression evaluation.

use std::cell::OnceCell;

use super::functions::{self, Function};
use super::parser::{Axis, CompareOp, Expr, NodeTest, Step};
use super::{Value, Variables, XNode};
use crate::tree::NodeKind;
use crate::{Document, XPathError};

/// The context node together with its position in the current node list.
#[derive(Debug, Clone, Copy)]
struct Focus {
    node: XNode,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'a> {
    doc: &'a Document,
    vars: &'a Variables,
    order: OnceCell<Vec<usize>>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(doc: &'a Document, vars: &'a Variables) -> Self {
        Self {
            doc,
            vars,
            order: OnceCell::new(),
        }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, context: XNode) -> Result<Value, XPathError> {
        let focus = Focus {
            node: context,
            position: 1,
            size: 1,
        };
        self.eval(expr, focus)
    }

    fn eval(&self, expr: &Expr, focus: Focus) -> Result<Value, XPathError> {
        match expr {
            Expr::Or(left, right) => Ok(Value::Boolean(
                self.eval(left, focus)?.to_boolean() || self.eval(right, focus)?.to_boolean(),
            )),
            Expr::And(left, right) => Ok(Value::Boolean(
                self.eval(left, focus)?.to_boolean() && self.eval(right, focus)?.to_boolean(),
            )),
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, focus)?;
                let right = self.eval(right, focus)?;
                Ok(Value::Boolean(self.compare(*op, &left, &right)))
            }
            Expr::Add(left, right) => Ok(Value::Number(
                self.number(&self.eval(left, focus)?) + self.number(&self.eval(right, focus)?),
            )),
            Expr::Subtract(left, right) => Ok(Value::Number(
                self.number(&self.eval(left, focus)?) - self.number(&self.eval(right, focus)?),
            )),
            Expr::Negate(inner) => Ok(Value::Number(-self.number(&self.eval(inner, focus)?))),
            Expr::Union(left, right) => {
                let mut nodes = self.node_set(left, focus)?;
                nodes.extend(self.node_set(right, focus)?);
                self.sort_dedup(&mut nodes);
                Ok(Value::Nodes(nodes))
            }
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    XNode::Node(self.doc.root())
                } else {
                    focus.node
                };
                Ok(Value::Nodes(self.apply_steps(vec![start], steps)?))
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut nodes = self.node_set(primary, focus)?;
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate)?;
                }
                Ok(Value::Nodes(self.apply_steps(nodes, steps)?))
            }
            Expr::Literal(value) => Ok(Value::String(value.clone())),
            Expr::Number(value) => Ok(Value::Number(*value)),
            Expr::Variable(name) => self
                .vars
                .get(name)
                .map(|value| Value::String(value.to_string()))
                .ok_or_else(|| XPathError::UndefinedVariable(name.clone())),
            Expr::Call(function, args) => self.call(*function, args, focus),
        }
    }

    fn node_set(&self, expr: &Expr, focus: Focus) -> Result<Vec<XNode>, XPathError> {
        match self.eval(expr, focus)? {
            Value::Nodes(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet(format!("{expr:?}"))),
        }
    }

    fn order_key(&self, node: XNode) -> (usize, usize) {
        let order = self.order.get_or_init(|| self.doc.document_order());
        match node {
            XNode::Node(id) => (order[id.index()], 0),
            XNode::Attribute(id, index) => (order[id.index()], index + 1),
        }
    }

    fn sort_dedup(&self, nodes: &mut Vec<XNode>) {
        if nodes.len() < 2 {
            return;
        }
        nodes.sort_by_cached_key(|&node| self.order_key(node));
        nodes.dedup();
    }

    fn apply_steps(&self, start: Vec<XNode>, steps: &[Step]) -> Result<Vec<XNode>, XPathError> {
        let mut current = start;
        for step in steps {
            let mut next = Vec::new();
            for &node in &current {
                next.extend(self.eval_step(node, step)?);
            }
            if current.len() > 1 || step.axis.is_reverse() {
                self.sort_dedup(&mut next);
            }
            current = next;
        }
        Ok(current)
    }

    /// Evaluates one step from one context node. The result is in axis
    /// order, which is reverse document order for reverse axes.
    fn eval_step(&self, node: XNode, step: &Step) -> Result<Vec<XNode>, XPathError> {
        let mut matched: Vec<XNode> = self
            .axis_nodes(node, step.axis)
            .into_iter()
            .filter(|&candidate| self.matches(candidate, step.axis, &step.test))
            .collect();
        for predicate in &step.predicates {
            matched = self.filter(matched, predicate)?;
        }
        Ok(matched)
    }

    fn filter(&self, nodes: Vec<XNode>, predicate: &Expr) -> Result<Vec<XNode>, XPathError> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (index, node) in nodes.into_iter().enumerate() {
            let focus = Focus {
                node,
                position: index + 1,
                size,
            };
            let keep = match self.eval(predicate, focus)? {
                Value::Number(n) => n == focus.position as f64,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    fn axis_nodes(&self, node: XNode, axis: Axis) -> Vec<XNode> {
        let doc = self.doc;
        let id = match node {
            XNode::Node(id) => id,
            XNode::Attribute(owner, _) => {
                return match axis {
                    Axis::SelfAxis | Axis::DescendantOrSelf => vec![node],
                    Axis::Parent => vec![XNode::Node(owner)],
                    Axis::Ancestor => std::iter::once(owner)
                        .chain(doc.ancestors(owner))
                        .map(XNode::Node)
                        .collect(),
                    Axis::AncestorOrSelf => std::iter::once(node)
                        .chain(std::iter::once(owner).chain(doc.ancestors(owner)).map(XNode::Node))
                        .collect(),
                    _ => Vec::new(),
                };
            }
        };

        match axis {
            Axis::Child => doc.children(id).iter().copied().map(XNode::Node).collect(),
            Axis::Descendant => doc.descendants(id).map(XNode::Node).collect(),
            Axis::DescendantOrSelf => std::iter::once(id)
                .chain(doc.descendants(id))
                .map(XNode::Node)
                .collect(),
            Axis::SelfAxis => vec![node],
            Axis::Parent => doc.parent(id).map(XNode::Node).into_iter().collect(),
            Axis::Ancestor => doc.ancestors(id).map(XNode::Node).collect(),
            Axis::AncestorOrSelf => std::iter::once(id)
                .chain(doc.ancestors(id))
                .map(XNode::Node)
                .collect(),
            Axis::Attribute => (0..doc.attributes(id).len())
                .map(|index| XNode::Attribute(id, index))
                .collect(),
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = doc.parent(id) else {
                    return Vec::new();
                };
                let siblings = doc.children(parent);
                let Some(at) = siblings.iter().position(|&s| s == id) else {
                    return Vec::new();
                };
                if axis == Axis::FollowingSibling {
                    siblings[at + 1..].iter().copied().map(XNode::Node).collect()
                } else {
                    siblings[..at].iter().rev().copied().map(XNode::Node).collect()
                }
            }
        }
    }

    fn matches(&self, node: XNode, axis: Axis, test: &NodeTest) -> bool {
        let doc = self.doc;
        match node {
            XNode::Attribute(owner, index) => {
                // Attributes only match on the attribute axis, or as the
                // context node itself.
                if axis != Axis::Attribute && !matches!(test, NodeTest::Node) {
                    return false;
                }
                match test {
                    NodeTest::Any | NodeTest::Node => true,
                    NodeTest::Name(name) => doc
                        .attributes(owner)
                        .get(index)
                        .is_some_and(|attr| &attr.name == name),
                    NodeTest::Text | NodeTest::Comment => false,
                }
            }
            XNode::Node(id) => match (test, doc.kind(id)) {
                (NodeTest::Node, _) => true,
                (NodeTest::Any, NodeKind::Element { .. }) => true,
                (NodeTest::Name(expected), NodeKind::Element { name, .. }) => name == expected,
                (NodeTest::Text, NodeKind::Text(_) | NodeKind::CData(_)) => true,
                (NodeTest::Comment, NodeKind::Comment(_)) => true,
                _ => false,
            },
        }
    }

    fn string(&self, value: &Value) -> String {
        value.to_string_value(self.doc)
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            other => functions::parse_number(&self.string(other)),
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|&x| {
                let x = Value::String(self.doc.string_value(x));
                b.iter()
                    .any(|&y| self.compare_atomic(op, &x, &Value::String(self.doc.string_value(y))))
            }),
            (Value::Nodes(nodes), other) => self.compare_node_set(op, nodes, other),
            (other, Value::Nodes(nodes)) => self.compare_node_set(flip(op), nodes, other),
            (a, b) => self.compare_atomic(op, a, b),
        }
    }

    /// Compares `nodes op other` with the node-set on the left.
    fn compare_node_set(&self, op: CompareOp, nodes: &[XNode], other: &Value) -> bool {
        match other {
            Value::Boolean(_) => {
                self.compare_atomic(op, &Value::Boolean(!nodes.is_empty()), other)
            }
            Value::Number(_) => nodes.iter().any(|&node| {
                let n = functions::parse_number(&self.doc.string_value(node));
                self.compare_atomic(op, &Value::Number(n), other)
            }),
            _ => nodes.iter().any(|&node| {
                self.compare_atomic(op, &Value::String(self.doc.string_value(node)), other)
            }),
        }
    }

    fn compare_atomic(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match op {
            CompareOp::Eq | CompareOp::NotEq => {
                let equal = match (left, right) {
                    (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                        left.to_boolean() == right.to_boolean()
                    }
                    (Value::Number(_), _) | (_, Value::Number(_)) => {
                        self.number(left) == self.number(right)
                    }
                    _ => self.string(left) == self.string(right),
                };
                if op == CompareOp::Eq { equal } else { !equal }
            }
            CompareOp::Lt => self.number(left) < self.number(right),
            CompareOp::Le => self.number(left) <= self.number(right),
            CompareOp::Gt => self.number(left) > self.number(right),
            CompareOp::Ge => self.number(left) >= self.number(right),
        }
    }

    fn call(&self, function: Function, args: &[Expr], focus: Focus) -> Result<Value, XPathError> {
        let arg = |index: usize| self.eval(&args[index], focus);
        let string_arg = |index: usize| -> Result<String, XPathError> {
            Ok(self.string(&self.eval(&args[index], focus)?))
        };
        let string_or_context = || -> Result<String, XPathError> {
            if args.is_empty() {
                Ok(self.doc.string_value(focus.node))
            } else {
                string_arg(0)
            }
        };
        let node_or_context = || -> Result<Option<XNode>, XPathError> {
            if args.is_empty() {
                Ok(Some(focus.node))
            } else {
                Ok(self.node_set(&args[0], focus)?.into_iter().next())
            }
        };

        let value = match function {
            Function::String => Value::String(string_or_context()?),
            Function::Concat => {
                let mut out = String::new();
                for index in 0..args.len() {
                    out.push_str(&string_arg(index)?);
                }
                Value::String(out)
            }
            Function::NormalizeSpace => Value::String(
                string_or_context()?
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Function::Contains => Value::Boolean(string_arg(0)?.contains(&string_arg(1)?)),
            Function::StartsWith => Value::Boolean(string_arg(0)?.starts_with(&string_arg(1)?)),
            Function::SubstringBefore => {
                let haystack = string_arg(0)?;
                let needle = string_arg(1)?;
                Value::String(
                    haystack
                        .split_once(needle.as_str())
                        .map(|(before, _)| before.to_string())
                        .unwrap_or_default(),
                )
            }
            Function::SubstringAfter => {
                let haystack = string_arg(0)?;
                let needle = string_arg(1)?;
                Value::String(
                    haystack
                        .split_once(needle.as_str())
                        .map(|(_, after)| after.to_string())
                        .unwrap_or_default(),
                )
            }
            Function::Substring => {
                let input = string_arg(0)?;
                let start = self.number(&arg(1)?);
                let length = match args.len() {
                    3 => Some(self.number(&arg(2)?)),
                    _ => None,
                };
                Value::String(functions::substring(&input, start, length))
            }
            Function::Translate => Value::String(functions::translate(
                &string_arg(0)?,
                &string_arg(1)?,
                &string_arg(2)?,
            )),
            Function::StringLength => {
                Value::Number(string_or_context()?.chars().count() as f64)
            }
            Function::Name => Value::String(
                node_or_context()?
                    .and_then(|node| self.doc.node_name(node))
                    .unwrap_or_default()
                    .to_string(),
            ),
            Function::LocalName => Value::String(
                node_or_context()?
                    .and_then(|node| self.doc.node_local_name(node))
                    .unwrap_or_default()
                    .to_string(),
            ),
            Function::Count => Value::Number(self.node_set(&args[0], focus)?.len() as f64),
            Function::Position => Value::Number(focus.position as f64),
            Function::Last => Value::Number(focus.size as f64),
            Function::Not => Value::Boolean(!arg(0)?.to_boolean()),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Boolean => Value::Boolean(arg(0)?.to_boolean()),
            Function::Number => {
                let value = if args.is_empty() {
                    Value::String(self.doc.string_value(focus.node))
                } else {
                    arg(0)?
                };
                Value::Number(self.number(&value))
            }
        };
        Ok(value)
    }
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        other => other,
    }
}
