use crate::tree::Node;

/// Visitor pattern for traversing content trees immutably
///
/// The default implementation walks every node depth-first, parents before
/// children. Override `visit_node` and call `walk_node` to keep descending.
pub trait Visitor: Sized {
    fn visit_roots(&mut self, roots: &[Node]) {
        for root in roots {
            self.visit_node(root);
        }
    }

    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }
}

/// Mutable visitor pattern for transforming content trees
///
/// Similar to Visitor, but provides mutable access to nodes.
/// Use this when you need to modify the tree during traversal.
pub trait VisitorMut: Sized {
    fn visit_roots_mut(&mut self, roots: &mut Vec<Node>) {
        for root in roots.iter_mut() {
            self.visit_node_mut(root);
        }
    }

    fn visit_node_mut(&mut self, node: &mut Node) {
        walk_node_mut(self, node);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &Node) {
    for child in &node.children {
        visitor.visit_node(child);
    }
}

pub fn walk_node_mut<V: VisitorMut>(visitor: &mut V, node: &mut Node) {
    for child in node.children.iter_mut() {
        visitor.visit_node_mut(child);
    }
}

/// Collects every node id in visiting order
#[derive(Debug, Default)]
pub struct IdCollector {
    pub ids: Vec<String>,
}

impl Visitor for IdCollector {
    fn visit_node(&mut self, node: &Node) {
        self.ids.push(node.id.clone());
        walk_node(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Uppercase;

    impl VisitorMut for Uppercase {
        fn visit_node_mut(&mut self, node: &mut Node) {
            if let Some(text) = &mut node.text {
                *text = text.to_uppercase();
            }
            walk_node_mut(self, node);
        }
    }

    fn sample() -> Vec<Node> {
        vec![
            Node::element("a", "div")
                .with_child(Node::element("b", "p").with_child(Node::text_node("c", "hi"))),
            Node::element("d", "div"),
        ]
    }

    #[test]
    fn test_id_collector_visits_depth_first() {
        let mut collector = IdCollector::default();
        collector.visit_roots(&sample());
        assert_eq!(collector.ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_mutable_visitor_rewrites_text() {
        let mut roots = sample();
        Uppercase.visit_roots_mut(&mut roots);
        assert_eq!(roots[0].text_content(), "HI");
    }
}
