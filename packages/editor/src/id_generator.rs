use crc32fast::Hasher;
use folio_common::{IdCollector, Node, Visitor};

/// Derive a short, stable id seed from a document id using CRC32
pub fn document_seed(document_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(document_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential id generator for nodes created during a session
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(document_id: &str) -> Self {
        Self::from_seed(document_seed(document_id))
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Skip past every `<seed>-<n>` id already present in `roots`
    pub fn observe(&mut self, roots: &[Node]) {
        let mut collector = IdCollector::default();
        collector.visit_roots(roots);

        let prefix = format!("{}-", self.seed);
        for id in &collector.ids {
            if let Some(n) = id.strip_prefix(&prefix).and_then(|s| s.parse::<u32>().ok()) {
                self.count = self.count.max(n);
            }
        }
    }

    /// Generate next sequential id
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Give `node` and all its descendants fresh ids
    pub fn reassign(&mut self, node: &mut Node) {
        node.id = self.new_id();
        for child in node.children.iter_mut() {
            self.reassign(child);
        }
    }
}
