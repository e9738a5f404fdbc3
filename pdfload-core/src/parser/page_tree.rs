//! PDF Page Tree Parser
//!
//! Flattens the page tree into the ordered page list kept by [`PdfReader`].
//!
//! # Overview
//!
//! The PDF page tree consists of:
//! - **Page Tree Nodes** (`/Pages`): internal nodes whose `/Kids` hold other nodes or pages
//! - **Page Objects** (`/Page`): leaves, one per page, in document order
//!
//! Walking starts at the trailer's `/Root`. Malformed subtrees are reported as
//! errors in the reader's diagnostics and contribute no pages; they never
//! abort the load.

use super::objects::{ObjectKey, PdfObject};
use super::reader::PdfReader;
use super::ParseResult;

/// Nodes deeper than this are reported instead of followed
const MAX_PAGE_TREE_DEPTH: usize = 256;

/// Collect every page reachable from the document catalog, in order.
///
/// Indirect pages are returned as references into the reader's object table;
/// inline page dictionaries are returned as they are.
pub(crate) fn flatten(reader: &mut PdfReader) -> ParseResult<Vec<PdfObject>> {
    let Some(root) = reader.trailer().root().cloned() else {
        reader
            .diagnostics_mut()
            .error(None, "Invalid page tree: trailer has no /Root");
        return Ok(Vec::new());
    };

    let mut walker = PageTreeWalker {
        reader,
        path: Vec::new(),
        pages: Vec::new(),
    };
    walker.read_node(root, 0, true)?;
    Ok(walker.pages)
}

/// What a node needs to be dispatched, copied out of the object table
struct NodeInfo {
    node_type: Option<String>,
    kids: Option<PdfObject>,
    pages: Option<PdfObject>,
}

struct PageTreeWalker<'a> {
    reader: &'a mut PdfReader,
    /// Indirect nodes between the root and the node being read
    path: Vec<ObjectKey>,
    pages: Vec<PdfObject>,
}

impl PageTreeWalker<'_> {
    fn read_node(&mut self, node: PdfObject, depth: usize, is_root: bool) -> ParseResult<()> {
        if depth > MAX_PAGE_TREE_DEPTH {
            self.error(format!(
                "Page tree deeper than {MAX_PAGE_TREE_DEPTH} levels"
            ));
            return Ok(());
        }

        let key = node.as_reference();
        if let Some(key) = key {
            if self.path.contains(&key) {
                self.error(format!("Page tree cycle through object {key}"));
                return Ok(());
            }
        }

        let info = {
            let value = self.reader.resolve_value(&node)?;
            match value.as_dict() {
                Some(dict) => NodeInfo {
                    node_type: dict.get_type().map(str::to_owned),
                    kids: dict.get("Kids").cloned(),
                    pages: dict.get("Pages").cloned(),
                },
                None => {
                    let message = format!(
                        "Expected /Page or /Pages dictionary, got {}",
                        value.kind()
                    );
                    self.error(message);
                    return Ok(());
                }
            }
        };

        match info.node_type.as_deref() {
            Some("Page") => self.pages.push(node),
            Some("Pages") => {
                let Some(kids) = info.kids else {
                    self.error("Invalid page tree: /Pages node without /Kids".to_string());
                    return Ok(());
                };
                let kids = self.reader.resolve_value(&kids)?.clone();
                let Some(kids) = kids.as_array() else {
                    self.error(format!(
                        "Invalid page tree: /Kids is {}, expected array",
                        kids.kind()
                    ));
                    return Ok(());
                };

                self.enter(key);
                for kid in kids {
                    self.read_node(kid.clone(), depth + 1, false)?;
                }
                self.leave(key);
            }
            Some("Catalog") if is_root => {
                let Some(pages) = info.pages else {
                    self.error("Invalid page tree: catalog has no /Pages".to_string());
                    return Ok(());
                };
                self.enter(key);
                self.read_node(pages, depth + 1, false)?;
                self.leave(key);
            }
            other => {
                let found = other.map_or_else(|| "no /Type".to_string(), |t| format!("/{t}"));
                self.error(format!("Expected /Page or /Pages dictionary, got {found}"));
            }
        }

        Ok(())
    }

    fn enter(&mut self, key: Option<ObjectKey>) {
        if let Some(key) = key {
            self.path.push(key);
        }
    }

    fn leave(&mut self, key: Option<ObjectKey>) {
        if key.is_some() {
            self.path.pop();
        }
    }

    fn error(&mut self, message: String) {
        self.reader.diagnostics_mut().error(None, message);
    }
}
