use crate::walker::{Listing, NodeKind, TreeNode};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Renders the included entries as a box-drawing tree.
///
/// The first line is the root directory name with a trailing `/`;
/// directories carry a trailing `/` as well. No trailing newline.
#[must_use]
pub fn render_tree(listing: &Listing) -> String {
    let mut lines = vec![format!("{}/", listing.root_name)];
    render_level(&listing.entries, "", &mut lines);
    lines.join("\n")
}

fn render_level(nodes: &[TreeNode], prefix: &str, lines: &mut Vec<String>) {
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == nodes.len();
        let connector = if is_last { LAST_BRANCH } else { BRANCH };

        match &node.kind {
            NodeKind::Directory(children) => {
                lines.push(format!("{prefix}{connector}{}/", node.name));
                let child_prefix = format!("{prefix}{}", if is_last { SPACE } else { PIPE });
                render_level(children, &child_prefix, lines);
            }
            NodeKind::File => lines.push(format!("{prefix}{connector}{}", node.name)),
        }
    }
}
