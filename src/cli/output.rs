//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use termtree::Tree;

use crate::domain::Node;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// One listing line: folders in blue, encrypted files dimmed.
pub fn node_line(node: &Node) -> String {
    let label = format!("{} {}", node.icon(), node.name);
    let label = if node.is_folder() {
        label.blue().bold().to_string()
    } else if node.is_encrypted() {
        label.dimmed().to_string()
    } else {
        label
    };
    format!("{}  {}", label, format!("[{}]", node.id).dimmed())
}

/// Build a printable tree from `(depth, node)` pairs in pre-order.
pub fn render_tree(nodes: &[(usize, Node)], label: impl Fn(&Node) -> String) -> Tree<String> {
    let mut stack: Vec<Tree<String>> = vec![Tree::new("/".to_string())];
    for (depth, node) in nodes {
        fold_to(&mut stack, depth + 1);
        stack.push(Tree::new(label(node)));
    }
    fold_to(&mut stack, 1);
    stack.pop().unwrap_or_else(|| Tree::new("/".to_string()))
}

/// Attach finished subtrees to their parents until `len` entries remain.
fn fold_to(stack: &mut Vec<Tree<String>>, len: usize) {
    while stack.len() > len {
        let Some(done) = stack.pop() else { break };
        if let Some(parent) = stack.last_mut() {
            parent.push(done);
        }
    }
}
