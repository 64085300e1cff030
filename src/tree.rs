//! Container tree as reported by i3's GET_TREE reply.
//!
//! The tree is refetched on every reconciliation pass and only ever read.
//! Workspaces and windows are borrowed views into it, found by pre-order
//! depth-first traversal.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Kind of a container node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Output,
    Workspace,
    /// Tiled container (i3 calls it `con`)
    #[serde(rename = "con")]
    Container,
    #[serde(rename = "floating_con")]
    FloatingContainer,
    Dockarea,
    #[default]
    #[serde(other)]
    Other,
}

/// X11 properties of the window held by a node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WindowProperties {
    #[serde(deserialize_with = "lenient")]
    pub class: Option<String>,
}

/// A node in the container tree.
///
/// Every field is decoded leniently: a missing, null or wrongly typed value
/// falls back to its default, and a child that is not a node at all is
/// dropped. An unexpected node shape therefore fails to qualify as a
/// workspace or window instead of failing the whole tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerNode {
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: NodeKind,
    /// Workspace number; -1 for the scratchpad workspace
    #[serde(deserialize_with = "lenient")]
    pub num: Option<i32>,
    /// X11 window id, null for pure containers
    #[serde(deserialize_with = "lenient")]
    pub window: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub window_properties: Option<WindowProperties>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_nodes")]
    pub nodes: Vec<ContainerNode>,
    #[serde(deserialize_with = "lenient_nodes")]
    pub floating_nodes: Vec<ContainerNode>,
}

/// Decode a field, falling back to its default when the value has the wrong type.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Decode a child list, keeping only the entries that are nodes.
fn lenient_nodes<'de, D>(deserializer: D) -> Result<Vec<ContainerNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| ContainerNode::deserialize(item).ok())
        .collect())
}

/// Workspace number of the internal scratchpad
pub const SCRATCH_WORKSPACE_NUM: i32 = -1;

impl ContainerNode {
    /// Children in traversal order: tiled first, then floating.
    pub fn children(&self) -> impl Iterator<Item = &ContainerNode> {
        self.nodes.iter().chain(self.floating_nodes.iter())
    }

    pub fn window_handle(&self) -> u64 {
        self.window.unwrap_or(0)
    }

    /// Window class, empty if the node carries none
    pub fn window_class(&self) -> &str {
        self.window_properties
            .as_ref()
            .and_then(|p| p.class.as_deref())
            .unwrap_or("")
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Workspace number, if this is a renameable workspace
    pub fn workspace_num(&self) -> Option<i32> {
        if self.kind != NodeKind::Workspace {
            return None;
        }
        self.num.filter(|&n| n != SCRATCH_WORKSPACE_NUM)
    }

    fn is_workspace(&self) -> bool {
        self.workspace_num().is_some()
    }

    fn is_window(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Container | NodeKind::FloatingContainer
        ) && self.window_handle() > 0
    }
}

/// Collect all workspaces below `roots` in pre-order.
///
/// A matched workspace is not searched for nested workspaces.
pub fn extract_workspaces<'a, I>(roots: I) -> Vec<&'a ContainerNode>
where
    I: IntoIterator<Item = &'a ContainerNode>,
{
    let mut workspaces = Vec::new();
    for node in roots {
        collect(node, ContainerNode::is_workspace, &mut workspaces);
    }
    workspaces
}

/// Collect all real windows below `roots` in pre-order, left to right.
///
/// A window node is a leaf: anything nested under it is ignored.
pub fn extract_windows<'a, I>(roots: I) -> Vec<&'a ContainerNode>
where
    I: IntoIterator<Item = &'a ContainerNode>,
{
    let mut windows = Vec::new();
    for node in roots {
        collect(node, ContainerNode::is_window, &mut windows);
    }
    windows
}

fn collect<'a>(
    node: &'a ContainerNode,
    qualifies: fn(&ContainerNode) -> bool,
    out: &mut Vec<&'a ContainerNode>,
) {
    if qualifies(node) {
        out.push(node);
        return;
    }
    for child in node.children() {
        collect(child, qualifies, out);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn workspace(num: i32, name: &str, nodes: Vec<ContainerNode>) -> ContainerNode {
        ContainerNode {
            kind: NodeKind::Workspace,
            num: Some(num),
            name: Some(name.to_string()),
            nodes,
            ..Default::default()
        }
    }

    pub fn window(handle: u64, class: &str) -> ContainerNode {
        ContainerNode {
            kind: NodeKind::Container,
            window: Some(handle),
            window_properties: Some(WindowProperties {
                class: Some(class.to_string()),
            }),
            ..Default::default()
        }
    }

    pub fn split(nodes: Vec<ContainerNode>) -> ContainerNode {
        ContainerNode {
            kind: NodeKind::Container,
            nodes,
            ..Default::default()
        }
    }

    pub fn output(name: &str, nodes: Vec<ContainerNode>) -> ContainerNode {
        ContainerNode {
            kind: NodeKind::Output,
            name: Some(name.to_string()),
            nodes,
            ..Default::default()
        }
    }

    fn classes(windows: &[&ContainerNode]) -> Vec<String> {
        windows.iter().map(|w| w.window_class().to_string()).collect()
    }

    #[test]
    fn test_scratch_workspace_excluded() {
        let root = output(
            "__i3",
            vec![workspace(-1, "__i3_scratch", vec![window(7, "hidden")])],
        );
        let screen = output(
            "eDP-1",
            vec![workspace(1, "1", vec![]), workspace(2, "2", vec![])],
        );
        let roots = [root, screen];
        let found = extract_workspaces(&roots);
        let nums: Vec<i32> = found.iter().filter_map(|w| w.workspace_num()).collect();
        assert_eq!(nums, vec![1, 2]);
    }

    #[test]
    fn test_workspaces_in_preorder_across_outputs() {
        let roots = [
            output("DP-1", vec![workspace(3, "3", vec![]), workspace(1, "1", vec![])]),
            output("DP-2", vec![workspace(2, "2", vec![])]),
        ];
        let names: Vec<&str> = extract_workspaces(&roots)
            .iter()
            .map(|w| w.display_name())
            .collect();
        assert_eq!(names, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let roots: [ContainerNode; 0] = [];
        assert!(extract_workspaces(&roots).is_empty());
        assert!(extract_windows(&roots).is_empty());
    }

    #[test]
    fn test_windows_depth_first_preorder() {
        let ws = workspace(
            1,
            "1",
            vec![
                window(1, "a"),
                split(vec![window(2, "b"), split(vec![window(3, "c")])]),
                window(4, "d"),
            ],
        );
        let windows = extract_windows(ws.children());
        assert_eq!(classes(&windows), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_floating_windows_follow_tiled() {
        let mut ws = workspace(1, "1", vec![window(1, "tiled")]);
        ws.floating_nodes.push(ContainerNode {
            kind: NodeKind::FloatingContainer,
            nodes: vec![window(2, "floating")],
            ..Default::default()
        });
        let windows = extract_windows(ws.children());
        assert_eq!(classes(&windows), vec!["tiled", "floating"]);
    }

    #[test]
    fn test_window_not_recursed_into() {
        let mut outer = window(1, "outer");
        outer.nodes.push(window(2, "inner"));
        let ws = workspace(1, "1", vec![outer]);
        let windows = extract_windows(ws.children());
        assert_eq!(classes(&windows), vec!["outer"]);
    }

    #[test]
    fn test_containers_without_windows_do_not_count() {
        let ws = workspace(1, "1", vec![split(vec![]), split(vec![split(vec![])])]);
        assert!(extract_windows(ws.children()).is_empty());

        let mut zero = window(0, "ghost");
        zero.window = Some(0);
        let ws = workspace(2, "2", vec![zero]);
        assert!(extract_windows(ws.children()).is_empty());
    }

    #[test]
    fn test_deserialize_i3_tree() {
        let json = r#"{
            "id": 1, "type": "root", "name": "root",
            "nodes": [{
                "id": 2, "type": "output", "name": "eDP-1",
                "nodes": [{
                    "id": 3, "type": "con", "name": "content",
                    "nodes": [{
                        "id": 4, "type": "workspace", "num": 1, "name": "1",
                        "nodes": [{
                            "id": 5, "type": "con", "name": "Mozilla Firefox",
                            "window": 37748739,
                            "window_properties": {"class": "Firefox", "instance": "Navigator"},
                            "nodes": []
                        }],
                        "floating_nodes": []
                    }]
                }]
            }]
        }"#;
        let root: ContainerNode = serde_json::from_str(json).unwrap();
        let workspaces = extract_workspaces(root.children());
        assert_eq!(workspaces.len(), 1);
        let windows = extract_windows(workspaces[0].children());
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].window_class(), "Firefox");
        assert_eq!(windows[0].window_handle(), 37748739);
    }

    #[test]
    fn test_unexpected_node_shape_does_not_qualify() {
        let json = r#"{
            "type": "root",
            "nodes": [
                {"type": "workspace", "name": "no-number"},
                {"type": "mystery", "window": 12},
                {"type": "con", "window": null},
                {"type": "workspace", "num": 4, "name": "4",
                 "nodes": [{"type": "con", "window": 9}]}
            ]
        }"#;
        let root: ContainerNode = serde_json::from_str(json).unwrap();
        let workspaces = extract_workspaces(root.children());
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].workspace_num(), Some(4));
        let windows = extract_windows(workspaces[0].children());
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].window_class(), "");
    }

    #[test]
    fn test_malformed_sibling_keeps_good_workspace() {
        let json = r#"{
            "type": "root",
            "nodes": [
                {"type": "workspace", "num": "7", "name": "7"},
                {"type": "con", "window": "abc", "window_properties": {"class": 3}},
                {"type": "workspace", "num": 8, "name": "8", "nodes": null},
                {"type": 5, "name": ["x"], "floating_nodes": {"not": "a list"}},
                42,
                null,
                {"type": "workspace", "num": 1, "name": "1",
                 "nodes": [
                     "junk",
                     {"type": "con", "window": 11, "window_properties": {"class": "firefox"}}
                 ]}
            ]
        }"#;
        let root: ContainerNode = serde_json::from_str(json).unwrap();
        let workspaces = extract_workspaces(root.children());
        let nums: Vec<i32> = workspaces.iter().filter_map(|w| w.workspace_num()).collect();
        assert_eq!(nums, vec![8, 1]);

        assert!(extract_windows(workspaces[0].children()).is_empty());
        let windows = extract_windows(workspaces[1].children());
        assert_eq!(classes(&windows), vec!["firefox"]);
        assert_eq!(windows[0].window_handle(), 11);
    }
}
