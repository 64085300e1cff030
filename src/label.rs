//! Workspace label composition.

use crate::icons::IconMap;
use crate::tree::ContainerNode;

/// Cosmetic settings for composed labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelStyle {
    /// Appended after every icon
    pub separator: String,
    /// Used for window classes with no icon in the map
    pub fallback_icon: String,
    /// Inserted between the number and the first icon (only if there is one)
    pub number_delimiter: String,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            separator: "    ".to_string(),
            fallback_icon: "?".to_string(),
            number_delimiter: String::new(),
        }
    }
}

/// Build the new name for a workspace from its windows, in order.
///
/// A workspace without windows renders as its bare number.
pub fn compose_label(
    workspace: &ContainerNode,
    windows: &[&ContainerNode],
    icons: &IconMap,
    style: &LabelStyle,
) -> String {
    let mut label = workspace.num.unwrap_or_default().to_string();
    if windows.is_empty() {
        return label;
    }

    label.push_str(&style.number_delimiter);
    for window in windows {
        let icon = icons
            .get(window.window_class())
            .unwrap_or(style.fallback_icon.as_str());
        label.push_str(icon);
        label.push_str(&style.separator);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{window, workspace};

    fn icons() -> IconMap {
        IconMap::from_pairs([("firefox", "🔥"), ("Alacritty", "T")])
    }

    #[test]
    fn test_known_and_unknown_classes() {
        let ws = workspace(1, "1", vec![]);
        let firefox = window(1, "firefox");
        let unknown = window(2, "unknownapp");
        let label = compose_label(&ws, &[&firefox, &unknown], &icons(), &LabelStyle::default());
        assert_eq!(label, "1🔥    ?    ");
    }

    #[test]
    fn test_empty_workspace_is_bare_number() {
        let ws = workspace(7, "7: old", vec![]);
        assert_eq!(compose_label(&ws, &[], &icons(), &LabelStyle::default()), "7");
    }

    #[test]
    fn test_lookup_ignores_case() {
        let ws = workspace(2, "2", vec![]);
        let upper = window(1, "FIREFOX");
        let mixed = window(2, "alacritty");
        let style = LabelStyle {
            separator: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(compose_label(&ws, &[&upper, &mixed], &icons(), &style), "2🔥 T ");
    }

    #[test]
    fn test_number_delimiter_and_custom_fallback() {
        let ws = workspace(3, "3", vec![]);
        let a = window(1, "nothing-mapped");
        let style = LabelStyle {
            separator: " ".to_string(),
            fallback_icon: "-".to_string(),
            number_delimiter: ": ".to_string(),
        };
        assert_eq!(compose_label(&ws, &[&a], &icons(), &style), "3: - ");
        assert_eq!(compose_label(&ws, &[], &icons(), &style), "3");
    }

    #[test]
    fn test_empty_class_uses_fallback() {
        let ws = workspace(4, "4", vec![]);
        let mut classless = window(1, "");
        classless.window_properties = None;
        assert_eq!(
            compose_label(&ws, &[&classless], &icons(), &LabelStyle::default()),
            "4?    "
        );
    }

    #[test]
    fn test_composition_is_deterministic() {
        let ws = workspace(5, "5", vec![]);
        let windows = [window(1, "firefox"), window(2, "x"), window(3, "alacritty")];
        let refs: Vec<&ContainerNode> = windows.iter().collect();
        let map = icons();
        let style = LabelStyle::default();
        let first = compose_label(&ws, &refs, &map, &style);
        let second = compose_label(&ws, &refs, &map, &style);
        assert_eq!(first, second);
        assert_eq!(first, "5🔥    ?    T    ");
    }
}
