pub mod fallback;
pub mod orchestrator;
pub mod runtime;
pub mod vectorize;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IconVariant {
    Menu,
    Chat,
}

impl IconVariant {
    pub const OUTPUT_ORDER: [Self; 2] = [Self::Menu, Self::Chat];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Chat => "chat",
        }
    }

    pub fn output_file_name(self, icon_name: &str) -> String {
        format!("{icon_name}_{}.svg", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_file_names_follow_variant_suffix() {
        assert_eq!(
            IconVariant::Menu.output_file_name("story_flow_map"),
            "story_flow_map_menu.svg"
        );
        assert_eq!(
            IconVariant::Chat.output_file_name("story_flow_map"),
            "story_flow_map_chat.svg"
        );
    }
}
