// src/app/category.rs
//! Category tree for browsing apps

use super::AppData;
use serde::Serialize;

/// A browsable category, possibly with subcategories
///
/// Membership is defined by desktop groups: `Audio::Music` matches an app
/// listing both `Audio` and `Music` among its categories.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub desktop_groups: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
    /// Number of apps known to be in this category
    pub size: usize,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn add_desktop_group(&mut self, group: impl Into<String>) {
        let group = group.into();
        if !self.desktop_groups.contains(&group) {
            self.desktop_groups.push(group);
        }
    }

    pub fn add_child(&mut self, child: Category) {
        self.children.push(child);
    }

    pub fn find_child(&self, id: &str) -> Option<&Category> {
        self.children.iter().find(|c| c.id == id)
    }

    /// Whether the app belongs to any of this category's desktop groups
    pub fn matches(&self, app: &AppData) -> bool {
        self.desktop_groups
            .iter()
            .any(|group| app_has_desktop_group(app, group))
    }

    /// Count `app` in this category and every matching child
    pub fn count_app(&mut self, app: &AppData) {
        let mut matched = false;
        for child in &mut self.children {
            if child.matches(app) {
                child.size += 1;
                matched = true;
            }
        }
        if matched || self.matches(app) {
            self.size += 1;
        }
    }
}

/// True if the app has every category named in a `A::B` desktop group
pub fn app_has_desktop_group(app: &AppData, group: &str) -> bool {
    group.split("::").all(|part| app.has_category(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;

    #[test]
    fn test_desktop_group_matching() {
        let app = App::new("org.example.Player");
        app.update(|a| a.categories = vec!["AudioVideo".into(), "Music".into()]);

        assert!(app_has_desktop_group(&app.read(), "AudioVideo::Music"));
        assert!(!app_has_desktop_group(&app.read(), "AudioVideo::Midi"));
    }

    #[test]
    fn test_count_app() {
        let mut parent = Category::new("audio-video", "Audio & Video");
        parent.add_desktop_group("AudioVideo");
        let mut players = Category::new("music-players", "Music Players");
        players.add_desktop_group("AudioVideo::Music");
        parent.add_child(players);

        let app = App::new("org.example.Player");
        app.update(|a| a.categories = vec!["AudioVideo".into(), "Music".into()]);
        parent.count_app(&app.read());

        assert_eq!(parent.size, 1);
        assert_eq!(parent.find_child("music-players").unwrap().size, 1);
    }
}
