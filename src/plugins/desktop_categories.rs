// src/plugins/desktop_categories.rs

//! Built-in category tree and menu paths
//!
//! Top-level categories group freedesktop.org desktop categories. Each
//! subcategory lists the `Main::Sub` desktop groups it contains.

use crate::app::category::app_has_desktop_group;
use crate::app::{AppData, AppList, Category};
use crate::error::Result;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;

pub const NAME: &str = "desktop-categories";

struct Section {
    id: &'static str,
    name: &'static str,
    icon: &'static str,
    subcategories: &'static [(&'static str, &'static str, &'static [&'static str])],
}

const SECTIONS: &[Section] = &[
    Section {
        id: "audio-video",
        name: "Audio & Video",
        icon: "folder-music-symbolic",
        subcategories: &[
            ("all", "All", &["AudioVideo"]),
            ("featured", "Featured", &["AudioVideo::Featured"]),
            (
                "creation-editing",
                "Audio Creation & Editing",
                &[
                    "AudioVideo::AudioVideoEditing",
                    "AudioVideo::Midi",
                    "AudioVideo::DiscBurning",
                    "AudioVideo::Sequencer",
                ],
            ),
            ("music-players", "Music Players", &["AudioVideo::Music", "AudioVideo::Player"]),
        ],
    },
    Section {
        id: "developer-tools",
        name: "Developer Tools",
        icon: "applications-engineering-symbolic",
        subcategories: &[
            ("all", "All", &["Development"]),
            ("featured", "Featured", &["Development::Featured"]),
            ("debuggers", "Debuggers", &["Development::Debugger"]),
            ("ide", "IDEs", &["Development::IDE", "Development::GUIDesigner"]),
        ],
    },
    Section {
        id: "education-science",
        name: "Education & Science",
        icon: "system-help-symbolic",
        subcategories: &[
            ("all", "All", &["Education", "Science"]),
            ("featured", "Featured", &["Education::Featured", "Science::Featured"]),
            ("artificial-intelligence", "Artificial Intelligence", &["Science::ArtificialIntelligence"]),
            ("astronomy", "Astronomy", &["Education::Astronomy", "Science::Astronomy"]),
            ("chemistry", "Chemistry", &["Education::Chemistry", "Science::Chemistry"]),
            ("languages", "Languages", &["Education::Languages", "Education::Literature"]),
            (
                "math",
                "Math",
                &[
                    "Education::Math",
                    "Education::NumericalAnalysis",
                    "Science::Math",
                    "Science::Physics",
                    "Science::NumericalAnalysis",
                ],
            ),
            ("robotics", "Robotics", &["Science::Robotics"]),
        ],
    },
    Section {
        id: "games",
        name: "Games",
        icon: "applications-games-symbolic",
        subcategories: &[
            ("all", "All", &["Game"]),
            ("featured", "Featured", &["Game::Featured"]),
            ("action", "Action", &["Game::ActionGame"]),
            ("adventure", "Adventure", &["Game::AdventureGame"]),
            ("arcade", "Arcade", &["Game::ArcadeGame"]),
            ("blocks", "Blocks", &["Game::BlocksGame"]),
            ("board", "Board", &["Game::BoardGame"]),
            ("card", "Card", &["Game::CardGame"]),
            ("emulator", "Emulators", &["Game::Emulator"]),
            ("kids", "Kids", &["Game::KidsGame"]),
            ("logic", "Logic", &["Game::LogicGame"]),
            ("role-playing", "Role Playing", &["Game::RolePlaying"]),
            ("sports", "Sports", &["Game::SportsGame", "Game::Simulation"]),
            ("strategy", "Strategy", &["Game::StrategyGame"]),
        ],
    },
    Section {
        id: "graphics",
        name: "Graphics & Photography",
        icon: "applications-graphics-symbolic",
        subcategories: &[
            ("all", "All", &["Graphics"]),
            ("featured", "Featured", &["Graphics::Featured"]),
            ("3d", "3D Graphics", &["Graphics::3DGraphics"]),
            ("photography", "Photography", &["Graphics::Photography"]),
            ("scanning", "Scanning", &["Graphics::Scanning"]),
            ("vector", "Vector Graphics", &["Graphics::VectorGraphics"]),
            ("viewers", "Viewers", &["Graphics::Viewer"]),
        ],
    },
    Section {
        id: "productivity",
        name: "Productivity",
        icon: "text-editor-symbolic",
        subcategories: &[
            ("all", "All", &["Office"]),
            ("featured", "Featured", &["Office::Featured"]),
            ("calendar", "Calendar", &["Office::Calendar", "Office::ProjectManagement"]),
            ("database", "Database", &["Office::Database"]),
            ("finance", "Finance", &["Office::Finance", "Office::Spreadsheet"]),
            ("word-processor", "Word Processor", &["Office::WordProcessor", "Office::Dictionary"]),
        ],
    },
    Section {
        id: "addons",
        name: "Add-ons",
        icon: "application-x-addon-symbolic",
        subcategories: &[
            ("fonts", "Fonts", &["Addon::Font"]),
            ("codecs", "Codecs", &["Addon::Codec"]),
            ("input-sources", "Input Sources", &["Addon::InputSource"]),
            ("language-packs", "Language Packs", &["Addon::LanguagePack"]),
            ("shell-extensions", "Shell Extensions", &["Addon::ShellExtension"]),
            ("localization", "Localization", &["Addon::Localization"]),
            ("drivers", "Hardware Drivers", &["Addon::Driver"]),
        ],
    },
    Section {
        id: "communication",
        name: "Communication & News",
        icon: "user-available-symbolic",
        subcategories: &[
            ("all", "All", &["Network"]),
            ("featured", "Featured", &["Network::Featured"]),
            (
                "chat",
                "Chat",
                &[
                    "Network::Chat",
                    "Network::IRCClient",
                    "Network::Telephony",
                    "Network::VideoConference",
                    "Network::Email",
                ],
            ),
            ("news", "News", &["Network::Feed", "Network::News"]),
            ("web-browsers", "Web Browsers", &["Network::WebBrowser"]),
        ],
    },
    Section {
        id: "reference",
        name: "Reference",
        icon: "view-dual-symbolic",
        subcategories: &[
            ("all", "All", &["Reference"]),
            ("featured", "Featured", &["Reference::Featured"]),
            ("art", "Art", &["Reference::Art"]),
            ("biography", "Biography", &["Reference::Biography"]),
            ("comics", "Comics", &["Reference::Comics"]),
            ("fiction", "Fiction", &["Reference::Fiction"]),
            ("health", "Health", &["Reference::Health"]),
            ("history", "History", &["Reference::History"]),
            ("lifestyle", "Lifestyle", &["Reference::Lifestyle"]),
            ("politics", "Politics", &["Reference::Politics"]),
            ("sports", "Sports", &["Reference::Sports"]),
        ],
    },
    Section {
        id: "utilities",
        name: "Utilities",
        icon: "applications-utilities-symbolic",
        subcategories: &[
            ("all", "All", &["Utility"]),
            ("featured", "Featured", &["Utility::Featured"]),
            ("text-editors", "Text Editors", &["Utility::TextEditor"]),
        ],
    },
];

/// Subcategories that are views of a section rather than a place in it
const NOT_A_MENU: &[&str] = &["all", "featured"];

/// The full category tree
pub fn category_tree() -> Vec<Category> {
    SECTIONS
        .iter()
        .map(|section| {
            let mut category = Category::new(section.id, section.name).with_icon(section.icon);
            for (id, name, groups) in section.subcategories {
                let mut child = Category::new(*id, *name);
                for group in *groups {
                    child.add_desktop_group(*group);
                }
                category.add_child(child);
            }
            category
        })
        .collect()
}

/// `[section, subcategory]` names of the first place the app fits
///
/// Apps that fit nowhere get a single empty element so they are not
/// looked up again.
pub fn menu_path(data: &AppData) -> Vec<String> {
    for section in SECTIONS {
        for (id, name, groups) in section.subcategories {
            if NOT_A_MENU.contains(id) {
                continue;
            }
            if groups.iter().any(|group| app_has_desktop_group(data, group)) {
                return vec![section.name.to_string(), name.to_string()];
            }
        }
    }
    vec![String::new()]
}

#[derive(Debug, Default)]
pub struct DesktopCategoriesPlugin;

impl DesktopCategoriesPlugin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for DesktopCategoriesPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LIST_CATEGORIES | Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::appstream::NAME)]
    }

    async fn list_categories(&self, _ctx: &PluginContext, categories: &mut Vec<Category>) -> Result<()> {
        for category in category_tree() {
            if !categories.iter().any(|c| c.id == category.id) {
                categories.push(category);
            }
        }
        Ok(())
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        list: &mut AppList,
        flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        if !flags.contains(RefineFlags::MENU_PATH) {
            return Ok(());
        }
        for app in list.iter() {
            app.update(|data| {
                if data.menu_path.is_none() {
                    data.menu_path = Some(menu_path(data));
                }
            });
        }
        Ok(())
    }
}
