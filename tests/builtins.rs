// tests/builtins.rs

//! Built-in plugins driven through the loader, and listing operations.

mod common;

use appcenter::app::{ids, AppList, AppScope, BundleKind, Icon, KeyColor};
use appcenter::icon::{IconResolver, Pixbuf, StaticIconResolver};
use appcenter::plugins::blocklist::BlocklistPlugin;
use appcenter::plugins::desktop_categories::DesktopCategoriesPlugin;
use appcenter::plugins::generic_updates::GenericUpdatesPlugin;
use appcenter::plugins::history::StaticHistoryProvider;
use appcenter::plugins::icons::IconsPlugin;
use appcenter::plugins::key_colors::KeyColorsPlugin;
use appcenter::plugins::provenance::ProvenancePlugin;
use appcenter::plugins::{history, icons};
use appcenter::settings::OFFICIAL_REPOS;
use appcenter::{
    App, AppKind, AppQuery, Config, Error, PluginLoader, PluginRegistry, Quirks, RefineFlags,
    RefineJobFlags, SharedContext,
};
use common::{loader_with, CatalogPlugin};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn package(id: &str, kind: AppKind) -> Arc<App> {
    let app = App::new(id);
    app.update(|d| {
        d.kind = kind;
        d.bundle_kind = BundleKind::Package;
        d.scope = AppScope::System;
    });
    app.shared()
}

#[tokio::test]
async fn test_blocklisted_apps_hidden_after_refine() {
    let loader = loader_with(vec![Arc::new(BlocklistPlugin::new())]).await;

    let mut list = AppList::new();
    let wine = App::new("wine-notepad.desktop").shared();
    let maps = App::new("org.gnome.Maps.desktop").shared();
    list.add(wine.clone());
    list.add(maps.clone());

    loader
        .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &CancellationToken::new())
        .await
        .unwrap();

    assert!(wine.has_quirk(Quirks::HIDE_EVERYWHERE));
    assert!(!maps.has_quirk(Quirks::HIDE_EVERYWHERE));
    assert_eq!(list.len(), 2);
}

#[tokio::test]
async fn test_package_updates_fold_into_os_update() {
    let loader = loader_with(vec![Arc::new(GenericUpdatesPlugin::new())]).await;

    let mut list = AppList::new();
    let desktop = package("org.gnome.Maps.desktop", AppKind::DesktopApp);
    list.add(desktop.clone());
    list.add(package("bash", AppKind::Generic));
    list.add(package("glibc", AppKind::Generic));

    loader
        .refine(
            &mut list,
            RefineFlags::UPDATE_DETAILS,
            RefineJobFlags::NONE,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(list.len(), 2);
    assert!(list.contains(&desktop));
    let proxy = list.lookup(ids::OS_UPDATE).unwrap();
    assert!(proxy.has_quirk(Quirks::IS_PROXY));
    assert_eq!(proxy.kind(), AppKind::OsUpdate);
    assert_eq!(proxy.related().len(), 2);
}

#[tokio::test]
async fn test_provenance_follows_settings() {
    let shared = SharedContext::default();
    shared.settings.set_strv(OFFICIAL_REPOS, vec!["fedora*".to_string()]);
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(ProvenancePlugin::new())).unwrap();
    let mut loader = PluginLoader::with_registry(registry, shared);
    let cancel = CancellationToken::new();
    loader.setup(&cancel).await.unwrap();

    let official = App::new("org.gnome.Maps").shared();
    official.update(|d| d.origin = Some("fedora-updates".to_string()));
    let mut list = AppList::new();
    list.add(official.clone());
    loader
        .refine(&mut list, RefineFlags::PROVENANCE, RefineJobFlags::NONE, &cancel)
        .await
        .unwrap();
    assert!(official.has_quirk(Quirks::PROVENANCE));

    // A settings change is picked up by the next refine
    loader
        .settings()
        .set_strv(OFFICIAL_REPOS, vec!["rhel".to_string()]);
    let other = App::new("org.gnome.Weather").shared();
    other.update(|d| d.origin = Some("fedora".to_string()));
    let mut list = AppList::new();
    list.add(other.clone());
    loader
        .refine(&mut list, RefineFlags::PROVENANCE, RefineJobFlags::NONE, &cancel)
        .await
        .unwrap();
    assert!(!other.has_quirk(Quirks::PROVENANCE));
}

#[tokio::test]
async fn test_key_colors_alone_loads_the_icon_first() {
    let resolver = Arc::new(StaticIconResolver::new());
    resolver.insert("maps", Pixbuf::solid(64, 64, KeyColor::new(40, 120, 200)));
    let shared = SharedContext {
        icon_resolver: Some(resolver as Arc<dyn IconResolver>),
        ..SharedContext::default()
    };
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(KeyColorsPlugin::new())).unwrap();
    registry.register(Arc::new(IconsPlugin::new())).unwrap();
    let mut loader = PluginLoader::with_registry(registry, shared);
    let cancel = CancellationToken::new();
    loader.setup(&cancel).await.unwrap();

    let app = App::new("org.gnome.Maps.desktop").shared();
    app.update(|d| d.icons.push(Icon::stock("maps")));
    let mut list = AppList::new();
    list.add(app.clone());

    let report = loader
        .refine(&mut list, RefineFlags::KEY_COLORS, RefineJobFlags::NONE, &cancel)
        .await
        .unwrap();

    assert_eq!(report.plugins_run(), vec!["icons", "key-colors"]);
    let data = app.read();
    assert!(data.pixbuf.is_some());
    assert!(!data.key_colors.is_empty());
}

#[tokio::test]
async fn test_categories_listed() {
    let loader = loader_with(vec![Arc::new(DesktopCategoriesPlugin::new())]).await;
    let categories = loader.list_categories(&CancellationToken::new()).await.unwrap();
    assert_eq!(categories.len(), 10);
    assert!(categories.iter().any(|c| c.id == "games" && !c.children.is_empty()));
}

#[tokio::test]
async fn test_search_matches_all_terms() {
    let loader = loader_with(vec![
        CatalogPlugin::new(
            "catalog",
            vec![("org.gnome.Maps", "Maps"), ("org.gnome.Weather", "Weather")],
        ),
        Arc::new(BlocklistPlugin::new()),
    ])
    .await;
    let cancel = CancellationToken::new();

    let list = loader
        .search(&["gnome".to_string(), "maps".to_string()], RefineFlags::NONE, &cancel)
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.get(0).unwrap().id().as_deref(), Some("org.gnome.Maps"));

    let err = loader.search(&[" ".to_string()], RefineFlags::NONE, &cancel).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedQuery(_)));
}

#[tokio::test]
async fn test_list_apps_rejects_empty_query_and_truncates() {
    let loader = loader_with(vec![CatalogPlugin::new(
        "catalog",
        vec![("a.desktop", "A"), ("b.desktop", "B"), ("c.desktop", "C")],
    )])
    .await;
    let cancel = CancellationToken::new();

    let err = loader.list_apps(&AppQuery::new(), &cancel).await.unwrap_err();
    assert!(err.is_unsupported());

    let featured = AppQuery::new().with_featured(true);
    assert_eq!(loader.list_apps(&featured, &cancel).await.unwrap().len(), 3);

    let limited = AppQuery::new().with_featured(true).with_max_results(2);
    let list = loader.list_apps(&limited, &cancel).await.unwrap();
    assert_eq!(list.len(), 2);

    // A filter no plugin serves yields an empty result, not an error
    let by_category = AppQuery::new().with_category("games");
    assert!(loader.list_apps(&by_category, &cancel).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_without_handler_is_unsupported() {
    let loader = loader_with(vec![Arc::new(DesktopCategoriesPlugin::new())]).await;
    let err = loader
        .file_to_app(Path::new("/tmp/archive.tar"), RefineFlags::NONE, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
}

#[tokio::test]
async fn test_default_loader_disables_plugins_missing_services() {
    let mut loader = PluginLoader::new(Config::default())
        .unwrap()
        .with_history_provider(Arc::new(StaticHistoryProvider::new()));
    let cancel = CancellationToken::new();
    loader.setup(&cancel).await.unwrap();

    let state = loader.plugin_state();
    assert_eq!(state.len(), 14);
    let find = |name: &str| state.iter().find(|s| s.name == name).unwrap();
    assert!(!find(icons::NAME).enabled);
    assert!(find(history::NAME).enabled);

    let enabled: Vec<usize> = state.iter().filter_map(|s| s.order).collect();
    assert_eq!(enabled, (0..enabled.len()).collect::<Vec<_>>());

    loader.shutdown(&cancel).await;
}
