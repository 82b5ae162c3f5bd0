// ── Menu tree → route tree ──
//
// Turns the server-delivered menu tree into navigation routes, and merges
// it with the built-in route set filtered by the user's roles.

use std::collections::HashSet;

use serde::Serialize;
use tidewatch_api::auth_center::models::{MenuNode, MenuType};
use tracing::{debug, warn};

/// Role that unlocks the built-in administration section.
pub const ADMIN_ROLE: &str = "admin";

/// What a route renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "view", rename_all = "camelCase")]
pub enum RouteComponent {
    /// Container that renders its children.
    Layout,
    /// A resolved page view.
    View(String),
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub hidden: bool,
    pub keep_alive: bool,
    pub affix: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg_icon: Option<String>,
    /// Show the parent even when it has a single child.
    pub always_show: bool,
    /// Roles allowed to see the route; `None` means everyone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<RouteComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    pub meta: RouteMeta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Route>,
}

impl Route {
    fn new(path: &str, name: Option<&str>, component: RouteComponent) -> Self {
        Self {
            path: path.to_owned(),
            name: name.map(str::to_owned),
            component: Some(component),
            ..Self::default()
        }
    }

    fn title(mut self, title: &str) -> Self {
        self.meta.title = Some(title.to_owned());
        self
    }

    fn icon(mut self, icon: &str) -> Self {
        self.meta.svg_icon = Some(icon.to_owned());
        self
    }

    fn hidden(mut self) -> Self {
        self.meta.hidden = true;
        self
    }

    fn always_show(mut self) -> Self {
        self.meta.always_show = true;
        self
    }

    fn redirect(mut self, to: &str) -> Self {
        self.redirect = Some(to.to_owned());
        self
    }

    fn roles(mut self, roles: &[&str]) -> Self {
        self.meta.roles = Some(roles.iter().map(|r| (*r).to_owned()).collect());
        self
    }

    fn children(mut self, children: Vec<Route>) -> Self {
        self.children = children;
        self
    }
}

// ── Component resolution ─────────────────────────────────────────────

/// Maps a menu's `component` path to a page view.
pub trait ComponentRegistry: Send + Sync {
    fn resolve(&self, component: &str) -> Option<String>;
}

/// A fixed set of known view paths (relative to the pages root).
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    views: HashSet<String>,
}

impl StaticRegistry {
    pub fn new<I, S>(views: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            views: views.into_iter().map(Into::into).collect(),
        }
    }

    /// The console's own pages.
    pub fn builtin() -> Self {
        Self::new([
            "data-center/wave-buoy/index.vue",
            "data-center/weather-buoy/index.vue",
            "raw-data/bei-dou/index.vue",
            "raw-data/iridium/index.vue",
            "device-center/device-models/index.vue",
            "device-center/devices/index.vue",
            "device-center/firmwares/index.vue",
            "system/users/index.vue",
            "system/roles/index.vue",
            "system/menus/index.vue",
            "system/permissions/index.vue",
            "error/403.vue",
            "error/404.vue",
            "login/index.vue",
            "redirect/index.vue",
        ])
    }
}

impl ComponentRegistry for StaticRegistry {
    fn resolve(&self, component: &str) -> Option<String> {
        let key = component
            .trim()
            .trim_start_matches("@/pages/")
            .trim_start_matches('/');
        self.views.get(key).cloned()
    }
}

// ── Transformation ───────────────────────────────────────────────────

/// Join a child path onto its parent, trailing-slash aware.
pub fn join_path(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        child.to_owned()
    } else if parent.ends_with('/') {
        format!("{parent}{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Build routes from a menu tree. Button nodes never become routes.
pub fn transform_menus(menus: &[MenuNode], registry: &dyn ComponentRegistry) -> Vec<Route> {
    menus
        .iter()
        .filter(|menu| menu.kind != MenuType::Button)
        .map(|menu| transform_menu(menu, registry))
        .collect()
}

fn transform_menu(menu: &MenuNode, registry: &dyn ComponentRegistry) -> Route {
    let valid_children: Vec<MenuNode> = menu
        .children
        .iter()
        .filter(|child| child.kind != MenuType::Button)
        .cloned()
        .collect();
    let has_children = !valid_children.is_empty();

    let mut route = Route {
        path: menu.route_path.clone().unwrap_or_default(),
        name: Some(menu.name.clone()),
        meta: RouteMeta {
            title: Some(menu.name.clone()),
            hidden: menu.is_hidden,
            keep_alive: menu.keep_alive,
            affix: menu.affix,
            svg_icon: menu.svg_icon.clone(),
            ..RouteMeta::default()
        },
        ..Route::default()
    };
    let mut index = None;

    match menu.kind {
        MenuType::Page if has_children => {
            route.component = Some(RouteComponent::Layout);
            let view = menu
                .component
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .and_then(|c| registry.resolve(c));
            if let Some(view) = view {
                index = Some(Route {
                    path: "index".into(),
                    name: Some(format!("{}Index", menu.name)),
                    component: Some(RouteComponent::View(view)),
                    meta: RouteMeta {
                        title: Some(format!("{} overview", menu.name)),
                        keep_alive: menu.keep_alive,
                        svg_icon: menu.svg_icon.clone(),
                        ..RouteMeta::default()
                    },
                    ..Route::default()
                });
            }
        }
        MenuType::Page => {
            let component = menu.component.as_deref().unwrap_or_default();
            route.component = Some(match registry.resolve(component) {
                Some(view) => RouteComponent::View(view),
                None => {
                    warn!(menu = %menu.name, component, "menu component not found, using not-found page");
                    RouteComponent::NotFound
                }
            });
        }
        MenuType::ExternalLink => {
            route.external_url.clone_from(&menu.external_url);
        }
        MenuType::Button => {}
    }

    if has_children {
        route.children = index
            .into_iter()
            .chain(transform_menus(&valid_children, registry))
            .collect();

        if route.children.len() == 1 && route.redirect.is_none() {
            route.redirect = Some(join_path(&route.path, &route.children[0].path));
        }
        route.meta.always_show = !route.children.is_empty();
    }

    route
}

// ── Role filtering ───────────────────────────────────────────────────

fn has_permission(roles: &[String], route: &Route) -> bool {
    route
        .meta
        .roles
        .as_ref()
        .is_none_or(|allowed| roles.iter().any(|role| allowed.contains(role)))
}

/// Keep the routes (recursively) that `roles` may see.
pub fn filter_routes(routes: &[Route], roles: &[String]) -> Vec<Route> {
    routes
        .iter()
        .filter(|route| has_permission(roles, route))
        .map(|route| Route {
            children: filter_routes(&route.children, roles),
            ..route.clone()
        })
        .collect()
}

// ── Built-in route sets ──────────────────────────────────────────────

/// Routes every visitor gets, signed in or not.
pub fn constant_routes() -> Vec<Route> {
    use RouteComponent::{Layout, View};
    let view = |v: &str| View(v.to_owned());

    vec![
        Route::new("/redirect", None, Layout).hidden().children(vec![Route::new(
            ":path(.*)",
            None,
            view("redirect/index.vue"),
        )]),
        Route::new("/403", None, view("error/403.vue")).hidden(),
        Route::new("/404", None, view("error/404.vue")).hidden(),
        Route::new("/login", None, view("login/index.vue")).hidden(),
        Route::new("/data-center", Some("DataCenter"), Layout)
            .title("Data Center")
            .icon("data-center")
            .always_show()
            .children(vec![
                Route::new("wave-buoy", Some("WaveBuoy"), view("data-center/wave-buoy/index.vue"))
                    .title("Wave Buoy"),
                Route::new(
                    "weather-buoy",
                    Some("WeatherBuoy"),
                    view("data-center/weather-buoy/index.vue"),
                )
                .title("Weather Buoy"),
            ]),
        Route::new("/raw-data", Some("RawData"), Layout)
            .title("Raw Data")
            .icon("data-base")
            .children(vec![
                Route::new("bei-dou", Some("BeiDou"), view("raw-data/bei-dou/index.vue"))
                    .title("Beidou Data"),
                Route::new("iridium", Some("Iridium"), view("raw-data/iridium/index.vue"))
                    .title("Iridium Data"),
            ]),
        Route::new("/device-center", Some("DeviceCenter"), Layout)
            .redirect("/device-center/device-models")
            .title("Device Center")
            .icon("device-center")
            .always_show()
            .children(vec![
                Route::new(
                    "device-models",
                    Some("DeviceModels"),
                    view("device-center/device-models/index.vue"),
                )
                .title("Device Models"),
                Route::new("devices", Some("Devices"), view("device-center/devices/index.vue"))
                    .title("Devices"),
                Route::new(
                    "firmwares",
                    Some("Firmwares"),
                    view("device-center/firmwares/index.vue"),
                )
                .title("Firmware"),
            ]),
    ]
}

/// Role-gated routes.
pub fn dynamic_routes() -> Vec<Route> {
    use RouteComponent::{Layout, View};
    let view = |v: &str| View(v.to_owned());

    vec![
        Route::new("/system", Some("System"), Layout)
            .redirect("/system/users")
            .title("System")
            .icon("lock")
            .always_show()
            .roles(&[ADMIN_ROLE])
            .children(vec![
                Route::new("users", Some("SystemUsers"), view("system/users/index.vue"))
                    .title("Users"),
                Route::new("roles", Some("SystemRoles"), view("system/roles/index.vue"))
                    .title("Roles"),
                Route::new("menus", Some("SystemMenus"), view("system/menus/index.vue"))
                    .title("Menus"),
                Route::new(
                    "permissions",
                    Some("SystemPermissions"),
                    view("system/permissions/index.vue"),
                )
                .title("Permissions"),
            ]),
    ]
}

/// Server menus followed by the dynamic routes `roles` may see.
pub fn accessible_routes(
    menus: &[MenuNode],
    roles: &[String],
    registry: &dyn ComponentRegistry,
) -> Vec<Route> {
    let mut routes = transform_menus(menus, registry);
    routes.extend(filter_routes(&dynamic_routes(), roles));
    debug!(count = routes.len(), "accessible routes built");
    routes
}

/// Constant routes followed by [`accessible_routes`].
pub fn full_routes(
    menus: &[MenuNode],
    roles: &[String],
    registry: &dyn ComponentRegistry,
) -> Vec<Route> {
    let mut routes = constant_routes();
    routes.extend(accessible_routes(menus, roles, registry));
    routes
}

/// Depth-first (pre-order) list of `(depth, full path, route)`.
pub fn flatten(routes: &[Route]) -> Vec<(usize, String, &Route)> {
    fn walk<'a>(
        routes: &'a [Route],
        parent: &str,
        depth: usize,
        out: &mut Vec<(usize, String, &'a Route)>,
    ) {
        for route in routes {
            let full = if parent.is_empty() {
                route.path.clone()
            } else {
                join_path(parent, &route.path)
            };
            out.push((depth, full.clone(), route));
            walk(&route.children, &full, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(routes, "", 0, &mut out);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn menus(value: serde_json::Value) -> Vec<MenuNode> {
        serde_json::from_value(value).unwrap()
    }

    fn registry() -> StaticRegistry {
        StaticRegistry::builtin()
    }

    fn all_names(routes: &[Route]) -> Vec<String> {
        flatten(routes)
            .into_iter()
            .filter_map(|(_, _, r)| r.name.clone())
            .collect()
    }

    fn sample_tree() -> Vec<MenuNode> {
        menus(json!([
            {
                "id": "1", "name": "Devices", "type": 0, "routePath": "/devices",
                "component": "device-center/devices/index.vue",
                "children": [
                    { "id": "2", "name": "DeleteDevice", "type": 2 },
                    {
                        "id": "3", "name": "Firmware", "type": 0, "routePath": "firmware",
                        "component": "device-center/firmwares/index.vue",
                        "children": [ { "id": "4", "name": "UploadFirmware", "type": 2 } ]
                    }
                ]
            },
            { "id": "5", "name": "Export", "type": 2 },
            {
                "id": "6", "name": "Reports", "type": 0, "routePath": "/reports",
                "children": [
                    { "id": "7", "name": "Weekly", "type": 0, "routePath": "weekly", "component": "reports/weekly.vue" }
                ]
            },
            { "id": "8", "name": "Docs", "type": 1, "routePath": "/docs", "externalUrl": "https://docs.example.test" }
        ]))
    }

    // ── Transformation ──────────────────────────────────────────────

    #[test]
    fn buttons_never_become_routes() {
        let routes = transform_menus(&sample_tree(), &registry());
        let names = all_names(&routes);
        for button in ["DeleteDevice", "UploadFirmware", "Export"] {
            assert!(!names.contains(&button.to_owned()), "{button} leaked");
        }
    }

    #[test]
    fn page_with_only_buttons_is_a_leaf() {
        let routes = transform_menus(&sample_tree(), &registry());
        let firmware = routes[0]
            .children
            .iter()
            .find(|r| r.name.as_deref() == Some("Firmware"))
            .unwrap();
        assert!(firmware.children.is_empty());
        assert_eq!(
            firmware.component,
            Some(RouteComponent::View("device-center/firmwares/index.vue".into()))
        );
    }

    #[test]
    fn layout_with_component_gets_index_child() {
        let routes = transform_menus(&sample_tree(), &registry());
        let devices = &routes[0];
        assert_eq!(devices.component, Some(RouteComponent::Layout));

        let index = &devices.children[0];
        assert_eq!(index.path, "index");
        assert_eq!(index.name.as_deref(), Some("DevicesIndex"));
        assert_eq!(index.meta.title.as_deref(), Some("Devices overview"));
        assert_eq!(devices.children.len(), 2);
        assert!(devices.redirect.is_none());
        assert!(devices.meta.always_show);
    }

    #[test]
    fn single_child_parent_redirects() {
        let routes = transform_menus(&sample_tree(), &registry());
        let reports = &routes[1];
        assert_eq!(reports.children.len(), 1);
        assert_eq!(reports.redirect.as_deref(), Some("/reports/weekly"));
    }

    #[test]
    fn redirect_respects_trailing_slash() {
        let tree = menus(json!([{
            "id": "1", "name": "Root", "type": 0, "routePath": "/root/",
            "children": [ { "id": "2", "name": "Leaf", "type": 0, "routePath": "leaf", "component": "error/404.vue" } ]
        }]));
        let routes = transform_menus(&tree, &registry());
        assert_eq!(routes[0].redirect.as_deref(), Some("/root/leaf"));
    }

    #[test]
    fn unresolved_leaf_falls_back_to_not_found() {
        let routes = transform_menus(&sample_tree(), &registry());
        assert_eq!(routes[1].children[0].component, Some(RouteComponent::NotFound));
    }

    #[test]
    fn external_link_keeps_url() {
        let routes = transform_menus(&sample_tree(), &registry());
        let docs = routes.iter().find(|r| r.name.as_deref() == Some("Docs")).unwrap();
        assert_eq!(docs.external_url.as_deref(), Some("https://docs.example.test"));
        assert!(docs.component.is_none());
    }

    #[test]
    fn registry_accepts_aliased_paths() {
        let registry = registry();
        assert!(registry.resolve("@/pages/login/index.vue").is_some());
        assert!(registry.resolve("/login/index.vue").is_some());
        assert!(registry.resolve("nope.vue").is_none());
    }

    // ── Role filtering ──────────────────────────────────────────────

    #[test]
    fn admin_section_requires_admin_role() {
        let user = filter_routes(&dynamic_routes(), &["DEFAULT_ROLE".to_owned()]);
        assert!(user.is_empty());

        let admin = filter_routes(&dynamic_routes(), &[ADMIN_ROLE.to_owned()]);
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].children.len(), 4);
    }

    #[test]
    fn filtering_is_recursive_and_idempotent() {
        let routes = vec![
            Route::new("/a", Some("A"), RouteComponent::Layout).children(vec![
                Route::new("open", Some("Open"), RouteComponent::NotFound),
                Route::new("ops", Some("Ops"), RouteComponent::NotFound).roles(&["ops"]),
            ]),
            Route::new("/b", Some("B"), RouteComponent::NotFound).roles(&["admin"]),
        ];
        let roles = vec!["viewer".to_owned()];

        let once = filter_routes(&routes, &roles);
        assert_eq!(all_names(&once), vec!["A", "Open"]);
        assert_eq!(filter_routes(&once, &roles), once);
    }

    #[test]
    fn full_routes_put_constant_routes_first() {
        let roles = vec![ADMIN_ROLE.to_owned()];
        let full = full_routes(&sample_tree(), &roles, &registry());
        let constant = constant_routes();

        assert_eq!(&full[..constant.len()], constant.as_slice());
        assert_eq!(full.last().unwrap().name.as_deref(), Some("System"));
    }

    #[test]
    fn flatten_joins_paths_depth_first() {
        let routes = constant_routes();
        let flat = flatten(&routes);
        let paths: Vec<_> = flat.iter().map(|(_, p, _)| p.as_str()).collect();
        let i = paths.iter().position(|p| *p == "/device-center").unwrap();
        assert_eq!(paths[i + 1], "/device-center/device-models");
        assert_eq!(flat[i + 1].0, 1);
    }
}
