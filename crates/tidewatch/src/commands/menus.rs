//! Menu administration and route inspection.

use tabled::Tabled;
use tidewatch_api::auth_center::models::{MenuForm, MenuNode, MenuType};
use tidewatch_core::routes::{self, Route, RouteComponent, StaticRegistry};

use crate::cli::{GlobalOpts, MenusArgs, MenusCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

const INDENT: &str = "  ";

// ── Menu tree ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MenuRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Order")]
    order: i32,
    #[tabled(rename = "Hidden")]
    hidden: bool,
}

fn kind_label(kind: MenuType) -> &'static str {
    match kind {
        MenuType::Page => "page",
        MenuType::ExternalLink => "link",
        MenuType::Button => "button",
    }
}

fn menu_rows(nodes: &[MenuNode]) -> Vec<MenuRow> {
    fn walk(nodes: &[MenuNode], depth: usize, out: &mut Vec<MenuRow>) {
        for node in nodes {
            out.push(MenuRow {
                id: node.id.clone(),
                name: format!("{}{}", INDENT.repeat(depth), node.name),
                kind: kind_label(node.kind),
                path: node
                    .route_path
                    .clone()
                    .or_else(|| node.external_url.clone())
                    .unwrap_or_default(),
                component: node.component.clone().unwrap_or_default(),
                order: node.order,
                hidden: node.is_hidden,
            });
            walk(&node.children, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, 0, &mut out);
    out
}

fn print_menus(nodes: &[MenuNode], global: &GlobalOpts) {
    let out = output::render_tree(&global.output, nodes, menu_rows, |r| r.id.clone());
    output::print_output(&out, global.quiet);
}

// ── Route tree ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Renders")]
    renders: String,
}

fn renders(route: &Route) -> String {
    if let Some(url) = &route.external_url {
        return url.clone();
    }
    if let Some(to) = &route.redirect {
        return format!("-> {to}");
    }
    match &route.component {
        Some(RouteComponent::Layout) => "layout".into(),
        Some(RouteComponent::View(view)) => view.clone(),
        Some(RouteComponent::NotFound) => "not found".into(),
        None => String::new(),
    }
}

fn route_rows(routes: &[Route]) -> Vec<RouteRow> {
    routes::flatten(routes)
        .into_iter()
        .map(|(depth, full_path, route)| RouteRow {
            path: format!("{}{full_path}", INDENT.repeat(depth)),
            name: route.name.clone().unwrap_or_default(),
            title: route.meta.title.clone().unwrap_or_default(),
            renders: renders(route),
        })
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: MenusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let auth = ctx.console.auth_center();

    match args.command {
        MenusCommand::Tree => {
            print_menus(&auth.menu_tree().await?.items, global);
            Ok(())
        }

        MenusCommand::Mine => {
            let profile = ctx.console.load_profile().await?;
            print_menus(&profile.menus, global);
            Ok(())
        }

        MenusCommand::Routes => {
            let routes = ctx.console.routes(&StaticRegistry::builtin()).await?;
            let out = output::render_tree(&global.output, &routes, route_rows, |r| {
                r.path.trim_start().to_owned()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MenusCommand::Create { from_file } => {
            let form: MenuForm = util::read_json_file(&from_file)?;
            auth.create_menu(&form).await?;
            output::success(
                &format!("Menu {} created", form.name),
                ctx.color,
                global.quiet,
            );
            Ok(())
        }

        MenusCommand::Update { id, from_file } => {
            let mut form: MenuForm = util::read_json_file(&from_file)?;
            form.id = Some(id.clone());
            auth.update_menu(&id, &form).await?;
            output::success(&format!("Menu {id} updated"), ctx.color, global.quiet);
            Ok(())
        }

        MenusCommand::Delete { id } => {
            if !util::confirm(&format!("Delete menu {id} and its children?"), global.yes)? {
                return Ok(());
            }
            auth.delete_menu(&id).await?;
            output::success(&format!("Menu {id} deleted"), ctx.color, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn menu_rows_indent_children() {
        let nodes: Vec<MenuNode> = serde_json::from_value(serde_json::json!([{
            "id": "1", "name": "Devices", "type": 0, "routePath": "devices",
            "children": [{ "id": "2", "name": "Remove", "type": 2 }]
        }]))
        .unwrap();
        let rows = menu_rows(&nodes);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "  Remove");
        assert_eq!(rows[1].kind, "button");
        assert_eq!(rows[0].path, "devices");
    }

    #[test]
    fn route_rows_show_full_paths() {
        let rows = route_rows(&routes::constant_routes());
        assert!(rows.iter().any(|r| r.path.trim_start() == "/login"));
    }
}
