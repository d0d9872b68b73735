//! System menu configuration
//!
//! One static tree drives both the navigation menu and the role permission
//! editor.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::session::AppContext;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub path: &'static str,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    /// Planned feature, shown greyed out
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub admin_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub maintainer_only: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    fn leaf(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            ..Default::default()
        }
    }

    fn top(path: &'static str, name: &'static str, icon: &'static str) -> Self {
        Self {
            icon: Some(icon),
            ..Self::leaf(path, name)
        }
    }

    fn group(path: &'static str, name: &'static str, icon: &'static str, children: Vec<MenuItem>) -> Self {
        Self {
            children,
            ..Self::top(path, name, icon)
        }
    }

    fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    fn maintainer_only(mut self) -> Self {
        self.maintainer_only = true;
        self
    }

    fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    fn is_restricted(&self) -> bool {
        self.admin_only || self.maintainer_only
    }
}

pub static SYSTEM_MENUS: Lazy<Vec<MenuItem>> = Lazy::new(|| {
    vec![
        MenuItem::top("/dashboard", "首页", "HomeFilled"),
        MenuItem::top("/data-template-publish", "数据模板发布", "Grid"),
        MenuItem::group(
            "/data-quality",
            "数据质量报告",
            "DocumentChecked",
            vec![MenuItem::leaf("/data-issues", "数据问题记录")],
        ),
        MenuItem::group(
            "/intelligent-classification",
            "智能分类分级",
            "Operation",
            vec![
                MenuItem::leaf("/classification-tasks", "医技分类任务"),
                MenuItem::leaf("/classification-plans", "分类预案管理"),
            ],
        ),
        MenuItem::group(
            "/model",
            "评估模型管理",
            "Document",
            vec![
                MenuItem::leaf("/model-versions", "模型版本管理"),
                MenuItem::leaf("/dimension-items", "维度目录管理"),
                MenuItem::leaf("/cost-benchmarks", "成本基准管理"),
                MenuItem::leaf("/discipline-rules", "学科规则管理"),
                MenuItem::leaf("/calculation-workflows", "计算流程管理"),
            ],
        ),
        MenuItem::group(
            "/orientation",
            "业务导向管理",
            "Guide",
            vec![
                MenuItem::leaf("/orientation-rules", "导向规则管理"),
                MenuItem::leaf("/orientation-benchmarks", "导向基准管理"),
                MenuItem::leaf("/orientation-ladders", "导向阶梯管理"),
            ],
        ),
        MenuItem::top("/calculation-tasks", "计算任务管理", "Clock"),
        MenuItem::top("/results", "业务价值报表", "DataAnalysis"),
        MenuItem::top("/adv-modeling", "ADV自动建模", "MagicStick").disabled(),
        MenuItem::group(
            "/intelligent-query",
            "智能问数系统",
            "ChatDotRound",
            vec![
                MenuItem::leaf("/smart-data-qa", "智能数据问答"),
                MenuItem::leaf("/metric-assets", "指标资产管理"),
            ],
        ),
        MenuItem::group(
            "/operation-analysis",
            "运营分析报告",
            "TrendCharts",
            vec![
                MenuItem::leaf("/report-view", "分析报告查看"),
                MenuItem::leaf("/report-management", "分析报告管理").admin_only(),
            ],
        ),
        MenuItem::group(
            "/base-data",
            "基础数据管理",
            "FolderOpened",
            vec![
                MenuItem::leaf("/departments", "科室对照管理"),
                MenuItem::leaf("/charge-items", "收费项目管理"),
                MenuItem::leaf("/cost-reports", "成本报表管理"),
                MenuItem::leaf("/reference-values", "参考价值管理"),
                MenuItem::leaf("/data-templates", "数据模板管理").admin_only(),
            ],
        ),
        MenuItem::top("/data-sources", "数据源管理", "Connection"),
        MenuItem::group(
            "/system",
            "系统设置",
            "Setting",
            vec![
                MenuItem::leaf("/system-settings", "参数管理"),
                MenuItem::leaf("/users", "用户管理").admin_only(),
                MenuItem::leaf("/roles", "用户角色管理").admin_only(),
                MenuItem::leaf("/ai-config", "AI接口管理").maintainer_only(),
                MenuItem::leaf("/hospitals", "医疗机构管理").admin_only(),
            ],
        ),
    ]
});

/// Menu tree offered when configuring a role: restricted entries removed,
/// `disabled` cleared.
pub fn permission_menu_tree() -> Vec<MenuItem> {
    fn filter(menus: &[MenuItem]) -> Vec<MenuItem> {
        menus
            .iter()
            .filter(|m| !m.is_restricted())
            .map(|m| MenuItem {
                disabled: false,
                children: filter(&m.children),
                ..m.clone()
            })
            .collect()
    }
    filter(&SYSTEM_MENUS)
}

/// Every assignable path, parents before children.
pub fn all_menu_paths() -> Vec<&'static str> {
    fn collect(menus: &[MenuItem], paths: &mut Vec<&'static str>) {
        for menu in menus.iter().filter(|m| !m.is_restricted()) {
            paths.push(menu.path);
            collect(&menu.children, paths);
        }
    }
    let mut paths = Vec::new();
    collect(&SYSTEM_MENUS, &mut paths);
    paths
}

/// Menu entry as shown to the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleMenu {
    pub path: &'static str,
    pub name: &'static str,
    /// Planned feature or blocked until a hospital is activated
    pub disabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VisibleMenu>,
}

/// Navigation menu for the logged-in user.
///
/// Admin-only entries need an admin or maintainer, maintainer-only entries a
/// maintainer. Everyone else sees the paths their role grants; a group is
/// shown when it or any child is granted.
pub fn visible_menus(ctx: &AppContext) -> Vec<VisibleMenu> {
    fn visit(ctx: &AppContext, menus: &[MenuItem]) -> Vec<VisibleMenu> {
        menus
            .iter()
            .filter(|m| (!m.admin_only || ctx.is_admin()) && (!m.maintainer_only || ctx.is_maintainer()))
            .filter_map(|m| {
                let children = visit(ctx, &m.children);
                if !ctx.has_menu_permission(m.path) && children.is_empty() {
                    return None;
                }
                Some(VisibleMenu {
                    path: m.path,
                    name: m.name,
                    disabled: m.disabled || (m.children.is_empty() && !ctx.is_menu_enabled(m.path)),
                    children,
                })
            })
            .collect()
    }
    visit(ctx, &SYSTEM_MENUS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStore, RecordingNotifier};
    use crate::types::{RoleType, UserInfo};
    use std::sync::Arc;
    use std::time::Duration;

    fn context(role: RoleType, perms: &[&str]) -> AppContext {
        let ctx = AppContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::new()),
            Duration::ZERO,
        );
        let user: UserInfo = serde_json::from_value(serde_json::json!({
            "id": 1,
            "username": "u",
            "role_type": role,
            "menu_permissions": perms,
        }))
        .unwrap();
        ctx.store_user(user).unwrap();
        ctx
    }

    #[test]
    fn test_permission_tree_drops_restricted_entries() {
        let tree = permission_menu_tree();
        let system = tree.iter().find(|m| m.path == "/system").unwrap();
        let paths: Vec<&str> = system.children.iter().map(|m| m.path).collect();
        assert_eq!(paths, vec!["/system-settings"]);

        let adv = tree.iter().find(|m| m.path == "/adv-modeling").unwrap();
        assert!(!adv.disabled);
    }

    #[test]
    fn test_all_menu_paths() {
        let paths = all_menu_paths();
        assert_eq!(paths[0], "/dashboard");
        assert!(paths.contains(&"/cost-reports"));
        assert!(paths.contains(&"/adv-modeling"));
        assert!(!paths.contains(&"/users"));
        assert!(!paths.contains(&"/ai-config"));

        let base = paths.iter().position(|p| *p == "/base-data").unwrap();
        let departments = paths.iter().position(|p| *p == "/departments").unwrap();
        assert!(base < departments);
    }

    #[test]
    fn test_visible_menus_follow_role() {
        let ctx = context(RoleType::HospitalUser, &["/departments", "/dashboard"]);
        let menus = visible_menus(&ctx);
        let paths: Vec<&str> = menus.iter().map(|m| m.path).collect();
        assert_eq!(paths, vec!["/dashboard", "/base-data"]);
        assert_eq!(menus[1].children.len(), 1);
        // No hospital yet
        assert!(menus[1].children[0].disabled);

        let admin = context(RoleType::Admin, &[]);
        let menus = visible_menus(&admin);
        let system = menus.iter().find(|m| m.path == "/system").unwrap();
        assert!(system.children.iter().any(|m| m.path == "/hospitals"));
        assert!(!system.children.iter().any(|m| m.path == "/ai-config"));
    }
}
