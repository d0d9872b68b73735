//! Route table and navigation guard

use tracing::debug;

use crate::session::AppContext;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    /// `:param` segments match any single segment
    pub path: &'static str,
    pub title: &'static str,
    pub requires_auth: bool,
    /// Menu entry whose hospital gating applies to this route
    pub menu: Option<&'static str>,
}

const fn page(name: &'static str, path: &'static str, title: &'static str, menu: Option<&'static str>) -> Route {
    Route {
        name,
        path,
        title,
        requires_auth: true,
        menu,
    }
}

pub const ROUTES: &[Route] = &[
    Route {
        name: "Login",
        path: LOGIN_PATH,
        title: "登录",
        requires_auth: false,
        menu: None,
    },
    page("Dashboard", HOME_PATH, "首页", None),
    page("Users", "/users", "用户管理", Some("/users")),
    page("ChargeItems", "/charge-items", "收费项目管理", Some("/charge-items")),
    page("Departments", "/departments", "科室管理", Some("/departments")),
    page("DimensionItems", "/dimension-items", "维度目录管理", Some("/dimension-items")),
    page("ModelVersions", "/model-versions", "评估模型管理", Some("/model-versions")),
    page("ModelNodes", "/model-nodes/:versionId", "模型结构编辑", Some("/model-versions")),
    page("CostReports", "/cost-reports", "成本报表管理", Some("/cost-reports")),
    page("ReferenceValues", "/reference-values", "参考价值管理", Some("/reference-values")),
    page("DataTemplates", "/data-templates", "数据模板管理", Some("/data-templates")),
    page("ClassificationTasks", "/classification-tasks", "医技分类任务", Some("/classification-tasks")),
    page("MetricAssets", "/metric-assets", "指标资产管理", Some("/metric-assets")),
    page("SystemSettings", "/system-settings", "参数管理", Some("/system-settings")),
    page("DataSources", "/data-sources", "数据源管理", Some("/data-sources")),
];

impl Route {
    fn matches(&self, path: &str) -> bool {
        let pattern = self.path.trim_matches('/').split('/');
        let segments = path.trim_matches('/').split('/');
        pattern.clone().count() == segments.clone().count()
            && pattern
                .zip(segments)
                .all(|(p, s)| p.starts_with(':') || p == s)
    }
}

/// Route for a full path, ignoring any query string.
pub fn resolve(full_path: &str) -> Option<&'static Route> {
    let path = full_path.split('?').next().unwrap_or(full_path);
    ROUTES.iter().find(|r| r.matches(path))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    /// Go to `to` instead
    Redirect { to: String },
    /// Needs an active hospital first
    HospitalRequired,
    NotFound,
}

/// Decide whether navigating to `full_path` may proceed.
pub fn guard(ctx: &AppContext, full_path: &str) -> GuardDecision {
    let Some(route) = resolve(full_path) else {
        return GuardDecision::NotFound;
    };
    let logged_in = ctx.is_logged_in();

    let decision = if route.requires_auth && !logged_in {
        GuardDecision::Redirect {
            to: format!("{}?redirect={}", LOGIN_PATH, urlencoding::encode(full_path)),
        }
    } else if route.path == LOGIN_PATH && logged_in {
        GuardDecision::Redirect {
            to: HOME_PATH.to_string(),
        }
    } else if route.menu.is_some_and(|menu| !ctx.is_menu_enabled(menu)) {
        GuardDecision::HospitalRequired
    } else {
        GuardDecision::Proceed
    };

    debug!(path = full_path, route = route.name, ?decision, "Navigation guard");
    decision
}

/// Where to go after a successful login, from the login page's
/// `redirect` query parameter.
pub fn post_login_target(login_path: &str) -> String {
    login_path
        .split_once('?')
        .and_then(|(_, query)| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "redirect")
        })
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|target| target.into_owned())
        .filter(|target| target.starts_with('/') && !target.starts_with(LOGIN_PATH))
        .unwrap_or_else(|| HOME_PATH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStore, RecordingNotifier};
    use crate::types::Hospital;
    use std::sync::Arc;
    use std::time::Duration;

    fn context() -> AppContext {
        AppContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::new()),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_resolve_with_params() {
        assert_eq!(resolve("/model-nodes/12").unwrap().name, "ModelNodes");
        assert_eq!(resolve("/departments?page=2").unwrap().name, "Departments");
        assert!(resolve("/model-nodes").is_none());
        assert!(resolve("/nowhere").is_none());
    }

    #[test]
    fn test_guard_redirects_anonymous_to_login() {
        let ctx = context();
        assert_eq!(
            guard(&ctx, "/model-nodes/3"),
            GuardDecision::Redirect {
                to: "/login?redirect=%2Fmodel-nodes%2F3".to_string()
            }
        );
        assert_eq!(guard(&ctx, "/login"), GuardDecision::Proceed);
        assert_eq!(
            post_login_target("/login?redirect=%2Fmodel-nodes%2F3"),
            "/model-nodes/3"
        );
        assert_eq!(post_login_target("/login"), "/dashboard");
    }

    #[test]
    fn test_guard_hospital_gating() {
        let ctx = context();
        ctx.store_login("t").unwrap();

        assert_eq!(
            guard(&ctx, "/login"),
            GuardDecision::Redirect {
                to: "/dashboard".to_string()
            }
        );
        assert_eq!(guard(&ctx, "/users"), GuardDecision::Proceed);
        assert_eq!(guard(&ctx, "/cost-reports"), GuardDecision::HospitalRequired);

        ctx.set_current_hospital(Hospital {
            id: 1,
            code: "H001".to_string(),
            name: "人民医院".to_string(),
            is_active: true,
            created_at: None,
            updated_at: None,
        })
        .unwrap();
        assert_eq!(guard(&ctx, "/cost-reports"), GuardDecision::Proceed);
        assert_eq!(guard(&ctx, "/dashboard"), GuardDecision::Proceed);
    }
}
