//! Role gate for UI areas and IPC methods.

use crate::model::Role;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Area {
    Landing,
    Login,
    Admin,
    Academic,
    Dormitory,
    /// Any signed-in role; not a navigable route.
    Account,
}

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const ACADEMIC: &[Role] = &[Role::Admin, Role::Academic];
const DORMITORY: &[Role] = &[Role::Admin, Role::Dormitory];
const ANY_ROLE: &[Role] = &[Role::Admin, Role::Academic, Role::Dormitory];

impl Area {
    /// `None` means the area is public.
    pub fn allowed_roles(self) -> Option<&'static [Role]> {
        match self {
            Area::Landing | Area::Login => None,
            Area::Admin => Some(ADMIN_ONLY),
            Area::Academic => Some(ACADEMIC),
            Area::Dormitory => Some(DORMITORY),
            Area::Account => Some(ANY_ROLE),
        }
    }
}

pub fn area_for_path(path: &str) -> Area {
    let p = path.trim().trim_start_matches('#');
    let p = p.split(['?', '#']).next().unwrap_or("");
    let first = p.trim_matches('/').split('/').next().unwrap_or("");
    match first {
        "login" => Area::Login,
        "admin" => Area::Admin,
        "academic" => Area::Academic,
        "dormitory" => Area::Dormitory,
        _ => Area::Landing,
    }
}

pub fn area_for_method(method: &str) -> Area {
    match method {
        "health" | "workspace.select" => Area::Landing,
        m if m.starts_with("auth.") || m.starts_with("access.") => Area::Landing,
        m if m.starts_with("changes.") => Area::Account,

        "students.create"
        | "students.bulkCreate"
        | "students.delete"
        | "courses.create"
        | "courses.delete"
        | "dormitories.create"
        | "dormitories.delete"
        | "dormitoryStudents.bulkCreate"
        | "dormitoryStudents.delete" => Area::Admin,
        m if m.starts_with("profiles.") => Area::Admin,

        "students.list"
        | "students.search"
        | "courses.list"
        | "attendance.submit"
        | "permissions.create"
        | "records.list"
        | "records.delete"
        | "reports.student"
        | "reports.class" => Area::Academic,

        "dormitories.list"
        | "dormitoryStudents.list"
        | "dormitoryPermissions.create"
        | "dormitoryPermissions.available"
        | "dormitoryPermissions.delete"
        | "reports.dormitory" => Area::Dormitory,

        // Unknown methods are reported as not_implemented by the router.
        _ => Area::Landing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
}

impl Decision {
    pub fn redirect_path(self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some("/login"),
            Decision::RedirectToHome => Some("/"),
        }
    }
}

/// What the gate knows about the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    /// Signed in; `None` when the identity has no profile row.
    SignedIn(Option<Role>),
}

pub fn decide(caller: Caller, allowed: &[Role]) -> Decision {
    match caller {
        Caller::Anonymous => Decision::RedirectToLogin,
        Caller::SignedIn(Some(role)) if allowed.contains(&role) => Decision::Allow,
        Caller::SignedIn(_) => Decision::RedirectToHome,
    }
}

pub fn check_area(caller: Caller, area: Area) -> Decision {
    match area.allowed_roles() {
        None => Decision::Allow,
        Some(allowed) => decide(caller, allowed),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingModules {
    pub academic: bool,
    pub dormitory: bool,
    pub admin: bool,
}

pub fn landing_modules(caller: Caller) -> LandingModules {
    let allowed = |area: Area| check_area(caller, area) == Decision::Allow;
    LandingModules {
        academic: allowed(Area::Academic),
        dormitory: allowed(Area::Dormitory),
        admin: allowed(Area::Admin),
    }
}
