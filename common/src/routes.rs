//! Route catalogue and navigation guard.

/// Name of the route the session-expiry recovery navigates to.
pub const LOGIN_ROUTE: &str = "login";

/// Path of the login route.
pub const LOGIN_PATH: &str = "/login";

/// Name of the landing route.
pub const INDEX_ROUTE: &str = "index";

/// Role label required by the administration pages.
pub const ADMIN_ROLE: &str = "admin";

const ADMIN_ONLY: &[&str] = &[ADMIN_ROLE];

/// Metadata flags attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMeta {
    /// Shown in the navigation menu.
    pub is_menu: bool,
    /// Navigable only while a credential is held.
    pub requires_auth: bool,
    /// Roles allowed to open the route. Empty means any role.
    pub roles: &'static [&'static str],
    pub description: &'static str,
}

/// Every named route of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppRoute {
    // ==================== Entry ====================
    /// `/`: landing route, redirects to the RAG chat
    Index,

    /// `/login`: the only route reachable without a credential
    Login,

    // ==================== Workspace ====================
    /// `/ragChat`: question answering over the knowledge bases
    RagChat,

    /// `/draw`: image generation
    Draw,

    /// `/know-hub`: the user's knowledge bases
    KnowHub,

    /// `/user-profile`: account settings
    UserProfile,

    // ==================== Administration ====================
    /// `/user`: user management
    User,

    /// `/logInfo`: audit log
    LogInfo,

    /// `/sensitive`: sensitive word list
    Sensitive,

    /// `/senCategory`: sensitive word categories
    SenCategory,

    /// `/frequency`: hot word analysis
    Frequency,
}

impl AppRoute {
    /// All routes in menu order.
    pub const ALL: [AppRoute; 11] = [
        AppRoute::Index,
        AppRoute::Login,
        AppRoute::RagChat,
        AppRoute::Draw,
        AppRoute::KnowHub,
        AppRoute::UserProfile,
        AppRoute::User,
        AppRoute::LogInfo,
        AppRoute::Sensitive,
        AppRoute::SenCategory,
        AppRoute::Frequency,
    ];

    /// Route name used for named navigation.
    pub fn name(&self) -> &'static str {
        match self {
            AppRoute::Index => INDEX_ROUTE,
            AppRoute::Login => LOGIN_ROUTE,
            AppRoute::RagChat => "ragChat",
            AppRoute::Draw => "draw",
            AppRoute::KnowHub => "knowHub",
            AppRoute::UserProfile => "userProfile",
            AppRoute::User => "user",
            AppRoute::LogInfo => "logInfo",
            AppRoute::Sensitive => "sensitive",
            AppRoute::SenCategory => "senCategory",
            AppRoute::Frequency => "frequency",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            AppRoute::Index => "/",
            AppRoute::Login => LOGIN_PATH,
            AppRoute::RagChat => "/ragChat",
            AppRoute::Draw => "/draw",
            AppRoute::KnowHub => "/know-hub",
            AppRoute::UserProfile => "/user-profile",
            AppRoute::User => "/user",
            AppRoute::LogInfo => "/logInfo",
            AppRoute::Sensitive => "/sensitive",
            AppRoute::SenCategory => "/senCategory",
            AppRoute::Frequency => "/frequency",
        }
    }

    pub fn meta(&self) -> RouteMeta {
        let (is_menu, requires_auth, roles, description): (bool, bool, &'static [&'static str], _) =
            match self {
                AppRoute::Index => (false, true, &[], ""),
                AppRoute::Login => (false, false, &[], "Sign in"),
                AppRoute::RagChat => (true, true, &[], "AI Q&A"),
                AppRoute::Draw => (true, true, &[], "AI drawing"),
                AppRoute::KnowHub => (true, true, &[], "My knowledge bases"),
                AppRoute::UserProfile => (true, true, &[], "Profile"),
                AppRoute::User => (true, true, ADMIN_ONLY, "User management"),
                AppRoute::LogInfo => (true, true, ADMIN_ONLY, "Log management"),
                AppRoute::Sensitive => (true, true, ADMIN_ONLY, "Sensitive words"),
                AppRoute::SenCategory => (true, true, ADMIN_ONLY, "Sensitive word categories"),
                AppRoute::Frequency => (true, true, ADMIN_ONLY, "Hot word analysis"),
            };

        RouteMeta {
            is_menu,
            requires_auth,
            roles,
            description,
        }
    }

    /// Where navigating to this route actually lands.
    pub fn redirect(&self) -> Option<AppRoute> {
        match self {
            AppRoute::Index => Some(AppRoute::RagChat),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<AppRoute> {
        Self::ALL.into_iter().find(|route| route.name() == name)
    }

    pub fn from_path(path: &str) -> Option<AppRoute> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    /// Whether a session holding `role` may open this route.
    pub fn allows_role(&self, role: Option<&str>) -> bool {
        let roles = self.meta().roles;
        if roles.is_empty() {
            return true;
        }
        role.map_or(false, |role| roles.contains(&role))
    }

    /// Menu entries visible to a session holding `role`.
    pub fn menu(role: Option<&str>) -> Vec<AppRoute> {
        Self::ALL
            .into_iter()
            .filter(|route| route.meta().is_menu && route.allows_role(role))
            .collect()
    }
}

impl std::fmt::Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of [`guard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigation is replaced silently.
    Redirect(AppRoute),
    /// Navigation is refused; `message` is shown to the user.
    Deny {
        redirect: AppRoute,
        message: &'static str,
    },
}

/// Decides whether navigation to `target` may proceed.
///
/// A route that does not require authentication is always navigable, except
/// that a session already holding a token is sent away from the login page.
/// When the stored role is unknown the role check is skipped, as the
/// backend still enforces it.
pub fn guard(target: AppRoute, has_token: bool, role: Option<&str>) -> GuardDecision {
    if target == AppRoute::Login && has_token {
        return GuardDecision::Redirect(AppRoute::Index);
    }

    let meta = target.meta();
    if !meta.requires_auth {
        return GuardDecision::Allow;
    }

    if !has_token {
        return GuardDecision::Deny {
            redirect: AppRoute::Login,
            message: "please log in first",
        };
    }

    if role.is_some() && !target.allows_role(role) {
        return GuardDecision::Deny {
            redirect: AppRoute::Index,
            message: "you do not have permission to access this page",
        };
    }

    GuardDecision::Allow
}
