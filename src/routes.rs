// routes.rs - Route table
//
// The table is drawn from scratch every time the router is (re)built. The
// gateway route goes in first; the application's routes follow and can
// never displace it.

use axum::{
    routing::{get, MethodRouter},
    Router,
};

use crate::handlers::{dev, protected, public};
use crate::state::AppState;

/// Ordered path → handler table; the first registration of a path wins
#[derive(Default)]
pub struct RouteTable {
    entries: Vec<(String, MethodRouter<AppState>)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter<AppState>) -> Self {
        if self.contains(path) {
            tracing::warn!("Route {} is already registered, keeping the first handler", path);
            return self;
        }
        self.entries.push((path.to_string(), method_router));
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|(p, _)| p == path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.as_str()).collect()
    }

    pub fn into_router(self) -> Router<AppState> {
        self.entries
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            })
    }
}

/// Build a fresh table: `GET /dev` first (when enabled), then `application`
pub fn draw<F>(gateway_enabled: bool, application: F) -> RouteTable
where
    F: FnOnce(RouteTable) -> RouteTable,
{
    let table = RouteTable::new();
    let table = if gateway_enabled {
        table.route(dev::DEV_PATH, get(dev::index))
    } else {
        table
    };
    application(table)
}

/// The service's own routes
pub fn application_routes(table: RouteTable) -> RouteTable {
    table
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .route("/api/auth/whoami", get(protected::auth::whoami))
}
