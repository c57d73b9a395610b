use std::collections::BTreeSet;

use serde::Serialize;

/// Default allow-list of transient system surfaces: notification shade,
/// quick search, OEM gesture and fingerprint layers.
pub const DEFAULT_TEMPORARY_PREFIXES: [&str; 5] = [
    "com.android.systemui",
    "com.vivo.upslide",
    "com.vivo.daemonService",
    "com.vivo.fingerprintui",
    "com.google.android.googlequicksearchbox",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    SelfIgnored,
    KeyboardIgnored,
    TemporaryWindow,
    NonMonitored,
    Monitored,
}

/// What the router needs to know about the device at the moment of the event.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub monitored: &'a BTreeSet<String>,
    /// Active input method as the platform reports it, e.g.
    /// `com.google.android.inputmethod.latin/com.android.inputmethod.latin.LatinIME`.
    pub active_input_method: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct AppRouter {
    host_package: String,
    temporary_prefixes: Vec<String>,
}

impl AppRouter {
    pub fn new(host_package: impl Into<String>, temporary_prefixes: Vec<String>) -> Self {
        Self {
            host_package: host_package.into(),
            temporary_prefixes,
        }
    }

    pub fn host_package(&self) -> &str {
        &self.host_package
    }

    /// Rules apply in order; the first match wins.
    pub fn route(&self, package: &str, ctx: RouteContext<'_>) -> Route {
        if package == self.host_package {
            return Route::SelfIgnored;
        }
        if is_keyboard(package, ctx.active_input_method) {
            return Route::KeyboardIgnored;
        }
        if self.is_temporary_window(package) {
            return Route::TemporaryWindow;
        }
        if !ctx.monitored.contains(package) {
            return Route::NonMonitored;
        }
        Route::Monitored
    }

    pub fn is_temporary_window(&self, package: &str) -> bool {
        self.temporary_prefixes
            .iter()
            .any(|prefix| package.starts_with(prefix.as_str()))
    }
}

fn is_keyboard(package: &str, active_input_method: Option<&str>) -> bool {
    let active_package = active_input_method
        .and_then(|id| id.split('/').next())
        .filter(|id| !id.is_empty());
    if active_package == Some(package) {
        return true;
    }

    // Token match rather than substring: "ime" alone would catch
    // "com.example.anime" or "timer".
    package
        .split(|c: char| !c.is_ascii_alphanumeric())
        .map(|token| token.to_ascii_lowercase())
        .any(|token| {
            token == "ime" || token.contains("keyboard") || token.contains("inputmethod")
        })
}
