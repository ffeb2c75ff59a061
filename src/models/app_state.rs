//! Shared state for the HTTP server.

use std::path::Path;

use crate::models::Node;
use crate::settings::Settings;
use crate::template::TemplateStore;

/// Request-independent state: the template store and, when the server was
/// started with a subscription source, the node list served by `/sub`.
/// Everything here is read-only once the server is up.
pub struct AppState {
    pub templates: TemplateStore,
    pub sub_nodes: Vec<Node>,
}

impl AppState {
    pub fn new() -> Self {
        let settings = Settings::current();
        AppState {
            templates: TemplateStore::with_custom_dir(Path::new(&settings.template_dir)),
            sub_nodes: Vec::new(),
        }
    }

    pub fn with_sub_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.sub_nodes = nodes;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}
