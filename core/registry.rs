use crate::languages;
use crate::plugin::{LanguagePlugin, extension_matches, is_pseudo_extension};
use log;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// All loaded language plugins, indexed by the extensions they declare.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn LanguagePlugin>>,
    scanners: HashMap<String, Arc<dyn LanguagePlugin>>,
    resolvers: Vec<Arc<dyn LanguagePlugin>>,
    all_extensions: Vec<String>,
    match_order: Vec<String>,
}

impl PluginRegistry {
    /// Registers `plugins` in order. On an extension collision the later
    /// plugin wins; every plugin with a resolver joins the fallback chain.
    pub fn load(plugins: Vec<Arc<dyn LanguagePlugin>>) -> Self {
        let mut scanners = HashMap::new();
        let mut resolvers = Vec::new();
        let mut all_extensions: Vec<String> = Vec::new();

        for plugin in &plugins {
            for ext in plugin.extensions() {
                if let Some(previous) = scanners.insert(ext.to_string(), Arc::clone(plugin)) {
                    log::debug!(
                        "Extension {} re-registered: {} replaces {}",
                        ext,
                        plugin.name(),
                        previous.name()
                    );
                } else {
                    all_extensions.push(ext.to_string());
                }
            }
            if plugin.resolver().is_some() {
                resolvers.push(Arc::clone(plugin));
            }
            log::trace!(
                "Registered plugin {} ({} extension(s))",
                plugin.name(),
                plugin.extensions().len()
            );
        }

        // Composite extensions must be tried before their trailing segment.
        let mut match_order: Vec<String> = all_extensions
            .iter()
            .filter(|e| !is_pseudo_extension(e))
            .cloned()
            .collect();
        match_order.sort_by_key(|e| std::cmp::Reverse(e.len()));
        match_order.extend(
            all_extensions
                .iter()
                .filter(|e| is_pseudo_extension(e))
                .cloned(),
        );

        log::debug!(
            "Plugin registry loaded: {} plugin(s), {} extension(s), {} resolver(s)",
            plugins.len(),
            all_extensions.len(),
            resolvers.len()
        );
        Self {
            plugins,
            scanners,
            resolvers,
            all_extensions,
            match_order,
        }
    }

    pub fn builtin() -> Self {
        Self::load(languages::builtin_plugins())
    }

    /// Built-in plugins minus any whose name appears in `disabled`.
    pub fn builtin_without(disabled: &[String]) -> Self {
        let plugins = languages::builtin_plugins()
            .into_iter()
            .filter(|plugin| {
                let keep = !disabled.iter().any(|d| d.eq_ignore_ascii_case(plugin.name()));
                if !keep {
                    log::debug!("Language plugin disabled by configuration: {}", plugin.name());
                }
                keep
            })
            .collect();
        Self::load(plugins)
    }

    pub fn plugins(&self) -> &[Arc<dyn LanguagePlugin>] {
        &self.plugins
    }

    pub fn resolvers(&self) -> &[Arc<dyn LanguagePlugin>] {
        &self.resolvers
    }

    /// Every registered extension, in registration order.
    pub fn all_extensions(&self) -> &[String] {
        &self.all_extensions
    }

    /// Real (dotted) extensions in registration order, used for probing.
    pub fn probe_extensions(&self) -> impl Iterator<Item = &str> {
        self.all_extensions
            .iter()
            .map(String::as_str)
            .filter(|e| !is_pseudo_extension(e))
    }

    /// The registered extension (or pseudo-extension) that `path` carries.
    pub fn matching_extension(&self, path: &Path) -> Option<&str> {
        let file_name = path.file_name()?.to_str()?;
        self.match_order
            .iter()
            .map(String::as_str)
            .find(|ext| extension_matches(file_name, ext))
    }

    pub fn plugin_for(&self, path: &Path) -> Option<&Arc<dyn LanguagePlugin>> {
        self.matching_extension(path)
            .and_then(|ext| self.scanners.get(ext))
    }

    pub fn is_recognized(&self, path: &Path) -> bool {
        self.matching_extension(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{ScanContext, Specifier};

    struct Fake(&'static str, &'static [&'static str]);

    impl LanguagePlugin for Fake {
        fn name(&self) -> &'static str {
            self.0
        }
        fn extensions(&self) -> &'static [&'static str] {
            self.1
        }
        fn scan(&self, _content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
            Vec::new()
        }
    }

    #[test]
    fn composite_extension_beats_trailing_segment() {
        let registry = PluginRegistry::load(vec![
            Arc::new(Fake("plain", &[".php"])),
            Arc::new(Fake("blade", &[".blade.php"])),
        ]);
        let blade = registry.plugin_for(Path::new("/x/view.blade.php")).unwrap();
        assert_eq!(blade.name(), "blade");
        let plain = registry.plugin_for(Path::new("/x/index.php")).unwrap();
        assert_eq!(plain.name(), "plain");
    }

    #[test]
    fn last_registration_wins_on_collision() {
        let registry = PluginRegistry::load(vec![
            Arc::new(Fake("first", &[".x"])),
            Arc::new(Fake("second", &[".x", ".y"])),
        ]);
        assert_eq!(registry.all_extensions(), &[".x".to_string(), ".y".to_string()]);
        assert_eq!(
            registry.plugin_for(Path::new("a.x")).unwrap().name(),
            "second"
        );
        assert!(registry.resolvers().is_empty());
    }

    #[test]
    fn builtin_registry_knows_pseudo_extensions() {
        let registry = PluginRegistry::builtin();
        assert_eq!(
            registry.plugin_for(Path::new("/p/Dockerfile")).unwrap().name(),
            "dockerfile"
        );
        assert_eq!(
            registry.plugin_for(Path::new("/p/types.d.ts")).unwrap().name(),
            "typescript"
        );
        assert!(registry.plugin_for(Path::new("/p/README.md")).is_none());
        assert!(!registry.probe_extensions().any(|e| e == "Dockerfile"));
        assert_eq!(registry.probe_extensions().next(), Some(".js"));
    }

    #[test]
    fn disabled_plugins_are_left_out() {
        let registry = PluginRegistry::builtin_without(&["Ruby".to_string()]);
        assert!(registry.plugin_for(Path::new("a.rb")).is_none());
        assert!(registry.plugin_for(Path::new("a.py")).is_some());
    }
}
