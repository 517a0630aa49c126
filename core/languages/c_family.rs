use crate::languages::{capture_all, dedup};
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

const EXTENSIONS: &[&str] = &[".c", ".h", ".cc", ".cpp", ".cxx", ".hpp", ".hh", ".hxx"];
const KIND: &str = "include";

// Angle-bracket includes name system headers and are left alone.
static LOCAL_INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]*"([^"\n]+)""#).expect("include regex")
});

pub struct CFamily;

impl LanguagePlugin for CFamily {
    fn name(&self) -> &'static str {
        "c_family"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        dedup(
            capture_all(&LOCAL_INCLUDE, content)
                .into_iter()
                .map(|header| Specifier::classified(KIND, header))
                .collect(),
        )
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for CFamily {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        let header = specifier.value();
        [
            ctx.current_dir().to_path_buf(),
            ctx.project_root.to_path_buf(),
            ctx.project_root.join("include"),
            ctx.project_root.join("src"),
        ]
        .iter()
        .find_map(|dir| existing_file(&dir.join(header)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    #[test]
    fn only_quoted_includes_are_scanned() {
        let source = "#include <stdio.h>\n#include \"util/strings.h\"\n  #  include \"config.h\"\n";
        let found = CFamily.scan(source, &ScanContext { file: Path::new("main.c") });
        let values: Vec<&str> = found.iter().map(Specifier::value).collect();
        assert_eq!(values, vec!["util/strings.h", "config.h"]);
    }

    #[test]
    fn resolves_from_include_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("include/util")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("include/util/strings.h"), "").unwrap();
        let current = root.join("src/main.c");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: None,
            config_base_path: None,
            current_file: &current,
        };
        let found = CFamily
            .resolve(&Specifier::classified(KIND, "util/strings.h"), &ctx)
            .unwrap();
        assert!(found.ends_with("include/util/strings.h"));
    }
}
