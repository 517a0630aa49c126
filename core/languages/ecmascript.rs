//! JavaScript and TypeScript share one scanner; they differ in the
//! extensions they own and the order in which they probe for files.

use crate::languages::{capture_all, dedup};
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, is_relative_reference,
    try_extensions,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

const JS_EXTENSIONS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs"];
const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts", ".d.ts"];

const JS_PROBE: &[&str] = &[".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".json"];
const TS_PROBE: &[&str] = &[
    ".ts", ".tsx", ".d.ts", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs", ".json",
];

static STATIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s+(?:type\s+)?(?:[\w*{}$\s,]+?\s+from\s+)?["']([^"'\n]+)["']"#)
        .expect("static import regex")
});
static REEXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\bexport\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s*["']([^"'\n]+)["']"#,
    )
    .expect("re-export regex")
});
static REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#).expect("require regex")
});
static DYNAMIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#).expect("dynamic import regex")
});

pub fn scan_module_references(content: &str) -> Vec<Specifier> {
    let found = [&*STATIC_IMPORT, &*REEXPORT, &*REQUIRE, &*DYNAMIC_IMPORT]
        .iter()
        .flat_map(|regex| capture_all(regex, content))
        .map(Specifier::plain)
        .collect();
    dedup(found)
}

fn resolve_module(specifier: &str, ctx: &ResolutionContext<'_>, probe: &[&str]) -> Option<PathBuf> {
    if is_relative_reference(specifier) {
        return resolve_path(&ctx.current_dir().join(specifier), probe);
    }
    if specifier.starts_with('/') {
        return resolve_path(&ctx.project_root.join(specifier.trim_start_matches('/')), probe);
    }

    if let Some(aliases) = ctx.alias_config {
        let base = ctx
            .config_base_path
            .unwrap_or_else(|| aliases.target_base());
        for target in aliases.expand(specifier) {
            if let Some(found) = resolve_path(&base.join(target), probe) {
                return Some(found);
            }
        }
        // Bare specifiers under an explicit `baseUrl` resolve like paths
        // when the file exists.
        let base_url = aliases.base_url.as_deref()?;
        return resolve_path(&base_url.join(specifier), probe);
    }

    // Common `@/` convention when no alias configuration exists.
    let rest = specifier.strip_prefix("@/")?;
    resolve_path(&ctx.project_root.join("src").join(rest), probe)
}

/// Extension probing plus ESM-style `.js` specifiers that point at `.ts` sources.
fn resolve_path(base: &Path, probe: &[&str]) -> Option<PathBuf> {
    if let Some(found) = try_extensions(base, probe) {
        return Some(found);
    }
    let raw = base.to_str()?;
    let stem = [".js", ".jsx", ".mjs", ".cjs"]
        .iter()
        .find_map(|ext| raw.strip_suffix(ext))?;
    try_extensions(Path::new(stem), probe)
}

pub struct JavaScript;

impl LanguagePlugin for JavaScript {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        JS_EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        scan_module_references(content)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for JavaScript {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if specifier.kind().is_some() || !ctx.current_file_matches(JS_EXTENSIONS) {
            return None;
        }
        resolve_module(specifier.value(), ctx, JS_PROBE)
    }
}

pub struct TypeScript;

impl LanguagePlugin for TypeScript {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        TS_EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        scan_module_references(content)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for TypeScript {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if specifier.kind().is_some() || !ctx.current_file_matches(TS_EXTENSIONS) {
            return None;
        }
        resolve_module(specifier.value(), ctx, TS_PROBE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::parse_alias_config;
    use std::fs;

    fn values(specifiers: &[Specifier]) -> Vec<&str> {
        specifiers.iter().map(Specifier::value).collect()
    }

    #[test]
    fn scans_every_import_form() {
        let source = r#"
import React from 'react';
import { a,
  b } from "./multi";
import type { T } from './types';
import './side-effect.css';
export * from "./all";
export { x as y } from './named';
const fs = require('fs');
const lazy = () => import('./lazy');
"#;
        let found = scan_module_references(source);
        assert_eq!(
            values(&found),
            vec![
                "react",
                "./multi",
                "./types",
                "./side-effect.css",
                "./all",
                "./named",
                "fs",
                "./lazy",
            ]
        );
    }

    #[test]
    fn resolves_aliases_then_index_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/components/button")).unwrap();
        fs::write(root.join("src/components/button/index.tsx"), "").unwrap();
        fs::write(root.join("src/main.ts"), "").unwrap();
        let config_path = root.join("tsconfig.json");
        let aliases = parse_alias_config(
            r#"{"compilerOptions":{"baseUrl":".","paths":{"@ui/*":["src/components/*"]}}}"#,
            &config_path,
        )
        .unwrap();

        let current = root.join("src/main.ts");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: Some(&aliases),
            config_base_path: Some(root),
            current_file: &current,
        };
        let found = TypeScript
            .resolve(&Specifier::plain("@ui/button"), &ctx)
            .unwrap();
        assert!(found.ends_with("src/components/button/index.tsx"));
        assert!(TypeScript.resolve(&Specifier::plain("react"), &ctx).is_none());
        // Owned by another language: the JavaScript resolver stays quiet.
        assert!(JavaScript.resolve(&Specifier::plain("@ui/button"), &ctx).is_none());
    }

    #[test]
    fn alias_targets_join_onto_context_base() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("web/lib")).unwrap();
        fs::write(root.join("web/lib/format.ts"), "").unwrap();
        let aliases = parse_alias_config(
            r#"{"compilerOptions":{"paths":{"~/*":["lib/*"]}}}"#,
            &root.join("elsewhere/tsconfig.json"),
        )
        .unwrap();

        let current = root.join("web/main.ts");
        let base = root.join("web");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: Some(&aliases),
            config_base_path: Some(&base),
            current_file: &current,
        };
        let found = TypeScript
            .resolve(&Specifier::plain("~/format"), &ctx)
            .unwrap();
        assert!(found.ends_with("web/lib/format.ts"));
        // No explicit baseUrl, so bare specifiers are not tried as paths.
        assert!(TypeScript.resolve(&Specifier::plain("lib/format"), &ctx).is_none());
    }

    #[test]
    fn esm_js_suffix_maps_to_ts_source() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("util.ts"), "").unwrap();
        let current = root.join("main.ts");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: None,
            config_base_path: None,
            current_file: &current,
        };
        let found = TypeScript
            .resolve(&Specifier::plain("./util.js"), &ctx)
            .unwrap();
        assert!(found.ends_with("util.ts"));
    }
}
