use crate::languages::dedup;
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
    with_suffix,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &[".rb", ".rake", ".gemspec", "Gemfile", "Rakefile"];

static REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*(require|require_relative|load)[ \t(]+["']([^"']+)["']"#)
        .expect("ruby require regex")
});
static GEM_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*gem[ \t]+["']([^"']+)["'][^\n]*?\bpath:[ \t]*["']([^"']+)["']"#)
        .expect("ruby gem path regex")
});
static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#).expect("string regex"));
static CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w:])((?:::)?[A-Z][A-Za-z0-9_]*(?:::[A-Z][A-Za-z0-9_]*)*)")
        .expect("ruby constant regex")
});
static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:class|module)[ \t]+([A-Z][\w:]*)").expect("ruby definition regex")
});

const CORE_CONSTANTS: &[&str] = &[
    "Array", "BasicObject", "Comparable", "Dir", "ENV", "Enumerable", "Exception", "FalseClass",
    "File", "Float", "Hash", "IO", "Integer", "Kernel", "Math", "Module", "NilClass", "Object",
    "Proc", "Process", "Range", "Regexp", "StandardError", "String", "Struct", "Symbol",
    "Thread", "Time", "TrueClass", "ArgumentError", "RuntimeError", "NotImplementedError",
];

pub struct Ruby;

impl LanguagePlugin for Ruby {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let mut found = Vec::new();
        for captures in REQUIRE.captures_iter(content) {
            let target = &captures[2];
            match &captures[1] {
                "require_relative" if target.starts_with('.') => {
                    found.push(Specifier::plain(target))
                }
                "require_relative" => found.push(Specifier::plain(format!("./{}", target))),
                "load" => found.push(Specifier::classified("load", target)),
                _ => found.push(Specifier::classified("require", target)),
            }
        }
        for captures in GEM_PATH.captures_iter(content) {
            let gem = &captures[1];
            let path = captures[2].trim_end_matches('/');
            found.push(Specifier::classified(
                "gem",
                format!("{}/lib/{}", path, gem),
            ));
        }
        found.extend(scan_constants(content).into_iter().map(|c| Specifier::classified("constant", c)));
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

fn scan_constants(content: &str) -> Vec<String> {
    let defined: Vec<String> = DEFINITION
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect();
    let mut constants = Vec::new();
    for line in content.lines() {
        let code = line.split('#').next().unwrap_or("");
        let code = STRING_LITERAL.replace_all(code, "\"\"");
        for captures in CONSTANT.captures_iter(&code) {
            let name = captures[1].trim_start_matches("::").to_string();
            let head = name.split("::").next().unwrap_or_default();
            if CORE_CONSTANTS.contains(&head) || defined.contains(&name) {
                continue;
            }
            if !constants.contains(&name) {
                constants.push(name);
            }
        }
    }
    constants
}

/// `HTTPClient::FooBar` -> `http_client/foo_bar`
pub fn underscore(constant: &str) -> String {
    constant
        .split("::")
        .map(|segment| {
            let chars: Vec<char> = segment.chars().collect();
            let mut out = String::with_capacity(segment.len() + 4);
            for (i, &ch) in chars.iter().enumerate() {
                if ch.is_ascii_uppercase() && i > 0 {
                    let prev = chars[i - 1];
                    let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                    if prev.is_ascii_lowercase()
                        || prev.is_ascii_digit()
                        || (prev.is_ascii_uppercase() && next_is_lower)
                    {
                        out.push('_');
                    }
                }
                out.push(ch.to_ascii_lowercase());
            }
            out
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl Resolver for Ruby {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        match specifier.kind()? {
            "require" | "load" => {
                let target = specifier.value();
                [
                    ctx.project_root.join("lib"),
                    ctx.project_root.to_path_buf(),
                    ctx.current_dir().to_path_buf(),
                ]
                .iter()
                .find_map(|base| ruby_file(&base.join(target)))
            }
            "gem" => ruby_file(&ctx.current_dir().join(specifier.value())),
            "constant" => resolve_constant(specifier.value(), ctx.project_root),
            _ => None,
        }
    }
}

fn ruby_file(base: &Path) -> Option<PathBuf> {
    if base.extension().is_some_and(|e| e == "rb") {
        return existing_file(base);
    }
    existing_file(&with_suffix(base, ".rb"))
}

/// Autoload-style lookup under `lib/`, each `app/*/` directory, and the root.
fn resolve_constant(constant: &str, project_root: &Path) -> Option<PathBuf> {
    let relative = underscore(constant);
    let mut bases = vec![project_root.join("lib")];
    if let Ok(entries) = fs::read_dir(project_root.join("app")) {
        let mut app_dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        app_dirs.sort();
        bases.extend(app_dirs);
    }
    bases.push(project_root.to_path_buf());
    bases
        .iter()
        .find_map(|base| ruby_file(&base.join(&relative)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscores_like_autoloaders() {
        assert_eq!(underscore("User"), "user");
        assert_eq!(underscore("Admin::UsersController"), "admin/users_controller");
        assert_eq!(underscore("HTTPClient"), "http_client");
        assert_eq!(underscore("OAuth2Token"), "o_auth2_token");
    }

    #[test]
    fn scans_requires_gems_and_constants() {
        let source = r#"
require 'json'
require_relative 'helpers/format'
load "tasks/setup.rb"
gem 'widgets', path: 'vendor/widgets'
# Comment::Ignored
class Report < Base
  def run
    puts "Not::AConstant"
    Billing::Invoice.new(String.new)
  end
end
"#;
        let found = Ruby.scan(source, &ScanContext { file: Path::new("report.rb") });
        let rendered: Vec<String> = found.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "require:json",
                "./helpers/format",
                "load:tasks/setup.rb",
                "gem:vendor/widgets/lib/widgets",
                "constant:Base",
                "constant:Billing::Invoice",
            ]
        );
    }

    #[test]
    fn resolves_constants_and_requires() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("app/models/billing")).unwrap();
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join("app/models/billing/invoice.rb"), "").unwrap();
        std::fs::write(root.join("lib/tools.rb"), "").unwrap();
        let current = root.join("app/models/report.rb");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: None,
            config_base_path: None,
            current_file: &current,
        };
        let invoice = Ruby
            .resolve(&Specifier::classified("constant", "Billing::Invoice"), &ctx)
            .unwrap();
        assert!(invoice.ends_with("app/models/billing/invoice.rb"));
        let tools = Ruby
            .resolve(&Specifier::classified("require", "tools"), &ctx)
            .unwrap();
        assert!(tools.ends_with("lib/tools.rb"));
        assert!(
            Ruby.resolve(&Specifier::classified("require", "foo"), &ctx)
                .is_none()
        );
    }
}
