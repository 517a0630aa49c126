use crate::languages::dedup;
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &[".rs"];

static MOD_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?mod[ \t]+(\w+)[ \t]*;")
        .expect("rust mod regex")
});
static USE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?use[ \t]+((?:crate|self|super)(?:::\w+)+)")
        .expect("rust use regex")
});

pub struct Rust;

impl LanguagePlugin for Rust {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let modules = MOD_DECL
            .captures_iter(content)
            .map(|c| Specifier::classified("module", &c[1]));
        let uses = USE_PATH
            .captures_iter(content)
            .map(|c| Specifier::classified("use", &c[1]));
        dedup(modules.chain(uses).collect())
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Rust {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        match specifier.kind()? {
            "module" => resolve_mod(specifier.value(), ctx.current_file),
            "use" => resolve_use(specifier.value(), ctx),
            _ => None,
        }
    }
}

/// Directory holding the children of the module defined by `file`.
/// `main.rs`, `lib.rs` and `mod.rs` own their directory; `foo.rs` owns `foo/`.
fn module_dir(file: &Path) -> Option<PathBuf> {
    let parent = file.parent()?;
    let stem = file.file_stem()?.to_str()?;
    if matches!(stem, "main" | "lib" | "mod") {
        Some(parent.to_path_buf())
    } else {
        Some(parent.join(stem))
    }
}

fn module_file(dir: &Path, name: &str) -> Option<PathBuf> {
    existing_file(&dir.join(format!("{}.rs", name)))
        .or_else(|| existing_file(&dir.join(name).join("mod.rs")))
}

fn resolve_mod(name: &str, current_file: &Path) -> Option<PathBuf> {
    let dir = module_dir(current_file)?;
    module_file(&dir, name).or_else(|| {
        let parent = current_file.parent()?;
        (parent != dir.as_path()).then(|| module_file(parent, name)).flatten()
    })
}

/// The `src/` directory of the nearest crate containing the current file.
fn crate_src(ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
    ctx.current_dir()
        .ancestors()
        .take_while(|dir| dir.starts_with(ctx.project_root))
        .find(|dir| dir.join("Cargo.toml").is_file())
        .map(|dir| dir.join("src"))
}

fn resolve_use(path: &str, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
    let mut segments = path.split("::").peekable();
    let mut base = match segments.next()? {
        "crate" => crate_src(ctx)?,
        "self" => module_dir(ctx.current_file)?,
        "super" => module_dir(ctx.current_file)?.parent()?.to_path_buf(),
        _ => return None,
    };
    while segments.peek() == Some(&"super") {
        segments.next();
        base = base.parent()?.to_path_buf();
    }
    let rest: Vec<&str> = segments.collect();
    // The tail may name items inside a module, so try the longest prefix first.
    (1..=rest.len()).rev().find_map(|n| {
        let (name, dirs) = rest[..n].split_last()?;
        let dir = dirs.iter().fold(base.clone(), |acc, seg| acc.join(seg));
        module_file(&dir, name)
    })
}
