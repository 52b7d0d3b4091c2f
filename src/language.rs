//! Static extension to fence-language table.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

static BY_EXTENSION: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("rs", "rust"),
        ("py", "python"),
        ("pyi", "python"),
        ("ipynb", "json"),
        ("js", "javascript"),
        ("mjs", "javascript"),
        ("cjs", "javascript"),
        ("ts", "typescript"),
        ("mts", "typescript"),
        ("jsx", "jsx"),
        ("tsx", "tsx"),
        ("vue", "vue"),
        ("svelte", "svelte"),
        ("go", "go"),
        ("java", "java"),
        ("kt", "kotlin"),
        ("kts", "kotlin"),
        ("scala", "scala"),
        ("groovy", "groovy"),
        ("gradle", "groovy"),
        ("c", "c"),
        ("h", "c"),
        ("cpp", "cpp"),
        ("cc", "cpp"),
        ("cxx", "cpp"),
        ("hpp", "cpp"),
        ("hh", "cpp"),
        ("hxx", "cpp"),
        ("cs", "csharp"),
        ("fs", "fsharp"),
        ("swift", "swift"),
        ("m", "objectivec"),
        ("rb", "ruby"),
        ("php", "php"),
        ("pl", "perl"),
        ("lua", "lua"),
        ("r", "r"),
        ("jl", "julia"),
        ("dart", "dart"),
        ("ex", "elixir"),
        ("exs", "elixir"),
        ("erl", "erlang"),
        ("hs", "haskell"),
        ("ml", "ocaml"),
        ("clj", "clojure"),
        ("zig", "zig"),
        ("nim", "nim"),
        ("sh", "bash"),
        ("bash", "bash"),
        ("zsh", "zsh"),
        ("fish", "fish"),
        ("ps1", "powershell"),
        ("bat", "batch"),
        ("cmd", "batch"),
        ("html", "html"),
        ("htm", "html"),
        ("css", "css"),
        ("scss", "scss"),
        ("sass", "sass"),
        ("less", "less"),
        ("xml", "xml"),
        ("json", "json"),
        ("jsonc", "json"),
        ("yaml", "yaml"),
        ("yml", "yaml"),
        ("toml", "toml"),
        ("ini", "ini"),
        ("cfg", "ini"),
        ("md", "markdown"),
        ("markdown", "markdown"),
        ("rst", "rst"),
        ("tex", "latex"),
        ("sql", "sql"),
        ("graphql", "graphql"),
        ("gql", "graphql"),
        ("proto", "protobuf"),
        ("tf", "hcl"),
        ("hcl", "hcl"),
        ("nix", "nix"),
        ("dockerfile", "dockerfile"),
        ("mk", "makefile"),
        ("cmake", "cmake"),
        ("diff", "diff"),
        ("patch", "diff"),
        ("csv", "csv"),
        ("tera", "jinja"),
        ("j2", "jinja"),
        ("txt", "text"),
    ]
    .into_iter()
    .collect()
});

static BY_FILE_NAME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("Dockerfile", "dockerfile"),
        ("Containerfile", "dockerfile"),
        ("Makefile", "makefile"),
        ("GNUmakefile", "makefile"),
        ("CMakeLists.txt", "cmake"),
        ("Justfile", "makefile"),
        ("Rakefile", "ruby"),
        ("Gemfile", "ruby"),
        ("Vagrantfile", "ruby"),
        (".bashrc", "bash"),
        (".zshrc", "zsh"),
        (".gitignore", "gitignore"),
    ]
    .into_iter()
    .collect()
});

/// Fence language tag for `path`, or `""` when unknown.
///
/// Exact file names are checked before extensions, extensions are matched
/// case-insensitively.
#[must_use]
pub fn language_for(path: &Path) -> &'static str {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return "";
    };

    if let Some(language) = BY_FILE_NAME.get(name) {
        return *language;
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| BY_EXTENSION.get(ext.to_lowercase().as_str()))
        .copied()
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for() {
        let test_cases = vec![
            ("test.rs", "rust"),
            ("script.py", "python"),
            ("app.js", "javascript"),
            ("style.css", "css"),
            ("index.HTML", "html"),
            ("config.toml", "toml"),
            ("docker/Dockerfile", "dockerfile"),
            ("CMakeLists.txt", "cmake"),
            ("notes.txt", "text"),
            ("unknown.xyz", ""),
            ("LICENSE", ""),
        ];

        for (path, expected) in test_cases {
            assert_eq!(language_for(Path::new(path)), expected, "{path}");
        }
    }
}
