/// Language used when a fence tag is missing or unsupported.
pub const FALLBACK_LANGUAGE: &str = "plain text";

/// Languages accepted by the code block `language` field.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "abap",
    "arduino",
    "bash",
    "basic",
    "c",
    "clojure",
    "coffeescript",
    "c++",
    "c#",
    "css",
    "dart",
    "diff",
    "docker",
    "elixir",
    "elm",
    "erlang",
    "flow",
    "fortran",
    "f#",
    "gherkin",
    "glsl",
    "go",
    "graphql",
    "groovy",
    "haskell",
    "html",
    "java",
    "javascript",
    "json",
    "julia",
    "kotlin",
    "latex",
    "less",
    "lisp",
    "livescript",
    "lua",
    "makefile",
    "markdown",
    "markup",
    "matlab",
    "mermaid",
    "nix",
    "objective-c",
    "ocaml",
    "pascal",
    "perl",
    "php",
    "plain text",
    "powershell",
    "prolog",
    "protobuf",
    "python",
    "r",
    "reason",
    "ruby",
    "rust",
    "sass",
    "scala",
    "scheme",
    "scss",
    "shell",
    "sql",
    "swift",
    "typescript",
    "vb.net",
    "verilog",
    "vhdl",
    "visual basic",
    "webassembly",
    "xml",
    "yaml",
    "java/c/c++/c#",
];

fn alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "sh" | "bash" | "zsh" => "shell",
        "cpp" => "c++",
        "csharp" => "c#",
        "yml" => "yaml",
        "htm" => "html",
        "md" | "markdown" => "markdown",
        "vb" => "visual basic",
        "stylus" => "css",
        "sass" => "scss",
        "golang" => "go",
        "plaintext" | "txt" => "plain text",
        _ => return None,
    };
    Some(canonical)
}

/// Normalize a fence language tag to a supported language name.
///
/// Never fails: anything unknown resolves to [`FALLBACK_LANGUAGE`].
pub fn resolve_language(tag: &str) -> &'static str {
    let name = tag.trim().to_lowercase();
    if name.is_empty() {
        return FALLBACK_LANGUAGE;
    }

    let name = alias(&name).unwrap_or(name.as_str());
    SUPPORTED_LANGUAGES
        .iter()
        .find(|supported| **supported == name)
        .copied()
        .unwrap_or(FALLBACK_LANGUAGE)
}
