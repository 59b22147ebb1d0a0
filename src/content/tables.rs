/// Allow-list tables for text detection
///
/// Built once on first use and never mutated afterwards.
use lazy_static::lazy_static;
use std::collections::HashSet;

/// MIME types always rendered as UTF-8 text
const TEXT_MIME_TYPES: &[&str] = &[
    // text family
    "text/plain",
    "text/html",
    "text/css",
    "text/csv",
    "text/markdown",
    "text/x-markdown",
    "text/xml",
    "text/javascript",
    "text/typescript",
    "text/yaml",
    "text/x-yaml",
    "text/rtf",
    "text/tab-separated-values",
    "text/calendar",
    "text/vcard",
    "text/x-python",
    "text/x-rust",
    "text/x-c",
    "text/x-java-source",
    "text/x-sh",
    "text/x-sql",
    "text/x-toml",
    // structured data
    "application/json",
    "application/ld+json",
    "application/manifest+json",
    "application/geo+json",
    "application/x-ndjson",
    "application/xml",
    "application/xhtml+xml",
    "application/rss+xml",
    "application/atom+xml",
    "application/yaml",
    "application/x-yaml",
    "application/toml",
    "application/x-toml",
    "application/graphql",
    "application/sql",
    // scripts
    "application/javascript",
    "application/x-javascript",
    "application/ecmascript",
    "application/typescript",
    "application/x-typescript",
    "application/x-sh",
    "application/x-httpd-php",
    "application/x-python",
    // images that are really markup
    "image/svg+xml",
];

/// Structured-syntax suffixes that mark a MIME type as textual
pub const TEXT_MIME_SUFFIXES: &[&str] = &["+xml", "+json", "+yaml", "+toml"];

/// MIME types that carry no information about the payload
const GENERIC_BINARY_MIME_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/unknown",
];

/// File extensions treated as text when the MIME type is generic
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "rst", "adoc", "log", "csv", "tsv", "json", "jsonld",
    "ndjson", "geojson", "xml", "svg", "html", "htm", "xhtml", "css", "scss", "sass", "less",
    "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "properties", "js", "mjs", "cjs", "jsx",
    "ts", "tsx", "vue", "svelte", "py", "rb", "php", "pl", "lua", "sh", "bash", "zsh", "fish",
    "ps1", "bat", "rs", "go", "c", "h", "cpp", "hpp", "cc", "cs", "java", "kt", "swift", "scala",
    "dart", "sol", "move", "sql", "graphql", "gql", "proto", "tex", "bib", "ics", "vcf", "srt",
    "vtt", "diff", "patch", "lock",
];

lazy_static! {
    pub static ref TEXT_MIME_SET: HashSet<&'static str> =
        TEXT_MIME_TYPES.iter().copied().collect();
    pub static ref GENERIC_BINARY_SET: HashSet<&'static str> =
        GENERIC_BINARY_MIME_TYPES.iter().copied().collect();
    pub static ref TEXT_EXTENSION_SET: HashSet<&'static str> =
        TEXT_EXTENSIONS.iter().copied().collect();
}
