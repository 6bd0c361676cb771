//! UltiSnips snippet renderer.
//!
//! Each module becomes one `snippet ... endsnippet` block whose body is the
//! module invocation with one tab stop per option:
//!
//! ```text
//! snippet copy "Copy files to remote locations" b
//! copy: >
//! 	dest=${1:# Remote absolute path where the file should be copied to.}
//!
//! 	mode=${2:0644}
//!
//! endsnippet
//! ```

use crate::model::*;
use std::fmt;

/// Written once at the top of the generated file.
pub const FILE_HEADER: &str =
    "# NOTE: This file is auto-generated. Modifications may be overwritten.\npriority -50\n\n";

/// Option whose value is the whole argument string (command, shell, raw, ...).
const FREE_FORM: &str = "free_form";

/// Longest description excerpt used as a completion value.
const DESCRIPTION_LIMIT: usize = 512;

/// YAML layout of the module arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Style {
    /// `module: >` followed by `key=value` lines
    #[default]
    Multiline,
    /// `module:` followed by `key: value` lines
    Dictionary,
}

impl Style {
    fn delimiter(self) -> &'static str {
        match self {
            Style::Multiline => "=",
            Style::Dictionary => ": ",
        }
    }
}

/// Formatting switches for [`render`].
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub style: Style,
    pub sort_alphabetically: bool,
    /// Leave undocumented-value placeholders empty instead of quoting the description
    pub suppress_descriptions: bool,
    /// Prefix non-required options with `#` instead of separating them with a blank line
    pub comment_non_required: bool,
    /// Use `namespace.collection.module` in the snippet body
    pub use_qualified_name: bool,
}

/// One rendered snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetBlock {
    pub header: String,
    pub opener: String,
    pub required: Vec<String>,
    pub optional: Vec<String>,
    /// Blank line between the required and optional groups
    pub separated: bool,
}

impl SnippetBlock {
    /// Option lines including the group separator, if any.
    pub fn option_lines(&self) -> Vec<&str> {
        let mut lines: Vec<&str> = self.required.iter().map(String::as_str).collect();
        if self.separated {
            lines.push("");
        }
        lines.extend(self.optional.iter().map(String::as_str));
        lines
    }

    pub fn lines(&self) -> Vec<&str> {
        let mut lines = vec![self.header.as_str(), self.opener.as_str()];
        lines.extend(self.option_lines());
        lines.push("");
        lines.push("endsnippet");
        lines
    }
}

impl fmt::Display for SnippetBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

/// Render the complete snippets file for `docs`.
pub fn render_file(docs: &[ModuleDoc], config: &RenderConfig) -> String {
    let mut output = String::from(FILE_HEADER);
    for doc in docs {
        output.push_str(&render(doc, config).to_string());
        output.push_str("\n\n");
    }
    output
}

/// Render one module into a snippet block.
pub fn render(doc: &ModuleDoc, config: &RenderConfig) -> SnippetBlock {
    let name = if config.use_qualified_name {
        doc.fqcn()
    } else {
        doc.module.clone()
    };

    let header = format!(
        "snippet {} \"{}\" b",
        doc.module,
        escape(&doc.short_description)
    );
    let opener = match config.style {
        Style::Multiline if !doc.options.is_empty() => format!("{}: >", name),
        _ => format!("{}:", name),
    };

    let mut options: Vec<&OptionSpec> = doc.options.iter().collect();
    if config.sort_alphabetically {
        // sort_by is stable; partition below keeps this order within each group
        options.sort_by(|a, b| a.name.cmp(&b.name));
    }
    let (required, optional): (Vec<&OptionSpec>, Vec<&OptionSpec>) =
        options.into_iter().partition(|o| o.required);

    let required_lines: Vec<String> = required
        .iter()
        .enumerate()
        .map(|(i, option)| render_option(option, i + 1, false, config))
        .collect();
    let optional_lines: Vec<String> = optional
        .iter()
        .enumerate()
        .map(|(i, option)| {
            render_option(
                option,
                required.len() + i + 1,
                config.comment_non_required,
                config,
            )
        })
        .collect();

    SnippetBlock {
        header,
        opener,
        separated: !config.comment_non_required
            && !required_lines.is_empty()
            && !optional_lines.is_empty(),
        required: required_lines,
        optional: optional_lines,
    }
}

fn render_option(
    option: &OptionSpec,
    index: usize,
    commented: bool,
    config: &RenderConfig,
) -> String {
    let comment = if commented { "#" } else { "" };
    let delimiter = config.style.delimiter();
    let value = completion_value(option, config);
    if option.name == FREE_FORM {
        format!("\t{}${{{}:{}{}{}}}", comment, index, option.name, delimiter, value)
    } else {
        format!("\t{}{}{}${{{}:{}}}", comment, option.name, delimiter, index, value)
    }
}

/// Text pre-filled into the option's tab stop.
pub fn completion_value(option: &OptionSpec, config: &RenderConfig) -> String {
    if option.is_bool() {
        if let Some(flag) = option.default.as_ref().and_then(DefaultValue::as_flag) {
            return flag.to_string();
        }
    }

    match (&option.default, &option.choices) {
        (None, None) => describe(option, config),
        (Some(default), None) => default_literal(default),
        (Some(DefaultValue::List(selected)), Some(choices)) => {
            let marked: Vec<String> = choices
                .iter()
                .map(|c| {
                    let selected = selected.iter().any(|d| c.matches(d));
                    format!("{}{}", if selected { "#" } else { "" }, list_item(c))
                })
                .collect();
            format!("[{}]", marked.join(", "))
        }
        (Some(DefaultValue::Scalar(default)), Some(choices)) => choices
            .iter()
            .map(|c| mark(c, c.matches(default)))
            .collect::<Vec<_>>()
            .join("|"),
        (None, Some(choices)) => choices
            .iter()
            .map(|c| escape(&c.to_string()))
            .collect::<Vec<_>>()
            .join("|"),
    }
}

fn mark(choice: &Scalar, selected: bool) -> String {
    let prefix = if selected { "#" } else { "" };
    format!("{}{}", prefix, escape(&choice.to_string()))
}

/// A choice inside a list literal; strings are single-quoted.
fn list_item(choice: &Scalar) -> String {
    match choice {
        Scalar::Str(s) => format!("'{}'", escape(s)),
        other => other.to_string(),
    }
}

/// `# <first description line>`, or nothing when there is no usable description.
fn describe(option: &OptionSpec, config: &RenderConfig) -> String {
    if config.suppress_descriptions {
        return String::new();
    }
    match option.description.first() {
        Some(line) => {
            let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
            let excerpt: String = line.chars().take(DESCRIPTION_LIMIT).collect();
            format!("# {}", escape(&excerpt))
        }
        None => String::new(),
    }
}

fn default_literal(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Scalar(Scalar::Str(s)) if s.is_empty() => "\"\"".to_string(),
        DefaultValue::Scalar(Scalar::Str(s)) if s.contains('\\') => format!("\"{}\"", escape(s)),
        DefaultValue::Scalar(Scalar::Str(s)) => escape(s),
        DefaultValue::Scalar(other) => other.to_string(),
        DefaultValue::List(items) => {
            let items: Vec<String> = items.iter().map(|i| escape(&i.to_string())).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// Escape text for an UltiSnips snippet body.
///
/// Backslash, backtick, braces and `$` are snippet syntax; double quotes would
/// terminate the header description and become single quotes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' | '{' | '}' | '$' => {
                out.push('\\');
                out.push(c);
            }
            '"' => out.push('\''),
            _ => out.push(c),
        }
    }
    out
}
