//! ansible-snippets — generate UltiSnips snippets from Ansible module documentation.
//!
//! Walks the built-in module tree (and optionally the user's installed
//! collections), reads the `DOCUMENTATION` block of every module and writes
//! one snippet per module:
//!
//! `ansible-snippets --style dictionary --sort --user -o ansible.snippets`

mod collect;
mod extract;
mod model;
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Prints the directory holding ansible's built-in modules.
const LOCATE_MODULES: &str =
    "import os, ansible.modules; print(os.path.dirname(ansible.modules.__file__))";

/// User collections, relative to the home directory.
const USER_COLLECTIONS: &str = ".ansible/collections/ansible_collections";

#[derive(Parser)]
#[command(
    name = "ansible-snippets",
    about = "Generate UltiSnips snippets from Ansible module documentation"
)]
struct Cli {
    /// Module directories to scan (glob patterns supported). If omitted, the
    /// ansible.modules package of --python is used.
    roots: Vec<String>,

    /// Output filename
    #[arg(short = 'o', long, default_value = "ansible.snippets")]
    output: PathBuf,

    /// YAML format to use for snippets
    #[arg(long, value_enum, default_value_t)]
    style: render::Style,

    /// Sort module arguments alphabetically
    #[arg(long)]
    sort: bool,

    /// Include modules from collections installed for the current user
    #[arg(long)]
    user: bool,

    /// Collections directory scanned by --user
    /// (default: ~/.ansible/collections/ansible_collections)
    #[arg(long, requires = "user")]
    user_root: Option<PathBuf>,

    /// Leave placeholders without default or choices empty instead of
    /// filling in the option description
    #[arg(long)]
    no_description: bool,

    /// Comment out non-required options instead of separating them with a blank line
    #[arg(long)]
    comment_non_required: bool,

    /// Use fully qualified collection names in snippet bodies
    #[arg(long)]
    fqcn: bool,

    /// Python interpreter used to locate ansible.modules
    #[arg(long, default_value = "python3")]
    python: String,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn render_config(&self) -> render::RenderConfig {
        render::RenderConfig {
            style: self.style,
            sort_alphabetically: self.sort,
            suppress_descriptions: self.no_description,
            comment_non_required: self.comment_non_required,
            use_qualified_name: self.fqcn,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.render_config();

    let roots = if cli.roots.is_empty() {
        vec![locate_builtin_modules(&cli.python)?]
    } else {
        expand_roots(&cli.roots)?
    };
    let user_root = if cli.user {
        Some(resolve_user_root(cli.user_root.as_deref())?)
    } else {
        None
    };
    if let Some(ref root) = user_root {
        info!("including user modules from {}", root.display());
    }

    let docs = collect::collect(&extract::PythonDocExtractor, &roots, user_root.as_deref())?;
    info!("collected {} modules", docs.len());

    let output = render::render_file(&docs, &config);
    fs::write(&cli.output, output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!("wrote {}", cli.output.display());

    Ok(())
}

/// Ask the Python interpreter where the ansible.modules package lives.
fn locate_builtin_modules(python: &str) -> Result<PathBuf> {
    let output = Command::new(python)
        .args(["-c", LOCATE_MODULES])
        .output()
        .with_context(|| format!("failed to run {}", python))?;
    if !output.status.success() {
        bail!(
            "could not locate ansible.modules with {}: {}",
            python,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if dir.is_empty() {
        bail!("could not locate ansible.modules with {}", python);
    }
    Ok(PathBuf::from(dir))
}

fn resolve_user_root(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => dirs::home_dir()
            .map(|home| home.join(USER_COLLECTIONS))
            .context("cannot determine home directory for --user"),
    }
}

/// Expand root arguments. Plain paths are kept as given so that a missing
/// directory is reported by the collector; patterns expand to the
/// directories they match.
fn expand_roots(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut roots = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            roots.push(PathBuf::from(pattern));
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_dir())
            .collect();
        if matches.is_empty() {
            warn!("no directories matched: {}", pattern);
        }
        roots.extend(matches);
    }
    roots.sort();
    roots.dedup();
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_roots_kept_verbatim() {
        let roots = expand_roots(&["/does/not/exist".to_string()]).unwrap();
        assert_eq!(roots, [PathBuf::from("/does/not/exist")]);
    }

    #[test]
    fn glob_roots_expand_to_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("c.py"), "").unwrap();

        let pattern = format!("{}/*", dir.path().display());
        let roots = expand_roots(&[pattern]).unwrap();
        assert_eq!(roots, [dir.path().join("a"), dir.path().join("b")]);
    }

    #[test]
    fn explicit_user_root() {
        let root = resolve_user_root(Some(Path::new("/tmp/collections"))).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/collections"));
    }

    #[test]
    fn cli_flags_map_to_render_config() {
        let cli = Cli::parse_from([
            "ansible-snippets",
            "--style",
            "dictionary",
            "--sort",
            "--no-description",
            "--comment-non-required",
            "--fqcn",
            "modules",
        ]);
        let config = cli.render_config();
        assert_eq!(config.style, render::Style::Dictionary);
        assert!(config.sort_alphabetically);
        assert!(config.suppress_descriptions);
        assert!(config.comment_non_required);
        assert!(config.use_qualified_name);
        assert_eq!(cli.output, PathBuf::from("ansible.snippets"));
        assert_eq!(cli.roots, ["modules"]);
    }
}
