//! Module discovery — walk search roots and gather documentation records.

use crate::extract::Extractor;
use crate::model::ModuleDoc;
use anyhow::{bail, Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};

/// Collection name given to modules shipped with ansible itself.
pub const BUILTIN_COLLECTION: &str = "core";

/// Directory that holds `<namespace>/<collection>` trees in a collections path.
const COLLECTIONS_MARKER: &str = "ansible_collections";

/// Where a search root comes from; decides filtering and collection tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootKind {
    Builtin,
    User,
}

/// Collect documentation for every module under `roots` and, when given,
/// `user_root`.
///
/// Built-in roots are walked first. A record identical to one already
/// collected is skipped, so user collections never shadow built-in modules
/// but do add the ones that differ.
pub fn collect(
    extractor: &dyn Extractor,
    roots: &[PathBuf],
    user_root: Option<&Path>,
) -> Result<Vec<ModuleDoc>> {
    let mut search: Vec<(&Path, RootKind)> = roots
        .iter()
        .map(|r| (r.as_path(), RootKind::Builtin))
        .collect();
    if let Some(user) = user_root {
        search.push((user, RootKind::User));
    }

    let mut docs: Vec<ModuleDoc> = Vec::new();
    for (root, kind) in search {
        for path in module_files(root, kind)? {
            let doc = match extractor.extract(&path) {
                Ok(Some(doc)) => doc,
                Ok(None) => {
                    trace!("no documentation in {}", path.display());
                    continue;
                }
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if doc.deprecated {
                debug!("skipping deprecated module {}", doc.module);
                continue;
            }
            if docs.iter().any(|seen| seen.same_documentation(&doc)) {
                debug!("skipping duplicate module {} from {}", doc.module, path.display());
                continue;
            }

            let collection = match kind {
                RootKind::Builtin => BUILTIN_COLLECTION.to_string(),
                RootKind::User => collection_name(&path).unwrap_or_else(|| {
                    debug!("{} is outside {}", path.display(), COLLECTIONS_MARKER);
                    BUILTIN_COLLECTION.to_string()
                }),
            };
            docs.push(doc.in_collection(collection));
        }
    }

    Ok(docs)
}

/// List the candidate module files under `root`, sorted by path.
fn module_files(root: &Path, kind: RootKind) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("search root is not a directory: {}", root.display());
    }
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.retain(|p| is_module_file(p, kind));
    // Sort for deterministic output
    files.sort();
    Ok(files)
}

/// Recursively gather regular files. Symlinks are never followed.
fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read directory: {}", dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        let path = entry.path();
        if file_type.is_symlink() {
            trace!("skipping symlink {}", path.display());
        } else if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// A module file is a `.py` source that is not a package initializer. Inside
/// user collections only `plugins/modules` holds modules.
fn is_module_file(path: &Path, kind: RootKind) -> bool {
    if path.extension() != Some(OsStr::new("py")) {
        return false;
    }
    let is_init = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("__init__"));
    if is_init {
        return false;
    }
    match kind {
        RootKind::Builtin => true,
        RootKind::User => {
            let segments = segments(path);
            segments
                .windows(2)
                .any(|w| w[0] == "plugins" && w[1] == "modules")
        }
    }
}

/// `.../ansible_collections/community/general/plugins/modules/ufw.py` →
/// `community.general`
fn collection_name(path: &Path) -> Option<String> {
    let segments = segments(path);
    let marker = segments.iter().position(|s| *s == COLLECTIONS_MARKER)?;
    let namespace = segments.get(marker + 1)?;
    let collection = segments.get(marker + 2)?;
    // The file itself is not a collection
    if marker + 3 >= segments.len() {
        return None;
    }
    Some(format!("{}.{}", namespace, collection))
}

fn segments(path: &Path) -> Vec<&str> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractError, PythonDocExtractor};
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn module_src(name: &str, description: &str) -> String {
        format!(
            "DOCUMENTATION = r'''\nmodule: {}\nshort_description: {}\n'''\n",
            name, description
        )
    }

    /// Records every path it is asked about and delegates to the real parser.
    struct Recording {
        seen: RefCell<Vec<PathBuf>>,
    }

    impl Extractor for Recording {
        fn extract(&self, path: &Path) -> Result<Option<ModuleDoc>, ExtractError> {
            self.seen.borrow_mut().push(path.to_path_buf());
            PythonDocExtractor.extract(path)
        }
    }

    #[test]
    fn filters_non_modules() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "__init__.py", &module_src("init", "x"));
        write(dir.path(), "README.md", &module_src("readme", "x"));
        write(dir.path(), "files/copy.py", &module_src("copy", "Copy files"));
        write(dir.path(), "files/__init__.py", "");

        let extractor = Recording {
            seen: RefCell::new(Vec::new()),
        };
        let docs = collect(&extractor, &[dir.path().to_path_buf()], None).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].module, "copy");
        assert_eq!(docs[0].collection_name, BUILTIN_COLLECTION);
        assert_eq!(*extractor.seen.borrow(), [dir.path().join("files/copy.py")]);
    }

    #[test]
    fn sorted_by_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "system/ping.py", &module_src("ping", "Ping"));
        write(dir.path(), "commands/shell.py", &module_src("shell", "Shell"));
        write(dir.path(), "commands/command.py", &module_src("command", "Command"));

        let docs = collect(&PythonDocExtractor, &[dir.path().to_path_buf()], None).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.module.as_str()).collect();
        assert_eq!(names, ["command", "shell", "ping"]);
    }

    #[test]
    fn skips_deprecated_and_broken() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "a_old.py",
            "DOCUMENTATION = '''\nmodule: old\ndeprecated:\n  why: gone\n'''\n",
        );
        write(dir.path(), "b_broken.py", "DOCUMENTATION = '''\nmodule: [x\n'''\n");
        write(dir.path(), "c_plain.py", "print('no docs')\n");
        write(dir.path(), "d_ping.py", &module_src("ping", "Ping"));

        let docs = collect(&PythonDocExtractor, &[dir.path().to_path_buf()], None).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].module, "ping");
    }

    #[test]
    fn user_collections_are_tagged_and_deduplicated() {
        let builtin = TempDir::new().unwrap();
        write(builtin.path(), "system/ping.py", &module_src("ping", "Ping"));

        let user = TempDir::new().unwrap();
        let user_root = user.path().join("ansible_collections");
        write(
            &user_root,
            "community/general/plugins/modules/ping.py",
            &module_src("ping", "Ping"),
        );
        write(
            &user_root,
            "community/general/plugins/modules/ufw.py",
            &module_src("ufw", "Manage firewall"),
        );
        write(
            &user_root,
            "community/general/plugins/module_utils/helper.py",
            &module_src("helper", "Not a module"),
        );
        write(
            &user_root,
            "acme/tools/plugins/modules/ping.py",
            &module_src("ping", "A different ping"),
        );

        let docs = collect(
            &PythonDocExtractor,
            &[builtin.path().to_path_buf()],
            Some(&user_root),
        )
        .unwrap();
        let tagged: Vec<String> = docs.iter().map(|d| d.fqcn()).collect();
        assert_eq!(
            tagged,
            ["core.ping", "acme.tools.ping", "community.general.ufw"]
        );
    }

    #[test]
    fn identical_roots_yield_each_module_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ping.py", &module_src("ping", "Ping"));
        let root = dir.path().to_path_buf();

        let docs = collect(&PythonDocExtractor, &[root.clone(), root], None).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = collect(&PythonDocExtractor, &[dir.path().join("nope")], None).unwrap_err();
        assert!(err.to_string().contains("search root is not a directory"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "real/ping.py", &module_src("ping", "Ping"));
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("linked")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("real/ping.py"),
            dir.path().join("real/alias.py"),
        )
        .unwrap();

        let extractor = Recording {
            seen: RefCell::new(Vec::new()),
        };
        collect(&extractor, &[dir.path().to_path_buf()], None).unwrap();
        assert_eq!(*extractor.seen.borrow(), [dir.path().join("real/ping.py")]);
    }

    #[test]
    fn collection_name_from_path() {
        assert_eq!(
            collection_name(Path::new(
                "/home/u/.ansible/collections/ansible_collections/community/general/plugins/modules/ufw.py"
            ))
            .as_deref(),
            Some("community.general")
        );
        assert_eq!(collection_name(Path::new("/usr/lib/ansible/modules/ping.py")), None);
        assert_eq!(
            collection_name(Path::new("ansible_collections/community/general")),
            None
        );
    }
}
