use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Parsed Rust sources loaded from the module paths.
///
/// Module paths may name single `.rs` files or directories. Directories are
/// walked recursively, skipping `target` and hidden directories. Files that
/// fail to parse are reported in `warnings` and left out, so one broken file
/// does not hide the types declared elsewhere.
#[derive(Debug, Default)]
pub struct ModuleSet {
    /// Successfully parsed files
    pub files: Vec<ParsedFile>,
    /// Inaccessible paths and parse failures
    pub warnings: Vec<String>,
}

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl ModuleSet {
    /// Scan and parse every module path.
    ///
    /// # Errors
    ///
    /// Returns an error if a module path does not exist.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut set = ModuleSet::default();

        for path in paths {
            if !path.exists() {
                bail!("Module path does not exist: {}", path.display());
            }
            for file in set.scan(path) {
                match parse_file(&file) {
                    Ok(parsed) => set.files.push(parsed),
                    Err(e) => {
                        let warning = format!("Skipping {}: {:#}", file.display(), e);
                        warn!("{}", warning);
                        set.warnings.push(warning);
                    }
                }
            }
        }

        debug!(
            "Loaded {} module files ({} warnings)",
            set.files.len(),
            set.warnings.len()
        );
        Ok(set)
    }

    /// Build a set from in-memory source, e.g. in tests or when embedding.
    pub fn from_source(name: &str, code: &str) -> Result<Self> {
        let syntax_tree = syn::parse_file(code)
            .with_context(|| format!("Failed to parse Rust syntax in {}", name))?;
        Ok(ModuleSet {
            files: vec![ParsedFile {
                path: PathBuf::from(name),
                syntax_tree,
            }],
            warnings: Vec::new(),
        })
    }

    /// Collect the `.rs` files under one module path.
    fn scan(&mut self, root: &Path) -> Vec<PathBuf> {
        if root.is_file() {
            return vec![root.to_path_buf()];
        }

        let mut rust_files = Vec::new();
        let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
            if e.path() == root {
                return true;
            }
            let file_name = e.file_name().to_string_lossy();
            !file_name.starts_with('.') && file_name != "target"
        });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    self.warnings.push(warning);
                }
            }
        }

        rust_files.sort();
        rust_files
    }
}

fn parse_file(path: &Path) -> Result<ParsedFile> {
    debug!("Parsing file: {}", path.display());

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let syntax_tree = syn::parse_file(&content)
        .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

    Ok(ParsedFile {
        path: path.to_path_buf(),
        syntax_tree,
    })
}
