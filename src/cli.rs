use crate::element::{load_element, Element};
use crate::filters::FilterSet;
use crate::generator::{GenerationResult, Generator, GeneratorSettings};
use crate::serializer::{serialize, write_documents, write_to_file};
use crate::type_resolver::SourceTypeResolver;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// OpenAPI from annotations - compile documented operations and Rust types into OpenAPI documents
#[derive(Parser, Debug)]
#[command(name = "openapi-from-annotations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Annotation document (YAML or JSON element tree)
    #[arg(value_name = "ANNOTATIONS")]
    pub annotations_path: PathBuf,

    /// Configuration document (YAML or JSON element tree)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Rust file or directory to resolve referenced types from (repeatable)
    #[arg(short = 'm', long = "module-path", value_name = "PATH")]
    pub module_paths: Vec<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file for the generation result (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Also write every variant document to its own file in this directory
    #[arg(short = 'd', long = "documents-dir", value_name = "DIR")]
    pub documents_dir: Option<PathBuf>,

    /// Title of documents that do not configure one
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Version of documents that do not configure one
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.annotations_path.is_file() {
        anyhow::bail!(
            "Annotation document does not exist: {}",
            args.annotations_path.display()
        );
    }

    if let Some(ref config) = args.config_path {
        if !config.is_file() {
            anyhow::bail!("Configuration document does not exist: {}", config.display());
        }
    }

    for module_path in &args.module_paths {
        if !module_path.exists() {
            anyhow::bail!("Module path does not exist: {}", module_path.display());
        }
    }

    info!("Annotations: {}", args.annotations_path.display());
    if let Some(ref config) = args.config_path {
        info!("Configuration: {}", config.display());
    }
    info!("Module paths: {:?}", args.module_paths);
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<GenerationResult> {
    info!("Starting OpenAPI document generation...");

    // Step 1: Load annotation and configuration documents
    info!("Loading annotation document...");
    let annotations = load_element(&args.annotations_path)?;
    let config: Option<Element> = match &args.config_path {
        Some(path) => {
            info!("Loading configuration document...");
            Some(load_element(path)?)
        }
        None => None,
    };

    // Step 2: Parse the module paths for the type resolver
    info!("Loading type information from {} module paths...", args.module_paths.len());
    let resolver = SourceTypeResolver::from_module_paths(&args.module_paths)?;

    // Step 3: Generate
    let mut settings = GeneratorSettings::default();
    if let Some(title) = &args.title {
        settings.title = title.clone();
    }
    if let Some(version) = &args.api_version {
        settings.version = version.clone();
    }
    let generator = Generator::new(FilterSet::default(), settings);

    info!("Generating documents...");
    let result = generator.generate(&annotations, config.as_ref(), &resolver);

    for failure in result.failures() {
        warn!(
            "{} {}: {}",
            failure.method.as_deref().unwrap_or("-"),
            failure.path.as_deref().unwrap_or("-"),
            failure.message
        );
    }

    // Step 4: Serialize the result to file or stdout
    info!("Serializing to {:?} format...", args.output_format);
    let content = serialize(&result, args.output_format)?;
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    // Step 5: Write one file per variant document
    if let Some(dir) = &args.documents_dir {
        let written = write_documents(&result.documents, dir, args.output_format)?;
        info!("Wrote {} documents to {}", written.len(), dir.display());
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Operations: {}", result.per_path.len());
    info!("  - Failures: {}", result.failures().count());
    info!("  - Documents: {}", result.documents.len());

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_arguments() {
        let args = CliArgs::try_parse_from([
            "openapi-from-annotations",
            "annotations.yaml",
            "-c",
            "config.yaml",
            "-m",
            "src/models",
            "--module-path",
            "src/dto.rs",
            "-f",
            "json",
            "-d",
            "out",
            "--title",
            "Store",
            "--api-version",
            "2.0.0",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.annotations_path, PathBuf::from("annotations.yaml"));
        assert_eq!(args.config_path, Some(PathBuf::from("config.yaml")));
        assert_eq!(
            args.module_paths,
            vec![PathBuf::from("src/models"), PathBuf::from("src/dto.rs")]
        );
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.documents_dir, Some(PathBuf::from("out")));
        assert_eq!(args.title.as_deref(), Some("Store"));
        assert_eq!(args.api_version.as_deref(), Some("2.0.0"));
        assert!(args.verbose);
    }

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["openapi-from-annotations", "annotations.json"]).unwrap();

        assert_eq!(args.output_format, OutputFormat::Yaml);
        assert!(args.module_paths.is_empty());
        assert!(args.output_path.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_missing_annotations_rejected() {
        let args = CliArgs::try_parse_from(["openapi-from-annotations", "/definitely/missing.yaml"]).unwrap();
        assert!(parse_args_from_parsed(args).is_err());
    }
}
