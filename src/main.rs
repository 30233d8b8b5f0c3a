use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use pystubs::core::{locate_package, ModuleLoader, StubGenerator};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "pystubs",
    version = "0.1.0",
    author = "pystubs developers",
    about = "Generate .pyi stubs for a Python package without importing it"
)]
struct Cli {
    /// Directory of the root package (must contain __init__.py)
    #[arg(value_name = "PACKAGE")]
    package: PathBuf,

    /// Output directory for the generated stubs, relative to the working directory
    #[arg(short, long, value_name = "DIR", default_value = "dist/stubs")]
    output: PathBuf,

    /// Keep stubs from earlier runs instead of deleting the output directory
    #[arg(long)]
    keep_old: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        package,
        output,
        keep_old,
    } = cli;

    let start_time = Instant::now();

    let (package_name, search_root) = locate_package(&package)?;
    println!("PYSTUBS - Python stub generation");
    println!("Package: {} ({})", package_name, package.display());
    println!("Output: {}", output.display());

    let loader = ModuleLoader::new(vec![search_root]);
    for root in loader.search_path() {
        println!("Search path: {}", root.display());
    }
    let root = loader.import_package(&package_name, &package)?;

    let generator = StubGenerator::new(root, loader);
    let report = generator.generate(&output, !keep_old)?;

    println!(
        "Generated {} stub files in {:.2}s",
        report.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn output_defaults_to_dist_stubs_under_the_working_directory() {
        Cli::command().debug_assert();

        let cli = Cli::parse_from(["pystubs", "src/mypkg"]);
        assert_eq!(cli.package, PathBuf::from("src/mypkg"));
        assert_eq!(cli.output, PathBuf::from("dist/stubs"));
        assert!(!cli.keep_old);

        let command = Cli::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "output")
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .unwrap_or_default();
        assert!(help.contains("relative to the working directory"));
    }

    #[test]
    fn output_and_keep_old_can_be_overridden() {
        let cli = Cli::parse_from(["pystubs", "pkg", "-o", "/tmp/out", "--keep-old"]);
        assert_eq!(cli.output, PathBuf::from("/tmp/out"));
        assert!(cli.keep_old);
    }
}
