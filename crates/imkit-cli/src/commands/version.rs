//! Version command.

use anyhow::Result;
use imkit_io::environment;

/// Prints the version, compiled features and header probers.
pub fn run(verbose: bool) -> Result<()> {
    println!("{}", environment::version());
    println!("Features:  {}", environment::features());
    println!("Delegates: {}", environment::delegates());
    if verbose {
        println!("Formats:   {}", environment::supported_formats()?.len());
        println!("Temp dir:  {}", environment::temp_directory().display());
        if let Some(path) = environment::configure_path() {
            println!("Configure: {}", path.display());
        }
    }
    Ok(())
}
