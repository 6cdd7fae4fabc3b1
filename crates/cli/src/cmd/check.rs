use quire_core::config::loader::{ConfigSource, load_config};
use serde_yaml::{Mapping, Value};
use tracing::{debug, error, info};

use crate::{CheckArgs, OutputFormat};

/// Command-line values that replace the ones in the file.
fn overrides(args: &CheckArgs) -> Mapping {
    let mut overrides = Mapping::new();
    if args.strict {
        overrides.insert(Value::from("strict"), Value::Bool(true));
    }
    if let Some(theme) = &args.theme {
        overrides.insert(Value::from("theme"), Value::from(theme.as_str()));
    }
    if let Some(site_dir) = &args.site_dir {
        overrides.insert(Value::from("site_dir"), Value::from(site_dir.as_str()));
    }
    overrides
}

fn render(config: &Mapping, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
    }
}

pub fn run(args: &CheckArgs) -> i32 {
    debug!("Running check");

    let source = match &args.config_file {
        Some(path) => ConfigSource::Path(path.clone()),
        None => ConfigSource::Discover,
    };
    let registry = super::registry(&args.themes_dirs);

    let config = match load_config(source, overrides(args), &registry) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return 1;
        }
    };

    if let Some(path) = config.config_file_path() {
        info!("Configuration is valid: {}", path.display());
    }

    match render(config.as_mapping(), args.format) {
        Ok(out) => {
            print!("{out}");
            if !out.ends_with('\n') {
                println!();
            }
            0
        }
        Err(e) => {
            error!("Failed to render configuration: {e}");
            1
        }
    }
}
