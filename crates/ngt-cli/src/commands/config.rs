//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use ngt_core::config::AppConfig;

use crate::commands::resolve_config_path;
use crate::output::{print_error, print_info, print_success, print_warning};

/// Print the config file location
pub fn config_path(config_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", resolve_config_path(config_path).display());
    Ok(())
}

/// Get a config value by key
pub fn config_get(config_path: Option<&PathBuf>, key: &str) -> Result<()> {
    let path = resolve_config_path(config_path);

    if !path.exists() {
        print_error(&format!("Config file not found: {:?}", path));
        print_info("Run 'ngrok-tunnels config init' to create one");
        return Ok(());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let table: toml::Table =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Dotted keys walk into tables, e.g. "projects.web.url"
    let mut current = &toml::Value::Table(table);
    for part in key.split('.') {
        match current.as_table().and_then(|t| t.get(part)) {
            Some(v) => current = v,
            None => {
                print_error(&format!("Key not found: {}", key));
                return Ok(());
            }
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(current)?),
        other => println!("{}", other),
    }

    Ok(())
}

/// Set a config value by key
pub fn config_set(config_path: Option<&PathBuf>, key: &str, value: &str) -> Result<()> {
    let path = resolve_config_path(config_path);

    if !path.exists() {
        print_info("Creating default configuration...");
        config_init(config_path, false)?;
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let table: toml::Table =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    let parts: Vec<&str> = key.split('.').collect();
    let Some((last_key, parents)) = parts.split_last() else {
        anyhow::bail!("Invalid key: {}", key);
    };
    if last_key.is_empty() {
        anyhow::bail!("Invalid key: {}", key);
    }

    // A typed value the config rejects (e.g. a port given as a url) is
    // stored as a string instead
    let mut written = None;
    for candidate in [parse_value(value), toml::Value::String(value.to_string())] {
        let mut edited = table.clone();
        set_key(&mut edited, parents, last_key, candidate)
            .with_context(|| format!("Cannot navigate to key: {}", key))?;

        let content = toml::to_string_pretty(&edited)?;
        if toml::from_str::<AppConfig>(&content).is_ok() {
            written = Some(content);
            break;
        }
    }
    let Some(new_content) = written else {
        anyhow::bail!("Invalid value for {}: {}", key, value);
    };

    std::fs::write(&path, new_content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn set_key(
    table: &mut toml::Table,
    parents: &[&str],
    last_key: &str,
    value: toml::Value,
) -> Result<()> {
    let mut current = table;
    for part in parents {
        current = current
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("{} is not a table", part))?;
    }
    current.insert(last_key.to_string(), value);
    Ok(())
}

fn parse_value(value: &str) -> toml::Value {
    if value == "true" {
        toml::Value::Boolean(true)
    } else if value == "false" {
        toml::Value::Boolean(false)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else {
        toml::Value::String(value.to_string())
    }
}

/// Show current configuration
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'ngrok-tunnels config init' to create one");
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Initialize default configuration
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let config_file = resolve_config_path(config_path);

    if let Some(config_dir) = config_file.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            std::fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            print_success(&format!("Created config directory: {:?}", config_dir));
        }
    }

    if config_file.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", config_file));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(&config_file, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

    print_success(&format!("Created configuration file: {:?}", config_file));
    print_info("Add your projects under [projects.<name>] and run 'ngrok-tunnels start'");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# ngrok-tunnels configuration

# Full path to the ngrok executable. Leave empty to use PATH.
executable_path = ""

# ngrok control API
api_url = "http://localhost:4040"

# Page the installer reads download links from
download_page = "https://ngrok.com/download"

# Wait after launching ngrok before talking to it (milliseconds)
startup_grace_ms = 250

# Wait before retrying a tunnel whose error response was unreadable (milliseconds)
create_retry_delay_ms = 1000

# Open ngrok in a visible console window (Windows)
show_window = false

# One table per project. `url` is the local URL or just a port number.
# [projects.web]
# url = "http://localhost:5000/"
# subdomain = "my-app"
# hostname = ""
# region = "us"
"#;
