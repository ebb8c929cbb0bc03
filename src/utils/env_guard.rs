use std::fs;
use std::path::Path;

fn write_minimal_env_template(file: &mut fs::File) -> std::io::Result<()> {
    use std::io::Write;
    writeln!(file, "# Valuation operator configuration")?;
    writeln!(file)?;
    writeln!(file, "ETH_RPC_URL=\"https://rpc.example.org/CHANGE_ME\"")?;
    writeln!(file, "OPERATOR_PRIVATE_KEY=\"\"")?;
    writeln!(file, "TASK_CONTRACT_ADDRESS=\"\"")?;
    writeln!(file, "SCORING_PIPELINE_URL=\"http://127.0.0.1:8080/score\"")?;
    writeln!(file)?;
    writeln!(file, "# POLL_INTERVAL_MS=\"10000\"")?;
    writeln!(file, "# RESPONSE_GAS_LIMIT=\"1500000\"")?;
    writeln!(file)?;
    writeln!(file, "RUST_LOG=\"info,valuation_operator=info\"")?;
    Ok(())
}

/// Parses one `.env` line into a key/value pair. Quotes are stripped and
/// trailing `#` comments dropped.
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let unquoted = if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        &value[1..value.len() - 1]
    } else {
        value.split('#').next().unwrap_or("").trim()
    };
    Some((key, unquoted))
}

fn load_dot_env(path: &Path) {
    if !path.exists() {
        return;
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ENV] Failed to read {}: {}", path.display(), e);
            return;
        }
    };

    for (key, value) in content.lines().filter_map(parse_env_line) {
        // Explicit process environment always wins over the file.
        if std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
    }
}

fn ensure_env_example_exists() {
    let env_example = Path::new(".env.example");
    if env_example.exists() {
        return;
    }
    if let Ok(mut file) = fs::File::create(env_example) {
        let _ = write_minimal_env_template(&mut file);
    }
}

pub fn harden_env_setup() {
    ensure_env_example_exists();
    load_dot_env(Path::new(".env"));
    for key in [
        "ETH_RPC_URL",
        "OPERATOR_PRIVATE_KEY",
        "TASK_CONTRACT_ADDRESS",
        "SCORING_PIPELINE_URL",
    ] {
        if std::env::var(key).is_err() {
            eprintln!("[ENV] WARN: {key} is not set");
        }
    }
}
