/// Runtime switches. Configuration is env-only; positional/flag arguments are refused
/// so a deployment cannot drift from its `.env`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeArgs {
    /// Print the resolved configuration and exit.
    pub explain_config: bool,
    /// Run a single tick and exit (smoke-testing a deployment).
    pub run_once: bool,
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bool_from_env(vars: &dyn Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<bool> {
    match vars(key) {
        None => Ok(false),
        Some(raw) if raw.trim().is_empty() => Ok(false),
        Some(raw) => parse_bool_flag(&raw).ok_or_else(|| {
            anyhow::anyhow!("{key} must be a boolean (true/false/1/0), got `{}`", raw.trim())
        }),
    }
}

fn parse_runtime_args_from<I, S>(
    args: I,
    vars: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<RuntimeArgs>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let supplied_args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_string())
        .collect::<Vec<_>>();
    if !supplied_args.is_empty() {
        return Err(anyhow::anyhow!(
            "CLI arguments are not accepted. Configure .env keys instead (OPERATOR_EXPLAIN_CONFIG, OPERATOR_RUN_ONCE, ETH_RPC_URL, ...). Received args: {}",
            supplied_args.join(" ")
        ));
    }

    Ok(RuntimeArgs {
        explain_config: bool_from_env(vars, "OPERATOR_EXPLAIN_CONFIG")?,
        run_once: bool_from_env(vars, "OPERATOR_RUN_ONCE")?,
    })
}

pub fn parse_runtime_args() -> anyhow::Result<RuntimeArgs> {
    parse_runtime_args_from(std::env::args().skip(1), &|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::{parse_runtime_args_from, RuntimeArgs};
    use std::collections::HashMap;

    fn parse(args: &[&str], env: &[(&str, &str)]) -> anyhow::Result<RuntimeArgs> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        parse_runtime_args_from(args.iter().copied(), &|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_continuous_operation() {
        assert_eq!(parse(&[], &[]).expect("empty env"), RuntimeArgs::default());
    }

    #[test]
    fn test_env_switches_are_read() {
        let args = parse(
            &[],
            &[("OPERATOR_EXPLAIN_CONFIG", "yes"), ("OPERATOR_RUN_ONCE", "1")],
        )
        .expect("valid switches");
        assert!(args.explain_config);
        assert!(args.run_once);
    }

    #[test]
    fn test_cli_arguments_are_refused() {
        let err = parse(&["--once"], &[]).expect_err("args refused");
        assert!(err.to_string().contains("--once"));
    }

    #[test]
    fn test_garbage_boolean_is_an_error() {
        assert!(parse(&[], &[("OPERATOR_RUN_ONCE", "sometimes")]).is_err());
    }
}
