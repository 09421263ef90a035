use std::{env, env::VarError};

/// The server is configured through the environment only. Any argument (`--help`, `-h`, or anything else) prints the
/// help text and the current non-secret configuration. Returns true if the help was printed.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Only non-secret variables belong in this list
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "KPG_HOST",
        "KPG_PORT",
        "KPG_DATABASE_URL",
        "KPG_DATABASE_MAX_CONNECTIONS",
        "KPG_INVOICE_EXPIRY",
        "KPG_EXPIRY_SWEEP_INTERVAL",
        "KPG_SHOPIFY_SHOP",
        "KPG_SHOPIFY_API_VERSION",
        "KPG_SHOPIFY_HMAC_CHECKS",
        "KPG_WOOCOMMERCE_CONFIRM_URL",
        "KPG_WOOCOMMERCE_HMAC_CHECKS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
