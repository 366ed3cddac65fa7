use std::env;
use std::sync::Arc;
use times_esa_mcp_server_rs::config::AppConfig;
use times_esa_mcp_server_rs::journal::EsaClient;
use times_esa_mcp_server_rs::mcp::McpServer;
use times_esa_mcp_server_rs::submission_guard::SubmissionGuard;
use times_esa_mcp_server_rs::tools::{register_prompts, register_tools};
use times_esa_mcp_server_rs::utils::parse_args;
use times_esa_mcp_server_rs::workflow::ReportWorkflow;
use tracing::{error, info};

fn main() {
    let argv: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&argv);
    if args.flags.contains("help") || args.flags.contains("h") {
        print_help();
        return;
    }

    init_tracing();

    let config = match AppConfig::from_env(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let client = match EsaClient::new(config.esa.clone()) {
        Ok(client) => client,
        Err(err) => {
            error!("[{}] failed to build esa client: {err}", config.server_name);
            std::process::exit(1);
        }
    };

    let guard = Arc::new(SubmissionGuard::new(config.suppression));
    let workflow = Arc::new(ReportWorkflow::new(client, guard, config.workflow.clone()));

    let mut server = McpServer::new(config.server_name.clone(), env!("CARGO_PKG_VERSION"));
    register_tools(&mut server, workflow);
    register_prompts(&mut server);

    info!(
        team = %config.esa.team,
        window_secs = config.suppression.window.as_secs(),
        threshold = config.suppression.similarity_threshold,
        require_confirmation = config.workflow.require_confirmation,
        "[{}] MCP times-esa server ready",
        config.server_name
    );

    if let Err(err) = server.run_stdio() {
        error!("[{}] MCP times-esa server crashed: {err}", config.server_name);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn print_help() {
    println!(
        "Usage: times-esa-mcp-server-rs [--team <name>] [--name <id>] [--base-url <url>] [--timeout-secs <n>] [--window-secs <n>] [--threshold <0..1>] [--require-confirmation <bool>] [--prefix <token>]\n\nEnvironment:\n  ESA_TEAM_NAME                    esa team (required unless --team is given)\n  ESA_ACCESS_TOKEN                 esa access token (required)\n  ESA_API_BASE_URL                 API base URL (default https://api.esa.io/v1)\n  TIMES_ESA_TIMEOUT_SECS           Per-request timeout in seconds (default 10)\n  TIMES_ESA_WINDOW_SECS            Duplicate suppression window in seconds (default 180)\n  TIMES_ESA_SIMILARITY_THRESHOLD   Similarity at or above which a text is a duplicate (default 0.9)\n  TIMES_ESA_REQUIRE_CONFIRMATION   Require confirmed_by_user=true (default true)\n  RUST_LOG                         Log filter for stderr logging (default info)\n\nOptions:\n  --name <id>   MCP server name (default times-esa-mcp-server)\n  --help        Show help"
    );
}
