use clap::Parser;
use kierki::deal::load_deal_script;
use kierki::logger::Logger;
use kierki::session::Server;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "kierki-server",
    version,
    about = "Kierki tournament server",
    long_about = "Deals prearranged hands from a scripted game file to four \
                  networked clients (seats N, E, S, W), arbitrates tricks, \
                  and scores each deal under the type it specifies.\n\
                  Protocol is CRLF-terminated ASCII; see src/wire for the \
                  full grammar."
)]
struct Args {
    /// Port to listen on. 0 lets the kernel choose.
    #[arg(short = 'p', long, default_value_t = 0)]
    port: u16,

    /// Per-connection inactivity / re-prompt timeout, in seconds.
    #[arg(short = 't', long, default_value_t = kierki::config::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Deal script file (mandatory).
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Increase output verbosity (-v verbose, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env().init();
    let log = Logger::new(args.verbose);

    let deals = load_deal_script(&args.file)?;
    let addr: SocketAddr = format!("[::]:{}", args.port).parse()?;
    let server = Server::bind(addr, Duration::from_secs(args.timeout), deals, log).await?;
    server.run().await;
    Ok(())
}
