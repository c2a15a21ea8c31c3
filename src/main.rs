//! Host-side helper: builds the wasm bundle, serves the site locally, and
//! validates effect config files.

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::{Command, Stdio};

    use anyhow::{bail, Context, Result};
    use clap::{Parser, Subcommand};
    use log::{info, warn};

    use clubfx::SiteConfig;

    #[derive(Parser)]
    #[command(name = "clubfx", version, about = "Club site effects: build, serve, check")]
    struct Cli {
        #[command(subcommand)]
        command: Cmd,
    }

    #[derive(Subcommand)]
    enum Cmd {
        /// Build the wasm bundle into the site directory and serve it.
        Serve {
            #[arg(long, default_value_t = 8000)]
            port: u16,
            #[arg(long, default_value = "static")]
            dir: PathBuf,
            /// Serve whatever bundle is already there.
            #[arg(long)]
            no_build: bool,
            /// Also expose the server through ngrok.
            #[arg(long)]
            tunnel: bool,
        },
        /// Validate a config file and print the effective config.
        CheckConfig { path: PathBuf },
    }

    pub fn run() -> Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        match Cli::parse().command {
            Cmd::Serve {
                port,
                dir,
                no_build,
                tunnel,
            } => serve(port, dir, no_build, tunnel),
            Cmd::CheckConfig { path } => check_config(path),
        }
    }

    fn build_wasm(dir: &std::path::Path) -> Result<()> {
        info!("building wasm bundle into {}/pkg", dir.display());
        let out_dir = dir.join("pkg");
        let status = Command::new("wasm-pack")
            .args(["build", "--release", "--target", "web", "--out-dir"])
            .arg(&out_dir)
            .status();
        match status {
            Ok(st) if st.success() => Ok(()),
            Ok(st) => bail!("wasm-pack exited with {st}"),
            Err(e) => {
                warn!("wasm-pack not runnable ({e}); serving a possibly stale bundle");
                Ok(())
            }
        }
    }

    fn serve(port: u16, dir: PathBuf, no_build: bool, tunnel: bool) -> Result<()> {
        if !dir.is_dir() {
            bail!("site directory {} does not exist", dir.display());
        }
        if !no_build {
            build_wasm(&dir)?;
        }

        info!("serving {} at http://127.0.0.1:{port}", dir.display());
        let port = port.to_string();
        let mut server = Command::new("python3")
            .args(["-m", "http.server", port.as_str(), "--directory"])
            .arg(&dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to start python3 http.server")?;

        let mut ngrok = None;
        if tunnel {
            match Command::new("ngrok").args(["http", port.as_str()]).spawn() {
                Ok(child) => ngrok = Some(child),
                Err(e) => warn!("ngrok unavailable: {e}"),
            }
        }

        let status = server.wait().context("http server died")?;
        if let Some(mut child) = ngrok {
            child.kill().ok();
        }
        if !status.success() {
            bail!("http server exited with {status}");
        }
        Ok(())
    }

    fn check_config(path: PathBuf) -> Result<()> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = SiteConfig::from_json(&text).with_context(|| format!("in {}", path.display()))?;
        println!("{}", serde_json::to_string_pretty(&config)?);
        info!("{} is valid", path.display());
        Ok(())
    }
}
