//! Entry point: wires CLI arguments into configuration, builds target requests
//! and wordlists, fetches baselines, runs the discovery orchestrator, and
//! renders the report.
//!
//! Grounded directly on the teacher's `main.rs` structure and control flow —
//! parse args, build a `reqwest::Client`, show an `indicatif` progress bar over
//! the slow phase, run the work, print a colored summary footer.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use paramhunt_rs::error::ParamHuntError;
use paramhunt_rs::logger::Logger;
use paramhunt_rs::request::{self, RequestInfo};
use paramhunt_rs::wordlist::{self, Wordlists};
use paramhunt_rs::{args, config, orchestrator, output};

#[tokio::main]
async fn main() -> ExitCode {
    let args = args::Args::parse();
    let logger = Logger::new(args.verbosity);

    match run(args, logger).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.error(err.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: args::Args, logger: Logger) -> Result<(), ParamHuntError> {
    let config = config::build(&args)?;

    if args.disable_mining {
        logger.debug("mining disabled flag accepted; external mining is not implemented by this engine");
    }

    let wordlists = load_wordlists(&config)?;

    let mut client_builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(Duration::from_secs(10))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        })
        .user_agent("paramhunt-rs/0.1");

    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ParamHuntError::InvalidProxy(proxy_url.clone(), e.to_string()))?;
        client_builder = client_builder.proxy(proxy);
    }

    let client = client_builder.build().map_err(|e| ParamHuntError::ClientBuild(e.to_string()))?;

    let mut requests = build_requests(&args, &client).await?;
    if requests.is_empty() {
        return Err(ParamHuntError::NoTarget);
    }

    logger.info(format!("fetching baseline for {} target request(s)...", requests.len()));
    let progress = ProgressBar::new(requests.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} baselines")
            .unwrap()
            .progress_chars("#>-"),
    );

    let baselines = futures::future::join_all(requests.iter().map(|r| {
        let client = client.clone();
        async move {
            let baseline = request::fetch_baseline(&client, r).await;
            progress.inc(1);
            baseline
        }
    }))
    .await;
    progress.finish_and_clear();

    let mut prepared = Vec::with_capacity(requests.len());
    for (mut info, baseline) in requests.drain(..).zip(baselines) {
        match baseline {
            Some(baseline) => {
                info.baseline_html_tag_count = baseline.html_tag_count();
                info.baseline_response = Some(baseline);
                prepared.push(info);
            }
            None => logger.warning(format!("dropping {} — baseline fetch failed", info.origin_url)),
        }
    }

    if prepared.is_empty() {
        return Err(ParamHuntError::AllBaselinesFailed);
    }

    logger.info(format!("discovering hidden parameters across {} surface(s)...", config.enabled_surfaces.len()));
    let tree = orchestrator::run(prepared, &wordlists, &config, client, logger).await;

    let rendered = output::render(&tree, config.output_format);
    println!("{rendered}");

    if let Some(path) = &config.output_path {
        output::save(path, &rendered)?;
        logger.info(format!("report written to {}", path.display()));
    }

    println!(
        "\n{} {} hit(s) across {} surface(s)",
        "Summary:".bold().underline(),
        tree.total_hits().to_string().green().bold(),
        config.enabled_surfaces.len()
    );

    Ok(())
}

fn load_wordlists(config: &config::Config) -> Result<Wordlists, ParamHuntError> {
    let mut wordlists = Wordlists::default();

    if !config.param_wordlist_paths.is_empty() {
        let csv = join_paths(&config.param_wordlist_paths);
        let merged = wordlist::load_merged(&csv)?;
        wordlists.url = merged.clone();
        wordlists.body_form = merged.clone();
        wordlists.body_json = merged;
    }
    if !config.header_wordlist_paths.is_empty() {
        let csv = join_paths(&config.header_wordlist_paths);
        wordlists.header = wordlist::filter_header_names(wordlist::load_merged(&csv)?);
    }
    if !config.cookie_wordlist_paths.is_empty() {
        let csv = join_paths(&config.cookie_wordlist_paths);
        wordlists.cookie = wordlist::filter_cookie_names(wordlist::load_merged(&csv)?);
    }

    Ok(wordlists)
}

fn join_paths(paths: &[std::path::PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(",")
}

/// Builds the target `RequestInfo` list from `-u` or `-r` (a raw-request file,
/// a directory of them, or a Burp XML export).
async fn build_requests(args: &args::Args, client: &reqwest::Client) -> Result<Vec<RequestInfo>, ParamHuntError> {
    let header_pairs = parse_header_flags(&args.headers);

    if let Some(url) = &args.url {
        let info = request::request_info_from_url(url, &args.method, args.body.clone(), header_pairs)?;
        return Ok(vec![info]);
    }

    let raw_path = args.raw.as_ref().expect("config::build guarantees url or raw is set");
    let path = Path::new(raw_path);

    if path.is_dir() {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(path).map_err(|source| ParamHuntError::Io { path: path.to_path_buf(), source })? {
            let entry = entry.map_err(|source| ParamHuntError::Io { path: path.to_path_buf(), source })?;
            out.extend(parse_raw_file(client, &entry.path()).await?);
        }
        Ok(out)
    } else {
        parse_raw_file(client, path).await
    }
}

async fn parse_raw_file(client: &reqwest::Client, path: &Path) -> Result<Vec<RequestInfo>, ParamHuntError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParamHuntError::Io { path: path.to_path_buf(), source })?;
    if text.trim_start().starts_with('<') {
        request::request_infos_from_burp_xml(client, &text).await
    } else {
        Ok(vec![request::request_info_from_raw(client, &text).await?])
    }
}

fn parse_header_flags(raw: &[String]) -> Vec<(String, String)> {
    raw.iter()
        .filter_map(|h| h.split_once(':').map(|(k, v)| (k.trim().to_string(), v.trim().to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_flags_split_on_first_colon() {
        let parsed = parse_header_flags(&["X-Test: a:b".to_string(), "malformed".to_string()]);
        assert_eq!(parsed, vec![("X-Test".to_string(), "a:b".to_string())]);
    }
}
