use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;

use activity_core::Config;
use activity_graph::GraphClient;
use activity_resolver::{
    generate_scan_windows, scan_range_ending_at, ResolutionContext, ResourceResolver,
};

const USAGE: &str = "Usage:
  activity-importer                               print the scan plan
  activity-importer doc <context-id> <upn>        resolve a document context id
  activity-importer meeting <meeting-id> <organizer-id>
  activity-importer user <upn>                    resolve a user's object id";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    activity_core::init(&config.logging.filter)?;
    let (config, _) = config.into_validated()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] => print_scan_plan(&config),
        ["doc", context_id, upn] => {
            let resolver = build_resolver(&config)?;
            match resolver.resolve_document_context(context_id, upn).await? {
                Some(info) => {
                    println!("Drive item:  {}", info.drive_item_id);
                    println!("List item:   {}", info.list_item_id.as_deref().unwrap_or("-"));
                    println!("File:        {}", info.file_name.as_deref().unwrap_or("-"));
                    println!("Web URL:     {}", info.web_url.as_deref().unwrap_or("-"));
                    println!("Site:        {} ({})", info.site_title.as_deref().unwrap_or("-"), info.site_id);
                    println!("List:        {}", info.list_id);
                }
                None => println!("Document could not be resolved"),
            }
            log_stats(&resolver);
            Ok(())
        }
        ["meeting", meeting_id, organizer_id] => {
            let resolver = build_resolver(&config)?;
            match resolver.resolve_meeting(meeting_id, organizer_id).await {
                Some(meeting) => {
                    println!("Meeting:     {}", meeting.meeting_id);
                    println!("Subject:     {}", meeting.subject.as_deref().unwrap_or("-"));
                    if let (Some(start), Some(end)) = (meeting.start, meeting.end) {
                        println!("When:        {} -> {}", start.to_rfc3339(), end.to_rfc3339());
                    }
                    println!("Join URL:    {}", meeting.join_url.as_deref().unwrap_or("-"));
                }
                None => println!("Meeting could not be resolved"),
            }
            log_stats(&resolver);
            Ok(())
        }
        ["user", upn] => {
            let resolver = build_resolver(&config)?;
            let id = resolver.resolve_user_id(upn).await?;
            println!("{}", id);
            log_stats(&resolver);
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Unrecognized arguments: {}", args.join(" "));
        }
    }
}

fn print_scan_plan(config: &Config) -> Result<()> {
    let (from, to) = scan_range_ending_at(chrono::Utc::now(), config.scan.lookback_days)?;
    let windows = generate_scan_windows(from, to)?;

    println!("Scan range: {} -> {}", from.to_rfc3339(), to.to_rfc3339());
    println!("{} window(s):", windows.len());
    for window in &windows {
        println!("  {}", window);
    }

    tracing::info!(windows = windows.len(), "Scan plan computed");
    Ok(())
}

fn build_resolver(config: &Config) -> Result<ResourceResolver<GraphClient>> {
    let token = config.graph.require_access_token()?;
    let client = GraphClient::with_timeout(
        &token,
        &config.graph.base_url,
        Duration::from_secs(config.graph.request_timeout_secs),
    )
    .context("Failed to build Graph client")?;

    Ok(ResourceResolver::new(
        Arc::new(client),
        Arc::new(ResolutionContext::new()),
    ))
}

fn log_stats(resolver: &ResourceResolver<GraphClient>) {
    let stats = resolver.context().stats();
    tracing::info!(
        sites = stats.sites,
        site_drives = stats.site_drives,
        user_drives = stats.user_drives,
        list_items = stats.list_items,
        users = stats.users,
        meetings = stats.meetings,
        "Resolution caches"
    );
}
