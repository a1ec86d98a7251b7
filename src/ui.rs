// UI layer: an interactive menu built on `dialoguer` that drives the CMS
// client. Each action prompts for its inputs, runs one request behind a
// spinner and prints the outcome; failures never end the loop.

use crate::api::{CmsClient, JsonResponse};
use crate::scheduler::SchedulerPlugin;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

const MENU: &[&str] = &[
    "Create entry",
    "Update entry",
    "Upload media asset",
    "Create media folder",
    "Move media",
    "Schedule publish",
    "Schedule unpublish",
    "Exit",
];

/// Main interactive menu. Runs until the user picks "Exit".
pub async fn main_menu(mut api: CmsClient) -> Result<()> {
    loop {
        let selection = Select::new().items(MENU).default(0).interact()?;
        let outcome = match selection {
            0 => handle_create_entry(&api).await,
            1 => handle_update_entry(&api).await,
            2 => handle_upload(&api).await,
            3 => handle_create_folder(&api).await,
            4 => handle_move_media(&api).await,
            5 => handle_schedule(&mut api, true).await,
            6 => handle_schedule(&mut api, false).await,
            _ => break,
        };
        if let Err(e) = outcome {
            println!("Failed: {:#}", e);
        }
    }
    Ok(())
}

/// Run `fut` while a spinner shows `message`.
async fn with_spinner<T, F>(message: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = fut.await;
    spinner.finish_and_clear();
    result
}

/// Prompt for a JSON object describing entry fields.
fn prompt_fields(prompt: &str) -> Result<Value> {
    let raw: String = Input::new().with_prompt(prompt).interact_text()?;
    let value: Value = serde_json::from_str(&raw).context("Fields must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Fields must be a JSON object, e.g. {{\"title\": \"Hello\"}}");
    }
    Ok(value)
}

fn prompt_optional(prompt: &str) -> Result<Option<String>> {
    let raw: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(Some(raw).filter(|s| !s.trim().is_empty()))
}

fn prompt_ids(prompt: &str) -> Result<Vec<i64>> {
    let raw: String = Input::new().with_prompt(prompt).interact_text()?;
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().with_context(|| format!("`{}` is not a numeric id", s)))
        .collect()
}

fn print_entry_result(resp: &JsonResponse) {
    match (&resp.error, resp.entry_id()) {
        (Some(err), _) => println!(
            "CMS rejected the entry ({}): {}",
            err.status,
            err.message.as_deref().unwrap_or("no message")
        ),
        (None, Some(id)) => println!("Saved entry {}", id),
        (None, None) => println!("CMS returned no entry data"),
    }
}

async fn handle_create_entry(api: &CmsClient) -> Result<()> {
    let api_id: String = Input::new()
        .with_prompt("Collection API id (e.g. articles)")
        .interact_text()?;
    let fields = prompt_fields("Entry fields as JSON")?;
    let resp = with_spinner("Creating entry...", api.create_entry(&api_id, &fields)).await?;
    print_entry_result(&resp);
    Ok(())
}

async fn handle_update_entry(api: &CmsClient) -> Result<()> {
    let api_id: String = Input::new()
        .with_prompt("Collection API id (e.g. articles)")
        .interact_text()?;
    let id: String = Input::new().with_prompt("Entry id").interact_text()?;
    let fields = prompt_fields("Fields to change as JSON")?;
    let resp = with_spinner("Updating entry...", api.update_entry(&api_id, &id, &fields)).await?;
    print_entry_result(&resp);
    Ok(())
}

async fn handle_upload(api: &CmsClient) -> Result<()> {
    let source: String = Input::new()
        .with_prompt("File path or http(s) URL")
        .interact_text()?;
    let alt = prompt_optional("Alternative text (optional)")?;
    let caption = prompt_optional("Caption (optional)")?;
    let files = with_spinner(
        "Uploading...",
        api.add_media_asset(&source, alt.as_deref(), caption.as_deref()),
    )
    .await?;
    for f in &files {
        println!("Uploaded {} as media id {} ({})", f.file.name, f.id, f.file.url);
    }
    if !files.is_empty() && api.has_admin_token() {
        let move_now = Confirm::new()
            .with_prompt("Move the upload into a folder?")
            .default(false)
            .interact()?;
        if move_now {
            let folder_id: i64 = Input::new().with_prompt("Folder id").interact_text()?;
            let ids: Vec<i64> = files.iter().map(|f| f.id).collect();
            let reply = with_spinner("Moving...", api.move_media(folder_id, &ids)).await?;
            println!("Move finished with status {}", reply.status);
        }
    }
    Ok(())
}

async fn handle_create_folder(api: &CmsClient) -> Result<()> {
    let name: String = Input::new().with_prompt("Folder name").interact_text()?;
    let parent = prompt_optional("Parent folder id (optional)")?
        .map(|p| p.trim().parse::<i64>().context("Parent id must be numeric"))
        .transpose()?;
    let folder = with_spinner("Creating folder...", api.create_media_folder(&name, parent)).await?;
    println!("Created folder {}", folder.data.id);
    Ok(())
}

async fn handle_move_media(api: &CmsClient) -> Result<()> {
    let folder_id: i64 = Input::new()
        .with_prompt("Destination folder id")
        .interact_text()?;
    let ids = prompt_ids("Media ids, comma separated")?;
    let reply = with_spinner("Moving...", api.move_media(folder_id, &ids)).await?;
    println!("Move finished with status {}: {}", reply.status, reply.body);
    Ok(())
}

/// Schedule a publish or unpublish. Asks for the plugin the first time
/// if none was configured from the environment.
async fn handle_schedule(api: &mut CmsClient, publish: bool) -> Result<()> {
    if api.scheduler().is_none() {
        let plugins = [SchedulerPlugin::Scheduler, SchedulerPlugin::Publisher];
        let names: Vec<String> = plugins.iter().map(|p| p.to_string()).collect();
        let idx = Select::new()
            .with_prompt("Which scheduler plugin is installed?")
            .items(&names)
            .default(0)
            .interact()?;
        api.configure_scheduler(plugins[idx]);
    }

    let content_type: String = Input::new()
        .with_prompt("Content type (e.g. article)")
        .interact_text()?;
    let id: i64 = Input::new().with_prompt("Entry id").interact_text()?;
    let raw_date: String = Input::new()
        .with_prompt("Date (RFC 3339, e.g. 2030-01-01T08:00:00Z)")
        .interact_text()?;
    let date = DateTime::parse_from_rfc3339(raw_date.trim())
        .context("Date must be in RFC 3339 format")?
        .with_timezone(&Utc);

    let reply = if publish {
        with_spinner("Scheduling publish...", api.add_publish_date(&content_type, id, date)).await?
    } else {
        with_spinner(
            "Scheduling unpublish...",
            api.add_unpublish_date(&content_type, id, date),
        )
        .await?
    };
    println!("Scheduler replied with status {}", reply.status);
    Ok(())
}

