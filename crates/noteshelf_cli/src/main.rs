//! Command-line driver for `noteshelf_core`.
//!
//! # Responsibility
//! - Exercise the store and screen flows without a UI.
//! - Keep output line-oriented and stable for scripting.
//!
//! Usage: `noteshelf <list|show|add|edit|delete|version> [args]`; the database
//! path and logging come from `NOTESHELF_*` environment variables.

use log::error;
use noteshelf_core::{
    init_logging_from_config, CoreConfig, EditScreen, HomeScreen, Note, NoteDraft, NoteId,
    NoteStore, ResultSlot, SaveOutcome, ScreenUpdate,
};
use std::process::ExitCode;

const USAGE: &str = "usage: noteshelf list
       noteshelf show <id>
       noteshelf add <content> [title]
       noteshelf edit <id> <content> [title]
       noteshelf delete <id>
       noteshelf version";

#[tokio::main]
async fn main() -> ExitCode {
    let config = CoreConfig::from_env();
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match run(&config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={}", message);
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &CoreConfig, args: &[String]) -> Result<(), String> {
    let Some(command) = args.first() else {
        return Err(USAGE.to_string());
    };
    if command == "version" {
        println!("noteshelf_core version={}", noteshelf_core::core_version());
        return Ok(());
    }

    let store = NoteStore::open(&config.db_path).map_err(|err| err.to_string())?;
    let outcome = match command.as_str() {
        "list" => list(&store).await,
        "show" => show(&store, parse_id(arg(args, 1, "id")?)?),
        "add" => {
            let content = arg(args, 1, "content")?;
            save(&store, NoteDraft::new(optional(args, 2), content)).await
        }
        "edit" => {
            let id = parse_id(arg(args, 1, "id")?)?;
            let mut draft = NoteDraft::new(optional(args, 3), arg(args, 2, "content")?);
            draft.id = id;
            save(&store, draft).await
        }
        "delete" => delete(&store, parse_id(arg(args, 1, "id")?)?).await,
        other => Err(format!("unknown command `{other}`\n{USAGE}")),
    };
    store.close().map_err(|err| err.to_string())?;
    outcome
}

/// Opens a home screen and waits for its first load to land.
async fn loaded_home(store: &NoteStore) -> Result<HomeScreen, String> {
    let mut home = HomeScreen::new(store.clone(), ResultSlot::new());
    home.request_load();
    match home.process_next().await {
        Some(ScreenUpdate::Message(message)) => Err(format!("{message:?}")),
        Some(_) => Ok(home),
        None => Err("list screen closed before loading".to_string()),
    }
}

async fn list(store: &NoteStore) -> Result<(), String> {
    let home = loaded_home(store).await?;
    for note in home.controller().notes() {
        print_note(note);
    }
    home.close();
    Ok(())
}

fn show(store: &NoteStore, id: NoteId) -> Result<(), String> {
    let note = store.require_note(id).map_err(|err| err.to_string())?;
    print_note(&note);
    Ok(())
}

async fn save(store: &NoteStore, draft: NoteDraft) -> Result<(), String> {
    let edit = EditScreen::new(store.clone(), ResultSlot::new());
    match edit.save(draft).await.map_err(|err| err.to_string())? {
        SaveOutcome::Added(id) => println!("added {id}"),
        SaveOutcome::Updated(id) => println!("updated {id}"),
        SaveOutcome::NotFound(id) => return Err(format!("cannot update: note {id} not found")),
    }
    Ok(())
}

async fn delete(store: &NoteStore, id: NoteId) -> Result<(), String> {
    let mut home = loaded_home(store).await?;
    let Some(index) = home.controller().index_of(id) else {
        return Err(format!("note {id} not found"));
    };
    home.delete_icon_tap(id, index);
    let outcome = match home.process_next().await {
        Some(ScreenUpdate::Instructions(_)) => {
            println!("deleted {id}");
            Ok(())
        }
        _ => Err(format!("failed to delete note {id}")),
    };
    home.close();
    outcome
}

fn print_note(note: &Note) {
    println!(
        "{}\t{}\t{}\t{}",
        note.id,
        note.created_at,
        note.title.as_deref().unwrap_or("-"),
        note.content.replace('\n', " ")
    );
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing <{name}>\n{USAGE}"))
}

fn optional(args: &[String], index: usize) -> String {
    args.get(index).cloned().unwrap_or_default()
}

fn parse_id(value: &str) -> Result<NoteId, String> {
    value
        .parse::<NoteId>()
        .map_err(|_| format!("invalid note id `{value}`"))
}
