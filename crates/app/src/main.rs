//! Terminal front end for the Genesis AI chat core.

use std::io::{BufRead, Write as _};
use std::sync::Arc;

use anyhow::Result;

use providers::gemini::GeminiClient;
use shared::chat::Feedback;
use shared::mode::AppMode;
use shared::settings::Theme;

mod controller;
mod sessions;
mod storage;

use controller::ChatController;
use storage::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let store = Arc::new(FileStore::default_location()?);
    let backend = Box::new(GeminiClient::new()?);
    let mut controller = ChatController::new(store, backend);

    println!("Genesis AI. Type /help for commands, /quit to exit.");
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("[{}]> ", controller.mode().label());
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(command) = trimmed.strip_prefix('/') {
            if !run_command(&mut controller, command) {
                break;
            }
            continue;
        }

        controller.input().set(trimmed);
        controller.submit().await;
        print_last_reply(&controller);
    }
    Ok(())
}

/// Returns false when the loop should exit.
fn run_command(controller: &mut ChatController, command: &str) -> bool {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "quit" | "exit" => return false,
        "help" => print_help(),
        "new" => {
            controller.new_session();
            println!("started a new chat");
        }
        "sessions" => {
            for session in controller.sessions().list_recent() {
                let marker = if controller.sessions().current_id().as_deref() == Some(session.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {}  {}", marker, session.id, session.title);
            }
        }
        "select" => {
            if !controller.select_session(arg) {
                println!("no such session: {}", arg);
            }
        }
        "delete" => controller.delete_session(arg),
        "clear" => {
            controller.clear_history();
            controller.new_session();
            println!("history cleared");
        }
        "mode" => match AppMode::from_str(arg) {
            Some(mode) => controller.set_mode(mode),
            None => {
                let names: Vec<&str> = AppMode::all().iter().map(|m| m.as_str()).collect();
                println!("modes: {}", names.join(", "));
            }
        },
        "theme" => match Theme::from_str(arg) {
            Some(theme) => controller.set_theme(theme),
            None => println!("themes: light, dark, system"),
        },
        "attach" => match std::fs::read(arg) {
            Ok(bytes) => {
                controller.attach_file(guess_mime(arg), &bytes);
                println!("attached {} ({} bytes)", arg, bytes.len());
            }
            Err(e) => println!("cannot read {}: {}", arg, e),
        },
        "detach" => match arg.parse::<usize>() {
            Ok(index) => controller.remove_attachment(index),
            Err(_) => println!("usage: /detach <index>"),
        },
        "like" | "dislike" => {
            let feedback = if name == "like" {
                Feedback::Like
            } else {
                Feedback::Dislike
            };
            let target = controller.sessions().current().and_then(|s| {
                s.messages
                    .last()
                    .map(|m| (s.id.clone(), m.id.clone()))
            });
            if let Some((session_id, message_id)) = target {
                controller.toggle_feedback(&session_id, &message_id, feedback);
            }
        }
        other => println!("unknown command: /{}", other),
    }
    true
}

fn print_last_reply(controller: &ChatController) {
    let Some(session) = controller.sessions().current() else {
        return;
    };
    let Some(msg) = session.messages.last() else {
        return;
    };
    println!("{}", msg.text);
    for attachment in &msg.attachments {
        println!("  [{} attachment, {}]", attachment.kind.as_str(), attachment.mime_type);
    }
    if let Some(grounding) = &msg.grounding_metadata {
        for chunk in grounding.search_chunks.iter().chain(&grounding.map_chunks) {
            println!("  source: {} <{}>", chunk.title, chunk.uri);
        }
    }
}

fn guess_mime(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

fn print_help() {
    println!("  /new                start a new chat");
    println!("  /sessions           list chats, newest first");
    println!("  /select <id>        switch chat");
    println!("  /delete <id>        delete a chat");
    println!("  /clear              delete all chats");
    println!("  /mode <name>        set the response mode");
    println!("  /theme <name>       set the display theme");
    println!("  /attach <path>      attach a file to the next message");
    println!("  /detach <index>     remove a pending attachment");
    println!("  /like, /dislike     rate the latest message");
    println!("  /quit               exit");
}
