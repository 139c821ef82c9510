use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::InquireError;
use log::warn;
use owo_colors::OwoColorize;
use std::{collections::HashSet, sync::Arc, time::Duration};
use termimad::MadSkin;

use crate::aggregation::{Aggregator, ContentIndex};
use crate::api::{HelpCenterApi, HelpCenterClient};
use crate::auth_flow::{AuthFlow, CODE_LENGTH};
use crate::cli::{Args, Command, InboxAction, TicketAction};
use crate::models::*;
use crate::polling::spawn_poller;
use crate::session::SessionStore;
use crate::settings::{self, RuntimeConfig};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::{dates, inbox, search, text, tickets};

struct App {
    api: Arc<dyn HelpCenterApi>,
    tokens: Arc<dyn KeyValueStore>,
    config: RuntimeConfig,
}

pub async fn run(args: Args) -> Result<()> {
    let config = settings::merge_settings_with_args(&args)?;

    let tokens: Arc<dyn KeyValueStore> = match settings::config_dir() {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => {
            warn!("no config directory found, the sign-in will not be remembered");
            Arc::new(MemoryStore::new())
        }
    };
    let api: Arc<dyn HelpCenterApi> = Arc::new(HelpCenterClient::new(
        &config.base_url,
        &config.workspace_id,
        tokens.clone(),
    )?);
    let app = App {
        api,
        tokens,
        config,
    };

    match args.command {
        Command::Workspace => show_workspace(&app).await,
        Command::Tree => show_tree(&app).await,
        Command::Search { query } => search_articles(&app, &query).await,
        Command::Article { id, toc, plain } => show_article(&app, &id, toc, plain).await,
        Command::Feedback { id, score } => {
            app.api.submit_feedback(&id, score).await?.into_ok()?;
            println!("Thanks for your feedback!");
            Ok(())
        }
        Command::Login { email, name } => login(&app, email, name).await,
        Command::Logout => {
            let mut session = SessionStore::new(app.api.clone(), app.tokens.clone());
            session.logout().await.context("Failed to clear the stored token")?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => whoami(&app).await,
        Command::Inbox { action } => match action {
            None => show_inbox(&app).await,
            Some(InboxAction::Send { message }) => send_message(&app, &message).await,
            Some(InboxAction::Watch) => watch_inbox(&app).await,
        },
        Command::Tickets { search, action } => match action {
            None => list_tickets(&app, search.as_deref()).await,
            Some(TicketAction::Show { id }) => show_ticket(&app, &id).await,
            Some(TicketAction::Create {
                title,
                description,
                priority,
                attachments,
            }) => create_ticket(&app, &title, &description, priority, attachments).await,
            Some(TicketAction::Watch) => watch_tickets(&app, search.as_deref()).await,
        },
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn show_workspace(app: &App) -> Result<()> {
    let workspace = app.api.workspace().await?.into_data()?;

    println!("{}", workspace.display_name().bold());
    if let Some(description) = workspace.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{}", description);
    }
    if let Some(greeting) = workspace.greeting_message.as_deref().filter(|g| !g.is_empty()) {
        println!("\n{}", greeting.italic());
    }
    if let Some(color) = &workspace.color {
        println!("\n{} {}", "color:".dimmed(), color);
    }
    if let Some(logo) = &workspace.logo {
        println!("{} {}", "logo:".dimmed(), logo);
    }

    Ok(())
}

async fn load_index(app: &App) -> Result<ContentIndex> {
    let mut aggregator = Aggregator::new(app.api.clone(), app.config.retry);

    let spinner = spinner("Loading categories and articles...");
    let result = aggregator.refresh().await.cloned();
    spinner.finish_and_clear();

    let index = result.context("Failed to load the category list")?;
    for failure in index.failures() {
        eprintln!("{} {}", "warning:".yellow().bold(), failure);
    }
    Ok(index)
}

async fn show_tree(app: &App) -> Result<()> {
    let index = load_index(app).await?;

    if index.categories().is_empty() {
        println!("No categories yet.");
        return Ok(());
    }

    for category in index.categories() {
        println!(
            "{} {}",
            category.name.bold().bright_cyan(),
            format!("({} articles)", index.articles(&category.id).len()).dimmed()
        );

        let sub_categories = index
            .detail(&category.id)
            .map(|detail| detail.sub_categories.as_slice())
            .unwrap_or_default();

        for sub in sub_categories {
            println!("  {}", sub.name.bold());
            for article in index.sub_category_articles(&category.id, &sub.id) {
                println!("    - {} {}", article.title, article.id.dimmed());
            }
        }

        match index.uncategorized_articles(&category.id) {
            Some(articles) => {
                for article in articles {
                    println!("  - {} {}", article.title, article.id.dimmed());
                }
            }
            None => println!(
                "  {}",
                "(articles outside the sections above are unknown, some fetches failed)".yellow()
            ),
        }
    }

    if !index.is_complete() {
        eprintln!(
            "{}",
            "Some sections could not be loaded, the tree above is incomplete.".yellow()
        );
    }

    Ok(())
}

async fn search_articles(app: &App, query: &str) -> Result<()> {
    let index = load_index(app).await?;
    let groups = search::search(&index, query);

    if groups.is_empty() {
        println!("No articles found.");
        return Ok(());
    }

    for group in groups {
        println!("{}", group.category_name.bold().bright_cyan());
        for entry in group.entries {
            println!("  {} {}", entry.title, entry.id.dimmed());
        }
    }

    Ok(())
}

async fn show_article(app: &App, id: &str, toc: bool, plain: bool) -> Result<()> {
    let article = app
        .api
        .article(id)
        .await
        .and_then(Envelope::into_data)
        .with_context(|| format!("Article {} not found", id))?;

    println!("{}", article.title.bold());

    let mut meta = Vec::new();
    if let Some(category) = &article.category_name {
        meta.push(category.clone());
    }
    if let Some(author) = article.author_name.as_ref().or(article.author_email.as_ref()) {
        meta.push(format!("by {}", author));
    }
    if let Some(updated) = article.updated_at.as_ref().or(article.created_at.as_ref()) {
        if let Ok(date) = dates::format_date(updated, &Local) {
            meta.push(date);
        }
    }
    if !meta.is_empty() {
        println!("{}", meta.join(" · ").dimmed());
    }
    println!();

    if toc {
        let items = text::table_of_contents(&article.content);
        if !items.is_empty() {
            println!("{}", "On this page".bold());
            for item in items {
                let indent = "  ".repeat(item.level.saturating_sub(1) as usize);
                println!("{}- {} {}", indent, item.text, format!("#{}", item.id).dimmed());
            }
            println!();
        }
    }

    if plain {
        println!("{}", text::strip_markdown(&article.content));
    } else {
        MadSkin::default().print_text(&article.content);
    }

    Ok(())
}

async fn login(app: &App, email: Option<String>, name: Option<String>) -> Result<()> {
    let mut session = SessionStore::initialize(app.api.clone(), app.tokens.clone()).await;
    if let Some(user) = session.user() {
        println!("Already signed in as {}.", user.display_name().bold());
        return Ok(());
    }

    let mut flow = AuthFlow::new(app.api.clone(), app.tokens.clone());

    let email = match email {
        Some(email) => email,
        None => inquire::Text::new("Email:")
            .with_placeholder("you@example.com")
            .prompt()
            .context("Failed to read email")?,
    };

    if !flow.submit_email(&email, name.as_deref()).await {
        bail!(
            "{}",
            flow.error().unwrap_or("Failed to send verification code")
        );
    }
    println!("We've sent a verification code to {}.", flow.email().bold());

    loop {
        let answer = inquire::Text::new("Verification code:")
            .with_help_message("type 'resend' to get a new code, Esc to cancel")
            .prompt();

        let code = match answer {
            Ok(code) => code,
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
                flow.close();
                bail!("Sign-in cancelled");
            }
            Err(e) => return Err(e).context("Failed to read verification code"),
        };

        if code.trim().eq_ignore_ascii_case("resend") {
            if flow.resend_code().await {
                println!("A new code is on its way.");
            } else {
                eprintln!("{}", flow.error().unwrap_or("Failed to resend code").red());
            }
            continue;
        }

        match flow.input_code(&code).await {
            Some(true) => break,
            Some(false) => {
                eprintln!("{}", flow.error().unwrap_or("Invalid verification code").red())
            }
            None => eprintln!("The code has {} characters.", CODE_LENGTH),
        }
    }

    session.check_auth().await;
    match session.user() {
        Some(user) => println!("Signed in as {}.", user.display_name().bold()),
        None => bail!("The code was accepted but the session could not be resolved"),
    }
    Ok(())
}

async fn require_session(app: &App) -> Result<SessionStore> {
    let session = SessionStore::initialize(app.api.clone(), app.tokens.clone()).await;
    if !session.is_authenticated() {
        bail!("Not signed in, run `{} login` first", env!("CARGO_PKG_NAME"));
    }
    Ok(session)
}

async fn whoami(app: &App) -> Result<()> {
    let session = require_session(app).await?;
    let Some(user) = session.user() else {
        return Ok(());
    };

    println!("{} ({})", user.display_name().bold(), user.initials());
    if let Some(email) = &user.email {
        println!("{}", email);
    }
    if let Some(avatar) = user.avatar_url() {
        println!("{} {}", "avatar:".dimmed(), avatar);
    }
    Ok(())
}

fn sender_label(message: &Message) -> String {
    match message.message.role {
        Role::Client => "You".to_string(),
        Role::Assistant => "AI assistant".to_string(),
        Role::User => message
            .user
            .as_ref()
            .and_then(|u| u.name.clone().or_else(|| u.email.clone()))
            .unwrap_or_else(|| "Support".to_string()),
    }
}

fn print_messages(messages: &[Message], previous: Option<&Message>) {
    let mut previous = previous;
    for message in messages {
        if inbox::starts_new_day(previous, message, &Local) {
            if let Ok(date) = dates::format_date(&message.message.timestamp, &Local) {
                println!("\n{}", format!("· {} ·", date).dimmed());
            }
        }
        if inbox::shows_sender(previous, message) {
            let label = sender_label(message);
            let label = match message.message.role {
                Role::Client => label.green().bold().to_string(),
                _ => label.bright_cyan().bold().to_string(),
            };
            println!("{}", label);
        }

        let time = dates::format_time(&message.message.timestamp, &Local).unwrap_or_default();
        println!("  {} {}", message.message.content, time.dimmed());
        previous = Some(message);
    }
}

async fn fetch_conversation(api: &dyn HelpCenterApi) -> Result<Conversation> {
    let mut conversation = api.messages().await?.into_data()?;
    inbox::sort_messages(&mut conversation.messages);
    Ok(conversation)
}

async fn show_inbox(app: &App) -> Result<()> {
    require_session(app).await?;
    let (workspace, conversation) = tokio::join!(
        app.api.workspace(),
        fetch_conversation(app.api.as_ref())
    );
    let conversation = conversation?;

    let title = workspace
        .ok()
        .and_then(|w| w.data)
        .map(|w| w.navigation_label("messages_page", "Messages").to_string())
        .unwrap_or_else(|| "Messages".to_string());
    println!("{}", title.bold());

    if conversation.messages.is_empty() {
        println!("No messages yet. Send one with `inbox send`.");
        return Ok(());
    }

    print_messages(&conversation.messages, None);
    if inbox::awaiting_response(&conversation.messages, conversation.thread.as_ref()) {
        println!("{}", "  … waiting for a reply".dimmed());
    }
    Ok(())
}

async fn send_message(app: &App, message: &str) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        bail!("Cannot send an empty message");
    }
    require_session(app).await?;

    app.api
        .send_message(&OutgoingMessage::text(message))
        .await?
        .into_ok()
        .context("Failed to send message")?;

    show_inbox(app).await
}

async fn watch_inbox(app: &App) -> Result<()> {
    require_session(app).await?;

    let api = app.api.clone();
    let (_handle, mut updates) = spawn_poller(app.config.messages_poll, move || {
        let api = api.clone();
        async move {
            let mut conversation = api.messages().await?.into_data()?;
            inbox::sort_messages(&mut conversation.messages);
            Ok(conversation)
        }
    });

    let mut printed: HashSet<String> = HashSet::new();
    let mut last: Option<Message> = None;
    let mut waiting_shown = false;

    println!("{}", "Watching for new messages, Ctrl-C to stop.".dimmed());
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        let state = updates.borrow_and_update().clone();
        match state {
            Some(Ok(conversation)) => {
                let fresh: Vec<Message> = conversation
                    .messages
                    .iter()
                    .filter(|m| !printed.contains(&m.id))
                    .cloned()
                    .collect();
                print_messages(&fresh, last.as_ref());
                printed.extend(fresh.iter().map(|m| m.id.clone()));
                if let Some(message) = fresh.last() {
                    last = Some(message.clone());
                    waiting_shown = false;
                }

                let waiting =
                    inbox::awaiting_response(&conversation.messages, conversation.thread.as_ref());
                if waiting && !waiting_shown {
                    println!("{}", "  … waiting for a reply".dimmed());
                }
                waiting_shown = waiting;
            }
            Some(Err(e)) => eprintln!("{} {}", "warning:".yellow().bold(), e),
            None => {}
        }
    }

    Ok(())
}

fn print_ticket_table(tickets: &[&Ticket], heading: &str) {
    if tickets.is_empty() {
        return;
    }

    println!("{}", heading.bold());
    let mut table = Table::new();
    table.set_header(vec!["id", "issue", "status", "priority", "updated"]);

    let now = Utc::now();
    for ticket in tickets {
        let updated = ticket
            .updated_at
            .as_ref()
            .or(ticket.created_at.as_ref())
            .and_then(|ts| dates::format_relative(ts, now).ok())
            .unwrap_or_default();
        table.add_row(vec![
            ticket.id.clone(),
            ticket.title.clone(),
            ticket.status.clone(),
            ticket.priority.clone().unwrap_or_default(),
            updated,
        ]);
    }

    println!("{table}");
}

fn print_tickets(all: &[Ticket], search: Option<&str>) {
    let filtered: Vec<Ticket> = tickets::filter_tickets(all, search.unwrap_or_default())
        .into_iter()
        .cloned()
        .collect();

    if filtered.is_empty() {
        println!("No tickets found.");
        return;
    }

    let (open, closed) = tickets::partition_tickets(&filtered);
    print_ticket_table(&open, "Open");
    print_ticket_table(&closed, "Closed");
}

async fn list_tickets(app: &App, search: Option<&str>) -> Result<()> {
    require_session(app).await?;

    let (workspace, tickets) = tokio::join!(app.api.workspace(), app.api.tickets(search));
    let tickets = tickets?.into_data()?;

    if let Some(workspace) = workspace.ok().and_then(|w| w.data) {
        println!("{}", workspace.navigation_label("tickets_page", "Tickets").bold());
        println!(
            "{}\n",
            workspace
                .navigation_label("tickets_description", "View and manage your support tickets")
                .dimmed()
        );
    }

    print_tickets(&tickets, search);
    Ok(())
}

async fn show_ticket(app: &App, id: &str) -> Result<()> {
    require_session(app).await?;

    let ticket = app
        .api
        .ticket(id)
        .await
        .and_then(Envelope::into_data)
        .with_context(|| format!("Ticket {} not found", id))?;

    println!("{}", ticket.title.bold());
    let status = if tickets::is_open(&ticket.status) {
        ticket.status.green().to_string()
    } else {
        ticket.status.dimmed().to_string()
    };
    println!("{} {}", "status:".dimmed(), status);
    if let Some(priority) = &ticket.priority {
        println!("{} {}", "priority:".dimmed(), priority);
    }
    if let Some(created) = &ticket.created_at {
        if let (Ok(date), Ok(time)) = (
            dates::format_date(created, &Local),
            dates::format_time(created, &Local),
        ) {
            println!("{} {} {}", "opened:".dimmed(), date, time);
        }
    }
    if let Some(description) = ticket.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        MadSkin::default().print_text(description);
    }
    if !ticket.attachments.is_empty() {
        println!("{} {}", "attachments:".dimmed(), ticket.attachments.len());
    }

    Ok(())
}

async fn create_ticket(
    app: &App,
    title: &str,
    description: &str,
    priority: Priority,
    attachments: Vec<String>,
) -> Result<()> {
    let ticket = tickets::prepare_ticket(title, description, Some(priority), attachments)?;
    require_session(app).await?;

    app.api
        .create_ticket(&ticket)
        .await?
        .into_ok()
        .context("Failed to create ticket")?;

    println!("Ticket \"{}\" created.", ticket.title.bold());
    Ok(())
}

async fn watch_tickets(app: &App, search: Option<&str>) -> Result<()> {
    require_session(app).await?;

    let api = app.api.clone();
    let query = search.map(str::to_string);
    let (_handle, mut updates) = spawn_poller(app.config.tickets_poll, move || {
        let api = api.clone();
        let query = query.clone();
        async move { api.tickets(query.as_deref()).await?.into_data() }
    });

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        let state = updates.borrow_and_update().clone();
        match state {
            Some(Ok(tickets)) => {
                println!(
                    "\n{}",
                    format!("updated {}", Local::now().format("%H:%M:%S")).dimmed()
                );
                print_tickets(&tickets, search);
            }
            Some(Err(e)) => eprintln!("{} {}", "warning:".yellow().bold(), e),
            None => {}
        }
    }

    Ok(())
}
