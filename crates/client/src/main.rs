mod api;

use api::{Api, ApiVoteStore};
use axum::{Router, extract::Query, response::Html, routing::get};
use chrono::{DateTime, Utc};
use colored::*;
use pollboard_core::{
    NewPoll, PollWithOptions, SubmitHooks, calculate_vote_stats, handle_submit_vote,
    is_valid_email, validate_new_poll, validate_poll_status,
};
use serde::Deserialize;
use std::env;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const CALLBACK_PORT: u16 = 8080;

#[derive(Debug, Deserialize)]
struct CallbackParams {
    access_token: Option<String>,
    error: Option<String>,
}

// ===== Session =====

enum Session {
    Authenticated { user_id: String },
    Anonymous { name: String, email: String },
}

// ===== Main =====

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let backend_url =
        env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    println!("{}", "=".repeat(60).bright_cyan());
    println!("{}", "    📊 POLLBOARD 📊".bright_yellow().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!();
    println!("[1] Sign in with Discord   [2] Vote anonymously");
    let choice = prompt("> ")?;

    let (api, session) = if choice.trim() == "1" {
        let supabase_url = env::var("SUPABASE_URL").expect("SUPABASE_URL must be set");
        let token = match authenticate(supabase_url).await {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{} {}", "❌ Authentication failed:".red().bold(), e);
                return Ok(());
            }
        };
        let api = Api::new(backend_url, Some(token));
        let user_id = api.me().await?;
        println!("{}", "✅ Authentication successful!".green().bold());
        println!("{} {}", "Signed in as".bright_black(), user_id.bright_white());
        (api, Session::Authenticated { user_id })
    } else {
        let (name, email) = prompt_identity()?;
        (Api::new(backend_url, None), Session::Anonymous { name, email })
    };
    println!();

    browse_loop(&api, &session).await?;

    Ok(())
}

// ===== Authentication =====

async fn authenticate(supabase_url: String) -> anyhow::Result<String> {
    println!("Starting authentication...");
    println!();

    // Token storage shared between server and main thread
    let token_store: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let token_store_clone = token_store.clone();

    // Build OAuth callback server
    let app = Router::new().route(
        "/callback",
        get(move |query: Query<CallbackParams>| callback_handler(query, token_store_clone.clone())),
    );

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", CALLBACK_PORT)).await?;
    println!(
        "{}",
        format!("🔓 Local callback server started on port {}", CALLBACK_PORT).cyan()
    );

    let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    let auth_url = format!(
        "{}/auth/v1/authorize?provider=discord&redirect_to=http://localhost:{}/callback",
        supabase_url, CALLBACK_PORT
    );

    println!();
    println!("{}", "Opening browser for Discord login...".yellow());
    println!();

    if let Err(e) = webbrowser::open(&auth_url) {
        eprintln!(
            "{} {}",
            "⚠️  Could not open browser automatically:".yellow(),
            e
        );
        println!();
        println!("{}", "Please open this URL manually:".bright_white().bold());
        println!("{}", auth_url.bright_blue().underline());
        println!();
    }

    // Wait for token (with timeout)
    let timeout = tokio::time::Duration::from_secs(120);
    let start = tokio::time::Instant::now();

    loop {
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

        if let Some(token) = token_store.lock().unwrap().clone() {
            server_handle.abort();
            return Ok(token);
        }

        if start.elapsed() > timeout {
            server_handle.abort();
            anyhow::bail!("Authentication timeout (2 minutes)");
        }
    }
}

async fn callback_handler(
    Query(params): Query<CallbackParams>,
    token_store: Arc<Mutex<Option<String>>>,
) -> Html<String> {
    let s = token_store.lock();
    let Ok(mut store) = s else {
        return Html("failed".to_string());
    };
    *store = params.access_token;

    if let Some(error) = params.error {
        return Html(format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head><title>Sign-in failed</title></head>
            <body style="font-family: sans-serif; text-align: center; padding-top: 4rem;">
                <h1 style="color: #c0392b;">Sign-in failed</h1>
                <p>{}</p>
                <p>You can close this tab and try again from the terminal.</p>
            </body>
            </html>
            "#,
            error
        ));
    }

    // The access token arrives in the URL hash fragment, which never reaches
    // the server; this page relays it back as a query parameter.
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Signed in</title></head>
        <body style="font-family: sans-serif; text-align: center; padding-top: 4rem;">
            <h1 style="color: #27ae60;">Signed in</h1>
            <p>Handing the session back to the terminal&hellip; you can close this tab.</p>
            <script>
                const params = new URLSearchParams(window.location.hash.substring(1));
                const token = params.get('access_token');
                if (token) {
                    fetch('/callback?access_token=' + encodeURIComponent(token))
                        .then(() => setTimeout(() => window.close(), 1000));
                } else {
                    document.querySelector('h1').textContent = 'No token found';
                }
            </script>
        </body>
        </html>
        "#
        .to_string(),
    )
}

fn prompt_identity() -> anyhow::Result<(String, String)> {
    println!();
    println!(
        "{}",
        "Anonymous voting needs a name and an email address.".bright_black()
    );
    let name = loop {
        let name = prompt("Name > ")?;
        if !name.trim().is_empty() {
            break name.trim().to_string();
        }
        println!("{}", "Name cannot be empty.".red());
    };
    let email = loop {
        let email = prompt("Email > ")?;
        if is_valid_email(email.trim()) {
            break email.trim().to_string();
        }
        println!("{}", "That doesn't look like an email address.".red());
    };
    Ok((name, email))
}

// ===== Browse Loop =====

async fn browse_loop(api: &Api, session: &Session) -> anyhow::Result<()> {
    let mut page = 1i64;
    let mut search = String::new();

    loop {
        let polls = api.list_polls(&search, page).await?;

        println!("{}", "━".repeat(60).bright_black());
        if search.is_empty() {
            println!(
                "{} {} polls · page {}/{}",
                "POLLS".bright_yellow().bold(),
                polls.count.to_string().bright_cyan(),
                polls.page,
                polls.total_pages.max(1)
            );
        } else {
            println!(
                "{} {} matches for \"{}\" · page {}/{}",
                "POLLS".bright_yellow().bold(),
                polls.count.to_string().bright_cyan(),
                search.bright_white(),
                polls.page,
                polls.total_pages.max(1)
            );
        }
        println!();

        for (i, poll) in polls.data.iter().enumerate() {
            let status = validate_poll_status(poll, Utc::now());
            let badge = if status.is_active {
                "Active".green()
            } else {
                "Closed".red()
            };
            println!(
                "{}. {} [{}] {}",
                (i + 1).to_string().bright_cyan(),
                poll.title.bright_white().bold(),
                badge,
                time_ago(poll.created_at).bright_black()
            );
        }
        if polls.data.is_empty() {
            println!("{}", "No polls found.".bright_black());
        }

        println!();
        println!(
            "{}",
            "Open: poll number · [N]ext [P]rev [S]earch [C]reate [T]otals [Q]uit".bright_black()
        );
        let input = prompt("> ")?;
        let choice = input.trim().to_lowercase();

        match choice.as_str() {
            "q" | "quit" => {
                println!();
                println!("{}", "Thanks for voting! 👋".bright_cyan().bold());
                return Ok(());
            }
            "n" | "next" => {
                if page < polls.total_pages {
                    page += 1;
                }
            }
            "p" | "prev" => {
                if page > 1 {
                    page -= 1;
                }
            }
            "s" | "search" => {
                search = prompt("Search (empty to clear) > ")?.trim().to_string();
                page = 1;
            }
            "c" | "create" => {
                create_poll_flow(api, session).await?;
            }
            "t" | "totals" => {
                show_board_stats(api).await?;
            }
            _ => match choice.parse::<usize>() {
                Ok(n) if n >= 1 && n <= polls.data.len() => {
                    view_poll(api, session, polls.data[n - 1].id).await?;
                }
                _ => {
                    println!("{}", "Invalid choice. Please try again.".red());
                }
            },
        }
    }
}

// ===== Poll View & Voting =====

/// Terminal-backed submission hooks: errors in red, success in green, and a
/// refresh flag the view loop answers by re-fetching the poll.
#[derive(Default)]
struct VoteFormState {
    needs_refresh: bool,
}

impl SubmitHooks for VoteFormState {
    fn set_error(&mut self, message: &str) {
        if !message.is_empty() {
            println!("{} {}", "✗".red().bold(), message.red());
        }
    }

    fn set_success(&mut self, success: bool) {
        if success {
            println!("{}", "✓ Vote submitted!".green().bold());
        }
    }

    fn set_submitting(&mut self, submitting: bool) {
        if submitting {
            println!("{}", "Submitting votes...".bright_black());
        }
    }

    fn refresh(&mut self) {
        self.needs_refresh = true;
    }
}

async fn view_poll(api: &Api, session: &Session, poll_id: Uuid) -> anyhow::Result<()> {
    'refresh: loop {
        let detail = api.get_poll(poll_id).await?;
        render_poll(&detail);

        let status = validate_poll_status(&detail.poll, Utc::now());
        let own_poll = matches!(
            session,
            Session::Authenticated { user_id } if *user_id == detail.poll.created_by
        );

        loop {
            let mut actions = String::from("[B]ack");
            if status.is_active {
                actions = format!("Vote: option number(s), e.g. 1 or 1,3 · {actions}");
            }
            if own_poll {
                actions.push_str(" [D]elete");
            }
            println!("{}", actions.bright_black());

            let input = prompt("> ")?;
            let choice = input.trim().to_lowercase();

            match choice.as_str() {
                "b" | "back" | "" => return Ok(()),
                "d" | "delete" if own_poll => {
                    let confirm = prompt("Delete this poll and all its votes? [y/N] > ")?;
                    if confirm.trim().to_lowercase().starts_with('y') {
                        api.delete_poll(poll_id).await?;
                        println!("{}", "✓ Poll deleted".yellow());
                        return Ok(());
                    }
                }
                _ if status.is_active => {
                    let Some(selection) = parse_selection(&choice, &detail) else {
                        println!("{}", "Invalid choice. Please try again.".red());
                        continue;
                    };
                    if !detail.poll.allow_multiple_votes && selection.len() > 1 {
                        println!("{}", "This poll allows a single choice.".red());
                        continue;
                    }

                    let (user_id, voter_email, voter_name) = match session {
                        Session::Authenticated { user_id } => (Some(user_id.as_str()), "", ""),
                        Session::Anonymous { name, email } => {
                            (None, email.as_str(), name.as_str())
                        }
                    };

                    let store = ApiVoteStore { api };
                    let mut form = VoteFormState::default();
                    handle_submit_vote(
                        &store,
                        &mut form,
                        &selection,
                        poll_id,
                        user_id,
                        voter_email,
                        voter_name,
                    )
                    .await;

                    if form.needs_refresh {
                        // Re-fetch so the freshly cast votes show up.
                        continue 'refresh;
                    }
                    // Failed; keep the current results on screen and prompt again.
                }
                _ => {
                    println!("{}", "Invalid choice. Please try again.".red());
                }
            }
        }
    }
}

fn parse_selection(input: &str, detail: &PollWithOptions) -> Option<Vec<Uuid>> {
    let mut selection = Vec::new();
    for part in input.split(',') {
        let n: usize = part.trim().parse().ok()?;
        if n < 1 || n > detail.options.len() {
            return None;
        }
        let id = detail.options[n - 1].id;
        if !selection.contains(&id) {
            selection.push(id);
        }
    }
    Some(selection)
}

fn render_poll(detail: &PollWithOptions) {
    let stats = calculate_vote_stats(&detail.options);
    let status = validate_poll_status(&detail.poll, Utc::now());

    println!("{}", "━".repeat(60).bright_black());
    println!();
    println!("{}", detail.poll.title.bright_white().bold());
    if let Some(description) = &detail.poll.description {
        println!("{}", description.bright_black());
    }

    let badge = if status.is_active {
        "ACTIVE".green().bold()
    } else if status.is_expired {
        "EXPIRED".yellow().bold()
    } else {
        "CLOSED".red().bold()
    };
    println!(
        "[{}] {} votes · created {}",
        badge,
        stats.total_votes.to_string().bright_cyan(),
        time_ago(detail.poll.created_at)
    );
    if detail.poll.allow_multiple_votes {
        println!("{}", "Multiple choices allowed".bright_black());
    }
    println!();

    for (i, option) in stats.options.iter().enumerate() {
        let bar = "█".repeat((option.percentage / 5) as usize);
        println!(
            "{}. {}",
            (i + 1).to_string().bright_cyan(),
            option.option.text.bright_white()
        );
        println!(
            "   {} {}% ({})",
            bar.bright_blue(),
            option.percentage,
            option.option.vote_count
        );
    }
    println!();
}

// ===== Poll Creation =====

async fn create_poll_flow(api: &Api, session: &Session) -> anyhow::Result<()> {
    if matches!(session, Session::Anonymous { .. }) {
        println!("{}", "Sign in to create polls.".red());
        return Ok(());
    }

    println!();
    println!("{}", "NEW POLL".bright_yellow().bold());
    let title = prompt("Title > ")?.trim().to_string();
    let description = prompt("Description (optional) > ")?.trim().to_string();

    let mut options = Vec::new();
    println!("{}", "Options (empty line to finish):".bright_black());
    loop {
        let option = prompt(&format!("Option {} > ", options.len() + 1))?;
        if option.trim().is_empty() {
            break;
        }
        options.push(option.trim().to_string());
    }

    let multiple = prompt("Allow multiple choices? [y/N] > ")?
        .trim()
        .to_lowercase()
        .starts_with('y');
    let public = !prompt("Make it private? [y/N] > ")?
        .trim()
        .to_lowercase()
        .starts_with('y');
    let expires_at = match prompt("Open for how many days? (empty = no deadline) > ")?
        .trim()
        .parse::<i64>()
    {
        Ok(days) if days > 0 => Some(Utc::now() + chrono::Duration::days(days)),
        _ => None,
    };

    let draft = NewPoll {
        title,
        description: if description.is_empty() {
            None
        } else {
            Some(description)
        },
        options,
        expires_at,
        allow_multiple_votes: multiple,
        is_public: public,
    };

    if let Err(errors) = validate_new_poll(&draft, Utc::now()) {
        for error in &errors.errors {
            println!("{} {}", "✗".red().bold(), error.red());
        }
        return Ok(());
    }

    let poll = api.create_poll(&draft).await?;
    println!("{} {}", "✓ Poll created:".green().bold(), poll.title);
    Ok(())
}

// ===== Board Stats =====

async fn show_board_stats(api: &Api) -> anyhow::Result<()> {
    let stats = api.board_stats().await?;

    println!();
    println!("{}", "=".repeat(60).bright_cyan());
    println!("{}", "    📊 BOARD TOTALS".bright_yellow().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!(
        "{} polls · {} active · {} votes cast",
        stats.total_polls.to_string().bright_white().bold(),
        stats.active_polls.to_string().green(),
        stats.total_votes.to_string().yellow()
    );
    println!();
    Ok(())
}

// ===== Helpers =====

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label.bright_green().bold());
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

fn time_ago(at: DateTime<Utc>) -> String {
    let delta = Utc::now() - at;
    if delta.num_days() > 0 {
        format!("{}d ago", delta.num_days())
    } else if delta.num_hours() > 0 {
        format!("{}h ago", delta.num_hours())
    } else if delta.num_minutes() > 0 {
        format!("{}m ago", delta.num_minutes())
    } else {
        "just now".to_string()
    }
}
