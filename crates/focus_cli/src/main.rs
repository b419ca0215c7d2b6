mod cli;

use clap::{CommandFactory, Parser};
use cli::{
    Cli, Command, ListView, MentorCommand, SettingsCommand, parse_deadline,
    parse_relative_duration,
};
use focus_core::clock::local_offset;
use focus_core::completion::{CompletionProof, CompletionStep, encode_image_file};
use focus_core::config::{Mentor, Palette, Settings, Theme, palette_for_theme};
use focus_core::error::AppError;
use focus_core::judge::{DeletionRoute, JudgeState};
use focus_core::mentor;
use focus_core::model::{Task, TaskPatch, TaskStatus};
use focus_core::notify::notifier_from_env;
use focus_core::oracle::select_oracle;
use focus_core::sweeper::format_countdown;
use focus_core::task_api::TaskApi;
use focus_core::voice::{TASK_REMOVED, TASK_VERIFIED, VoiceOutcome, speaker_for};
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Time left")]
    time_left: String,
}

#[derive(Tabled)]
struct BinRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deleted")]
    deleted_at: String,
}

#[derive(Tabled)]
struct MentorRow {
    #[tabled(rename = "")]
    active: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Quotes")]
    quotes: usize,
    #[tabled(rename = "Default")]
    is_default: &'static str,
}

fn format_local(instant: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let local = instant.to_offset(local_offset());
    local.format(&format).unwrap_or_else(|_| local.to_string())
}

fn time_left_label(task: &Task, now: OffsetDateTime) -> String {
    match (task.status, task.time_left(now)) {
        (TaskStatus::Pending, Some(left)) => format_countdown(left),
        _ => "-".to_string(),
    }
}

fn task_row(task: &Task, now: OffsetDateTime) -> TaskRow {
    TaskRow {
        id: task.id.clone(),
        title: task.title.clone(),
        status: task.status.label().to_string(),
        deadline: task.deadline.map(format_local).unwrap_or_else(|| "-".to_string()),
        time_left: time_left_label(task, now),
    }
}

fn print_task_table(tasks: &[&Task], now: OffsetDateTime) {
    let rows: Vec<TaskRow> = tasks.iter().map(|task| task_row(task, now)).collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn task_json(task: &Task, now: OffsetDateTime) -> Result<serde_json::Value, AppError> {
    let mut value =
        serde_json::to_value(task).map_err(|err| AppError::invalid_data(err.to_string()))?;
    if let Some(left) = task.time_left(now) {
        value["time_left_seconds"] = serde_json::json!(left.whole_seconds());
    }
    Ok(value)
}

fn print_task_json(task: &Task, now: OffsetDateTime) -> Result<(), AppError> {
    println!("{}", task_json(task, now)?);
    Ok(())
}

fn print_tasks_json(tasks: &[&Task], now: OffsetDateTime) -> Result<(), AppError> {
    let payload = tasks
        .iter()
        .map(|task| task_json(task, now))
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", serde_json::Value::Array(payload));
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn print_no_match(id: &str) {
    println!("No task matches {}; nothing changed.", id.trim());
}

/// Dialog text goes to stderr when stdout carries JSON.
fn dialog(json: bool, text: &str) {
    if json {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
}

fn palette_for(settings: &Settings) -> Palette {
    if io::stdout().is_terminal() {
        palette_for_theme(settings.theme)
    } else {
        palette_for_theme(Theme::Light)
    }
}

fn prompt(question: &str) -> Result<Option<String>, AppError> {
    let mut stderr = io::stderr();
    write!(stderr, "{question}")
        .and_then(|_| stderr.flush())
        .map_err(|err| AppError::io(err.to_string()))?;

    let mut line = String::new();
    let bytes = io::stdin()
        .read_line(&mut line)
        .map_err(|err| AppError::io(err.to_string()))?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn confirm(question: &str) -> Result<bool, AppError> {
    let answer = prompt(&format!("{question} [y/N] "))?;
    Ok(matches!(
        answer.map(|text| text.to_ascii_lowercase()).as_deref(),
        Some("y") | Some("yes")
    ))
}

fn resolve_deadline(
    api: &TaskApi,
    deadline: Option<&str>,
    within: Option<&str>,
) -> Result<Option<OffsetDateTime>, AppError> {
    match (deadline, within) {
        (Some(raw), _) => parse_deadline(raw).map(Some),
        (None, Some(raw)) => api.deadline_in(parse_relative_duration(raw)?).map(Some),
        (None, None) => Ok(None),
    }
}

fn report_expired(tasks: &[Task]) {
    for task in tasks {
        eprintln!("Deadline missed: {} ({}) is now failed", task.title, task.id);
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_completion(
    api: &mut TaskApi,
    id: &str,
    yes: bool,
    proof: Option<String>,
    skip_proof: bool,
    json: bool,
) -> Result<(), AppError> {
    let Some(mut flow) = api.begin_completion(id)? else {
        print_no_match(id);
        return Ok(());
    };

    let honest = yes || confirm(&flow.honesty_prompt())?;
    if flow.answer_honesty(honest)? == CompletionStep::Aborted {
        dialog(json, "Completion cancelled. Only finished work counts.");
        return Ok(());
    }

    let proof = match (proof, skip_proof) {
        (Some(path), _) => Some(CompletionProof::from_image_file(Path::new(&path))?),
        (None, true) => None,
        (None, false) => match prompt("Proof image path (leave blank to skip): ")? {
            Some(path) if !path.is_empty() => {
                Some(CompletionProof::from_image_file(Path::new(&path))?)
            }
            _ => None,
        },
    };

    let Some(task) = api.finish_completion(flow, proof)? else {
        print_no_match(id);
        return Ok(());
    };
    speaker_for(api.settings()).say(TASK_VERIFIED);

    if json {
        print_task_json(&task, api.now())?;
    } else {
        let proof_note = if task.completion_proof.is_some() {
            " with proof"
        } else {
            ""
        };
        println!("Completed task{proof_note}: {} ({})", task.title, task.id);
    }
    Ok(())
}

fn run_judge(
    api: &mut TaskApi,
    id: &str,
    reasons: Vec<String>,
    json: bool,
    palette: &Palette,
) -> Result<(), AppError> {
    let Some(mut session) = api.open_deletion(id)? else {
        print_no_match(id);
        return Ok(());
    };
    let oracle = select_oracle(api.settings());
    let speaker = speaker_for(api.settings());
    let mut turns = Vec::new();
    let mut queued = reasons.into_iter();

    dialog(
        json,
        &palette.accentize(&format!(
            "The judge will hear why \"{}\" should be deleted.",
            session.title()
        )),
    );

    loop {
        let reason = match queued.next() {
            Some(reason) => reason,
            None => match prompt("Your reason (or \"withdraw\"): ")? {
                Some(line) if !line.eq_ignore_ascii_case("withdraw") => line,
                _ => {
                    let task_id = session.task_id().to_string();
                    session.withdraw();
                    dialog(json, "Withdrawn. The task stays.");
                    if json {
                        print_json(&serde_json::json!({
                            "task_id": task_id,
                            "verdict": "withdrawn",
                            "turns": turns,
                        }))?;
                    }
                    return Ok(());
                }
            },
        };

        let state = match session.submit(&reason, oracle.as_ref()) {
            Ok(state) => state,
            Err(err) => {
                eprintln!("ERROR: {err}");
                continue;
            }
        };
        let message = session.message().unwrap_or_default().to_string();
        turns.push(serde_json::json!({
            "reason": reason.trim(),
            "verdict": state.label(),
            "message": message,
        }));

        match state {
            JudgeState::Inquiry => dialog(json, &format!("JUDGE: {message}")),
            JudgeState::Approved => {
                dialog(json, &format!("JUDGE: {}", palette.accentize(&message)));
                std::thread::sleep(api.settings().approval_delay());
                let deleted = api.execute_deletion(session)?;
                speaker.say(TASK_REMOVED);
                if json {
                    print_json(&serde_json::json!({
                        "task_id": id.trim(),
                        "verdict": "approved",
                        "message": message,
                        "turns": turns,
                        "task": deleted,
                    }))?;
                } else if let Some(task) = deleted {
                    println!("Moved to bin: {} ({})", task.title, task.id);
                }
                return Ok(());
            }
            JudgeState::Rejected => {
                dialog(json, &format!("JUDGE: {}", palette.alertize(&message)));
                session.dismiss()?;
                if json {
                    print_json(&serde_json::json!({
                        "task_id": id.trim(),
                        "verdict": "rejected",
                        "message": message,
                        "turns": turns,
                    }))?;
                } else {
                    println!("The task stays.");
                }
                return Ok(());
            }
            JudgeState::Idle | JudgeState::Judging => {}
        }
    }
}

fn run_delete(
    api: &mut TaskApi,
    id: &str,
    reasons: Vec<String>,
    yes: bool,
    json: bool,
    palette: &Palette,
) -> Result<(), AppError> {
    match api.deletion_route(id) {
        None if api.get(id).is_some() => Err(AppError::invalid_input(
            "task is already in the bin; use restore or purge",
        )),
        None => {
            print_no_match(id);
            Ok(())
        }
        Some(DeletionRoute::Judge) => run_judge(api, id, reasons, json, palette),
        Some(DeletionRoute::SimpleConfirm) => {
            let title = api.get(id).map(|task| task.title.clone()).unwrap_or_default();
            let confirmed = yes || confirm(&format!("Move \"{title}\" to the bin?"))?;
            match api.confirm_simple_delete(id, confirmed)? {
                Some(task) => {
                    speaker_for(api.settings()).say(TASK_REMOVED);
                    if json {
                        print_task_json(&task, api.now())?;
                    } else {
                        println!("Moved to bin: {} ({})", task.title, task.id);
                    }
                }
                None => dialog(json, "Deletion cancelled."),
            }
            Ok(())
        }
    }
}

fn run_bin_change(
    api: &TaskApi,
    id: &str,
    changed: Option<Task>,
    verb: &str,
    json: bool,
) -> Result<(), AppError> {
    match changed {
        Some(task) if json => print_task_json(&task, api.now()),
        Some(task) => {
            println!("{verb} task: {} ({})", task.title, task.id);
            Ok(())
        }
        None if api.get(id).is_some() => {
            println!("Task {} is not in the bin; nothing changed.", id.trim());
            Ok(())
        }
        None => {
            print_no_match(id);
            Ok(())
        }
    }
}

fn run_list(api: &TaskApi, view: ListView, json: bool, palette: &Palette) -> Result<(), AppError> {
    let store = api.store();
    let now = api.now();
    let sections: Vec<(&str, Vec<&Task>)> = match view {
        ListView::Pending => vec![("Pending", store.pending())],
        ListView::Completed => vec![("Completed", store.completed())],
        ListView::Failed => vec![("Failed", store.failed())],
        ListView::All => vec![
            ("Pending", store.pending()),
            ("Completed", store.completed()),
            ("Failed", store.failed()),
        ],
    };

    if json {
        let tasks: Vec<&Task> = sections.into_iter().flat_map(|(_, tasks)| tasks).collect();
        return print_tasks_json(&tasks, now);
    }

    for (name, tasks) in sections {
        println!("{}", palette.accentize(&format!("{name} ({})", tasks.len())));
        if tasks.is_empty() {
            println!("{}", palette.mutedize("  nothing here"));
        } else {
            print_task_table(&tasks, now);
        }
    }
    Ok(())
}

fn run_show(api: &TaskApi, id: &str, json: bool) -> Result<(), AppError> {
    let Some(task) = api.get(id) else {
        print_no_match(id);
        return Ok(());
    };
    let now = api.now();
    if json {
        return print_task_json(task, now);
    }

    println!("ID:          {}", task.id);
    println!("Title:       {}", task.title);
    if !task.description.is_empty() {
        println!("Description: {}", task.description);
    }
    println!("Status:      {}", task.status.label());
    println!("Created:     {}", format_local(task.created_at));
    if let Some(deadline) = task.deadline {
        println!("Deadline:    {}", format_local(deadline));
        println!("Time left:   {}", time_left_label(task, now));
    }
    if let Some(proof) = &task.completion_proof {
        println!("Proof:       attached ({} bytes encoded)", proof.len());
    }
    if let Some(deleted_at) = task.deleted_at {
        println!("In bin since {}", format_local(deleted_at));
    }
    Ok(())
}

fn run_watch(api: &mut TaskApi, ticks: Option<u64>, json: bool) -> Result<(), AppError> {
    let notifier = notifier_from_env();
    if !json {
        println!(
            "Watching deadlines every {}s. Press Ctrl-C to stop.",
            api.settings().sweep_interval().as_secs()
        );
    }

    api.watch(
        ticks,
        notifier.as_ref(),
        |store, outcome, now| {
            for failure in &outcome.failures {
                eprintln!("WARNING: notification for {} failed: {}", failure.task_id, failure.error);
            }
            let dated: Vec<&Task> = store
                .pending()
                .into_iter()
                .filter(|task| task.deadline.is_some())
                .collect();

            if json {
                let countdowns: Vec<serde_json::Value> = dated
                    .iter()
                    .map(|task| {
                        serde_json::json!({
                            "id": task.id,
                            "title": task.title,
                            "time_left_seconds": task.time_left(now).map(|left| left.whole_seconds()),
                        })
                    })
                    .collect();
                let expired: Vec<&str> = outcome.tasks.iter().map(|task| task.id.as_str()).collect();
                println!(
                    "{}",
                    serde_json::json!({ "expired": expired, "countdowns": countdowns })
                );
                return;
            }

            for task in &outcome.tasks {
                println!("Deadline missed: {} ({}) is now failed", task.title, task.id);
            }
            for task in dated {
                println!("{}  {}  {}", time_left_label(task, now), task.id, task.title);
            }
        },
        std::thread::sleep,
    )?;
    Ok(())
}

fn run_settings(api: &mut TaskApi, action: SettingsCommand, json: bool) -> Result<(), AppError> {
    match action {
        SettingsCommand::Show => {
            let settings = api.settings();
            if json {
                return print_json(settings);
            }
            let active = mentor::active_mentor(settings)
                .map(|mentor| mentor.name.as_str())
                .unwrap_or("-");
            println!("theme               = {:?}", settings.theme);
            println!("model               = {}", settings.model.label());
            println!("oracle              = {}", settings.oracle.label());
            println!("voice_input         = {}", settings.voice_input);
            println!("voice_response      = {}", settings.voice_response);
            println!("mentor_mode         = {}", settings.mentor_mode.label());
            println!("active_mentor       = {active}");
            println!("sweep_interval_secs = {}", settings.sweep_interval_secs);
            println!("approval_delay_ms   = {}", settings.approval_delay_ms);
            println!("oracle_timeout_secs = {}", settings.oracle_timeout_secs);
        }
        SettingsCommand::Set { assignment } => {
            let settings = api.update_setting(&assignment)?;
            if json {
                return print_json(settings);
            }
            println!("Saved {}", assignment.trim());
        }
    }
    Ok(())
}

fn print_mentor_change(id: &str, changed: Option<Mentor>, verb: &str, json: bool) -> Result<(), AppError> {
    match changed {
        Some(mentor) if json => print_json(&mentor),
        Some(mentor) => {
            println!("{verb} mentor: {} ({})", mentor.name, mentor.id);
            Ok(())
        }
        None => {
            println!("No mentor matches {}; nothing changed.", id.trim());
            Ok(())
        }
    }
}

fn run_mentor(api: &mut TaskApi, action: MentorCommand, json: bool) -> Result<(), AppError> {
    match action {
        MentorCommand::List => {
            let settings = api.settings();
            if json {
                return print_json(&settings.mentors);
            }
            let active_id = mentor::active_mentor(settings).map(|mentor| mentor.id.clone());
            let rows: Vec<MentorRow> = settings
                .mentors
                .iter()
                .map(|mentor| MentorRow {
                    active: if active_id.as_deref() == Some(mentor.id.as_str()) {
                        "*"
                    } else {
                        ""
                    },
                    id: mentor.id.clone(),
                    name: mentor.name.clone(),
                    quotes: mentor.quotes.len(),
                    is_default: if mentor.is_default { "yes" } else { "" },
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::psql());
            println!("{table}");
            Ok(())
        }
        MentorCommand::Add { name, photo } => {
            let photo = photo
                .map(|path| encode_image_file(Path::new(&path)))
                .transpose()?;
            let added = api.update_mentors(|settings| mentor::add_mentor(settings, &name, photo))?;
            print_mentor_change(&added.id, Some(added.clone()), "Added", json)
        }
        MentorCommand::Rename { id, name } => {
            let changed = api.update_mentors(|settings| mentor::rename_mentor(settings, &id, &name))?;
            print_mentor_change(&id, changed, "Renamed", json)
        }
        MentorCommand::Remove { id } => {
            let changed = api.update_mentors(|settings| mentor::remove_mentor(settings, &id))?;
            print_mentor_change(&id, changed, "Removed", json)
        }
        MentorCommand::QuoteAdd { id, quote } => {
            let changed = api.update_mentors(|settings| mentor::add_quote(settings, &id, &quote))?;
            print_mentor_change(&id, changed, "Quote added to", json)
        }
        MentorCommand::QuoteRemove { id, index } => {
            let position = index
                .checked_sub(1)
                .ok_or_else(|| AppError::invalid_input("quote positions start at 1"))?;
            let changed =
                api.update_mentors(|settings| mentor::remove_quote(settings, &id, position))?;
            print_mentor_change(&id, changed, "Quote removed from", json)
        }
        MentorCommand::Use { id } => {
            let changed = api.update_mentors(|settings| Ok(mentor::activate(settings, &id)))?;
            print_mentor_change(&id, changed, "Now following", json)
        }
    }
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    tracing::debug!(command = ?cli.command, "running command");
    let mut api = TaskApi::from_env(&cli.config_override)?;
    if let Some(err) = api.settings_warning() {
        eprintln!("WARNING: settings ignored ({err}); using defaults");
    }
    report_expired(api.expired_on_open());
    let palette = palette_for(api.settings());
    let json = cli.json;

    match cli.command {
        Command::Add {
            title,
            description,
            deadline,
            within,
        } => {
            let deadline = resolve_deadline(&api, deadline.as_deref(), within.as_deref())?;
            let task = api.add_task(&title, description.as_deref().unwrap_or(""), deadline)?;
            if json {
                print_task_json(&task, api.now())?;
            } else {
                println!("Added task: {} ({})", task.title, task.id);
            }
        }
        Command::Edit {
            id,
            title,
            description,
            deadline,
            within,
            clear_deadline,
        } => {
            let deadline = if clear_deadline {
                Some(None)
            } else {
                resolve_deadline(&api, deadline.as_deref(), within.as_deref())?.map(Some)
            };
            let patch = TaskPatch {
                title,
                description,
                deadline,
            };
            if patch.is_empty() {
                return Err(AppError::invalid_input(
                    "nothing to change: pass --title, --description, --deadline, --in or --clear-deadline",
                ));
            }
            match api.edit_task(&id, patch)? {
                Some(task) if json => print_task_json(&task, api.now())?,
                Some(task) => println!("Updated task: {} ({})", task.title, task.id),
                None => print_no_match(&id),
            }
        }
        Command::Done {
            id,
            yes,
            proof,
            skip_proof,
        } => run_completion(&mut api, &id, yes, proof, skip_proof, json)?,
        Command::Delete { id, reasons, yes } => {
            run_delete(&mut api, &id, reasons, yes, json, &palette)?
        }
        Command::Bin => {
            let now = api.now();
            let tasks = api.store().bin();
            if json {
                print_tasks_json(&tasks, now)?;
            } else if tasks.is_empty() {
                println!("The bin is empty.");
            } else {
                let rows: Vec<BinRow> = tasks
                    .iter()
                    .map(|task| BinRow {
                        id: task.id.clone(),
                        title: task.title.clone(),
                        status: task.status.label().to_string(),
                        deleted_at: task.deleted_at.map(format_local).unwrap_or_default(),
                    })
                    .collect();
                let mut table = Table::new(rows);
                table.with(Style::psql());
                println!("{table}");
            }
        }
        Command::Restore { id } => {
            let restored = api.restore(&id)?;
            run_bin_change(&api, &id, restored, "Restored", json)?;
        }
        Command::Purge { id } => {
            let purged = api.purge(&id)?;
            run_bin_change(&api, &id, purged, "Permanently deleted", json)?;
        }
        Command::List { view } => run_list(&api, view, json, &palette)?,
        Command::Show { id } => run_show(&api, &id, json)?,
        Command::Watch { ticks } => run_watch(&mut api, ticks, json)?,
        Command::Voice { transcript } => {
            let oracle = select_oracle(api.settings());
            let outcome = api.add_from_voice(oracle.as_ref(), &transcript.join(" "))?;
            speaker_for(api.settings()).say(&outcome.reply());
            match outcome {
                VoiceOutcome::Added(task) if json => print_task_json(&task, api.now())?,
                VoiceOutcome::Added(task) => {
                    println!("Added task: {} ({})", task.title, task.id);
                    if let Some(deadline) = task.deadline {
                        println!("Deadline: {}", format_local(deadline));
                    }
                }
                VoiceOutcome::NotUnderstood if json => {
                    print_json(&serde_json::json!({ "understood": false, "reply": outcome.reply() }))?
                }
                VoiceOutcome::NotUnderstood => println!("{}", outcome.reply()),
            }
        }
        Command::Quote => {
            let oracle = select_oracle(api.settings());
            let quote = api.quote(oracle.as_ref());
            if json {
                print_json(&serde_json::json!({ "quote": quote }))?;
            } else {
                println!("{}", palette.accentize(&quote));
            }
        }
        Command::Stats => {
            let stats = api.stats();
            if json {
                print_json(&serde_json::json!({
                    "total_created": stats.total_created,
                    "total_completed": stats.total_completed,
                    "total_deleted": stats.total_deleted,
                    "current_streak": stats.current_streak,
                    "last_completion_date": stats.last_completion_date,
                    "completion_rate": stats.completion_rate(),
                }))?;
            } else {
                println!("Created:         {}", stats.total_created);
                println!("Completed:       {}", stats.total_completed);
                println!("Deleted:         {}", stats.total_deleted);
                println!("Completion rate: {}%", stats.completion_rate());
                println!("Current streak:  {} day(s)", stats.current_streak);
            }
        }
        Command::Settings { action } => run_settings(&mut api, action, json)?,
        Command::Mentor { action } => run_mentor(&mut api, action, json)?,
    }

    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let mut input = String::new();

    loop {
        input.clear();
        // Commands prompt on stdin too, so the lock is taken per line.
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("focus".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help and --version
            print!("{err}");
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
