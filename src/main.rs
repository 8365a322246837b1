use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use titan_fit::analysis::{OneRmFormula, exercise_progress};
use titan_fit::coach::HttpCoach;
use titan_fit::library::{self, GroupBy};
use titan_fit::model::{Theme, UserProfile};
use titan_fit::persistence::Persistence;
use titan_fit::plates;
use titan_fit::session::{NoHaptics, SetField};
use titan_fit::store::{LocalStore, Store};
use titan_fit::sync::RemoteStore;
use titan_fit::units::{WeightUnit, format_weight};
use titan_fit::{App, Confirm, Result, Services, Settings, SystemClock};

/// Minimum Jaro-Winkler similarity for fuzzy exercise lookups.
const FUZZY_THRESHOLD: f64 = 0.85;

#[derive(Parser)]
#[command(name = "titan-fit", about = "Workout tracker with routines, history and an AI coach")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List routines and their workout days
    Routines,
    /// Browse the exercise library
    Exercises {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = Grouping::Muscle)]
        group: Grouping,
    },
    /// Start a workout day from a routine
    Start { routine: String, day: String },
    /// Show the workout in progress
    Show,
    /// Edit one set of the workout in progress
    Log {
        routine_exercise: String,
        /// 1-based set number
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        set: u64,
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        reps: Option<String>,
        #[arg(long)]
        rpe: Option<String>,
        /// Mark the set completed
        #[arg(long)]
        done: bool,
        /// Mark the set not completed
        #[arg(long, conflicts_with = "done")]
        undone: bool,
    },
    /// Append a set copying the previous one
    AddSet { routine_exercise: String },
    /// Remove the last set of an exercise
    RemoveSet { routine_exercise: String },
    /// Finish the workout in progress
    Finish {
        /// Drop the workout instead of saving it
        #[arg(long)]
        discard: bool,
    },
    /// List completed workouts
    History,
    /// Delete a completed workout by id
    DeleteWorkout { id: String },
    /// Dashboard statistics
    Stats,
    /// Best estimated max per session for an exercise
    Progress {
        exercise: String,
        #[arg(long, value_enum, default_value_t = Formula::Epley)]
        formula: Formula,
    },
    /// Plates per side for a target weight
    Plates {
        weight: f64,
        /// Bar weight; defaults to 20 kg or 45 lbs
        #[arg(long)]
        bar: Option<f64>,
        /// Unit the weight was recorded in, loaded on a bar of the current unit
        #[arg(long, conflicts_with = "bar")]
        from: Option<WeightUnit>,
    },
    /// Body weight tracking
    Metric {
        #[command(subcommand)]
        action: MetricAction,
    },
    /// Set the display and entry unit
    Unit { unit: WeightUnit },
    /// Set the color theme
    Theme {
        #[arg(value_enum)]
        theme: ThemeArg,
    },
    /// Create the athlete profile
    Onboard {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: Option<u32>,
        /// Height in centimeters
        #[arg(long)]
        height: Option<f64>,
        /// Body weight in the current unit
        #[arg(long)]
        weight: f64,
    },
    /// Write a JSON backup, and optionally a CSV of every set
    Export {
        path: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Replace data with the contents of a backup
    Import { path: PathBuf },
    /// Delete all data and restore defaults
    Reset,
    /// Talk to the AI coach
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
}

#[derive(Subcommand)]
enum MetricAction {
    Add {
        weight: f64,
        #[arg(long)]
        note: Option<String>,
    },
    List,
    /// Weight over time, oldest first
    Trend,
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    New,
    List,
    Send { id: String, text: String },
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Grouping {
    Muscle,
    Equipment,
}

#[derive(Clone, Copy, ValueEnum)]
enum Formula {
    Epley,
    Brzycki,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
    System,
}

/// Confirmation read from standard input.
struct Prompt {
    assume_yes: bool,
}

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(_) => matches!(
                line.trim().to_lowercase().as_str(),
                "y" | "yes" | "s" | "si" | "sí"
            ),
            Err(_) => false,
        }
    }
}

fn open_app(settings: &Settings) -> Result<App> {
    let local = match &settings.data_dir {
        Some(dir) => LocalStore::new(dir),
        None => LocalStore::in_data_dir()?,
    };
    log::debug!("Local data in {}", local.dir().display());
    let remote = settings.remote().map(|(url, user)| {
        let store = RemoteStore::new(
            url,
            user,
            settings.remote_token.clone(),
            settings.remote_timeout(),
        );
        log::info!("Syncing as user {} via {url}", store.user_id());
        Box::new(store) as Box<dyn Store>
    });
    let services = Services {
        clock: Box::new(SystemClock),
        haptics: Box::new(NoHaptics),
        coach: Box::new(HttpCoach::new(
            &settings.coach_endpoint,
            &settings.coach_model,
            settings.coach_api_key.clone(),
        )),
    };
    Ok(App::load(
        Persistence::new(Box::new(local), remote),
        settings.start_policy,
        services,
    ))
}

fn print_session(app: &App) {
    let Some(session) = app.active_session() else {
        println!("No workout in progress.");
        return;
    };
    println!("{} / {}", session.program_name, session.sub_routine.name);
    for log in &session.logs {
        let name = app
            .exercises()
            .iter()
            .find(|e| e.id == log.exercise_id)
            .map(|e| e.name.as_str())
            .unwrap_or(&log.exercise_id);
        println!("  [{}] {name}", log.routine_exercise_id);
        for s in &log.sets {
            println!(
                "    {} {:>6} {} x {:<4} rpe {:<3} {}",
                s.set_number,
                s.weight,
                s.unit,
                s.reps,
                s.rpe.as_deref().unwrap_or(""),
                if s.completed { "✓" } else { "" }
            );
        }
    }
}

fn run(cli: Cli, app: &mut App) -> Result<()> {
    let confirm = Prompt {
        assume_yes: cli.yes,
    };
    let unit = app.unit();
    match cli.command {
        Command::Routines => {
            for r in app.routines() {
                println!("{} {}", r.id, r.name);
                for sub in &r.sub_routines {
                    println!("  {} {} ({} exercises)", sub.id, sub.name, sub.exercises.len());
                }
            }
        }
        Command::Exercises { search, group } => {
            let found = library::search(app.exercises(), search.as_deref().unwrap_or(""));
            let by = match group {
                Grouping::Muscle => GroupBy::Muscle,
                Grouping::Equipment => GroupBy::Equipment,
            };
            for (key, list) in library::group(&found, by) {
                println!("{key}");
                for ex in list {
                    println!("  {} {}", ex.id, ex.name);
                }
            }
        }
        Command::Start { routine, day } => {
            app.start_workout(&routine, &day)?;
            print_session(app);
        }
        Command::Show => print_session(app),
        Command::Log {
            routine_exercise,
            set,
            weight,
            reps,
            rpe,
            done,
            undone,
        } => {
            let index = usize::try_from(set - 1).unwrap_or(usize::MAX);
            let mut fields = Vec::new();
            fields.extend(weight.map(SetField::Weight));
            fields.extend(reps.map(SetField::Reps));
            fields.extend(rpe.map(SetField::Rpe));
            if done || undone {
                fields.push(SetField::Completed(done));
            }
            for field in fields {
                app.update_set(&routine_exercise, index, field)?;
            }
            print_session(app);
        }
        Command::AddSet { routine_exercise } => {
            app.add_set(&routine_exercise)?;
            print_session(app);
        }
        Command::RemoveSet { routine_exercise } => {
            app.remove_last_set(&routine_exercise)?;
            print_session(app);
        }
        Command::Finish { discard } => {
            let summary = app.preview_finish()?;
            println!(
                "Volume: {} {unit}",
                format_weight(summary.volume, WeightUnit::Kg, unit)
            );
            if !summary.prs.is_empty() {
                println!("New records: {}", summary.prs.join(", "));
            }
            match app.finish_workout(!discard)? {
                Some(w) => println!("Saved {} ({} min)", w.id, w.duration_minutes),
                None => println!("Workout discarded."),
            }
        }
        Command::History => {
            for w in app.history().iter().rev() {
                let date = chrono::DateTime::from_timestamp_millis(w.date)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!(
                    "{} {date} {} / {} {} min {} {unit} PRs: {}",
                    w.id,
                    w.program_name,
                    w.sub_routine_name,
                    w.duration_minutes,
                    format_weight(w.total_volume, WeightUnit::Kg, unit),
                    w.prs.len()
                );
            }
        }
        Command::DeleteWorkout { id } => app.delete_workout(&id)?,
        Command::Stats => {
            let stats = app.stats();
            println!(
                "Data: {:?}{}",
                app.load_source(),
                if app.has_remote() { " (synced)" } else { "" }
            );
            println!("Workouts: {}", stats.total_workouts);
            println!(
                "Total volume: {} {unit}",
                format_weight(stats.total_volume, WeightUnit::Kg, unit)
            );
            println!("PRs: {}", stats.total_prs);
            println!("Average duration: {:.0} min", stats.avg_duration_minutes);
            if let Some(r) = stats.most_common_routine {
                println!("Most common: {r}");
            }
            let week = app.weekly_consistency();
            let trained = week.iter().filter(|d| d.has_workout).count();
            let marks: String = week
                .iter()
                .map(|d| if d.has_workout { '■' } else { '·' })
                .collect();
            println!("Last 7 days: {marks} ({trained}/7)");
            for (group, volume) in app.top_muscle_groups(5) {
                println!("  {group}: {} {unit}", format_weight(volume, WeightUnit::Kg, unit));
            }
        }
        Command::Progress { exercise, formula } => {
            let Some(ex) = library::find(app.exercises(), &exercise, FUZZY_THRESHOLD) else {
                return Err(titan_fit::AppError::NotFound(format!("exercise {exercise}")));
            };
            let formula = match formula {
                Formula::Epley => OneRmFormula::Epley,
                Formula::Brzycki => OneRmFormula::Brzycki,
            };
            println!("{}", ex.name);
            for p in exercise_progress(app.history(), &ex.id, formula) {
                let date = chrono::DateTime::from_timestamp_millis(p.date)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!(
                    "  {date} best {} e1RM {} {unit}",
                    format_weight(p.best_weight, WeightUnit::Kg, unit),
                    format_weight(p.best_est_1rm, WeightUnit::Kg, unit)
                );
            }
        }
        Command::Plates { weight, bar, from } => {
            let bar = bar.unwrap_or_else(|| plates::default_bar(unit));
            let per_side = match from {
                Some(recorded) => plates::plates_for_recorded(weight, recorded, unit),
                None => plates::plates_per_side(weight, bar, unit),
            };
            let list: Vec<String> = per_side
                .iter()
                .map(|p| format!("{} x{}", p.plate, p.count))
                .collect();
            println!("Per side: [{}]", list.join(", "));
            println!("Loaded: {} {unit}", plates::loaded_total(&per_side, bar));
        }
        Command::Metric { action } => match action {
            MetricAction::Add { weight, note } => {
                let m = app.add_metric(weight, note);
                println!("Recorded {} ({} {})", m.id, m.weight, m.unit);
            }
            MetricAction::List => {
                for m in titan_fit::metrics::newest_first(app.metrics()) {
                    println!(
                        "{} {} {unit} {}",
                        m.id,
                        format_weight(m.weight, m.unit, unit),
                        m.note.as_deref().unwrap_or("")
                    );
                }
                if let Some(change) = titan_fit::metrics::weight_change(app.metrics(), unit) {
                    println!("Change: {change:+.1} {unit}");
                }
            }
            MetricAction::Trend => {
                for (date, weight) in titan_fit::metrics::weight_series(app.metrics(), unit) {
                    let day = chrono::DateTime::from_timestamp_millis(date)
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default();
                    println!("{day} {weight:.1} {unit}");
                }
            }
            MetricAction::Delete { id } => app.delete_metric(&id)?,
        },
        Command::Unit { unit } => app.set_unit(unit),
        Command::Theme { theme } => app.set_theme(match theme {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::System => Theme::System,
        }),
        Command::Onboard {
            name,
            age,
            height,
            weight,
        } => {
            let guest = UserProfile::guest();
            let profile = UserProfile {
                name,
                age: age.unwrap_or(guest.age),
                height: height.unwrap_or(guest.height),
                ..guest
            };
            app.complete_onboarding(profile, weight);
        }
        Command::Export { path, csv } => {
            let path = path.unwrap_or_else(|| PathBuf::from(app.backup_file_name()));
            app.export_backup(&path)?;
            println!("Backup written to {}", path.display());
            if let Some(csv) = csv {
                app.export_sets_csv(&csv)?;
                println!("Sets written to {}", csv.display());
            }
        }
        Command::Import { path } => {
            app.import_backup(&path, &confirm)?;
            println!("Backup imported.");
        }
        Command::Reset => {
            app.reset(&confirm)?;
            println!("All data restored to defaults.");
        }
        Command::Chat { action } => match action {
            ChatAction::New => println!("{}", app.new_chat()),
            ChatAction::List => {
                for c in app.chats() {
                    println!("{} {} ({} messages)", c.id, c.title, c.messages.len());
                }
            }
            ChatAction::Send { id, text } => {
                if app.send_chat_message(&id, &text)? {
                    if let Some(reply) = app
                        .chats()
                        .iter()
                        .find(|c| c.id == id)
                        .and_then(|c| c.messages.last())
                    {
                        println!("{}", reply.text);
                    }
                }
            }
            ChatAction::Delete { id } => app.delete_chat(&id)?,
        },
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let settings = Settings::load();

    let mut app = match open_app(&settings) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Could not open data store: {e}");
            std::process::exit(1);
        }
    };
    if app.has_pending_resume() {
        // `finish --discard` is how an unfinished workout is dropped here.
        log::info!("Resuming unfinished workout");
        app.resolve_resume(true);
    }
    if let Err(e) = run(cli, &mut app) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_numbers_start_at_one() {
        assert!(Cli::try_parse_from(["titan-fit", "log", "re_1", "0"]).is_err());
        let cli = Cli::try_parse_from(["titan-fit", "log", "re_1", "2", "--done"]).unwrap();
        assert!(matches!(cli.command, Command::Log { set: 2, done: true, .. }));
    }

    #[test]
    fn plates_accepts_recorded_unit() {
        let cli = Cli::try_parse_from(["titan-fit", "plates", "100", "--from", "kg"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Plates { from: Some(WeightUnit::Kg), bar: None, .. }
        ));
    }
}
