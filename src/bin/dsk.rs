/// DSK image management tool and interactive console

use amsdsk::cli::{build_cli, parse_number};
use amsdsk::commands::{self, AddMode, CreateOptions};
use amsdsk::filesystem::directory::MAX_USER;
use amsdsk::*;
use clap::ArgMatches;
use log::debug;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const RCH: &str = "unreachable was reached";

/// Command completer for the shell
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "add", "cat", "create", "delete", "dir", "exit", "export", "help", "info", "list",
                "ls", "open", "quit", "rm", "save", "user",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the command name
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Configure logging from DSK_LOG and DSK_LOGFILE
fn setup_logger() {
    let filter = std::env::var("DSK_LOG").unwrap_or_else(|_| "warn".to_string());
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&filter).format(|buf, record| {
        writeln!(
            buf,
            "[{}][{}:{}] {}",
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });

    if let Ok(path) = std::env::var("DSK_LOGFILE") {
        if !path.is_empty() && path != "stderr" {
            match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => eprintln!("Cannot open log file {}: {}", path, e),
            }
        }
    }
    builder.init();
}

fn main() {
    setup_logger();
    let matches = build_cli().get_matches();
    let mut errors = ErrorStack::new();

    if run(&matches, &mut errors).is_err() {
        eprintln!("{}", errors.combined_message());
        std::process::exit(1);
    }
}

fn path_arg(matches: &ArgMatches, id: &str) -> PathBuf {
    PathBuf::from(matches.get_one::<String>(id).expect(RCH))
}

fn output_arg(matches: &ArgMatches) -> Option<PathBuf> {
    matches.get_one::<String>("output").map(PathBuf::from)
}

fn run(matches: &ArgMatches, errors: &mut ErrorStack) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    match matches.subcommand() {
        Some(("list", cmd)) => {
            let fs = commands::open(&path_arg(cmd, "image"), errors)?;
            commands::list(&fs, &mut stdout, errors)
        }
        Some(("info", cmd)) => {
            let fs = commands::open(&path_arg(cmd, "image"), errors)?;
            commands::info(&fs, &mut stdout, errors)
        }
        Some(("export", cmd)) => {
            let fs = commands::open(&path_arg(cmd, "image"), errors)?;
            let file = cmd.get_one::<String>("file").expect(RCH);
            let user = *cmd.get_one::<u8>("user").expect(RCH);
            commands::export(&fs, file, user, output_arg(cmd).as_deref(), errors)?;
            Ok(())
        }
        Some(("delete", cmd)) => {
            let path = path_arg(cmd, "image");
            let mut fs = commands::open(&path, errors)?;
            let file = cmd.get_one::<String>("file").expect(RCH);
            let user = *cmd.get_one::<u8>("user").expect(RCH);
            commands::delete(&mut fs, file, user, errors)?;
            commands::save(&mut fs, &path, output_arg(cmd).as_deref(), errors)
        }
        Some(("add", cmd)) => {
            let path = path_arg(cmd, "image");
            let mut fs = commands::open(&path, errors)?;
            let user = *cmd.get_one::<u8>("user").expect(RCH);
            let mode = if cmd.get_flag("binary") {
                let load = cmd.get_one::<u16>("load").copied().unwrap_or(0);
                let exec = cmd.get_one::<u16>("exec").copied().unwrap_or(load);
                AddMode::Binary { load, exec }
            } else if cmd.get_flag("ascii") {
                AddMode::Ascii
            } else {
                AddMode::Raw
            };
            let name = cmd.get_one::<String>("name").map(String::as_str);
            commands::add(&mut fs, &path_arg(cmd, "source"), name, user, mode, errors)?;
            commands::save(&mut fs, &path, output_arg(cmd).as_deref(), errors)
        }
        Some(("write-device", cmd)) => {
            let path = path_arg(cmd, "image");
            let image = commands::with_context(
                errors,
                || format!("Unable to open DSK image {}", path.display()),
                DiskImage::open(&path),
            )?;
            commands::write_device(&image, &mut NullDriver, errors)
        }
        Some(("read-device", cmd)) => {
            let tracks = *cmd.get_one::<u8>("tracks").expect(RCH);
            let sides = *cmd.get_one::<u8>("sides").expect(RCH);
            commands::read_device(&mut NullDriver, tracks, sides, &path_arg(cmd, "image"), errors)
        }
        Some(("create", cmd)) => {
            let disk_type = commands::with_context(
                errors,
                || "Invalid disk type".to_string(),
                DiskType::from_str(cmd.get_one::<String>("type").expect(RCH)),
            )?;
            let options = CreateOptions {
                tracks: *cmd.get_one::<u8>("tracks").expect(RCH),
                sides: *cmd.get_one::<u8>("sides").expect(RCH),
                sectors: cmd.get_one::<u8>("sectors").copied(),
                sector_size: *cmd.get_one::<u16>("sector-size").expect(RCH),
                track_length: *cmd.get_one::<u16>("track-length").expect(RCH),
                disk_type,
                extended: cmd.get_flag("extended"),
            };
            commands::create(&options, &path_arg(cmd, "image"), errors)
        }
        Some(("shell", cmd)) => {
            drop(stdout);
            run_shell(cmd.get_one::<String>("image").map(PathBuf::from));
            Ok(())
        }
        _ => {
            errors.push("No subcommand given, try `dsk --help`");
            Err(DskError::filesystem("no subcommand"))
        }
    }
}

/// Get the path to the history file
fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".dsk_history");
        p
    })
}

/// State of the interactive shell
struct Session {
    fs: Option<Amsdos>,
    path: Option<PathBuf>,
    user: u8,
    errors: ErrorStack,
}

impl Session {
    fn report(&mut self) {
        if !self.errors.is_empty() {
            println!("Error: {}", self.errors.combined_message());
            self.errors.reset();
        }
    }

    fn open(&mut self, path: &Path) {
        if let Ok(fs) = commands::open(path, &mut self.errors) {
            println!("Opened: {}", path.display());
            self.fs = Some(fs);
            self.path = Some(path.to_path_buf());
        }
    }
}

fn run_shell(initial: Option<PathBuf>) {
    println!("=== dsk ===");
    println!("Interactive console for Amstrad CPC disk images.");
    println!("Type 'help' for available commands\n");

    let mut rl = match Editor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to create editor: {}", e);
            return;
        }
    };
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut session = Session {
        fs: None,
        path: None,
        user: 0,
        errors: ErrorStack::new(),
    };
    if let Some(path) = initial {
        session.open(&path);
        session.report();
    }

    loop {
        let input = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        let Some(command) = parts.first().map(|c| c.to_lowercase()) else {
            continue;
        };
        debug!("Shell command: {:?}", parts);

        if command == "quit" || command == "exit" {
            break;
        }
        shell_command(&mut session, &command, &parts[1..]);
        session.report();
    }

    if let Some(history_path) = history_path() {
        let _ = rl.save_history(&history_path);
    }
    println!("Goodbye!");
}

fn shell_command(session: &mut Session, command: &str, args: &[String]) {
    let mut stdout = std::io::stdout();
    match command {
        "help" => print_help(),
        "open" | "load" => match args.first() {
            Some(path) => session.open(Path::new(path)),
            None => println!("Usage: open <path>"),
        },
        "create" => {
            let disk_type = args.first().map(String::as_str).unwrap_or("data");
            let created = DiskType::from_str(disk_type)
                .and_then(FormatSpec::for_disk_type)
                .and_then(Amsdos::format);
            if let Ok(fs) = commands::with_context(
                &mut session.errors,
                || "Unable to create image".to_string(),
                created,
            ) {
                println!("Created new {} disk", fs.disk_type());
                session.fs = Some(fs);
                session.path = None;
            }
        }
        "user" => match args.first() {
            Some(n) => match n.parse::<u8>() {
                Ok(user) if user <= MAX_USER => session.user = user,
                _ => println!("Usage: user <0-{}>", MAX_USER),
            },
            None => println!("User {}", session.user),
        },
        "save" => {
            let target = args.first().map(PathBuf::from).or_else(|| session.path.clone());
            match (session.fs.as_mut(), target) {
                (Some(fs), Some(target)) => {
                    if commands::save(fs, &target, None, &mut session.errors).is_ok() {
                        println!("Saved: {}", target.display());
                        session.path = Some(target);
                    }
                }
                (None, _) => println!("No image loaded. Use 'open <path>' or 'create' first."),
                (_, None) => println!("Usage: save <path>"),
            }
        }
        _ => {
            let user = session.user;
            let Some(fs) = session.fs.as_mut() else {
                println!("No image loaded. Use 'open <path>' or 'create' first.");
                return;
            };
            let errors = &mut session.errors;
            let _ = match command {
                "info" => commands::info(fs, &mut stdout, errors),
                "list" | "ls" | "dir" | "cat" => commands::list(fs, &mut stdout, errors),
                "export" => match args.first() {
                    Some(name) => {
                        let output = args.get(1).map(PathBuf::from);
                        commands::export(fs, name, user, output.as_deref(), errors).map(|target| {
                            println!("Exported to {}", target.display());
                        })
                    }
                    None => {
                        println!("Usage: export <file> [output_path]");
                        Ok(())
                    }
                },
                "delete" | "rm" => match args.first() {
                    Some(name) => commands::delete(fs, name, user, errors),
                    None => {
                        println!("Usage: delete <file>");
                        Ok(())
                    }
                },
                "add" => match args.first() {
                    Some(source) => match add_mode(&args[1..]) {
                        Ok((name, mode)) => {
                            commands::add(fs, Path::new(source), name, user, mode, errors)
                        }
                        Err(message) => {
                            println!("{}", message);
                            Ok(())
                        }
                    },
                    None => {
                        println!("Usage: add <path> [name] [binary <load> [exec] | ascii]");
                        Ok(())
                    }
                },
                other => {
                    println!("Unknown command: {}. Type 'help' for available commands.", other);
                    Ok(())
                }
            };
        }
    }
}

/// Parse the optional name and storage mode following `add <path>`
fn add_mode(args: &[String]) -> std::result::Result<(Option<&str>, AddMode), String> {
    let (name, rest) = match args.first().map(String::as_str) {
        Some("binary") | Some("ascii") | None => (None, args),
        Some(name) => (Some(name), &args[1..]),
    };
    let mode = match rest.first().map(String::as_str) {
        None => AddMode::Raw,
        Some("ascii") => AddMode::Ascii,
        Some("binary") => {
            let load = rest.get(1).map(|s| parse_number(s)).transpose()?.unwrap_or(0);
            let exec = rest.get(2).map(|s| parse_number(s)).transpose()?.unwrap_or(load);
            AddMode::Binary { load, exec }
        }
        Some(other) => return Err(format!("Unknown add mode: {}", other)),
    };
    Ok((name, mode))
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <path>                     - Open a disk image (use quotes for paths with spaces)");
    println!("  create [data|system|ibm]        - Create a blank formatted disk");
    println!("  info                            - Show disk information");
    println!("  list (ls, dir, cat)             - List files");
    println!("  export <file> [output_path]     - Copy a file to the host (defaults to its name)");
    println!("  add <path> [name] [mode]        - Copy a host file onto the disk");
    println!("                                    mode: binary <load> [exec] | ascii");
    println!("  delete <file> (rm)              - Delete a file");
    println!("  user [n]                        - Show or set the user number");
    println!("  save [path]                     - Save the image");
    println!("  help                            - Show this help");
    println!("  quit, exit                      - Exit");
}
