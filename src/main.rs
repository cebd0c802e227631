//! Macroskin CLI
//!
//! Usage:
//!   macroskin [OPTIONS] [FILE]
//!
//! Options:
//!   -s, --subskin <NAME>   Subskin to render (default: main)
//!   -d, --data <FILE>      Render data (TOML format)
//!   -c, --config <FILE>    Render configuration (TOML format)
//!   --skins <DIR>          Skin directory; FILE is then a skin id `name#subskin`
//!                          (also when the config sets `[skins] path`); an id
//!                          with `#subskin` cannot be combined with --subskin
//!   --check                Only parse, reporting errors
//!   -g, --grammar          Show skin syntax reference
//!   -v, --verbose          Debug logging
//!   -h, --help             Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use macroskin::registry::SUBSKIN_SEPARATOR;
use macroskin::{
    builtins, ConfigError, DataBag, ObjectHandler, ParseError, RegistryError, RenderConfig,
    RenderContext, RenderError, Skin, SkinRegistry, Value,
};

#[derive(Parser)]
#[command(name = "macroskin")]
#[command(about = "Render skins with embedded macro tags")]
struct Cli {
    /// Input file (reads from stdin if not provided); a skin id `name#subskin`
    /// when a skin directory is set with --skins or in the config
    input: Option<String>,

    /// Subskin to render
    #[arg(short, long)]
    subskin: Option<String>,

    /// Render data: [param], [request], [response], [session] and [root] tables
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Render configuration (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skin directory to load skins from
    #[arg(long)]
    skins: Option<PathBuf>,

    /// Only parse the skin and report errors
    #[arg(long)]
    check: bool,

    /// Show skin syntax reference
    #[arg(short, long)]
    grammar: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Error reading '{path}': {source}")]
    Read { path: String, source: io::Error },

    #[error("Error loading config '{}': {source}", .path.display())]
    Config { path: PathBuf, source: ConfigError },

    #[error("Error loading data '{}': {source}", .path.display())]
    Data {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0} parse error(s)")]
    Parse(usize),

    #[error("A skin id is required with --skins")]
    MissingSkinId,

    #[error("Skin id '{id}' already names a subskin; drop --subskin '{subskin}'")]
    SubskinConflict { id: String, subskin: String },

    #[error("Error: {0}")]
    Render(#[from] RenderError),

    #[error("Error: {0}")]
    Registry(#[from] RegistryError),
}

/// Render data file
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DataFile {
    param: Option<toml::Table>,
    request: Option<toml::Table>,
    response: Option<toml::Table>,
    session: Option<toml::Table>,
    root: Option<toml::Table>,
}

fn main() {
    let cli = Cli::parse();

    if cli.grammar {
        print_grammar();
        return;
    }

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(Some(output)) => print!("{}", output),
        Ok(None) => {}
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("macroskin=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<Option<String>, CliError> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?,
        None => RenderConfig::default(),
    };
    if let Some(dir) = &cli.skins {
        config.skins.path = Some(dir.clone());
    }

    if config.skins.path.is_some() {
        return run_registry(cli, config);
    }

    let (name, source) = read_input(cli.input.as_deref())?;
    let skin = match Skin::parse_named(name.as_str(), &source) {
        Ok(skin) => skin,
        Err(errors) => return Err(report_parse_errors(&errors, &source, &name)),
    };
    if cli.check {
        eprintln!("{}: ok", name);
        return Ok(None);
    }

    let (ctx, params) = build_context(config, load_data(cli.data.as_deref())?);
    let output = skin.render_with(cli.subskin.as_deref(), &params, &ctx)?;
    Ok(Some(output))
}

/// Render or check skins from a skin directory
fn run_registry(cli: &Cli, config: RenderConfig) -> Result<Option<String>, CliError> {
    let mut registry = SkinRegistry::from_config(&config.skins);

    if cli.check {
        return match registry.load_dir() {
            Ok(count) => {
                eprintln!("{} skin(s) ok", count);
                Ok(None)
            }
            Err(RegistryError::Parse { name, errors }) => {
                let path = registry.resolve_path(&name);
                let source = fs::read_to_string(&path).unwrap_or_default();
                Err(report_parse_errors(&errors, &source, &path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        };
    }

    let id = cli.input.as_deref().ok_or(CliError::MissingSkinId)?;
    let id = skin_id(id, cli.subskin.as_deref())?;
    let (ctx, params) = build_context(config, load_data(cli.data.as_deref())?);
    match registry.render(&id, &ctx, &params) {
        Ok(output) => Ok(Some(output)),
        Err(RenderError::Parse { skin, errors }) => {
            let path = registry.resolve_path(&skin);
            let source = fs::read_to_string(&path).unwrap_or_default();
            Err(report_parse_errors(&errors, &source, &path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Registry id from the input and `--subskin`; both naming a subskin is an error
fn skin_id(id: &str, subskin: Option<&str>) -> Result<String, CliError> {
    match subskin {
        None => Ok(id.to_string()),
        Some(sub) if id.contains(SUBSKIN_SEPARATOR) => Err(CliError::SubskinConflict {
            id: id.to_string(),
            subskin: sub.to_string(),
        }),
        Some(sub) => Ok(format!("{}{}{}", id, SUBSKIN_SEPARATOR, sub)),
    }
}

fn read_input(input: Option<&str>) -> Result<(String, String), CliError> {
    match input {
        Some(path) => fs::read_to_string(path)
            .map(|content| (path.to_string(), content))
            .map_err(|source| CliError::Read {
                path: path.to_string(),
                source,
            }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|source| CliError::Read {
                    path: "<stdin>".to_string(),
                    source,
                })?;
            Ok(("<stdin>".to_string(), buffer))
        }
    }
}

fn report_parse_errors(errors: &[ParseError], source: &str, filename: &str) -> CliError {
    for error in errors {
        eprintln!("{}", error.format(source, filename));
    }
    CliError::Parse(errors.len())
}

fn load_data(path: Option<&Path>) -> Result<DataFile, CliError> {
    let Some(path) = path else {
        return Ok(DataFile::default());
    };
    let content = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| CliError::Data {
        path: path.to_path_buf(),
        source,
    })
}

fn build_context(config: RenderConfig, data: DataFile) -> (RenderContext, DataBag) {
    let mut ctx = RenderContext::new()
        .with_config(config)
        .with_global(builtins::standard_global());
    if let Some(table) = data.request {
        ctx = ctx.with_request(to_bag(table));
    }
    if let Some(table) = data.response {
        ctx = ctx.with_response(to_bag(table));
    }
    if let Some(table) = data.session {
        ctx = ctx.with_session(to_bag(table));
    }
    if let Some(table) = data.root {
        ctx = ctx.with_root(to_object("root", table));
    }
    let params = data.param.map(to_bag).unwrap_or_default();
    (ctx, params)
}

fn to_bag(table: toml::Table) -> DataBag {
    table
        .into_iter()
        .map(|(key, value)| {
            let value = to_value(&key, value);
            (key, value)
        })
        .collect()
}

fn to_object(name: &str, table: toml::Table) -> ObjectHandler {
    table
        .into_iter()
        .fold(ObjectHandler::new(name), |object, (key, value)| {
            let value = to_value(&key, value);
            object.with_property(key, value)
        })
}

/// Tables become objects, arrays are joined into text
fn to_value(name: &str, value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::Number(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::String(
            items
                .into_iter()
                .filter_map(|item| to_value(name, item).to_text())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        toml::Value::Table(table) => Value::object(to_object(name, table)),
    }
}

fn print_grammar() {
    println!(
        r#"Skin Syntax Reference
=====================

TEXT
----
Everything outside <% ... %> is copied to the output unchanged.

MACRO TAGS
----------
<% handler.macro %>                 Invoke a macro on a handler
<% a.b.macro %>                     Deep path: a, then its nested handler b
<% macro %>                         Look up on `this`, then the global scope
<% h.m name=value "positional" %>   Attributes: word, "quoted" or 'quoted'
<% h.m value=<% other.macro %> %>   Nested tag as attribute value
<% h.m label="Hi <% user.name %>" %> Quoted text with nested tags

HANDLER PREFIXES
----------------
this, param, request, response, session, root
Other names: named handlers, response data, session data, root, global

FILTERS
-------
<% h.m | uppercase | truncate limit=10 %>

STANDARD ATTRIBUTES
-------------------
prefix=... suffix=...     Wrap non-empty output
default=...               Output when empty or unresolved
encoding=html|xml|form|url
failmode=silent|verbose   What an unresolved macro renders

COMMENTS AND SUBSKINS
---------------------
<% // anything, even <% tags %> %>  Comment, never evaluated
<% #name %>                         Start subskin `name`
<% #main %>                         Back to the main section"#
    );
}
