//! Sub-command definitions and dispatch.
//!
//! # Responsibility
//! - Parse one operation selection per process run.
//! - Execute it against a `PersonStore` and render the outcome.
//!
//! # Invariants
//! - Every outcome, success or failure, is written to the output stream.
//! - Document output is JSON; failures are one `error: <code>: <message>` line.

use crate::fixtures::{
    sample_people, sample_person, DEFAULT_APPENDED_FOOD, DEFAULT_DELETE_NAME,
    DEFAULT_QUERY_FOOD, DEFAULT_UPDATED_AGE,
};
use clap::{Parser, Subcommand};
use personbook_core::{ConfigError, NewPerson, PersonRepository, PersonStore, RepoError};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "personbook", version, about = "CRUD walkthrough over a people collection")]
pub struct Cli {
    /// Connection string; overrides PERSONBOOK_DB_URI.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Env file to load instead of ./.env.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create and save one person (sample Alice when no flags are given).
    CreateOne {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        age: Option<i64>,
        #[arg(long = "food")]
        foods: Vec<String>,
    },
    /// Insert several people from a JSON array file (sample set by default).
    CreateMany {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Find every person with this exact name.
    FindByName { name: String },
    /// Find the first person listing this food.
    FindOneByFood { food: String },
    /// Find one person by id.
    FindById { id: String },
    /// Load a person, append a food, save the whole document.
    AppendFood {
        id: String,
        #[arg(long, default_value = DEFAULT_APPENDED_FOOD)]
        food: String,
    },
    /// Set age on the first person with this name.
    UpdateAge {
        name: String,
        #[arg(long, default_value_t = DEFAULT_UPDATED_AGE, allow_negative_numbers = true)]
        age: i64,
    },
    /// Remove one person by id.
    DeleteById { id: String },
    /// Remove every person with this name.
    DeleteAllByName {
        #[arg(default_value = DEFAULT_DELETE_NAME)]
        name: String,
    },
    /// Up to two people listing this food, sorted by name, without age.
    QueryByFood {
        #[arg(default_value = DEFAULT_QUERY_FOOD)]
        food: String,
    },
}

impl Command {
    /// Stable event name used in logs.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::CreateOne { .. } => "cli_create_one",
            Self::CreateMany { .. } => "cli_create_many",
            Self::FindByName { .. } => "cli_find_by_name",
            Self::FindOneByFood { .. } => "cli_find_one_by_food",
            Self::FindById { .. } => "cli_find_by_id",
            Self::AppendFood { .. } => "cli_append_food",
            Self::UpdateAge { .. } => "cli_update_age",
            Self::DeleteById { .. } => "cli_delete_by_id",
            Self::DeleteAllByName { .. } => "cli_delete_all_by_name",
            Self::QueryByFood { .. } => "cli_query_by_food",
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Store(RepoError),
    Input(String),
    Output(String),
}

impl CliError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Store(err) => err.error_code(),
            Self::Input(_) => "input_error",
            Self::Output(_) => "output_error",
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Input(message) => write!(f, "{message}"),
            Self::Output(message) => write!(f, "failed to write output: {message}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Input(_) | Self::Output(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Runs one command and returns its result as JSON.
pub fn execute<R: PersonRepository>(
    command: &Command,
    store: &PersonStore<R>,
) -> Result<Value, CliError> {
    let value = match command {
        Command::CreateOne { name, age, foods } => {
            let payload = if name.is_none() && age.is_none() && foods.is_empty() {
                sample_person()
            } else {
                NewPerson {
                    name: name.clone(),
                    age: *age,
                    favorite_foods: foods.clone(),
                }
            };
            to_json(&store.create_one(&payload)?)?
        }
        Command::CreateMany { file } => {
            let people = match file {
                Some(path) => read_people_file(path)?,
                None => sample_people(),
            };
            to_json(&store.create_many(&people)?)?
        }
        Command::FindByName { name } => to_json(&store.find_by_name(name)?)?,
        Command::FindOneByFood { food } => to_json(&store.find_one_by_favorite_food(food)?)?,
        Command::FindById { id } => to_json(&store.find_by_id(id)?)?,
        Command::AppendFood { id, food } => {
            to_json(&store.append_favorite_food_and_save(id, food)?)?
        }
        Command::UpdateAge { name, age } => to_json(&store.update_age_by_name(name, *age)?)?,
        Command::DeleteById { id } => to_json(&store.delete_by_id(id)?)?,
        Command::DeleteAllByName { name } => to_json(&store.delete_all_by_name(name)?)?,
        Command::QueryByFood { food } => to_json(&store.query_by_food_sorted_limited(food)?)?,
    };
    Ok(value)
}

/// Renders an outcome onto `out`.
pub fn write_outcome(out: &mut impl Write, outcome: &Result<Value, CliError>) -> std::io::Result<()> {
    match outcome {
        Ok(value) => {
            let rendered = serde_json::to_string_pretty(value)
                .unwrap_or_else(|_| value.to_string());
            writeln!(out, "{rendered}")
        }
        Err(err) => writeln!(out, "error: {}: {}", err.error_code(), err),
    }
}

fn read_people_file(path: &Path) -> Result<Vec<NewPerson>, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| CliError::Input(format!("failed to read `{}`: {err}", path.display())))?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::Input(format!(
            "`{}` is not a JSON array of people: {err}",
            path.display()
        ))
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|err| CliError::Output(err.to_string()))
}
