use pipeline_core::{FileAttachment, Msg, PluginType};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  login              request a token with the configured credentials
  type <csv|github>  select the plugin
  url <text>         set the repository URL (empty clears it)
  file <path>        attach a file
  nofile             remove the attached file
  submit             run the plugin
  download           save the result artifact
  show               print the current state
  help               print this help
  quit               exit";

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dispatch(Msg),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}; type `help`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error(transparent)]
    PluginType(#[from] pipeline_core::UnknownPluginType),
}

pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "login" => Command::Dispatch(Msg::LoginClicked),
        "type" | "plugin" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("type"));
            }
            Command::Dispatch(Msg::PluginTypeSelected(rest.parse::<PluginType>()?))
        }
        "url" => Command::Dispatch(Msg::RepoUrlChanged(rest.to_string())),
        "file" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("file"));
            }
            Command::Dispatch(Msg::FileSelected(FileAttachment::from_path(rest)))
        }
        "nofile" => Command::Dispatch(Msg::FileCleared),
        "submit" | "run" => Command::Dispatch(Msg::SubmitClicked),
        "download" => Command::Dispatch(Msg::DownloadClicked),
        "show" | "status" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}
