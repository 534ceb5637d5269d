use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ava: talk to the chat widget backend from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub widget: WidgetArgs,

    /// Extra request header, e.g. -H "Authorization: Bearer abc". Repeatable.
    #[arg(short = 'H', long = "header", global = true, value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// How the widget would see its embedding page.
#[derive(Args, Debug, Clone, Default)]
pub struct WidgetArgs {
    /// Page URL whose query string configures the widget.
    #[arg(long, global = true, env = "AVA_WIDGET_URL")]
    pub widget_url: Option<String>,

    /// JSON file with the host-provided configuration (enables static mode).
    #[arg(long, global = true)]
    pub static_config: Option<PathBuf>,

    /// Theme injected by the host page in static mode.
    #[arg(long, global = true)]
    pub static_theme: Option<String>,

    /// Locale injected by the host page in static mode.
    #[arg(long, global = true)]
    pub static_locale: Option<String>,

    /// Locale used when neither host nor URL sets one.
    #[arg(long, global = true, env = "AVA_DEFAULT_LOCALE", default_value = "en")]
    pub default_locale: String,

    /// Pretend the widget runs inside a parent frame.
    #[arg(long, global = true)]
    pub embedded: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved widget configuration as JSON.
    Config,
    /// Send a chat message.
    Send(SendArgs),
    /// Rate a bot answer.
    Evaluate(EvaluateArgs),
    /// Upload a file into a chat.
    Upload(UploadArgs),
    /// Decode an attachment text fragment.
    Decode(DecodeArgs),
    /// Notify the host page, printing what would be posted.
    Notify(NotifyArgs),
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message text.
    pub message: String,

    /// Sender identifier.
    #[arg(long, short)]
    pub sender: String,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Evaluation payload as JSON, e.g. '{"messageId":"m-1","score":5}'.
    pub data: String,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload.
    pub path: PathBuf,

    /// Chat the file belongs to.
    #[arg(long)]
    pub chat_id: String,

    /// Content type of the file, e.g. image/png.
    #[arg(long)]
    pub mime: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Percent-encoded attachment text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// Value to post to the host page.
    pub value: String,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers() {
        assert_eq!(
            parse_header("Authorization: Bearer abc").unwrap(),
            ("Authorization".to_string(), "Bearer abc".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn parses_send_command() {
        let cli = Cli::try_parse_from([
            "ava", "send", "hello", "--sender", "user1",
            "-H", "X-Token: t", "--widget-url", "https://w.example/?theme=dark",
        ])
        .unwrap();
        match cli.command {
            Commands::Send(args) => {
                assert_eq!(args.message, "hello");
                assert_eq!(args.sender, "user1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.headers, vec![("X-Token".to_string(), "t".to_string())]);
        assert_eq!(cli.widget.widget_url.as_deref(), Some("https://w.example/?theme=dark"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
